//! # recipe-store: recipe to pipeline-version associations
//!
//! Keeps track of which realized pipeline version in a host document was
//! built from which plot recipe (a plot template plus the variables bound to
//! its parameters), and keeps that association persisted in the document as
//! per-version annotations so it survives save and reload.
//!
//! ## Architecture
//!
//! - **Codec**: text format of the three annotations (`dat-recipe`,
//!   `dat-ports`, `dat-vars`) with a typed decode error
//! - **Variables**: per-document named variables, persisted as version tags
//! - **Index**: version / recipe / cell maps rebuilt from annotations and
//!   written through on every change
//! - **Registry**: one state per open document, the active document and
//!   typed event delivery
//!
//! The host application implements [`host::HostDocument`] and
//! [`host::DocumentHost`]; [`host::MemoryHost`] is an in-memory implementation.
//!
//! ## Example
//!
//! ```
//! use recipe_store::{
//!     catalog::{PlotTemplate, TemplateCatalog},
//!     host::{MemoryHost, MemorySource},
//!     CellLocation, DocumentId, DocumentRegistry, PortMap, Recipe, StoreConfig, VarMap,
//!     VariableRemoved, VariableType, Version,
//! };
//!
//! let mut catalog = TemplateCatalog::new();
//! let scatter = catalog
//!     .register(PlotTemplate::new("scatter", "Scatter plot", ["x", "y"]))
//!     .unwrap();
//!
//! let host = MemoryHost::new();
//! let mut registry =
//!     DocumentRegistry::new(Box::new(host.clone()), catalog, StoreConfig::default());
//! registry.subscribe(|e: &VariableRemoved, _: &mut DocumentRegistry| {
//!     println!("{} removed, {} pipeline(s) dropped", e.name, e.dropped.len());
//! });
//!
//! registry.on_document_activated(DocumentId(1));
//! for (name, version) in [("temp", 10), ("pressure", 11)] {
//!     let source = MemorySource::at_version(Version(version), VariableType::new("basic:Float"));
//!     registry.register_variable(None, name, &source).unwrap();
//! }
//!
//! let recipe = Recipe::new(scatter).bind("x", "temp").unwrap().bind("y", "pressure").unwrap();
//! registry
//!     .created_pipeline(
//!         None,
//!         CellLocation::new("Sheet 1", 0, 0),
//!         Version(12),
//!         recipe,
//!         PortMap::new(),
//!         VarMap::new(),
//!     )
//!     .unwrap();
//!
//! registry.remove_variable(None, "temp").unwrap();
//! let doc = registry.document(DocumentId(1)).unwrap();
//! assert!(doc.lookup_by_version(Version(12)).is_none());
//! ```

pub mod catalog;
pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod host;
pub mod id;
pub mod index;
pub mod logging;
pub mod registry;
pub mod types;
pub mod variables;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use catalog::{PlotTemplate, TemplateCatalog, TemplateLookup};
pub use codec::DecodeError;
pub use config::{AnnotationKeys, StoreConfig};
pub use document::DocumentStore;
pub use error::{Result, ResultExt, StoreError};
pub use events::{DocumentActivated, StoreEvent, SubscriptionId, VariableAdded, VariableRemoved};
pub use id::{ConnectionId, DocumentId, ModuleId, Version};
pub use index::PipelineIndex;
pub use registry::DocumentRegistry;
pub use types::{
    CellLocation, PipelineRecord, PortMap, PortTarget, Recipe, VarMap, Variable, VariableType,
};
pub use variables::{VariableRegistry, VariableSource};
