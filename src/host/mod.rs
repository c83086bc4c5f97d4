//! Host document interface
//!
//! The store never owns a document. It reads and writes per-version
//! annotations and tags through [`HostDocument`], and asks the application
//! for documents through [`DocumentHost`].
//!
//! # Annotation layout
//!
//! Three independent key/value annotations per realized pipeline version:
//!
//! ```text
//! key="dat-recipe"  value="<template_id>(;<param>=<varname>)*"
//! key="dat-ports"   value="<param>=<modid>:<port>(,<modid>:<port>)*(;...)*"
//! key="dat-vars"    value="<param>=<connid>(,<connid>)*(;...)*"
//! ```
//!
//! Variables are persisted as version tags `dat-var-<name>` on the version
//! that materializes them.
//!
//! [`memory`] provides an in-process implementation used by tests and
//! headless tools.

pub mod memory;

pub use memory::{MemoryDocument, MemoryHost, MemorySource};

use crate::id::{DocumentId, Version};
use crate::types::VariableType;
use std::cell::RefCell;
use std::rc::Rc;

/// One persisted `(version, key, value)` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub version: Version,
    pub key: String,
    pub value: String,
}

impl Annotation {
    pub fn new(version: Version, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            version,
            key: key.into(),
            value: value.into(),
        }
    }
}

/// What the store needs from an open host document.
pub trait HostDocument {
    /// Identity of the document, stable while it is open
    fn id(&self) -> DocumentId;

    /// Human-readable name, only used in diagnostics
    fn name(&self) -> String;

    /// All annotations of the document, in any order
    fn annotations(&self) -> Vec<Annotation>;

    fn annotation(&self, version: Version, key: &str) -> Option<String>;

    fn set_annotation(&mut self, version: Version, key: &str, value: &str);

    /// Remove an annotation; no-op if it does not exist
    fn clear_annotation(&mut self, version: Version, key: &str);

    /// All `(version, tag)` pairs
    fn tags(&self) -> Vec<(Version, String)>;

    fn set_tag(&mut self, version: Version, tag: &str);

    fn clear_tag(&mut self, version: Version);

    /// Type of the variable materialized at `version`, if that version is one
    fn variable_type(&self, version: Version) -> Option<VariableType>;
}

/// Lets the application keep a handle on a document it hands to the store.
impl<T: HostDocument + ?Sized> HostDocument for Rc<RefCell<T>> {
    fn id(&self) -> DocumentId {
        self.borrow().id()
    }

    fn name(&self) -> String {
        self.borrow().name()
    }

    fn annotations(&self) -> Vec<Annotation> {
        self.borrow().annotations()
    }

    fn annotation(&self, version: Version, key: &str) -> Option<String> {
        self.borrow().annotation(version, key)
    }

    fn set_annotation(&mut self, version: Version, key: &str, value: &str) {
        self.borrow_mut().set_annotation(version, key, value)
    }

    fn clear_annotation(&mut self, version: Version, key: &str) {
        self.borrow_mut().clear_annotation(version, key)
    }

    fn tags(&self) -> Vec<(Version, String)> {
        self.borrow().tags()
    }

    fn set_tag(&mut self, version: Version, tag: &str) {
        self.borrow_mut().set_tag(version, tag)
    }

    fn clear_tag(&mut self, version: Version) {
        self.borrow_mut().clear_tag(version)
    }

    fn variable_type(&self, version: Version) -> Option<VariableType> {
        self.borrow().variable_type(version)
    }
}

/// The application side: opens documents and frees presentation resources.
#[cfg_attr(test, mockall::automock)]
pub trait DocumentHost {
    /// Hand over the document with this identity
    fn open(&mut self, id: DocumentId) -> Box<dyn HostDocument>;

    /// The document was closed; release anything presented for it
    fn release(&mut self, id: DocumentId);
}
