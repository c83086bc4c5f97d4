//! Document registry
//!
//! One [`DocumentRegistry`] per process, created at start-up and passed to
//! whatever needs it. It maps host documents to their [`DocumentStore`],
//! tracks the active document, owns the template catalog and delivers store
//! events to subscribers.
//!
//! # Event delivery
//!
//! The mutating wrappers (`register_variable`, `remove_variable`, ...) flush
//! events before returning. Handlers receive `&mut DocumentRegistry` and may
//! call those wrappers themselves; the events they raise are delivered after
//! the current one has reached every subscriber.
//!
//! Mutations made through [`DocumentRegistry::for_document`] are announced on
//! the next [`DocumentRegistry::flush_events`].

use crate::catalog::TemplateCatalog;
use crate::config::StoreConfig;
use crate::document::DocumentStore;
use crate::error::{Result, StoreError};
use crate::events::{DocumentActivated, Event, EventBus, EventContext, StoreEvent, SubscriptionId};
use crate::host::DocumentHost;
use crate::id::{DocumentId, Version};
use crate::types::{CellLocation, PortMap, Recipe, VarMap, Variable};
use crate::variables::VariableSource;
use crossbeam_channel::Receiver;
use std::collections::BTreeMap;

pub struct DocumentRegistry {
    host: Box<dyn DocumentHost>,
    catalog: TemplateCatalog,
    config: StoreConfig,
    documents: BTreeMap<DocumentId, DocumentStore>,
    current: Option<DocumentId>,
    bus: EventBus<DocumentRegistry>,
}

impl std::fmt::Debug for DocumentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRegistry")
            .field("documents", &self.documents)
            .field("current", &self.current)
            .field("templates", &self.catalog.len())
            .field("bus", &self.bus)
            .finish()
    }
}

impl EventContext for DocumentRegistry {
    fn bus(&mut self) -> &mut EventBus<Self> {
        &mut self.bus
    }

    fn collect_pending(&mut self) {
        for store in self.documents.values_mut() {
            for event in store.take_outbox() {
                self.bus.enqueue(event);
            }
        }
    }
}

impl DocumentRegistry {
    pub fn new(host: Box<dyn DocumentHost>, catalog: TemplateCatalog, config: StoreConfig) -> Self {
        Self {
            host,
            catalog,
            config,
            documents: BTreeMap::new(),
            current: None,
            bus: EventBus::new(),
        }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// Templates registered or unregistered here affect documents opened
    /// afterwards; open documents keep the records they already decoded.
    pub fn catalog_mut(&mut self) -> &mut TemplateCatalog {
        &mut self.catalog
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The document the host last reported as active
    pub fn current(&self) -> Option<DocumentId> {
        self.current
    }

    /// Ids of the documents with loaded state
    pub fn documents(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.documents.keys().copied()
    }

    /// State of `id`, without creating it
    pub fn document(&self, id: DocumentId) -> Option<&DocumentStore> {
        self.documents.get(&id)
    }

    fn open_document(&mut self, id: DocumentId) -> &mut DocumentStore {
        let catalog = &self.catalog;
        let config = &self.config;
        let host = &mut self.host;
        self.documents
            .entry(id)
            .or_insert_with(|| DocumentStore::open(host.open(id), catalog, config))
    }

    /// The host switched to `doc`.
    ///
    /// Does nothing if `doc` is already the active document. Otherwise makes
    /// it current, loading its state if needed, and announces the switch.
    pub fn on_document_activated(&mut self, doc: DocumentId) {
        if self.current == Some(doc) {
            return;
        }
        let is_new = !self.documents.contains_key(&doc);
        self.open_document(doc);
        self.current = Some(doc);
        tracing::debug!("Document {} activated (new: {})", doc, is_new);
        self.bus.enqueue(DocumentActivated {
            document: doc,
            is_new,
        });
        self.flush_events();
    }

    /// The host closed `doc`: drop its state and release what was presented
    /// for it.
    pub fn on_document_closed(&mut self, doc: DocumentId) {
        if let Some(mut store) = self.documents.remove(&doc) {
            for event in store.take_outbox() {
                self.bus.enqueue(event);
            }
            tracing::debug!("Document {} closed", doc);
        }
        if self.current == Some(doc) {
            self.current = None;
        }
        self.host.release(doc);
        self.flush_events();
    }

    /// State of `doc`, or of the current document when `doc` is `None`.
    ///
    /// An unknown document is loaded on the spot with a warning: the host may
    /// deliver lifecycle notifications out of order. Returns `None` only when
    /// no document is given and none is active.
    pub fn for_document(&mut self, doc: Option<DocumentId>) -> Option<&mut DocumentStore> {
        let id = doc.or(self.current)?;
        if !self.documents.contains_key(&id) {
            tracing::warn!("State requested for unknown document {}, creating it", id);
        }
        Some(self.open_document(id))
    }

    fn store(&mut self, doc: Option<DocumentId>) -> Result<&mut DocumentStore> {
        self.for_document(doc).ok_or(StoreError::NoActiveDocument)
    }

    /// Register a variable in `doc` (or the current document)
    pub fn register_variable(
        &mut self,
        doc: Option<DocumentId>,
        name: &str,
        source: &dyn VariableSource,
    ) -> Result<Variable> {
        let variable = self.store(doc)?.register_variable(name, source)?.clone();
        self.flush_events();
        Ok(variable)
    }

    /// Remove a variable and every pipeline that uses it
    pub fn remove_variable(&mut self, doc: Option<DocumentId>, name: &str) -> Result<Variable> {
        let variable = self.store(doc)?.remove_variable(name)?;
        self.flush_events();
        Ok(variable)
    }

    pub fn rename_variable(&mut self, doc: Option<DocumentId>, old: &str, new: &str) -> Result<()> {
        self.store(doc)?.rename_variable(old, new)?;
        self.flush_events();
        Ok(())
    }

    /// Record a realized pipeline in `doc` (or the current document)
    pub fn created_pipeline(
        &mut self,
        doc: Option<DocumentId>,
        cell: CellLocation,
        version: Version,
        recipe: Recipe,
        port_map: PortMap,
        var_map: VarMap,
    ) -> Result<()> {
        self.store(doc)?
            .created_pipeline(cell, version, recipe, port_map, var_map);
        Ok(())
    }

    /// Subscribe to events of kind `E`
    pub fn subscribe<E, F>(&mut self, handler: F) -> SubscriptionId
    where
        E: Event,
        F: FnMut(&E, &mut DocumentRegistry) + 'static,
    {
        self.bus.subscribe(handler)
    }

    /// Subscribe to events of kind `E` accepted by `predicate`
    pub fn subscribe_filtered<E, P, F>(&mut self, predicate: P, handler: F) -> SubscriptionId
    where
        E: Event,
        P: Fn(&E) -> bool + 'static,
        F: FnMut(&E, &mut DocumentRegistry) + 'static,
    {
        self.bus.subscribe_filtered(predicate, handler)
    }

    /// Subscribe to events of kind `E` about one document only
    pub fn subscribe_document<E, F>(&mut self, doc: DocumentId, handler: F) -> SubscriptionId
    where
        E: Event,
        F: FnMut(&E, &mut DocumentRegistry) + 'static,
    {
        self.bus
            .subscribe_filtered(move |e: &E| e.document() == doc, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// A receiver getting a copy of every event delivered from now on
    pub fn event_channel(&mut self) -> Receiver<StoreEvent> {
        self.bus.channel()
    }

    /// Deliver all pending events
    pub fn flush_events(&mut self) {
        EventBus::dispatch(self);
    }
}
