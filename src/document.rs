//! Per-document state: the variable table and the pipeline index of one
//! open host document.
//!
//! Every mutating call finishes all of its map and annotation updates
//! before it records the corresponding event in the store's outbox. The
//! [`crate::DocumentRegistry`] drains outboxes and delivers the events.

use crate::catalog::TemplateLookup;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::events::{StoreEvent, VariableAdded, VariableRemoved};
use crate::host::HostDocument;
use crate::id::{DocumentId, Version};
use crate::index::PipelineIndex;
use crate::types::{CellLocation, PipelineRecord, PortMap, Recipe, VarMap, Variable};
use crate::variables::{VariableRegistry, VariableSource};

pub struct DocumentStore {
    id: DocumentId,
    host: Box<dyn HostDocument>,
    variables: VariableRegistry,
    index: PipelineIndex,
    outbox: Vec<StoreEvent>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("id", &self.id)
            .field("variables", &self.variables.len())
            .field("records", &self.index.len())
            .field("outbox", &self.outbox.len())
            .finish()
    }
}

impl DocumentStore {
    /// Rebuild the document's state from its tags and annotations.
    ///
    /// Variables are loaded first so that recipes can resolve them.
    pub fn open(
        mut host: Box<dyn HostDocument>,
        templates: &dyn TemplateLookup,
        config: &StoreConfig,
    ) -> Self {
        let id = host.id();
        let variables = VariableRegistry::load(host.as_ref(), config.variable_tag_prefix.clone());
        let index = PipelineIndex::load(host.as_mut(), &variables, templates, config);
        tracing::info!(
            "Opened document {} ({}): {} variable(s), {} pipeline(s)",
            id,
            host.name(),
            variables.len(),
            index.len()
        );
        Self {
            id,
            host,
            variables,
            index,
            outbox: Vec::new(),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn name(&self) -> String {
        self.host.name()
    }

    pub fn host(&self) -> &dyn HostDocument {
        self.host.as_ref()
    }

    pub fn variables(&self) -> &VariableRegistry {
        &self.variables
    }

    pub fn index(&self) -> &PipelineIndex {
        &self.index
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn lookup_by_version(&self, version: Version) -> Option<&PipelineRecord> {
        self.index.lookup_by_version(version)
    }

    pub fn lookup_by_cell(&self, cell: &CellLocation) -> Option<&PipelineRecord> {
        self.index.lookup_by_cell(cell)
    }

    pub fn lookup_by_recipe(&self, recipe: &Recipe) -> Option<Version> {
        self.index.lookup_by_recipe(recipe)
    }

    /// Materialize and add a variable, then announce it.
    pub fn register_variable(
        &mut self,
        name: &str,
        source: &dyn VariableSource,
    ) -> Result<&Variable> {
        self.variables.register(name, source, self.host.as_mut())?;
        tracing::debug!("Added variable {:?} to {}", name, self.id);
        self.outbox.push(
            VariableAdded {
                document: self.id,
                name: name.to_string(),
                renamed_from: None,
            }
            .into(),
        );
        self.variables
            .get(name)
            .ok_or_else(|| StoreError::UnknownVariable {
                name: name.to_string(),
            })
    }

    /// Remove a variable together with every pipeline record using it.
    ///
    /// The dropped records travel with the `VariableRemoved` event.
    pub fn remove_variable(&mut self, name: &str) -> Result<Variable> {
        if !self.variables.contains(name) {
            return Err(StoreError::UnknownVariable {
                name: name.to_string(),
            });
        }

        let dropped = self.index.on_variable_removed(self.host.as_mut(), name);
        let variable = self.variables.remove(name, self.host.as_mut())?;
        tracing::debug!(
            "Removed variable {:?} from {} ({} pipeline(s) dropped)",
            name,
            self.id,
            dropped.len()
        );
        self.outbox.push(
            VariableRemoved {
                document: self.id,
                name: name.to_string(),
                renamed_to: None,
                dropped,
            }
            .into(),
        );
        Ok(variable)
    }

    /// Rename a variable and rewrite the recipes that use it.
    ///
    /// Announced as the old name being removed followed by the new name being
    /// added.
    pub fn rename_variable(&mut self, old: &str, new: &str) -> Result<()> {
        self.variables.rename(old, new, self.host.as_mut())?;
        let rewritten = self.index.on_variable_renamed(self.host.as_mut(), old, new);
        tracing::debug!(
            "Renamed variable {:?} to {:?} in {} ({} recipe(s) rewritten)",
            old,
            new,
            self.id,
            rewritten
        );
        self.outbox.push(
            VariableRemoved {
                document: self.id,
                name: old.to_string(),
                renamed_to: Some(new.to_string()),
                dropped: Vec::new(),
            }
            .into(),
        );
        self.outbox.push(
            VariableAdded {
                document: self.id,
                name: new.to_string(),
                renamed_from: Some(old.to_string()),
            }
            .into(),
        );
        Ok(())
    }

    /// Record a pipeline realized from `recipe` and shown in `cell`
    ///
    /// The record is kept even if the recipe binds a variable this document
    /// does not have, but such a recipe is not restored on reopen.
    pub fn created_pipeline(
        &mut self,
        cell: CellLocation,
        version: Version,
        recipe: Recipe,
        port_map: PortMap,
        var_map: VarMap,
    ) {
        for (parameter, variable) in recipe.bindings() {
            if !self.variables.contains(variable) {
                tracing::warn!(
                    "Pipeline at version {} of {} binds {} to unknown variable {:?}, it will not survive a reload",
                    version,
                    self.id,
                    parameter,
                    variable
                );
            }
        }
        self.index
            .created(self.host.as_mut(), cell, version, recipe, port_map, var_map);
    }

    /// Forget what `cell` shows
    pub fn clear_cell(&mut self, cell: &CellLocation) -> Option<Version> {
        self.index.clear_cell(cell)
    }

    pub(crate) fn take_outbox(&mut self) -> Vec<StoreEvent> {
        std::mem::take(&mut self.outbox)
    }
}
