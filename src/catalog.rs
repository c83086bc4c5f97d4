//! Known plot templates.
//!
//! Templates are contributed by plugins at run time and may come and go.
//! Decoding a persisted recipe looks its template id up here; an unknown id
//! makes the recipe undecodable.

use crate::codec::is_reserved_free;
use crate::error::{Result, StoreError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A named, reusable visualization definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotTemplate {
    id: String,
    name: String,
    parameters: Vec<String>,
}

impl PlotTemplate {
    pub fn new<I, S>(id: impl Into<String>, name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }

    /// Stable identifier written into `dat-recipe` annotations. Never localized.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p == name)
    }
}

/// Resolves template ids while decoding recipes.
pub trait TemplateLookup {
    fn template(&self, id: &str) -> Option<Arc<PlotTemplate>>;
}

/// Table of registered plot templates, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, Arc<PlotTemplate>>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template.
    ///
    /// Ids and parameter names end up in annotation text, so they must not
    /// contain any of the codec's separators.
    pub fn register(&mut self, template: PlotTemplate) -> Result<Arc<PlotTemplate>> {
        if template.id.is_empty() || !is_reserved_free(&template.id) {
            return Err(StoreError::InvalidName { name: template.id });
        }
        if let Some(bad) = template
            .parameters
            .iter()
            .find(|p| p.is_empty() || !is_reserved_free(p))
        {
            return Err(StoreError::InvalidName { name: bad.clone() });
        }
        if self.templates.contains_key(&template.id) {
            return Err(StoreError::DuplicateTemplate { id: template.id });
        }

        tracing::debug!("Registered plot template '{}'", template.id);
        let template = Arc::new(template);
        self.templates
            .insert(template.id.clone(), Arc::clone(&template));
        Ok(template)
    }

    /// Remove a template, e.g. when the plugin providing it is unloaded.
    ///
    /// Recipes already decoded keep their `Arc`; only future decodes fail.
    pub fn unregister(&mut self, id: &str) -> Option<Arc<PlotTemplate>> {
        let removed = self.templates.remove(id);
        if removed.is_some() {
            tracing::debug!("Unregistered plot template '{}'", id);
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<Arc<PlotTemplate>> {
        self.templates.get(id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PlotTemplate>> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateLookup for TemplateCatalog {
    fn template(&self, id: &str) -> Option<Arc<PlotTemplate>> {
        self.get(id)
    }
}
