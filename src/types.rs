//! Core data types for the recipe store
//!
//! This module contains the data model shared by the codec, the variable
//! registry and the pipeline index.
//!
//! # Main Types
//!
//! - [`Variable`] - A named variable with a type tag and a handle to the
//!   host version that materializes it
//! - [`Recipe`] - A plot template plus the variables bound to its parameters
//! - [`PortMap`] / [`VarMap`] - Where each parameter enters a realized graph
//! - [`PipelineRecord`] - Everything known about one realized pipeline version
//! - [`CellLocation`] - A presentation slot showing a realized pipeline
//!
//! # Variable identity
//!
//! Recipes refer to variables by name, never by object. Renaming a variable
//! rewrites the name inside every recipe that binds it; recipe equality is
//! evaluated on `(template id, {(parameter, variable name)})` so two recipes
//! built at different times compare equal as long as they bind the same
//! names.

use crate::catalog::PlotTemplate;
use crate::error::{Result, StoreError};
use crate::id::{ConnectionId, ModuleId, Version};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Type descriptor of a variable, as understood by the host (e.g. `"basic:Float"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableType(String);

impl VariableType {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self(descriptor.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A variable registered in a document
///
/// The store does not own the computation behind a variable. It only keeps
/// the version of the host document where the variable is materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    var_type: VariableType,
    backing: Version,
}

impl Variable {
    /// Create a variable handle for a version materialized by the host
    pub fn new(name: impl Into<String>, var_type: VariableType, backing: Version) -> Self {
        Self {
            name: name.into(),
            var_type,
            backing,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn var_type(&self) -> &VariableType {
        &self.var_type
    }

    /// Host version holding the materialized variable pipeline
    pub fn backing(&self) -> Version {
        self.backing
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

/// A plot template plus the variables bound to its parameters
///
/// Bindings keep insertion order, which is the order they are encoded in.
/// Equality and hashing ignore that order.
#[derive(Debug, Clone)]
pub struct Recipe {
    template: Arc<PlotTemplate>,
    bindings: IndexMap<String, String>,
}

impl Recipe {
    /// Create a recipe with no bound parameters
    pub fn new(template: Arc<PlotTemplate>) -> Self {
        Self {
            template,
            bindings: IndexMap::new(),
        }
    }

    /// Bind a variable to a parameter declared by the template
    ///
    /// Rebinding a parameter replaces the previous variable.
    pub fn bind(mut self, parameter: &str, variable: &str) -> Result<Self> {
        if !self.template.has_parameter(parameter) {
            return Err(StoreError::UnknownParameter {
                template: self.template.id().to_string(),
                parameter: parameter.to_string(),
            });
        }
        self.bindings
            .insert(parameter.to_string(), variable.to_string());
        Ok(self)
    }

    /// Bind without checking the template's parameters.
    ///
    /// Returns false if the parameter was already bound.
    pub(crate) fn bind_unchecked(&mut self, parameter: &str, variable: &str) -> bool {
        self.bindings
            .insert(parameter.to_string(), variable.to_string())
            .is_none()
    }

    pub fn template(&self) -> &Arc<PlotTemplate> {
        &self.template
    }

    pub fn template_id(&self) -> &str {
        self.template.id()
    }

    /// `(parameter, variable name)` pairs in insertion order
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, v)| (p.as_str(), v.as_str()))
    }

    /// Name of the variable bound to `parameter`
    pub fn variable_for(&self, parameter: &str) -> Option<&str> {
        self.bindings.get(parameter).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Whether any parameter is bound to the variable `name`
    pub fn references(&self, name: &str) -> bool {
        self.bindings.values().any(|v| v == name)
    }

    /// Rewrite every binding of `old` to `new`. Returns true if anything changed.
    pub(crate) fn rename_variable(&mut self, old: &str, new: &str) -> bool {
        let mut changed = false;
        for variable in self.bindings.values_mut() {
            if variable == old {
                *variable = new.to_string();
                changed = true;
            }
        }
        changed
    }
}

impl PartialEq for Recipe {
    fn eq(&self, other: &Self) -> bool {
        self.template.id() == other.template.id() && self.bindings == other.bindings
    }
}

impl Eq for Recipe {}

impl Hash for Recipe {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.template.id().hash(state);
        let mut pairs: Vec<_> = self.bindings.iter().collect();
        pairs.sort();
        pairs.hash(state);
    }
}

/// One place where a parameter's value enters the generated graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortTarget {
    pub module: ModuleId,
    pub port: String,
}

impl PortTarget {
    pub fn new(module: ModuleId, port: impl Into<String>) -> Self {
        Self {
            module,
            port: port.into(),
        }
    }
}

/// parameter name → ordered list of graph inputs receiving it
pub type PortMap = IndexMap<String, Vec<PortTarget>>;

/// parameter name → ordered list of connections implementing its binding
pub type VarMap = IndexMap<String, Vec<ConnectionId>>;

/// Everything the store knows about one realized pipeline version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRecord {
    pub version: Version,
    pub recipe: Recipe,
    pub port_map: PortMap,
    pub var_map: VarMap,
}

/// Presentation slot showing a realized pipeline (sheet / row / column)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellLocation {
    pub sheet: String,
    pub row: u32,
    pub column: u32,
}

impl CellLocation {
    pub fn new(sheet: impl Into<String>, row: u32, column: u32) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            column,
        }
    }
}

impl fmt::Display for CellLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}, {}]", self.sheet, self.row, self.column)
    }
}
