//! Per-document table of named variables.
//!
//! The registry owns the name → [`Variable`] mapping and keeps the host's
//! version tags in step with it: the version backing a variable is tagged
//! `<prefix><name>` (`dat-var-temp` with the default prefix), so the table can
//! be rebuilt when the document is reopened.
//!
//! Notifications and the pipeline-index cascade are driven by
//! [`crate::document::DocumentStore`], which wraps these table operations.

use crate::error::{Result, StoreError};
use crate::host::HostDocument;
use crate::id::Version;
use crate::types::Variable;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

/// Materializes a variable into the host document under a given name.
///
/// This is where a loaded file or a derived expression becomes a pipeline in
/// the document; the store only keeps the resulting handle.
pub trait VariableSource {
    fn materialize(&self, name: &str, host: &mut dyn HostDocument) -> Result<Variable>;
}

impl<F> VariableSource for F
where
    F: Fn(&str, &mut dyn HostDocument) -> Result<Variable>,
{
    fn materialize(&self, name: &str, host: &mut dyn HostDocument) -> Result<Variable> {
        self(name, host)
    }
}

fn name_format() -> &'static Regex {
    static FORMAT: OnceLock<Regex> = OnceLock::new();
    FORMAT.get_or_init(|| {
        Regex::new(r"^[A-Za-z_$@][A-Za-z_$@0-9]*$").expect("variable name pattern is valid")
    })
}

fn numbered_suffix() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| Regex::new(r"^(.*)_([0-9]+)$").expect("suffix pattern is valid"))
}

/// Whether `name` is acceptable as a variable name.
///
/// Accepted names never contain the codec's reserved separators.
pub fn is_valid_name(name: &str) -> bool {
    name_format().is_match(name)
}

/// Named variables of one document.
#[derive(Debug, Default)]
pub struct VariableRegistry {
    tag_prefix: String,
    variables: IndexMap<String, Variable>,
}

impl VariableRegistry {
    pub fn new(tag_prefix: impl Into<String>) -> Self {
        Self {
            tag_prefix: tag_prefix.into(),
            variables: IndexMap::new(),
        }
    }

    /// Rebuild the table from the document's version tags.
    ///
    /// A tag whose version has no variable type, or whose name is not a valid
    /// variable name, is skipped with a warning.
    pub fn load(host: &dyn HostDocument, tag_prefix: impl Into<String>) -> Self {
        let mut registry = Self::new(tag_prefix);
        for (version, tag) in host.tags() {
            let Some(name) = tag.strip_prefix(registry.tag_prefix.as_str()) else {
                continue;
            };
            if !is_valid_name(name) || registry.variables.contains_key(name) {
                tracing::warn!(
                    "Found invalid variable tag {:?} at version {} in {}, ignored",
                    tag,
                    version,
                    host.name()
                );
                continue;
            }
            match host.variable_type(version) {
                Some(var_type) => {
                    registry
                        .variables
                        .insert(name.to_string(), Variable::new(name, var_type, version));
                }
                None => {
                    tracing::warn!(
                        "Found invalid variable pipeline {:?} in {}, ignored",
                        tag,
                        host.name()
                    );
                }
            }
        }
        tracing::debug!(
            "Loaded {} variable(s) from {}",
            registry.variables.len(),
            host.name()
        );
        registry
    }

    fn tag_for(&self, name: &str) -> String {
        format!("{}{}", self.tag_prefix, name)
    }

    fn check_available(&self, name: &str) -> Result<()> {
        if !is_valid_name(name) {
            return Err(StoreError::InvalidName {
                name: name.to_string(),
            });
        }
        if self.variables.contains_key(name) {
            return Err(StoreError::NamingConflict {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Materialize a new variable through `source` and add it.
    ///
    /// Fails with [`StoreError::NamingConflict`] if the name is taken, and
    /// with [`StoreError::BackingInUse`] if the materialized version already
    /// backs another variable. Either way the existing tags are untouched.
    pub fn register(
        &mut self,
        name: &str,
        source: &dyn VariableSource,
        host: &mut dyn HostDocument,
    ) -> Result<&Variable> {
        self.check_available(name)?;

        let mut variable = source.materialize(name, host)?;
        if variable.name() != name {
            variable.set_name(name);
        }
        if let Some(existing) = self.holder_of(variable.backing(), host) {
            return Err(StoreError::BackingInUse {
                version: variable.backing(),
                existing,
            });
        }
        host.set_tag(variable.backing(), &self.tag_for(name));

        Ok(&*self
            .variables
            .entry(name.to_string())
            .or_insert(variable))
    }

    /// Name of the variable already backed by `version`, in the table or
    /// in the document's tags
    fn holder_of(&self, version: Version, host: &dyn HostDocument) -> Option<String> {
        if let Some(variable) = self.variables.values().find(|v| v.backing() == version) {
            return Some(variable.name().to_string());
        }
        host.tags()
            .into_iter()
            .filter(|(v, _)| *v == version)
            .find_map(|(_, tag)| tag.strip_prefix(self.tag_prefix.as_str()).map(str::to_string))
    }

    /// Remove a variable and release its tag in the document.
    pub fn remove(&mut self, name: &str, host: &mut dyn HostDocument) -> Result<Variable> {
        let variable =
            self.variables
                .shift_remove(name)
                .ok_or_else(|| StoreError::UnknownVariable {
                    name: name.to_string(),
                })?;
        host.clear_tag(variable.backing());
        Ok(variable)
    }

    /// Re-key a variable and re-tag its backing version.
    pub fn rename(&mut self, old: &str, new: &str, host: &mut dyn HostDocument) -> Result<()> {
        if !self.variables.contains_key(old) {
            return Err(StoreError::UnknownVariable {
                name: old.to_string(),
            });
        }
        self.check_available(new)?;

        if let Some(mut variable) = self.variables.shift_remove(old) {
            variable.set_name(new);
            host.set_tag(variable.backing(), &self.tag_for(new));
            self.variables.insert(new.to_string(), variable);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Variable names; order carries no meaning
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Suggest a free name derived from `base`.
    ///
    /// A trailing `_<n>` on `base` is stripped and counting resumes at `n + 1`;
    /// otherwise counting starts at 2. The first `<stem>_<k>` not taken wins.
    /// A `base` that is not a valid name is replaced by `variable`, so the
    /// suggestion is always accepted by [`VariableRegistry::register`].
    pub fn unique_name(&self, base: &str) -> String {
        let base = if is_valid_name(base) { base } else { "variable" };
        let numbered = numbered_suffix().captures(base).and_then(|caps| {
            let stem = caps.get(1)?.as_str();
            let n = caps.get(2)?.as_str().parse::<u64>().ok()?;
            Some((stem, n.checked_add(1)?))
        });
        let (stem, mut counter) = match numbered {
            Some((stem, next)) if is_valid_name(stem) => (stem, next),
            // Suffix too large to count from: number the whole name instead
            _ => (base, 2),
        };
        loop {
            let candidate = format!("{}_{}", stem, counter);
            if !self.contains(&candidate) {
                return candidate;
            }
            counter = counter.saturating_add(1);
        }
    }
}
