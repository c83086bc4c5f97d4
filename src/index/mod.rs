//! Pipeline index: which realized pipeline version belongs to which recipe.
//!
//! Three maps are kept consistent with each other and with the document's
//! annotations:
//!
//! ```text
//! version_to_record : Version      → PipelineRecord   (source of truth in memory)
//! recipe_to_version : Recipe       → Version          (latest version built for a recipe)
//! cell_to_version   : CellLocation → Version          (what each cell displays)
//! ```
//!
//! The annotations are authoritative: the maps are rebuilt from them by
//! [`PipelineIndex::load`], and every mutating call writes through to the
//! document before it returns.
//!
//! Nothing in here fails. Annotations that do not decode mean "no
//! association for that version"; inconsistencies are logged and repaired.

use crate::catalog::TemplateLookup;
use crate::codec;
use crate::config::{AnnotationKeys, StoreConfig};
use crate::host::HostDocument;
use crate::id::Version;
use crate::types::{CellLocation, PipelineRecord, PortMap, Recipe, VarMap};
use crate::variables::VariableRegistry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Default)]
pub struct PipelineIndex {
    keys: AnnotationKeys,
    version_to_record: BTreeMap<Version, PipelineRecord>,
    recipe_to_version: HashMap<Recipe, Version>,
    cell_to_version: HashMap<CellLocation, Version>,
}

impl PipelineIndex {
    /// An empty index writing annotations under `keys`
    pub fn new(keys: AnnotationKeys) -> Self {
        Self {
            keys,
            ..Default::default()
        }
    }

    /// Rebuild the index from the document's annotations.
    ///
    /// Recipes are resolved against `variables`, which must already hold the
    /// document's variables. Port/var-map annotations on versions without
    /// any recipe annotation are orphans: they are reported and, if
    /// `purge_orphan_maps` is set, cleared from the document.
    pub fn load(
        host: &mut dyn HostDocument,
        variables: &VariableRegistry,
        templates: &dyn TemplateLookup,
        config: &StoreConfig,
    ) -> Self {
        let mut index = Self::new(config.annotation_keys.clone());
        let annotations = host.annotations();
        let doc_name = host.name();

        let mut recipe_versions = BTreeSet::new();
        let mut recipes: Vec<_> = annotations
            .iter()
            .filter(|an| an.key == index.keys.recipe)
            .collect();
        recipes.sort_by_key(|an| an.version);

        for an in recipes {
            recipe_versions.insert(an.version);
            match codec::parse_recipe(&an.value, templates, |name| variables.get(name)) {
                Ok(recipe) => {
                    // Later versions win the reverse mapping
                    index.recipe_to_version.insert(recipe.clone(), an.version);
                    index.version_to_record.insert(
                        an.version,
                        PipelineRecord {
                            version: an.version,
                            recipe,
                            port_map: PortMap::new(),
                            var_map: VarMap::new(),
                        },
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        "Ignoring recipe annotation at version {} of {}: {}",
                        an.version,
                        doc_name,
                        e
                    );
                }
            }
        }

        let mut orphans = Vec::new();
        for an in annotations
            .iter()
            .filter(|an| index.keys.is_map_key(&an.key))
        {
            if !recipe_versions.contains(&an.version) {
                tracing::warn!(
                    "Found a {} annotation at version {} of {} with no associated recipe -- removing",
                    an.key,
                    an.version,
                    doc_name
                );
                orphans.push((an.version, an.key.clone()));
                continue;
            }

            let Some(record) = index.version_to_record.get_mut(&an.version) else {
                // Recipe exists but did not decode; leave its maps alone
                continue;
            };
            if an.key == index.keys.ports {
                match codec::parse_port_map(&an.value) {
                    Ok(pm) => record.port_map = pm,
                    Err(e) => tracing::debug!(
                        "Ignoring port map at version {} of {}: {}",
                        an.version,
                        doc_name,
                        e
                    ),
                }
            } else {
                match codec::parse_var_map(&an.value) {
                    Ok(vm) => record.var_map = vm,
                    Err(e) => tracing::debug!(
                        "Ignoring var map at version {} of {}: {}",
                        an.version,
                        doc_name,
                        e
                    ),
                }
            }
        }

        if config.purge_orphan_maps {
            for (version, key) in orphans {
                host.clear_annotation(version, &key);
            }
        }

        tracing::debug!(
            "Loaded {} pipeline record(s) from {}",
            index.version_to_record.len(),
            doc_name
        );
        index
    }

    fn write_annotations(&self, host: &mut dyn HostDocument, record: &PipelineRecord) {
        host.set_annotation(
            record.version,
            &self.keys.recipe,
            &codec::encode_recipe(&record.recipe),
        );
        host.set_annotation(
            record.version,
            &self.keys.ports,
            &codec::encode_port_map(&record.port_map),
        );
        host.set_annotation(
            record.version,
            &self.keys.vars,
            &codec::encode_var_map(&record.var_map),
        );
    }

    fn clear_annotations(&self, host: &mut dyn HostDocument, version: Version) {
        for key in self.keys.all() {
            host.clear_annotation(version, key);
        }
    }

    /// Record that `version` was realized from `recipe` and is shown in `cell`.
    ///
    /// Replacing a different recipe on a known version, or building a new
    /// version for a recipe already mapped elsewhere, is allowed but warned
    /// about: both usually mean the caller worked from stale state.
    pub fn created(
        &mut self,
        host: &mut dyn HostDocument,
        cell: CellLocation,
        version: Version,
        recipe: Recipe,
        port_map: PortMap,
        var_map: VarMap,
    ) {
        if let Some(existing) = self.version_to_record.get(&version) {
            if existing.recipe != recipe {
                tracing::warn!(
                    "Version {} of {} already holds recipe {:?}, replacing it with {:?}",
                    version,
                    host.name(),
                    codec::encode_recipe(&existing.recipe),
                    codec::encode_recipe(&recipe)
                );
                if self.recipe_to_version.get(&existing.recipe) == Some(&version) {
                    self.recipe_to_version.remove(&existing.recipe);
                }
            }
        }

        if let Some(&known) = self.recipe_to_version.get(&recipe) {
            if known != version {
                tracing::warn!(
                    "A new pipeline with a known recipe was created in {}: version {} (previously version {})",
                    host.name(),
                    version,
                    known
                );
            }
        }

        let record = PipelineRecord {
            version,
            recipe,
            port_map,
            var_map,
        };
        self.recipe_to_version.insert(record.recipe.clone(), version);
        self.cell_to_version.insert(cell, version);
        self.write_annotations(host, &record);
        self.version_to_record.insert(version, record);
    }

    pub fn lookup_by_version(&self, version: Version) -> Option<&PipelineRecord> {
        self.version_to_record.get(&version)
    }

    pub fn lookup_by_cell(&self, cell: &CellLocation) -> Option<&PipelineRecord> {
        self.cell_to_version
            .get(cell)
            .and_then(|v| self.version_to_record.get(v))
    }

    /// Latest version realized from `recipe`
    pub fn lookup_by_recipe(&self, recipe: &Recipe) -> Option<Version> {
        self.recipe_to_version.get(recipe).copied()
    }

    /// Cells currently showing `version`
    pub fn cells_for(&self, version: Version) -> Vec<&CellLocation> {
        let mut cells: Vec<_> = self
            .cell_to_version
            .iter()
            .filter(|(_, v)| **v == version)
            .map(|(c, _)| c)
            .collect();
        cells.sort();
        cells
    }

    /// Forget what `cell` shows. Records are kept.
    pub fn clear_cell(&mut self, cell: &CellLocation) -> Option<Version> {
        self.cell_to_version.remove(cell)
    }

    /// Records ordered by version
    pub fn records(&self) -> impl Iterator<Item = &PipelineRecord> {
        self.version_to_record.values()
    }

    pub fn len(&self) -> usize {
        self.version_to_record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.version_to_record.is_empty()
    }

    fn versions_referencing(&self, name: &str) -> Vec<Version> {
        self.version_to_record
            .values()
            .filter(|r| r.recipe.references(name))
            .map(|r| r.version)
            .collect()
    }

    /// Rewrite every recipe binding `old` to bind `new`, in memory and in the
    /// document. Returns the number of records touched.
    pub fn on_variable_renamed(&mut self, host: &mut dyn HostDocument, old: &str, new: &str) -> usize {
        let affected = self.versions_referencing(old);
        for version in &affected {
            let Some(record) = self.version_to_record.get_mut(version) else {
                continue;
            };
            let was_latest = self.recipe_to_version.get(&record.recipe) == Some(version);
            if was_latest {
                self.recipe_to_version.remove(&record.recipe);
            }
            record.recipe.rename_variable(old, new);
            if was_latest {
                self.recipe_to_version.insert(record.recipe.clone(), *version);
            }
            host.set_annotation(
                *version,
                &self.keys.recipe,
                &codec::encode_recipe(&record.recipe),
            );
        }
        affected.len()
    }

    /// Drop every record whose recipe binds `name` and clear its annotations.
    ///
    /// Returns the dropped records.
    pub fn on_variable_removed(
        &mut self,
        host: &mut dyn HostDocument,
        name: &str,
    ) -> Vec<PipelineRecord> {
        let affected = self.versions_referencing(name);
        if !affected.is_empty() {
            tracing::warn!(
                "Variable {:?} was used in {} pipeline(s) of {}",
                name,
                affected.len(),
                host.name()
            );
        }

        let mut dropped = Vec::with_capacity(affected.len());
        for version in affected {
            let Some(record) = self.version_to_record.remove(&version) else {
                continue;
            };
            if self.recipe_to_version.get(&record.recipe) == Some(&version) {
                self.recipe_to_version.remove(&record.recipe);
            }
            self.cell_to_version.retain(|_, v| *v != version);
            self.clear_annotations(host, version);
            dropped.push(record);
        }
        dropped
    }
}
