//! In-memory host document.
//!
//! Keeps annotations, tags and variable types in ordered maps and can be
//! saved to / loaded from JSON, which makes the save/reload cycle of a real
//! host reproducible in tests.

use super::{Annotation, DocumentHost, HostDocument};
use crate::error::{Result, ResultExt, StoreError};
use crate::id::{DocumentId, Version};
use crate::types::{Variable, VariableType};
use crate::variables::VariableSource;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

/// A host document held entirely in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    id: DocumentId,
    name: String,
    next_version: u64,
    #[serde(default)]
    annotations: BTreeMap<u64, BTreeMap<String, String>>,
    #[serde(default)]
    tags: BTreeMap<u64, String>,
    #[serde(default)]
    variable_types: BTreeMap<u64, VariableType>,
}

impl MemoryDocument {
    pub fn new(id: DocumentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            next_version: 1,
            annotations: BTreeMap::new(),
            tags: BTreeMap::new(),
            variable_types: BTreeMap::new(),
        }
    }

    /// Allocate a new version number
    pub fn add_version(&mut self) -> Version {
        let v = Version(self.next_version);
        self.next_version += 1;
        v
    }

    /// Allocate a version materializing a variable of type `var_type`
    pub fn add_variable_version(&mut self, var_type: VariableType) -> Version {
        let v = self.add_version();
        self.variable_types.insert(v.0, var_type);
        v
    }

    /// Number of annotations across all versions
    pub fn annotation_count(&self) -> usize {
        self.annotations.values().map(BTreeMap::len).sum()
    }

    pub fn tag(&self, version: Version) -> Option<&str> {
        self.tags.get(&version.0).map(String::as_str)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Save the document as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).with_context(|| format!("Writing {}", path.display()))
    }

    /// Load a document saved with [`MemoryDocument::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json =
            std::fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
        Self::from_json(&json)
    }
}

impl HostDocument for MemoryDocument {
    fn id(&self) -> DocumentId {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn annotations(&self) -> Vec<Annotation> {
        self.annotations
            .iter()
            .flat_map(|(version, entries)| {
                entries
                    .iter()
                    .map(move |(key, value)| Annotation::new(Version(*version), key, value))
            })
            .collect()
    }

    fn annotation(&self, version: Version, key: &str) -> Option<String> {
        self.annotations
            .get(&version.0)
            .and_then(|entries| entries.get(key))
            .cloned()
    }

    fn set_annotation(&mut self, version: Version, key: &str, value: &str) {
        self.annotations
            .entry(version.0)
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    fn clear_annotation(&mut self, version: Version, key: &str) {
        if let Some(entries) = self.annotations.get_mut(&version.0) {
            entries.remove(key);
            if entries.is_empty() {
                self.annotations.remove(&version.0);
            }
        }
    }

    fn tags(&self) -> Vec<(Version, String)> {
        self.tags
            .iter()
            .map(|(v, tag)| (Version(*v), tag.clone()))
            .collect()
    }

    fn set_tag(&mut self, version: Version, tag: &str) {
        self.tags.insert(version.0, tag.to_string());
    }

    fn clear_tag(&mut self, version: Version) {
        self.tags.remove(&version.0);
    }

    fn variable_type(&self, version: Version) -> Option<VariableType> {
        self.variable_types.get(&version.0).cloned()
    }
}

/// Materializes variables as fresh versions of a [`MemoryDocument`].
///
/// Works with any [`HostDocument`]; when the document is not a
/// `MemoryDocument` the caller supplies the version up front.
#[derive(Debug, Clone)]
pub struct MemorySource {
    var_type: VariableType,
    document: Option<Rc<RefCell<MemoryDocument>>>,
    version: Option<Version>,
}

impl MemorySource {
    /// Allocate the backing version in `document` on materialize
    pub fn new(document: &Rc<RefCell<MemoryDocument>>, var_type: VariableType) -> Self {
        Self {
            var_type,
            document: Some(Rc::clone(document)),
            version: None,
        }
    }

    /// Use an already existing backing version
    pub fn at_version(version: Version, var_type: VariableType) -> Self {
        Self {
            var_type,
            document: None,
            version: Some(version),
        }
    }
}

impl VariableSource for MemorySource {
    fn materialize(&self, name: &str, _host: &mut dyn HostDocument) -> Result<Variable> {
        let backing = match (&self.document, self.version) {
            (_, Some(v)) => v,
            (Some(doc), None) => doc
                .try_borrow_mut()
                .map_err(|e| StoreError::Materialize(e.to_string()))?
                .add_variable_version(self.var_type.clone()),
            (None, None) => {
                return Err(StoreError::Materialize(format!(
                    "no backing version for '{}'",
                    name
                )))
            }
        };
        Ok(Variable::new(name, self.var_type.clone(), backing))
    }
}

#[derive(Debug, Default)]
struct HostState {
    documents: BTreeMap<DocumentId, Rc<RefCell<MemoryDocument>>>,
    released: Vec<DocumentId>,
}

/// A [`DocumentHost`] serving [`MemoryDocument`]s.
///
/// Clones share state, so a test can keep one clone while the registry owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    inner: Rc<RefCell<HostState>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a document available to [`DocumentHost::open`]
    pub fn insert(&self, document: MemoryDocument) -> Rc<RefCell<MemoryDocument>> {
        let id = document.id;
        let handle = Rc::new(RefCell::new(document));
        self.inner
            .borrow_mut()
            .documents
            .insert(id, Rc::clone(&handle));
        handle
    }

    pub fn document(&self, id: DocumentId) -> Option<Rc<RefCell<MemoryDocument>>> {
        self.inner.borrow().documents.get(&id).cloned()
    }

    /// Documents whose presentation resources were released, in order
    pub fn released(&self) -> Vec<DocumentId> {
        self.inner.borrow().released.clone()
    }
}

impl DocumentHost for MemoryHost {
    fn open(&mut self, id: DocumentId) -> Box<dyn HostDocument> {
        let mut state = self.inner.borrow_mut();
        let handle = state
            .documents
            .entry(id)
            .or_insert_with(|| {
                Rc::new(RefCell::new(MemoryDocument::new(
                    id,
                    format!("untitled-{}", id.0),
                )))
            })
            .clone();
        Box::new(handle)
    }

    fn release(&mut self, id: DocumentId) {
        self.inner.borrow_mut().released.push(id);
    }
}
