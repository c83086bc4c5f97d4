//! Error handling for the recipe store
//!
//! This module defines the error type surfaced to callers and a Result alias
//! for use throughout the crate. Annotation decode failures have their own
//! type in [`crate::codec::DecodeError`] and never reach this one.

use crate::id::Version;
use thiserror::Error;

/// Main error type for recipe store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// A variable with this name already exists in the document
    #[error("A variable named '{name}' already exists")]
    NamingConflict { name: String },

    /// Name does not follow the variable / template naming rules
    #[error("Invalid name: '{name}'")]
    InvalidName { name: String },

    /// No variable with this name in the document
    #[error("Unknown variable: '{name}'")]
    UnknownVariable { name: String },

    /// Parameter not declared by the plot template
    #[error("Template '{template}' has no parameter '{parameter}'")]
    UnknownParameter { template: String, parameter: String },

    /// A template with this id is already registered
    #[error("Template '{id}' is already registered")]
    DuplicateTemplate { id: String },

    /// The materialized version already backs another variable
    #[error("Version {version} already backs variable '{existing}'")]
    BackingInUse { version: Version, existing: String },

    /// No document was given and none is active
    #[error("No active document")]
    NoActiveDocument,

    /// The variable source failed to materialize the variable
    #[error("Materialize error: {0}")]
    Materialize(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        StoreError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping any context wrappers
    pub fn root(&self) -> &StoreError {
        match self {
            StoreError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error (ignoring context) is a naming conflict
    pub fn is_naming_conflict(&self) -> bool {
        matches!(self.root(), StoreError::NamingConflict { .. })
    }
}

/// Result type alias for recipe store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| StoreError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| StoreError::Io(e).with_context(f()))
    }
}
