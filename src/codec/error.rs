//! Annotation decode errors.

use thiserror::Error;

/// Why an annotation value could not be decoded.
///
/// A decode either yields the whole value or one of these; there are no
/// partial results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown plot template '{0}'")]
    UnknownTemplate(String),

    #[error("malformed segment '{0}'")]
    MalformedSegment(String),

    #[error("parameter '{0}' appears more than once")]
    DuplicateParameter(String),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("malformed port '{0}', expected <module>:<port>")]
    MalformedPort(String),

    #[error("invalid module id '{0}'")]
    BadModuleId(String),

    #[error("invalid connection id '{0}'")]
    BadConnectionId(String),
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
