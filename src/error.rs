use std::io;
use hex::FromHexError;

/// Errors raised while parsing or building SWHIDs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwhidError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),
    #[error("Invalid version: {0}")]
    InvalidVersion(String),
    #[error("Invalid object type: {0}")]
    InvalidObjectType(String),
    #[error("Invalid hash: {0}")]
    InvalidHash(String),
    #[error("Invalid hash length: {0} (expected 20)")]
    InvalidHashLength(usize),
    #[error("Invalid qualifier: {0}")]
    InvalidQualifier(String),
    #[error("Invalid qualifier value: {0}")]
    InvalidQualifierValue(String),
    #[error("Unknown qualifier: {0}")]
    UnknownQualifier(String),
}

impl From<FromHexError> for SwhidError {
    fn from(err: FromHexError) -> Self {
        SwhidError::InvalidHash(err.to_string())
    }
}

/// Coarse classification of a [`ContextError`], as seen from the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotFound,
    BackendUnavailable,
}

impl ErrorKind {
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::BadInput => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::BackendUnavailable => 503,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("{0}")]
    BadInput(String),
    /// The message names the missing entity and the scope it was searched in.
    #[error("{0}")]
    NotFound(String),
    #[error("Alias cycle detected while resolving branch {0}")]
    CycleDetected(String),
    #[error(transparent)]
    Swhid(#[from] SwhidError),
    #[error("Archive backend error: {0}")]
    Backend(String),
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ContextError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContextError::BadInput(_)
            | ContextError::CycleDetected(_)
            | ContextError::Swhid(_) => ErrorKind::BadInput,
            ContextError::NotFound(_) => ErrorKind::NotFound,
            ContextError::Backend(_)
            | ContextError::Git(_)
            | ContextError::Io(_)
            | ContextError::Json(_) => ErrorKind::BackendUnavailable,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ContextError::NotFound(msg.into())
    }

    pub fn bad_input(msg: impl Into<String>) -> Self {
        ContextError::BadInput(msg.into())
    }
}

pub type Result<T, E = ContextError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ContextError::not_found("x").kind().http_status(), 404);
        assert_eq!(ContextError::bad_input("x").kind().http_status(), 400);
        assert_eq!(ContextError::Backend("down".into()).kind().http_status(), 503);
        assert_eq!(
            ContextError::from(SwhidError::InvalidHashLength(3)).kind(),
            ErrorKind::BadInput
        );
    }

    #[test]
    fn test_not_found_message_is_verbatim() {
        let err = ContextError::not_found("Branch foo for snapshot with id abc not found!");
        assert_eq!(err.to_string(), "Branch foo for snapshot with id abc not found!");
    }
}
