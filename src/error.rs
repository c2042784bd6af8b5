/// Error types for in-memory package storage operations.
use thiserror::Error;

/// Errors raised by the storage, stream and relationship layers.
///
/// Variants fall into three caller-visible categories: not-found,
/// invalid-argument and unsupported-operation. Use the `is_*` predicates
/// to branch on the category rather than matching every variant.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Part not found: {0}")]
    PartNotFound(String),

    #[error("Relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("Storage element not found: {0}")]
    StorageNotFound(String),

    #[error("Element already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid part path: {0}")]
    InvalidPath(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Stream not connected: {0}")]
    NotConnected(String),

    #[error("XML parsing error: {0}")]
    Xml(String),

    #[error("Quick-XML error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Attribute error: {0}")]
    Attr(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// True for every "requested thing does not exist" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::PartNotFound(_)
                | StorageError::RelationshipNotFound(_)
                | StorageError::StorageNotFound(_)
        )
    }

    /// True for out-of-range positions and malformed paths.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            StorageError::InvalidArgument(_) | StorageError::InvalidPath(_)
        )
    }

    /// True for operations the in-memory engine does not implement.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, StorageError::Unsupported(_))
    }
}

impl From<quick_xml::events::attributes::AttrError> for StorageError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        StorageError::Attr(err.to_string())
    }
}

impl From<StorageError> for std::io::Error {
    fn from(err: StorageError) -> Self {
        use std::io::ErrorKind;

        match err {
            StorageError::Io(e) => e,
            other => {
                let kind = if other.is_not_found() {
                    ErrorKind::NotFound
                } else if other.is_invalid_argument() {
                    ErrorKind::InvalidInput
                } else if other.is_unsupported() {
                    ErrorKind::Unsupported
                } else if matches!(other, StorageError::NotConnected(_)) {
                    ErrorKind::NotConnected
                } else if matches!(other, StorageError::AlreadyExists(_)) {
                    ErrorKind::AlreadyExists
                } else {
                    ErrorKind::Other
                };
                std::io::Error::new(kind, other)
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
