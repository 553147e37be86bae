use linkstub_codec::DecodeError;
use thiserror::Error;

/// Result type for link store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures surfaced by a key-value backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend operation timed out: {0}")]
    Timeout(String),
    #[error("backend operation failed: {0}")]
    Operation(String),
}

/// Shape mismatches found while rebuilding a stored record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' holds invalid value '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

/// Caller-facing errors of the link store.
///
/// The variants keep bad input, absent records, and backend failures apart so
/// an HTTP layer can map them to distinct status codes.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The short code is not decodable into an identifier.
    #[error("invalid short code: {0}")]
    InvalidCode(#[from] DecodeError),
    /// No live record exists for the decoded identifier.
    #[error("no link found")]
    NotFound,
    /// The stored record cannot be deserialized into the expected shape.
    #[error("malformed link record: {0}")]
    MalformedRecord(#[from] RecordError),
    /// Identifier allocation gave up after repeated collisions.
    #[error("identifier allocation failed after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },
    /// The backend failed; the underlying error is preserved.
    #[error(transparent)]
    Backend(#[from] BackendError),
}
