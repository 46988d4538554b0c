//! Error taxonomy shared across every subsystem.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("invalid argument: {0}")]
    ArgumentInvalid(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("document not found: {collection}/{id}")]
    DocumentNotFound { collection: String, id: String },

    #[error("role not found: {0}")]
    RoleNotFound(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(u64),

    #[error("document already exists: {collection}/{id}")]
    DocumentAlreadyExists { collection: String, id: String },

    #[error("role already exists: {0}")]
    RoleAlreadyExists(String),

    #[error("index already exists: {0}")]
    IndexAlreadyExists(String),

    #[error("index not found: {0}")]
    IndexNotFound(String),

    #[error("duplicate key in unique index {index}: {key}")]
    DuplicateKey { index: String, key: String },

    #[error("unique constraint violated on {0}")]
    UniqueViolation(String),

    #[error("atomic update error: {op} at '{path}': {reason}")]
    AtomicUpdateError {
        op: &'static str,
        path: String,
        reason: String,
    },

    #[error("transaction error: invalid state transition from {0:?}")]
    TransactionError(crate::transaction::TransactionState),

    #[error("lock timeout on resource {0}")]
    LockTimeout(String),

    #[error("deadlock detected, transaction aborted")]
    LockDeadlock,

    #[error("lock request denied on resource {0}")]
    LockDenied(String),

    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("protocol error: malformed header")]
    MalformedHeader,

    #[error("protocol error: unsupported version {0}")]
    BadVersion(u16),

    #[error("protocol error: checksum mismatch")]
    BadChecksum,

    #[error("protocol error: payload too large ({0} bytes)")]
    PayloadTooLarge(usize),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("wal corruption detected")]
    WalCorruption,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::CollectionNotFound(_)
                | StoreError::DocumentNotFound { .. }
                | StoreError::RoleNotFound(_)
                | StoreError::TransactionNotFound(_)
                | StoreError::IndexNotFound(_)
        )
    }

    /// Stable machine-readable error code for wire responses (§6: `{code, message}`).
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidName(_) => "INVALID_NAME",
            StoreError::ArgumentInvalid(_) => "ARGUMENT_INVALID",
            StoreError::CollectionNotFound(_) => "COLLECTION_NOT_FOUND",
            StoreError::DocumentNotFound { .. } => "DOCUMENT_NOT_FOUND",
            StoreError::RoleNotFound(_) => "ROLE_NOT_FOUND",
            StoreError::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            StoreError::DocumentAlreadyExists { .. } => "ALREADY_EXISTS",
            StoreError::RoleAlreadyExists(_) => "ALREADY_EXISTS",
            StoreError::IndexAlreadyExists(_) => "ALREADY_EXISTS",
            StoreError::IndexNotFound(_) => "INDEX_NOT_FOUND",
            StoreError::DuplicateKey { .. } => "DUPLICATE_KEY",
            StoreError::UniqueViolation(_) => "UNIQUE_VIOLATION",
            StoreError::AtomicUpdateError { .. } => "ATOMIC_UPDATE_ERROR",
            StoreError::TransactionError(_) => "TRANSACTION_ERROR",
            StoreError::LockTimeout(_) => "LOCK_TIMEOUT",
            StoreError::LockDeadlock => "LOCK_DEADLOCK",
            StoreError::LockDenied(_) => "LOCK_DENIED",
            StoreError::EncryptionError(_) => "ENCRYPTION_ERROR",
            StoreError::MalformedHeader => "PROTOCOL_MALFORMED_HEADER",
            StoreError::BadVersion(_) => "PROTOCOL_BAD_VERSION",
            StoreError::BadChecksum => "PROTOCOL_BAD_CHECKSUM",
            StoreError::PayloadTooLarge(_) => "PROTOCOL_PAYLOAD_TOO_LARGE",
            StoreError::ParseError(_) => "PARSE_ERROR",
            StoreError::WalCorruption => "WAL_CORRUPTION",
            StoreError::Io(_) => "IO_ERROR",
            StoreError::Json(_) => "JSON_ERROR",
            StoreError::Cancelled => "CANCELLED",
        }
    }
}
