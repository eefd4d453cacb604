use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// Every fallible operation in the core surfaces one of these kinds with no
/// partial state change. `ExternalService` failures from the notifier are
/// swallowed (logged) by the caller; from the payment gateway they abort the
/// operation.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or missing input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The capability check denied the acting user.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An invariant would be violated: duplicate pending payment, transition
    /// from a non-pending status, attempt quota exceeded, locked questions.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The gateway signature did not match; the payment was marked failed.
    #[error("gateway signature verification failed for order {order_ref}")]
    GatewayVerification { order_ref: String },

    /// A collaborator (gateway, notifier) was unreachable or errored.
    #[error("external service error: {0}")]
    ExternalService(String),

    /// Storage or serialization fault.
    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(Box::new(e))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(Box::new(e))
    }
}

impl From<csv::Error> for CoreError {
    fn from(e: csv::Error) -> Self {
        Self::Internal(Box::new(e))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for CoreError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Internal(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
