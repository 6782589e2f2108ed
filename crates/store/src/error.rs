use dataops_core::error::CoreError;

/// Failure talking to the shared store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No connection could be checked out of the pool.
    #[error("Store pool error: {0}")]
    Pool(String),

    /// The store rejected or failed a command.
    #[error("Store command failed: {0}")]
    Command(#[from] deadpool_redis::redis::RedisError),

    /// A request the store refuses, e.g. a non-increasing explicit log id.
    #[error("Store rejected request: {0}")]
    Rejected(String),

    /// A stored value could not be decoded.
    #[error("Stored value could not be decoded: {0}")]
    Encoding(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Encoding(msg) => CoreError::Unhandled(msg),
            other => CoreError::ServiceNotAvailable(other.to_string()),
        }
    }
}
