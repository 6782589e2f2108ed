/// Domain error taxonomy shared by every component.
///
/// The HTTP layer maps each variant to a fixed status code; see
/// `dataops_api::error::AppError`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Service not available: {0}")]
    ServiceNotAvailable(String),

    #[error("Unhandled error: {0}")]
    Unhandled(String),
}
