//! Clients for the platform services this API depends on.

pub mod metadata;
pub mod queue;

use dataops_core::error::CoreError;

/// Errors from an upstream service call.
#[derive(Debug, thiserror::Error)]
pub enum ServiceClientError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("{service} returned {status}: {body}")]
    ApiError {
        service: &'static str,
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl From<ServiceClientError> for CoreError {
    fn from(err: ServiceClientError) -> Self {
        match err {
            // Anything but a body decode failure means the service could not be reached.
            ServiceClientError::Request(e) if !e.is_decode() => {
                CoreError::ServiceNotAvailable(e.to_string())
            }
            other => CoreError::Unhandled(other.to_string()),
        }
    }
}

/// Return the response if its status is 2xx, otherwise an
/// [`ServiceClientError::ApiError`] carrying the body.
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ServiceClientError::ApiError {
            service,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}
