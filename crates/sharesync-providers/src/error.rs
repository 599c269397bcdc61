//! Provider-local error type and retry policy.
//!
//! Transient provider errors (network, 5xx, rate-limit) are retried with
//! exponential backoff at the client layer; business errors are mapped
//! straight into [`CoreError`] and never retried.

use std::time::Duration;

use sharesync_core::domain::errors::CoreError;
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised while talking to a cloud-drive provider's HTTP API.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("business error: {0}")]
    Business(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("server error: {0}")]
    ServerError(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Transient errors are retried by [`with_retry`]; business/auth errors are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. }
                | ProviderError::ServerError(_)
                | ProviderError::Network(_)
        )
    }
}

impl From<ProviderError> for CoreError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unauthorized(msg) => CoreError::Auth(msg),
            ProviderError::NotFound(msg) => CoreError::NotFound(msg),
            ProviderError::Business(msg) => CoreError::ProviderBusiness(msg),
            ProviderError::RateLimited { retry_after } => CoreError::ProviderTransient(format!(
                "rate limited, retry after {retry_after:?}"
            )),
            ProviderError::ServerError(msg) => CoreError::ProviderTransient(msg),
            ProviderError::Network(err) => CoreError::ProviderTransient(err.to_string()),
            ProviderError::InvalidResponse(msg) => CoreError::Internal(msg),
        }
    }
}

/// Maximum retry attempts for a transient provider error (spec §4.1 recommends 3).
pub const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (1s, 2s, 4s, ...).
const BASE_DELAY_SECS: u64 = 1;

/// Runs `f` up to [`MAX_RETRIES`] additional times when it fails with a
/// transient [`ProviderError`]; business/auth errors return immediately.
pub async fn with_retry<F, Fut, T>(operation_name: &str, f: F) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, ProviderError>>,
{
    for attempt in 0..=MAX_RETRIES {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation = operation_name, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if attempt < MAX_RETRIES && err.is_transient() {
                    let delay_secs = BASE_DELAY_SECS * 2u64.pow(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        delay_secs,
                        error = %err,
                        "transient provider error, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                } else {
                    return Err(err);
                }
            }
        }
    }
    unreachable!("loop always returns on the final attempt")
}
