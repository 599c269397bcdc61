//! Domain error types
//!
//! `DomainError` covers construction-time validation of newtypes/entities.
//! `CoreError` is the taxonomy every component maps into: auth, not-found,
//! validation, transient provider, business provider, and internal bugs.

use thiserror::Error;

/// Errors raised while constructing or mutating domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid path format or content.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid state transition attempt.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state.
        from: String,
        /// The attempted target state.
        to: String,
    },

    /// Generic validation failure.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Invalid remote path format.
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Invalid remote ID format.
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// ID parsing error.
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Unknown `DriveType`/`SyncMethod`/enum wire value.
    #[error("Unknown {kind} value: {value}")]
    UnknownEnumValue {
        /// The enum this value was decoded for, e.g. `"DriveType"`.
        kind: String,
        /// The rejected wire value.
        value: String,
    },
}

/// The error taxonomy shared by every component (spec §7).
///
/// Providers and repositories raise their own local `thiserror` enums and
/// convert into this one at the boundary where the sync executor, scheduler,
/// or CLI need a single type to branch on.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Credentials missing, rejected, or expired. Future runs for the same
    /// account keep failing until credentials are refreshed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Config, account, share, or path not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad cron expression, malformed rule JSON, empty/root-only share path.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Network, timeout, 5xx, or rate-limit response. Retried with backoff
    /// inside the provider client; surfaced only after retries are
    /// exhausted.
    #[error("transient provider error: {0}")]
    ProviderTransient(String),

    /// Quota exceeded, duplicate, share revoked, size/batch limit. Not
    /// retried; recorded against the failing `SyncTaskItem`.
    #[error("provider rejected the request: {0}")]
    ProviderBusiness(String),

    /// Invariant violation or unexpected state; fails the whole task.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

impl CoreError {
    /// `true` for errors the provider-client retry loop should retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::ProviderTransient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_display() {
        let err = DomainError::InvalidPath("/bad/path".to_string());
        assert_eq!(err.to_string(), "Invalid path: /bad/path");

        let err = DomainError::InvalidState {
            from: "Pending".to_string(),
            to: "Completed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from Pending to Completed"
        );
    }

    #[test]
    fn domain_error_equality_and_clone() {
        let err1 = DomainError::InvalidPath("/path".to_string());
        let err2 = err1.clone();
        let err3 = DomainError::InvalidPath("/other".to_string());
        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }

    #[test]
    fn core_error_classifies_transient() {
        assert!(CoreError::ProviderTransient("timeout".into()).is_transient());
        assert!(!CoreError::ProviderBusiness("quota".into()).is_transient());
        assert!(!CoreError::Auth("bad token".into()).is_transient());
    }

    #[test]
    fn domain_error_converts_to_validation() {
        let domain = DomainError::InvalidRemotePath("bad".into());
        let core: CoreError = domain.into();
        assert!(matches!(core, CoreError::Validation(_)));
    }
}
