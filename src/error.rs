//! Error types for the credential-rotation router.
//!
//! Callers only ever see four shapes: a configuration failure at startup, an
//! unreachable fallback backend, a spent retry budget, or an unmodified
//! pass-through provider error. All rotation and backoff stays internal.

use thiserror::Error;

/// Errors surfaced at the router boundary.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Invalid or missing configuration, detected at startup and never
    /// retried at runtime.
    #[error("configuration error: {0}")]
    Config(String),

    /// No primary credential is eligible and the fallback backend cannot be
    /// reached. Fatal for the originating call.
    #[error("backend unreachable: {0}")]
    BackendUnreachable(String),

    /// The retry budget was spent while every attempt kept hitting quota
    /// limits. Distinct from a raw provider error so hosts can answer with a
    /// capacity-style response instead of a generic failure.
    #[error("quota exhausted after {attempts} attempts across the credential pool")]
    QuotaRetriesExhausted { attempts: u32 },

    /// A provider error that is not quota-related, passed through unchanged
    /// on first occurrence.
    #[error("provider error: {0}")]
    Provider(String),

    /// The shared cooldown store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RouterError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Errors from the shared cooldown store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or the connection target is invalid.
    #[error("cooldown store connection failed: {0}")]
    Connection(String),

    /// A read or write against the store failed.
    #[error("cooldown store operation failed: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// A classified error from a single backend call.
///
/// Classification happens at the client edge so the router's retry loop can
/// stay a plain bounded loop over a typed result: quota signals trigger
/// cooldown + rotation, everything else propagates untouched.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CallError {
    pub kind: CallErrorKind,
    pub message: String,
}

/// How a backend call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallErrorKind {
    /// The provider signalled that this credential's rate or usage allotment
    /// is spent.
    QuotaExhausted,

    /// Anything else: auth failures, malformed requests, content rejections,
    /// timeouts without a quota signal.
    Other,
}

impl CallError {
    pub fn quota(message: impl Into<String>) -> Self {
        Self {
            kind: CallErrorKind::QuotaExhausted,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: CallErrorKind::Other,
            message: message.into(),
        }
    }

    pub fn is_quota(&self) -> bool {
        self.kind == CallErrorKind::QuotaExhausted
    }
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_error_classification() {
        assert!(CallError::quota("429").is_quota());
        assert!(!CallError::other("bad prompt").is_quota());
    }

    #[test]
    fn test_retries_exhausted_is_not_a_provider_error() {
        let err = RouterError::QuotaRetriesExhausted { attempts: 5 };
        assert!(matches!(
            err,
            RouterError::QuotaRetriesExhausted { attempts: 5 }
        ));
        assert!(err.to_string().contains("5 attempts"));
    }
}
