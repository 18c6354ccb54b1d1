//! # Errors
//!
//! Error taxonomy of the harness.
//!
//! None of these errors are caught or downgraded inside the waiter, the name
//! resolver or the lifecycle types: they surface unmodified to the caller,
//! which decides whether a failure was the expected outcome of a negative
//! test.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// Invalid wait parameters or harness configuration, rejected before any
    /// polling happens
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A wait predicate never held within its deadline
    #[error("Timed out after {elapsed:?} {description} (last observed: {last_observed})")]
    WaitTimeout {
        description: String,
        elapsed: Duration,
        last_observed: String,
    },

    /// More than one naming candidate exists while uniqueness was required
    #[error("Ambiguous name, several candidates exist: {}", candidates.join(", "))]
    AmbiguousName { candidates: Vec<String> },

    /// The queried condition exists but does not carry the expected fields
    #[error("Condition {condition_type} does not match: expected {expected}, observed {observed}")]
    StatusMismatch {
        condition_type: String,
        expected: String,
        observed: String,
    },

    /// An operation that needs an existing object found none
    #[error("{kind} {namespace}/{name} not found")]
    ResourceNotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// Lifecycle operation not allowed from the current state
    #[error("Cannot {operation} while operator is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// Object body lacks the fields needed to address it
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HarnessError {
    /// Build a [`HarnessError::ResourceNotFound`] from borrowed parts
    pub fn not_found(kind: &str, namespace: &str, name: &str) -> Self {
        Self::ResourceNotFound {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Whether this error is a wait deadline expiry
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::WaitTimeout { .. })
    }
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_timeout_message_contains_description() {
        let err = HarnessError::WaitTimeout {
            description: "waiting for broker to be ready".to_string(),
            elapsed: Duration::from_secs(10),
            last_observed: "Ready=False".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("waiting for broker to be ready"));
        assert!(message.contains("Ready=False"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_ambiguous_name_lists_candidates() {
        let err = HarnessError::AmbiguousName {
            candidates: vec!["a-controller-manager".to_string(), "a-operator".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Ambiguous name, several candidates exist: a-controller-manager, a-operator"
        );
    }
}
