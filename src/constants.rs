//! # Constants
//!
//! Shared constants used throughout the harness.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default interval between two evaluations of a wait predicate (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default deadline for each stage of the operator deployment wait (seconds)
pub const DEFAULT_OPERATOR_TIMEOUT_SECS: u64 = 180;

/// Default deadline for a created resource to become ready (seconds)
pub const DEFAULT_RESOURCE_READY_TIMEOUT_SECS: u64 = 180;

/// Default deadline for an updated resource to become ready again (seconds)
pub const DEFAULT_RESOURCE_UPDATE_TIMEOUT_SECS: u64 = 120;

/// Default deadline for a deleted resource to disappear (seconds)
pub const DEFAULT_RESOURCE_DELETE_TIMEOUT_SECS: u64 = 180;

/// Product prefix of the operator deployment name
pub const DEFAULT_OPERATOR_BASE_NAME: &str = "activemq-artemis";

/// Current operator naming convention
pub const OPERATOR_NEW_NAME_SUFFIX: &str = "-controller-manager";

/// Naming convention used by operator releases before the rename
pub const OPERATOR_OLD_NAME_SUFFIX: &str = "-operator";

/// Field manager recorded on objects written by the harness
pub const FIELD_MANAGER: &str = "broker-operator-testkit";

/// Condition type reported once the operator created all broker resources
pub const CONDITION_TYPE_DEPLOYED: &str = "Deployed";

/// Condition type reported once every other condition holds
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Condition type reported by spec validation
pub const CONDITION_TYPE_VALID: &str = "Valid";

/// Reason used when a dependent resource could not be created
pub const CONDITION_REASON_RESOURCE_ERROR: &str = "ResourceError";

/// Reason used by `Ready` while other conditions are still pending
pub const CONDITION_REASON_WAITING_FOR_ALL_CONDITIONS: &str = "WaitingForAllConditions";

/// Maximum length of a Kubernetes label value / DNS-1123 label
pub const MAX_DNS_LABEL_LENGTH: usize = 63;

/// Infix between a broker name and its statefulset ordinal
pub const STATEFULSET_SUFFIX: &str = "-ss";
