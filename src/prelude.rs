//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use broker_operator_testkit::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Collaborators
pub use crate::clock::{Clock, TokioClock};
pub use crate::cluster::{
    ClusterQuery, KubeCluster, ObjectManifest, ObjectRef, ObjectSnapshot, Provisioner,
    ResourceKind,
};

// Lifecycle
pub use crate::lifecycle::{
    volume_claim_name, CreateOptions, InstallMethod, ManagedResource, OperatorIdentity,
    OperatorLifecycleController, OperatorState, ResourceLifecycleManager, UpdateOptions,
    UpdateOutcome,
};

// Conditions, waits and names
pub use crate::naming::{NamePolicy, Resolution, ResourceNameResolver};
pub use crate::status::{ConditionQuery, ConditionStatus, StatusCondition};
pub use crate::wait::{wait_for, wait_until, Observation, WaitSpec};

// Config and context
pub use crate::config::HarnessConfig;
pub use crate::context::{ExecutionContext, SuiteFixture};

// Errors
pub use crate::error::{HarnessError, Result};
