//! # Lifecycle
//!
//! - `operator.rs` - deploy/undeploy of the operator under test
//! - `resource.rs` - create/update/delete and readiness of managed resources

mod operator;
mod resource;

pub use operator::{InstallMethod, OperatorIdentity, OperatorLifecycleController, OperatorState};
pub use resource::{
    volume_claim_name, CreateOptions, ManagedResource, ResourceLifecycleManager, UpdateOptions,
    UpdateOutcome,
};
