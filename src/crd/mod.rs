//! # Custom Resource Definitions
//!
//! Typed broker custom resources managed by the operator under test.
//!
//! ## Module Structure
//!
//! - `broker.rs` - `ActiveMQArtemis` (broker deployment)
//! - `address.rs` - `ActiveMQArtemisAddress` (address and queue)

mod address;
mod broker;

pub use address::{ActiveMQArtemisAddress, ActiveMQArtemisAddressSpec};
pub use broker::{
    Acceptor, ActiveMQArtemis, ActiveMQArtemisSpec, ActiveMQArtemisStatus, Console,
    DeploymentPlan, EnvVar, ResourceRequirements, Storage,
};
