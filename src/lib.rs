//! Broker Operator Test Kit
//!
//! Lifecycle and readiness-polling engine for integration tests of the
//! ActiveMQ Artemis Kubernetes operator. Tests are included in the module
//! files (e.g., `wait.rs`) and under `tests/`.
//!
//! ## Quick Start
//!
//! ```rust
//! use broker_operator_testkit::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod clock;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod error;
pub mod lifecycle;
pub mod names;
pub mod naming;
pub mod observability;
pub mod prelude;
pub mod status;
pub mod wait;
