//! # Configuration
//!
//! Environment-driven configuration for test suites.
//!
//! - `harness.rs` - deadlines, operator naming and diagnostics settings

mod harness;

pub use harness::HarnessConfig;
