//! # Observability
//!
//! Tracing subscriber setup for test binaries.
//!
//! - `subscriber`: `fmt` subscriber in text or JSON format with an `EnvFilter`

mod subscriber;

pub use subscriber::init_tracing;
