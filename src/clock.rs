//! # Clock
//!
//! Monotonic time source used by every wait.
//!
//! The production clock is tokio's; tests drive it with paused time
//! (`#[tokio::test(start_paused = true)]`) so multi-minute deadlines run
//! instantly and deterministically.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Monotonic `now()` and `sleep()` consumed by the waiter
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Clock backed by `tokio::time`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[async_trait]
impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}
