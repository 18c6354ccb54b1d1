//! # Condition Waiter
//!
//! Blocking poll loop with a fixed interval and a deadline.
//!
//! The predicate is evaluated immediately, then once per poll interval,
//! until it reports [`Observation::Satisfied`] or the elapsed monotonic time
//! reaches the timeout after an unsatisfied evaluation. The worst case is
//! therefore `ceil(timeout / poll_interval) + 1` evaluations.
//!
//! Errors returned by the predicate are never retried: a failed lookup is a
//! defect in the test or its configuration, not transient unavailability.

use crate::clock::Clock;
use crate::error::{HarnessError, Result};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Result of one predicate evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation<T> {
    /// The condition holds; the wait returns this value
    Satisfied(T),
    /// The condition does not hold yet; the text describes what was seen and
    /// ends up in the timeout error if this was the last evaluation
    Pending(String),
}

impl<T> Observation<T> {
    pub fn pending(observed: impl Display) -> Self {
        Observation::Pending(observed.to_string())
    }
}

impl Observation<()> {
    pub fn from_bool(holds: bool, observed: impl Display) -> Self {
        if holds {
            Observation::Satisfied(())
        } else {
            Observation::pending(observed)
        }
    }
}

/// Validated wait parameters
///
/// `timeout` must be strictly greater than `poll_interval`; anything else is
/// rejected at construction so a misconfigured wait fails fast instead of
/// degrading into a single evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSpec {
    description: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl WaitSpec {
    pub fn new(
        description: impl Into<String>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let description = description.into();
        if poll_interval.is_zero() {
            return Err(HarnessError::Configuration(format!(
                "poll interval must be positive ({description})"
            )));
        }
        if timeout <= poll_interval {
            return Err(HarnessError::Configuration(format!(
                "timeout {timeout:?} must exceed poll interval {poll_interval:?} ({description})"
            )));
        }
        Ok(Self {
            description,
            poll_interval,
            timeout,
        })
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Upper bound on predicate evaluations for this spec
    #[must_use]
    pub fn max_evaluations(&self) -> u128 {
        self.timeout.as_nanos().div_ceil(self.poll_interval.as_nanos()) + 1
    }
}

/// Poll `predicate` until it is satisfied or `spec` expires
pub async fn wait_for<C, T, F, Fut>(clock: &C, spec: &WaitSpec, mut predicate: F) -> Result<T>
where
    C: Clock + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observation<T>>>,
{
    let start = clock.now();
    let mut evaluations: u32 = 0;

    loop {
        evaluations += 1;
        let observed = match predicate().await? {
            Observation::Satisfied(value) => {
                debug!(
                    "Done {} after {:?} ({} evaluations)",
                    spec.description,
                    clock.now().duration_since(start),
                    evaluations
                );
                return Ok(value);
            }
            Observation::Pending(observed) => observed,
        };

        let elapsed = clock.now().duration_since(start);
        if elapsed >= spec.timeout {
            return Err(HarnessError::WaitTimeout {
                description: spec.description.clone(),
                elapsed,
                last_observed: observed,
            });
        }

        debug!(
            "Still {} after {:?}: {}",
            spec.description, elapsed, observed
        );
        clock.sleep(spec.poll_interval).await;
    }
}

/// Validate the parameters and wait in one call
///
/// Invalid parameters return [`HarnessError::Configuration`] without
/// evaluating the predicate.
pub async fn wait_until<C, T, F, Fut>(
    clock: &C,
    description: impl Into<String>,
    poll_interval: Duration,
    timeout: Duration,
    predicate: F,
) -> Result<T>
where
    C: Clock + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observation<T>>>,
{
    let spec = WaitSpec::new(description, poll_interval, timeout)?;
    wait_for(clock, &spec, predicate).await
}
