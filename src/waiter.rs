//! Bounded polling for asynchronous remote state changes.

use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::trace;

use crate::error::RsmachineError;

/// Polls a probe on a fixed interval until it succeeds or the budget runs out.
///
/// The loop runs on the caller's thread. It ends when the probe returns
/// `true`, when `max_attempts` probes have failed, or when `deadline`
/// has passed, whichever comes first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waiter {
    pub max_attempts: usize,
    pub interval: Duration,
    pub deadline: Option<Instant>,
}

impl Default for Waiter {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: Duration::from_secs(3),
            deadline: None,
        }
    }
}

impl Waiter {
    #[must_use]
    pub fn new(max_attempts: usize, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            deadline: None,
        }
    }

    /// Additionally stops polling once `deadline` has passed.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Invokes `probe` until it returns `true`.
    ///
    /// # Errors
    ///
    /// Returns `RsmachineError::Timeout` carrying the number of failed attempts.
    pub fn wait_for<F>(&self, mut probe: F) -> Result<(), RsmachineError>
    where
        F: FnMut() -> bool,
    {
        let mut attempts = 0;
        while attempts < self.max_attempts {
            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }

            attempts += 1;
            if probe() {
                trace!(attempts, "probe succeeded");
                return Ok(());
            }

            if attempts < self.max_attempts && !self.interval.is_zero() {
                thread::sleep(self.interval);
            }
        }

        Err(RsmachineError::Timeout { attempts })
    }
}

/// `waiter` section of a machine profile.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WaiterConfig {
    pub max_attempts: usize,
    pub interval_secs: u64,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        let waiter = Waiter::default();
        Self {
            max_attempts: waiter.max_attempts,
            interval_secs: waiter.interval.as_secs(),
        }
    }
}

impl WaiterConfig {
    pub fn as_waiter(&self) -> Waiter {
        Waiter::new(self.max_attempts, Duration::from_secs(self.interval_secs))
    }
}
