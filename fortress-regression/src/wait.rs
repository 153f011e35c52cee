//! Predicate polling: the backbone of every asynchronous verification.
//!
//! All external state (scan status, notification arrival, database rows,
//! mailbox content) is verified by polling with a bounded interval and an
//! explicit timeout - never by busy-spinning and never without a deadline.
//! Intervals grow mildly and carry jitter so parallel suites do not hammer
//! the environment in lockstep.

use std::future::Future;
use std::time::{Duration, Instant};

use log::debug;
use rand::Rng;

use crate::error::{HarnessError, Result};

/// How an observed value is compared against the expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compare {
    Equals,
    Contains,
    NotEquals,
}

impl Compare {
    /// Apply the operator.
    #[must_use]
    pub fn matches(self, expected: &str, observed: &str) -> bool {
        match self {
            Compare::Equals => observed == expected,
            Compare::Contains => observed.contains(expected),
            Compare::NotEquals => observed != expected,
        }
    }
}

/// Polling parameters.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub timeout: Duration,
    /// First interval; later intervals grow by half, capped at `max_interval`.
    pub base_interval: Duration,
    pub max_interval: Duration,
    /// Timeout behavior: fatal raises `WaitTimeout`, non-fatal hands the
    /// last observed value back for the caller to assert on.
    pub fatal: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            base_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(15),
            fatal: true,
        }
    }
}

impl WaitOptions {
    #[must_use]
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_interval(mut self, base: Duration) -> Self {
        self.base_interval = base;
        if self.max_interval < base {
            self.max_interval = base;
        }
        self
    }

    #[must_use]
    pub fn non_fatal(mut self) -> Self {
        self.fatal = false;
        self
    }

    /// Interval for the given attempt (0-based): base * 1.5^attempt capped,
    /// with +/-20% jitter.
    fn interval(&self, attempt: u32) -> Duration {
        let base = self.base_interval.as_millis() as f64;
        let grown = base * 1.5f64.powi(attempt.min(8) as i32);
        let capped = grown.min(self.max_interval.as_millis() as f64);
        let jitter = rand::rng().random_range(0.8..1.2);
        Duration::from_millis((capped * jitter).max(1.0) as u64)
    }
}

/// Poll `supplier` until the comparison holds or the timeout expires.
///
/// Returns the matching observation on success. On timeout, `fatal` decides
/// between a `WaitTimeout` error carrying the last observation and returning
/// that observation for the caller's own assertion.
///
/// # Errors
///
/// Propagates supplier errors immediately; raises `WaitTimeout` as above.
pub async fn wait_for_value<F, Fut>(
    what: &str,
    compare: Compare,
    expected: &str,
    options: &WaitOptions,
    mut supplier: F,
) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;
    let mut observed = supplier().await?;

    loop {
        if compare.matches(expected, &observed) {
            debug!("{what}: observed '{observed}' after {:?}", started.elapsed());
            return Ok(observed);
        }

        if started.elapsed() >= options.timeout {
            if options.fatal {
                return Err(HarnessError::WaitTimeout {
                    what: what.to_string(),
                    timeout_secs: options.timeout.as_secs(),
                    observed,
                });
            }
            return Ok(observed);
        }

        tokio::time::sleep(options.interval(attempt)).await;
        attempt = attempt.saturating_add(1);
        observed = supplier().await?;
    }
}

/// Poll a boolean predicate until it holds or the timeout expires.
///
/// # Errors
///
/// Propagates supplier errors; raises `WaitTimeout` on expiry when fatal.
pub async fn wait_until<F, Fut>(what: &str, options: &WaitOptions, mut predicate: F) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let outcome = wait_for_value(what, Compare::Equals, "true", options, || {
        let fut = predicate();
        async move { fut.await.map(|v| v.to_string()) }
    })
    .await?;
    Ok(outcome == "true")
}
