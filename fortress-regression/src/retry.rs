//! Coarse scenario-level retry for flaky environment conditions.
//!
//! This is the whole-workflow analog of the client's per-request retry: a
//! scenario step that failed because the shared environment hiccuped gets
//! re-run from the top, a bounded number of times. Failures are logged and
//! discarded until the budget runs out, then the last error propagates.

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::error::Result;

/// Run `op` up to `1 + max_retries` times, returning the first success.
///
/// # Errors
///
/// The last error once the retry budget is exhausted.
pub async fn with_retries<T, F, Fut>(what: &str, max_retries: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    warn!("{what} succeeded on attempt {attempt}");
                }
                return Ok(value);
            }
            Err(err) if attempt <= max_retries => {
                warn!("{what} failed on attempt {attempt}, retrying: {err}");
                tokio::time::sleep(Duration::from_secs(2u64.saturating_mul(attempt.into()))).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_op = calls.clone();

        let value = with_retries("flaky step", 3, move || {
            let calls = calls_in_op.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(HarnessError::ElementNotFound("transient".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await
        .expect("third attempt succeeds");

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_returns_last_error() {
        let err = with_retries("doomed step", 1, || async {
            Err::<(), _>(HarnessError::ElementNotFound("persistent".to_string()))
        })
        .await
        .expect_err("never succeeds");
        assert!(err.to_string().contains("persistent"));
    }

    #[tokio::test]
    async fn test_zero_retries_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_op = calls.clone();
        let _ = with_retries("single shot", 0, move || {
            let calls = calls_in_op.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(HarnessError::ElementNotFound("nope".to_string()))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
