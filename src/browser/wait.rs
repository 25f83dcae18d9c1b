//! Bounded condition waits
//!
//! `poll_until` re-runs a probe until it yields a value or the deadline
//! passes. Probe errors count as "not yet": an element that is missing or
//! detached mid-render is expected while the page is still settling.

use crate::error::{Result, ScrapeError};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

pub async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        match probe().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) => log::debug!("waiting for {}: {}", what, e),
        }

        if Instant::now() >= deadline {
            return Err(ScrapeError::Timeout {
                what: what.to_string(),
                waited: timeout,
            });
        }

        tokio::time::sleep(interval).await;
    }
}

/// Fixed pause; a zero duration returns immediately.
pub async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn returns_once_probe_succeeds() {
        let calls = Cell::new(0);
        let value = poll_until(
            "counter",
            Duration::from_secs(1),
            Duration::from_millis(1),
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move { Ok(if n >= 3 { Some(n) } else { None }) }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn probe_errors_are_retried() {
        let calls = Cell::new(0);
        let value = poll_until(
            "flaky",
            Duration::from_secs(1),
            Duration::from_millis(1),
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n == 1 {
                        Err(ScrapeError::StaleElement)
                    } else {
                        Ok(Some("ok"))
                    }
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, "ok");
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn times_out_with_condition_name() {
        let err = poll_until::<(), _, _>(
            "Page 2 of",
            Duration::from_millis(20),
            Duration::from_millis(5),
            || async { Ok(None) },
        )
        .await
        .unwrap_err();

        match err {
            ScrapeError::Timeout { what, .. } => assert_eq!(what, "Page 2 of"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn zero_timeout_still_probes_once() {
        let value = poll_until("now", Duration::ZERO, Duration::from_millis(1), || async {
            Ok(Some(7))
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }
}
