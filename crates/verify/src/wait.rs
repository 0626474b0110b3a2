// Bounded condition waits
//
// Polling primitives used where the page has no single element to assert on,
// e.g. waiting for an image source to change after a selection.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};

/// Polls `condition` until it returns `true` or `timeout` elapses.
///
/// The condition is evaluated at least once, even with a zero timeout. Errors
/// from the condition abort the wait immediately.
///
/// # Errors
///
/// Returns `Error::WaitTimeout` naming `what` if the condition never held.
pub async fn wait_until<F, Fut>(
    what: &str,
    timeout: Duration,
    poll_interval: Duration,
    mut condition: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    wait_for_value(what, timeout, poll_interval, || {
        let check = condition();
        async move { Ok(check.await?.then_some(())) }
    })
    .await
}

/// Polls `probe` until it yields `Some(value)` or `timeout` elapses.
pub async fn wait_for_value<T, F, Fut>(
    what: &str,
    timeout: Duration,
    poll_interval: Duration,
    mut probe: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let start = Instant::now();

    loop {
        if let Some(value) = probe().await? {
            tracing::debug!("Condition met after {:?}: {}", start.elapsed(), what);
            return Ok(value);
        }

        if start.elapsed() >= timeout {
            return Err(Error::WaitTimeout {
                what: what.to_string(),
                after: timeout,
            });
        }

        tokio::time::sleep(poll_interval).await;
    }
}
