// Scoped session wrapper
//
// Runs a scenario body against a target that can be photographed and closed.
// On failure the screenshot and HTML are captured before the error
// propagates, and the target is closed exactly once on every path.

use std::future::Future;

use async_trait::async_trait;

use crate::artifacts::ScenarioArtifacts;
use crate::error::Result;

/// Something that can produce failure diagnostics and be released
#[async_trait]
pub trait DiagnosticTarget: Send + Sync {
    /// PNG screenshot of the current state
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Current HTML content
    async fn html(&self) -> Result<String>;

    /// Releases the target
    async fn close(&self) -> Result<()>;
}

/// Awaits `body`, capturing diagnostics into `artifacts` if it fails, then
/// closes `target`.
///
/// The body's error always wins over a close error. If the body succeeded
/// and the close failed, the close error is returned.
///
/// # Example
///
/// ```ignore
/// let session = BrowserSession::launch(&SessionConfig::default()).await?;
/// let artifacts = ArtifactStore::new("verification").scenario("hero-titles");
/// guarded(&session, &artifacts, async {
///     session.page().goto("http://localhost:5173", None).await?;
///     Ok(())
/// })
/// .await?;
/// ```
pub async fn guarded<T, F, R>(target: &T, artifacts: &ScenarioArtifacts, body: F) -> Result<R>
where
    T: DiagnosticTarget + ?Sized,
    F: Future<Output = Result<R>>,
{
    let outcome = body.await;

    if let Err(e) = &outcome {
        tracing::warn!("Scenario failed, capturing diagnostics: {}", e);
        capture_failure(target, artifacts).await;
    }

    let closed = target.close().await;

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err.context("closing browser session")),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            tracing::warn!("Failed to close browser session after failure: {}", close_err);
            Err(e)
        }
    }
}

/// Writes `failure.png` and `failure.html`. Capture problems are logged and
/// never replace the original error.
async fn capture_failure<T>(target: &T, artifacts: &ScenarioArtifacts)
where
    T: DiagnosticTarget + ?Sized,
{
    match target.screenshot().await {
        Ok(png) => match artifacts.write_failure_screenshot(&png).await {
            Ok(path) => tracing::info!("Failure screenshot: {}", path.display()),
            Err(e) => tracing::warn!("{}", e),
        },
        Err(e) => tracing::warn!("Could not take failure screenshot: {}", e),
    }

    match target.html().await {
        Ok(html) => match artifacts.write_failure_html(&html).await {
            Ok(path) => tracing::info!("Failure HTML: {}", path.display()),
            Err(e) => tracing::warn!("{}", e),
        },
        Err(e) => tracing::warn!("Could not read page HTML: {}", e),
    }
}
