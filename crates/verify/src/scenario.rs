// Scenario trait and step helpers
//
// A scenario is a fixed, linear script of browser actions and assertions.
// `ScenarioContext` gives it a page plus bounded versions of every action.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use playwright_rs::{
    CheckOptions, ClickOptions, FillOptions, GotoOptions, Locator, Page, SelectOption,
    SelectOptions, WaitUntil, expect,
};
use url::Url;

use crate::artifacts::ScenarioArtifacts;
use crate::config::{Timeouts, ViewportSize};
use crate::error::{Error, Result};
use crate::wait;

/// A named verification script
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Stable name used on the command line and for the artifact directory
    fn name(&self) -> &'static str;

    /// One-line summary for `list`
    fn description(&self) -> &'static str;

    /// Viewport this scenario needs, if it differs from the session default
    fn viewport(&self) -> Option<ViewportSize> {
        None
    }

    async fn run(&self, cx: &ScenarioContext<'_>) -> Result<()>;
}

/// `role=<role>[name="<name>"]` selector
pub fn by_role(role: &str, name: &str) -> String {
    format!("role={}[name=\"{}\"]", role, name.replace('"', "\\\""))
}

/// `text=<text>` selector
pub fn by_text(text: &str) -> String {
    format!("text={}", text)
}

/// Page, configuration and artifact sink handed to a running scenario
pub struct ScenarioContext<'a> {
    page: &'a Page,
    base_url: &'a Url,
    timeouts: Timeouts,
    artifacts: &'a ScenarioArtifacts,
    gateway_reservation_id: &'a str,
    steps: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl<'a> ScenarioContext<'a> {
    pub fn new(
        page: &'a Page,
        base_url: &'a Url,
        timeouts: Timeouts,
        artifacts: &'a ScenarioArtifacts,
        gateway_reservation_id: &'a str,
    ) -> Self {
        Self {
            page,
            base_url,
            timeouts,
            artifacts,
            gateway_reservation_id,
            steps: Mutex::new(Vec::new()),
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn page(&self) -> &Page {
        self.page
    }

    pub fn base_url(&self) -> &Url {
        self.base_url
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub fn gateway_reservation_id(&self) -> &str {
        self.gateway_reservation_id
    }

    /// Steps entered so far
    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().clone()
    }

    /// Non-fatal findings reported by the scenario
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }

    /// Marks the start of the next step
    pub fn step(&self, name: impl Into<String>) {
        let name = name.into();
        let mut steps = self.steps.lock();
        steps.push(name.clone());
        tracing::info!(step = steps.len(), "{}", name);
    }

    /// Records a finding that should be reported without failing the run
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.lock().push(message);
    }

    /// Resolves `path` against the base URL.
    ///
    /// Paths are relative to the base, so `"/#pagar-con-codigo"` and
    /// `"#pagar-con-codigo"` both land on the app's hash route.
    pub fn url(&self, path: &str) -> Result<Url> {
        resolve(self.base_url, path)
    }

    /// Navigates with the configured navigation timeout
    pub async fn goto(&self, path: &str) -> Result<()> {
        self.goto_with(path, None, self.timeouts.navigation).await
    }

    /// Navigates and waits for the given load state
    pub async fn goto_with(
        &self,
        path: &str,
        wait_until: Option<WaitUntil>,
        timeout: Duration,
    ) -> Result<()> {
        let url = self.url(path)?;
        tracing::debug!("Navigating to {}", url);

        let mut options = GotoOptions::new().timeout(timeout);
        if let Some(state) = wait_until {
            options = options.wait_until(state);
        }

        match self.page.goto(url.as_str(), Some(options)).await {
            Ok(_) => Ok(()),
            Err(e) => Err(match Error::from(e) {
                nav @ Error::Navigation { .. } => nav,
                other => Error::Navigation {
                    url: url.to_string(),
                    reason: other.to_string(),
                },
            }),
        }
    }

    pub async fn locator(&self, selector: &str) -> Locator {
        self.page.locator(selector).await
    }

    /// Waits for an element to become visible (element wait, not an assertion)
    ///
    /// Unlike the `expect_*` assertions this is not strict: when the selector
    /// matches several elements the first one is waited for.
    pub async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        let locator = self.locator(selector).await.first();
        expect(locator)
            .with_timeout(timeout)
            .to_be_visible()
            .await
            .map_err(|e| match Error::from(e) {
                Error::Assertion(_) => Error::ElementWait(format!(
                    "'{}' did not appear within {:?}",
                    selector, timeout
                )),
                other => other,
            })
    }

    /// Asserts visibility within the default assertion timeout
    pub async fn expect_visible(&self, selector: &str) -> Result<()> {
        self.expect_visible_within(selector, self.timeouts.assertion)
            .await
    }

    pub async fn expect_visible_within(&self, selector: &str, timeout: Duration) -> Result<()> {
        let locator = self.locator(selector).await;
        expect(locator).with_timeout(timeout).to_be_visible().await?;
        Ok(())
    }

    pub async fn expect_hidden(&self, selector: &str) -> Result<()> {
        self.expect_hidden_within(selector, self.timeouts.assertion)
            .await
    }

    pub async fn expect_hidden_within(&self, selector: &str, timeout: Duration) -> Result<()> {
        let locator = self.locator(selector).await;
        expect(locator).with_timeout(timeout).to_be_hidden().await?;
        Ok(())
    }

    pub async fn expect_checked(&self, selector: &str) -> Result<()> {
        let locator = self.locator(selector).await;
        expect(locator)
            .with_timeout(self.timeouts.assertion)
            .to_be_checked()
            .await?;
        Ok(())
    }

    pub async fn expect_unchecked(&self, selector: &str) -> Result<()> {
        let locator = self.locator(selector).await;
        expect(locator)
            .with_timeout(self.timeouts.assertion)
            .to_be_unchecked()
            .await?;
        Ok(())
    }

    pub async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        let options = FillOptions::builder().timeout(self.element_ms()).build();
        self.locator(selector)
            .await
            .fill(text, Some(options))
            .await?;
        Ok(())
    }

    pub async fn select(&self, selector: &str, option: impl Into<SelectOption>) -> Result<()> {
        let locator = self.locator(selector).await;
        self.select_on(&locator, option).await
    }

    /// Selects on an already refined locator (e.g. `nth(2)`)
    pub async fn select_on(&self, locator: &Locator, option: impl Into<SelectOption>) -> Result<()> {
        let options = SelectOptions::builder().timeout(self.element_ms()).build();
        locator.select_option(option, Some(options)).await?;
        Ok(())
    }

    pub async fn click(&self, selector: &str) -> Result<()> {
        let options = ClickOptions::builder().timeout(self.element_ms()).build();
        self.locator(selector).await.click(Some(options)).await?;
        Ok(())
    }

    /// Clicks without actionability checks
    pub async fn force_click(&self, selector: &str) -> Result<()> {
        let options = ClickOptions::builder()
            .force(true)
            .timeout(self.element_ms())
            .build();
        self.locator(selector).await.click(Some(options)).await?;
        Ok(())
    }

    pub async fn check(&self, selector: &str) -> Result<()> {
        let options = CheckOptions::builder().timeout(self.element_ms()).build();
        self.locator(selector).await.check(Some(options)).await?;
        Ok(())
    }

    pub async fn input_value(&self, selector: &str) -> Result<String> {
        Ok(self.locator(selector).await.input_value(None).await?)
    }

    /// Presses a key on the focused element
    pub async fn press(&self, key: &str) -> Result<()> {
        self.page.keyboard().press(key, None).await?;
        Ok(())
    }

    /// Evaluates a JavaScript expression and returns its string value
    pub async fn evaluate_string(&self, expression: &str) -> Result<String> {
        Ok(self.page.evaluate_value(expression).await?)
    }

    /// Polls `expression` until it returns a value different from `previous`
    pub async fn wait_for_change(
        &self,
        what: &str,
        expression: &str,
        previous: &str,
        timeout: Duration,
    ) -> Result<String> {
        wait::wait_for_value(what, timeout, self.timeouts.poll, || async move {
            let current = self.evaluate_string(expression).await?;
            Ok((current != previous).then_some(current))
        })
        .await
    }

    /// Saves a checkpoint screenshot under the scenario's artifact directory
    pub async fn checkpoint(&self, name: &str) -> Result<()> {
        let png = self.page.screenshot(None).await?;
        let path = self.artifacts.write_checkpoint(name, &png).await?;
        tracing::info!("Checkpoint '{}': {}", name, path.display());
        Ok(())
    }

    fn element_ms(&self) -> f64 {
        self.timeouts.element.as_secs_f64() * 1000.0
    }
}

fn resolve(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| Error::Config(format!("cannot join '{}' onto {}: {}", path, base, e)))
}
