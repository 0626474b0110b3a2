// Browser session
//
// One Playwright driver, browser, context and page per scenario run.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use playwright_rs::{
    Browser, BrowserContext, BrowserContextOptions, LaunchOptions, Page, Playwright, Viewport,
};

use crate::config::{BrowserKind, SessionConfig};
use crate::error::{Error, Result};
use crate::guard::DiagnosticTarget;

/// A launched browser with a single page
///
/// `close()` releases the context, the browser and the driver. It is safe to
/// call more than once; only the first call does any work.
pub struct BrowserSession {
    playwright: Playwright,
    browser: Browser,
    context: BrowserContext,
    page: Page,
    closed: AtomicBool,
}

impl BrowserSession {
    /// Starts the Playwright driver and opens a page.
    ///
    /// # Errors
    ///
    /// Returns `Error::BrowserLaunch` if the driver or browser cannot be
    /// started (for example when browsers are not installed).
    pub async fn launch(config: &SessionConfig) -> Result<Self> {
        tracing::info!(
            browser = config.browser.as_str(),
            headless = config.headless,
            "Launching browser"
        );

        let playwright = Playwright::launch().await.map_err(launch_error)?;

        let opened = Self::open(&playwright, config).await;
        match opened {
            Ok((browser, context, page)) => Ok(Self {
                playwright,
                browser,
                context,
                page,
                closed: AtomicBool::new(false),
            }),
            Err(e) => {
                if let Err(shutdown_err) = playwright.shutdown().await {
                    tracing::debug!("Driver shutdown after failed launch: {}", shutdown_err);
                }
                Err(e)
            }
        }
    }

    async fn open(
        playwright: &Playwright,
        config: &SessionConfig,
    ) -> Result<(Browser, BrowserContext, Page)> {
        let browser_type = match config.browser {
            BrowserKind::Chromium => playwright.chromium(),
            BrowserKind::Firefox => playwright.firefox(),
            BrowserKind::Webkit => playwright.webkit(),
        };

        let browser = browser_type
            .launch_with_options(LaunchOptions::new().headless(config.headless))
            .await
            .map_err(launch_error)?;

        let context = match config.viewport {
            Some(size) => {
                let options = BrowserContextOptions::builder()
                    .viewport(Viewport {
                        width: size.width,
                        height: size.height,
                    })
                    .build();
                browser.new_context_with_options(options).await
            }
            None => browser.new_context().await,
        };
        let context = match context {
            Ok(context) => context,
            Err(e) => {
                let _ = browser.close().await;
                return Err(launch_error(e));
            }
        };

        match context.new_page().await {
            Ok(page) => Ok((browser, context, page)),
            Err(e) => {
                let _ = context.close().await;
                let _ = browser.close().await;
                Err(launch_error(e))
            }
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes the context, browser and driver. Only the first call closes.
    ///
    /// Every step is attempted even if an earlier one fails; the first error
    /// is returned.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::debug!("Closing browser session");

        let mut first_error: Option<Error> = None;
        let steps = [
            ("context", self.context.close().await),
            ("browser", self.browser.close().await),
            ("driver", self.playwright.shutdown().await),
        ];
        for (what, result) in steps {
            if let Err(e) = result {
                tracing::debug!("Failed to close {}: {}", what, e);
                first_error.get_or_insert(Error::from(e).context(format!("closing {}", what)));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DiagnosticTarget for BrowserSession {
    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(self.page.screenshot(None).await?)
    }

    async fn html(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn close(&self) -> Result<()> {
        BrowserSession::close(self).await
    }
}

fn launch_error(err: playwright_rs::Error) -> Error {
    Error::BrowserLaunch(err.to_string())
}
