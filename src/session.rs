//! Headless-browser session wrapper around chromiumoxide.

use crate::config::ScanConfig;
use crate::error::ScanError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::{CallArgument, CallFunctionOnParams};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use url::Url;

/// Why a single navigation did not complete.
///
/// The caller decides severity: a seed navigation failure is fatal to the
/// scan, a subpage navigation failure is logged and skipped.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("navigation failed: {0}")]
    Failed(#[source] chromiumoxide::error::CdpError),

    #[error("navigation timed out after {0}s")]
    TimedOut(u64),
}

/// One exclusively-owned browser session: a launched headless Chromium
/// instance with a single page, closed unconditionally at the end of a scan.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl BrowserSession {
    /// Launch a headless browser and open a blank page.
    pub async fn launch(config: &ScanConfig) -> Result<Self, ScanError> {
        let mut builder = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");

        if let Some(path) = config.chrome_binary.clone() {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder.build().map_err(ScanError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScanError::Launch(e.to_string()))?;

        // The handler stream must be polled for the session to make progress
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScanError::Launch(format!("failed to open page: {}", e)))?;

        Ok(Self {
            browser,
            page,
            handler_task,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        })
    }

    /// The underlying page, exposed for event subscription.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Navigate the session's page to `url` and wait for the load to settle.
    pub async fn navigate(&self, url: &str) -> Result<(), NavigationError> {
        let result = timeout(self.navigation_timeout, self.page.goto(url)).await;

        match result {
            Ok(Ok(_)) => {
                // Best effort; some pages never fire a clean load event
                let _ = self.page.wait_for_navigation().await;
                Ok(())
            }
            Ok(Err(e)) => Err(NavigationError::Failed(e)),
            Err(_) => Err(NavigationError::TimedOut(
                self.navigation_timeout.as_secs(),
            )),
        }
    }

    /// Evaluate a JS function in the page, passing `arg` as its single
    /// call argument rather than splicing it into the script text.
    pub async fn evaluate_with_arg(
        &self,
        function: &str,
        arg: serde_json::Value,
    ) -> Result<serde_json::Value, ScanError> {
        let call = CallFunctionOnParams::builder()
            .function_declaration(function)
            .argument(CallArgument::builder().value(arg).build())
            .build()
            .map_err(ScanError::Evaluate)?;

        let result = self
            .page
            .evaluate_function(call)
            .await
            .map_err(|e| ScanError::Evaluate(e.to_string()))?;

        result
            .into_value()
            .map_err(|e| ScanError::Evaluate(format!("failed to convert result: {:?}", e)))
    }

    /// URL of the currently loaded document, after any redirects.
    pub async fn current_url(&self) -> Option<Url> {
        let url = self.page.url().await.ok().flatten()?.to_string();
        Url::parse(&url).ok()
    }

    /// Full rendered markup of the currently loaded page.
    pub async fn content(&self) -> Result<String, ScanError> {
        self.page.content().await.map_err(ScanError::PageContent)
    }

    /// Close the page and the browser, discarding the event handler task.
    pub async fn close(mut self) {
        if let Err(e) = self.page.close().await {
            ::log::warn!("Failed to close page: {}", e);
        }
        if let Err(e) = self.browser.close().await {
            ::log::warn!("Failed to close browser: {}", e);
        }
        self.handler_task.abort();
    }
}
