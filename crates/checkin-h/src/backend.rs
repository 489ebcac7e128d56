use crate::cdp::CdpClient;
use crate::{network, storage};
use async_trait::async_trait;
use checkin_engine::backend::{
    Backend, BackendError, ElementHandle, NavigationResult, ResponseWatch,
};
use checkin_engine::config::BrowserConfig;
use checkin_engine::session_state::SessionState;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    pub storage_state_path: PathBuf,
    pub visible: bool,
    /// Import the stored session on launch. Off for the authorize flow.
    pub load_session: bool,
    pub slow_mo: Duration,
}

impl HeadlessOptions {
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            storage_state_path: config.storage_state_path.clone(),
            visible: !config.headless,
            load_session: true,
            slow_mo: Duration::from_millis(config.slow_mo_ms),
        }
    }
}

pub struct HeadlessBackend {
    client: Option<CdpClient>,
    options: HeadlessOptions,
}

impl HeadlessBackend {
    pub fn new(options: HeadlessOptions) -> Self {
        Self {
            client: None,
            options,
        }
    }

    fn page(&self) -> Result<&chromiumoxide::Page, BackendError> {
        self.client
            .as_ref()
            .map(|c| &c.page)
            .ok_or(BackendError::NotReady)
    }

    async fn pace(&self) {
        if !self.options.slow_mo.is_zero() {
            tokio::time::sleep(self.options.slow_mo).await;
        }
    }

    async fn get_navigation_result(
        page: &chromiumoxide::Page,
    ) -> Result<NavigationResult, BackendError> {
        let title = page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult { url, title })
    }

    async fn is_visible(page: &chromiumoxide::Page, selector: &str) -> Result<bool, BackendError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); \
             if (!el) return false; \
             const style = getComputedStyle(el); \
             const rect = el.getBoundingClientRect(); \
             return style.visibility !== 'hidden' && style.display !== 'none' \
                 && rect.width > 0 && rect.height > 0; }})()",
            serde_json::to_string(selector)?
        );
        page.evaluate(script)
            .await
            .map_err(|e| selector_error(selector, e))?
            .into_value::<bool>()
            .map_err(BackendError::from)
    }
}

fn selector_error(selector: &str, e: impl std::fmt::Display) -> BackendError {
    let message = e.to_string();
    if message.contains("is not a valid selector") {
        BackendError::SelectorInvalid {
            selector: selector.to_string(),
        }
    } else {
        BackendError::ScriptError(message)
    }
}

#[async_trait]
impl Backend for HeadlessBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        info!("Launching Headless Backend (Chromium)...");
        // Parse the artifact before paying for a browser.
        let state = if self.options.load_session {
            Some(storage::read_state(&self.options.storage_state_path).await?)
        } else {
            None
        };

        let client = CdpClient::launch(self.options.visible)
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        self.client = Some(client);
        if let Some(state) = &state {
            storage::import(self.page()?, state).await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| BackendError::Other(e.to_string()))?;
        }
        Ok(())
    }

    fn session_artifact_exists(&self) -> bool {
        self.options.storage_state_path.is_file()
    }

    async fn watch_responses(&mut self, url_contains: &str) -> Result<ResponseWatch, BackendError> {
        network::watch_responses(self.page()?, url_contains).await
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        let page = self.page()?;

        info!("Navigating to: {}", url);
        page.goto(url)
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;
        self.pace().await;

        Self::get_navigation_result(page).await
    }

    async fn count(&mut self, selector: &str) -> Result<usize, BackendError> {
        let page = self.page()?;
        let elements = page
            .find_elements(selector)
            .await
            .map_err(|e| selector_error(selector, e))?;
        Ok(elements.len())
    }

    async fn wait_visible(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, BackendError> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;
        loop {
            if Self::is_visible(page, selector).await? {
                return Ok(ElementHandle {
                    selector: selector.to_string(),
                });
            }
            if Instant::now() >= deadline {
                return Err(BackendError::timeout(
                    format!("wait for {}", selector),
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                ));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BackendError> {
        let page = self.page()?;
        let target = page
            .find_element(element.selector.as_str())
            .await
            .map_err(|_| BackendError::ElementNotFound {
                selector: element.selector.clone(),
            })?;
        target.click().await.map_err(|e| {
            BackendError::Other(format!("Click on {} failed: {}", element.selector, e))
        })?;
        self.pace().await;
        Ok(())
    }

    async fn page_text(&mut self) -> Result<String, BackendError> {
        let page = self.page()?;
        let text = page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .map_err(|e| BackendError::ScriptError(e.to_string()))?
            .into_value::<String>()?;
        Ok(text)
    }

    async fn export_session(&mut self) -> Result<SessionState, BackendError> {
        storage::export(self.page()?).await
    }
}
