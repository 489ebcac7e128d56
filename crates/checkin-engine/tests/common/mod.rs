#![allow(dead_code)]

use async_trait::async_trait;
use checkin_engine::backend::{
    Backend, BackendError, ElementHandle, NavigationResult, ResponseWatch,
};
use checkin_engine::config::{AppConfig, ConfigLoader};
use checkin_engine::protocol::ResponseSnapshot;
use checkin_engine::session_state::{SessionCookie, SessionState};
use std::path::Path;
use std::time::Duration;

/// Scriptable backend that records every capability call.
#[derive(Debug)]
pub struct MockBackend {
    pub session_exists: bool,
    pub calls: Vec<String>,
    pub launch_error: Option<BackendError>,
    pub landing_url: String,
    pub login_marker_count: usize,
    pub button_error: Option<BackendError>,
    pub page_text: String,
    pub response: Option<ResponseSnapshot>,
    pub navigate_delay: Option<Duration>,
    pub exported: SessionState,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            session_exists: true,
            calls: Vec::new(),
            launch_error: None,
            landing_url: "https://anyrouter.top/console".to_string(),
            login_marker_count: 0,
            button_error: None,
            page_text: String::new(),
            response: None,
            navigate_delay: None,
            exported: SessionState {
                cookies: vec![SessionCookie {
                    name: "session".into(),
                    value: "abc".into(),
                    domain: ".anyrouter.top".into(),
                    path: "/".into(),
                    expires: -1.0,
                    http_only: true,
                    secure: true,
                    same_site: None,
                }],
                origins: vec![],
            },
        }
    }
}

impl MockBackend {
    pub fn called(&self, prefix: &str) -> bool {
        self.calls.iter().any(|c| c.starts_with(prefix))
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        self.calls.push("launch".into());
        if let Some(err) = self.launch_error.clone() {
            return Err(err);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        self.calls.push("close".into());
        Ok(())
    }

    fn session_artifact_exists(&self) -> bool {
        self.session_exists
    }

    async fn watch_responses(&mut self, url_contains: &str) -> Result<ResponseWatch, BackendError> {
        self.calls.push(format!("watch:{}", url_contains));
        let matched = self
            .response
            .clone()
            .filter(|r| r.url.contains(url_contains));
        Ok(ResponseWatch::resolved(matched))
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        self.calls.push(format!("navigate:{}", url));
        if let Some(delay) = self.navigate_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(NavigationResult {
            url: self.landing_url.clone(),
            title: "AnyRouter".into(),
        })
    }

    async fn count(&mut self, selector: &str) -> Result<usize, BackendError> {
        self.calls.push(format!("count:{}", selector));
        Ok(self.login_marker_count)
    }

    async fn wait_visible(
        &mut self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<ElementHandle, BackendError> {
        self.calls.push(format!("wait_visible:{}", selector));
        if let Some(err) = self.button_error.clone() {
            return Err(err);
        }
        Ok(ElementHandle {
            selector: selector.to_string(),
        })
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BackendError> {
        self.calls.push(format!("click:{}", element.selector));
        Ok(())
    }

    async fn page_text(&mut self) -> Result<String, BackendError> {
        self.calls.push("page_text".into());
        Ok(self.page_text.clone())
    }

    async fn export_session(&mut self) -> Result<SessionState, BackendError> {
        self.calls.push("export_session".into());
        Ok(self.exported.clone())
    }
}

/// Config rooted at `dir`, with no settle delays.
pub fn test_config(dir: &Path, selectors: &str) -> AppConfig {
    let text = format!(
        r#"
[browser]
base_url = "https://anyrouter.top/console"
storage_state_path = "state/storage_state.json"
timeout_ms = 1000
settle_ms = 0
auto_flow_wait_ms = 0

[schedule]
timezone = "Asia/Singapore"

[history]
csv_path = "data/history.csv"
max_rows = 50

{}
"#,
        selectors
    );
    ConfigLoader::parse(&text, dir).expect("test config parses")
}
