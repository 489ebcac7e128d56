use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

type CdpResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub struct CdpClient {
    pub browser: Browser,
    pub handler_task: JoinHandle<()>,
    pub page: Page,
    user_data_dir: Option<PathBuf>,
    cleanup_user_data_dir: bool,
}

impl CdpClient {
    pub async fn launch(visible: bool) -> CdpResult<Self> {
        let mut config_builder = BrowserConfig::builder().no_sandbox();
        let (user_data_dir, cleanup_user_data_dir) = resolve_user_data_dir()?;
        config_builder = config_builder.user_data_dir(&user_data_dir);

        if visible {
            tracing::info!("Launching browser in visible mode");
            config_builder = config_builder.with_head();
        } else {
            tracing::info!("Launching browser in headless mode");
        }

        if let Ok(chrome_bin) = std::env::var("CHROME_BIN") {
            tracing::info!("Using custom Chrome binary: {}", chrome_bin);
            config_builder = config_builder.chrome_executable(chrome_bin);
        }

        let (browser, mut handler) = Browser::launch(
            config_builder
                .build()
                .map_err(|e| format!("Failed to build browser config: {}", e))?,
        )
        .await
        .map_err(|e| format!("Failed to launch browser: {}", e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(e) = h {
                    tracing::debug!("Browser handler error (ignoring): {}", e);
                }
            }
            tracing::debug!("Browser handler task ended");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| format!("Failed to create page: {}", e))?;

        // A stray confirm() on the dashboard would otherwise block every later call.
        let mut dialog_events = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(|e| format!("Failed to subscribe to dialog events: {}", e))?;

        let page_clone = page.clone();
        tokio::spawn(async move {
            while let Some(event) = dialog_events.next().await {
                tracing::info!(
                    "Accepting JavaScript dialog: {} ({:?})",
                    event.message,
                    event.r#type
                );
                let cmd = HandleJavaScriptDialogParams::new(true);
                if let Err(e) = page_clone.execute(cmd).await {
                    tracing::warn!("Failed to accept dialog: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
            page,
            user_data_dir: Some(user_data_dir),
            cleanup_user_data_dir,
        })
    }

    pub async fn close(mut self) -> CdpResult<()> {
        self.browser
            .close()
            .await
            .map_err(|e| format!("Error closing browser: {}", e))?;
        self.handler_task
            .await
            .map_err(|e| format!("Error awaiting handler: {}", e))?;

        if self.cleanup_user_data_dir
            && let Some(dir) = &self.user_data_dir
            && let Err(e) = std::fs::remove_dir_all(dir)
        {
            tracing::debug!("Failed to clean up user-data-dir {}: {}", dir.display(), e);
        }

        Ok(())
    }
}

/// Profile directory for this launch.
///
/// `AUTO_CHECKIN_USER_DATA_DIR` pins a persistent profile; otherwise a fresh
/// one is created under the temp dir and removed on close, so nothing but the
/// storage-state artifact carries a session between runs.
fn resolve_user_data_dir() -> CdpResult<(PathBuf, bool)> {
    if let Ok(dir) = std::env::var("AUTO_CHECKIN_USER_DATA_DIR") {
        let path = PathBuf::from(dir);
        std::fs::create_dir_all(&path)?;
        tracing::info!(
            "Using user data dir from AUTO_CHECKIN_USER_DATA_DIR: {}",
            path.display()
        );
        return Ok((path, false));
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("System clock error: {}", e))?
        .as_nanos();
    let unique = format!("auto-checkin-profile-{}-{}", std::process::id(), nanos);
    let path = std::env::temp_dir().join(unique);
    std::fs::create_dir_all(&path)?;
    tracing::debug!("Using isolated user data dir: {}", path.display());
    Ok((path, true))
}
