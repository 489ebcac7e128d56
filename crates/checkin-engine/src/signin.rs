//! Sign-in orchestration.
//!
//! `SigninRunner::attempt` drives one attempt end to end:
//! session check → launch → navigate → login detection → click → settle →
//! page read → classification → ledger append.
//!
//! Every path returns a [`SigninOutcome`] and writes exactly one ledger row.
//! The backend is closed on every path once the session check has passed.

use crate::backend::{Backend, BackendError};
use crate::classifier::classify;
use crate::clock;
use crate::config::AppConfig;
use crate::history::{HistoryEntry, HistoryLedger};
use checkin_common::protocol::{ErrorCategory, ResponseSnapshot, SigninOutcome};
use serde_json::json;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SigninError {
    #[error("{0}")]
    AuthInvalid(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SigninError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SigninError::AuthInvalid(_) => ErrorCategory::AuthInvalid,
            SigninError::Backend(BackendError::Unavailable(_)) => ErrorCategory::DependencyMissing,
            SigninError::Backend(BackendError::Session(_)) => ErrorCategory::AuthInvalid,
            SigninError::Backend(_) => ErrorCategory::Unknown,
        }
    }

    pub fn into_outcome(self) -> SigninOutcome {
        let message = self.to_string();
        SigninOutcome::failure(self.category(), message.clone(), message)
    }
}

pub struct SigninRunner<'a> {
    config: &'a AppConfig,
    ledger: &'a HistoryLedger,
}

impl<'a> SigninRunner<'a> {
    pub fn new(config: &'a AppConfig, ledger: &'a HistoryLedger) -> Self {
        Self { config, ledger }
    }

    /// Run one attempt for `slot`.
    pub async fn attempt<B: Backend + ?Sized>(&self, backend: &mut B, slot: &str) -> SigninOutcome {
        let timestamp = clock::timestamp(&self.config.schedule.timezone);

        if !backend.session_artifact_exists() {
            let outcome = SigninError::AuthInvalid(format!(
                "Session artifact not found at {}. Run authorize first.",
                self.config.browser.storage_state_path.display()
            ))
            .into_outcome();
            warn!("Skipping sign-in for slot {}: {}", slot, outcome.message);
            self.record(HistoryEntry::from_outcome(timestamp, slot, &outcome));
            return outcome;
        }

        let started = Instant::now();
        info!("Starting sign-in attempt for slot {}", slot);

        let result = self.drive(backend).await;
        if let Err(e) = backend.close().await {
            warn!("Failed to close browser: {}", e);
        }

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let (outcome, extra) = match result {
            Ok(outcome) => {
                let extra = json!({ "response": outcome.snapshot });
                (outcome, Some(extra))
            }
            Err(e) => {
                warn!("Sign-in attempt failed: {}", e);
                (e.into_outcome(), None)
            }
        };

        let mut entry =
            HistoryEntry::from_outcome(timestamp, slot, &outcome).with_duration_ms(duration_ms);
        if let Some(extra) = extra {
            entry = entry.with_extra(extra);
        }
        self.record(entry);

        info!(
            "Sign-in attempt for slot {} finished: {} ({} ms)",
            slot, outcome.status, duration_ms
        );
        outcome
    }

    async fn drive<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
    ) -> Result<SigninOutcome, SigninError> {
        let browser = &self.config.browser;
        let rules = &self.config.selectors;
        let timeout = Duration::from_millis(browser.timeout_ms);

        bounded("launch browser", timeout, backend.launch()).await?;

        let watch = match &rules.api.checkin_url_contains {
            Some(pattern) => Some(backend.watch_responses(pattern).await?),
            None => None,
        };

        let nav = bounded("navigate", timeout, backend.navigate(&browser.base_url)).await?;
        debug!("Landed on {} ({:?})", nav.url, nav.title);
        if !browser.login_redirect_contains.is_empty()
            && nav.url.contains(&browser.login_redirect_contains)
        {
            return Err(SigninError::AuthInvalid(format!(
                "Redirected to login page: {}",
                nav.url
            )));
        }

        if let Some(marker) = &rules.dom.login_marker {
            let count = backend.count(marker).await.unwrap_or_else(|e| {
                debug!("Login marker lookup failed, assuming absent: {}", e);
                0
            });
            if count > 0 {
                return Err(SigninError::AuthInvalid(format!(
                    "Login marker {} detected; authorization likely expired",
                    marker
                )));
            }
        }

        match &rules.dom.checkin_button {
            Some(selector) => {
                let button = backend.wait_visible(selector, timeout).await?;
                bounded("click check-in button", timeout, backend.click(&button)).await?;
                info!("Clicked check-in button {}", selector);
            }
            None => {
                warn!("checkin_button selector missing; waiting briefly for automatic flow");
                tokio::time::sleep(Duration::from_millis(browser.auto_flow_wait_ms)).await;
            }
        }

        tokio::time::sleep(Duration::from_millis(browser.settle_ms)).await;

        let page_text = bounded("read page text", timeout, backend.page_text()).await?;
        let snapshot = match watch {
            Some(watch) => collect(watch.finish(), timeout).await?,
            None => None,
        };
        if let Some(snapshot) = &snapshot {
            debug!(
                "Captured response {} ({}), {} bytes",
                snapshot.url,
                snapshot.status,
                snapshot.body_text().len()
            );
        }

        Ok(classify(snapshot.as_ref(), Some(&page_text), rules))
    }

    fn record(&self, entry: HistoryEntry) {
        if let Err(e) = self.ledger.append(&entry) {
            error!(
                "Failed to append history entry to {}: {}",
                self.ledger.path().display(),
                e
            );
        }
    }
}

/// Run a backend call under `timeout`, reporting expiry as a timeout error.
async fn bounded<T, F>(operation: &str, timeout: Duration, call: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::timeout(operation, millis(timeout))),
    }
}

async fn collect<F>(finish: F, timeout: Duration) -> Result<Option<ResponseSnapshot>, BackendError>
where
    F: Future<Output = Option<ResponseSnapshot>>,
{
    tokio::time::timeout(timeout, finish)
        .await
        .map_err(|_| BackendError::timeout("collect API response", millis(timeout)))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
