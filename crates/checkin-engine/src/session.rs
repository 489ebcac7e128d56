//! Session artifact maintenance: manual authorization and revocation.
//!
//! Both flows append one ledger row describing what they did.

use crate::backend::{Backend, BackendError};
use crate::clock;
use crate::config::AppConfig;
use crate::history::{HistoryEntry, HistoryLedger};
use checkin_common::protocol::ErrorCategory;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Failed to write session artifact {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove session artifact {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Authorization aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    Removed,
    Missing,
}

/// Capture an interactively authorized browser session.
///
/// Opens the dashboard, waits for `confirm` (the operator finishing the
/// login by hand), then exports the session to the configured artifact
/// path. The backend should be launched without loading any stored session.
pub async fn authorize<B, F>(
    backend: &mut B,
    config: &AppConfig,
    ledger: &HistoryLedger,
    confirm: F,
) -> Result<PathBuf, SessionError>
where
    B: Backend + ?Sized,
    F: Future<Output = std::io::Result<()>>,
{
    let timestamp = clock::timestamp(&config.schedule.timezone);
    let path = config.browser.storage_state_path.clone();

    let result = capture(backend, config, &path, confirm).await;
    if let Err(e) = backend.close().await {
        warn!("Failed to close browser: {}", e);
    }

    let entry = match &result {
        Ok(_) => HistoryEntry::new(timestamp, None, "authorize", "success")
            .with_summary("Authorization completed"),
        Err(e) => {
            let mut entry = HistoryEntry::new(timestamp, None, "authorize", "failure")
                .with_summary(e.to_string());
            entry.err_category = Some(category_of(e).as_str().to_string());
            entry
        }
    };
    record(ledger, &entry);

    result.map(|()| path)
}

async fn capture<B, F>(
    backend: &mut B,
    config: &AppConfig,
    path: &Path,
    confirm: F,
) -> Result<(), SessionError>
where
    B: Backend + ?Sized,
    F: Future<Output = std::io::Result<()>>,
{
    backend.launch().await?;
    info!("Opening {} for manual authorization", config.browser.base_url);
    backend.navigate(&config.browser.base_url).await?;

    confirm
        .await
        .map_err(|e| SessionError::Aborted(e.to_string()))?;

    let state = backend.export_session().await?;
    let json = state.to_json_pretty()?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| SessionError::Write {
                path: path.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, json)
        .await
        .map_err(|source| SessionError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    info!(
        "Stored {} cookies and {} origins to {}",
        state.cookies.len(),
        state.origins.len(),
        path.display()
    );
    Ok(())
}

/// Delete the stored session artifact, if there is one.
pub fn revoke(config: &AppConfig, ledger: &HistoryLedger) -> Result<RevokeOutcome, SessionError> {
    let timestamp = clock::timestamp(&config.schedule.timezone);
    let path = &config.browser.storage_state_path;

    if !path.exists() {
        info!("No storage state found at {}", path.display());
        record(
            ledger,
            &HistoryEntry::new(timestamp, None, "revoke", "noop")
                .with_summary("Storage state file missing"),
        );
        return Ok(RevokeOutcome::Missing);
    }

    std::fs::remove_file(path).map_err(|source| SessionError::Remove {
        path: path.clone(),
        source,
    })?;
    info!("Removed {}", path.display());
    record(
        ledger,
        &HistoryEntry::new(timestamp, None, "revoke", "success").with_summary("Session revoked"),
    );
    Ok(RevokeOutcome::Removed)
}

fn category_of(err: &SessionError) -> ErrorCategory {
    match err {
        SessionError::Backend(BackendError::Unavailable(_)) => ErrorCategory::DependencyMissing,
        _ => ErrorCategory::Unknown,
    }
}

fn record(ledger: &HistoryLedger, entry: &HistoryEntry) {
    if let Err(e) = ledger.append(entry) {
        error!("Failed to append history entry: {}", e);
    }
}
