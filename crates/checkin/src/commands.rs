use crate::Command;
use anyhow::Context;
use checkin_engine::config::{AppConfig, ConfigLoader};
use checkin_engine::formatter::{format_history, format_outcome};
use checkin_engine::history::HistoryLedger;
use checkin_engine::session::{self, RevokeOutcome};
use checkin_engine::signin::SigninRunner;
use checkin_h::backend::{HeadlessBackend, HeadlessOptions};
use std::path::Path;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

const AUTHORIZE_PROMPT: &str =
    "Complete the login in the browser window, then press ENTER to save the session.\n";

pub async fn run(config_path: Option<&Path>, command: Command) -> anyhow::Result<ExitCode> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from(path).await,
        None => ConfigLoader::load_default().await,
    }
    .context("Failed to load configuration")?;

    let ledger = HistoryLedger::init(&config.history.csv_path, config.history.max_rows)
        .context("Failed to open history ledger")?;

    match command {
        Command::Signin { slot } => signin(&config, &ledger, &slot).await,
        Command::Status { last } => {
            let total = ledger.len().context("Failed to read history")?;
            info!(
                "History ledger {} holds {} entries",
                ledger.path().display(),
                total
            );
            let entries = ledger.tail(last).context("Failed to read history")?;
            println!("{}", format_history(&entries));
            Ok(ExitCode::SUCCESS)
        }
        Command::Authorize => authorize(&config, &ledger).await,
        Command::Revoke => {
            match session::revoke(&config, &ledger)? {
                RevokeOutcome::Removed => println!(
                    "Removed session artifact {}",
                    config.browser.storage_state_path.display()
                ),
                RevokeOutcome::Missing => println!("No session artifact to remove"),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn signin(
    config: &AppConfig,
    ledger: &HistoryLedger,
    slot: &str,
) -> anyhow::Result<ExitCode> {
    if !config.schedule.slots.contains_key(slot) {
        warn!("Slot {} is not configured under [schedule.slots]", slot);
    }

    let mut backend = HeadlessBackend::new(HeadlessOptions::from_config(&config.browser));
    let outcome = SigninRunner::new(config, ledger)
        .attempt(&mut backend, slot)
        .await;

    println!("{}", format_outcome(&outcome));
    Ok(if outcome.status.is_done() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn authorize(config: &AppConfig, ledger: &HistoryLedger) -> anyhow::Result<ExitCode> {
    let options = HeadlessOptions {
        visible: true,
        load_session: false,
        ..HeadlessOptions::from_config(&config.browser)
    };
    let mut backend = HeadlessBackend::new(options);

    let path = session::authorize(&mut backend, config, ledger, wait_for_enter()).await?;
    println!("Session stored at {}", path.display());
    Ok(ExitCode::SUCCESS)
}

async fn wait_for_enter() -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(AUTHORIZE_PROMPT.as_bytes()).await?;
    stdout.flush().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    match lines.next_line().await? {
        Some(_) => Ok(()),
        None => Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "stdin closed before confirmation",
        )),
    }
}
