mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "auto-checkin", version, about = "Automated daily AnyRouter check-in")]
struct Args {
    /// Configuration file (defaults to ./config.toml, then the user config dir)
    #[arg(long, global = true, env = "AUTO_CHECKIN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one check-in attempt with the stored session
    Signin {
        /// Schedule slot recorded with the attempt
        #[arg(long, default_value = "morning")]
        slot: String,
    },
    /// Show the most recent history entries
    Status {
        #[arg(long, default_value_t = 20)]
        last: usize,
    },
    /// Log in by hand in a visible browser and store the session
    Authorize,
    /// Delete the stored session
    Revoke,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match commands::run(args.config.as_deref(), args.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
