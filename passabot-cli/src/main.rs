// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! passabot - passport appointment watcher.
//!
//! # Examples
//!
//! ```bash
//! # Watch the Milan offices and notify Telegram (reads secrets from the environment)
//! TARGET_PROVINCE=MI passabot
//!
//! # Poll the rendered page instead of the JSON API
//! passabot run --source page
//!
//! # Log in once and print the tokens for manual mode
//! passabot login
//!
//! # One fetch, printed as JSON
//! passabot probe --format json --pretty
//!
//! # Store the SPID password in the system keychain
//! passabot config set-password --username mario.rossi
//! ```

mod app;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use passabot_core::{AuthMode, SourceKind};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{config, login, probe, run};

// ============================================================================
// CLI Definition
// ============================================================================

/// passabot - passport appointment watcher.
#[derive(Parser)]
#[command(name = "passabot")]
#[command(about = "Watches the passport appointment portal and relays availability to Telegram")]
#[command(long_about = r#"
passabot polls the Italian passport appointment portal for free slots and
sends every office with availability to a Telegram chat.

Secrets are read from the environment:
  TARGET_PROVINCE            jurisdiction key (e.g. MI)
  TELEGRAM_BOT_TOKEN         bot token
  TELEGRAM_DATA_CHAT_ID      chat receiving availability
  TELEGRAM_CONTROL_CHAT_ID   chat receiving status and errors
  SPID_USERNAME              SPID (PosteID) username
  SPID_PASSWORD              SPID password (or stored in the keychain)
  CSRF_TOKEN                 manual mode: CSRF token
  SPID_SESSION_ID            manual mode: JSESSIONID cookie

Examples:
  passabot                   # Run the bot
  passabot probe             # One fetch, no notifications
  passabot login             # Print tokens for manual mode
  passabot config show       # Show settings
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'run' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Settings file (defaults to the platform config directory).
    #[arg(long, global = true, env = "PASSABOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode (no console logging).
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Also write logs to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(flatten)]
    pub portal: PortalArgs,
}

/// Portal, login and Telegram inputs.
#[derive(clap::Args, Clone, Default)]
pub struct PortalArgs {
    /// Data source (overrides the settings file).
    #[arg(long, global = true)]
    pub source: Option<SourceKind>,

    /// Authentication mode (overrides the settings file).
    #[arg(long, global = true)]
    pub auth: Option<AuthMode>,

    /// Jurisdiction key sent to the portal.
    #[arg(long, global = true, env = "TARGET_PROVINCE")]
    pub province: Option<String>,

    /// SPID username.
    #[arg(long, global = true, env = "SPID_USERNAME")]
    pub spid_username: Option<String>,

    /// SPID password (falls back to the system keychain).
    #[arg(long, global = true, env = "SPID_PASSWORD", hide_env_values = true)]
    pub spid_password: Option<String>,

    /// CSRF token for manual mode.
    #[arg(long, global = true, env = "CSRF_TOKEN", hide_env_values = true)]
    pub csrf_token: Option<String>,

    /// JSESSIONID cookie for manual mode.
    #[arg(long, global = true, env = "SPID_SESSION_ID", hide_env_values = true)]
    pub session_id: Option<String>,

    /// Telegram bot token.
    #[arg(long, global = true, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Telegram chat for availability reports.
    #[arg(long, global = true, env = "TELEGRAM_DATA_CHAT_ID")]
    pub data_chat_id: Option<String>,

    /// Telegram chat for status messages.
    #[arg(long, global = true, env = "TELEGRAM_CONTROL_CHAT_ID")]
    pub control_chat_id: Option<String>,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot until interrupted (default if no command specified).
    #[command(visible_alias = "r")]
    Run,

    /// Log in once and print the session tokens.
    Login,

    /// Log in, fetch once and print the records.
    #[command(visible_alias = "p")]
    Probe,

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// General error.
    Error = 1,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    if quiet && log_file.is_none() {
        return Ok(()); // No logging in quiet mode
    }

    let filter = if verbose {
        EnvFilter::new("passabot=debug,info")
    } else {
        EnvFilter::new("passabot=info,warn")
    };

    let console = (!quiet).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let file = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(filter)
        .init();

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Error: {e:#}");
        std::process::exit(ExitCode::Error as i32);
    }

    let result = match &cli.command {
        Some(Commands::Run) | None => run::run(&cli).await,
        Some(Commands::Login) => login::run(&cli).await,
        Some(Commands::Probe) => probe::run(&cli).await,
        Some(Commands::Config(args)) => config::run(args, &cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(ExitCode::Error as i32);
    }

    Ok(())
}
