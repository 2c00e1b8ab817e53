//! Config command - manage configuration.

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use passabot_fetch::SystemKeychain;
use passabot_store::{
    SettingsStore, default_cache_dir, default_config_dir, default_settings_path, keychain,
};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::info;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Write a settings file with default values.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Store the SPID password in the system keychain.
    ///
    /// The password is read from SPID_PASSWORD or, when unset, from the
    /// first line of standard input.
    SetPassword,

    /// Remove the SPID password from the system keychain.
    DeletePassword,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await,
        ConfigAction::Path => show_paths(cli),
        ConfigAction::Init { force } => init_config(*force, cli).await,
        ConfigAction::SetPassword => set_password(cli).await,
        ConfigAction::DeletePassword => delete_password(cli).await,
    }
}

fn settings_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(default_settings_path)
}

async fn show_config(cli: &Cli) -> Result<()> {
    let path = settings_path(cli);
    let store = SettingsStore::load(path.clone()).await?;
    let settings = store.get();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_settings(settings, &path));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(settings)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_path = settings_path(cli);
    let cache_dir = default_cache_dir();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", settings_path.display());
            println!("Cache dir:     {}", cache_dir.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
                "cache_dir": cache_dir.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn init_config(force: bool, cli: &Cli) -> Result<()> {
    let path = settings_path(cli);
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    SettingsStore::new(path.clone()).save().await?;

    info!(path = %path.display(), "Settings initialized");
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

fn spid_username(cli: &Cli) -> Result<&str> {
    cli.portal
        .spid_username
        .as_deref()
        .context("SPID_USERNAME is not set (use --spid-username)")
}

async fn set_password(cli: &Cli) -> Result<()> {
    let username = spid_username(cli)?;

    let password = match cli.portal.spid_password.clone() {
        Some(password) => password,
        None => {
            eprintln!("Enter the SPID password for {username}:");
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    keychain::store_spid_password(&SystemKeychain::new(), username, &password).await?;

    info!(account = %username, "SPID password stored");
    println!("Stored SPID password for {username} in the system keychain");
    Ok(())
}

async fn delete_password(cli: &Cli) -> Result<()> {
    let username = spid_username(cli)?;
    keychain::delete_spid_password(&SystemKeychain::new(), username).await?;
    println!("Removed SPID password for {username}");
    Ok(())
}
