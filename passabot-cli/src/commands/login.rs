//! Login command - obtain tokens for manual mode.

use anyhow::Result;
use passabot_core::AuthMode;
use serde_json::json;
use tracing::info;

use crate::app::App;
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Runs the interactive login once and prints the resulting tokens.
pub async fn run(cli: &Cli) -> Result<()> {
    let app = App::load(cli).await?;
    let auth = app
        .authenticator_for(AuthMode::Interactive, app.launcher()?)
        .await?;

    info!("Starting login, approve the notification on your phone");
    let bundle = auth.acquire_session().await?;

    match cli.format {
        OutputFormat::Text => {
            println!("CSRF_TOKEN={}", bundle.csrf_token);
            println!("SPID_SESSION_ID={}", bundle.session_token);
        }
        OutputFormat::Json => {
            let tokens = json!({
                "csrf_token": bundle.csrf_token,
                "session_id": bundle.session_token,
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&tokens)?);
        }
    }

    Ok(())
}
