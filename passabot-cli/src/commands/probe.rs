//! Probe command - one fetch without notifications.

use anyhow::{Result, bail};
use passabot_core::{AvailabilityRecord, SessionState};
use passabot_engine::SessionManager;
use passabot_fetch::AvailabilitySource;
use tracing::{info, warn};

use crate::app::App;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Logs in, fetches once and prints the records.
pub async fn run(cli: &Cli) -> Result<()> {
    let app = App::load(cli).await?;
    let launcher = app.launcher()?;
    let authenticator = app.authenticator(launcher.clone()).await?;
    let mut source = app.source(launcher).await?;

    let mut session = SessionManager::new(authenticator, SessionState::LoggedOut);
    let result = probe(&mut session, source.as_mut()).await;

    if let Err(e) = source.close().await {
        warn!(error = %e, "Could not close the data source");
    }
    let records = result?;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_records(&records));
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&records)?);
        }
    }

    Ok(())
}

async fn probe(
    session: &mut SessionManager,
    source: &mut dyn AvailabilitySource,
) -> Result<Vec<AvailabilityRecord>> {
    if !session.ensure_logged_in(source).await? {
        bail!("Could not login");
    }
    let records = source.fetch().await?;
    info!(count = records.len(), "Probe finished");
    Ok(records)
}
