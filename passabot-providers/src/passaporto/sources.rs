//! API and page availability sources.

use async_trait::async_trait;
use passabot_core::{AvailabilityRecord, CredentialBundle, RecordDetail, SourceKind};
use passabot_fetch::host::automation::select_by_visible_text;
use passabot_fetch::{
    AutomationError, AutomationSurface, AvailabilitySource, Cookie, FetchError, HttpTransport,
    Locator,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::api::{BASE_URL, PassaportoApiClient};
use super::page::{TABLE_XPATH, parse_table, read_table};

// ============================================================================
// API Source
// ============================================================================

/// Reads availability from the portal JSON API.
///
/// One locations request is followed by one slots request per location
/// with a first available date. Requests run sequentially and the first
/// failure aborts the whole cycle.
pub struct ApiSource {
    client: PassaportoApiClient,
    jurisdiction: String,
    bundle: Option<CredentialBundle>,
}

impl ApiSource {
    /// Creates a new API source for a jurisdiction key (e.g. `MI`).
    pub fn new(transport: Arc<dyn HttpTransport>, jurisdiction: impl Into<String>) -> Self {
        Self::with_client(PassaportoApiClient::new(transport), jurisdiction)
    }

    /// Creates a source around an existing client.
    pub fn with_client(client: PassaportoApiClient, jurisdiction: impl Into<String>) -> Self {
        Self {
            client,
            jurisdiction: jurisdiction.into(),
            bundle: None,
        }
    }
}

#[async_trait]
impl AvailabilitySource for ApiSource {
    fn id(&self) -> &str {
        "passaporto.api"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }

    async fn login(&mut self, bundle: CredentialBundle) -> Result<bool, FetchError> {
        self.bundle = Some(bundle);
        debug!("API source received credential bundle");
        Ok(true)
    }

    #[instrument(skip(self), fields(jurisdiction = %self.jurisdiction))]
    async fn fetch(&mut self) -> Result<Vec<AvailabilityRecord>, FetchError> {
        let bundle = self.bundle.as_ref().ok_or(FetchError::NotLoggedIn)?;

        let locations = self.client.list_locations(bundle, &self.jurisdiction).await?;
        info!(count = locations.len(), "Found possible appointments");

        let mut records = Vec::new();
        for location in &locations {
            let Some(date) = location.first_available_date()? else {
                continue;
            };
            let slots = self.client.list_slots(bundle, &location.id).await?;
            records.push(AvailabilityRecord::new(
                location.name(),
                location.indirizzo.as_str(),
                Some(date),
                RecordDetail::Slots(slots),
            ));
        }

        let records = AvailabilityRecord::retain_eligible(records);
        info!(count = records.len(), "Found available appointments");
        Ok(records)
    }
}

// ============================================================================
// Page Source
// ============================================================================

/// Wizard step that lists the locations.
const LOCATIONS_PATH: &str = "a/sc/wizardAppuntamentoCittadino/sceltaComune";

/// Applicant selector on the wizard page.
const APPLICANT_SELECT_ID: &str = "selectRichiedente";

/// Applicant option for booking on one's own behalf.
const APPLICANT_SELF: &str = "Me stesso";

const CONTINUE_BUTTON: &str = "//button[contains(text(), 'Continua')]";

/// Attempts at finding the applicant selector before giving up.
const SELECT_ATTEMPTS: u32 = 3;

/// Reads availability from the rendered location table.
///
/// The source owns its browser session; [`AvailabilitySource::close`]
/// releases it.
pub struct PageSource {
    surface: Box<dyn AutomationSurface>,
    base_url: String,
    logged_in: bool,
}

impl PageSource {
    /// Creates a new page source over a live browser session.
    pub fn new(surface: Box<dyn AutomationSurface>) -> Self {
        Self::with_base_url(surface, BASE_URL)
    }

    /// Creates a page source with a custom base URL (must end with `/`).
    pub fn with_base_url(surface: Box<dyn AutomationSurface>, base_url: impl Into<String>) -> Self {
        Self {
            surface,
            base_url: base_url.into(),
            logged_in: false,
        }
    }

    /// Portal origin, used to scope the session cookie.
    fn origin(&self) -> &str {
        self.base_url
            .find("://")
            .and_then(|scheme| {
                self.base_url[scheme + 3..]
                    .find('/')
                    .map(|slash| &self.base_url[..scheme + 3 + slash + 1])
            })
            .unwrap_or(&self.base_url)
    }

    /// Opens the wizard step that shows the location table.
    async fn view_locations(&self) -> Result<(), AutomationError> {
        let surface = self.surface.as_ref();
        surface
            .navigate(&format!("{}{LOCATIONS_PATH}", self.base_url))
            .await?;

        let selector = Locator::id(APPLICANT_SELECT_ID);
        let mut attempt = 0;
        let select = loop {
            attempt += 1;
            match surface.find(None, &selector).await {
                Ok(select) => break select,
                Err(e) if e.is_element_not_found() && attempt < SELECT_ATTEMPTS => {
                    error!(attempt, select = APPLICANT_SELECT_ID, "Applicant selector not found, refreshing...");
                    surface.refresh().await?;
                }
                Err(e) => return Err(e),
            }
        };

        surface.click(&select).await?;
        select_by_visible_text(surface, &select, APPLICANT_SELF).await?;
        surface.click_on(&Locator::xpath(CONTINUE_BUTTON)).await?;
        Ok(())
    }
}

#[async_trait]
impl AvailabilitySource for PageSource {
    fn id(&self) -> &str {
        "passaporto.page"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Page
    }

    #[instrument(skip(self, bundle))]
    async fn login(&mut self, bundle: CredentialBundle) -> Result<bool, FetchError> {
        self.logged_in = false;

        let origin = self.origin().to_string();
        self.surface.navigate(&origin).await?;
        self.surface
            .add_cookie(&Cookie::new("JSESSIONID", bundle.session_token).with_path("/"))
            .await?;
        info!("Logged in with JSESSIONID cookie");

        match self.view_locations().await {
            Ok(()) => {
                self.logged_in = true;
                Ok(true)
            }
            Err(e) if e.is_element_not_found() => {
                warn!(error = %e, "Could not open the location view");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn fetch(&mut self) -> Result<Vec<AvailabilityRecord>, FetchError> {
        if !self.logged_in {
            return Err(FetchError::NotLoggedIn);
        }

        let surface = self.surface.as_ref();
        surface.refresh().await?;

        let url = surface.current_url().await?;
        if url.contains("login") {
            self.logged_in = false;
            return Err(FetchError::SessionExpired(url));
        }

        let table = match surface.find(None, &Locator::xpath(TABLE_XPATH)).await {
            Ok(table) => table,
            Err(e) if e.is_element_not_found() => {
                error!("Could not find the availability table");
                return Err(FetchError::Malformed(
                    "availability table not found".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let rows = read_table(surface, &table).await?;
        let records = parse_table(&rows)?;
        info!(count = records.len(), "Found possible appointments");

        let records = AvailabilityRecord::retain_eligible(records);
        info!(count = records.len(), "Found available appointments");
        Ok(records)
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        self.logged_in = false;
        self.surface.quit().await?;
        Ok(())
    }
}
