//! Portal JSON API client.

use chrono::NaiveDate;
use passabot_core::{CredentialBundle, SlotEntry};
use passabot_fetch::{FetchError, HttpError, HttpTransport};
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::parser;

// ============================================================================
// Constants
// ============================================================================

/// Portal base URL; endpoints are relative to it.
pub const BASE_URL: &str = "https://passaportonline.poliziadistato.it/cittadino/";

/// Domain the portal client is allowed to reach.
pub const ALLOWED_DOMAIN: &str = "passaportonline.poliziadistato.it";

/// Locations with their first available date.
const LOCATIONS_ENDPOINT: &str = "a/rc/v1/appuntamento/elenca-sede-prima-disponibilita";

/// Monthly slot agenda for one location.
const SLOTS_ENDPOINT: &str = "n/rc/v1/utility/elenca-agenda-appuntamenti-sede-mese";

/// The portal rejects requests without a browser user agent.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// CSRF header name.
const CSRF_HEADER: &str = "x-csrf-token";

// ============================================================================
// API Response Types
// ============================================================================

/// Response of the locations endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationList {
    /// Locations in the jurisdiction.
    pub list: Vec<LocationEntry>,
}

/// One location.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationEntry {
    /// Opaque location id, echoed back to the slots endpoint.
    pub id: Value,
    /// `"<office type> - <name>"`.
    pub descrizione: String,
    /// Postal address.
    pub indirizzo: String,
    /// ISO timestamp of the first date open to residents, or null.
    #[serde(rename = "dataPrimaDisponibilitaResidenti", default)]
    pub first_available: Option<String>,
}

impl LocationEntry {
    /// Location name without the office-type prefix.
    pub fn name(&self) -> &str {
        parser::location_name(&self.descrizione)
    }

    /// Parses the first available date.
    pub fn first_available_date(&self) -> Result<Option<NaiveDate>, FetchError> {
        self.first_available
            .as_deref()
            .map(parser::parse_first_date)
            .transpose()
    }
}

/// Response of the slots endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotList {
    /// Slot entries, in no particular order.
    pub elenco: Vec<SlotListEntry>,
}

/// One slot.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotListEntry {
    /// `"<prefix>||_||dd/mm/YYYY||_||HH.MM"`.
    #[serde(rename = "objectKey")]
    pub object_key: String,
    /// Appointments still available.
    #[serde(rename = "totAppuntamenti")]
    pub remaining: u32,
}

// ============================================================================
// API Client
// ============================================================================

/// Portal JSON API client.
#[derive(Clone)]
pub struct PassaportoApiClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl PassaportoApiClient {
    /// Creates a new API client against the live portal.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_base_url(transport, BASE_URL)
    }

    /// Creates a client with a custom base URL (must end with `/`).
    pub fn with_base_url(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    /// Build headers for authenticated portal requests.
    fn build_headers(bundle: &CredentialBundle) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            HeaderName::from_static(CSRF_HEADER),
            header_value(&bundle.csrf_token)?,
        );
        headers.insert(COOKIE, header_value(&bundle.cookie_header())?);
        Ok(headers)
    }

    /// Posts to an endpoint and returns the body of a successful response.
    async fn post(
        &self,
        endpoint: &str,
        body: &Value,
        bundle: &CredentialBundle,
    ) -> Result<String, FetchError> {
        let url = format!("{}{endpoint}", self.base_url);
        let response = self
            .transport
            .post_json(&url, body, Self::build_headers(bundle)?)
            .await?;

        if !response.is_success() {
            warn!(status = response.status, url = %response.url, "Portal returned an error status");
            return Err(FetchError::Upstream(response.into_upstream_error()));
        }

        Ok(response.body)
    }

    /// Lists the locations of a jurisdiction.
    #[instrument(skip(self, bundle))]
    pub async fn list_locations(
        &self,
        bundle: &CredentialBundle,
        jurisdiction: &str,
    ) -> Result<Vec<LocationEntry>, FetchError> {
        let body = json!({ "comune": { "provinciaQuestura": jurisdiction } });
        let text = self.post(LOCATIONS_ENDPOINT, &body, bundle).await?;
        let locations = parser::parse_locations(&text)?;
        debug!(count = locations.len(), "Locations received");
        Ok(locations)
    }

    /// Lists the slots of one location, sorted by start time.
    #[instrument(skip(self, bundle, location_id), fields(location = %location_id))]
    pub async fn list_slots(
        &self,
        bundle: &CredentialBundle,
        location_id: &Value,
    ) -> Result<Vec<SlotEntry>, FetchError> {
        let body = json!({ "sede": { "id": location_id } });
        let text = self.post(SLOTS_ENDPOINT, &body, bundle).await?;
        let slots = parser::parse_slots(&text)?;
        debug!(count = slots.len(), "Slots received");
        Ok(slots)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value)
        .map_err(|e| FetchError::Http(HttpError::InvalidHeader(e.to_string())))
}
