//! Portal response parsing.

use chrono::{NaiveDate, NaiveDateTime};
use passabot_core::SlotEntry;
use passabot_fetch::FetchError;
use tracing::warn;

use super::api::{LocationEntry, LocationList, SlotList};

/// Separator used inside slot object keys.
const KEY_SEPARATOR: &str = "||_||";

/// Format of the slot key after its prefix.
const SLOT_KEY_FORMAT: &str = "%d/%m/%Y||_||%H.%M";

/// Returns the part of a location description after the first `" - "`.
pub fn location_name(description: &str) -> &str {
    description
        .split_once(" - ")
        .map_or(description, |(_, name)| name)
}

/// Parses the date part of an ISO timestamp such as `2024-03-04T00:00:00`.
pub fn parse_first_date(timestamp: &str) -> Result<NaiveDate, FetchError> {
    let date = timestamp.split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| FetchError::Malformed(format!("invalid first date {timestamp:?}: {e}")))
}

/// Parses a slot object key into its start time.
pub fn parse_slot_key(key: &str) -> Result<NaiveDateTime, FetchError> {
    let (_, rest) = key
        .split_once(KEY_SEPARATOR)
        .ok_or_else(|| FetchError::Malformed(format!("slot key without separator: {key:?}")))?;
    NaiveDateTime::parse_from_str(rest, SLOT_KEY_FORMAT)
        .map_err(|e| FetchError::Malformed(format!("invalid slot key {key:?}: {e}")))
}

/// Parses the locations endpoint body.
pub fn parse_locations(body: &str) -> Result<Vec<LocationEntry>, FetchError> {
    serde_json::from_str::<LocationList>(body)
        .map(|list| list.list)
        .map_err(|e| {
            warn!(error = %e, "Failed to decode locations");
            FetchError::Malformed(e.to_string())
        })
}

/// Parses the slots endpoint body into slots sorted by start time.
pub fn parse_slots(body: &str) -> Result<Vec<SlotEntry>, FetchError> {
    let list: SlotList = serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, "Failed to decode slots");
        FetchError::Malformed(e.to_string())
    })?;

    let mut slots = list
        .elenco
        .iter()
        .map(|entry| parse_slot_key(&entry.object_key).map(|t| SlotEntry::new(t, entry.remaining)))
        .collect::<Result<Vec<_>, _>>()?;
    slots.sort_by_key(|s| s.starts_at);
    Ok(slots)
}
