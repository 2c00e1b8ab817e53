//! Availability records observed during a polling cycle.
//!
//! Records carry no identity: every cycle rebuilds them from the current
//! state reported by the portal, and repeats across cycles are expected.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::html::{MESSAGE_CHAR_LIMIT, escape};

// ============================================================================
// Slot Entry
// ============================================================================

/// A bookable time slot with the number of appointments still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotEntry {
    /// Start of the slot (portal local time).
    pub starts_at: NaiveDateTime,
    /// Appointments still available in this slot.
    pub remaining: u32,
}

impl SlotEntry {
    /// Creates a new slot entry.
    pub fn new(starts_at: NaiveDateTime, remaining: u32) -> Self {
        Self {
            starts_at,
            remaining,
        }
    }
}

// ============================================================================
// Record Detail
// ============================================================================

/// Source-specific detail attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RecordDetail {
    /// Free-form informational text (rendered-page source).
    Info(String),
    /// Slots ordered ascending by start time (API source).
    Slots(Vec<SlotEntry>),
}

impl RecordDetail {
    /// Builds a slot detail, sorting the entries by start time.
    pub fn sorted_slots(mut slots: Vec<SlotEntry>) -> Self {
        slots.sort_by_key(|s| s.starts_at);
        Self::Slots(slots)
    }

    /// Total remaining appointments, when the detail is a slot list.
    pub fn total_remaining(&self) -> Option<u32> {
        match self {
            Self::Slots(slots) => Some(slots.iter().map(|s| s.remaining).sum()),
            Self::Info(_) => None,
        }
    }
}

// ============================================================================
// Availability Record
// ============================================================================

/// One appointment location as observed in a single polling cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    /// Location (office) name.
    pub location: String,
    /// Postal address of the location.
    pub address: String,
    /// First date with free appointments.
    pub first_available_date: Option<NaiveDate>,
    /// Raw first-availability text, kept when the portal shows something
    /// other than a date (or its "no slots" text) in place of one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_available_text: Option<String>,
    /// Source-specific detail.
    pub detail: RecordDetail,
}

impl AvailabilityRecord {
    /// Creates a new record.
    pub fn new(
        location: impl Into<String>,
        address: impl Into<String>,
        first_available_date: Option<NaiveDate>,
        detail: RecordDetail,
    ) -> Self {
        Self {
            location: location.into(),
            address: address.into(),
            first_available_date,
            first_available_text: None,
            detail,
        }
    }

    /// Attaches the raw first-availability text.
    #[must_use]
    pub fn with_first_available_text(mut self, text: impl Into<String>) -> Self {
        self.first_available_text = Some(text.into());
        self
    }

    /// Returns true if the record reports availability and may be notified.
    ///
    /// Nothing is available only when neither a date nor a raw availability
    /// text is present.
    pub fn is_eligible(&self) -> bool {
        self.first_available_date.is_some() || self.first_available_text.is_some()
    }

    /// First availability as shown to users: the date, else the raw text.
    pub fn first_available_label(&self) -> Option<String> {
        match (self.first_available_date, &self.first_available_text) {
            (Some(date), _) => Some(date.format("%d/%m/%Y").to_string()),
            (None, Some(text)) => Some(text.trim().to_string()),
            (None, None) => None,
        }
    }

    /// Keeps only the eligible records.
    pub fn retain_eligible(records: Vec<Self>) -> Vec<Self> {
        records.into_iter().filter(Self::is_eligible).collect()
    }

    /// Renders the record as an HTML-subset notification message that fits
    /// in one chat message.
    pub fn to_html(&self) -> String {
        self.to_html_within(MESSAGE_CHAR_LIMIT)
    }

    /// Renders the record as HTML in at most `max_chars` characters.
    ///
    /// Slot lines are dropped from the tail and summarized when they do not
    /// fit, so every tag stays balanced and the address is always present.
    pub fn to_html_within(&self, max_chars: usize) -> String {
        let mut head = format!("<b>Location:</b> {}\n", escape(&self.location));
        if let Some(label) = self.first_available_label() {
            head.push_str(&format!("<b>First available:</b> {}\n", escape(&label)));
        }
        let tail = format!("\n<b>Address:</b> {}", escape(&self.address));

        let fixed = head.chars().count() + tail.chars().count();
        let budget = max_chars.saturating_sub(fixed);

        let body = match &self.detail {
            RecordDetail::Slots(slots) => render_slots(slots, budget),
            RecordDetail::Info(info) if !info.trim().is_empty() => {
                let prefix = "<b>Information:</b> ";
                let room = budget.saturating_sub(prefix.chars().count() + 1);
                let text = escape_within(info.trim(), room);
                if text.is_empty() {
                    String::new()
                } else {
                    format!("{prefix}{text}\n")
                }
            }
            RecordDetail::Info(_) => String::new(),
        };

        format!("{head}{body}{tail}")
    }

    /// Renders the record as plain text (used by the CLI).
    pub fn to_plain_text(&self) -> String {
        let date = self
            .first_available_label()
            .unwrap_or_else(|| "none".to_string());
        let mut out = format!("{} ({}) - first available: {}", self.location, self.address, date);

        match &self.detail {
            RecordDetail::Slots(slots) => {
                for slot in slots {
                    out.push_str(&format!(
                        "\n  {} -> {}",
                        slot.starts_at.format("%d/%m/%Y %H:%M"),
                        slot.remaining
                    ));
                }
            }
            RecordDetail::Info(info) if !info.trim().is_empty() => {
                out.push_str(&format!("\n  {}", info.trim()));
            }
            RecordDetail::Info(_) => {}
        }
        out
    }
}

/// Renders slot lines in at most `budget` characters.
fn render_slots(slots: &[SlotEntry], budget: usize) -> String {
    let header = "<b>Available slots:</b>\n";
    let mut out = header.to_string();
    let mut used = header.chars().count();

    for (i, slot) in slots.iter().enumerate() {
        let line = format!(
            "- <code>{}</code>: <b>{}</b>\n",
            slot.starts_at.format("%d/%m/%Y, %H:%M"),
            slot.remaining
        );
        let rest = slots.len() - i - 1;
        // Room for the summary line unless this is the last slot
        let reserve = if rest == 0 { 0 } else { more_line(rest).chars().count() };
        if used + line.chars().count() + reserve > budget {
            let more = more_line(slots.len() - i);
            if used + more.chars().count() > budget {
                return String::new();
            }
            out.push_str(&more);
            return out;
        }
        used += line.chars().count();
        out.push_str(&line);
    }
    out
}

/// Escapes `text` into at most `max_chars` characters without splitting an
/// entity, marking the cut with an ellipsis.
fn escape_within(text: &str, max_chars: usize) -> String {
    let escaped = escape(text);
    if escaped.chars().count() <= max_chars {
        return escaped;
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let piece = escape(ch.encode_utf8(&mut [0; 4]));
        let len = piece.chars().count();
        if used + len + 1 > max_chars {
            break;
        }
        used += len;
        out.push_str(&piece);
    }
    if out.is_empty() {
        return out;
    }
    out.push('…');
    out
}

fn more_line(count: usize) -> String {
    format!("… and {count} more\n")
}

// ============================================================================
// Tests
// ============================================================================
