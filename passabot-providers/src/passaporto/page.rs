//! Rendered location table of the booking wizard.
//!
//! Reading the table is split in two: [`read_table`] snapshots the cells
//! through the automation surface, and [`parse_table`] turns the snapshot
//! into records without touching the browser.

use chrono::NaiveDate;
use passabot_core::{AvailabilityRecord, RecordDetail};
use passabot_fetch::{AutomationError, AutomationSurface, ElementRef, FetchError, Locator};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Text shown in the date cell when a location has no availability.
pub const UNAVAILABLE_TEXT: &str = "La sede non offre al momento disponibilità di appuntamenti.";

/// Body of the location table.
pub(crate) const TABLE_XPATH: &str = r#"//*[@id="tabComuneScelto"]/section/section/section/table/tbody"#;

/// Cells per row: marker, date, location, address, information.
const CELLS_PER_ROW: usize = 5;

/// Pattern for a `dd/mm/YYYY` date anywhere in the cell.
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").expect("Invalid regex"));

// ============================================================================
// Snapshot
// ============================================================================

/// Text content of one table row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    /// Rendered text of each `<td>`.
    pub cells: Vec<String>,
    /// `title` property of the information cell.
    pub info: Option<String>,
}

impl TableRow {
    /// Creates a row from cell texts.
    pub fn new<I, S>(cells: I, info: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
            info: info.map(ToString::to_string),
        }
    }
}

/// Snapshots every row of the table under `table`.
pub async fn read_table(
    surface: &dyn AutomationSurface,
    table: &ElementRef,
) -> Result<Vec<TableRow>, AutomationError> {
    let mut rows = Vec::new();
    for row in surface.find_all(Some(table), &Locator::tag("tr")).await? {
        let cells = surface.find_all(Some(&row), &Locator::tag("td")).await?;
        let mut texts = Vec::with_capacity(cells.len());
        for cell in &cells {
            texts.push(surface.text(cell).await?);
        }
        let info = match cells.get(CELLS_PER_ROW - 1) {
            Some(cell) => surface.property(cell, "title").await?,
            None => None,
        };
        rows.push(TableRow { cells: texts, info });
    }
    debug!(rows = rows.len(), "Table snapshot taken");
    Ok(rows)
}

// ============================================================================
// Parsing
// ============================================================================

/// What the date cell says about a location.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DateCell {
    /// The "no slots" text.
    Unavailable,
    /// A `dd/mm/YYYY` date somewhere in the cell.
    Date(NaiveDate),
    /// Anything else: the location is available but the text is kept as is.
    Text(String),
}

/// Parses the date cell. Only the "no slots" text means nothing is available.
fn parse_date_cell(text: &str) -> DateCell {
    let text = text.trim();
    if text == UNAVAILABLE_TEXT {
        return DateCell::Unavailable;
    }
    DATE_RE
        .find(text)
        .and_then(|found| NaiveDate::parse_from_str(found.as_str(), "%d/%m/%Y").ok())
        .map_or_else(|| DateCell::Text(text.to_string()), DateCell::Date)
}

/// Turns table rows into records (unfiltered).
pub fn parse_table(rows: &[TableRow]) -> Result<Vec<AvailabilityRecord>, FetchError> {
    rows.iter()
        .map(|row| {
            if row.cells.len() < CELLS_PER_ROW {
                return Err(FetchError::Malformed(format!(
                    "table row has {} cells, expected {CELLS_PER_ROW}",
                    row.cells.len()
                )));
            }
            let record = |date| {
                AvailabilityRecord::new(
                    row.cells[2].trim(),
                    row.cells[3].replace('\n', " ").trim(),
                    date,
                    RecordDetail::Info(row.info.clone().unwrap_or_default()),
                )
            };
            Ok(match parse_date_cell(&row.cells[1]) {
                DateCell::Unavailable => record(None),
                DateCell::Date(date) => record(Some(date)),
                DateCell::Text(text) => {
                    debug!(text = %text, "Date cell holds no date");
                    record(None).with_first_available_text(text)
                }
            })
        })
        .collect()
}
