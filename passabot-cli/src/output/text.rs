//! Text output formatting.

use passabot_core::{AvailabilityRecord, RecordDetail};
use passabot_store::Settings;
use std::fmt::Write;
use std::path::Path;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    /// Formats the records of one fetch.
    pub fn format_records(&self, records: &[AvailabilityRecord]) -> String {
        if records.is_empty() {
            return self.paint(DIM, "No appointments available");
        }

        let mut out = String::new();
        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "{}", self.paint(BOLD, &record.location));
            let _ = writeln!(out, "  {}", self.paint(DIM, &record.address));
            if let Some(label) = record.first_available_label() {
                let _ = writeln!(out, "  First available: {}", self.paint(GREEN, &label));
            }
            match &record.detail {
                RecordDetail::Info(info) => {
                    let _ = writeln!(out, "  {info}");
                }
                RecordDetail::Slots(slots) => {
                    for slot in slots {
                        let _ = writeln!(
                            out,
                            "  - {}: {}",
                            slot.starts_at.format("%d/%m/%Y %H:%M"),
                            slot.remaining
                        );
                    }
                }
            }
        }
        out.trim_end().to_string()
    }

    /// Formats the settings.
    pub fn format_settings(&self, settings: &Settings, path: &Path) -> String {
        let webdriver = settings
            .webdriver
            .url
            .clone()
            .unwrap_or_else(|| format!("spawn {} on port {}", settings.webdriver.binary, settings.webdriver.port));

        let rows = [
            ("Settings file", path.display().to_string()),
            ("Source", settings.source.to_string()),
            ("Authentication", settings.auth.to_string()),
            ("Poll interval", format!("{}s", settings.poll_interval_secs)),
            ("Login backoff", format!("{}s", settings.login_backoff_secs)),
            ("Heartbeat", format!("{}s", settings.heartbeat_interval_secs)),
            ("Silence after", format!("{} cycles", settings.silence_threshold)),
            ("Confirmation wait", format!("{}s", settings.confirmation_wait_secs)),
            ("Request timeout", format!("{}s", settings.request_timeout_secs)),
            ("Diagnostics", settings.diagnostics_dir().display().to_string()),
            ("WebDriver", webdriver),
            ("Headless", settings.webdriver.headless.to_string()),
        ];

        let mut out = format!("{}\n{}\n", self.paint(BOLD, "passabot Configuration"), "─".repeat(40));
        for (label, value) in rows {
            let _ = writeln!(out, "{label:<18} {value}");
        }
        out.trim_end().to_string()
    }
}
