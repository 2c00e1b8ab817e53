//! CLI output formatting tests.

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::TextFormatter;
    use chrono::NaiveDate;
    use passabot_core::{AvailabilityRecord, RecordDetail, SlotEntry};
    use passabot_store::Settings;
    use std::path::Path;

    fn record() -> AvailabilityRecord {
        let day = NaiveDate::from_ymd_opt(2026, 11, 3).unwrap();
        AvailabilityRecord::new(
            "Questura di Milano",
            "Via Fatebenefratelli 11",
            Some(day),
            RecordDetail::Slots(vec![
                SlotEntry::new(day.and_hms_opt(9, 30, 0).unwrap(), 2),
                SlotEntry::new(day.and_hms_opt(10, 0, 0).unwrap(), 1),
            ]),
        )
    }

    #[test]
    fn test_empty_records() {
        let formatter = TextFormatter::new(false);
        assert_eq!(formatter.format_records(&[]), "No appointments available");
    }

    #[test]
    fn test_records_without_colors() {
        let formatter = TextFormatter::new(false);
        let out = formatter.format_records(&[record()]);
        assert_eq!(
            out,
            "Questura di Milano\n  Via Fatebenefratelli 11\n  First available: 03/11/2026\n  - 03/11/2026 09:30: 2\n  - 03/11/2026 10:00: 1"
        );
    }

    #[test]
    fn test_colors_are_optional() {
        let plain = TextFormatter::new(false).format_records(&[record()]);
        let colored = TextFormatter::new(true).format_records(&[record()]);
        assert!(!plain.contains('\x1b'));
        assert!(colored.contains("\x1b[1m"));
    }

    #[test]
    fn test_settings_listing() {
        let formatter = TextFormatter::new(false);
        let out = formatter.format_settings(&Settings::default(), Path::new("/tmp/settings.json"));
        assert!(out.contains("/tmp/settings.json"));
        assert!(out.contains("Source             api"));
        assert!(out.contains("spawn chromedriver on port 9515"));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::JsonFormatter;
    use passabot_core::{AvailabilityRecord, RecordDetail};

    #[test]
    fn test_records_as_json() {
        let records = vec![AvailabilityRecord::new(
            "Rho",
            "Via Roma 1",
            chrono::NaiveDate::from_ymd_opt(2026, 11, 3),
            RecordDetail::Info("Solo residenti".to_string()),
        )];
        let out = JsonFormatter::new(false).format(&records).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["location"], "Rho");
        assert_eq!(value[0]["first_available_date"], "2026-11-03");
        assert_eq!(value[0]["detail"]["type"], "info");
    }

    #[test]
    fn test_pretty_output_is_multiline() {
        let out = JsonFormatter::new(true)
            .format(&serde_json::json!({"a": 1}))
            .unwrap();
        assert!(out.contains('\n'));
    }
}
