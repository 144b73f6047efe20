//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::TextFormatter;
    use chrono::NaiveDate;
    use footprint_core::{DailyLedger, ImpactSummary, Role, TokenCount, to_impact};
    use footprint_ingest::ClaudeAdapter;
    use footprint_store::PumpStats;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn ledger_with(tokens: u64) -> DailyLedger {
        let mut ledger = DailyLedger::new(day(18));
        ledger.apply(TokenCount::new(tokens), Role::User);
        ledger
    }

    #[test]
    fn test_progress_bar_boundary_values() {
        let formatter = TextFormatter::new(false).with_bar_width(10);

        let test_cases = vec![
            (0.0, "░░░░░░░░░░"),
            (10.0, "█░░░░░░░░░"),
            (25.0, "███░░░░░░░"), // 2.5 rounds to 3 blocks
            (50.0, "█████░░░░░"),
            (100.0, "██████████"),
            (140.0, "██████████"),
        ];

        for (percent, expected) in test_cases {
            let bar = formatter.progress_bar(percent);
            assert_eq!(bar, expected, "Failed for {percent}%");
        }
    }

    #[test]
    fn test_progress_bar_with_colors() {
        let formatter = TextFormatter::new(true);

        assert!(formatter.progress_bar(10.0).contains("\x1b[32m"), "Green under half");
        assert!(formatter.progress_bar(60.0).contains("\x1b[33m"), "Yellow from half");
        assert!(formatter.progress_bar(90.0).contains("\x1b[31m"), "Red near the goal");
    }

    #[test]
    fn test_format_status_low_usage() {
        let formatter = TextFormatter::new(false);
        let summary = ImpactSummary::new(&ledger_with(12), 100.0);

        let output = formatter.format_status(&summary);

        assert!(output.contains("Today (2026-10-18)"));
        assert!(output.contains("[low impact]"));
        assert!(output.contains("Queries:  1"));
        assert!(output.contains("Tokens:   12.0"));
        assert!(output.contains("6.0 g CO₂"));
        assert!(output.contains("94.0 g left"));
        assert!(!output.contains("Tips:"));
    }

    #[test]
    fn test_format_status_goal_exceeded_shows_tips() {
        let formatter = TextFormatter::new(false);
        let summary = ImpactSummary::new(&ledger_with(12_000), 100.0);

        let output = formatter.format_status(&summary);

        assert!(output.contains("[high impact]"));
        assert!(output.contains("Daily goal exceeded"));
        assert!(output.contains("100%"));
        assert!(output.contains("Tips:"));
    }

    #[test]
    fn test_format_history() {
        let formatter = TextFormatter::new(false);
        assert_eq!(formatter.format_history(&[]), "No archived days");

        let mut older = ledger_with(500);
        older.date = day(17);
        let output = formatter.format_history(&[ledger_with(2_500), older]);
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("2026-10-18"));
        assert!(lines[2].contains("2.5K"));
        assert!(lines[3].starts_with("2026-10-17"));
    }

    #[test]
    fn test_format_estimate() {
        let formatter = TextFormatter::new(false);
        let tokens = TokenCount::new(1000);
        let output = formatter.format_estimate(tokens, &to_impact(tokens));

        assert!(output.starts_with("1000 tokens"));
        assert!(output.contains("Energy: 1.000 Wh"));
        assert!(output.contains("Carbon: 500.00 g CO₂"));
        assert!(output.contains("Water:  100.00 ml"));
    }

    #[test]
    fn test_format_pump_stats() {
        let formatter = TextFormatter::new(false);
        let stats = PumpStats {
            recorded: 3,
            duplicates: 1,
            rejected: 2,
            ..PumpStats::default()
        };
        assert_eq!(
            formatter.format_pump_stats(&stats),
            "Recorded 3 turn(s), 1 duplicate(s) skipped, 2 rejected"
        );
    }

    #[test]
    fn test_format_pump_stats_queued_for_host() {
        let formatter = TextFormatter::new(false);
        let stats = PumpStats {
            queued: 4,
            ..PumpStats::default()
        };
        assert_eq!(
            formatter.format_pump_stats(&stats),
            "Queued 4 turn(s) for the running host"
        );
    }

    #[test]
    fn test_format_adapter_line() {
        let formatter = TextFormatter::new(false);
        let line = formatter.format_adapter_line(&ClaudeAdapter, true);
        assert!(line.contains("Claude ✓"));
        assert!(line.contains("claude.ai"));
        assert!(line.contains("2s"));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::JsonFormatter;
    use footprint_core::{ApiProvider, TokenCount, to_impact};
    use footprint_ingest::{GeminiAdapter, SiteAdapter};
    use footprint_store::PumpStats;

    #[test]
    fn test_format_estimate() {
        let formatter = JsonFormatter::new(false);
        let tokens = TokenCount::new(12);
        let output = formatter.format_estimate(tokens, "precise", &to_impact(tokens)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["tokens"], 12);
        assert_eq!(value["mode"], "precise");
        assert_eq!(value["carbonGrams"], 6.0);
    }

    #[test]
    fn test_format_providers() {
        let formatter = JsonFormatter::new(true);
        let gemini = GeminiAdapter::gemini();
        let adapters: Vec<(&dyn SiteAdapter, bool)> = vec![(&gemini, false)];

        let output = formatter.format_providers(&adapters, ApiProvider::all()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["adapters"][0]["cliName"], "gemini");
        assert_eq!(value["adapters"][0]["tracksDrafts"], true);
        assert_eq!(value["adapters"][0]["enabled"], false);
        assert_eq!(value["adapters"][0]["settleMs"], 2000);
        assert_eq!(value["apiHosts"].as_array().unwrap().len(), 5);
        assert_eq!(value["apiHosts"][0]["hostname"], "api.openai.com");
    }

    #[test]
    fn test_format_ingest() {
        let formatter = JsonFormatter::new(false);
        let stats = PumpStats {
            recorded: 2,
            ..PumpStats::default()
        };
        let output = formatter.format_ingest(&stats, 1).unwrap();
        assert_eq!(
            output,
            r#"{"recorded":2,"duplicates":0,"rejected":0,"unsaved":0,"queued":0,"invalidLines":1}"#
        );
    }
}
