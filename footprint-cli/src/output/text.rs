//! Text output formatting with progress bars and colors.

use footprint_core::{
    ApiProvider, ArchivedLedger, ImpactLevel, ImpactQuantity, ImpactSummary, TokenCount,
    format_number,
};
use footprint_ingest::SiteAdapter;
use footprint_store::PumpStats;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

// Progress bar characters
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    bar_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            bar_width: 20,
        }
    }

    /// Set the progress bar width.
    #[cfg(test)]
    pub fn with_bar_width(mut self, width: usize) -> Self {
        self.bar_width = width;
        self
    }

    /// Formats today's totals with their derived views.
    pub fn format_status(&self, summary: &ImpactSummary) -> String {
        let ledger = &summary.ledger;
        let mut lines = Vec::new();

        lines.push(format!(
            "{} {}",
            self.bold(&format!("Today ({})", ledger.date.format("%Y-%m-%d"))),
            self.format_level(summary.level)
        ));
        lines.push("─".repeat(44));

        lines.push(format!("Queries:  {}", ledger.queries));
        lines.push(format!(
            "Tokens:   {}",
            format_number(ledger.total_tokens as f64, 1)
        ));
        lines.push(format!("Energy:   {} Wh", format_number(ledger.energy_wh, 2)));
        lines.push(format!("Carbon:   {} g CO₂", format_number(ledger.carbon_grams, 1)));
        lines.push(format!("Water:    {} ml", format_number(ledger.water_ml, 1)));

        lines.push(String::new());
        let goal = &summary.goal;
        let bar = self.progress_bar(goal.percentage);
        let pct = self.color_for_used(goal.percentage, &format!("{:.0}%", goal.percentage));
        lines.push(format!("Goal:     {bar} {pct}"));
        if goal.exceeded {
            lines.push(format!("          {}", self.red("Daily goal exceeded")));
        } else {
            lines.push(format!(
                "          {}",
                self.dim(&format!("{} g left", format_number(goal.remaining, 1)))
            ));
        }

        lines.push(String::new());
        lines.push(self.dim("Equivalent to:"));
        let c = &summary.comparisons;
        lines.push(format!("  {} miles driven", c.car_miles));
        lines.push(format!("  {} trees for a year", c.trees_needed));
        lines.push(format!("  {} phone charges", c.phone_charges));
        lines.push(format!("  {} hours of an LED bulb", c.light_bulb_hours));
        lines.push(format!("  {} cups of coffee (water)", c.coffee_cups));

        if !summary.tips.is_empty() {
            lines.push(String::new());
            lines.push(self.dim("Tips:"));
            for tip in &summary.tips {
                lines.push(format!("  • {}", self.cyan(tip)));
            }
        }

        lines.join("\n")
    }

    /// Formats archived days, one per line.
    pub fn format_history(&self, history: &[ArchivedLedger]) -> String {
        if history.is_empty() {
            return self.dim("No archived days");
        }

        let mut lines = vec![
            format!(
                "{:<12} {:>8} {:>10} {:>10} {:>10}",
                "Date", "Queries", "Tokens", "Carbon g", "Water ml"
            ),
            "─".repeat(54),
        ];
        for day in history {
            lines.push(format!(
                "{:<12} {:>8} {:>10} {:>10} {:>10}",
                day.date.format("%Y-%m-%d").to_string(),
                day.queries,
                format_number(day.total_tokens as f64, 1),
                format_number(day.carbon_grams, 1),
                format_number(day.water_ml, 1),
            ));
        }
        lines.join("\n")
    }

    /// Formats a token estimate and its impact.
    pub fn format_estimate(&self, tokens: TokenCount, impact: &ImpactQuantity) -> String {
        [
            format!("{} tokens", self.bold(&tokens.get().to_string())),
            format!("Energy: {} Wh", format_number(impact.energy_wh, 3)),
            format!("Carbon: {} g CO₂", format_number(impact.carbon_grams, 2)),
            format!("Water:  {} ml", format_number(impact.water_ml, 2)),
        ]
        .join("\n")
    }

    /// Formats the outcome of an ingest run.
    pub fn format_pump_stats(&self, stats: &PumpStats) -> String {
        let mut line = if stats.queued > 0 {
            format!("Queued {} turn(s) for the running host", stats.queued)
        } else {
            format!("Recorded {} turn(s)", stats.recorded)
        };
        if stats.duplicates > 0 {
            line.push_str(&format!(", {} duplicate(s) skipped", stats.duplicates));
        }
        if stats.rejected > 0 {
            line.push_str(&format!(", {}", self.yellow(&format!("{} rejected", stats.rejected))));
        }
        if stats.unsaved > 0 {
            line.push_str(&format!(", {}", self.red(&format!("{} not yet saved", stats.unsaved))));
        }
        line
    }

    /// Formats the adapter list header.
    pub fn format_adapters_header(&self) -> String {
        format!(
            "{:<10} {:<10} {:<8} {:<8} {}",
            self.bold("Site"),
            self.bold("CLI"),
            self.bold("Settle"),
            self.bold("Drafts"),
            self.bold("Hosts")
        )
    }

    /// Formats a single adapter line.
    pub fn format_adapter_line(&self, adapter: &dyn SiteAdapter, enabled: bool) -> String {
        let status = if enabled {
            self.green("✓")
        } else {
            self.dim("−")
        };
        let drafts = if adapter.tracks_drafts() {
            self.green("✓")
        } else {
            self.dim("−")
        };

        format!(
            "{:<10} {:<10} {:<8} {:<8} {}",
            format!("{} {}", adapter.kind().display_name(), status),
            adapter.kind().cli_name(),
            format!("{}s", adapter.settle_timeout().as_secs_f64()),
            drafts,
            adapter.hostnames().join(", ")
        )
    }

    /// Formats a tracked API host line.
    pub fn format_api_line(&self, provider: ApiProvider) -> String {
        format!("{:<10} {}", provider.display_name(), self.dim(provider.hostname()))
    }

    /// Formats a transient notice.
    pub fn format_notice(&self, message: &str) -> String {
        format!("{} {}", self.yellow("!"), message)
    }

    /// Formats a progress bar for the share of a goal used.
    pub fn progress_bar(&self, percent_used: f64) -> String {
        let filled = ((percent_used.clamp(0.0, 100.0) / 100.0) * self.bar_width as f64).round()
            as usize;
        let empty = self.bar_width.saturating_sub(filled);

        let bar = format!(
            "{}{}",
            BAR_FULL.to_string().repeat(filled),
            BAR_EMPTY.to_string().repeat(empty)
        );

        self.color_for_used(percent_used, &bar)
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn format_level(&self, level: ImpactLevel) -> String {
        let label = format!("[{} impact]", level.label());
        match level {
            ImpactLevel::Low => self.green(&label),
            ImpactLevel::Medium => self.yellow(&label),
            ImpactLevel::High => self.red(&label),
        }
    }

    fn color_for_used(&self, percent: f64, text: &str) -> String {
        if !self.use_colors {
            return text.to_string();
        }

        if percent >= 80.0 {
            self.red(text)
        } else if percent >= 50.0 {
            self.yellow(text)
        } else {
            self.green(text)
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

// ============================================================================
// Tests
// ============================================================================
