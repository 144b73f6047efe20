//! Linear impact model and the derived views built on top of it.
//!
//! Every token costs a fixed amount of energy, carbon and water. The
//! helpers below turn a day's totals into things a person can relate to:
//! an impact tier, everyday comparisons, progress against a daily carbon
//! goal and a few efficiency tips.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

use crate::models::{DailyLedger, TokenCount};

/// Watt-hours per token.
pub const ENERGY_WH_PER_TOKEN: f64 = 0.001;
/// Grams of CO2 per token.
pub const CARBON_GRAMS_PER_TOKEN: f64 = 0.5;
/// Millilitres of water per token.
pub const WATER_ML_PER_TOKEN: f64 = 0.1;

/// Default daily carbon goal in grams.
pub const DEFAULT_DAILY_GOAL_GRAMS: f64 = 100.0;

/// Carbon below this is a low-impact day.
pub const LOW_IMPACT_CEILING_GRAMS: f64 = 10.0;
/// Carbon below this (and at or above the low ceiling) is a medium-impact day.
pub const MEDIUM_IMPACT_CEILING_GRAMS: f64 = 50.0;

const CAR_GRAMS_PER_MILE: f64 = 404.0;
const TREE_GRAMS_PER_YEAR: f64 = 21_000.0;
const PHONE_CHARGE_WH: f64 = 18.0;
const LIGHT_BULB_WATTS: f64 = 10.0;
const COFFEE_CUP_ML: f64 = 140.0;

const TIP_QUERY_THRESHOLD: u64 = 20;
const TIP_TOKEN_THRESHOLD: u64 = 10_000;
const TIP_CARBON_THRESHOLD_GRAMS: f64 = 50.0;

/// Tip shown when many queries were sent today.
pub const TIP_BATCH_QUERIES: &str = "Consider batching similar questions to reduce API calls";
/// Tip shown when many tokens were used today.
pub const TIP_SHORTER_PROMPTS: &str = "Try using shorter prompts for simple tasks";
/// Tip shown when today's carbon is high.
pub const TIP_TAKE_BREAKS: &str =
    "High carbon usage today - consider taking breaks between AI sessions";

// ============================================================================
// Impact Quantity
// ============================================================================

/// Energy, carbon and water attributed to some number of tokens.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactQuantity {
    /// Energy in watt-hours.
    pub energy_wh: f64,
    /// Carbon in grams of CO2.
    pub carbon_grams: f64,
    /// Water in millilitres.
    pub water_ml: f64,
}

impl ImpactQuantity {
    /// Converts a token count using the fixed per-token coefficients.
    pub fn from_tokens(tokens: TokenCount) -> Self {
        let n = tokens.get() as f64;
        Self {
            energy_wh: n * ENERGY_WH_PER_TOKEN,
            carbon_grams: n * CARBON_GRAMS_PER_TOKEN,
            water_ml: n * WATER_ML_PER_TOKEN,
        }
    }
}

impl Add for ImpactQuantity {
    type Output = ImpactQuantity;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            energy_wh: self.energy_wh + rhs.energy_wh,
            carbon_grams: self.carbon_grams + rhs.carbon_grams,
            water_ml: self.water_ml + rhs.water_ml,
        }
    }
}

impl AddAssign for ImpactQuantity {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Converts a token count into its impact.
pub fn to_impact(tokens: TokenCount) -> ImpactQuantity {
    ImpactQuantity::from_tokens(tokens)
}

// ============================================================================
// Impact Level
// ============================================================================

/// Coarse tier for a day's carbon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    /// Under 10 g.
    Low,
    /// 10 g up to 50 g.
    Medium,
    /// 50 g and above.
    High,
}

impl ImpactLevel {
    /// Returns the lowercase label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies carbon grams into a tier.
pub fn impact_level(carbon_grams: f64) -> ImpactLevel {
    if carbon_grams < LOW_IMPACT_CEILING_GRAMS {
        ImpactLevel::Low
    } else if carbon_grams < MEDIUM_IMPACT_CEILING_GRAMS {
        ImpactLevel::Medium
    } else {
        ImpactLevel::High
    }
}

// ============================================================================
// Comparisons
// ============================================================================

/// Everyday equivalents, pre-formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparisons {
    /// Miles driven in an average car.
    pub car_miles: String,
    /// Trees needed for a year to absorb the carbon.
    pub trees_needed: String,
    /// Smartphone charges.
    pub phone_charges: String,
    /// Hours of a 10 W LED bulb.
    pub light_bulb_hours: String,
    /// Cups of coffee worth of water.
    pub coffee_cups: String,
}

/// Builds the everyday comparisons for a day's totals.
pub fn comparisons(ledger: &DailyLedger) -> Comparisons {
    Comparisons {
        car_miles: format!("{:.2}", ledger.carbon_grams / CAR_GRAMS_PER_MILE),
        trees_needed: format!("{:.3}", ledger.carbon_grams / TREE_GRAMS_PER_YEAR),
        phone_charges: format!("{:.1}", ledger.energy_wh / PHONE_CHARGE_WH),
        light_bulb_hours: format!("{:.1}", ledger.energy_wh / LIGHT_BULB_WATTS),
        coffee_cups: format!("{:.1}", ledger.water_ml / COFFEE_CUP_ML),
    }
}

// ============================================================================
// Goal Progress
// ============================================================================

/// Progress toward a daily carbon budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    /// Share of the goal used, capped at 100.
    pub percentage: f64,
    /// Grams left before the goal is reached, never negative.
    pub remaining: f64,
    /// True once carbon is strictly above the goal.
    pub exceeded: bool,
}

/// Computes progress against `daily_goal` grams.
///
/// A non-positive goal falls back to [`DEFAULT_DAILY_GOAL_GRAMS`].
pub fn goal_progress(carbon_grams: f64, daily_goal: f64) -> GoalProgress {
    let goal = if daily_goal > 0.0 {
        daily_goal
    } else {
        DEFAULT_DAILY_GOAL_GRAMS
    };

    GoalProgress {
        percentage: (carbon_grams / goal * 100.0).min(100.0),
        remaining: (goal - carbon_grams).max(0.0),
        exceeded: carbon_grams > goal,
    }
}

// ============================================================================
// Efficiency Tips
// ============================================================================

/// Returns the tips whose thresholds today's totals crossed, in fixed order.
pub fn efficiency_tips(ledger: &DailyLedger) -> Vec<&'static str> {
    let mut tips = Vec::new();

    if ledger.queries > TIP_QUERY_THRESHOLD {
        tips.push(TIP_BATCH_QUERIES);
    }
    if ledger.total_tokens > TIP_TOKEN_THRESHOLD {
        tips.push(TIP_SHORTER_PROMPTS);
    }
    if ledger.carbon_grams > TIP_CARBON_THRESHOLD_GRAMS {
        tips.push(TIP_TAKE_BREAKS);
    }

    tips
}

// ============================================================================
// Number Formatting
// ============================================================================

/// Compact display formatting with `K`/`M` suffixes.
///
/// Values under 1 get one extra decimal place.
pub fn format_number(value: f64, decimals: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    if value < 1.0 {
        format!("{:.*}", decimals + 1, value)
    } else if value < 1_000.0 {
        format!("{value:.decimals$}")
    } else if value < 1_000_000.0 {
        format!("{:.*}K", decimals, value / 1_000.0)
    } else {
        format!("{:.*}M", decimals, value / 1_000_000.0)
    }
}

// ============================================================================
// Impact Summary
// ============================================================================

/// Everything a viewer needs to render one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactSummary {
    /// The day's totals.
    pub ledger: DailyLedger,
    /// Carbon tier.
    pub level: ImpactLevel,
    /// Everyday equivalents.
    pub comparisons: Comparisons,
    /// Progress against the daily goal.
    pub goal: GoalProgress,
    /// Advisory messages.
    pub tips: Vec<String>,
}

impl ImpactSummary {
    /// Derives all views for `ledger` against `daily_goal` grams.
    pub fn new(ledger: &DailyLedger, daily_goal: f64) -> Self {
        Self {
            level: impact_level(ledger.carbon_grams),
            comparisons: comparisons(ledger),
            goal: goal_progress(ledger.carbon_grams, daily_goal),
            tips: efficiency_tips(ledger)
                .into_iter()
                .map(str::to_string)
                .collect(),
            ledger: ledger.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
