//! Daily ledger aggregate.
//!
//! A [`DailyLedger`] holds one calendar day's running totals. Totals only
//! ever grow through [`DailyLedger::apply`]; nothing sets them directly
//! outside of tests and deserialization.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::impact::ImpactQuantity;
use crate::models::{Role, TokenCount};

// ============================================================================
// Daily Ledger
// ============================================================================

/// Running totals for a single calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLedger {
    /// Local calendar day these totals belong to.
    pub date: NaiveDate,
    /// User-originated turns observed.
    #[serde(default)]
    pub queries: u64,
    /// Tokens across user and assistant turns.
    #[serde(default)]
    pub total_tokens: u64,
    /// Energy in watt-hours.
    #[serde(default)]
    pub energy_wh: f64,
    /// Carbon in grams of CO2.
    #[serde(default)]
    pub carbon_grams: f64,
    /// Water in millilitres.
    #[serde(default)]
    pub water_ml: f64,
}

/// Immutable snapshot of a closed-out day.
pub type ArchivedLedger = DailyLedger;

impl DailyLedger {
    /// Creates a zeroed ledger for `date`.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            queries: 0,
            total_tokens: 0,
            energy_wh: 0.0,
            carbon_grams: 0.0,
            water_ml: 0.0,
        }
    }

    /// Adds one turn's contribution.
    ///
    /// `queries` only moves for user turns.
    pub fn apply(&mut self, tokens: TokenCount, role: Role) {
        let impact = ImpactQuantity::from_tokens(tokens);

        self.total_tokens = self.total_tokens.saturating_add(tokens.get());
        self.energy_wh += impact.energy_wh;
        self.carbon_grams += impact.carbon_grams;
        self.water_ml += impact.water_ml;

        if role == Role::User {
            self.queries += 1;
        }
    }

    /// Returns true if this ledger belongs to `today`.
    pub fn is_for(&self, today: NaiveDate) -> bool {
        self.date == today
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.queries == 0 && self.total_tokens == 0
    }

    /// Returns the impact totals as a quantity.
    pub fn impact(&self) -> ImpactQuantity {
        ImpactQuantity {
            energy_wh: self.energy_wh,
            carbon_grams: self.carbon_grams,
            water_ml: self.water_ml,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
