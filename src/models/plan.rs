//! Trip plan model: the aggregate answer for one trip request

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::PlannerError;

/// Relative tolerance used when checking that a total matches its breakdown
const TOTAL_TOLERANCE: f64 = 1e-9;

/// Complete plan for a trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    /// Short profile of the trip
    pub summary: String,
    /// Constraints or things to keep in mind
    #[serde(default)]
    pub considerations: Vec<String>,
    /// Accommodation options, best first
    pub hotels: Vec<HotelSuggestion>,
    /// Places to visit, best first
    pub places: Vec<PlaceSuggestion>,
    pub cost_estimate: CostEstimate,
    /// Model that produced the plan
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

/// A recommended accommodation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelSuggestion {
    pub name: String,
    /// Human readable price range, e.g. "2500-3000 INR/night"
    pub price_range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_night: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    /// Why it fits the trip
    #[serde(alias = "reason", alias = "why")]
    pub rationale: String,
}

/// A recommended place to visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSuggestion {
    pub name: String,
    /// Interest tag or kind of place
    #[serde(alias = "interest", alias = "tag")]
    pub category: String,
    #[serde(alias = "reason", alias = "why")]
    pub rationale: String,
}

/// Cost categories of an estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostCategory {
    Lodging,
    Food,
    Transport,
    Activities,
    Misc,
}

impl CostCategory {
    pub const ALL: [CostCategory; 5] = [
        CostCategory::Lodging,
        CostCategory::Food,
        CostCategory::Transport,
        CostCategory::Activities,
        CostCategory::Misc,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CostCategory::Lodging => "lodging",
            CostCategory::Food => "food",
            CostCategory::Transport => "transport",
            CostCategory::Activities => "activities",
            CostCategory::Misc => "misc",
        }
    }

    /// Display label used in rendered plans
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            CostCategory::Lodging => "Hotel stay",
            CostCategory::Food => "Food",
            CostCategory::Transport => "Transport/local travel",
            CostCategory::Activities => "Entry tickets & activities",
            CostCategory::Misc => "Misc",
        }
    }
}

impl fmt::Display for CostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostCategory {
    type Err = String;

    /// Accepts the canonical names plus the synonyms models tend to use
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace([' ', '-', '/'], "_");
        match key.as_str() {
            "lodging" | "hotel" | "hotels" | "hotel_stay" | "accommodation" => {
                Ok(CostCategory::Lodging)
            }
            "food" | "meals" | "dining" => Ok(CostCategory::Food),
            "transport" | "transportation" | "local_travel" | "transport_local_travel" => {
                Ok(CostCategory::Transport)
            }
            "activities" | "entry_tickets" | "tickets" | "sightseeing" => {
                Ok(CostCategory::Activities)
            }
            "misc" | "miscellaneous" | "other" => Ok(CostCategory::Misc),
            _ => Err(format!("unknown cost category '{}'", s.trim())),
        }
    }
}

/// Estimated trip cost
///
/// `total` is always computed from `breakdown`; it is never taken from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    breakdown: BTreeMap<CostCategory, f64>,
    total: f64,
    currency: String,
    within_budget: bool,
}

impl CostEstimate {
    /// Build an estimate from per-category amounts, checked against `budget`
    pub fn new(
        breakdown: BTreeMap<CostCategory, f64>,
        currency: impl Into<String>,
        budget: f64,
    ) -> crate::Result<Self> {
        if breakdown.is_empty() {
            return Err(PlannerError::malformed("costs", "cost breakdown is empty"));
        }
        if let Some((category, amount)) = breakdown
            .iter()
            .find(|(_, amount)| !amount.is_finite() || **amount < 0.0)
        {
            return Err(PlannerError::malformed(
                "costs",
                format!("{category} amount {amount} is not a finite non-negative number"),
            ));
        }

        let total: f64 = breakdown.values().sum();
        if !total.is_finite() {
            return Err(PlannerError::malformed(
                "costs",
                "cost total is not a finite number",
            ));
        }
        Ok(Self {
            breakdown,
            total,
            currency: currency.into(),
            within_budget: total <= budget,
        })
    }

    pub fn breakdown(&self) -> &BTreeMap<CostCategory, f64> {
        &self.breakdown
    }

    pub fn amount(&self, category: CostCategory) -> Option<f64> {
        self.breakdown.get(&category).copied()
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn within_budget(&self) -> bool {
        self.within_budget
    }

    /// Whether `total` equals the sum of the category amounts
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let sum: f64 = self.breakdown.values().sum();
        self.total.is_finite() && (self.total - sum).abs() <= TOTAL_TOLERANCE * sum.abs().max(1.0)
    }
}
