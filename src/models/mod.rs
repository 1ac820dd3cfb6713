//! Data models for the travel planner
//!
//! This module contains the core domain models organized by concern:
//! - Trip: validated trip parameters submitted by the user
//! - Plan: the assembled trip plan and its parts (hotels, places, costs)

pub mod plan;
pub mod trip;

// Re-export all public types for convenient access
pub use plan::{CostCategory, CostEstimate, HotelSuggestion, PlaceSuggestion, TripPlan};
pub use trip::{TravelType, TripRequest};

/// Format a monetary amount without trailing zeros for whole numbers
#[must_use]
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(2000.0), "2000");
        assert_eq!(format_amount(1999.5), "1999.50");
        assert_eq!(format_amount(0.1 + 0.2), "0.30");
    }
}
