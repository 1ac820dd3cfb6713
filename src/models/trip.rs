//! Trip request model: the validated parameters of one planning request

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of travel the plan should be tailored for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelType {
    Leisure,
    Business,
    Adventure,
    Budget,
    Luxury,
    Family,
    Romantic,
    Solo,
}

impl TravelType {
    /// Every supported travel type, in display order
    pub const ALL: [TravelType; 8] = [
        TravelType::Leisure,
        TravelType::Business,
        TravelType::Adventure,
        TravelType::Budget,
        TravelType::Luxury,
        TravelType::Family,
        TravelType::Romantic,
        TravelType::Solo,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelType::Leisure => "leisure",
            TravelType::Business => "business",
            TravelType::Adventure => "adventure",
            TravelType::Budget => "budget",
            TravelType::Luxury => "luxury",
            TravelType::Family => "family",
            TravelType::Romantic => "romantic",
            TravelType::Solo => "solo",
        }
    }
}

impl fmt::Display for TravelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        TravelType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown travel type '{}', expected one of: {}",
                    s.trim(),
                    TravelType::ALL
                        .iter()
                        .map(TravelType::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// Validated trip parameters
///
/// Only the input collector builds these, so every instance satisfies
/// `budget > 0`, `duration_days > 0` and a non-empty destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripRequest {
    destination: String,
    area: Option<String>,
    budget: f64,
    duration_days: u32,
    travel_type: TravelType,
    interests: Vec<String>,
}

impl TripRequest {
    pub(crate) fn new(
        destination: String,
        area: Option<String>,
        budget: f64,
        duration_days: u32,
        travel_type: TravelType,
        interests: Vec<String>,
    ) -> Self {
        Self {
            destination,
            area,
            budget,
            duration_days,
            travel_type,
            interests,
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Preferred neighbourhood within the destination
    pub fn area(&self) -> Option<&str> {
        self.area.as_deref()
    }

    /// Total budget in the configured currency
    pub fn budget(&self) -> f64 {
        self.budget
    }

    pub fn duration_days(&self) -> u32 {
        self.duration_days
    }

    pub fn travel_type(&self) -> TravelType {
        self.travel_type
    }

    /// Interest tags, de-duplicated, in submission order
    pub fn interests(&self) -> &[String] {
        &self.interests
    }

    /// "Area, Destination" when an area was given, the destination otherwise
    #[must_use]
    pub fn location_label(&self) -> String {
        match &self.area {
            Some(area) => format!("{area}, {}", self.destination),
            None => self.destination.clone(),
        }
    }

    #[must_use]
    pub fn interests_label(&self) -> String {
        if self.interests.is_empty() {
            "General exploration".to_string()
        } else {
            self.interests.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("leisure", TravelType::Leisure)]
    #[case("Business", TravelType::Business)]
    #[case("  ADVENTURE ", TravelType::Adventure)]
    #[case("luxury", TravelType::Luxury)]
    fn test_travel_type_parsing(#[case] input: &str, #[case] expected: TravelType) {
        assert_eq!(input.parse::<TravelType>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_travel_type_lists_choices() {
        let err = "space".parse::<TravelType>().unwrap_err();
        assert!(err.contains("space"));
        assert!(err.contains("leisure"));
    }

    #[test]
    fn test_travel_type_round_trips_through_display() {
        for travel_type in TravelType::ALL {
            assert_eq!(travel_type.to_string().parse::<TravelType>().unwrap(), travel_type);
        }
    }

    #[test]
    fn test_labels() {
        let request = TripRequest::new(
            "Goa".to_string(),
            Some("Calangute".to_string()),
            20000.0,
            4,
            TravelType::Budget,
            vec![],
        );
        assert_eq!(request.location_label(), "Calangute, Goa");
        assert_eq!(request.interests_label(), "General exploration");

        let request = TripRequest::new(
            "Paris".to_string(),
            None,
            2000.0,
            5,
            TravelType::Leisure,
            vec!["art".to_string(), "food".to_string()],
        );
        assert_eq!(request.location_label(), "Paris");
        assert_eq!(request.interests_label(), "art, food");
    }
}
