//! Input collection
//!
//! Turns raw user-submitted trip fields (JSON body or HTML form) into a
//! validated [`TripRequest`]. Every offending field is reported at once.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;

use crate::error::FieldError;
use crate::models::{TravelType, TripRequest};
use crate::{PlannerError, Result};

const MAX_TEXT_LEN: usize = 200;
const MAX_INTERESTS: usize = 20;

/// Raw trip parameters as submitted to the JSON API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripInput {
    #[serde(default)]
    pub destination: Option<String>,
    /// Preferred area within the destination
    #[serde(default)]
    pub area: Option<String>,
    /// A number or a numeric string
    #[serde(default)]
    pub budget: Option<Value>,
    /// A whole number or a numeric string
    #[serde(default, alias = "duration")]
    pub duration_days: Option<Value>,
    #[serde(default)]
    pub travel_type: Option<String>,
    /// Either a list of tags or one comma-separated string
    #[serde(default, deserialize_with = "interest_list")]
    pub interests: Vec<String>,
}

/// Raw trip parameters as posted by the HTML form; everything arrives as text
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripForm {
    pub destination: Option<String>,
    pub area: Option<String>,
    pub budget: Option<String>,
    pub duration_days: Option<String>,
    pub travel_type: Option<String>,
    pub interests: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Interests {
    List(Vec<String>),
    Text(String),
}

fn interest_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error> {
    Ok(match Option::<Interests>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Interests::List(list)) => list,
        Some(Interests::Text(text)) => split_interests(&text),
    })
}

fn split_interests(text: &str) -> Vec<String> {
    text.split(',').map(str::to_string).collect()
}

/// Trip fields once numbers have been read, before validation
struct RawTrip {
    destination: Option<String>,
    area: Option<String>,
    budget: Option<f64>,
    duration_days: Option<i64>,
    travel_type: Option<String>,
    interests: Vec<String>,
}

/// Validates raw trip parameters
#[derive(Debug, Clone)]
pub struct InputCollector {
    max_duration_days: u32,
}

impl InputCollector {
    pub fn new(max_duration_days: u32) -> Self {
        Self { max_duration_days }
    }

    /// Validate a JSON submission
    pub fn collect(&self, input: TripInput) -> Result<TripRequest> {
        let mut errors = Vec::new();
        let budget = json_number(&mut errors, "budget", input.budget);
        let duration_days = json_whole_number(&mut errors, "duration_days", input.duration_days);

        let fields = RawTrip {
            destination: input.destination,
            area: input.area,
            budget,
            duration_days,
            travel_type: input.travel_type,
            interests: input.interests,
        };
        self.validate(fields, errors)
    }

    /// Validate an HTML form submission
    pub fn collect_form(&self, form: TripForm) -> Result<TripRequest> {
        let mut errors = Vec::new();
        let budget = parse_number::<f64>(&mut errors, "budget", form.budget.as_deref());
        let duration_days =
            parse_number::<i64>(&mut errors, "duration_days", form.duration_days.as_deref());

        let fields = RawTrip {
            destination: form.destination,
            area: form.area,
            budget,
            duration_days,
            travel_type: form.travel_type,
            interests: form
                .interests
                .as_deref()
                .map(split_interests)
                .unwrap_or_default(),
        };
        self.validate(fields, errors)
    }

    fn validate(&self, input: RawTrip, mut errors: Vec<FieldError>) -> Result<TripRequest> {
        let destination = non_blank(input.destination);
        match &destination {
            None => errors.push(FieldError::new("destination", "is required")),
            Some(d) if d.chars().count() > MAX_TEXT_LEN => errors.push(FieldError::new(
                "destination",
                format!("must be at most {MAX_TEXT_LEN} characters"),
            )),
            Some(_) => {}
        }

        let area = non_blank(input.area);
        if area.as_ref().is_some_and(|a| a.chars().count() > MAX_TEXT_LEN) {
            errors.push(FieldError::new(
                "area",
                format!("must be at most {MAX_TEXT_LEN} characters"),
            ));
        }

        match input.budget {
            None => require(&mut errors, "budget"),
            Some(b) if !b.is_finite() => {
                errors.push(FieldError::new("budget", "must be a finite number"))
            }
            Some(b) if b <= 0.0 => {
                errors.push(FieldError::new("budget", "must be greater than 0"))
            }
            Some(_) => {}
        }

        let duration_days = match input.duration_days {
            None => {
                require(&mut errors, "duration_days");
                None
            }
            Some(d) if d <= 0 => {
                errors.push(FieldError::new("duration_days", "must be greater than 0"));
                None
            }
            Some(d) if d > i64::from(self.max_duration_days) => {
                errors.push(FieldError::new(
                    "duration_days",
                    format!("must be at most {} days", self.max_duration_days),
                ));
                None
            }
            Some(d) => u32::try_from(d).ok(),
        };

        let travel_type = match non_blank(input.travel_type) {
            None => {
                errors.push(FieldError::new("travel_type", "is required"));
                None
            }
            Some(raw) => match TravelType::from_str(&raw) {
                Ok(t) => Some(t),
                Err(message) => {
                    errors.push(FieldError::new("travel_type", message));
                    None
                }
            },
        };

        let interests = normalize_interests(input.interests);
        if interests.len() > MAX_INTERESTS {
            errors.push(FieldError::new(
                "interests",
                format!("at most {MAX_INTERESTS} interests are allowed"),
            ));
        }

        match (destination, input.budget, duration_days, travel_type) {
            (Some(destination), Some(budget), Some(duration_days), Some(travel_type))
                if errors.is_empty() =>
            {
                debug!(
                    "Validated trip request: {} for {} days ({})",
                    destination, duration_days, travel_type
                );
                Ok(TripRequest::new(
                    destination,
                    area,
                    budget,
                    duration_days,
                    travel_type,
                    interests,
                ))
            }
            _ => {
                debug!("Rejected trip request: {} invalid field(s)", errors.len());
                Err(PlannerError::Validation { fields: errors })
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Adds "is required" unless the field was already rejected while parsing
fn require(errors: &mut Vec<FieldError>, field: &str) {
    if !errors.iter().any(|e| e.field == field) {
        errors.push(FieldError::new(field, "is required"));
    }
}

fn parse_number<T: FromStr>(
    errors: &mut Vec<FieldError>,
    field: &str,
    raw: Option<&str>,
) -> Option<T> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(FieldError::new(field, format!("'{raw}' is not a valid number")));
            None
        }
    }
}

fn json_number(errors: &mut Vec<FieldError>, field: &str, raw: Option<Value>) -> Option<f64> {
    match raw? {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(errors, field, Some(&s)),
        _ => {
            errors.push(FieldError::new(field, "must be a number"));
            None
        }
    }
}

fn json_whole_number(
    errors: &mut Vec<FieldError>,
    field: &str,
    raw: Option<Value>,
) -> Option<i64> {
    match raw? {
        Value::Null => None,
        Value::Number(n) => {
            let whole = n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64));
            if whole.is_none() {
                errors.push(FieldError::new(field, format!("{n} is not a whole number")));
            }
            whole
        }
        Value::String(s) => parse_number(errors, field, Some(&s)),
        _ => {
            errors.push(FieldError::new(field, "must be a whole number"));
            None
        }
    }
}

/// Trim, drop blanks and de-duplicate case-insensitively, keeping first-seen order
fn normalize_interests(raw: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .filter(|i| seen.insert(i.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn collector() -> InputCollector {
        InputCollector::new(60)
    }

    fn paris() -> TripInput {
        TripInput {
            destination: Some("Paris".to_string()),
            area: None,
            budget: Some(json!(2000.0)),
            duration_days: Some(json!(5)),
            travel_type: Some("leisure".to_string()),
            interests: vec!["art".to_string(), "food".to_string()],
        }
    }

    fn field_names(err: &PlannerError) -> Vec<&str> {
        err.fields().iter().map(|f| f.field.as_str()).collect()
    }

    #[test]
    fn test_valid_request() {
        let request = collector().collect(paris()).unwrap();
        assert_eq!(request.destination(), "Paris");
        assert_eq!(request.budget(), 2000.0);
        assert_eq!(request.duration_days(), 5);
        assert_eq!(request.travel_type(), TravelType::Leisure);
        assert_eq!(request.interests(), ["art", "food"]);
        assert_eq!(request.area(), None);
    }

    #[rstest]
    #[case(json!(-100.0))]
    #[case(json!(0))]
    #[case(json!("-5"))]
    #[case(json!("NaN"))]
    fn test_non_positive_budget_is_rejected(#[case] budget: Value) {
        let mut input = paris();
        input.budget = Some(budget);
        let err = collector().collect(input).unwrap_err();
        assert_eq!(field_names(&err), ["budget"]);
    }

    #[rstest]
    #[case(0)]
    #[case(-3)]
    #[case(61)]
    fn test_out_of_range_duration_is_rejected(#[case] days: i64) {
        let mut input = paris();
        input.duration_days = Some(json!(days));
        let err = collector().collect(input).unwrap_err();
        assert_eq!(field_names(&err), ["duration_days"]);
    }

    #[test]
    fn test_every_offending_field_is_named() {
        let input = TripInput {
            destination: Some("   ".to_string()),
            budget: Some(json!(-1.0)),
            duration_days: None,
            travel_type: Some("spaceflight".to_string()),
            ..TripInput::default()
        };
        let err = collector().collect(input).unwrap_err();
        assert_eq!(
            field_names(&err),
            ["destination", "budget", "duration_days", "travel_type"]
        );
    }

    #[test]
    fn test_interests_are_trimmed_and_deduplicated() {
        let mut input = paris();
        input.interests = vec![
            " art ".to_string(),
            "Food".to_string(),
            "".to_string(),
            "ART".to_string(),
        ];
        let request = collector().collect(input).unwrap();
        assert_eq!(request.interests(), ["art", "Food"]);
    }

    #[test]
    fn test_blank_area_is_dropped() {
        let mut input = paris();
        input.area = Some("  ".to_string());
        assert_eq!(collector().collect(input).unwrap().area(), None);
    }

    #[test]
    fn test_json_accepts_comma_separated_interests() {
        let input: TripInput = serde_json::from_str(
            r#"{"destination":"Paris","budget":2000,"duration":5,"travel_type":"Leisure","interests":"art, food"}"#,
        )
        .unwrap();
        let request = collector().collect(input).unwrap();
        assert_eq!(request.interests(), ["art", "food"]);
        assert_eq!(request.duration_days(), 5);
    }

    #[test]
    fn test_form_submission() {
        let form = TripForm {
            destination: Some("Goa".to_string()),
            area: Some("Calangute".to_string()),
            budget: Some("25000".to_string()),
            duration_days: Some("4".to_string()),
            travel_type: Some("budget".to_string()),
            interests: Some("beaches,nightlife".to_string()),
        };
        let request = collector().collect_form(form).unwrap();
        assert_eq!(request.area(), Some("Calangute"));
        assert_eq!(request.budget(), 25000.0);
        assert_eq!(request.interests(), ["beaches", "nightlife"]);
    }

    #[test]
    fn test_form_reports_unparsable_numbers_once() {
        let form = TripForm {
            destination: Some("Goa".to_string()),
            budget: Some("lots".to_string()),
            duration_days: Some("".to_string()),
            travel_type: Some("budget".to_string()),
            ..TripForm::default()
        };
        let err = collector().collect_form(form).unwrap_err();
        assert_eq!(field_names(&err), ["budget", "duration_days"]);
        assert!(err.fields()[0].message.contains("not a valid number"));
        assert_eq!(err.fields()[1].message, "is required");
    }

    #[test]
    fn test_json_accepts_numeric_strings() {
        let mut input = paris();
        input.budget = Some(json!(" 2500.5 "));
        input.duration_days = Some(json!("7"));
        let request = collector().collect(input).unwrap();
        assert_eq!(request.budget(), 2500.5);
        assert_eq!(request.duration_days(), 7);
    }

    #[test]
    fn test_json_whole_float_duration_is_accepted() {
        let mut input = paris();
        input.duration_days = Some(json!(3.0));
        assert_eq!(collector().collect(input).unwrap().duration_days(), 3);
    }

    #[rstest]
    #[case(json!("lots"), json!(5), "budget")]
    #[case(json!(true), json!(5), "budget")]
    #[case(json!(2000), json!(5.5), "duration_days")]
    #[case(json!(2000), json!(["5"]), "duration_days")]
    fn test_json_type_errors_name_the_field(
        #[case] budget: Value,
        #[case] duration: Value,
        #[case] field: &str,
    ) {
        let mut input = paris();
        input.budget = Some(budget);
        input.duration_days = Some(duration);
        let err = collector().collect(input).unwrap_err();
        assert_eq!(field_names(&err), [field]);
    }
}
