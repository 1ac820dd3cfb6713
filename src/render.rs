//! Result rendering
//!
//! A [`TripPlan`] leaves the service in one of three shapes: the JSON
//! [`PlanResponse`], an HTML page, or the plain-text "full plan" that is also
//! embedded in the JSON response.

use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::models::{
    CostEstimate, HotelSuggestion, PlaceSuggestion, TravelType, TripPlan, TripRequest,
    format_amount,
};
use crate::{PlannerError, Result, VERSION};

/// JSON shape of a plan returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub summary: String,
    pub considerations: Vec<String>,
    pub hotels: Vec<HotelSuggestion>,
    pub places: Vec<PlaceSuggestion>,
    pub cost_estimate: CostEstimate,
    /// The whole plan as readable text
    pub full_plan: String,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

impl From<&TripPlan> for PlanResponse {
    fn from(plan: &TripPlan) -> Self {
        Self {
            summary: plan.summary.clone(),
            considerations: plan.considerations.clone(),
            hotels: plan.hotels.clone(),
            places: plan.places.clone(),
            cost_estimate: plan.cost_estimate.clone(),
            full_plan: render_full_plan(plan),
            model: plan.model.clone(),
            generated_at: plan.generated_at,
        }
    }
}

impl PlanResponse {
    /// Parse back into a plan, rejecting a cost total that does not match its breakdown
    pub fn into_plan(self) -> Result<TripPlan> {
        if !self.cost_estimate.is_consistent() {
            return Err(PlannerError::malformed(
                "plan",
                "cost total does not match its breakdown",
            ));
        }
        Ok(TripPlan {
            summary: self.summary,
            considerations: self.considerations,
            hotels: self.hotels,
            places: self.places,
            cost_estimate: self.cost_estimate,
            model: self.model,
            generated_at: self.generated_at,
        })
    }
}

/// Plain-text rendering of a whole plan
#[must_use]
pub fn render_full_plan(plan: &TripPlan) -> String {
    let mut out = String::new();
    let currency = plan.cost_estimate.currency();

    // Writing to a String cannot fail
    let _ = writeln!(out, "Travel Summary:\n{}", plan.summary);
    for consideration in &plan.considerations {
        let _ = writeln!(out, "- {consideration}");
    }

    let _ = writeln!(out, "\nHotel Options:");
    for (i, hotel) in plan.hotels.iter().enumerate() {
        let _ = write!(out, "{}. {} ({})", i + 1, hotel.name, hotel.price_range);
        if let Some(total) = hotel.total_cost {
            let _ = write!(out, ", about {} {currency} total", format_amount(total));
        }
        let _ = writeln!(out, ": {}", hotel.rationale);
    }

    let _ = writeln!(out, "\nPlaces to Visit:");
    for (i, place) in plan.places.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} [{}]: {}",
            i + 1,
            place.name,
            place.category,
            place.rationale
        );
    }

    let _ = writeln!(out, "\nCost Estimate:");
    for (category, amount) in plan.cost_estimate.breakdown() {
        let _ = writeln!(out, "- {}: {} {currency}", category.label(), format_amount(*amount));
    }
    let _ = write!(
        out,
        "Total: {} {currency} ({})",
        format_amount(plan.cost_estimate.total()),
        if plan.cost_estimate.within_budget() {
            "within budget"
        } else {
            "over budget"
        }
    );

    out
}

#[derive(Serialize)]
struct Choice {
    value: &'static str,
    label: String,
}

#[derive(Serialize)]
struct IndexView<'a> {
    title: &'static str,
    version: &'static str,
    currency: &'a str,
    max_duration_days: u32,
    travel_types: Vec<Choice>,
}

#[derive(Serialize)]
struct RequestView {
    location: String,
    duration_days: u32,
    budget: String,
    travel_type: &'static str,
    interests: String,
}

#[derive(Serialize)]
struct HotelView<'a> {
    name: &'a str,
    price_range: &'a str,
    total_cost: Option<String>,
    rationale: &'a str,
}

#[derive(Serialize)]
struct CostLine {
    label: &'static str,
    amount: String,
}

#[derive(Serialize)]
struct PlanView<'a> {
    title: String,
    version: &'static str,
    currency: &'a str,
    request: RequestView,
    summary: &'a str,
    considerations: &'a [String],
    hotels: Vec<HotelView<'a>>,
    places: &'a [PlaceSuggestion],
    costs: Vec<CostLine>,
    total: String,
    within_budget: bool,
    model: &'a str,
    generated_at: String,
}

#[derive(Serialize)]
struct ErrorView<'a> {
    title: &'static str,
    version: &'static str,
    message: String,
    fields: &'a [crate::error::FieldError],
}

/// Renders the HTML pages of the web UI
pub struct HtmlRenderer {
    hbs: Handlebars<'static>,
    currency: String,
    max_duration_days: u32,
}

impl HtmlRenderer {
    pub fn new(currency: impl Into<String>, max_duration_days: u32) -> Result<Self> {
        let mut hbs = Handlebars::new();
        hbs.register_partial("header", include_str!("../templates/html/header.hbs"))?;
        hbs.register_partial("footer", include_str!("../templates/html/footer.hbs"))?;
        hbs.register_template_string("index", include_str!("../templates/html/index.hbs"))?;
        hbs.register_template_string("plan", include_str!("../templates/html/plan.hbs"))?;
        hbs.register_template_string("error", include_str!("../templates/html/error.hbs"))?;

        Ok(Self {
            hbs,
            currency: currency.into(),
            max_duration_days,
        })
    }

    /// The trip form
    pub fn index(&self) -> Result<String> {
        let view = IndexView {
            title: "Plan your trip",
            version: VERSION,
            currency: &self.currency,
            max_duration_days: self.max_duration_days,
            travel_types: TravelType::ALL
                .iter()
                .map(|t| Choice {
                    value: t.as_str(),
                    label: capitalize(t.as_str()),
                })
                .collect(),
        };
        Ok(self.hbs.render("index", &view)?)
    }

    /// A finished plan
    pub fn plan(&self, request: &TripRequest, plan: &TripPlan) -> Result<String> {
        let view = PlanView {
            title: format!("Trip to {}", request.destination()),
            version: VERSION,
            currency: plan.cost_estimate.currency(),
            request: RequestView {
                location: request.location_label(),
                duration_days: request.duration_days(),
                budget: format_amount(request.budget()),
                travel_type: request.travel_type().as_str(),
                interests: request.interests_label(),
            },
            summary: &plan.summary,
            considerations: &plan.considerations,
            hotels: plan
                .hotels
                .iter()
                .map(|h| HotelView {
                    name: &h.name,
                    price_range: &h.price_range,
                    total_cost: h.total_cost.map(format_amount),
                    rationale: &h.rationale,
                })
                .collect(),
            places: &plan.places,
            costs: plan
                .cost_estimate
                .breakdown()
                .iter()
                .map(|(category, amount)| CostLine {
                    label: category.label(),
                    amount: format_amount(*amount),
                })
                .collect(),
            total: format_amount(plan.cost_estimate.total()),
            within_budget: plan.cost_estimate.within_budget(),
            model: &plan.model,
            generated_at: plan.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        };
        Ok(self.hbs.render("plan", &view)?)
    }

    /// An error page in place of the plan
    pub fn error(&self, error: &PlannerError) -> Result<String> {
        let title = match error {
            PlannerError::Validation { .. } => "Please check your trip details",
            PlannerError::Timeout { .. } => "Planning took too long",
            _ => "We could not plan your trip",
        };
        let view = ErrorView {
            title,
            version: VERSION,
            message: match error {
                PlannerError::Validation { .. } => {
                    "Some of the trip details are invalid:".to_string()
                }
                other => other.user_message(),
            },
            fields: error.fields(),
        };
        Ok(self.hbs.render("error", &view)?)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
