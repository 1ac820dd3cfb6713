//! Prompt construction
//!
//! Maps a [`TripRequest`] to one prompt per planning step. Templates are
//! embedded Handlebars files rendered in strict mode, so a template that
//! references a value the context does not provide fails loudly instead of
//! rendering an empty string.

use handlebars::Handlebars;
use serde::Serialize;
use std::fmt;

use crate::config::PlanningConfig;
use crate::models::{HotelSuggestion, PlaceSuggestion, TripRequest, format_amount};
use crate::Result;

/// Named, independently invocable sub-tasks of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlanStep {
    Summary,
    Hotels,
    Places,
    Costs,
}

impl PlanStep {
    pub const ALL: [PlanStep; 4] = [
        PlanStep::Summary,
        PlanStep::Hotels,
        PlanStep::Places,
        PlanStep::Costs,
    ];

    /// Steps that only depend on the request itself
    pub const INDEPENDENT: [PlanStep; 3] = [PlanStep::Summary, PlanStep::Hotels, PlanStep::Places];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PlanStep::Summary => "summary",
            PlanStep::Hotels => "hotels",
            PlanStep::Places => "places",
            PlanStep::Costs => "costs",
        }
    }

    fn template(&self) -> &'static str {
        match self {
            PlanStep::Summary => include_str!("../templates/prompts/summary.hbs"),
            PlanStep::Hotels => include_str!("../templates/prompts/hotels.hbs"),
            PlanStep::Places => include_str!("../templates/prompts/places.hbs"),
            PlanStep::Costs => include_str!("../templates/prompts/costs.hbs"),
        }
    }
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a prompt template may reference
#[derive(Debug, Serialize)]
struct PromptContext<'a> {
    destination: &'a str,
    area: &'a str,
    location: String,
    proximity: &'a str,
    duration_days: u32,
    budget: String,
    currency: &'a str,
    travel_type: &'a str,
    interests: String,
    hotel_count: u32,
    place_count: u32,
    hotels: String,
    places: String,
}

/// Renders the per-step prompts
pub struct PromptBuilder {
    hbs: Handlebars<'static>,
    currency: String,
    hotel_count: u32,
    place_count: u32,
}

impl PromptBuilder {
    pub fn new(config: &PlanningConfig) -> Result<Self> {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(true);
        hbs.register_escape_fn(handlebars::no_escape);
        for step in PlanStep::ALL {
            hbs.register_template_string(step.name(), step.template())?;
        }

        Ok(Self {
            hbs,
            currency: config.currency.clone(),
            hotel_count: config.hotel_count,
            place_count: config.place_count,
        })
    }

    pub fn summary(&self, request: &TripRequest) -> Result<String> {
        self.render(PlanStep::Summary, request, &[], &[])
    }

    pub fn hotels(&self, request: &TripRequest) -> Result<String> {
        self.render(PlanStep::Hotels, request, &[], &[])
    }

    pub fn places(&self, request: &TripRequest) -> Result<String> {
        self.render(PlanStep::Places, request, &[], &[])
    }

    /// The cost prompt quotes the hotel and place suggestions it should price
    pub fn costs(
        &self,
        request: &TripRequest,
        hotels: &[HotelSuggestion],
        places: &[PlaceSuggestion],
    ) -> Result<String> {
        self.render(PlanStep::Costs, request, hotels, places)
    }

    /// Prompts of every step that can run without upstream results
    pub fn build_all(&self, request: &TripRequest) -> Result<Vec<(PlanStep, String)>> {
        PlanStep::INDEPENDENT
            .into_iter()
            .map(|step| Ok((step, self.render(step, request, &[], &[])?)))
            .collect()
    }

    fn render(
        &self,
        step: PlanStep,
        request: &TripRequest,
        hotels: &[HotelSuggestion],
        places: &[PlaceSuggestion],
    ) -> Result<String> {
        let context = PromptContext {
            destination: request.destination(),
            area: request.area().unwrap_or("general area"),
            location: request.location_label(),
            proximity: request.area().unwrap_or(request.destination()),
            duration_days: request.duration_days(),
            budget: format_amount(request.budget()),
            currency: &self.currency,
            travel_type: request.travel_type().as_str(),
            interests: request.interests_label(),
            hotel_count: self.hotel_count,
            place_count: self.place_count,
            hotels: describe_hotels(hotels),
            places: describe_places(places),
        };
        Ok(self.hbs.render(step.name(), &context)?)
    }
}

fn describe_hotels(hotels: &[HotelSuggestion]) -> String {
    if hotels.is_empty() {
        return "not chosen yet".to_string();
    }
    hotels
        .iter()
        .map(|h| match h.total_cost {
            Some(total) => format!(
                "{} ({}, about {} total)",
                h.name,
                h.price_range,
                format_amount(total)
            ),
            None => format!("{} ({})", h.name, h.price_range),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_places(places: &[PlaceSuggestion]) -> String {
    if places.is_empty() {
        return "not chosen yet".to_string();
    }
    places
        .iter()
        .map(|p| format!("{} ({})", p.name, p.category))
        .collect::<Vec<_>>()
        .join("; ")
}
