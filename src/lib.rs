//! `travelplanner` - AI-powered travel planning
//!
//! This library turns trip parameters into a plan of hotels, places to visit
//! and a cost estimate by orchestrating a sequence of LLM sub-tasks, and
//! serves the result as JSON or HTML.

pub mod api;
pub mod collector;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod render;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use collector::{InputCollector, TripForm, TripInput};
pub use config::PlannerConfig;
pub use error::{FieldError, PlannerError};
pub use llm::{GeminiClient, LlmClient};
pub use models::{
    CostCategory, CostEstimate, HotelSuggestion, PlaceSuggestion, TravelType, TripPlan,
    TripRequest,
};
pub use orchestrator::PlanOrchestrator;
pub use prompt::{PlanStep, PromptBuilder};
pub use render::{HtmlRenderer, PlanResponse, render_full_plan};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
