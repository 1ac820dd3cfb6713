use std::sync::Arc;

use anyhow::{Context, Result};
use travelplanner::web::{self, AppState};
use travelplanner::{GeminiClient, PlannerConfig, VERSION, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = PlannerConfig::load().context("Failed to load configuration")?;
    telemetry::init(&config.logging)?;

    tracing::info!(
        "Starting travelplanner {} with model {}",
        VERSION,
        config.llm.model
    );
    tracing::debug!("Configuration: {:?}", config);

    let llm = GeminiClient::new(&config.llm)?;
    let state = AppState::new(&config, Arc::new(llm))?;

    web::run(&config, Arc::new(state)).await
}
