//! JSON API
//!
//! `POST /api/plan` takes a trip as JSON and answers with a [`PlanResponse`];
//! failures answer with `{"error": {"kind", "message", "fields"}}` and a
//! status code matching the error kind.

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tracing::{error, instrument, warn};

use crate::collector::TripInput;
use crate::render::PlanResponse;
use crate::web::AppState;
use crate::{PlannerError, VERSION};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/plan", post(create_plan))
        .route("/health", get(health))
}

#[instrument(skip_all)]
async fn create_plan(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TripInput>, JsonRejection>,
) -> Result<Json<PlanResponse>, PlannerError> {
    let Json(input) = payload.map_err(|e| PlannerError::validation("body", e.body_text()))?;
    let request = state.collector.collect(input)?;
    let plan = state.orchestrator.plan(&request).await?;
    Ok(Json(PlanResponse::from(&plan)))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": VERSION }))
}

/// HTTP status for each error kind
#[must_use]
pub fn status_code(err: &PlannerError) -> StatusCode {
    match err {
        PlannerError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PlannerError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        PlannerError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        PlannerError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
        PlannerError::Config { .. } | PlannerError::Render { .. } | PlannerError::Io { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for PlannerError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let body = json!({
            "error": {
                "kind": self.kind(),
                "message": self.user_message(),
                "fields": self.fields(),
            }
        });
        (status, Json(body)).into_response()
    }
}
