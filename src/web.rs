//! Web server: HTML pages, the JSON API and static assets

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Form, Router,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

use crate::api;
use crate::collector::{InputCollector, TripForm};
use crate::config::{PlannerConfig, ServerConfig};
use crate::llm::LlmClient;
use crate::orchestrator::PlanOrchestrator;
use crate::render::HtmlRenderer;
use crate::PlannerError;

/// Everything a request handler needs; built once at startup
pub struct AppState {
    pub collector: InputCollector,
    pub orchestrator: PlanOrchestrator,
    pub html: HtmlRenderer,
}

impl AppState {
    pub fn new(config: &PlannerConfig, llm: Arc<dyn LlmClient>) -> crate::Result<Self> {
        Ok(Self {
            collector: InputCollector::new(config.planner.max_duration_days),
            orchestrator: PlanOrchestrator::new(llm, &config.planner)?,
            html: HtmlRenderer::new(&config.planner.currency, config.planner.max_duration_days)?,
        })
    }
}

/// The complete router: HTML pages, JSON API and static assets
pub fn app(state: Arc<AppState>, server: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/plan", post(plan_form))
        .nest("/api", api::router())
        .nest_service("/static", ServeDir::new(&server.static_dir))
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run(config: &PlannerConfig, state: Arc<AppState>) -> Result<()> {
    let server = &config.server;
    let app = app(state, server);
    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", server.host, server.port))?;

    if let (Some(cert), Some(key)) = (&server.tls_cert_path, &server.tls_key_path) {
        return serve_tls(addr, app, cert, key).await;
    }

    serve_plain(addr, app).await
}

async fn serve_plain(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Web server running at http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server failed")?;
    Ok(())
}

#[cfg(feature = "tls")]
async fn serve_tls(addr: SocketAddr, app: Router, cert: &str, key: &str) -> Result<()> {
    let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| format!("Failed to load TLS certificate {cert}"))?;

    let handle = axum_server::Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(std::time::Duration::from_secs(10)));
    });

    info!("Web server running at https://{}", addr);
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .context("Web server failed")
}

#[cfg(not(feature = "tls"))]
async fn serve_tls(addr: SocketAddr, app: Router, _cert: &str, _key: &str) -> Result<()> {
    warn!("TLS is configured but this build has no TLS support, serving plain HTTP");
    serve_plain(addr, app).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received, finishing in-flight requests");
}

async fn index(State(state): State<Arc<AppState>>) -> Response {
    match state.html.index() {
        Ok(page) => Html(page).into_response(),
        Err(err) => error_page(&state, err),
    }
}

#[instrument(skip_all)]
async fn plan_form(
    State(state): State<Arc<AppState>>,
    form: Result<Form<TripForm>, FormRejection>,
) -> Response {
    match plan_page(&state, form).await {
        Ok(page) => Html(page).into_response(),
        Err(err) => error_page(&state, err),
    }
}

async fn plan_page(
    state: &AppState,
    form: Result<Form<TripForm>, FormRejection>,
) -> crate::Result<String> {
    let Form(form) = form.map_err(|e| PlannerError::validation("form", e.body_text()))?;
    let request = state.collector.collect_form(form)?;
    let plan = state.orchestrator.plan(&request).await?;
    state.html.plan(&request, &plan)
}

/// The error page replaces the plan; no partial plan is ever shown
fn error_page(state: &AppState, err: PlannerError) -> Response {
    let status = api::status_code(&err);
    if status.is_server_error() {
        error!("Planning failed: {}", err);
    } else {
        warn!("Planning rejected: {}", err);
    }

    match state.html.error(&err) {
        Ok(page) => (status, Html(page)).into_response(),
        Err(render_err) => {
            error!("Failed to render error page: {}", render_err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.user_message()).into_response()
        }
    }
}
