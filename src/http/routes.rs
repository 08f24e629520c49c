//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::ranking::StandingRow;
use crate::schedule::DispatchSnapshot;
use crate::util::time::{format_elapsed, uptime_secs, ClockState};
use crate::ws::handler::ws_handler;
use crate::ws::protocol::DriverDetail;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);

    Router::new()
        .route("/health", get(health_handler))
        .route("/clock", get(clock_handler))
        .route("/standings", get(standings_handler))
        .route("/drivers/:id", get(driver_handler))
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

/// `*` allows any origin, otherwise a comma separated list
fn cors_layer(client_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    let allowed_origins: Vec<header::HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();
    cors.allow_origin(allowed_origins)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    session_id: Uuid,
    stopped: bool,
    subscribers: usize,
    pending_callbacks: usize,
    dispatch: Option<DispatchSnapshot>,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let session = &state.session;

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        session_id: session.id(),
        stopped: session.is_stopped(),
        subscribers: session.feed().subscriber_count(),
        pending_callbacks: session.pending_callbacks(),
        dispatch: session.dispatch_stats(),
    })
}

// ============================================================================
// Session clock
// ============================================================================

#[derive(Serialize)]
struct ClockResponse {
    running: bool,
    elapsed: f64,
    formatted: String,
    bucket: u64,
}

async fn clock_handler(State(state): State<AppState>) -> Json<ClockResponse> {
    let clock = state.session.clock();
    let elapsed = state.session.elapsed_time();

    Json(ClockResponse {
        running: clock.state() == ClockState::Running,
        elapsed,
        formatted: format_elapsed(elapsed),
        bucket: clock.bucket(),
    })
}

// ============================================================================
// Standings endpoints
// ============================================================================

#[derive(Serialize)]
struct StandingsResponse {
    elapsed: f64,
    rows: Vec<StandingRow>,
}

async fn standings_handler(State(state): State<AppState>) -> Json<StandingsResponse> {
    Json(StandingsResponse {
        elapsed: state.session.elapsed_time(),
        rows: state.session.standings(),
    })
}

async fn driver_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DriverDetail>, AppError> {
    let driver_number: u32 = id
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid driver number: {id}")))?;

    state
        .session
        .driver_detail(driver_number)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Driver {driver_number}")))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
