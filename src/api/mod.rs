//! HTTP API
//!
//! JSON endpoints under `/api/v1` for player lookups, derived metrics and
//! the swing-outcome model, plus a plain-text `/health` probe.

mod handlers;

#[cfg(test)]
mod tests;

use crate::client::StatsProvider;
use crate::error::{MetricsError, Result};
use crate::metrics::{Clock, SystemClock};
use crate::ml::{FeatureSelector, ModelRegistry, ModelTrainerEvaluator, PredictionService};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Shared state handed to every handler
pub struct AppState {
    pub provider: Arc<dyn StatsProvider>,
    pub clock: Arc<dyn Clock>,
    pub selector: FeatureSelector,
    pub trainer: ModelTrainerEvaluator,
    pub predictor: PredictionService,
    /// Upper bound on one training request
    pub train_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(provider: Arc<dyn StatsProvider>, registry: Arc<ModelRegistry>) -> Self {
        Self {
            provider,
            clock: Arc::new(SystemClock),
            selector: FeatureSelector::default(),
            trainer: ModelTrainerEvaluator::default(),
            predictor: PredictionService::new(registry),
            train_timeout: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_trainer(mut self, trainer: ModelTrainerEvaluator) -> Self {
        self.trainer = trainer;
        self
    }

    pub fn with_train_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.train_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        self.predictor.registry()
    }
}

/// Error response body: `{"error": message}` with the mapped status
#[derive(Debug)]
pub struct ApiError(pub MetricsError);

impl From<MetricsError> for ApiError {
    fn from(err: MetricsError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/player-id", get(handlers::player_id))
        .route("/player-general-metrics", get(handlers::player_general_metrics))
        .route("/player-specific-metrics", get(handlers::player_specific_metrics))
        .route(
            "/player-career-timeline",
            get(handlers::player_career_timeline).post(handlers::career_timeline_from_metrics),
        )
        .route("/plate-crossing-metrics", get(handlers::plate_crossing_metrics))
        .route("/pitcher-model-data", post(handlers::pitcher_model_data))
        .route("/train-model", post(handlers::train_model))
        .route("/predict", post(handlers::predict));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api)
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn start_server(state: Arc<AppState>, host: &str, port: u16) -> Result<()> {
    let app = create_router(state);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("MLB metrics API listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
