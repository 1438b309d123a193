use super::{ApiResult, AppState};
use crate::error::{MetricsError, Result};
use crate::metrics::{parse_career_timeline, parse_date};
use crate::ml::{ModelType, PredictionResponse};
use crate::types::{CareerTimeline, MetricType, PlayerGeneralMetrics, RawRow, TimelineType};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const MISSING_PARAMETERS: &str = "Missing required parameters";
const MISSING_PLAYER_ID: &str = "Missing player ID";

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerIdParams {
    last_name: Option<String>,
    first_name: Option<String>,
    player_num: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeneralMetricsParams {
    player_id: Option<String>,
    timeline_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerParams {
    player_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpecificMetricsParams {
    player_id: Option<String>,
    metric_type: Option<String>,
    start_dt: Option<String>,
    end_dt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PlayerIdResponse {
    pub player_id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrainModelRequest {
    model_type: Option<String>,
    data: Option<Vec<RawRow>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TrainModelResponse {
    pub model_uuid: String,
    pub accuracy: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PredictRequest {
    model_uuid: Option<String>,
    data: Option<Vec<RawRow>>,
}

/// Treats absent and blank parameters alike
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn query<T>(params: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    params
        .map(|Query(p)| p)
        .map_err(|rejection| MetricsError::invalid_input(rejection.body_text()))
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(p)| p)
        .map_err(|rejection| MetricsError::invalid_input(rejection.body_text()))
}

fn parse_player_id(raw: &str) -> Result<i64> {
    raw.parse()
        .map_err(|_| MetricsError::invalid_input(format!("Invalid player_id: '{}'", raw)))
}

pub(crate) async fn health_check() -> &'static str {
    "OK"
}

pub(crate) async fn player_id(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<PlayerIdParams>, QueryRejection>,
) -> ApiResult<Json<PlayerIdResponse>> {
    let params = query(params)?;
    let (Some(last_name), Some(first_name)) =
        (present(&params.last_name), present(&params.first_name))
    else {
        return Err(MetricsError::invalid_input("Missing last name or first name").into());
    };
    let player_num = match present(&params.player_num) {
        Some(raw) => raw.parse::<usize>().map_err(|_| {
            MetricsError::invalid_input(format!("Invalid player_num: '{}'", raw))
        })?,
        None => 0,
    };

    let player_id = state
        .provider
        .player_id(last_name, first_name, player_num)
        .await?;
    Ok(Json(PlayerIdResponse { player_id }))
}

pub(crate) async fn player_general_metrics(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<GeneralMetricsParams>, QueryRejection>,
) -> ApiResult<Json<PlayerGeneralMetrics>> {
    let params = query(params)?;
    let player_id = present(&params.player_id)
        .ok_or_else(|| MetricsError::invalid_input(MISSING_PLAYER_ID))
        .and_then(parse_player_id)?;
    let timeline = match present(&params.timeline_type) {
        Some(raw) => raw.parse::<TimelineType>()?,
        None => TimelineType::default(),
    };

    let metrics = state
        .provider
        .player_general_metrics(player_id, timeline)
        .await?;
    Ok(Json(metrics))
}

pub(crate) async fn player_specific_metrics(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<SpecificMetricsParams>, QueryRejection>,
) -> ApiResult<Json<Vec<RawRow>>> {
    let params = query(params)?;
    let (Some(player_id), Some(metric_type), Some(start_dt), Some(end_dt)) = (
        present(&params.player_id),
        present(&params.metric_type),
        present(&params.start_dt),
        present(&params.end_dt),
    ) else {
        return Err(MetricsError::invalid_input(MISSING_PARAMETERS).into());
    };

    let rows = state
        .provider
        .player_specific_metrics(
            parse_player_id(player_id)?,
            metric_type.parse::<MetricType>()?,
            parse_date("start_dt", start_dt)?,
            parse_date("end_dt", end_dt)?,
        )
        .await?;
    Ok(Json(rows))
}

pub(crate) async fn player_career_timeline(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<PlayerParams>, QueryRejection>,
) -> ApiResult<Json<CareerTimeline>> {
    let params = query(params)?;
    let player_id = present(&params.player_id)
        .ok_or_else(|| MetricsError::invalid_input(MISSING_PLAYER_ID))
        .and_then(parse_player_id)?;

    let metrics = state
        .provider
        .player_general_metrics(player_id, TimelineType::Career)
        .await?;
    Ok(Json(parse_career_timeline(&metrics, state.clock.as_ref())?))
}

/// Timeline from a general-metrics record the caller already holds
pub(crate) async fn career_timeline_from_metrics(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<PlayerGeneralMetrics>, JsonRejection>,
) -> ApiResult<Json<CareerTimeline>> {
    let metrics = body(payload)?;
    Ok(Json(parse_career_timeline(&metrics, state.clock.as_ref())?))
}

pub(crate) async fn plate_crossing_metrics(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<SpecificMetricsParams>, QueryRejection>,
) -> ApiResult<Json<Vec<RawRow>>> {
    let params = query(params)?;
    let (Some(player_id), Some(start_dt), Some(end_dt)) = (
        present(&params.player_id),
        present(&params.start_dt),
        present(&params.end_dt),
    ) else {
        return Err(MetricsError::invalid_input(MISSING_PARAMETERS).into());
    };
    let metric_type = match present(&params.metric_type) {
        Some(raw) => raw.parse::<MetricType>()?,
        None => MetricType::Pitching,
    };

    let rows = state
        .provider
        .player_specific_metrics(
            parse_player_id(player_id)?,
            metric_type,
            parse_date("start_dt", start_dt)?,
            parse_date("end_dt", end_dt)?,
        )
        .await?;
    Ok(Json(crate::metrics::plate_crossing_metrics(rows)))
}

pub(crate) async fn pitcher_model_data(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Vec<RawRow>>, JsonRejection>,
) -> ApiResult<Json<Vec<RawRow>>> {
    let rows = body(payload)?;
    let table = state.selector.select(&rows)?;
    Ok(Json(table.to_records()))
}

pub(crate) async fn train_model(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<TrainModelRequest>, JsonRejection>,
) -> ApiResult<Json<TrainModelResponse>> {
    let request = body(payload)?;
    let (Some(model_type), Some(data)) = (present(&request.model_type), request.data) else {
        return Err(MetricsError::invalid_input("Missing model_type or data").into());
    };
    let model_type: ModelType = model_type.parse()?;

    let worker = Arc::clone(&state);
    let task = tokio::task::spawn_blocking(move || {
        let table = worker.selector.select(&data)?;
        worker.trainer.train(&table, model_type)
    });
    let joined = match state.train_timeout {
        Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
            MetricsError::Unexpected(format!(
                "Training {} timed out after {:?}",
                model_type, limit
            ))
        })?,
        None => task.await,
    };
    let (pipeline, report) = joined
        .map_err(|e| MetricsError::Unexpected(format!("Training task failed: {}", e)))??;

    let model_uuid = state.registry().register(pipeline);
    info!(
        "Model {} ({}) ready, accuracy {:.4}",
        model_uuid, report.model_type, report.accuracy
    );
    Ok(Json(TrainModelResponse {
        model_uuid: model_uuid.to_string(),
        accuracy: report.accuracy,
    }))
}

pub(crate) async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<Json<PredictionResponse>> {
    let request = body(payload)?;
    let (Some(model_uuid), Some(data)) = (present(&request.model_uuid), request.data.as_ref())
    else {
        return Err(MetricsError::invalid_input("Missing model_uuid or data").into());
    };

    Ok(Json(state.predictor.predict(model_uuid, data)?))
}
