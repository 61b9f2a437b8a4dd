use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use super::types::{StatisticsQuery, StatisticsResult, StatisticsView};
use super::StatisticsEngine;
use crate::security::Identity;
use crate::shared::error::{ApiError, ApiResult};
use crate::shared::state::AppState;

pub async fn handle_question_statistics(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(query): Query<StatisticsQuery>,
) -> ApiResult<Json<StatisticsResult>> {
    let view: StatisticsView = query
        .data
        .as_deref()
        .ok_or_else(|| ApiError::Validation("data query parameter is required".into()))?
        .parse()
        .map_err(ApiError::Validation)?;

    let result = StatisticsEngine::new(&state.repos)
        .compute(identity, view)
        .await?;
    Ok(Json(result))
}

pub fn configure_statistics_routes() -> Router<Arc<AppState>> {
    Router::new().route("/questions/data", get(handle_question_statistics))
}
