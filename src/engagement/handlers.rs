use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::warn;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::types::{Engagement, EngagementFields, LogEngagementRequest};
use super::{log_engagement, log_engagements, update_engagement};
use crate::security::Identity;
use crate::shared::error::{ApiError, ApiResult};
use crate::shared::state::AppState;
use crate::shared::utils::parse_id;

#[derive(Debug, Deserialize)]
pub struct EngagementLookup {
    #[serde(rename = "questionID")]
    pub question_id: Option<String>,
}

pub async fn handle_log_engagement(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(request): Json<LogEngagementRequest>,
) -> ApiResult<Json<Value>> {
    let user_id = identity.require_user()?;
    let engagement = log_engagement(&state.repos, user_id, request).await?;
    Ok(Json(json!({
        "message": "Engagement logged successfully",
        "id": engagement.id,
    })))
}

/// Items are written in order. When one fails the earlier writes stay, so
/// the error body also lists the ids already logged.
pub async fn handle_log_engagements(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(requests): Json<Vec<LogEngagementRequest>>,
) -> ApiResult<Response> {
    let user_id = identity.require_user()?;
    let requested = requests.len();
    let batch = log_engagements(&state.repos, user_id, requests).await;

    let Some(err) = batch.failure else {
        return Ok(Json(json!({
            "message": "Engagements logged successfully",
            "ids": batch.ids,
        }))
        .into_response());
    };

    warn!(
        "Engagement batch stopped after {} of {} items: {}",
        batch.ids.len(),
        requested,
        err
    );
    Ok((
        err.status(),
        Json(json!({
            "error": err.message(),
            "ids": batch.ids,
        })),
    )
        .into_response())
}

pub async fn handle_get_engagement_for_question(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(lookup): Query<EngagementLookup>,
) -> ApiResult<Json<Engagement>> {
    let user_id = identity.require_user()?;
    let raw = lookup
        .question_id
        .ok_or_else(|| ApiError::Validation("questionID query parameter is required".into()))?;
    let question_id = parse_id(&raw, "question").map_err(ApiError::Validation)?;
    Ok(Json(
        state
            .repos
            .engagements
            .get_for_question(user_id, question_id)
            .await?,
    ))
}

pub async fn handle_get_engagement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Engagement>> {
    let id = parse_id(&id, "engagement").map_err(ApiError::Validation)?;
    Ok(Json(state.repos.engagements.get(id).await?))
}

pub async fn handle_update_engagement(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(fields): Json<EngagementFields>,
) -> ApiResult<Json<Engagement>> {
    let user_id = identity.require_user()?;
    let id = parse_id(&id, "engagement").map_err(ApiError::Validation)?;
    Ok(Json(update_engagement(&state.repos, user_id, id, fields).await?))
}

pub fn configure_engagement_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/engagement",
            post(handle_log_engagement).get(handle_get_engagement_for_question),
        )
        .route("/engagements", post(handle_log_engagements))
        .route(
            "/engagement/:id",
            get(handle_get_engagement).patch(handle_update_engagement),
        )
}
