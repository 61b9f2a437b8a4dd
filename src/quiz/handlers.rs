use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::service;
use super::types::{BindEngagementRequest, InitializeQuizRequest, Quiz, QuizResult};
use crate::security::Identity;
use crate::shared::error::{ApiError, ApiResult};
use crate::shared::state::AppState;
use crate::shared::utils::parse_id;

#[derive(Debug, Deserialize)]
pub struct QuizLookup {
    pub id: Option<String>,
    pub name: Option<String>,
}

pub async fn handle_initialize_quiz(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(request): Json<InitializeQuizRequest>,
) -> ApiResult<Json<Value>> {
    let user_id = identity.require_user()?;
    let quiz = service::initialize_quiz(&state.repos, user_id, request).await?;
    Ok(Json(json!({ "quizID": quiz.id })))
}

pub async fn handle_get_quiz(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(lookup): Query<QuizLookup>,
) -> ApiResult<Json<Quiz>> {
    let quiz = match (lookup.id.as_deref(), lookup.name.as_deref()) {
        (Some(raw), _) => {
            let id = parse_id(raw, "quiz").map_err(ApiError::Validation)?;
            state.repos.quizzes.get(id).await?
        }
        (None, Some(name)) => {
            let user_id = identity.require_user()?;
            state.repos.quizzes.get_by_name(user_id, name).await?
        }
        (None, None) => {
            return Err(ApiError::Validation(
                "Either id or name must be provided".into(),
            ))
        }
    };
    Ok(Json(quiz))
}

pub async fn handle_bind_by_engagement(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path((quiz_id, engagement_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let user_id = identity.require_user()?;
    let quiz_id = parse_id(&quiz_id, "quiz").map_err(ApiError::Validation)?;
    let engagement_id = parse_id(&engagement_id, "engagement").map_err(ApiError::Validation)?;

    let quiz = service::bind_engagement_by_id(&state.repos, user_id, quiz_id, engagement_id).await?;
    Ok(Json(json!({ "quizID": quiz.id })))
}

pub async fn handle_bind_question(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(quiz_id): Path<String>,
    Json(request): Json<BindEngagementRequest>,
) -> ApiResult<Json<Value>> {
    let user_id = identity.require_user()?;
    let quiz_id = parse_id(&quiz_id, "quiz").map_err(ApiError::Validation)?;

    let quiz = service::bind_engagement(
        &state.repos,
        user_id,
        quiz_id,
        request.question_id,
        request.engagement_id,
    )
    .await?;
    Ok(Json(json!({ "quizID": quiz.id })))
}

pub async fn handle_quiz_underlying(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<String>,
) -> ApiResult<Json<QuizResult>> {
    let quiz_id = parse_id(&quiz_id, "quiz").map_err(ApiError::Validation)?;
    let quiz = state.repos.quizzes.get(quiz_id).await?;
    Ok(Json(service::quiz_underlying(&state.repos, quiz).await?))
}

pub async fn handle_list_quizzes(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> ApiResult<Json<Vec<Quiz>>> {
    let user_id = identity.require_user()?;
    Ok(Json(state.repos.quizzes.list_for_user(user_id).await?))
}

pub async fn handle_quizzes_underlying(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> ApiResult<Json<Vec<QuizResult>>> {
    let user_id = identity.require_user()?;
    Ok(Json(
        service::quizzes_underlying_for_user(&state.repos, user_id).await?,
    ))
}

pub fn configure_quiz_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quiz", post(handle_initialize_quiz).get(handle_get_quiz))
        .route("/quiz/:id", patch(handle_bind_question))
        .route("/quiz/:id/underlying", get(handle_quiz_underlying))
        .route(
            "/quizzes/:quiz_id/engagements/:engagement_id",
            patch(handle_bind_by_engagement),
        )
        .route("/quizzes", get(handle_list_quizzes))
        .route("/quizzes/underlying", get(handle_quizzes_underlying))
}
