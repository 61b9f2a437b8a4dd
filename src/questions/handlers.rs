use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use log::info;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::listing::{self, ListQuestionsParams, QuestionPage, QuestionWithStatus};
use super::types::{CreateQuestionRequest, Question, QuestionPatch};
use crate::security::Identity;
use crate::shared::error::{ApiError, ApiResult};
use crate::shared::state::AppState;
use crate::shared::utils::{parse_id, parse_id_list};
use crate::statistics::join;

#[derive(Debug, Deserialize)]
pub struct QuestionsByIdQuery {
    pub ids: Option<String>,
}

pub async fn handle_list_questions(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(params): Query<ListQuestionsParams>,
) -> ApiResult<Json<QuestionPage>> {
    let plan = params.plan().map_err(ApiError::Validation)?;
    Ok(Json(listing::list_questions(&state.repos, identity, plan).await?))
}

pub async fn handle_create_question(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(request): Json<CreateQuestionRequest>,
) -> ApiResult<(StatusCode, Json<Question>)> {
    identity.require_user()?;
    let question = request
        .into_question(Utc::now())
        .map_err(ApiError::Validation)?;
    if !state.taxonomy.contains_leaf(&question.topic) {
        info!("Question created with topic outside the taxonomy: {}", question.topic);
    }
    let created = state.repos.questions.insert(question).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn handle_get_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Question>> {
    let id = parse_id(&id, "question").map_err(ApiError::Validation)?;
    Ok(Json(state.repos.questions.get(id).await?))
}

pub async fn handle_update_question(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(patch): Json<QuestionPatch>,
) -> ApiResult<Json<Question>> {
    identity.require_user()?;
    let id = parse_id(&id, "question").map_err(ApiError::Validation)?;
    Ok(Json(state.repos.questions.update(id, patch).await?))
}

pub async fn handle_delete_question(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    identity.require_user()?;
    let id = parse_id(&id, "question").map_err(ApiError::Validation)?;
    state.repos.questions.delete(id).await?;
    info!("Deleted question {id}");
    Ok(StatusCode::NO_CONTENT)
}

/// Questions in the requested order with the caller's status. Unknown ids
/// are skipped.
pub async fn handle_questions_by_id(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(query): Query<QuestionsByIdQuery>,
) -> ApiResult<Json<Vec<QuestionWithStatus>>> {
    let raw = query
        .ids
        .ok_or_else(|| ApiError::Validation("ids query parameter is required".into()))?;
    let ids = parse_id_list(&raw, "question").map_err(ApiError::Validation)?;
    if ids.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let mut found: HashMap<_, _> = state
        .repos
        .questions
        .get_many(&ids)
        .await?
        .into_iter()
        .map(|q| (q.id, q))
        .collect();
    let ordered: Vec<Question> = ids.iter().filter_map(|id| found.remove(id)).collect();

    let question_ids: Vec<_> = ordered.iter().map(|q| q.id).collect();
    let engagements = join::engagements_for(&state.repos, identity, &question_ids).await?;
    Ok(Json(
        join::join(identity, ordered, engagements)
            .into_iter()
            .map(QuestionWithStatus::from)
            .collect(),
    ))
}

pub fn configure_question_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/questions",
            get(handle_list_questions).post(handle_create_question),
        )
        .route(
            "/questions/:id",
            get(handle_get_question)
                .put(handle_update_question)
                .delete(handle_delete_question),
        )
        .route("/questionsbyid", get(handle_questions_by_id))
}
