use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::service;
use super::types::{CreateTestRequest, PracticeTest, TestResult, UpdateTestRequest};
use crate::security::Identity;
use crate::shared::error::{ApiError, ApiResult};
use crate::shared::state::AppState;
use crate::shared::utils::parse_id;

#[derive(Debug, Deserialize)]
pub struct TestLookup {
    pub name: Option<String>,
}

pub async fn handle_create_test(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(request): Json<CreateTestRequest>,
) -> ApiResult<Json<Value>> {
    let user_id = identity.require_user()?;
    let test = service::create_test(&state.repos, user_id, request).await?;
    Ok(Json(json!({ "testID": test.id })))
}

pub async fn handle_get_test_by_name(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(lookup): Query<TestLookup>,
) -> ApiResult<Json<PracticeTest>> {
    let user_id = identity.require_user()?;
    let name = lookup
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation("name query parameter is required".into()))?;
    Ok(Json(state.repos.tests.get_by_name(user_id, &name).await?))
}

pub async fn handle_get_test(
    State(state): State<Arc<AppState>>,
    Path(test_id): Path<String>,
) -> ApiResult<Json<PracticeTest>> {
    let test_id = parse_id(&test_id, "test").map_err(ApiError::Validation)?;
    Ok(Json(state.repos.tests.get(test_id).await?))
}

pub async fn handle_update_test(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(test_id): Path<String>,
    Json(request): Json<UpdateTestRequest>,
) -> ApiResult<Json<PracticeTest>> {
    let user_id = identity.require_user()?;
    let test_id = parse_id(&test_id, "test").map_err(ApiError::Validation)?;

    let test = state.repos.tests.get(test_id).await?;
    if test.user_id != user_id {
        return Err(ApiError::NotFound(format!("Test {test_id}")));
    }
    Ok(Json(
        state.repos.tests.set_completed(test_id, request.completed).await?,
    ))
}

pub async fn handle_list_tests(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> ApiResult<Json<Vec<PracticeTest>>> {
    let user_id = identity.require_user()?;
    Ok(Json(state.repos.tests.list_for_user(user_id).await?))
}

pub async fn handle_test_underlying(
    State(state): State<Arc<AppState>>,
    Path(test_id): Path<String>,
) -> ApiResult<Json<TestResult>> {
    let test_id = parse_id(&test_id, "test").map_err(ApiError::Validation)?;
    let test = state.repos.tests.get(test_id).await?;
    Ok(Json(service::test_underlying(&state, test).await?))
}

pub async fn handle_tests_underlying(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> ApiResult<Json<Vec<TestResult>>> {
    let user_id = identity.require_user()?;
    Ok(Json(service::tests_underlying_for_user(&state, user_id).await?))
}

pub async fn handle_create_all_tests(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> ApiResult<Json<Vec<PracticeTest>>> {
    let user_id = identity.require_user()?;
    Ok(Json(service::create_all_tests(&state, user_id).await?))
}

pub fn configure_test_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/test", post(handle_create_test).get(handle_get_test_by_name))
        .route("/test/:id", get(handle_get_test).patch(handle_update_test))
        .route("/test/:id/underlying", get(handle_test_underlying))
        .route("/tests", get(handle_list_tests))
        .route("/tests/underlying", get(handle_tests_underlying))
        .route("/createalltests", post(handle_create_all_tests))
}
