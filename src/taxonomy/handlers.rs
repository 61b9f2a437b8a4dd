use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use super::standard::{MATH, READING};
use super::TopicNode;
use crate::practice_test::types::TestTemplate;
use crate::shared::error::{ApiError, ApiResult};
use crate::shared::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TopicListQuery {
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TestRepresentationQuery {
    pub name: Option<String>,
}

/// Math unless the caller names another subject.
fn requested_subject(raw: Option<&str>) -> &'static str {
    match raw.map(str::trim) {
        None | Some("") => MATH,
        Some(s) if s.eq_ignore_ascii_case(MATH) => MATH,
        Some(_) => READING,
    }
}

pub async fn handle_topic_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopicListQuery>,
) -> ApiResult<Json<Vec<TopicNode>>> {
    let name = requested_subject(query.subject.as_deref());
    let subject = state
        .taxonomy
        .subject(name)
        .ok_or_else(|| ApiError::NotFound(format!("Subject {name}")))?;
    Ok(Json(subject.topics.clone()))
}

pub async fn handle_test_representation(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TestRepresentationQuery>,
) -> ApiResult<Json<TestTemplate>> {
    let name = query
        .name
        .ok_or_else(|| ApiError::Validation("name query parameter is required".into()))?;
    state
        .templates
        .get(&name)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Test template {name}")))
}

pub fn configure_taxonomy_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/topiclist", get(handle_topic_list))
        .route("/testrepresentation", get(handle_test_representation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_subject() {
        assert_eq!(requested_subject(None), MATH);
        assert_eq!(requested_subject(Some("math")), MATH);
        assert_eq!(requested_subject(Some("reading")), READING);
        assert_eq!(requested_subject(Some("english")), READING);
    }
}
