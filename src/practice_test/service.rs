use chrono::Utc;
use futures::future::try_join_all;
use log::{info, warn};
use uuid::Uuid;

use super::scoring::{strand_stats, ScoreScaler};
use super::types::{CreateTestRequest, PracticeTest, TestResult, TestTemplate};
use crate::quiz::service::{initialize_quiz, quiz_underlying};
use crate::quiz::types::{InitializeQuizRequest, QuizResult};
use crate::shared::error::ApiError;
use crate::shared::state::AppState;
use crate::store::{Repositories, StoreError};

pub const TEST_QUIZ_TYPE: &str = "test";

pub fn module_name(test_name: &str, module: usize) -> String {
    format!("{test_name} - Module {module}")
}

pub async fn create_test(
    repos: &Repositories,
    user_id: Uuid,
    request: CreateTestRequest,
) -> Result<PracticeTest, ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::Validation("Test name is required".into()));
    }
    let test = PracticeTest {
        id: Uuid::new_v4(),
        user_id,
        name: request.name,
        quiz_ids: request.quiz_ids,
        attempt_time: Utc::now(),
        completed: false,
    };
    Ok(repos.tests.insert(test).await?)
}

async fn resolve_quizzes(repos: &Repositories, test: &PracticeTest) -> Result<Vec<QuizResult>, ApiError> {
    let mut results = Vec::with_capacity(test.quiz_ids.len());
    for quiz_id in &test.quiz_ids {
        match repos.quizzes.get(*quiz_id).await {
            Ok(quiz) => results.push(quiz_underlying(repos, quiz).await?),
            Err(StoreError::NotFound(_)) => {
                warn!("Test {} references missing quiz {}", test.id, quiz_id);
            }
            Err(e) => return Err(ApiError::from(e).in_stage("test quizzes")),
        }
    }
    Ok(results)
}

pub async fn test_underlying(state: &AppState, test: PracticeTest) -> Result<TestResult, ApiError> {
    let quiz_results = resolve_quizzes(&state.repos, &test).await?;
    let stats = strand_stats(&state.taxonomy, &quiz_results);
    let scaled = state.scaler.scale(&stats);

    Ok(TestResult {
        test,
        quiz_results,
        stats,
        scaled,
    })
}

pub async fn tests_underlying_for_user(
    state: &AppState,
    user_id: Uuid,
) -> Result<Vec<TestResult>, ApiError> {
    let tests = state.repos.tests.list_for_user(user_id).await?;
    try_join_all(tests.into_iter().map(|test| test_underlying(state, test))).await
}

async fn create_from_template(
    repos: &Repositories,
    user_id: Uuid,
    template: &TestTemplate,
) -> Result<PracticeTest, ApiError> {
    let mut quiz_ids = Vec::with_capacity(template.modules.len());
    for (i, questions) in template.modules.iter().enumerate() {
        let quiz = initialize_quiz(
            repos,
            user_id,
            InitializeQuizRequest {
                question_ids: questions.clone(),
                quiz_type: Some(TEST_QUIZ_TYPE.to_string()),
                name: Some(module_name(&template.name, i + 1)),
            },
        )
        .await?;
        quiz_ids.push(quiz.id);
    }

    create_test(
        repos,
        user_id,
        CreateTestRequest {
            quiz_ids,
            name: template.name.clone(),
        },
    )
    .await
}

/// Instantiates every template the user has not started yet. Returns only
/// the tests created by this call.
pub async fn create_all_tests(state: &AppState, user_id: Uuid) -> Result<Vec<PracticeTest>, ApiError> {
    let mut created = Vec::new();
    for template in state.templates.iter() {
        match state.repos.tests.get_by_name(user_id, &template.name).await {
            Ok(_) => continue,
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        created.push(create_from_template(&state.repos, user_id, template).await?);
    }
    info!(
        "Created {} of {} template tests for user {}",
        created.len(),
        state.templates.len(),
        user_id
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::practice_test::templates::TestTemplates;
    use crate::practice_test::types::{ScaledScores, StrandStats};
    use std::sync::Arc;

    struct CountingScaler;

    impl ScoreScaler for CountingScaler {
        fn scale(&self, stats: &[StrandStats]) -> ScaledScores {
            let total = stats.last().map_or(0.0, |s| f64::from(s.total));
            ScaledScores {
                math: 0.0,
                reading: 0.0,
                total,
            }
        }
    }

    fn state_with_template(modules: Vec<Vec<Uuid>>) -> AppState {
        AppState::in_memory("secret").with_templates(TestTemplates::new(vec![TestTemplate {
            name: "Practice Test 1".into(),
            modules,
        }]))
    }

    #[test]
    fn test_module_name() {
        assert_eq!(module_name("Practice Test 1", 2), "Practice Test 1 - Module 2");
    }

    #[tokio::test]
    async fn test_create_all_tests_skips_existing() {
        let state = state_with_template(vec![vec![Uuid::new_v4()], vec![Uuid::new_v4()]]);
        let user = Uuid::new_v4();

        let first = create_all_tests(&state, user).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].quiz_ids.len(), 2);

        let module = state
            .repos
            .quizzes
            .get_by_name(user, "Practice Test 1 - Module 1")
            .await
            .unwrap();
        assert_eq!(module.quiz_type, TEST_QUIZ_TYPE);

        let second = create_all_tests(&state, user).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_test_name_conflicts() {
        let state = AppState::in_memory("secret");
        let user = Uuid::new_v4();
        let request = || CreateTestRequest {
            quiz_ids: vec![],
            name: "Mock".into(),
        };
        create_test(&state.repos, user, request()).await.unwrap();
        let err = create_test(&state.repos, user, request()).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_underlying_skips_missing_quiz() {
        let state = AppState::in_memory("secret");
        let user = Uuid::new_v4();
        let test = create_test(
            &state.repos,
            user,
            CreateTestRequest {
                quiz_ids: vec![Uuid::new_v4()],
                name: "Dangling".into(),
            },
        )
        .await
        .unwrap();

        let result = test_underlying(&state, test).await.unwrap();
        assert!(result.quiz_results.is_empty());
        assert_eq!(result.stats.last().unwrap().total, 0);
        assert_eq!(result.scaled.total, 760.0);
    }

    #[tokio::test]
    async fn test_scaler_is_pluggable() {
        let state = AppState::in_memory("secret").with_scaler(Arc::new(CountingScaler));
        let test = create_test(
            &state.repos,
            Uuid::new_v4(),
            CreateTestRequest {
                quiz_ids: vec![],
                name: "Scaled".into(),
            },
        )
        .await
        .unwrap();
        let result = test_underlying(&state, test).await.unwrap();
        assert_eq!(result.scaled.total, 0.0);
        assert_eq!(result.scaled.math, 0.0);
    }
}
