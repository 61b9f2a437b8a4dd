use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::quiz::types::QuizResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeTest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub quiz_ids: Vec<Uuid>,
    pub attempt_time: DateTime<Utc>,
    pub completed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTestRequest {
    #[serde(alias = "QuizIDList")]
    pub quiz_ids: Vec<Uuid>,
    #[serde(alias = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTestRequest {
    #[serde(alias = "Completed")]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrandStats {
    pub name: String,
    pub total: u32,
    pub correct: u32,
}

impl StrandStats {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total: 0,
            correct: 0,
        }
    }

    pub fn absorb(&mut self, other: &StrandStats) {
        self.total += other.total;
        self.correct += other.correct;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledScores {
    pub math: f64,
    pub reading: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub test: PracticeTest,
    pub quiz_results: Vec<QuizResult>,
    pub stats: Vec<StrandStats>,
    pub scaled: ScaledScores,
}

/// A named exam layout: one question list per module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestTemplate {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "QuestionLists")]
    pub modules: Vec<Vec<Uuid>>,
}
