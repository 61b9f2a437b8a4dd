use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engagement::types::{Engagement, EngagementStatus};
use crate::questions::types::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizEntry {
    pub question_id: Uuid,
    pub engagement_id: Option<Uuid>,
}

impl QuizEntry {
    pub fn unanswered(question_id: Uuid) -> Self {
        Self {
            question_id,
            engagement_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub quiz_type: String,
    pub attempt_time: DateTime<Utc>,
    pub entries: Vec<QuizEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitializeQuizRequest {
    #[serde(alias = "QuestionIDList")]
    pub question_ids: Vec<Uuid>,
    #[serde(default, alias = "Type", rename = "type")]
    pub quiz_type: Option<String>,
    #[serde(default, alias = "Name")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BindEngagementRequest {
    #[serde(alias = "QuestionID")]
    pub question_id: Uuid,
    #[serde(alias = "EngagementID")]
    pub engagement_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionEngagement {
    pub question: Option<Question>,
    pub engagement: Option<Engagement>,
}

impl QuestionEngagement {
    pub fn status(&self) -> EngagementStatus {
        self.engagement
            .as_ref()
            .map(|e| e.status)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizResult {
    pub quiz: Quiz,
    pub questions: Vec<QuestionEngagement>,
    pub num_total: u32,
    pub num_answered: u32,
    pub num_correct: u32,
    pub num_incorrect: u32,
    pub num_omitted: u32,
    pub num_unattempted: u32,
    pub percent_answered: f64,
    pub percent_correct: f64,
}
