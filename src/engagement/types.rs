use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementStatus {
    #[default]
    Unattempted,
    Correct,
    Incorrect,
    Omitted,
}

impl EngagementStatus {
    pub const ALL: [EngagementStatus; 4] = [
        EngagementStatus::Unattempted,
        EngagementStatus::Correct,
        EngagementStatus::Incorrect,
        EngagementStatus::Omitted,
    ];

    /// Correct, incorrect and omitted all count as an answer.
    pub fn is_answered(&self) -> bool {
        !matches!(self, Self::Unattempted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unattempted => "unattempted",
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
            Self::Omitted => "omitted",
        }
    }
}

impl fmt::Display for EngagementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngagementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unattempted" => Ok(Self::Unattempted),
            "correct" => Ok(Self::Correct),
            "incorrect" => Ok(Self::Incorrect),
            "omitted" => Ok(Self::Omitted),
            other => Err(format!("Unknown engagement status: {other}")),
        }
    }
}

/// Latest attempt of one user on one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub status: EngagementStatus,
    pub flagged: bool,
    pub starred: bool,
    pub reviewed: bool,
    pub user_answer: Option<String>,
    pub attempt_time: Option<DateTime<Utc>>,
    pub first_attempt_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub mode: Option<String>,
}

impl Engagement {
    pub fn new(user_id: Uuid, question_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            question_id,
            status: EngagementStatus::Unattempted,
            flagged: false,
            starred: false,
            reviewed: false,
            user_answer: None,
            attempt_time: None,
            first_attempt_time: None,
            duration_ms: None,
            mode: None,
        }
    }

    /// Overwrites the provided fields, keeping identity. The first attempt
    /// time is recorded once and never moved.
    pub fn apply(&mut self, fields: EngagementFields) {
        if let Some(status) = fields.status {
            self.status = status;
        }
        if let Some(flagged) = fields.flagged {
            self.flagged = flagged;
        }
        if let Some(starred) = fields.starred {
            self.starred = starred;
        }
        if let Some(reviewed) = fields.reviewed {
            self.reviewed = reviewed;
        }
        if let Some(answer) = fields.user_answer {
            self.user_answer = Some(answer);
        }
        if let Some(time) = fields.attempt_time {
            self.attempt_time = Some(time);
            if self.first_attempt_time.is_none() {
                self.first_attempt_time = Some(time);
            }
        }
        if let Some(duration) = fields.duration_ms {
            self.duration_ms = Some(duration);
        }
        if let Some(mode) = fields.mode {
            self.mode = Some(mode);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementFields {
    #[serde(default, alias = "Status")]
    pub status: Option<EngagementStatus>,
    #[serde(default, alias = "Flagged")]
    pub flagged: Option<bool>,
    #[serde(default, alias = "Starred")]
    pub starred: Option<bool>,
    #[serde(default, alias = "Reviewed")]
    pub reviewed: Option<bool>,
    #[serde(default, alias = "UserAnswer")]
    pub user_answer: Option<String>,
    #[serde(default, alias = "AttemptTime")]
    pub attempt_time: Option<DateTime<Utc>>,
    #[serde(default, alias = "Duration")]
    pub duration_ms: Option<i64>,
    #[serde(default, alias = "Mode")]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogEngagementRequest {
    #[serde(alias = "QuestionID")]
    pub question_id: Uuid,
    #[serde(flatten)]
    pub fields: EngagementFields,
}
