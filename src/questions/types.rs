use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "Easy")]
    Easy,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "Hard")]
    Hard,
    #[serde(alias = "Extreme")]
    Extreme,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Extreme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Extreme => "extreme",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            "extreme" => Ok(Self::Extreme),
            other => Err(format!("Unknown difficulty: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionImage {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub prompt: Option<String>,
    pub text: Option<String>,
    pub answer_type: Option<String>,
    #[serde(default)]
    pub answer_choices: Vec<String>,
    pub correct_answer_multiple: Option<String>,
    pub correct_answer_free: Option<String>,
    pub explanation: Option<String>,
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub access_option: Option<String>,
    #[serde(default)]
    pub images: Vec<QuestionImage>,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuestionRequest {
    pub prompt: Option<String>,
    pub text: Option<String>,
    pub answer_type: Option<String>,
    #[serde(default)]
    pub answer_choices: Vec<String>,
    pub correct_answer_multiple: Option<String>,
    pub correct_answer_free: Option<String>,
    pub explanation: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub access_option: Option<String>,
    #[serde(default)]
    pub images: Vec<QuestionImage>,
}

impl CreateQuestionRequest {
    pub fn into_question(self, now: DateTime<Utc>) -> Result<Question, String> {
        let subject = required(self.subject, "subject")?;
        let topic = required(self.topic, "topic")?;
        let difficulty = self
            .difficulty
            .ok_or_else(|| "difficulty is required".to_string())?;

        Ok(Question {
            id: Uuid::new_v4(),
            prompt: self.prompt,
            text: self.text,
            answer_type: self.answer_type,
            answer_choices: self.answer_choices,
            correct_answer_multiple: self.correct_answer_multiple,
            correct_answer_free: self.correct_answer_free,
            explanation: self.explanation,
            subject,
            topic,
            difficulty,
            access_option: self.access_option,
            images: self.images,
            created_at: now,
            last_edited_at: now,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(format!("{field} is required")),
    }
}

/// Partial edit. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionPatch {
    pub prompt: Option<String>,
    pub text: Option<String>,
    pub answer_type: Option<String>,
    pub answer_choices: Option<Vec<String>>,
    pub correct_answer_multiple: Option<String>,
    pub correct_answer_free: Option<String>,
    pub explanation: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub access_option: Option<String>,
    pub images: Option<Vec<QuestionImage>>,
}

impl QuestionPatch {
    pub fn apply(self, question: &mut Question, now: DateTime<Utc>) {
        if let Some(v) = self.prompt {
            question.prompt = Some(v);
        }
        if let Some(v) = self.text {
            question.text = Some(v);
        }
        if let Some(v) = self.answer_type {
            question.answer_type = Some(v);
        }
        if let Some(v) = self.answer_choices {
            question.answer_choices = v;
        }
        if let Some(v) = self.correct_answer_multiple {
            question.correct_answer_multiple = Some(v);
        }
        if let Some(v) = self.correct_answer_free {
            question.correct_answer_free = Some(v);
        }
        if let Some(v) = self.explanation {
            question.explanation = Some(v);
        }
        if let Some(v) = self.subject {
            question.subject = v;
        }
        if let Some(v) = self.topic {
            question.topic = v;
        }
        if let Some(v) = self.difficulty {
            question.difficulty = v;
        }
        if let Some(v) = self.access_option {
            question.access_option = Some(v);
        }
        if let Some(v) = self.images {
            question.images = v;
        }
        question.last_edited_at = now;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "1" => Ok(Self::Asc),
            "desc" | "-1" => Ok(Self::Desc),
            other => Err(format!("Unknown sort order: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionSortKey {
    Topic,
    Difficulty,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Page {
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_size as usize
    }
}

/// Store-level question query. Status filtering needs engagement data
/// and is applied above the store.
#[derive(Debug, Clone, Default)]
pub struct QuestionQuery {
    pub difficulties: Vec<Difficulty>,
    pub topics: Vec<String>,
    pub subject: Option<String>,
    pub sort: Vec<(QuestionSortKey, SortOrder)>,
    pub page: Option<Page>,
}

impl QuestionQuery {
    pub fn matches(&self, question: &Question) -> bool {
        (self.difficulties.is_empty() || self.difficulties.contains(&question.difficulty))
            && (self.topics.is_empty() || self.topics.iter().any(|t| *t == question.topic))
            && self
                .subject
                .as_deref()
                .map_or(true, |s| question.subject.eq_ignore_ascii_case(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parse_and_order() {
        assert_eq!("Hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("impossible".parse::<Difficulty>().is_err());
        assert!(Difficulty::Easy < Difficulty::Medium);
        assert!(Difficulty::Hard < Difficulty::Extreme);
    }

    #[test]
    fn test_difficulty_serde() {
        let parsed: Difficulty = serde_json::from_str("\"Medium\"").unwrap();
        assert_eq!(parsed, Difficulty::Medium);
        assert_eq!(serde_json::to_string(&Difficulty::Extreme).unwrap(), "\"extreme\"");
    }

    #[test]
    fn test_create_requires_topic() {
        let request = CreateQuestionRequest {
            prompt: None,
            text: None,
            answer_type: None,
            answer_choices: vec![],
            correct_answer_multiple: None,
            correct_answer_free: None,
            explanation: None,
            subject: Some("Math".into()),
            topic: None,
            difficulty: Some(Difficulty::Easy),
            access_option: None,
            images: vec![],
        };
        assert_eq!(
            request.into_question(Utc::now()).unwrap_err(),
            "topic is required"
        );
    }

    #[test]
    fn test_patch_bumps_last_edited() {
        let created = Utc::now() - chrono::Duration::hours(1);
        let mut question = Question {
            id: Uuid::new_v4(),
            prompt: None,
            text: Some("2 + 2".into()),
            answer_type: None,
            answer_choices: vec![],
            correct_answer_multiple: None,
            correct_answer_free: None,
            explanation: None,
            subject: "Math".into(),
            topic: "Linear functions".into(),
            difficulty: Difficulty::Easy,
            access_option: None,
            images: vec![],
            created_at: created,
            last_edited_at: created,
        };
        let now = Utc::now();
        QuestionPatch {
            difficulty: Some(Difficulty::Hard),
            ..Default::default()
        }
        .apply(&mut question, now);

        assert_eq!(question.difficulty, Difficulty::Hard);
        assert_eq!(question.text.as_deref(), Some("2 + 2"));
        assert_eq!(question.created_at, created);
        assert_eq!(question.last_edited_at, now);
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(Page { page: 1, page_size: 20 }.offset(), 0);
        assert_eq!(Page { page: 3, page_size: 20 }.offset(), 40);
        assert_eq!(Page { page: 0, page_size: 20 }.offset(), 0);
    }
}
