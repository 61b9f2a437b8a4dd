use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::types::{InitializeQuizRequest, QuestionEngagement, Quiz, QuizEntry, QuizResult};
use crate::engagement::types::{Engagement, EngagementStatus};
use crate::shared::error::ApiError;
use crate::store::Repositories;

pub const DEFAULT_NAME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Keeps the first occurrence of every id, in input order.
pub fn dedup_first_seen(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Builds the quiz document for `InitializeQuiz`; the store decides whether
/// it replaces an existing quiz of the same name.
pub fn new_quiz(user_id: Uuid, request: InitializeQuizRequest, now: DateTime<Utc>) -> Quiz {
    let name = request
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| now.format(DEFAULT_NAME_FORMAT).to_string());

    Quiz {
        id: Uuid::new_v4(),
        user_id,
        name,
        quiz_type: request.quiz_type.unwrap_or_default(),
        attempt_time: now,
        entries: dedup_first_seen(&request.question_ids)
            .into_iter()
            .map(QuizEntry::unanswered)
            .collect(),
    }
}

pub async fn initialize_quiz(
    repos: &Repositories,
    user_id: Uuid,
    request: InitializeQuizRequest,
) -> Result<Quiz, ApiError> {
    let quiz = new_quiz(user_id, request, Utc::now());
    debug!(
        "Initializing quiz '{}' with {} questions for user {}",
        quiz.name,
        quiz.entries.len(),
        user_id
    );
    Ok(repos.quizzes.upsert_by_name(quiz).await?)
}

async fn owned_quiz(repos: &Repositories, user_id: Uuid, quiz_id: Uuid) -> Result<Quiz, ApiError> {
    let quiz = repos.quizzes.get(quiz_id).await?;
    if quiz.user_id != user_id {
        return Err(ApiError::NotFound(format!("Quiz {quiz_id}")));
    }
    Ok(quiz)
}

async fn owned_engagement(
    repos: &Repositories,
    user_id: Uuid,
    engagement_id: Uuid,
) -> Result<Engagement, ApiError> {
    let engagement = repos.engagements.get(engagement_id).await?;
    if engagement.user_id != user_id {
        return Err(ApiError::NotFound(format!("Engagement {engagement_id}")));
    }
    Ok(engagement)
}

async fn bind_entry(repos: &Repositories, quiz: Quiz, entry: QuizEntry) -> Result<Quiz, ApiError> {
    if quiz.entries.contains(&entry) {
        return Ok(quiz);
    }
    Ok(repos.quizzes.bind_engagement(quiz.id, entry).await?)
}

/// Sets the engagement for `question_id`, appending the pair when the quiz
/// does not list that question yet. Repeating a binding changes nothing.
/// Both the quiz and the engagement must belong to the caller.
pub async fn bind_engagement(
    repos: &Repositories,
    user_id: Uuid,
    quiz_id: Uuid,
    question_id: Uuid,
    engagement_id: Uuid,
) -> Result<Quiz, ApiError> {
    let quiz = owned_quiz(repos, user_id, quiz_id).await?;
    owned_engagement(repos, user_id, engagement_id).await?;
    let entry = QuizEntry {
        question_id,
        engagement_id: Some(engagement_id),
    };
    bind_entry(repos, quiz, entry).await
}

/// Binding by engagement alone; the question comes from the engagement.
pub async fn bind_engagement_by_id(
    repos: &Repositories,
    user_id: Uuid,
    quiz_id: Uuid,
    engagement_id: Uuid,
) -> Result<Quiz, ApiError> {
    let quiz = owned_quiz(repos, user_id, quiz_id).await?;
    let engagement = owned_engagement(repos, user_id, engagement_id).await?;
    let entry = QuizEntry {
        question_id: engagement.question_id,
        engagement_id: Some(engagement_id),
    };
    bind_entry(repos, quiz, entry).await
}

fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole) * 100.0
    }
}

/// Scores a resolved quiz. Anything other than correct, incorrect or
/// omitted (including a missing engagement) counts as unattempted.
pub fn score(quiz: Quiz, questions: Vec<QuestionEngagement>) -> QuizResult {
    let (mut correct, mut incorrect, mut omitted) = (0u32, 0u32, 0u32);
    for pair in &questions {
        match pair.status() {
            EngagementStatus::Correct => correct += 1,
            EngagementStatus::Incorrect => incorrect += 1,
            EngagementStatus::Omitted => omitted += 1,
            EngagementStatus::Unattempted => {}
        }
    }

    let total = questions.len() as u32;
    let answered = correct + incorrect + omitted;

    QuizResult {
        quiz,
        questions,
        num_total: total,
        num_answered: answered,
        num_correct: correct,
        num_incorrect: incorrect,
        num_omitted: omitted,
        num_unattempted: total - answered,
        percent_answered: percent(answered, total),
        percent_correct: percent(correct, answered),
    }
}

/// Resolves every pair of the quiz and scores it. Questions or engagements
/// that no longer exist stay in the result as empty slots.
pub async fn quiz_underlying(repos: &Repositories, quiz: Quiz) -> Result<QuizResult, ApiError> {
    let question_ids: Vec<Uuid> = quiz.entries.iter().map(|e| e.question_id).collect();
    let engagement_ids: Vec<Uuid> = quiz.entries.iter().filter_map(|e| e.engagement_id).collect();

    let questions: HashMap<Uuid, _> = repos
        .questions
        .get_many(&question_ids)
        .await
        .map_err(|e| ApiError::from(e).in_stage("quiz questions"))?
        .into_iter()
        .map(|q| (q.id, q))
        .collect();

    let engagements: HashMap<Uuid, _> = if engagement_ids.is_empty() {
        HashMap::new()
    } else {
        repos
            .engagements
            .get_many(&engagement_ids)
            .await
            .map_err(|e| ApiError::from(e).in_stage("quiz engagements"))?
            .into_iter()
            .map(|e| (e.id, e))
            .collect()
    };

    let pairs = quiz
        .entries
        .iter()
        .map(|entry| {
            let question = questions.get(&entry.question_id).cloned();
            if question.is_none() {
                warn!(
                    "Quiz {} references missing question {}",
                    quiz.id, entry.question_id
                );
            }
            QuestionEngagement {
                question,
                engagement: entry
                    .engagement_id
                    .and_then(|id| engagements.get(&id).cloned()),
            }
        })
        .collect();

    Ok(score(quiz, pairs))
}

pub async fn quizzes_underlying_for_user(
    repos: &Repositories,
    user_id: Uuid,
) -> Result<Vec<QuizResult>, ApiError> {
    let quizzes = repos.quizzes.list_for_user(user_id).await?;
    try_join_all(quizzes.into_iter().map(|quiz| quiz_underlying(repos, quiz))).await
}
