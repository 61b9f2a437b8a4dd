use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::engagement::types::{Engagement, EngagementStatus};
use crate::questions::types::{Question, QuestionQuery};
use crate::security::Identity;
use crate::shared::error::ApiError;
use crate::store::{Repositories, StoreError};

/// A question paired with the caller's engagement on it, if any.
#[derive(Debug, Clone)]
pub struct JoinedQuestion {
    pub question: Question,
    pub engagement: Option<Engagement>,
    pub status: EngagementStatus,
    pub flagged: bool,
}

/// A signed-in user sees their own latest status; no row means unattempted.
pub fn user_status(engagement: Option<&Engagement>) -> EngagementStatus {
    engagement.map(|e| e.status).unwrap_or_default()
}

/// Anonymous callers see the shared anonymous identity's answered status.
/// Otherwise a question is unattempted only while nobody has engaged with
/// it; one that somebody has touched is left out of the anonymous view.
pub fn anonymous_status(sentinel: Option<&Engagement>, engaged: bool) -> Option<EngagementStatus> {
    match sentinel {
        Some(e) if e.status.is_answered() => Some(e.status),
        _ if engaged => None,
        _ => Some(EngagementStatus::Unattempted),
    }
}

/// Attaches at most one engagement per question and classifies it. For
/// anonymous callers `engagements` must hold every user's rows for the
/// questions, since the predicate depends on whether any exist. Engagements
/// pointing at deleted questions are ignored.
pub fn join(
    identity: Identity,
    questions: Vec<Question>,
    engagements: Vec<Engagement>,
) -> Vec<JoinedQuestion> {
    let owner = identity.key();
    let mut engaged: HashSet<Uuid> = HashSet::with_capacity(engagements.len());
    let mut by_question: HashMap<Uuid, Engagement> = HashMap::with_capacity(engagements.len());
    for engagement in engagements {
        engaged.insert(engagement.question_id);
        if engagement.user_id == owner {
            by_question.entry(engagement.question_id).or_insert(engagement);
        }
    }

    questions
        .into_iter()
        .filter_map(|question| {
            let engagement = by_question.remove(&question.id);
            let status = match identity {
                Identity::User(_) => user_status(engagement.as_ref()),
                Identity::Anonymous => {
                    anonymous_status(engagement.as_ref(), engaged.contains(&question.id))?
                }
            };
            let flagged = engagement.as_ref().is_some_and(|e| e.flagged);
            Some(JoinedQuestion {
                question,
                engagement,
                status,
                flagged,
            })
        })
        .collect()
}

/// The engagement rows `join` needs for `identity` over `question_ids`.
pub async fn engagements_for(
    repos: &Repositories,
    identity: Identity,
    question_ids: &[Uuid],
) -> Result<Vec<Engagement>, StoreError> {
    match identity {
        Identity::User(user_id) => repos.engagements.list_by_user(user_id).await,
        Identity::Anonymous => repos.engagements.list_by_questions(question_ids).await,
    }
}

/// Loads the question bank matching `query` and joins it against the
/// caller's engagements.
pub async fn load_joined(
    repos: &Repositories,
    identity: Identity,
    query: &QuestionQuery,
) -> Result<Vec<JoinedQuestion>, ApiError> {
    let (questions, _) = repos
        .questions
        .list(query)
        .await
        .map_err(|e| ApiError::from(e).in_stage("statistics join (questions)"))?;
    if questions.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
    let engagements = engagements_for(repos, identity, &ids)
        .await
        .map_err(|e| ApiError::from(e).in_stage("statistics join (engagements)"))?;

    Ok(join(identity, questions, engagements))
}
