//! Question listing with the caller's status attached.
//!
//! Filters and sorts that only touch question fields are pushed to the
//! store together with paging. Status filters and status or attempt-time
//! sorts need the engagement join, so those listings are joined first and
//! paged in memory.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

use super::types::{Difficulty, Page, Question, QuestionQuery, QuestionSortKey, SortOrder};
use crate::engagement::types::EngagementStatus;
use crate::security::Identity;
use crate::shared::error::ApiError;
use crate::shared::utils::split_csv;
use crate::statistics::join::{self, load_joined, JoinedQuestion};
use crate::store::Repositories;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuestionsParams {
    pub difficulty: Option<String>,
    pub topic: Option<String>,
    pub subject: Option<String>,
    #[serde(default)]
    pub unattempted: bool,
    #[serde(default)]
    pub incorrect: bool,
    #[serde(default)]
    pub omitted: bool,
    #[serde(default)]
    pub correct: bool,
    #[serde(default)]
    pub flagged: bool,
    pub sort_topic: Option<String>,
    pub sort_difficulty: Option<String>,
    pub sort_status: Option<String>,
    pub sort_attempt_time: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Which joined rows a listing admits. Nothing selected admits everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFilter {
    pub statuses: Vec<EngagementStatus>,
    pub flagged: bool,
}

impl StatusFilter {
    pub fn admits_all(&self) -> bool {
        self.statuses.is_empty() && !self.flagged
    }

    pub fn admits(&self, row: &JoinedQuestion) -> bool {
        self.admits_all() || self.statuses.contains(&row.status) || (self.flagged && row.flagged)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSortKey {
    Topic,
    Difficulty,
    Status,
    AttemptTime,
}

impl ListSortKey {
    fn store_key(self) -> Option<QuestionSortKey> {
        match self {
            Self::Topic => Some(QuestionSortKey::Topic),
            Self::Difficulty => Some(QuestionSortKey::Difficulty),
            Self::Status | Self::AttemptTime => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListPlan {
    pub query: QuestionQuery,
    pub filter: StatusFilter,
    pub sort: Vec<(ListSortKey, SortOrder)>,
    pub page: Page,
}

impl ListPlan {
    fn needs_join_first(&self) -> bool {
        !self.filter.admits_all() || self.sort.iter().any(|(k, _)| k.store_key().is_none())
    }
}

fn parse_sort(raw: Option<&str>) -> Result<Option<SortOrder>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}

impl ListQuestionsParams {
    pub fn plan(self) -> Result<ListPlan, String> {
        let difficulties = split_csv(self.difficulty.as_deref())
            .iter()
            .map(|d| d.parse::<Difficulty>())
            .collect::<Result<Vec<_>, _>>()?;

        let page = self.page.unwrap_or(1);
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page == 0 || page_size == 0 {
            return Err("page and pageSize must be positive".into());
        }

        let mut statuses = Vec::new();
        for (on, status) in [
            (self.unattempted, EngagementStatus::Unattempted),
            (self.correct, EngagementStatus::Correct),
            (self.incorrect, EngagementStatus::Incorrect),
            (self.omitted, EngagementStatus::Omitted),
        ] {
            if on {
                statuses.push(status);
            }
        }

        let mut sort = Vec::new();
        for (key, raw) in [
            (ListSortKey::Topic, self.sort_topic.as_deref()),
            (ListSortKey::Difficulty, self.sort_difficulty.as_deref()),
            (ListSortKey::Status, self.sort_status.as_deref()),
            (ListSortKey::AttemptTime, self.sort_attempt_time.as_deref()),
        ] {
            if let Some(order) = parse_sort(raw)? {
                sort.push((key, order));
            }
        }

        Ok(ListPlan {
            query: QuestionQuery {
                difficulties,
                topics: split_csv(self.topic.as_deref()),
                subject: self.subject.filter(|s| !s.trim().is_empty()),
                ..QuestionQuery::default()
            },
            filter: StatusFilter {
                statuses,
                flagged: self.flagged,
            },
            sort,
            page: Page { page, page_size },
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithStatus {
    pub question: Question,
    pub status: EngagementStatus,
    pub flagged: bool,
}

impl From<JoinedQuestion> for QuestionWithStatus {
    fn from(row: JoinedQuestion) -> Self {
        Self {
            question: row.question,
            status: row.status,
            flagged: row.flagged,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPage {
    pub current_page: u32,
    pub last_page: u64,
    pub total_questions: u64,
    pub data: Vec<QuestionWithStatus>,
}

impl QuestionPage {
    fn new(page: Page, total: u64, data: Vec<QuestionWithStatus>) -> Self {
        let size = u64::from(page.page_size);
        Self {
            current_page: page.page,
            last_page: total.div_ceil(size),
            total_questions: total,
            data,
        }
    }
}

fn compare_rows(a: &JoinedQuestion, b: &JoinedQuestion, sort: &[(ListSortKey, SortOrder)]) -> Ordering {
    for (key, order) in sort {
        let ord = match key {
            ListSortKey::Topic => a.question.topic.cmp(&b.question.topic),
            ListSortKey::Difficulty => a.question.difficulty.cmp(&b.question.difficulty),
            ListSortKey::Status => a.status.as_str().cmp(b.status.as_str()),
            ListSortKey::AttemptTime => {
                let first = |row: &JoinedQuestion| row.engagement.as_ref().and_then(|e| e.first_attempt_time);
                first(a).cmp(&first(b))
            }
        };
        let ord = match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.question
        .created_at
        .cmp(&b.question.created_at)
        .then(a.question.id.cmp(&b.question.id))
}

pub async fn list_questions(
    repos: &Repositories,
    identity: Identity,
    plan: ListPlan,
) -> Result<QuestionPage, ApiError> {
    // The anonymous view drops engaged questions, so store-side paging
    // would miscount for it.
    let anonymous = matches!(identity, Identity::Anonymous);
    if !plan.needs_join_first() && !anonymous {
        let query = QuestionQuery {
            sort: plan
                .sort
                .iter()
                .filter_map(|(k, o)| k.store_key().map(|k| (k, *o)))
                .collect(),
            page: Some(plan.page),
            ..plan.query
        };
        let (questions, total) = repos.questions.list(&query).await?;
        let engagements = if questions.is_empty() {
            Vec::new()
        } else {
            let ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
            join::engagements_for(repos, identity, &ids).await?
        };
        let data = join::join(identity, questions, engagements)
            .into_iter()
            .map(QuestionWithStatus::from)
            .collect();
        return Ok(QuestionPage::new(plan.page, total, data));
    }

    let mut rows: Vec<JoinedQuestion> = load_joined(repos, identity, &plan.query)
        .await?
        .into_iter()
        .filter(|row| plan.filter.admits(row))
        .collect();
    rows.sort_by(|a, b| compare_rows(a, b, &plan.sort));

    let total = rows.len() as u64;
    let data = rows
        .into_iter()
        .skip(plan.page.offset())
        .take(plan.page.page_size as usize)
        .map(QuestionWithStatus::from)
        .collect();
    Ok(QuestionPage::new(plan.page, total, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_defaults() {
        let plan = ListQuestionsParams::default().plan().unwrap();
        assert_eq!(plan.page, Page { page: 1, page_size: DEFAULT_PAGE_SIZE });
        assert!(plan.filter.admits_all());
        assert!(!plan.needs_join_first());
    }

    #[test]
    fn test_plan_parses_filters_and_sorts() {
        let plan = ListQuestionsParams {
            difficulty: Some("easy,Hard".into()),
            topic: Some("Circles, Linear functions".into()),
            incorrect: true,
            sort_difficulty: Some("desc".into()),
            sort_attempt_time: Some("asc".into()),
            ..Default::default()
        }
        .plan()
        .unwrap();

        assert_eq!(plan.query.difficulties, vec![Difficulty::Easy, Difficulty::Hard]);
        assert_eq!(plan.query.topics, vec!["Circles", "Linear functions"]);
        assert_eq!(plan.filter.statuses, vec![EngagementStatus::Incorrect]);
        assert_eq!(
            plan.sort,
            vec![
                (ListSortKey::Difficulty, SortOrder::Desc),
                (ListSortKey::AttemptTime, SortOrder::Asc)
            ]
        );
        assert!(plan.needs_join_first());
    }

    #[test]
    fn test_plan_rejects_bad_input() {
        let bad_difficulty = ListQuestionsParams {
            difficulty: Some("impossible".into()),
            ..Default::default()
        };
        assert!(bad_difficulty.plan().is_err());

        let zero_page = ListQuestionsParams {
            page_size: Some(0),
            ..Default::default()
        };
        assert!(zero_page.plan().is_err());

        let bad_sort = ListQuestionsParams {
            sort_topic: Some("sideways".into()),
            ..Default::default()
        };
        assert!(bad_sort.plan().is_err());
    }

    #[test]
    fn test_last_page_rounds_up() {
        let page = Page { page: 1, page_size: 10 };
        assert_eq!(QuestionPage::new(page, 21, vec![]).last_page, 3);
        assert_eq!(QuestionPage::new(page, 0, vec![]).last_page, 0);
    }
}
