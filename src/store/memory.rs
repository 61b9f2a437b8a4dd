use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    DataCubeRepository, EngagementRepository, QuestionRepository, QuizRepository, StoreError,
    StoreHealth, StoreResult, TestRepository,
};
use crate::datacube::types::DataCube;
use crate::engagement::types::{Engagement, EngagementFields};
use crate::practice_test::types::PracticeTest;
use crate::questions::types::{Question, QuestionPatch, QuestionQuery, QuestionSortKey, SortOrder};
use crate::quiz::types::{Quiz, QuizEntry};

#[derive(Default)]
struct Tables {
    questions: HashMap<Uuid, Question>,
    engagements: HashMap<Uuid, Engagement>,
    quizzes: HashMap<Uuid, Quiz>,
    tests: HashMap<Uuid, PracticeTest>,
    datacubes: HashMap<Uuid, DataCube>,
}

/// Process-local store. Every operation takes the lock once, so each call
/// is atomic the way a single-document write is.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare_questions(
    a: &Question,
    b: &Question,
    sort: &[(QuestionSortKey, SortOrder)],
) -> Ordering {
    for (key, order) in sort {
        let ord = match key {
            QuestionSortKey::Topic => a.topic.cmp(&b.topic),
            QuestionSortKey::Difficulty => a.difficulty.cmp(&b.difficulty),
            QuestionSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        let ord = match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}

#[async_trait]
impl QuestionRepository for MemoryStore {
    async fn get(&self, id: Uuid) -> StoreResult<Question> {
        self.tables
            .read()
            .await
            .questions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Question", id))
    }

    async fn get_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Question>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Question> = tables
            .questions
            .values()
            .filter(|q| ids.contains(&q.id))
            .cloned()
            .collect();
        found.sort_by(|a, b| compare_questions(a, b, &[]));
        Ok(found)
    }

    async fn list(&self, query: &QuestionQuery) -> StoreResult<(Vec<Question>, u64)> {
        let tables = self.tables.read().await;
        let mut matched: Vec<Question> = tables
            .questions
            .values()
            .filter(|q| query.matches(q))
            .cloned()
            .collect();
        matched.sort_by(|a, b| compare_questions(a, b, &query.sort));

        let total = matched.len() as u64;
        let page = match query.page {
            Some(page) => matched
                .into_iter()
                .skip(page.offset())
                .take(page.page_size as usize)
                .collect(),
            None => matched,
        };
        Ok((page, total))
    }

    async fn insert(&self, question: Question) -> StoreResult<Question> {
        let mut tables = self.tables.write().await;
        if tables.questions.contains_key(&question.id) {
            return Err(StoreError::Conflict(format!("question {}", question.id)));
        }
        tables.questions.insert(question.id, question.clone());
        Ok(question)
    }

    async fn update(&self, id: Uuid, patch: QuestionPatch) -> StoreResult<Question> {
        let mut tables = self.tables.write().await;
        let question = tables
            .questions
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Question", id))?;
        patch.apply(question, Utc::now());
        Ok(question.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .questions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("Question", id))
    }
}

#[async_trait]
impl EngagementRepository for MemoryStore {
    async fn upsert(
        &self,
        user_id: Uuid,
        question_id: Uuid,
        fields: EngagementFields,
    ) -> StoreResult<Engagement> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .engagements
            .values_mut()
            .find(|e| e.user_id == user_id && e.question_id == question_id);

        let engagement = match existing {
            Some(engagement) => {
                engagement.apply(fields);
                engagement.clone()
            }
            None => {
                let mut engagement = Engagement::new(user_id, question_id);
                engagement.apply(fields);
                tables.engagements.insert(engagement.id, engagement.clone());
                engagement
            }
        };
        Ok(engagement)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Engagement> {
        self.tables
            .read()
            .await
            .engagements
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Engagement", id))
    }

    async fn get_for_question(&self, user_id: Uuid, question_id: Uuid) -> StoreResult<Engagement> {
        self.tables
            .read()
            .await
            .engagements
            .values()
            .find(|e| e.user_id == user_id && e.question_id == question_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Engagement for question", question_id))
    }

    async fn get_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Engagement>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.engagements.get(id).cloned())
            .collect())
    }

    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Engagement>> {
        let tables = self.tables.read().await;
        let mut engagements: Vec<Engagement> = tables
            .engagements
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        engagements.sort_by_key(|e| e.id);
        Ok(engagements)
    }

    async fn list_by_questions(&self, question_ids: &[Uuid]) -> StoreResult<Vec<Engagement>> {
        let wanted: HashSet<Uuid> = question_ids.iter().copied().collect();
        let tables = self.tables.read().await;
        let mut engagements: Vec<Engagement> = tables
            .engagements
            .values()
            .filter(|e| wanted.contains(&e.question_id))
            .cloned()
            .collect();
        engagements.sort_by_key(|e| e.id);
        Ok(engagements)
    }

    async fn update(&self, id: Uuid, fields: EngagementFields) -> StoreResult<Engagement> {
        let mut tables = self.tables.write().await;
        let engagement = tables
            .engagements
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Engagement", id))?;
        engagement.apply(fields);
        Ok(engagement.clone())
    }
}

#[async_trait]
impl QuizRepository for MemoryStore {
    async fn upsert_by_name(&self, quiz: Quiz) -> StoreResult<Quiz> {
        let mut tables = self.tables.write().await;
        let existing_id = tables
            .quizzes
            .values()
            .find(|q| q.user_id == quiz.user_id && q.name == quiz.name)
            .map(|q| q.id);

        let stored = Quiz {
            id: existing_id.unwrap_or(quiz.id),
            ..quiz
        };
        tables.quizzes.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Quiz> {
        self.tables
            .read()
            .await
            .quizzes
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Quiz", id))
    }

    async fn get_by_name(&self, user_id: Uuid, name: &str) -> StoreResult<Quiz> {
        self.tables
            .read()
            .await
            .quizzes
            .values()
            .find(|q| q.user_id == user_id && q.name == name)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Quiz", name))
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Quiz>> {
        let tables = self.tables.read().await;
        let mut quizzes: Vec<Quiz> = tables
            .quizzes
            .values()
            .filter(|q| q.user_id == user_id)
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| b.attempt_time.cmp(&a.attempt_time).then(a.id.cmp(&b.id)));
        Ok(quizzes)
    }

    async fn bind_engagement(&self, quiz_id: Uuid, entry: QuizEntry) -> StoreResult<Quiz> {
        let mut tables = self.tables.write().await;
        let quiz = tables
            .quizzes
            .get_mut(&quiz_id)
            .ok_or_else(|| StoreError::not_found("Quiz", quiz_id))?;

        match quiz
            .entries
            .iter_mut()
            .find(|e| e.question_id == entry.question_id)
        {
            Some(existing) => existing.engagement_id = entry.engagement_id,
            None => quiz.entries.push(entry),
        }
        Ok(quiz.clone())
    }
}

#[async_trait]
impl TestRepository for MemoryStore {
    async fn insert(&self, test: PracticeTest) -> StoreResult<PracticeTest> {
        let mut tables = self.tables.write().await;
        let duplicate = tables
            .tests
            .values()
            .any(|t| t.user_id == test.user_id && t.name == test.name);
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "test named {} already exists",
                test.name
            )));
        }
        tables.tests.insert(test.id, test.clone());
        Ok(test)
    }

    async fn get(&self, id: Uuid) -> StoreResult<PracticeTest> {
        self.tables
            .read()
            .await
            .tests
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Test", id))
    }

    async fn get_by_name(&self, user_id: Uuid, name: &str) -> StoreResult<PracticeTest> {
        self.tables
            .read()
            .await
            .tests
            .values()
            .find(|t| t.user_id == user_id && t.name == name)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Test", name))
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<PracticeTest>> {
        let tables = self.tables.read().await;
        let mut tests: Vec<PracticeTest> = tables
            .tests
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tests.sort_by(|a, b| b.attempt_time.cmp(&a.attempt_time).then(a.id.cmp(&b.id)));
        Ok(tests)
    }

    async fn set_completed(&self, id: Uuid, completed: bool) -> StoreResult<PracticeTest> {
        let mut tables = self.tables.write().await;
        let test = tables
            .tests
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Test", id))?;
        test.completed = completed;
        Ok(test.clone())
    }
}

#[async_trait]
impl DataCubeRepository for MemoryStore {
    async fn upsert(&self, cube: DataCube) -> StoreResult<DataCube> {
        self.tables
            .write()
            .await
            .datacubes
            .insert(cube.user_id, cube.clone());
        Ok(cube)
    }

    async fn get(&self, user_id: Uuid) -> StoreResult<DataCube> {
        self.tables
            .read()
            .await
            .datacubes
            .get(&user_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Data cube for user", user_id))
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::types::EngagementStatus;
    use crate::questions::types::Difficulty;
    use std::sync::Arc;

    fn question(topic: &str, difficulty: Difficulty) -> Question {
        let now = Utc::now();
        Question {
            id: Uuid::new_v4(),
            prompt: None,
            text: None,
            answer_type: None,
            answer_choices: vec![],
            correct_answer_multiple: None,
            correct_answer_free: None,
            explanation: None,
            subject: "Math".into(),
            topic: topic.into(),
            difficulty,
            access_option: None,
            images: vec![],
            created_at: now,
            last_edited_at: now,
        }
    }

    #[tokio::test]
    async fn test_engagement_upsert_preserves_identity() {
        let store = Arc::new(MemoryStore::new());
        let repo: Arc<dyn EngagementRepository> = store;
        let user = Uuid::new_v4();
        let question = Uuid::new_v4();

        let first = repo
            .upsert(
                user,
                question,
                EngagementFields {
                    status: Some(EngagementStatus::Incorrect),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let second = repo
            .upsert(
                user,
                question,
                EngagementFields {
                    status: Some(EngagementStatus::Correct),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, EngagementStatus::Correct);
        assert_eq!(repo.list_by_user(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_by_questions_spans_users() {
        let repo: Arc<dyn EngagementRepository> = Arc::new(MemoryStore::new());
        let wanted = Uuid::new_v4();
        let other = Uuid::new_v4();
        for user in [Uuid::new_v4(), Uuid::new_v4()] {
            repo.upsert(user, wanted, EngagementFields::default()).await.unwrap();
        }
        repo.upsert(Uuid::new_v4(), other, EngagementFields::default())
            .await
            .unwrap();

        let found = repo.list_by_questions(&[wanted]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|e| e.question_id == wanted));
    }

    #[tokio::test]
    async fn test_question_list_filters_and_pages() {
        let repo: Arc<dyn QuestionRepository> = Arc::new(MemoryStore::new());
        for difficulty in [Difficulty::Hard, Difficulty::Easy, Difficulty::Medium] {
            repo.insert(question("Circles", difficulty)).await.unwrap();
        }
        repo.insert(question("Percentages", Difficulty::Easy))
            .await
            .unwrap();

        let query = QuestionQuery {
            topics: vec!["Circles".into()],
            sort: vec![(QuestionSortKey::Difficulty, SortOrder::Asc)],
            page: Some(crate::questions::types::Page {
                page: 1,
                page_size: 2,
            }),
            ..Default::default()
        };
        let (page, total) = repo.list(&query).await.unwrap();

        assert_eq!(total, 3);
        let difficulties: Vec<_> = page.iter().map(|q| q.difficulty).collect();
        assert_eq!(difficulties, vec![Difficulty::Easy, Difficulty::Medium]);
    }

    #[tokio::test]
    async fn test_test_insert_conflicts_on_duplicate_name() {
        let repo: Arc<dyn TestRepository> = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let test = PracticeTest {
            id: Uuid::new_v4(),
            user_id: user,
            name: "Practice test 1".into(),
            quiz_ids: vec![],
            attempt_time: Utc::now(),
            completed: false,
        };
        repo.insert(test.clone()).await.unwrap();
        let again = repo
            .insert(PracticeTest {
                id: Uuid::new_v4(),
                ..test
            })
            .await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));
    }
}
