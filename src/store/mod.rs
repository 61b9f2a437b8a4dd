//! Persistence seams.
//!
//! Each entity has an async repository trait. Two backends implement all of
//! them: [`memory::MemoryStore`] for tests and database-less runs, and
//! [`postgres::PgStore`] over a diesel connection pool.

pub mod memory;
pub mod postgres;
pub mod schema;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::datacube::types::DataCube;
use crate::engagement::types::{Engagement, EngagementFields};
use crate::practice_test::types::PracticeTest;
use crate::questions::types::{Question, QuestionPatch, QuestionQuery};
use crate::quiz::types::{Quiz, QuizEntry};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Query timed out after {0}s")]
    Timeout(u64),
    #[error("Stored value could not be decoded: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} {id}"))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> StoreResult<Question>;
    /// Missing ids are skipped; output follows storage order.
    async fn get_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Question>>;
    /// Returns the requested page and the total number of matches.
    async fn list(&self, query: &QuestionQuery) -> StoreResult<(Vec<Question>, u64)>;
    async fn insert(&self, question: Question) -> StoreResult<Question>;
    async fn update(&self, id: Uuid, patch: QuestionPatch) -> StoreResult<Question>;
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait EngagementRepository: Send + Sync {
    /// Find-by-(user, question), replace the given fields, keep identity.
    async fn upsert(
        &self,
        user_id: Uuid,
        question_id: Uuid,
        fields: EngagementFields,
    ) -> StoreResult<Engagement>;
    async fn get(&self, id: Uuid) -> StoreResult<Engagement>;
    async fn get_for_question(&self, user_id: Uuid, question_id: Uuid) -> StoreResult<Engagement>;
    async fn get_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Engagement>>;
    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Engagement>>;
    /// Every user's engagements on the given questions.
    async fn list_by_questions(&self, question_ids: &[Uuid]) -> StoreResult<Vec<Engagement>>;
    async fn update(&self, id: Uuid, fields: EngagementFields) -> StoreResult<Engagement>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Full replace keyed by (user, name). An existing quiz keeps its id.
    async fn upsert_by_name(&self, quiz: Quiz) -> StoreResult<Quiz>;
    async fn get(&self, id: Uuid) -> StoreResult<Quiz>;
    async fn get_by_name(&self, user_id: Uuid, name: &str) -> StoreResult<Quiz>;
    /// Newest attempt first.
    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Quiz>>;
    /// Sets the engagement on the entry for `entry.question_id`, appending
    /// the entry when the quiz has none. Applied as one write.
    async fn bind_engagement(&self, quiz_id: Uuid, entry: QuizEntry) -> StoreResult<Quiz>;
}

#[async_trait]
pub trait TestRepository: Send + Sync {
    /// Fails with `Conflict` when the user already has a test of that name.
    async fn insert(&self, test: PracticeTest) -> StoreResult<PracticeTest>;
    async fn get(&self, id: Uuid) -> StoreResult<PracticeTest>;
    async fn get_by_name(&self, user_id: Uuid, name: &str) -> StoreResult<PracticeTest>;
    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<PracticeTest>>;
    async fn set_completed(&self, id: Uuid, completed: bool) -> StoreResult<PracticeTest>;
}

#[async_trait]
pub trait DataCubeRepository: Send + Sync {
    /// Full replace keyed by user; last write wins.
    async fn upsert(&self, cube: DataCube) -> StoreResult<DataCube>;
    async fn get(&self, user_id: Uuid) -> StoreResult<DataCube>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;
}

#[derive(Clone)]
pub struct Repositories {
    pub questions: Arc<dyn QuestionRepository>,
    pub engagements: Arc<dyn EngagementRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub tests: Arc<dyn TestRepository>,
    pub datacubes: Arc<dyn DataCubeRepository>,
    pub health: Arc<dyn StoreHealth>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()))
    }

    pub fn postgres(store: PgStore) -> Self {
        Self::from_backend(Arc::new(store))
    }

    fn from_backend<S>(store: Arc<S>) -> Self
    where
        S: QuestionRepository
            + EngagementRepository
            + QuizRepository
            + TestRepository
            + DataCubeRepository
            + StoreHealth
            + 'static,
    {
        Self {
            questions: store.clone(),
            engagements: store.clone(),
            quizzes: store.clone(),
            tests: store.clone(),
            datacubes: store.clone(),
            health: store,
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}
