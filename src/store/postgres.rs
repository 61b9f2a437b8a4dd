use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::sql;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::Integer;
use diesel::upsert::excluded;
use log::{debug, info};
use std::time::Duration;
use uuid::Uuid;

use super::schema::{datacubes, engagements, questions, quizzes, tests};
use super::{
    DataCubeRepository, EngagementRepository, QuestionRepository, QuizRepository, StoreError,
    StoreHealth, StoreResult, TestRepository,
};
use crate::datacube::types::DataCube;
use crate::engagement::types::{Engagement, EngagementFields};
use crate::practice_test::types::PracticeTest;
use crate::questions::types::{Question, QuestionPatch, QuestionQuery, QuestionSortKey, SortOrder};
use crate::quiz::types::{Quiz, QuizEntry};
use crate::shared::utils::DbPool;

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => StoreError::NotFound("record".to_string()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            }
            DieselError::DeserializationError(e) => StoreError::Decode(e.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Migration error: {e}"))?;
    info!("Applied {} pending migrations", applied.len());
    Ok(())
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = questions)]
#[diesel(treat_none_as_null = true)]
struct DbQuestion {
    id: Uuid,
    prompt: Option<String>,
    text: Option<String>,
    answer_type: Option<String>,
    answer_choices: Vec<String>,
    correct_answer_multiple: Option<String>,
    correct_answer_free: Option<String>,
    explanation: Option<String>,
    subject: String,
    topic: String,
    difficulty: String,
    access_option: Option<String>,
    images: serde_json::Value,
    created_at: DateTime<Utc>,
    last_edited_at: DateTime<Utc>,
}

impl TryFrom<DbQuestion> for Question {
    type Error = StoreError;

    fn try_from(db: DbQuestion) -> StoreResult<Self> {
        Ok(Question {
            id: db.id,
            prompt: db.prompt,
            text: db.text,
            answer_type: db.answer_type,
            answer_choices: db.answer_choices,
            correct_answer_multiple: db.correct_answer_multiple,
            correct_answer_free: db.correct_answer_free,
            explanation: db.explanation,
            subject: db.subject,
            topic: db.topic,
            difficulty: db.difficulty.parse().map_err(StoreError::Decode)?,
            access_option: db.access_option,
            images: serde_json::from_value(db.images)
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            created_at: db.created_at,
            last_edited_at: db.last_edited_at,
        })
    }
}

impl TryFrom<&Question> for DbQuestion {
    type Error = StoreError;

    fn try_from(q: &Question) -> StoreResult<Self> {
        Ok(DbQuestion {
            id: q.id,
            prompt: q.prompt.clone(),
            text: q.text.clone(),
            answer_type: q.answer_type.clone(),
            answer_choices: q.answer_choices.clone(),
            correct_answer_multiple: q.correct_answer_multiple.clone(),
            correct_answer_free: q.correct_answer_free.clone(),
            explanation: q.explanation.clone(),
            subject: q.subject.clone(),
            topic: q.topic.clone(),
            difficulty: q.difficulty.as_str().to_string(),
            access_option: q.access_option.clone(),
            images: serde_json::to_value(&q.images)
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            created_at: q.created_at,
            last_edited_at: q.last_edited_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = engagements)]
#[diesel(treat_none_as_null = true)]
struct DbEngagement {
    id: Uuid,
    user_id: Uuid,
    question_id: Uuid,
    status: String,
    flagged: bool,
    starred: bool,
    reviewed: bool,
    user_answer: Option<String>,
    attempt_time: Option<DateTime<Utc>>,
    first_attempt_time: Option<DateTime<Utc>>,
    duration_ms: Option<i64>,
    mode: Option<String>,
}

impl TryFrom<DbEngagement> for Engagement {
    type Error = StoreError;

    fn try_from(db: DbEngagement) -> StoreResult<Self> {
        Ok(Engagement {
            id: db.id,
            user_id: db.user_id,
            question_id: db.question_id,
            status: db.status.parse().map_err(StoreError::Decode)?,
            flagged: db.flagged,
            starred: db.starred,
            reviewed: db.reviewed,
            user_answer: db.user_answer,
            attempt_time: db.attempt_time,
            first_attempt_time: db.first_attempt_time,
            duration_ms: db.duration_ms,
            mode: db.mode,
        })
    }
}

impl From<&Engagement> for DbEngagement {
    fn from(e: &Engagement) -> Self {
        DbEngagement {
            id: e.id,
            user_id: e.user_id,
            question_id: e.question_id,
            status: e.status.as_str().to_string(),
            flagged: e.flagged,
            starred: e.starred,
            reviewed: e.reviewed,
            user_answer: e.user_answer.clone(),
            attempt_time: e.attempt_time,
            first_attempt_time: e.first_attempt_time,
            duration_ms: e.duration_ms,
            mode: e.mode.clone(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = quizzes)]
struct DbQuiz {
    id: Uuid,
    user_id: Uuid,
    name: String,
    quiz_type: String,
    attempt_time: DateTime<Utc>,
    entries: serde_json::Value,
}

impl TryFrom<DbQuiz> for Quiz {
    type Error = StoreError;

    fn try_from(db: DbQuiz) -> StoreResult<Self> {
        Ok(Quiz {
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            quiz_type: db.quiz_type,
            attempt_time: db.attempt_time,
            entries: serde_json::from_value(db.entries)
                .map_err(|e| StoreError::Decode(e.to_string()))?,
        })
    }
}

impl TryFrom<&Quiz> for DbQuiz {
    type Error = StoreError;

    fn try_from(q: &Quiz) -> StoreResult<Self> {
        Ok(DbQuiz {
            id: q.id,
            user_id: q.user_id,
            name: q.name.clone(),
            quiz_type: q.quiz_type.clone(),
            attempt_time: q.attempt_time,
            entries: serde_json::to_value(&q.entries)
                .map_err(|e| StoreError::Decode(e.to_string()))?,
        })
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = tests)]
struct DbTest {
    id: Uuid,
    user_id: Uuid,
    name: String,
    quiz_ids: Vec<Uuid>,
    attempt_time: DateTime<Utc>,
    completed: bool,
}

impl From<DbTest> for PracticeTest {
    fn from(db: DbTest) -> Self {
        PracticeTest {
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            quiz_ids: db.quiz_ids,
            attempt_time: db.attempt_time,
            completed: db.completed,
        }
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = datacubes)]
struct DbDataCube {
    user_id: Uuid,
    rows: serde_json::Value,
    computed_at: DateTime<Utc>,
}

fn decode_all<D, T>(rows: Vec<D>) -> StoreResult<Vec<T>>
where
    T: TryFrom<D, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Diesel-backed store. Queries run on the blocking pool and are bounded
/// by `query_timeout`; the pool's connections also carry a matching
/// server-side statement timeout so abandoned queries stop.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
    query_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: DbPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            op(&mut conn)
        });

        match tokio::time::timeout(self.query_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(StoreError::Query(format!("store task failed: {e}"))),
            Err(_) => Err(StoreError::Timeout(self.query_timeout.as_secs())),
        }
    }
}

fn filtered_questions(query: &QuestionQuery) -> questions::BoxedQuery<'static, Pg> {
    let mut q = questions::table.into_boxed();
    if !query.difficulties.is_empty() {
        let names: Vec<String> = query
            .difficulties
            .iter()
            .map(|d| d.as_str().to_string())
            .collect();
        q = q.filter(questions::difficulty.eq_any(names));
    }
    if !query.topics.is_empty() {
        q = q.filter(questions::topic.eq_any(query.topics.clone()));
    }
    if let Some(subject) = &query.subject {
        q = q.filter(questions::subject.ilike(subject.clone()));
    }
    q
}

const DIFFICULTY_RANK: &str =
    "CASE difficulty WHEN 'easy' THEN 0 WHEN 'medium' THEN 1 WHEN 'hard' THEN 2 ELSE 3 END";

#[async_trait]
impl QuestionRepository for PgStore {
    async fn get(&self, id: Uuid) -> StoreResult<Question> {
        self.run(move |conn| {
            questions::table
                .find(id)
                .first::<DbQuestion>(conn)
                .optional()?
                .ok_or_else(|| StoreError::not_found("Question", id))
                .and_then(Question::try_from)
        })
        .await
    }

    async fn get_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Question>> {
        let ids = ids.to_vec();
        self.run(move |conn| {
            let rows = questions::table
                .filter(questions::id.eq_any(ids))
                .order((questions::created_at.asc(), questions::id.asc()))
                .load::<DbQuestion>(conn)?;
            decode_all(rows)
        })
        .await
    }

    async fn list(&self, query: &QuestionQuery) -> StoreResult<(Vec<Question>, u64)> {
        let query = query.clone();
        self.run(move |conn| {
            let total: i64 = filtered_questions(&query).count().get_result(conn)?;

            let mut select = filtered_questions(&query);
            for (key, order) in &query.sort {
                select = match (key, order) {
                    (QuestionSortKey::Topic, SortOrder::Asc) => {
                        select.then_order_by(questions::topic.asc())
                    }
                    (QuestionSortKey::Topic, SortOrder::Desc) => {
                        select.then_order_by(questions::topic.desc())
                    }
                    (QuestionSortKey::Difficulty, SortOrder::Asc) => {
                        select.then_order_by(sql::<Integer>(DIFFICULTY_RANK).asc())
                    }
                    (QuestionSortKey::Difficulty, SortOrder::Desc) => {
                        select.then_order_by(sql::<Integer>(DIFFICULTY_RANK).desc())
                    }
                    (QuestionSortKey::CreatedAt, SortOrder::Asc) => {
                        select.then_order_by(questions::created_at.asc())
                    }
                    (QuestionSortKey::CreatedAt, SortOrder::Desc) => {
                        select.then_order_by(questions::created_at.desc())
                    }
                };
            }
            select = select
                .then_order_by(questions::created_at.asc())
                .then_order_by(questions::id.asc());

            if let Some(page) = query.page {
                select = select
                    .offset(page.offset() as i64)
                    .limit(i64::from(page.page_size));
            }

            let rows = select.load::<DbQuestion>(conn)?;
            debug!("Loaded {} of {} matching questions", rows.len(), total);
            Ok((decode_all(rows)?, total.max(0) as u64))
        })
        .await
    }

    async fn insert(&self, question: Question) -> StoreResult<Question> {
        self.run(move |conn| {
            let row = DbQuestion::try_from(&question)?;
            let saved = diesel::insert_into(questions::table)
                .values(&row)
                .get_result::<DbQuestion>(conn)?;
            Question::try_from(saved)
        })
        .await
    }

    async fn update(&self, id: Uuid, patch: QuestionPatch) -> StoreResult<Question> {
        self.run(move |conn| {
            conn.transaction(|conn| {
                let current = questions::table
                    .find(id)
                    .for_update()
                    .first::<DbQuestion>(conn)
                    .optional()?
                    .ok_or_else(|| StoreError::not_found("Question", id))?;
                let mut question = Question::try_from(current)?;
                patch.apply(&mut question, Utc::now());

                let row = DbQuestion::try_from(&question)?;
                let saved = diesel::update(questions::table.find(id))
                    .set(&row)
                    .get_result::<DbQuestion>(conn)?;
                Question::try_from(saved)
            })
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.run(move |conn| {
            let deleted = diesel::delete(questions::table.find(id)).execute(conn)?;
            if deleted == 0 {
                return Err(StoreError::not_found("Question", id));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl EngagementRepository for PgStore {
    async fn upsert(
        &self,
        user_id: Uuid,
        question_id: Uuid,
        fields: EngagementFields,
    ) -> StoreResult<Engagement> {
        self.run(move |conn| {
            conn.transaction(|conn| {
                let fresh = DbEngagement::from(&Engagement::new(user_id, question_id));
                diesel::insert_into(engagements::table)
                    .values(&fresh)
                    .on_conflict((engagements::user_id, engagements::question_id))
                    .do_nothing()
                    .execute(conn)?;

                let current = engagements::table
                    .filter(engagements::user_id.eq(user_id))
                    .filter(engagements::question_id.eq(question_id))
                    .for_update()
                    .first::<DbEngagement>(conn)?;
                let mut engagement = Engagement::try_from(current)?;
                engagement.apply(fields);

                let saved = diesel::update(engagements::table.find(engagement.id))
                    .set(&DbEngagement::from(&engagement))
                    .get_result::<DbEngagement>(conn)?;
                Engagement::try_from(saved)
            })
        })
        .await
    }

    async fn get(&self, id: Uuid) -> StoreResult<Engagement> {
        self.run(move |conn| {
            engagements::table
                .find(id)
                .first::<DbEngagement>(conn)
                .optional()?
                .ok_or_else(|| StoreError::not_found("Engagement", id))
                .and_then(Engagement::try_from)
        })
        .await
    }

    async fn get_for_question(&self, user_id: Uuid, question_id: Uuid) -> StoreResult<Engagement> {
        self.run(move |conn| {
            engagements::table
                .filter(engagements::user_id.eq(user_id))
                .filter(engagements::question_id.eq(question_id))
                .first::<DbEngagement>(conn)
                .optional()?
                .ok_or_else(|| StoreError::not_found("Engagement for question", question_id))
                .and_then(Engagement::try_from)
        })
        .await
    }

    async fn get_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Engagement>> {
        let ids = ids.to_vec();
        self.run(move |conn| {
            let rows = engagements::table
                .filter(engagements::id.eq_any(ids.clone()))
                .load::<DbEngagement>(conn)?;
            let mut found: Vec<Engagement> = decode_all(rows)?;
            found.sort_by_key(|e| ids.iter().position(|id| *id == e.id));
            Ok(found)
        })
        .await
    }

    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Engagement>> {
        self.run(move |conn| {
            let rows = engagements::table
                .filter(engagements::user_id.eq(user_id))
                .order(engagements::id.asc())
                .load::<DbEngagement>(conn)?;
            decode_all(rows)
        })
        .await
    }

    async fn list_by_questions(&self, question_ids: &[Uuid]) -> StoreResult<Vec<Engagement>> {
        let ids = question_ids.to_vec();
        self.run(move |conn| {
            let rows = engagements::table
                .filter(engagements::question_id.eq_any(ids))
                .order(engagements::id.asc())
                .load::<DbEngagement>(conn)?;
            decode_all(rows)
        })
        .await
    }

    async fn update(&self, id: Uuid, fields: EngagementFields) -> StoreResult<Engagement> {
        self.run(move |conn| {
            conn.transaction(|conn| {
                let current = engagements::table
                    .find(id)
                    .for_update()
                    .first::<DbEngagement>(conn)
                    .optional()?
                    .ok_or_else(|| StoreError::not_found("Engagement", id))?;
                let mut engagement = Engagement::try_from(current)?;
                engagement.apply(fields);

                let saved = diesel::update(engagements::table.find(id))
                    .set(&DbEngagement::from(&engagement))
                    .get_result::<DbEngagement>(conn)?;
                Engagement::try_from(saved)
            })
        })
        .await
    }
}

#[async_trait]
impl QuizRepository for PgStore {
    async fn upsert_by_name(&self, quiz: Quiz) -> StoreResult<Quiz> {
        self.run(move |conn| {
            let row = DbQuiz::try_from(&quiz)?;
            let saved = diesel::insert_into(quizzes::table)
                .values(&row)
                .on_conflict((quizzes::user_id, quizzes::name))
                .do_update()
                .set((
                    quizzes::quiz_type.eq(excluded(quizzes::quiz_type)),
                    quizzes::attempt_time.eq(excluded(quizzes::attempt_time)),
                    quizzes::entries.eq(excluded(quizzes::entries)),
                ))
                .get_result::<DbQuiz>(conn)?;
            Quiz::try_from(saved)
        })
        .await
    }

    async fn get(&self, id: Uuid) -> StoreResult<Quiz> {
        self.run(move |conn| {
            quizzes::table
                .find(id)
                .first::<DbQuiz>(conn)
                .optional()?
                .ok_or_else(|| StoreError::not_found("Quiz", id))
                .and_then(Quiz::try_from)
        })
        .await
    }

    async fn get_by_name(&self, user_id: Uuid, name: &str) -> StoreResult<Quiz> {
        let name = name.to_string();
        self.run(move |conn| {
            quizzes::table
                .filter(quizzes::user_id.eq(user_id))
                .filter(quizzes::name.eq(&name))
                .first::<DbQuiz>(conn)
                .optional()?
                .ok_or_else(|| StoreError::not_found("Quiz", &name))
                .and_then(Quiz::try_from)
        })
        .await
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Quiz>> {
        self.run(move |conn| {
            let rows = quizzes::table
                .filter(quizzes::user_id.eq(user_id))
                .order((quizzes::attempt_time.desc(), quizzes::id.asc()))
                .load::<DbQuiz>(conn)?;
            decode_all(rows)
        })
        .await
    }

    async fn bind_engagement(&self, quiz_id: Uuid, entry: QuizEntry) -> StoreResult<Quiz> {
        self.run(move |conn| {
            conn.transaction(|conn| {
                let current = quizzes::table
                    .find(quiz_id)
                    .for_update()
                    .first::<DbQuiz>(conn)
                    .optional()?
                    .ok_or_else(|| StoreError::not_found("Quiz", quiz_id))?;
                let mut quiz = Quiz::try_from(current)?;

                match quiz
                    .entries
                    .iter_mut()
                    .find(|e| e.question_id == entry.question_id)
                {
                    Some(existing) => existing.engagement_id = entry.engagement_id,
                    None => quiz.entries.push(entry),
                }

                let entries = serde_json::to_value(&quiz.entries)
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                let saved = diesel::update(quizzes::table.find(quiz_id))
                    .set(quizzes::entries.eq(entries))
                    .get_result::<DbQuiz>(conn)?;
                Quiz::try_from(saved)
            })
        })
        .await
    }
}

#[async_trait]
impl TestRepository for PgStore {
    async fn insert(&self, test: PracticeTest) -> StoreResult<PracticeTest> {
        self.run(move |conn| {
            let row = DbTest {
                id: test.id,
                user_id: test.user_id,
                name: test.name.clone(),
                quiz_ids: test.quiz_ids.clone(),
                attempt_time: test.attempt_time,
                completed: test.completed,
            };
            let saved = diesel::insert_into(tests::table)
                .values(&row)
                .get_result::<DbTest>(conn)
                .map_err(|e| match StoreError::from(e) {
                    StoreError::Conflict(_) => {
                        StoreError::Conflict(format!("test named {} already exists", test.name))
                    }
                    other => other,
                })?;
            Ok(PracticeTest::from(saved))
        })
        .await
    }

    async fn get(&self, id: Uuid) -> StoreResult<PracticeTest> {
        self.run(move |conn| {
            tests::table
                .find(id)
                .first::<DbTest>(conn)
                .optional()?
                .map(PracticeTest::from)
                .ok_or_else(|| StoreError::not_found("Test", id))
        })
        .await
    }

    async fn get_by_name(&self, user_id: Uuid, name: &str) -> StoreResult<PracticeTest> {
        let name = name.to_string();
        self.run(move |conn| {
            tests::table
                .filter(tests::user_id.eq(user_id))
                .filter(tests::name.eq(&name))
                .first::<DbTest>(conn)
                .optional()?
                .map(PracticeTest::from)
                .ok_or_else(|| StoreError::not_found("Test", &name))
        })
        .await
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<PracticeTest>> {
        self.run(move |conn| {
            let rows = tests::table
                .filter(tests::user_id.eq(user_id))
                .order((tests::attempt_time.desc(), tests::id.asc()))
                .load::<DbTest>(conn)?;
            Ok(rows.into_iter().map(PracticeTest::from).collect())
        })
        .await
    }

    async fn set_completed(&self, id: Uuid, completed: bool) -> StoreResult<PracticeTest> {
        self.run(move |conn| {
            diesel::update(tests::table.find(id))
                .set(tests::completed.eq(completed))
                .get_result::<DbTest>(conn)
                .optional()?
                .map(PracticeTest::from)
                .ok_or_else(|| StoreError::not_found("Test", id))
        })
        .await
    }
}

#[async_trait]
impl DataCubeRepository for PgStore {
    async fn upsert(&self, cube: DataCube) -> StoreResult<DataCube> {
        self.run(move |conn| {
            let row = DbDataCube {
                user_id: cube.user_id,
                rows: serde_json::to_value(&cube.rows)
                    .map_err(|e| StoreError::Decode(e.to_string()))?,
                computed_at: Utc::now(),
            };
            diesel::insert_into(datacubes::table)
                .values(&row)
                .on_conflict(datacubes::user_id)
                .do_update()
                .set((
                    datacubes::rows.eq(excluded(datacubes::rows)),
                    datacubes::computed_at.eq(excluded(datacubes::computed_at)),
                ))
                .execute(conn)?;
            Ok(cube)
        })
        .await
    }

    async fn get(&self, user_id: Uuid) -> StoreResult<DataCube> {
        self.run(move |conn| {
            let row = datacubes::table
                .find(user_id)
                .first::<DbDataCube>(conn)
                .optional()?
                .ok_or_else(|| StoreError::not_found("Data cube for user", user_id))?;
            Ok(DataCube {
                user_id: row.user_id,
                rows: serde_json::from_value(row.rows)
                    .map_err(|e| StoreError::Decode(e.to_string()))?,
            })
        })
        .await
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        self.run(|conn| {
            diesel::sql_query("SELECT 1").execute(conn)?;
            Ok(())
        })
        .await
    }
}
