pub mod handlers;
pub mod types;

use chrono::Utc;
use log::debug;
use uuid::Uuid;

use crate::shared::error::ApiError;
use crate::store::Repositories;

pub use handlers::configure_engagement_routes;
use types::{Engagement, EngagementFields, LogEngagementRequest};

/// An answer without a timestamp is stamped with the time it was logged.
fn stamp(mut fields: EngagementFields) -> EngagementFields {
    if fields.attempt_time.is_none() && fields.status.is_some_and(|s| s.is_answered()) {
        fields.attempt_time = Some(Utc::now());
    }
    fields
}

pub async fn log_engagement(
    repos: &Repositories,
    user_id: Uuid,
    request: LogEngagementRequest,
) -> Result<Engagement, ApiError> {
    let engagement = repos
        .engagements
        .upsert(user_id, request.question_id, stamp(request.fields))
        .await?;
    debug!(
        "Logged engagement {} ({}) for question {}",
        engagement.id, engagement.status, engagement.question_id
    );
    Ok(engagement)
}

/// Outcome of a batch log. Items are written one by one and a failure
/// stops the batch; `ids` holds what was written before it.
#[derive(Debug)]
pub struct BatchLog {
    pub ids: Vec<Uuid>,
    pub failure: Option<ApiError>,
}

pub async fn log_engagements(
    repos: &Repositories,
    user_id: Uuid,
    requests: Vec<LogEngagementRequest>,
) -> BatchLog {
    let mut ids = Vec::with_capacity(requests.len());
    for request in requests {
        match log_engagement(repos, user_id, request).await {
            Ok(engagement) => ids.push(engagement.id),
            Err(e) => {
                return BatchLog {
                    ids,
                    failure: Some(e),
                }
            }
        }
    }
    BatchLog { ids, failure: None }
}

/// Partial update of an engagement the caller owns.
pub async fn update_engagement(
    repos: &Repositories,
    user_id: Uuid,
    engagement_id: Uuid,
    fields: EngagementFields,
) -> Result<Engagement, ApiError> {
    let existing = repos.engagements.get(engagement_id).await?;
    if existing.user_id != user_id {
        return Err(ApiError::NotFound(format!("Engagement {engagement_id}")));
    }
    Ok(repos.engagements.update(engagement_id, stamp(fields)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EngagementRepository, StoreError, StoreResult};
    use async_trait::async_trait;
    use std::sync::Arc;
    use types::EngagementStatus;

    #[tokio::test]
    async fn test_log_twice_keeps_identity() {
        let repos = Repositories::in_memory();
        let (user, question) = (Uuid::new_v4(), Uuid::new_v4());
        let request = |status| LogEngagementRequest {
            question_id: question,
            fields: EngagementFields {
                status: Some(status),
                ..Default::default()
            },
        };

        let first = log_engagement(&repos, user, request(EngagementStatus::Incorrect))
            .await
            .unwrap();
        let second = log_engagement(&repos, user, request(EngagementStatus::Correct))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, EngagementStatus::Correct);
        assert!(first.first_attempt_time.is_some());
        assert_eq!(first.first_attempt_time, second.first_attempt_time);
    }

    #[tokio::test]
    async fn test_update_requires_owner() {
        let repos = Repositories::in_memory();
        let owner = Uuid::new_v4();
        let engagement = repos
            .engagements
            .upsert(owner, Uuid::new_v4(), EngagementFields::default())
            .await
            .unwrap();

        let err = update_engagement(&repos, Uuid::new_v4(), engagement.id, EngagementFields::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let flagged = update_engagement(
            &repos,
            owner,
            engagement.id,
            EngagementFields {
                flagged: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(flagged.flagged);
    }

    /// Delegates to the in-memory store but refuses upserts for one question.
    struct RejectingEngagements {
        inner: Arc<dyn EngagementRepository>,
        rejected: Uuid,
    }

    #[async_trait]
    impl EngagementRepository for RejectingEngagements {
        async fn upsert(
            &self,
            user_id: Uuid,
            question_id: Uuid,
            fields: EngagementFields,
        ) -> StoreResult<Engagement> {
            if question_id == self.rejected {
                return Err(StoreError::Unavailable("connection reset".into()));
            }
            self.inner.upsert(user_id, question_id, fields).await
        }
        async fn get(&self, id: Uuid) -> StoreResult<Engagement> {
            self.inner.get(id).await
        }
        async fn get_for_question(&self, user_id: Uuid, question_id: Uuid) -> StoreResult<Engagement> {
            self.inner.get_for_question(user_id, question_id).await
        }
        async fn get_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Engagement>> {
            self.inner.get_many(ids).await
        }
        async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Engagement>> {
            self.inner.list_by_user(user_id).await
        }
        async fn list_by_questions(&self, question_ids: &[Uuid]) -> StoreResult<Vec<Engagement>> {
            self.inner.list_by_questions(question_ids).await
        }
        async fn update(&self, id: Uuid, fields: EngagementFields) -> StoreResult<Engagement> {
            self.inner.update(id, fields).await
        }
    }

    fn omitted(question_id: Uuid) -> LogEngagementRequest {
        LogEngagementRequest {
            question_id,
            fields: EngagementFields {
                status: Some(EngagementStatus::Omitted),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_batch_reports_ids_written_before_failure() {
        let rejected = Uuid::new_v4();
        let mut repos = Repositories::in_memory();
        repos.engagements = Arc::new(RejectingEngagements {
            inner: repos.engagements.clone(),
            rejected,
        });
        let user = Uuid::new_v4();

        let batch = log_engagements(
            &repos,
            user,
            vec![omitted(Uuid::new_v4()), omitted(rejected), omitted(Uuid::new_v4())],
        )
        .await;

        assert_eq!(batch.ids.len(), 1);
        assert!(matches!(batch.failure, Some(ApiError::Query(_))));
        let stored = repos.engagements.list_by_user(user).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, batch.ids[0]);
    }

    #[tokio::test]
    async fn test_batch_writes_everything_when_nothing_fails() {
        let repos = Repositories::in_memory();
        let user = Uuid::new_v4();
        let batch = log_engagements(&repos, user, vec![omitted(Uuid::new_v4()), omitted(Uuid::new_v4())]).await;
        assert!(batch.failure.is_none());
        assert_eq!(batch.ids.len(), 2);
    }
}
