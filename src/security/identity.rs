use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::ApiError;
use crate::shared::state::AppState;

/// Who is asking. Anonymous callers are keyed by the all-zero id, since
/// several joins match on the identity value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    Anonymous,
    User(Uuid),
}

impl Identity {
    pub const ANONYMOUS_ID: Uuid = Uuid::nil();

    pub fn from_user_id(user_id: Option<Uuid>) -> Self {
        match user_id {
            Some(id) if !id.is_nil() => Self::User(id),
            _ => Self::Anonymous,
        }
    }

    pub fn key(&self) -> Uuid {
        match self {
            Self::Anonymous => Self::ANONYMOUS_ID,
            Self::User(id) => *id,
        }
    }

    pub fn require_user(&self) -> Result<Uuid, ApiError> {
        match self {
            Self::User(id) => Ok(*id),
            Self::Anonymous => Err(ApiError::not_logged_in()),
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = bearer_token(parts).and_then(|token| state.tokens.verify(token));
        Ok(Identity::from_user_id(user_id))
    }
}
