use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

/// Claims issued by the accounts service. The user id travels as `_id`;
/// `sub` is accepted as a fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn subject(&self) -> Option<Uuid> {
        self.user_id
            .as_deref()
            .or(self.sub.as_deref())
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        validation.validate_aud = false;
        validation.leeway = 60;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// `None` for any token that fails to decode, verify, or name a user.
    pub fn verify(&self, token: &str) -> Option<Uuid> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims.subject(),
            Err(e) => {
                debug!("Ignoring invalid bearer token: {e}");
                None
            }
        }
    }

    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            user_id: Some(user_id.to_string()),
            sub: None,
            exp: Some((Utc::now() + ttl).timestamp()),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let verifier = TokenVerifier::new("secret");
        let user = Uuid::new_v4();
        let token = verifier.issue(user, Duration::minutes(5)).unwrap();
        assert_eq!(verifier.verify(&token), Some(user));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let user = Uuid::new_v4();
        let token = TokenVerifier::new("one")
            .issue(user, Duration::minutes(5))
            .unwrap();
        assert_eq!(TokenVerifier::new("two").verify(&token), None);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let verifier = TokenVerifier::new("secret");
        let token = verifier
            .issue(Uuid::new_v4(), Duration::hours(-2))
            .unwrap();
        assert_eq!(verifier.verify(&token), None);
    }

    #[test]
    fn test_sub_fallback() {
        let user = Uuid::new_v4();
        let claims = Claims {
            user_id: None,
            sub: Some(user.to_string()),
            exp: None,
        };
        assert_eq!(claims.subject(), Some(user));
    }
}
