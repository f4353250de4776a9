//! Bearer-token authentication.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use civic_shared::UserId;

use crate::db::Db;
use crate::error::ServerError;

/// The user a request is signed in as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

impl AuthUser {
    /// Resolve the acting user for a request body that may carry its own
    /// `user_id`.  A mismatching id is refused; an absent one means the
    /// session user.
    pub fn acting_as(&self, claimed: Option<UserId>) -> Result<UserId, ServerError> {
        match claimed {
            Some(id) if id != self.0 => Err(ServerError::Authorization(
                "user_id does not match the signed-in user".into(),
            )),
            _ => Ok(self.0),
        }
    }
}

/// The raw bearer token of a request, for acting on the session itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Db: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let SessionToken(token) = SessionToken::from_request_parts(parts, state).await?;

        let db = Db::from_ref(state);
        let user = db.run(move |db| Ok(db.session_user(&token)?)).await?;

        match user {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => {
                tracing::debug!("rejected unknown session token");
                Err(ServerError::Authentication("Session is invalid or expired".into()))
            }
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_token(parts)
            .map(|token| SessionToken(token.to_string()))
            .ok_or_else(|| ServerError::Authentication("You need to be signed in".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acting_as() {
        let me = UserId::new();
        let auth = AuthUser(me);
        assert_eq!(auth.acting_as(None).unwrap(), me);
        assert_eq!(auth.acting_as(Some(me)).unwrap(), me);
        assert!(matches!(
            auth.acting_as(Some(UserId::new())),
            Err(ServerError::Authorization(_))
        ));
    }

    #[test]
    fn test_bearer_parsing() {
        let req = axum::http::Request::builder()
            .header(AUTHORIZATION, "Bearer abc123")
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();
        assert_eq!(bearer_token(&parts), Some("abc123"));

        let req = axum::http::Request::builder()
            .header(AUTHORIZATION, "Basic abc123")
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();
        assert_eq!(bearer_token(&parts), None);
    }
}
