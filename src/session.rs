use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{User, UserId};

/// Sessions are dropped after this long regardless of activity.
const SESSION_MAX_AGE_DAYS: i64 = 7;

/// The identity carried by a logged-in session: exactly what protected
/// routes need, nothing the store owns.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    #[serde(rename = "id")]
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

struct Session {
    user: SessionUser,
    issued_at: DateTime<Utc>,
}

/// In-memory registry of live sessions, keyed by opaque bearer token.
/// Created at login/signup, read by protected routes, removed at logout.
#[derive(Default)]
pub struct Sessions {
    inner: RwLock<HashMap<Uuid, Session>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for a freshly authenticated user.
    pub async fn create(&self, user: SessionUser) -> Uuid {
        let token = Uuid::new_v4();
        self.inner.write().await.insert(
            token,
            Session {
                user,
                issued_at: Utc::now(),
            },
        );
        token
    }

    /// Resolve a token to its identity. Expired sessions resolve to `None`
    /// exactly like unknown tokens.
    pub async fn get(&self, token: Uuid) -> Option<SessionUser> {
        let sessions = self.inner.read().await;
        let session = sessions.get(&token)?;
        if Utc::now() - session.issued_at > Duration::days(SESSION_MAX_AGE_DAYS) {
            return None;
        }
        Some(session.user.clone())
    }

    /// Remove a session. Returns whether the token was live.
    pub async fn revoke(&self, token: Uuid) -> bool {
        self.inner.write().await.remove(&token).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(name: &str) -> SessionUser {
        SessionUser {
            user_id: UserId("1".to_string()),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let sessions = Sessions::new();
        let token = sessions.create(test_user("Ada")).await;

        let user = sessions.get(token).await.unwrap();
        assert_eq!(user.name, "Ada");
        assert_eq!(user.user_id, UserId("1".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_token_resolves_to_none() {
        let sessions = Sessions::new();
        assert!(sessions.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_revoke_ends_the_session() {
        let sessions = Sessions::new();
        let token = sessions.create(test_user("Ada")).await;

        assert!(sessions.revoke(token).await);
        assert!(sessions.get(token).await.is_none());
    }

    #[tokio::test]
    async fn test_revoke_unknown_token_is_false() {
        let sessions = Sessions::new();
        assert!(!sessions.revoke(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_expired_session_resolves_to_none() {
        let sessions = Sessions::new();
        let token = Uuid::new_v4();
        sessions.inner.write().await.insert(
            token,
            Session {
                user: test_user("Ada"),
                issued_at: Utc::now() - Duration::days(SESSION_MAX_AGE_DAYS + 1),
            },
        );

        assert!(sessions.get(token).await.is_none());
    }

    #[tokio::test]
    async fn test_tokens_are_unique_per_session() {
        let sessions = Sessions::new();
        let first = sessions.create(test_user("Ada")).await;
        let second = sessions.create(test_user("Ada")).await;
        assert_ne!(first, second);
    }

    #[test]
    fn test_session_user_from_user_record() {
        let user = User {
            id: UserId("9".to_string()),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "secret".to_string(),
            history: vec![],
            bookmarks: vec![],
        };

        let session_user = SessionUser::from(&user);
        assert_eq!(session_user.user_id, UserId("9".to_string()));
        assert_eq!(session_user.email, "ada@example.com");
    }

    #[test]
    fn test_session_user_serializes_with_id_field() {
        let value = serde_json::to_value(test_user("Ada")).unwrap();
        assert_eq!(value["id"], "1");
        assert!(value.get("user_id").is_none());
    }
}
