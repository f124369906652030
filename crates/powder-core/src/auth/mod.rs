//! Authentication boundary.
//!
//! The sync engine only sees a [`SessionContext`]: whether someone is signed
//! in and which group they write to. Sessions are issued by Supabase GoTrue
//! and kept between launches in the same key-value store as the catalog.

mod session;

pub use session::{SessionContext, SessionHandle};

use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::cache::KeyValueStore;
use crate::remote::Scope;
use crate::util::{api_error_message, normalize_base_url, unix_timestamp_now};

/// Storage key of the persisted session
pub const SESSION_KEY: &str = "powderfiles_session_v1";

const EXPIRY_SKEW_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Session storage error: {0}")]
    Storage(#[from] crate::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Token endpoint client: password sign-in and refresh.
#[derive(Clone)]
pub struct SupabaseAuthClient {
    token_url: String,
    anon_key: String,
    client: Client,
}

impl SupabaseAuthClient {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>) -> AuthResult<Self> {
        let base = normalize_base_url(url.as_ref(), "Supabase URL")
            .map_err(AuthError::InvalidConfiguration)?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Supabase anon key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            token_url: format!("{base}/auth/v1/token"),
            anon_key,
            client: Client::new(),
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Api("Email and password are required".to_string()));
        }
        self.grant("password", json!({ "email": email, "password": password }))
            .await
    }

    pub async fn refresh(&self, session: &AuthSession) -> AuthResult<AuthSession> {
        self.grant(
            "refresh_token",
            json!({ "refresh_token": session.refresh_token }),
        )
        .await
    }

    async fn grant(&self, grant_type: &str, body: Value) -> AuthResult<AuthSession> {
        let response = self
            .client
            .post(&self.token_url)
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(api_error_message(status.as_u16(), &body)));
        }
        response
            .json::<TokenGrant>()
            .await?
            .into_session(unix_timestamp_now())
    }
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: AuthUser,
}

impl TokenGrant {
    fn into_session(self, now: i64) -> AuthResult<AuthSession> {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|seconds| now.saturating_add(seconds)))
            .ok_or_else(|| AuthError::Api("token response has no expiry".to_string()))?;

        Ok(AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        })
    }
}

/// Keeps the signed-in session across launches and turns it into the
/// [`SessionContext`] the engine runs under.
#[derive(Debug)]
pub struct SessionPersistence<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> SessionPersistence<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Persisted session, if a readable one exists.
    pub fn load(&self) -> Option<AuthSession> {
        let raw = match self.store.get(SESSION_KEY) {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!("Failed to read persisted session: {}", error);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(error) => {
                tracing::warn!("Ignoring unreadable persisted session: {}", error);
                None
            }
        }
    }

    /// Persist a fresh session for `scope`.
    pub fn remember(&self, session: AuthSession, scope: Option<Scope>) -> AuthResult<SessionContext> {
        let raw = serde_json::to_string(&session).map_err(crate::Error::from)?;
        self.store.set(SESSION_KEY, &raw)?;
        tracing::info!("Signed in as {}", session.user.id);
        Ok(SessionContext::signed_in(session, scope))
    }

    /// Drop the persisted session.
    pub fn forget(&self) -> AuthResult<SessionContext> {
        self.store.remove(SESSION_KEY)?;
        tracing::info!("Signed out");
        Ok(SessionContext::signed_out())
    }

    /// Context to start with on launch.
    ///
    /// An expired session is refreshed; one that cannot be refreshed is
    /// forgotten and the app starts signed out.
    pub async fn resume(
        &self,
        client: &SupabaseAuthClient,
        scope: Option<Scope>,
    ) -> AuthResult<SessionContext> {
        let Some(session) = self.load() else {
            return Ok(SessionContext::signed_out());
        };
        if !session.is_expired() {
            return Ok(SessionContext::signed_in(session, scope));
        }

        match client.refresh(&session).await {
            Ok(refreshed) => self.remember(refreshed, scope),
            Err(error) => {
                tracing::warn!("Persisted session could not be refreshed: {}", error);
                self.forget()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use pretty_assertions::assert_eq;

    fn session(expires_at: i64) -> AuthSession {
        AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at,
            user: AuthUser {
                id: "user-1".to_string(),
                email: None,
            },
        }
    }

    fn unreachable_client() -> SupabaseAuthClient {
        SupabaseAuthClient::new("http://127.0.0.1:9", "anon").unwrap()
    }

    #[test]
    fn client_rejects_blank_anon_key() {
        let result = SupabaseAuthClient::new("https://demo.supabase.co", "  ");
        assert!(matches!(result, Err(AuthError::InvalidConfiguration(_))));
    }

    #[test]
    fn client_targets_token_endpoint() {
        let client = SupabaseAuthClient::new("https://demo.supabase.co/", "anon").unwrap();
        assert_eq!(client.token_url, "https://demo.supabase.co/auth/v1/token");
    }

    #[test]
    fn token_grant_derives_expiry_from_expires_in() {
        let grant: TokenGrant = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"token_type":"bearer","user":{"id":"u","email":"u@example.com"}}"#,
        )
        .unwrap();
        let session = grant.into_session(1_000).unwrap();
        assert_eq!(session.expires_at, 4_600);
        assert_eq!(session.user.email.as_deref(), Some("u@example.com"));
    }

    #[test]
    fn token_grant_without_expiry_is_an_error() {
        let grant: TokenGrant =
            serde_json::from_str(r#"{"access_token":"a","refresh_token":"r","user":{"id":"u"}}"#)
                .unwrap();
        assert!(matches!(grant.into_session(0), Err(AuthError::Api(_))));
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let rendered = format!("{:?}", session(0));
        assert!(!rendered.contains("secret-access-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn remembered_session_survives_reload() {
        let persistence = SessionPersistence::new(MemoryStore::default());
        let stored = session(i64::MAX);

        let context = persistence
            .remember(stored.clone(), Scope::new("crew"))
            .unwrap();
        assert!(context.is_remote_enabled());
        assert_eq!(persistence.load(), Some(stored));

        assert_eq!(persistence.forget().unwrap(), SessionContext::signed_out());
        assert_eq!(persistence.load(), None);
    }

    #[test]
    fn unreadable_session_counts_as_absent() {
        let store = MemoryStore::default();
        store.set(SESSION_KEY, "{\"access_token\":").unwrap();
        assert_eq!(SessionPersistence::new(store).load(), None);
    }

    #[tokio::test]
    async fn resume_uses_unexpired_session_without_refresh() {
        let persistence = SessionPersistence::new(MemoryStore::default());
        persistence
            .remember(session(i64::MAX), Scope::new("crew"))
            .unwrap();

        let context = persistence
            .resume(&unreachable_client(), Scope::new("crew"))
            .await
            .unwrap();

        assert!(context.is_remote_enabled());
        assert_eq!(context.remote_scope().map(Scope::as_str), Some("crew"));
    }

    #[tokio::test]
    async fn resume_without_session_starts_signed_out() {
        let persistence = SessionPersistence::new(MemoryStore::default());
        let context = persistence
            .resume(&unreachable_client(), Scope::new("crew"))
            .await
            .unwrap();
        assert_eq!(context, SessionContext::signed_out());
    }

    #[tokio::test]
    async fn resume_forgets_session_that_cannot_refresh() {
        let persistence = SessionPersistence::new(MemoryStore::default());
        persistence.remember(session(0), None).unwrap();

        let context = persistence
            .resume(&unreachable_client(), Scope::new("crew"))
            .await
            .unwrap();

        assert_eq!(context, SessionContext::signed_out());
        assert_eq!(persistence.load(), None);
    }
}
