use crate::api::dispatch::RequestDispatcher;
use crate::api::types::{BootstrapData, HttpMethod};
use crate::error::{EkiwiError, Result};
use crate::logging::{StructuredLogger, get_logger, redact};
use crate::persistence::{AUTH_SESSION_KEY, SessionStore};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Unauthenticated bootstrap endpoint issuing the transport token
pub const BOOTSTRAP_ENDPOINT: &str = "/at/";

/// Transport-level credential obtained from the bootstrap endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Raw token as issued
    pub token: String,
    /// Signing secret; `token` without its two-character prefix and suffix
    pub secret: String,
    /// Where the key length is spliced into each signed token
    pub secret_position: usize,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &redact(&self.token))
            .field("secret", &redact(&self.secret))
            .field("secret_position", &self.secret_position)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AuthSession {
    /// Split a bootstrap token into position prefix and secret
    pub fn from_bootstrap_token(token: &str, now: DateTime<Utc>, ttl: Duration) -> Result<Self> {
        let token = token.trim();
        if token.len() < 5 || !token.is_ascii() {
            return Err(EkiwiError::auth(format!(
                "Bootstrap token has unexpected shape ({} chars)",
                token.len()
            )));
        }

        let prefix = &token[..2];
        let secret_position = prefix.parse::<usize>().map_err(|_| {
            EkiwiError::auth(format!("Bootstrap token prefix '{}' is not a number", prefix))
        })?;

        Ok(Self {
            token: token.to_string(),
            secret: token[2..token.len() - 2].to_string(),
            secret_position,
            expires_at: now + ttl,
        })
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.secret.is_empty() && self.expires_at > now
    }
}

/// Persisted form; any missing field makes the record unusable
#[derive(Debug, Default, Deserialize)]
struct StoredAuthSession {
    token: Option<String>,
    secret: Option<String>,
    secret_position: Option<usize>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    expires_at: Option<DateTime<Utc>>,
}

impl StoredAuthSession {
    fn into_session(self) -> Option<AuthSession> {
        Some(AuthSession {
            token: self.token?,
            secret: self.secret?,
            secret_position: self.secret_position?,
            expires_at: self.expires_at?,
        })
    }
}

/// Owns the auth session and its refresh cycle
pub struct AuthSessionManager {
    dispatcher: Arc<RequestDispatcher>,
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    current: Mutex<Option<AuthSession>>,
    refreshes: AtomicU64,
    logger: StructuredLogger,
}

impl AuthSessionManager {
    /// Create the manager, restoring any record from the store
    pub fn new(
        dispatcher: Arc<RequestDispatcher>,
        store: Arc<dyn SessionStore>,
        ttl: Duration,
    ) -> Result<Self> {
        let logger = get_logger("auth_session");
        let restored = super::load_stored::<StoredAuthSession>(store.as_ref(), AUTH_SESSION_KEY)?
            .and_then(StoredAuthSession::into_session);
        match &restored {
            Some(s) => logger.debug(&format!("Restored auth session expiring {}", s.expires_at)),
            None => logger.debug("No stored auth session"),
        }

        Ok(Self {
            dispatcher,
            store,
            ttl,
            current: Mutex::new(restored),
            refreshes: AtomicU64::new(0),
            logger,
        })
    }

    /// Return a usable session, bootstrapping a new one when needed.
    ///
    /// The lock is held across the bootstrap so concurrent callers share a
    /// single refresh.
    pub async fn get_valid(&self) -> Result<AuthSession> {
        let mut current = self.current.lock().await;
        if let Some(session) = current.as_ref()
            && session.is_valid_at(Utc::now())
        {
            return Ok(session.clone());
        }

        self.logger.info("Auth session missing or expired; bootstrapping");
        let fresh = self.bootstrap().await?;
        *current = Some(fresh.clone());
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        self.store.save(AUTH_SESSION_KEY, serde_json::to_value(&fresh)?)?;
        self.logger.debug(&format!(
            "Auth session refreshed; expires {}",
            fresh.expires_at
        ));
        Ok(fresh)
    }

    /// Signed `x-token` value for `endpoint` under the current session
    pub async fn sign_header(&self, endpoint: &str) -> Result<String> {
        let session = self.get_valid().await?;
        self.dispatcher.signer().sign(&session, endpoint)
    }

    /// Forget the session, in memory and in the store, so the next call
    /// bootstraps again
    pub async fn invalidate(&self) -> Result<()> {
        let mut current = self.current.lock().await;
        if current.take().is_some() {
            self.logger.info("Auth session invalidated");
        }
        self.store.remove(AUTH_SESSION_KEY)
    }

    /// Snapshot of the held session without refreshing
    pub async fn peek(&self) -> Option<AuthSession> {
        self.current.lock().await.clone()
    }

    /// Number of bootstraps performed by this manager
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    async fn bootstrap(&self) -> Result<AuthSession> {
        let data = self
            .dispatcher
            .call(BOOTSTRAP_ENDPOINT, None, None, None, HttpMethod::Get)
            .await?;
        let parsed: BootstrapData = crate::api::decode("bootstrap", data)?;
        AuthSession::from_bootstrap_token(&parsed.token, Utc::now(), self.ttl)
    }
}
