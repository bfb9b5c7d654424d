use crate::api::dispatch::RequestDispatcher;
use crate::api::types::{HttpMethod, LoginData};
use crate::cipher::md5_hex;
use crate::config::AccountConfig;
use crate::error::{EkiwiError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger, get_logger_with_context, redact};
use crate::persistence::{CUSTOMER_SESSION_KEY, SessionStore};
use crate::session::AuthSessionManager;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Signed login endpoint
pub const LOGIN_ENDPOINT: &str = "/login/";

/// Login credentials
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    /// Which customer of the login response to bind to
    pub customer_index: usize,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("customer_index", &self.customer_index)
            .finish()
    }
}

impl From<&AccountConfig> for Credentials {
    fn from(account: &AccountConfig) -> Self {
        Self {
            email: account.email.clone(),
            password: account.password.clone(),
            customer_index: account.customer_index,
        }
    }
}

/// Authenticated customer identity
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSession {
    pub customer_id: String,
    pub connection_id: String,
    /// Value of the `x-sid` header
    pub session_id: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for CustomerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerSession")
            .field("customer_id", &self.customer_id)
            .field("connection_id", &self.connection_id)
            .field("session_id", &redact(&self.session_id))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CustomerSession {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.customer_id.is_empty()
            && !self.connection_id.is_empty()
            && !self.session_id.is_empty()
            && self.expires_at > now
    }

    /// Bind to customer `index` of a login response
    pub fn from_login(
        login: &LoginData,
        index: usize,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self> {
        let customer = login.customer.get(index).ok_or_else(|| {
            EkiwiError::api(format!(
                "Login returned {} customer(s); index {} is out of range",
                login.customer.len(),
                index
            ))
        })?;
        let connection_id = customer
            .connection
            .first_id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                EkiwiError::api(format!("Customer {} has no connection", customer.id))
            })?;
        if customer.id.is_empty() || login.sid.is_empty() {
            return Err(EkiwiError::api("Login response missing customer id or sid"));
        }

        Ok(Self {
            customer_id: customer.id.clone(),
            connection_id: connection_id.to_string(),
            session_id: login.sid.clone(),
            expires_at: now + ttl,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct StoredCustomerSession {
    customer_id: Option<String>,
    connection_id: Option<String>,
    session_id: Option<String>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    expires_at: Option<DateTime<Utc>>,
}

impl StoredCustomerSession {
    fn into_session(self) -> Option<CustomerSession> {
        Some(CustomerSession {
            customer_id: self.customer_id?,
            connection_id: self.connection_id?,
            session_id: self.session_id?,
            expires_at: self.expires_at?,
        })
    }
}

/// Owns the customer session; logs in through a valid auth session
pub struct CustomerSessionManager {
    dispatcher: Arc<RequestDispatcher>,
    auth: Arc<AuthSessionManager>,
    store: Arc<dyn SessionStore>,
    credentials: Credentials,
    ttl: Duration,
    current: Mutex<Option<CustomerSession>>,
    logger: StructuredLogger,
}

impl CustomerSessionManager {
    pub fn new(
        dispatcher: Arc<RequestDispatcher>,
        auth: Arc<AuthSessionManager>,
        store: Arc<dyn SessionStore>,
        credentials: Credentials,
        ttl: Duration,
    ) -> Result<Self> {
        let logger = get_logger("customer_session");
        let restored =
            super::load_stored::<StoredCustomerSession>(store.as_ref(), CUSTOMER_SESSION_KEY)?
                .and_then(StoredCustomerSession::into_session);
        if let Some(s) = &restored {
            logger.debug(&format!(
                "Restored customer session for {} expiring {}",
                s.customer_id, s.expires_at
            ));
        }

        Ok(Self {
            dispatcher,
            auth,
            store,
            credentials,
            ttl,
            current: Mutex::new(restored),
            logger,
        })
    }

    /// Return a usable customer session, logging in when needed
    pub async fn get_valid(&self) -> Result<CustomerSession> {
        let mut current = self.current.lock().await;
        if let Some(session) = current.as_ref()
            && session.is_valid_at(Utc::now())
        {
            return Ok(session.clone());
        }

        let fresh = self.login().await?;
        *current = Some(fresh.clone());
        self.store.save(CUSTOMER_SESSION_KEY, serde_json::to_value(&fresh)?)?;

        get_logger_with_context(
            LogContext::new("customer_session").with_customer_id(fresh.customer_id.clone()),
        )
        .info(&format!(
            "Logged in; connection {} until {}",
            fresh.connection_id, fresh.expires_at
        ));
        Ok(fresh)
    }

    /// Drop the held and stored session so the next call logs in again
    pub async fn invalidate(&self) -> Result<()> {
        let mut current = self.current.lock().await;
        if current.take().is_some() {
            self.logger.info("Customer session invalidated");
        }
        self.store.remove(CUSTOMER_SESSION_KEY)
    }

    pub async fn peek(&self) -> Option<CustomerSession> {
        self.current.lock().await.clone()
    }

    async fn login(&self) -> Result<CustomerSession> {
        if self.credentials.email.is_empty() || self.credentials.password.is_empty() {
            return Err(EkiwiError::config("Login credentials are not configured"));
        }

        let auth = self.auth.get_valid().await?;
        self.logger.info(&format!("Logging in as {}", self.credentials.email));
        let body = json!({
            "email": self.credentials.email,
            "password": md5_hex(&self.credentials.password),
        });
        let data = self
            .dispatcher
            .call(LOGIN_ENDPOINT, Some(&auth), None, Some(body), HttpMethod::Post)
            .await?;
        let login: LoginData = crate::api::decode("login", data)?;
        CustomerSession::from_login(
            &login,
            self.credentials.customer_index,
            Utc::now(),
            self.ttl,
        )
    }
}
