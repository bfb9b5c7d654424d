use crate::api::dispatch::RequestDispatcher;
use crate::api::transport::Transport;
use crate::api::types::HttpMethod;
use crate::cipher::TokenCipher;
use crate::config::Config;
use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};
use crate::persistence::SessionStore;
use crate::session::customer::LOGIN_ENDPOINT;
use crate::session::{
    AuthSession, AuthSessionManager, Credentials, CustomerSession, CustomerSessionManager,
};
use chrono::Duration;
use serde_json::Value;
use std::sync::Arc;

/// Authenticated entry point for every provider call.
///
/// Ensures both sessions are valid, signs the request and unwraps the
/// response. A login-required error clears both sessions and is returned
/// to the caller; the next call starts from a fresh bootstrap.
pub struct ApiClient {
    dispatcher: Arc<RequestDispatcher>,
    auth: Arc<AuthSessionManager>,
    customer: Arc<CustomerSessionManager>,
    logger: StructuredLogger,
}

impl ApiClient {
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        store: Arc<dyn SessionStore>,
        cipher: Arc<dyn TokenCipher>,
    ) -> Result<Self> {
        let dispatcher = Arc::new(RequestDispatcher::new(&config.api, transport, cipher));
        let auth = Arc::new(AuthSessionManager::new(
            dispatcher.clone(),
            store.clone(),
            Duration::minutes(i64::from(config.session.auth_ttl_minutes)),
        )?);
        let customer = Arc::new(CustomerSessionManager::new(
            dispatcher.clone(),
            auth.clone(),
            store,
            Credentials::from(&config.account),
            Duration::minutes(i64::from(config.session.customer_ttl_minutes)),
        )?);

        Ok(Self {
            dispatcher,
            auth,
            customer,
            logger: get_logger("api_client"),
        })
    }

    /// Production wiring: reqwest transport, file store, CryptoJS cipher
    #[cfg(feature = "http")]
    pub fn from_config(config: &Config) -> Result<Self> {
        use crate::api::transport::ReqwestTransport;
        use crate::cipher::CryptoJsCipher;
        use crate::persistence::FileSessionStore;

        let transport = ReqwestTransport::new(std::time::Duration::from_secs(
            config.api.timeout_seconds,
        ))?;
        Self::new(
            config,
            Arc::new(transport),
            Arc::new(FileSessionStore::new(&config.session.store_path)),
            Arc::new(CryptoJsCipher::new()),
        )
    }

    /// Perform an authenticated call and return the envelope's `data`.
    ///
    /// A login-required error from the login itself or from the call
    /// clears both sessions before it is returned.
    pub async fn request(
        &self,
        endpoint: &str,
        params: Option<Value>,
        method: HttpMethod,
    ) -> Result<Value> {
        let result = self.dispatch(endpoint, params, method).await;
        self.clear_on_login_required(endpoint, result).await
    }

    async fn dispatch(
        &self,
        endpoint: &str,
        params: Option<Value>,
        method: HttpMethod,
    ) -> Result<Value> {
        let auth = self.auth.get_valid().await?;
        let customer = self.customer.get_valid().await?;
        self.dispatcher
            .call(endpoint, Some(&auth), Some(&customer), params, method)
            .await
    }

    async fn clear_on_login_required<T>(&self, endpoint: &str, result: Result<T>) -> Result<T> {
        match result {
            Err(e) if e.is_login_required() => {
                self.logger.warn(&format!("Login required on {}; clearing sessions", endpoint));
                // Store failures are logged; the remote error is what gets returned
                if let Err(store_err) = self.customer.invalidate().await {
                    self.logger.error(&format!("Failed to clear customer session: {}", store_err));
                }
                if let Err(store_err) = self.auth.invalidate().await {
                    self.logger.error(&format!("Failed to clear auth session: {}", store_err));
                }
                Err(e)
            }
            other => other,
        }
    }

    pub async fn get(&self, endpoint: &str) -> Result<Value> {
        self.request(endpoint, None, HttpMethod::Get).await
    }

    pub async fn post(&self, endpoint: &str, params: Value) -> Result<Value> {
        self.request(endpoint, Some(params), HttpMethod::Post).await
    }

    /// Current customer session, logging in when needed
    pub async fn customer(&self) -> Result<CustomerSession> {
        let result = self.customer.get_valid().await;
        self.clear_on_login_required(LOGIN_ENDPOINT, result).await
    }

    /// Current auth session, bootstrapping when needed
    pub async fn auth_session(&self) -> Result<AuthSession> {
        self.auth.get_valid().await
    }

    pub fn auth_manager(&self) -> &AuthSessionManager {
        &self.auth
    }

    pub fn customer_manager(&self) -> &CustomerSessionManager {
        &self.customer
    }
}
