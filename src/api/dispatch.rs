use crate::api::transport::Transport;
use crate::api::types::{Envelope, HttpMethod, HttpRequest};
use crate::cipher::TokenCipher;
use crate::config::ApiConfig;
use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};
use crate::session::{AuthSession, CustomerSession, TokenSigner};
use serde_json::Value;
use std::sync::Arc;

/// Builds headers and URLs for provider calls and unwraps the response
/// envelope. Holds no credential state of its own.
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
    signer: TokenSigner,
    base_url: String,
    static_headers: Vec<(String, String)>,
    logger: StructuredLogger,
}

impl RequestDispatcher {
    pub fn new(
        api: &ApiConfig,
        transport: Arc<dyn Transport>,
        cipher: Arc<dyn TokenCipher>,
    ) -> Self {
        let static_headers = vec![
            ("x-client".to_string(), api.client_id.clone()),
            ("x-apiversion".to_string(), api.api_version.clone()),
            ("user-agent".to_string(), api.user_agent.clone()),
            ("X-Requested-With".to_string(), api.requested_with.clone()),
        ];
        Self {
            transport,
            signer: TokenSigner::new(cipher),
            base_url: api.base_url.trim_end_matches('/').to_string(),
            static_headers,
            logger: get_logger("dispatch"),
        }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Assemble the outbound request.
    ///
    /// `x-token` is signed per call whenever the auth session carries a
    /// secret; `x-sid` is attached when a customer session is given.
    pub fn build_request(
        &self,
        endpoint: &str,
        auth: Option<&AuthSession>,
        customer: Option<&CustomerSession>,
        params: Option<Value>,
        method: HttpMethod,
    ) -> Result<HttpRequest> {
        let mut headers = self.static_headers.clone();

        if let Some(session) = auth
            && !session.secret.is_empty()
        {
            headers.push(("x-token".to_string(), self.signer.sign(session, endpoint)?));
        }
        if let Some(customer) = customer
            && !customer.session_id.is_empty()
        {
            headers.push(("x-sid".to_string(), customer.session_id.clone()));
        }

        let body = match method {
            HttpMethod::Post => Some(params.unwrap_or_else(|| Value::Object(Default::default()))),
            HttpMethod::Get => None,
        };

        Ok(HttpRequest {
            method,
            url: format!("{}{}", self.base_url, endpoint),
            headers,
            body,
        })
    }

    /// Perform one call and return the envelope's `data`
    pub async fn call(
        &self,
        endpoint: &str,
        auth: Option<&AuthSession>,
        customer: Option<&CustomerSession>,
        params: Option<Value>,
        method: HttpMethod,
    ) -> Result<Value> {
        let request = self.build_request(endpoint, auth, customer, params, method)?;
        self.logger.debug(&format!("{} {}", method.as_str(), endpoint));

        let body = self.transport.send(request).await?;
        let result = Envelope::from_value(body)?.into_data();
        if let Err(e) = &result
            && let Some(remote) = e.remote()
        {
            self.logger.warn(&format!(
                "{} {} failed: {} {} ({})",
                method.as_str(),
                endpoint,
                remote.code,
                remote.title,
                remote.detail
            ));
        }
        result
    }
}
