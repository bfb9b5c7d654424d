#![allow(dead_code)]

use ekiwi::api::{HttpMethod, HttpRequest, Transport};
use ekiwi::cipher::TokenCipher;
use ekiwi::config::Config;
use ekiwi::error::Result;
use serde_json::{Value, json};
use std::sync::Mutex;
use std::time::Duration;

pub const BASE_URL: &str = "https://api.test";

/// Bootstrap token: position 4, secret ABCDEFGHIJKLMNOP
pub const BOOTSTRAP_TOKEN: &str = "04ABCDEFGHIJKLMNOPzz";
pub const SECRET: &str = "ABCDEFGHIJKLMNOP";
pub const CUSTOMER_ID: &str = "1234";
pub const CONNECTION_ID: &str = "5678";
pub const SID: &str = "SID-1";

type Handler = Box<dyn Fn(&HttpRequest) -> Value + Send + Sync>;

/// In-process transport answering from a closure and recording every request
pub struct FakeTransport {
    handler: Handler,
    delay: Option<Duration>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> Value + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Transport answering with [`provider`] only
    pub fn provider() -> Self {
        Self::new(provider)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose path starts with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| path(r).starts_with(prefix))
            .count()
    }

    pub fn last(&self, prefix: &str) -> Option<HttpRequest> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| path(r).starts_with(prefix))
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok((self.handler)(&request))
    }
}

/// Path and query of a recorded request
pub fn path(request: &HttpRequest) -> &str {
    request.url.strip_prefix(BASE_URL).unwrap_or(&request.url)
}

/// Happy-path answers for every endpoint the crate calls
pub fn provider(request: &HttpRequest) -> Value {
    let p = path(request);
    if p == "/at/" {
        return json!({"data": {"token": BOOTSTRAP_TOKEN}});
    }
    if p == "/login/" {
        return json!({"data": {
            "customer": [{"id": 1234, "connection": {"id": 5678}}],
            "sid": SID
        }});
    }
    if p.starts_with("/hop/") {
        return match request.method {
            HttpMethod::Get => json!({"data": {"start": {"interval": "14"}}}),
            HttpMethod::Post => json!({"data": {}}),
        };
    }
    if p.starts_with("/consumption/averages/") {
        return json!({"data": {"usage": {
            "2024-03-03": {"percent_consumption_adjustment": "10"},
            "2024-03-04": {"percent_consumption_adjustment": 12.5},
            "2024-03-05": {"percent_consumption_adjustment": "7.5"},
            "2024-03-06": {"percent_consumption_adjustment": 10},
            "2024-03-07": {"percent_consumption_adjustment": "15"},
            "2024-03-08": {"percent_consumption_adjustment": 5},
            "2024-03-09": {"percent_consumption_adjustment": "10"}
        }}});
    }
    if p.starts_with("/connection/details/") {
        return json!({"data": {"id": CONNECTION_ID, "pricing_plan": {"name": "MoveMaster"}}});
    }
    if p.starts_with("/account/running_balance/") {
        return json!({"data": {"total_running_balance": "42.17"}});
    }
    json!({"error": {"code": 404, "title": "Not Found", "detail": p}})
}

/// Deterministic cipher returning a fixed digit-free ciphertext
#[derive(Default)]
pub struct FixedCipher {
    pub keys: Mutex<Vec<Vec<u8>>>,
    pub payloads: Mutex<Vec<String>>,
}

impl FixedCipher {
    pub const OUTPUT: &'static str = "CIPHERTEXT";
}

impl TokenCipher for FixedCipher {
    fn encrypt(&self, payload: &[u8], key: &[u8]) -> Result<String> {
        if key.is_empty() {
            return Err(ekiwi::EkiwiError::cipher("empty key"));
        }
        self.keys.lock().unwrap().push(key.to_vec());
        self.payloads
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(payload).into_owned());
        Ok(Self::OUTPUT.to_string())
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.api.base_url = BASE_URL.to_string();
    config.account.email = "someone@example.com".to_string();
    config.account.password = "password".to_string();
    config
}

/// Stored auth record valid for another hour
pub fn stored_auth() -> Value {
    json!({
        "token": BOOTSTRAP_TOKEN,
        "secret": SECRET,
        "secret_position": 4,
        "expires_at": (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp()
    })
}

/// Stored customer record valid for another hour
pub fn stored_customer() -> Value {
    json!({
        "customer_id": CUSTOMER_ID,
        "connection_id": CONNECTION_ID,
        "session_id": SID,
        "expires_at": (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp()
    })
}
