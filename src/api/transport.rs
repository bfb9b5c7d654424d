use crate::api::types::HttpRequest;
use crate::error::Result;
use serde_json::Value;

/// Performs a single HTTP exchange and returns the parsed JSON body.
///
/// Implementations must bound every call with a timeout and must not retry;
/// retry policy belongs to whoever drives the polling.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<Value>;
}

#[cfg(feature = "http")]
pub use reqwest_transport::ReqwestTransport;

#[cfg(feature = "http")]
mod reqwest_transport {
    use super::*;
    use crate::api::types::HttpMethod;
    use crate::error::EkiwiError;
    use crate::logging::get_logger;
    use std::time::Duration;

    /// Production transport over a shared reqwest client
    pub struct ReqwestTransport {
        client: reqwest::Client,
        logger: crate::logging::StructuredLogger,
    }

    impl ReqwestTransport {
        pub fn new(timeout: Duration) -> Result<Self> {
            let client = reqwest::Client::builder().timeout(timeout).build()?;
            Ok(Self {
                client,
                logger: get_logger("transport"),
            })
        }
    }

    #[async_trait::async_trait]
    impl Transport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<Value> {
            let method = match request.method {
                HttpMethod::Get => reqwest::Method::GET,
                HttpMethod::Post => reqwest::Method::POST,
            };

            let mut builder = self.client.request(method, &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if request.method == HttpMethod::Post {
                builder = builder.json(request.body.as_ref().unwrap_or(&Value::Null));
            }

            let resp = builder.send().await?;
            let status = resp.status();
            let text = resp.text().await?;
            self.logger.trace(&format!(
                "{} {} -> HTTP {} ({} bytes)",
                request.method.as_str(),
                request.url,
                status,
                text.len()
            ));

            // Error envelopes arrive with non-2xx statuses too, so the body is parsed regardless
            serde_json::from_str(&text).map_err(|e| {
                EkiwiError::network(format!(
                    "Non-JSON response from {} (HTTP {}): {}",
                    request.url, status, e
                ))
            })
        }
    }
}
