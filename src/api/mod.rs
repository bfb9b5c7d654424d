//! Provider API plumbing: wire types, transport seam, request dispatch and
//! the session-aware client

pub mod client;
pub mod dispatch;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use dispatch::RequestDispatcher;
pub use transport::Transport;
#[cfg(feature = "http")]
pub use transport::ReqwestTransport;
pub use types::{HttpMethod, HttpRequest};

use crate::error::{EkiwiError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode an envelope payload, reporting shape mismatches as API errors
pub(crate) fn decode<T: DeserializeOwned>(what: &str, data: Value) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| EkiwiError::api(format!("Unexpected {} payload: {}", what, e)))
}
