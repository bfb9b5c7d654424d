//! Credential lifecycle for the provider API
//!
//! Two time-boxed credentials are kept: the transport auth session that
//! supplies the request-signing secret, and the customer session created by
//! a signed login. Each is owned by its manager, refreshed on expiry under a
//! per-credential async mutex, and written through the session store.

pub mod auth;
pub mod customer;
pub mod signer;

pub use auth::{AuthSession, AuthSessionManager};
pub use customer::{Credentials, CustomerSession, CustomerSessionManager};
pub use signer::TokenSigner;

use crate::error::{EkiwiError, Result};
use crate::persistence::SessionStore;
use serde::de::DeserializeOwned;

/// Read a stored record, rejecting blobs that are not JSON objects or have
/// wrongly typed fields
pub(crate) fn load_stored<T: DeserializeOwned>(
    store: &dyn SessionStore,
    key: &str,
) -> Result<Option<T>> {
    let Some(value) = store.load(key)? else {
        return Ok(None);
    };
    // Older installs kept the record as a JSON document inside a string
    let value = match value {
        serde_json::Value::String(s) => serde_json::from_str(&s).map_err(|e| {
            EkiwiError::config(format!("Stored record '{}' is not valid JSON: {}", key, e))
        })?,
        other => other,
    };
    if !value.is_object() {
        return Err(EkiwiError::config(format!(
            "Stored record '{}' is not a JSON object",
            key
        )));
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| EkiwiError::config(format!("Stored record '{}' is malformed: {}", key, e)))
}
