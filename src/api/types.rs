use crate::error::{EkiwiError, RemoteApiError, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// HTTP verbs used by the provider API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// One outbound request as handed to a [`crate::api::Transport`]
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL including any query string
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// JSON body; only sent for POST
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// `{"data": ...}` / `{"error": {...}}` wrapper around every response
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

/// Body of an error envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub code: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub detail: String,
}

impl Envelope {
    /// Decode a raw response body
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(EkiwiError::api(format!(
                "Response is not an envelope object: {}",
                value
            )));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Absence of `error` means success; a bare ack yields `Value::Null`
    pub fn into_data(self) -> Result<Value> {
        match self.error {
            Some(err) => Err(RemoteApiError::new(err.code, err.title, err.detail).into()),
            None => Ok(self.data.unwrap_or(Value::Null)),
        }
    }
}

/// `GET /at/` payload
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapData {
    pub token: String,
}

/// `POST /login/` payload
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub customer: Vec<LoginCustomer>,
    #[serde(deserialize_with = "lenient_string")]
    pub sid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginCustomer {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    pub connection: ConnectionRef,
}

/// Connection reference; seen both as a single object and as a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConnectionRef {
    One(Connection),
    Many(Vec<Connection>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Connection {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
}

impl ConnectionRef {
    /// First connection id, if any
    pub fn first_id(&self) -> Option<&str> {
        match self {
            Self::One(c) => Some(c.id.as_str()),
            Self::Many(list) => list.first().map(|c| c.id.as_str()),
        }
    }
}

/// `GET /hop/{customer}/{connection}/` payload
#[derive(Debug, Clone, Deserialize)]
pub struct HopData {
    pub start: HopStart,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HopStart {
    #[serde(deserialize_with = "lenient_u32")]
    pub interval: u32,
}

/// `GET /consumption/averages/...` payload
#[derive(Debug, Clone, Deserialize)]
pub struct UsageData {
    #[serde(default)]
    pub usage: BTreeMap<String, DailyUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyUsage {
    #[serde(deserialize_with = "lenient_f64")]
    pub percent_consumption_adjustment: f64,
}

// The provider is inconsistent about quoting numbers, so ids and figures
// are accepted either as JSON numbers or as strings.

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("number out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid number '{}': {}", s, e))),
        other => Err(serde::de::Error::custom(format!(
            "expected number, got {}",
            other
        ))),
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<i64, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(0),
        Value::Number(n) => Ok(n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64)),
        Value::String(s) => Ok(s.trim().parse::<i64>().unwrap_or(0)),
        other => Err(serde::de::Error::custom(format!(
            "expected error code, got {}",
            other
        ))),
    }
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u32, D::Error> {
    let value = lenient_f64(d)?;
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative integer, got {}",
            value
        )));
    }
    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_prefers_error() {
        let env = Envelope::from_value(json!({
            "data": {"x": 1},
            "error": {"code": "403", "title": "Forbidden", "detail": "nope"}
        }))
        .unwrap();
        let err = env.into_data().unwrap_err();
        let remote = err.remote().unwrap();
        assert_eq!(remote.code, 403);
        assert_eq!(remote.title, "Forbidden");
    }

    #[test]
    fn envelope_rejects_non_object() {
        assert!(Envelope::from_value(json!([1, 2])).is_err());
        let ack = Envelope::from_value(json!({})).unwrap();
        assert_eq!(ack.into_data().unwrap(), Value::Null);
    }

    #[test]
    fn login_accepts_numeric_ids_and_connection_lists() {
        let data: LoginData = serde_json::from_value(json!({
            "customer": [
                {"id": 1234, "connection": [{"id": 99}, {"id": 100}]},
                {"id": "5678", "connection": {"id": "42"}}
            ],
            "sid": "abc"
        }))
        .unwrap();
        assert_eq!(data.customer[0].id, "1234");
        assert_eq!(data.customer[0].connection.first_id(), Some("99"));
        assert_eq!(data.customer[1].connection.first_id(), Some("42"));
    }

    #[test]
    fn usage_accepts_string_percentages() {
        let data: UsageData = serde_json::from_value(json!({
            "usage": {
                "2024-01-01": {"percent_consumption_adjustment": "12.5"},
                "2024-01-02": {"percent_consumption_adjustment": 7}
            }
        }))
        .unwrap();
        let total: f64 = data
            .usage
            .values()
            .map(|d| d.percent_consumption_adjustment)
            .sum();
        assert!((total - 19.5).abs() < 1e-9);
    }

    #[test]
    fn hop_interval_rejects_fractions() {
        assert!(serde_json::from_value::<HopData>(json!({"start": {"interval": "12"}})).is_ok());
        assert!(serde_json::from_value::<HopData>(json!({"start": {"interval": 1.5}})).is_err());
    }
}
