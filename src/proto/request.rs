// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

use std::{fmt, time::Duration};

use bytes::Bytes;
use coap_lite::RequestType;
use serde_json::Value;

/// MQTT topic used when the caller does not name one.
pub const DEFAULT_TOPIC: &str = "default/request";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Whether the verb sends a request body.
    pub fn carries_payload(self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl From<Method> for RequestType {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => RequestType::Get,
            Method::Post => RequestType::Post,
            Method::Put => RequestType::Put,
            Method::Delete => RequestType::Delete,
        }
    }
}

/// Request body.
///
/// HTTP sends `Json` and `Text` as a JSON document and `Bytes` verbatim.
/// CoAP and MQTT send [`Payload::to_bytes`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
    Bytes(Bytes),
}

impl Payload {
    /// Raw form used by the byte-oriented transports.
    /// JSON strings are sent unquoted, any other JSON value is serialized.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Payload::Json(Value::String(s)) | Payload::Text(s) => s.as_bytes().to_vec(),
            Payload::Json(value) => value.to_string().into_bytes(),
            Payload::Bytes(bytes) => bytes.to_vec(),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes.into())
    }
}

/// Per-call options.
///
/// Each adapter reads the options that apply to it and ignores the rest:
/// HTTP forwards headers, auth, query and timeout to the HTTP client,
/// CoAP honours the timeout, MQTT reads the topic, client id and keep-alive.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub(crate) topic: Option<String>,
    pub(crate) client_id: Option<String>,
    pub(crate) keep_alive: Option<Duration>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) basic_auth: Option<(String, Option<String>)>,
    pub(crate) bearer_auth: Option<String>,
    pub(crate) timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.basic_auth = Some((username.into(), password));
        self
    }

    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.bearer_auth = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The MQTT topic, or [`DEFAULT_TOPIC`].
    pub fn topic_or_default(&self) -> &str {
        self.topic.as_deref().unwrap_or(DEFAULT_TOPIC)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn payload_bytes() {
        assert_eq!(Payload::from("21.5").to_bytes(), b"21.5");
        assert_eq!(Payload::from(json!("on")).to_bytes(), b"on");
        assert_eq!(
            Payload::from(json!({"on": true})).to_bytes(),
            br#"{"on":true}"#
        );
        assert_eq!(Payload::from(vec![0u8, 0xff]).to_bytes(), [0u8, 0xff]);
    }

    #[test]
    fn topic_defaults() {
        assert_eq!(RequestOptions::new().topic_or_default(), DEFAULT_TOPIC);
        assert_eq!(
            RequestOptions::new()
                .topic("home/lamp")
                .topic_or_default(),
            "home/lamp"
        );
    }

    #[test]
    fn payload_verbs() {
        assert!(Method::Post.carries_payload());
        assert!(Method::Put.carries_payload());
        assert!(!Method::Get.carries_payload());
        assert!(!Method::Delete.carries_payload());
    }
}
