// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

use std::fmt;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::proto::Protocol;

/// Response body as produced by an adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Raw body (HTTP).
    Bytes(Bytes),
    /// Decoded payload (CoAP).
    Text(String),
    /// Structured value (MQTT publish result).
    Json(Value),
}

impl Content {
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Content::Bytes(bytes) => bytes.clone(),
            Content::Text(text) => Bytes::copy_from_slice(text.as_bytes()),
            Content::Json(value) => Bytes::from(value.to_string()),
        }
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            Content::Text(text) => f.write_str(text),
            Content::Json(value) => write!(f, "{value}"),
        }
    }
}

impl From<Bytes> for Content {
    fn from(bytes: Bytes) -> Self {
        Content::Bytes(bytes)
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Content::Json(value)
    }
}

/// Protocol-agnostic result of a request.
///
/// HTTP status codes are passed through; CoAP and MQTT outcomes are
/// translated into the HTTP numbering space.
#[derive(Debug, Clone)]
pub struct Response {
    status_code: u16,
    content: Content,
    text: String,
    headers: HeaderMap,
    protocol: Option<Protocol>,
}

impl Response {
    /// Creates a response with empty headers, no protocol tag and `text` set
    /// to the string form of `content`.
    pub fn new(status_code: u16, content: impl Into<Content>) -> Self {
        let content = content.into();
        Self {
            status_code,
            text: content.to_string(),
            content,
            headers: HeaderMap::new(),
            protocol: None,
        }
    }

    /// Overrides the text form. An empty string keeps the derived text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.text = text;
        }
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn bytes(&self) -> Bytes {
        self.content.to_bytes()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    /// Parses the content as JSON.
    ///
    /// Returns `None` if the content is not valid JSON; this is not a
    /// transport error.
    pub fn json(&self) -> Option<Value> {
        match &self.content {
            Content::Bytes(bytes) => serde_json::from_slice(bytes).ok(),
            Content::Text(text) => serde_json::from_str(text).ok(),
            Content::Json(value) => Some(value.clone()),
        }
    }
}
