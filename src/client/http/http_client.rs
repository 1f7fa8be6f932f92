// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

use eyre::Result;
use reqwest::Url;
use tracing::debug;

use crate::{
    client::Client,
    proto::{Method, Payload, Protocol, RequestOptions},
    response::Response,
};

/// HTTP adapter backed by `reqwest`.
///
/// Status, body and headers are passed through unmodified. Transport errors
/// are returned to the caller as-is.
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            // No pooling: every call opens and closes its own connection.
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Client for HttpClient {
    fn protocol(&self) -> Protocol {
        Protocol::Http
    }

    async fn request(
        &self,
        method: Method,
        url: &Url,
        payload: Option<&Payload>,
        options: &RequestOptions,
    ) -> Result<Response> {
        let mut builder = self.client.request(method.into(), url.clone());

        if let Some(payload) = payload.filter(|_| method.carries_payload()) {
            builder = match payload {
                Payload::Json(value) => builder.json(value),
                Payload::Text(text) => builder.json(text),
                Payload::Bytes(bytes) => builder.body(bytes.clone()),
            };
        }
        for (name, value) in &options.headers {
            builder = builder.header(name, value);
        }
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some((username, password)) = &options.basic_auth {
            builder = builder.basic_auth(username, password.as_ref());
        }
        if let Some(token) = &options.bearer_auth {
            builder = builder.bearer_auth(token);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status_code = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        debug!(
            "HttpClient: {} {} -> {} ({} bytes)",
            method,
            url,
            status_code,
            body.len()
        );

        let text = String::from_utf8_lossy(&body).into_owned();
        Ok(Response::new(status_code, body)
            .with_text(text)
            .with_headers(headers)
            .with_protocol(Protocol::Http))
    }
}

#[cfg(test)]
mod tests {
    use std::{net::SocketAddr, time::Duration};

    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    use super::*;
    use crate::client::client::tests as client_tests;

    /// Accepts one connection, returns the raw request and answers with `reply`.
    async fn serve_once(reply: &'static str) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .map(|len| len.trim().parse::<usize>().unwrap())
                    .unwrap_or(0);
                if request.len() >= end + 4 + body_len {
                    break;
                }
            }
            stream.write_all(reply.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8(request).unwrap()
        });
        (addr, handle)
    }

    /// Value of header `name` in a raw request, matched case-insensitively.
    fn header_value<'a>(request: &'a str, name: &str) -> Option<&'a str> {
        request.split("\r\n").find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    fn url(addr: SocketAddr, path: &str) -> Url {
        format!("http://{addr}{path}").parse().unwrap()
    }

    #[tokio::test]
    async fn post_json_passthrough() {
        let (addr, server) = serve_once(
            "HTTP/1.1 201 Created\r\n\
             Content-Type: application/json\r\n\
             X-Served-By: fake\r\n\
             Content-Length: 11\r\n\
             Connection: close\r\n\r\n\
             {\"id\": 7}\r\n",
        )
        .await;

        let client = HttpClient::new().unwrap();
        let options = RequestOptions::new()
            .header("X-Api-Key", "secret")
            .query("unit", "c")
            .basic_auth("user", Some("pass".to_string()))
            .timeout(Duration::from_secs(5));
        let payload = Payload::from(json!({"name": "lamp"}));
        let response = client
            .request(Method::Post, &url(addr, "/things"), Some(&payload), &options)
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /things?unit=c HTTP/1.1\r\n"));
        let lowered = request.to_lowercase();
        assert!(lowered.contains("x-api-key: secret\r\n"));
        assert!(lowered.contains("content-type: application/json\r\n"));
        assert_eq!(header_value(&request, "authorization"), Some("Basic dXNlcjpwYXNz"));
        assert!(request.ends_with("\r\n\r\n{\"name\":\"lamp\"}"));

        assert_eq!(response.status_code(), 201);
        assert_eq!(response.headers()["x-served-by"], "fake");
        assert_eq!(response.text(), "{\"id\": 7}\r\n");
        assert_eq!(response.json(), Some(json!({"id": 7})));
        client_tests::assert_tagged(&client, &response);
    }

    #[tokio::test]
    async fn error_status_is_not_an_error() {
        let (addr, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\n\
             Content-Length: 9\r\n\
             Connection: close\r\n\r\n\
             not found",
        )
        .await;

        let client = HttpClient::new().unwrap();
        let options = RequestOptions::new().bearer_auth("t0ken");
        let response = client
            .request(Method::Get, &url(addr, "/missing"), None, &options)
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /missing HTTP/1.1\r\n"));
        assert_eq!(header_value(&request, "authorization"), Some("Bearer t0ken"));
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.text(), "not found");
        assert_eq!(response.json(), None);
    }

    #[tokio::test]
    async fn get_ignores_payload() {
        let (addr, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        )
        .await;

        let client = HttpClient::new().unwrap();
        let payload = Payload::from("ignored");
        client
            .request(Method::Get, &url(addr, "/"), Some(&payload), &RequestOptions::new())
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.ends_with("\r\n\r\n"));
        assert!(!request.contains("ignored"));
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let addr = client_tests::closed_tcp_addr().await;
        let client = HttpClient::new().unwrap();
        let result = client
            .request(Method::Delete, &url(addr, "/"), None, &RequestOptions::new())
            .await;
        assert!(result.is_err());
    }
}
