// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

use eyre::Result;
use reqwest::Url;

use crate::{
    proto::{Method, Payload, Protocol, RequestOptions},
    response::Response,
};

/// A protocol adapter: performs one exchange and normalizes the reply.
#[async_trait::async_trait]
pub trait Client: Send + Sync {
    /// The protocol this adapter speaks; responses are tagged with it.
    fn protocol(&self) -> Protocol;

    async fn request(
        &self,
        method: Method,
        url: &Url,
        payload: Option<&Payload>,
        options: &RequestOptions,
    ) -> Result<Response>;
}

#[cfg(test)]
pub mod tests {
    use std::{
        net::SocketAddr,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    use tokio::net::TcpListener;

    use super::*;

    /// Adapter that records calls and answers with a fixed status.
    pub struct RecordingClient {
        protocol: Protocol,
        status_code: u16,
        calls: AtomicUsize,
    }

    impl RecordingClient {
        pub fn new(protocol: Protocol, status_code: u16) -> Arc<Self> {
            Arc::new(Self {
                protocol,
                status_code,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Client for RecordingClient {
        fn protocol(&self) -> Protocol {
            self.protocol
        }

        async fn request(
            &self,
            method: Method,
            _url: &Url,
            payload: Option<&Payload>,
            _options: &RequestOptions,
        ) -> Result<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = match payload {
                Some(payload) => format!("{method} {}", String::from_utf8_lossy(&payload.to_bytes())),
                None => method.to_string(),
            };
            Ok(Response::new(self.status_code, text).with_protocol(self.protocol))
        }
    }

    /// Returns a loopback address on which nothing is listening.
    pub async fn closed_tcp_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    /// Checks that an adapter tags its responses with its own protocol.
    pub fn assert_tagged(client: &dyn Client, response: &Response) {
        assert_eq!(response.protocol(), Some(client.protocol()));
    }
}
