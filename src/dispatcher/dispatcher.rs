// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use eyre::Result;
use tracing::{debug, info, warn};

use crate::{
    client::{coap::CoapClient, http::HttpClient, mqtt::MqttClient, Client},
    error::Error,
    proto::{parse_url, scheme_of, Method, Payload, Protocol, RequestOptions},
    response::Response,
};

static REQUEST_ID: AtomicU64 = AtomicU64::new(0);

/// Routes a verb and URL to the adapter selected by the URL scheme.
///
/// Supported schemes are `http`, `coap` and `mqtt` (POST only). Anything else
/// fails with [`Error::UnsupportedProtocol`] before any network activity.
pub struct Dispatcher {
    clients: HashMap<Protocol, Arc<dyn Client>>,
}

impl Dispatcher {
    /// Creates a dispatcher with the default adapter for every protocol.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub async fn get(&self, url: &str, options: &RequestOptions) -> Result<Response> {
        self.request(Method::Get, url, None, options).await
    }

    pub async fn post(
        &self,
        url: &str,
        payload: Option<Payload>,
        options: &RequestOptions,
    ) -> Result<Response> {
        self.request(Method::Post, url, payload.as_ref(), options).await
    }

    pub async fn put(
        &self,
        url: &str,
        payload: Option<Payload>,
        options: &RequestOptions,
    ) -> Result<Response> {
        self.request(Method::Put, url, payload.as_ref(), options).await
    }

    pub async fn delete(&self, url: &str, options: &RequestOptions) -> Result<Response> {
        self.request(Method::Delete, url, None, options).await
    }

    pub async fn request(
        &self,
        method: Method,
        url: &str,
        payload: Option<&Payload>,
        options: &RequestOptions,
    ) -> Result<Response> {
        let id = REQUEST_ID.fetch_add(1, Ordering::SeqCst);
        let stamp = Instant::now();

        let scheme = scheme_of(url);
        let Some(client) = Protocol::from_scheme(scheme)
            .filter(|protocol| protocol.supports(method))
            .and_then(|protocol| self.clients.get(&protocol))
        else {
            warn!("request #{}: {} over '{}' is not supported", id, method, scheme);
            return Err(Error::UnsupportedProtocol(scheme.to_string()).into());
        };
        let url = parse_url(url)?;
        debug!("request #{}: {} {} via {}", id, method, url, client.protocol());

        let response = client.request(method, &url, payload, options).await?;
        info!(
            "request #{}: {} {} -> {} in {} ms",
            id,
            method,
            url,
            response.status_code(),
            stamp.elapsed().as_millis()
        );
        Ok(response)
    }
}

/// Builds a [`Dispatcher`], filling protocols without an explicit adapter
/// with the default one.
#[derive(Default)]
pub struct DispatcherBuilder {
    clients: HashMap<Protocol, Arc<dyn Client>>,
}

impl DispatcherBuilder {
    /// Registers `client` for the protocol it reports, replacing any previous one.
    pub fn client(mut self, client: Arc<dyn Client>) -> Self {
        self.clients.insert(client.protocol(), client);
        self
    }

    pub fn build(mut self) -> Result<Dispatcher> {
        for protocol in Protocol::ALL {
            if self.clients.contains_key(&protocol) {
                continue;
            }
            let client: Arc<dyn Client> = match protocol {
                Protocol::Http => Arc::new(HttpClient::new()?),
                Protocol::Coap => Arc::new(CoapClient::new()),
                Protocol::Mqtt => Arc::new(MqttClient::new()),
            };
            self.clients.insert(protocol, client);
        }
        Ok(Dispatcher {
            clients: self.clients,
        })
    }
}
