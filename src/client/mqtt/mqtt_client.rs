// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

use std::{sync::Arc, time::Duration};

use eyre::Result;
use reqwest::Url;
use rumqttc::{
    AsyncClient, ConnectionError, Event, MqttOptions, Outgoing, Packet, QoS, StateError,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    client::Client,
    error::Error,
    proto::{host_and_port, Method, Payload, Protocol, RequestOptions},
    response::Response,
};

/// Default TCP port of an MQTT broker.
pub const DEFAULT_PORT: u16 = 1883;

const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Largest MQTT 3.1.1 packet: 268 435 455 bytes of remaining length plus a
/// 5-byte fixed header.
pub const MAX_PACKET_SIZE: usize = 268_435_455 + 5;

/// How a publish ended, before it is folded into a status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The broker completed the QoS 2 handshake.
    Acknowledged,
    /// The broker refused the session or the connection was lost.
    NoConnection,
    /// The publish could not be handed to the client.
    Failed(String),
}

impl PublishOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            PublishOutcome::Acknowledged => 200,
            PublishOutcome::NoConnection => 503,
            PublishOutcome::Failed(_) => 500,
        }
    }

    fn content(&self) -> Value {
        match self {
            PublishOutcome::Acknowledged => json!({"status": "ok", "response": "sent"}),
            PublishOutcome::NoConnection | PublishOutcome::Failed(_) => {
                json!({"status": "ko", "response": "error"})
            }
        }
    }

    /// Folds a publish result into a response. Errors become a 500 response.
    pub fn into_response(outcome: Result<PublishOutcome>) -> Response {
        let outcome = outcome.unwrap_or_else(|err| {
            warn!("MqttClient: publish failed: {:#}", err);
            PublishOutcome::Failed(err.to_string())
        });
        Response::new(outcome.status_code(), outcome.content()).with_protocol(Protocol::Mqtt)
    }
}

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broker {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
}

impl Broker {
    pub fn from_url(url: &Url, options: &RequestOptions) -> Result<Self> {
        let (host, port) = host_and_port(url, DEFAULT_PORT)?;
        let client_id = options
            .client_id
            .clone()
            .filter(|id| !id.is_empty() && !id.starts_with(' '))
            .unwrap_or_else(|| format!("unireq-{:08x}", rand::random::<u32>()));
        Ok(Self {
            host,
            port,
            client_id,
            keep_alive: options.keep_alive.unwrap_or(DEFAULT_KEEP_ALIVE),
        })
    }
}

/// Performs a single connect, publish, disconnect sequence.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, broker: &Broker, topic: &str, payload: Vec<u8>) -> Result<PublishOutcome>;
}

/// [`Publisher`] backed by `rumqttc`. Publishes at QoS 2.
#[derive(Debug, Default)]
pub struct RumqttPublisher;

#[async_trait::async_trait]
impl Publisher for RumqttPublisher {
    async fn publish(&self, broker: &Broker, topic: &str, payload: Vec<u8>) -> Result<PublishOutcome> {
        let mut mqtt_options = MqttOptions::new(&broker.client_id, &broker.host, broker.port);
        // rumqttc rejects sub-second keep-alives other than zero.
        let keep_alive = if broker.keep_alive.is_zero() {
            broker.keep_alive
        } else {
            broker.keep_alive.max(Duration::from_secs(1))
        };
        mqtt_options.set_keep_alive(keep_alive);
        mqtt_options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);
        let (client, mut eventloop) = AsyncClient::new(mqtt_options, 10);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => break,
                Ok(_) => continue,
                Err(ConnectionError::ConnectionRefused(code)) => {
                    warn!("MqttClient: broker refused connection: {:?}", code);
                    return Ok(PublishOutcome::NoConnection);
                }
                Err(err) => return Err(err.into()),
            }
        }
        debug!(
            "MqttClient: connected to {}:{} as '{}'",
            broker.host, broker.port, broker.client_id
        );

        if let Err(err) = client.publish(topic, QoS::ExactlyOnce, false, payload).await {
            return Ok(PublishOutcome::Failed(err.to_string()));
        }
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::PubComp(_))) => break,
                Ok(_) => continue,
                Err(err) => {
                    warn!("MqttClient: publish to '{}' failed: {}", topic, err);
                    return Ok(publish_failure(&err));
                }
            }
        }
        debug!("MqttClient: publish to '{}' completed", topic);

        client.disconnect().await?;
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => continue,
                // The publish is complete; a broken teardown does not undo it.
                Err(err) => {
                    debug!("MqttClient: error during disconnect: {}", err);
                    break;
                }
            }
        }
        Ok(PublishOutcome::Acknowledged)
    }
}

/// Classifies an event loop error raised after CONNACK. Only a lost
/// connection is `NoConnection`; protocol and state errors are `Failed`.
fn publish_failure(err: &ConnectionError) -> PublishOutcome {
    match err {
        ConnectionError::Io(_)
        | ConnectionError::NetworkTimeout
        | ConnectionError::FlushTimeout
        | ConnectionError::MqttState(StateError::Io(_))
        | ConnectionError::MqttState(StateError::ConnectionAborted) => {
            PublishOutcome::NoConnection
        }
        err => PublishOutcome::Failed(err.to_string()),
    }
}

/// MQTT adapter. Only POST (publish) is supported.
///
/// Unlike the other adapters it never returns an error for a failed publish:
/// every failure is reported as a 500 or 503 response.
pub struct MqttClient {
    publisher: Arc<dyn Publisher>,
}

impl MqttClient {
    pub fn new() -> Self {
        Self::with_publisher(Arc::new(RumqttPublisher))
    }

    pub fn with_publisher(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }
}

impl Default for MqttClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Client for MqttClient {
    fn protocol(&self) -> Protocol {
        Protocol::Mqtt
    }

    async fn request(
        &self,
        method: Method,
        url: &Url,
        payload: Option<&Payload>,
        options: &RequestOptions,
    ) -> Result<Response> {
        if !Protocol::Mqtt.supports(method) {
            return Err(Error::UnsupportedProtocol(url.scheme().to_string()).into());
        }

        let topic = options.topic_or_default();
        let payload = payload.map(Payload::to_bytes).unwrap_or_default();
        let outcome = match Broker::from_url(url, options) {
            Ok(broker) => {
                debug!(
                    "MqttClient: publishing {} bytes to '{}' via {}:{}",
                    payload.len(),
                    topic,
                    broker.host,
                    broker.port
                );
                self.publisher.publish(&broker, topic, payload).await
            }
            Err(err) => Err(err),
        };
        Ok(PublishOutcome::into_response(outcome))
    }
}
