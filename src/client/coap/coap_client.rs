// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

use std::{
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};

use bytes::BytesMut;
use coap_lite::{CoapOption, MessageClass, MessageType, Packet};
use eyre::{eyre, Result};
use percent_encoding::percent_decode_str;
use reqwest::Url;
use tokio::{
    net::{lookup_host, UdpSocket},
    time::timeout,
};
use tracing::{debug, warn};

use crate::{
    client::Client,
    proto::{coap, host_and_port, Method, Payload, Protocol, RequestOptions},
    response::Response,
};

/// Largest payload a UDP datagram can carry.
const MAX_DATAGRAM_SIZE: usize = 65_535;

// Transmission parameters from RFC 7252, section 4.8.
const ACK_TIMEOUT: Duration = Duration::from_secs(2);
const ACK_RANDOM_FACTOR: f64 = 1.5;
const MAX_RETRANSMIT: u32 = 4;

/// Block numbers are 20 bits wide.
const MAX_BLOCK_NUM: u32 = (1 << 20) - 1;

/// A Block2 option value (RFC 7959).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block {
    num: u32,
    more: bool,
    szx: u8,
}

impl Block {
    fn from_packet(packet: &Packet) -> Option<Self> {
        let value = packet.get_option(CoapOption::Block2)?.front()?;
        if value.len() > 3 {
            return None;
        }
        let raw = value.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
        Some(Self {
            num: raw >> 4,
            more: raw & 0x08 != 0,
            szx: (raw & 0x07) as u8,
        })
    }

    /// Encodes the value as a minimal-length unsigned integer.
    fn to_option(self) -> Vec<u8> {
        let raw = (self.num << 4) | (u32::from(self.more) << 3) | u32::from(self.szx);
        let bytes = raw.to_be_bytes();
        let leading_zeros = bytes.iter().take_while(|&&b| b == 0).count();
        bytes[leading_zeros..].to_vec()
    }
}

/// What arrived for the exchange in flight.
enum Incoming {
    /// Empty ACK; a separate response follows.
    Acknowledged,
    Response(Packet),
}

/// CoAP adapter.
///
/// Each request binds a fresh UDP socket and sends confirmable messages,
/// retransmitting them until acknowledged. Block-wise responses are
/// reassembled. The response code is translated with [`coap::http_status`];
/// unknown codes become 500 instead of an error.
#[derive(Debug)]
pub struct CoapClient {
    ack_timeout: Duration,
}

impl CoapClient {
    pub fn new() -> Self {
        Self::with_ack_timeout(ACK_TIMEOUT)
    }

    /// Uses `ack_timeout` as the base retransmission timeout.
    pub fn with_ack_timeout(ack_timeout: Duration) -> Self {
        Self { ack_timeout }
    }

    fn build_request(
        method: Method,
        url: &Url,
        payload: Option<&Payload>,
        token: Vec<u8>,
        block: Option<Block>,
    ) -> Packet {
        let mut packet = Packet::new();
        packet.header.set_type(MessageType::Confirmable);
        packet.header.code = MessageClass::Request(method.into());
        packet.header.message_id = rand::random();
        packet.set_token(token);

        if let Some(segments) = url.path_segments() {
            for segment in segments.filter(|s| !s.is_empty()) {
                packet.add_option(CoapOption::UriPath, decode(segment));
            }
        }
        if let Some(query) = url.query() {
            for argument in query.split('&').filter(|a| !a.is_empty()) {
                packet.add_option(CoapOption::UriQuery, decode(argument));
            }
        }
        if let Some(block) = block {
            packet.add_option(CoapOption::Block2, block.to_option());
        }

        // GET and DELETE never carry a body.
        if let Some(payload) = payload.filter(|_| method.carries_payload()) {
            packet.payload = payload.to_bytes();
        }
        packet
    }

    /// Receives datagrams until one belongs to (`message_id`, `token`).
    async fn next_incoming(socket: &UdpSocket, message_id: u16, token: &[u8]) -> Result<Incoming> {
        let mut buffer = BytesMut::zeroed(MAX_DATAGRAM_SIZE);
        loop {
            let n = socket.recv(&mut buffer).await?;
            let reply = match Packet::from_bytes(&buffer[..n]) {
                Ok(reply) => reply,
                Err(err) => {
                    warn!("CoapClient: ignoring undecodable datagram: {:?}", err);
                    continue;
                }
            };
            let reply_type = reply.header.get_type();
            let raw_code = u8::from(reply.header.code);
            let own_message = reply.header.message_id == message_id;

            match raw_code >> 5 {
                0 if raw_code == 0 && own_message && reply_type == MessageType::Acknowledgement => {
                    return Ok(Incoming::Acknowledged);
                }
                0 if raw_code == 0 && own_message && reply_type == MessageType::Reset => {
                    return Err(eyre!("CoapClient: server reset message {}", message_id));
                }
                2..=5 if reply.get_token() == token => {
                    if reply_type == MessageType::Confirmable {
                        let mut ack = Packet::new();
                        ack.header.set_type(MessageType::Acknowledgement);
                        ack.header.code = MessageClass::Empty;
                        ack.header.message_id = reply.header.message_id;
                        let data = ack
                            .to_bytes()
                            .map_err(|err| eyre!("CoapClient: cannot encode ACK: {:?}", err))?;
                        socket.send(&data).await?;
                    }
                    return Ok(Incoming::Response(reply));
                }
                // Ignore anything that does not belong to this exchange.
                _ => warn!(
                    "CoapClient: ignoring unrelated message {} ({:?})",
                    reply.header.message_id, reply_type
                ),
            }
        }
    }

    /// Sends one confirmable request and returns its response. The request is
    /// retransmitted with exponential back-off until it is acknowledged.
    async fn exchange(&self, socket: &UdpSocket, request: &Packet) -> Result<Packet> {
        let data = request
            .to_bytes()
            .map_err(|err| eyre!("CoapClient: cannot encode request: {:?}", err))?;
        let message_id = request.header.message_id;
        let token = request.get_token();
        socket.send(&data).await?;

        let mut wait = self
            .ack_timeout
            .mul_f64(1.0 + rand::random::<f64>() * (ACK_RANDOM_FACTOR - 1.0));
        let mut retransmissions = 0;
        loop {
            match timeout(wait, Self::next_incoming(socket, message_id, token)).await {
                Ok(incoming) => match incoming? {
                    Incoming::Response(reply) => return Ok(reply),
                    Incoming::Acknowledged => break,
                },
                Err(_) if retransmissions < MAX_RETRANSMIT => {
                    retransmissions += 1;
                    wait *= 2;
                    debug!(
                        "CoapClient: retransmitting message {} ({}/{})",
                        message_id, retransmissions, MAX_RETRANSMIT
                    );
                    socket.send(&data).await?;
                }
                Err(_) => {
                    return Err(eyre!(
                        "CoapClient: message {} not acknowledged after {} retransmissions",
                        message_id,
                        MAX_RETRANSMIT
                    ))
                }
            }
        }

        debug!("CoapClient: message {} acknowledged, awaiting separate response", message_id);
        loop {
            if let Incoming::Response(reply) = Self::next_incoming(socket, message_id, token).await? {
                return Ok(reply);
            }
        }
    }

    /// Performs the request, following Block2 until the last block arrived.
    /// The returned packet carries the reassembled payload.
    async fn transfer(
        &self,
        socket: &UdpSocket,
        method: Method,
        url: &Url,
        payload: Option<&Payload>,
    ) -> Result<Packet> {
        let token = rand::random::<[u8; 4]>().to_vec();
        let request = Self::build_request(method, url, payload, token.clone(), None);
        let mut reply = self.exchange(socket, &request).await?;
        let Some(mut block) = Block::from_packet(&reply) else {
            return Ok(reply);
        };

        let mut body = std::mem::take(&mut reply.payload);
        while block.more {
            if block.num >= MAX_BLOCK_NUM {
                return Err(eyre!("CoapClient: too many blocks in response"));
            }
            let next = Block {
                num: block.num + 1,
                more: false,
                szx: block.szx,
            };
            // Follow-up requests ask for the next block without repeating the payload.
            let request = Self::build_request(method, url, None, token.clone(), Some(next));
            reply = self.exchange(socket, &request).await?;
            block = match Block::from_packet(&reply) {
                Some(block) if block.num == next.num => block,
                _ => {
                    return Err(eyre!(
                        "CoapClient: expected block {} in response",
                        next.num
                    ))
                }
            };
            body.append(&mut reply.payload);
        }
        debug!("CoapClient: reassembled {} blocks ({} bytes)", block.num + 1, body.len());
        reply.payload = body;
        Ok(reply)
    }
}

impl Default for CoapClient {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(component: &str) -> Vec<u8> {
    percent_decode_str(component).collect()
}

#[async_trait::async_trait]
impl Client for CoapClient {
    fn protocol(&self) -> Protocol {
        Protocol::Coap
    }

    async fn request(
        &self,
        method: Method,
        url: &Url,
        payload: Option<&Payload>,
        options: &RequestOptions,
    ) -> Result<Response> {
        let (host, port) = host_and_port(url, coap::DEFAULT_PORT)?;
        let server_addr = lookup_host((host.as_str(), port))
            .await?
            .next()
            .ok_or_else(|| eyre!("CoapClient: cannot resolve '{}'", host))?;

        let local_addr = match server_addr {
            SocketAddr::V4(_) => SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
            SocketAddr::V6(_) => SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0),
        };
        let socket = UdpSocket::bind(local_addr).await?;
        socket.connect(server_addr).await?;
        debug!("CoapClient: {} {} via {}", method, url, server_addr);

        let transfer = self.transfer(&socket, method, url, payload);
        let reply = match options.timeout {
            Some(duration) => timeout(duration, transfer)
                .await
                .map_err(|_| eyre!("CoapClient: timeout receiving response"))??,
            None => transfer.await?,
        };

        let code = coap::code_string(u8::from(reply.header.code));
        let status_code = coap::http_status(&code);
        debug!("CoapClient: response {} -> status {}", code, status_code);

        let text = String::from_utf8_lossy(&reply.payload).into_owned();
        Ok(Response::new(status_code, text).with_protocol(Protocol::Coap))
    }
}
