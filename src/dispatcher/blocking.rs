// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

//! Blocking versions of the four verbs.
//!
//! Each call builds a current-thread runtime, drives a single exchange to
//! completion on it and tears it down again. These functions panic if called
//! from within an async runtime; use [`Dispatcher`] there instead.

use std::future::Future;

use eyre::Result;

use crate::{
    dispatcher::Dispatcher,
    proto::{Method, Payload, RequestOptions},
    response::Response,
};

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

pub fn request(
    method: Method,
    url: &str,
    payload: Option<Payload>,
    options: &RequestOptions,
) -> Result<Response> {
    block_on(async {
        let dispatcher = Dispatcher::new()?;
        dispatcher
            .request(method, url, payload.as_ref(), options)
            .await
    })?
}

pub fn get(url: &str, options: &RequestOptions) -> Result<Response> {
    request(Method::Get, url, None, options)
}

pub fn post(url: &str, payload: Option<Payload>, options: &RequestOptions) -> Result<Response> {
    request(Method::Post, url, payload, options)
}

pub fn put(url: &str, payload: Option<Payload>, options: &RequestOptions) -> Result<Response> {
    request(Method::Put, url, payload, options)
}

pub fn delete(url: &str, options: &RequestOptions) -> Result<Response> {
    request(Method::Delete, url, None, options)
}

#[cfg(test)]
mod tests {
    use std::{
        net::{TcpListener, UdpSocket},
        thread,
    };

    use coap_lite::{MessageClass, MessageType, Packet, RequestType, ResponseType};

    use super::*;
    use crate::{error::Error, proto::Protocol};

    #[test]
    fn coap_exchange_blocks_until_done() {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let url = format!("coap://{}/light", socket.local_addr().unwrap());
        let server = thread::spawn(move || {
            let mut buffer = [0u8; 1500];
            let (n, peer) = socket.recv_from(&mut buffer).unwrap();
            let request = Packet::from_bytes(&buffer[..n]).unwrap();

            let mut reply = Packet::new();
            reply.header.set_type(MessageType::Acknowledgement);
            reply.header.code = MessageClass::Response(ResponseType::Changed);
            reply.header.message_id = request.header.message_id;
            reply.set_token(request.get_token().to_vec());
            reply.payload = b"dimmed".to_vec();
            socket.send_to(&reply.to_bytes().unwrap(), peer).unwrap();
            request
        });

        let response = put(&url, Some("40".into()), &RequestOptions::new()).unwrap();
        let request = server.join().unwrap();

        assert_eq!(request.header.code, MessageClass::Request(RequestType::Put));
        assert_eq!(request.payload, b"40");
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.text(), "dimmed");
        assert_eq!(response.protocol(), Some(Protocol::Coap));
    }

    #[test]
    fn mqtt_failures_are_responses() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let response = post(&format!("mqtt://{addr}"), Some("x".into()), &RequestOptions::new())
            .unwrap();
        assert_eq!(response.status_code(), 500);
        assert_eq!(response.protocol(), Some(Protocol::Mqtt));
    }

    #[test]
    fn unsupported_protocols_raise() {
        let err = get("ftp://example.com/file", &RequestOptions::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnsupportedProtocol(scheme)) if scheme == "ftp"
        ));

        let err = delete("mqtt://localhost", &RequestOptions::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnsupportedProtocol(scheme)) if scheme == "mqtt"
        ));
    }
}
