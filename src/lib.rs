// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

//! A request facade over HTTP, CoAP and MQTT.
//!
//! The URL scheme selects the transport; every transport reply is normalized
//! into a single [`Response`] shape.

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod proto;
pub mod response;

pub use dispatcher::{blocking, Dispatcher};
pub use error::Error;
pub use proto::{Method, Payload, Protocol, RequestOptions};
pub use response::{Content, Response};
