// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

pub mod client;
pub use client::Client;

pub mod coap;
pub mod http;
pub mod mqtt;
