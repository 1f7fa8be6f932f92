// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

pub mod mqtt_client;
pub use mqtt_client::{Broker, MqttClient, PublishOutcome, Publisher, RumqttPublisher};
