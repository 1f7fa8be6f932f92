// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

use std::fmt;

use eyre::Result;
use reqwest::Url;
use url::Host;

use crate::error::Error;

pub mod coap;
pub mod request;

pub use request::{Method, Payload, RequestOptions};

/// The transports a URL scheme can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http,
    Coap,
    Mqtt,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Http, Protocol::Coap, Protocol::Mqtt];

    /// Looks up the protocol for a URL scheme. The scheme is matched verbatim.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "http" => Some(Protocol::Http),
            "coap" => Some(Protocol::Coap),
            "mqtt" => Some(Protocol::Mqtt),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Coap => "coap",
            Protocol::Mqtt => "mqtt",
        }
    }

    /// MQTT is publish-only, so it only accepts POST.
    pub fn supports(self, method: Method) -> bool {
        match self {
            Protocol::Mqtt => method == Method::Post,
            Protocol::Http | Protocol::Coap => true,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracts the scheme of a URL without validating the rest of it.
/// Returns an empty string if the URL has no scheme.
pub fn scheme_of(url: &str) -> &str {
    let Some((scheme, _)) = url.split_once(':') else {
        return "";
    };
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if valid {
        scheme
    } else {
        ""
    }
}

pub fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|source| {
        Error::InvalidUrl {
            url: url.to_string(),
            source,
        }
        .into()
    })
}

/// Returns the host and port of `url`, falling back to `default_port`.
/// IPv6 literals are returned without brackets so they can be resolved directly.
pub fn host_and_port(url: &Url, default_port: u16) -> Result<(String, u16)> {
    let host = match url.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        _ => return Err(Error::MissingHost(url.to_string()).into()),
    };
    Ok((host, url.port().unwrap_or(default_port)))
}
