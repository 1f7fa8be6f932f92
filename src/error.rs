// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

/// Errors raised by the facade itself.
///
/// They travel inside an [`eyre::Report`]; use `report.downcast_ref::<Error>()`
/// to tell them apart from transport failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The URL scheme has no adapter, or the adapter does not support the verb.
    #[error("Protocol {0} not supported.")]
    UnsupportedProtocol(String),

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL '{0}' does not specify a host")]
    MissingHost(String),
}
