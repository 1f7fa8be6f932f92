// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

use std::time::Duration;

use clap::{Parser, ValueEnum};
use eyre::{eyre, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use unireq::{Dispatcher, Method, Payload, RequestOptions};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl From<Verb> for Method {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Get => Method::Get,
            Verb::Post => Method::Post,
            Verb::Put => Method::Put,
            Verb::Delete => Method::Delete,
        }
    }
}

#[derive(Debug, Parser)]
struct Args {
    /// Request verb.
    #[arg(value_enum)]
    verb: Verb,

    /// Target URL. The scheme selects the transport: http, coap or mqtt (post only).
    /// Example: coap://sensor.local/temperature
    url: String,

    /// Request payload for post/put. Sent as JSON if it parses as JSON, as text otherwise.
    #[arg(short, long)]
    data: Option<String>,

    /// MQTT topic to publish to.
    #[arg(short, long)]
    topic: Option<String>,

    /// Extra HTTP header, as 'Name: value'. May be repeated.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Give up after this many seconds (HTTP and CoAP).
    #[arg(long)]
    timeout: Option<u64>,

    /// Be more verbose.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("header '{s}' is not of the form 'Name: value'"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn parse_payload(data: String) -> Payload {
    match serde_json::from_str(&data) {
        Ok(value) => Payload::Json(value),
        Err(_) => Payload::Text(data),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // set up logging
    let env_filter_str = if args.verbose {
        format!("info,{}=debug", env!("CARGO_PKG_NAME").replace("-", "_"))
    } else {
        "info".to_string()
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter_str))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    debug!("verbose logging enabled");

    let mut options = RequestOptions::new();
    if let Some(topic) = args.topic {
        options = options.topic(topic);
    }
    for (name, value) in args.headers {
        options = options.header(name, value);
    }
    if let Some(secs) = args.timeout {
        options = options.timeout(Duration::from_secs(secs));
    }
    let method = Method::from(args.verb);
    let payload = args.data.map(parse_payload);
    if payload.is_some() && !method.carries_payload() {
        return Err(eyre!("--data is only accepted for post and put"));
    }

    let dispatcher = Dispatcher::new()?;
    let response = dispatcher
        .request(method, &args.url, payload.as_ref(), &options)
        .await?;

    let protocol = response.protocol().map_or("unknown", |p| p.as_str());
    println!("{} {}", protocol, response.status_code());
    for (name, value) in response.headers() {
        println!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    println!();
    println!("{}", response.text());

    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
