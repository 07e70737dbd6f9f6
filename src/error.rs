//! Error types for the feed pipeline

use thiserror::Error;

/// Errors produced while resolving a dAPI and collecting beacon prices.
///
/// Resolution errors (`DapiName`, `Rpc`, `UnregisteredDapi`, `Descriptor`,
/// `Config`) abort the whole run. Everything else is a per-beacon condition
/// that the aggregator isolates to the beacon that produced it.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("invalid dAPI name: {0}")]
    DapiName(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("dAPI is not registered: {0}")]
    UnregisteredDapi(String),

    #[error("data feed descriptor error: {0}")]
    Descriptor(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("signed API returned status {status} for {url}")]
    Api { status: u16, url: String },

    #[error("no signed update matches the OEV template ID")]
    NoMatchingUpdate,

    #[error("encoded value error: {0}")]
    Value(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FeedError>;
