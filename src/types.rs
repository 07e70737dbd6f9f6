//! Core data types for the dAPI pipeline
//!
//! Everything here is a value with a lifetime of one pipeline run; nothing
//! is persisted across invocations.

use crate::error::FeedError;
use crate::stats;
use chrono::{DateTime, Utc};
use ethers::types::{Address, H256};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// One data source backing a dAPI: an Airnode and the template it reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconRef {
    pub airnode: Address,
    pub template_id: H256,
}

/// A resolved dAPI: its on-chain feed ID plus the beacons that back it.
#[derive(Debug, Clone)]
pub struct FeedDescriptor {
    pub dapi_name: String,
    pub data_feed_id: H256,
    pub beacons: Vec<BeaconRef>,
}

/// A signed off-chain update as served by the signed API.
///
/// The signature is carried verbatim but never verified here.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedUpdate {
    #[serde(rename = "templateId")]
    pub template_id: H256,
    #[serde(deserialize_with = "timestamp_from_string_or_number")]
    pub timestamp: u64,
    #[serde(rename = "encodedValue")]
    pub encoded_value: String,
    #[serde(default)]
    pub signature: String,
}

/// The signed API serves timestamps as decimal strings; accept plain
/// integers as well.
fn timestamp_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// The latest decoded price reported by a single beacon.
#[derive(Debug, Clone)]
pub struct BeaconPrice {
    pub airnode: Address,
    /// USD price after 18-decimal scaling. Values beyond f64's safe integer
    /// range lose precision; `price_exact` keeps the lossless form when it
    /// fits a `Decimal`.
    pub price_usd: f64,
    pub price_exact: Option<Decimal>,
    /// Unix seconds as reported in the signed update.
    pub timestamp: u64,
}

impl BeaconPrice {
    /// Update time as a UTC datetime, if the timestamp is representable.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::try_from(self.timestamp).ok()?, 0)
    }
}

/// A beacon that failed to produce a price, with the error that excluded it.
#[derive(Debug)]
pub struct BeaconFailure {
    pub airnode: Address,
    pub error: FeedError,
}

/// Consensus statistics over all beacons that produced a price.
///
/// `median` and `mean` are `None` exactly when `sample_count` is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub median: Option<f64>,
    pub mean: Option<f64>,
    pub sample_count: usize,
}

impl AggregateResult {
    pub fn from_prices(prices: &[BeaconPrice]) -> Self {
        let values: Vec<f64> = prices.iter().map(|p| p.price_usd).collect();
        Self {
            median: stats::median(&values),
            mean: stats::mean(&values),
            sample_count: values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }
}

/// Full outcome of one pipeline run.
#[derive(Debug)]
pub struct FeedSnapshot {
    pub descriptor: FeedDescriptor,
    pub prices: Vec<BeaconPrice>,
    pub failures: Vec<BeaconFailure>,
    pub aggregate: AggregateResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(airnode: Address, price_usd: f64) -> BeaconPrice {
        BeaconPrice {
            airnode,
            price_usd,
            price_exact: None,
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_signed_update_string_timestamp() {
        let json = r#"{
            "templateId": "0x0b5c26f37b26b02f5b8308cbf02b79bb51fa24da9fd6bee544a289f96c1c9b68",
            "timestamp": "1700000123",
            "encodedValue": "0x00000000000000000000000000000000000000000000003635c9adc5dea00000",
            "signature": "0xdeadbeef"
        }"#;
        let update: SignedUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.timestamp, 1_700_000_123);
        assert_eq!(update.signature, "0xdeadbeef");
    }

    #[test]
    fn test_signed_update_integer_timestamp() {
        let json = r#"{
            "templateId": "0x0b5c26f37b26b02f5b8308cbf02b79bb51fa24da9fd6bee544a289f96c1c9b68",
            "timestamp": 1700000123,
            "encodedValue": "1500000000000000000000"
        }"#;
        let update: SignedUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.timestamp, 1_700_000_123);
        assert!(update.signature.is_empty());
    }

    #[test]
    fn test_signed_update_rejects_bad_timestamp() {
        let json = r#"{
            "templateId": "0x0b5c26f37b26b02f5b8308cbf02b79bb51fa24da9fd6bee544a289f96c1c9b68",
            "timestamp": "not-a-number",
            "encodedValue": "1"
        }"#;
        assert!(serde_json::from_str::<SignedUpdate>(json).is_err());
    }

    #[test]
    fn test_aggregate_from_prices() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let result = AggregateResult::from_prices(&[price(a, 3000.0), price(b, 3010.0)]);
        assert_eq!(result.sample_count, 2);
        assert_eq!(result.median, Some(3005.0));
        assert_eq!(result.mean, Some(3005.0));
        assert!(!result.is_empty());
    }

    #[test]
    fn test_aggregate_empty() {
        let result = AggregateResult::from_prices(&[]);
        assert!(result.is_empty());
        assert_eq!(result.median, None);
        assert_eq!(result.mean, None);
        assert_eq!(result.sample_count, 0);
    }

    #[test]
    fn test_observed_at() {
        let p = price(Address::zero(), 1.0);
        let at = p.observed_at().unwrap();
        assert_eq!(at.timestamp(), 1_700_000_000);
    }
}
