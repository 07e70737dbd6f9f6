//! Signed API client
//!
//! Fetches the public OEV update document for one Airnode. The document is
//! a JSON object whose `data` map holds signed updates keyed by internal
//! IDs; only the values matter and their order is not guaranteed.

use crate::error::{FeedError, Result};
use crate::types::SignedUpdate;
use async_trait::async_trait;
use ethers::types::Address;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Source of signed updates for a beacon (allows mocking).
#[async_trait]
pub trait SignedDataSource: Send + Sync {
    async fn latest_updates(&self, airnode: Address) -> Result<Vec<SignedUpdate>>;
}

#[derive(Debug, Deserialize)]
struct SignedDataDocument {
    data: HashMap<String, SignedUpdate>,
}

/// HTTP client for the signed API.
pub struct SignedApiClient {
    http: Client,
    base_url: String,
}

impl SignedApiClient {
    /// Create a client with a bounded per-request timeout so one
    /// unresponsive Airnode cannot stall the whole run.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SignedDataSource for SignedApiClient {
    async fn latest_updates(&self, airnode: Address) -> Result<Vec<SignedUpdate>> {
        let url = format!("{}/{:#x}", self.base_url, airnode);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Api {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let document: SignedDataDocument = serde_json::from_str(&body)?;
        debug!(
            "signed API served {} update(s) for {airnode:?}",
            document.data.len()
        );

        Ok(document.data.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_parsing() {
        let body = r#"{
            "count": 2,
            "data": {
                "beacon-1": {
                    "airnode": "0xc52EeA00154B4fF1EbbF8Ba39FDe37F1AC3B9Fd4",
                    "templateId": "0x0b5c26f37b26b02f5b8308cbf02b79bb51fa24da9fd6bee544a289f96c1c9b68",
                    "timestamp": "1700000100",
                    "encodedValue": "0x00000000000000000000000000000000000000000000003635c9adc5dea00000",
                    "signature": "0xaabb"
                },
                "beacon-2": {
                    "templateId": "0x1b5c26f37b26b02f5b8308cbf02b79bb51fa24da9fd6bee544a289f96c1c9b68",
                    "timestamp": 1700000200,
                    "encodedValue": "1500000000000000000000"
                }
            }
        }"#;
        let document: SignedDataDocument = serde_json::from_str(body).unwrap();
        assert_eq!(document.data.len(), 2);

        let timestamps: Vec<u64> = document.data.values().map(|u| u.timestamp).collect();
        assert!(timestamps.contains(&1_700_000_100));
        assert!(timestamps.contains(&1_700_000_200));
    }

    #[test]
    fn test_document_with_no_updates() {
        let document: SignedDataDocument = serde_json::from_str(r#"{"data":{}}"#).unwrap();
        assert!(document.data.is_empty());
    }

    #[test]
    fn test_document_missing_data_is_an_error() {
        assert!(serde_json::from_str::<SignedDataDocument>(r#"{"count":0}"#).is_err());
    }

    #[test]
    fn test_client_url_shape() {
        let client = SignedApiClient::new(
            "https://signed-api.api3.org/public-oev/",
            Duration::from_secs(5),
        )
        .unwrap();
        // Trailing slash is normalized away so the airnode segment joins cleanly.
        assert_eq!(client.base_url, "https://signed-api.api3.org/public-oev");
    }
}
