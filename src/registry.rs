//! dAPI descriptor resolution
//!
//! Two chained read-only contract calls turn a human-readable dAPI name into
//! the set of beacons backing it: Api3ServerV1 maps the hashed name to a
//! data feed ID, and the AirseekerRegistry maps that ID to an ABI-encoded
//! `(address[], bytes32[])` pair of Airnodes and template IDs.

use crate::config::ChainConfig;
use crate::error::{FeedError, Result};
use crate::types::{BeaconRef, FeedDescriptor};
use async_trait::async_trait;
use ethers::abi::{self, ParamType, Token};
use ethers::contract::abigen;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, Bytes, H256};
use ethers::utils::{format_bytes32_string, keccak256};
use std::sync::Arc;
use tracing::{debug, info};

abigen!(
    Api3ServerV1,
    r#"[
        function dapiNameHashToDataFeedId(bytes32 dapiNameHash) external view returns (bytes32)
    ]"#
);

abigen!(
    AirseekerRegistry,
    r#"[
        function dataFeedIdToDetails(bytes32 dataFeedId) external view returns (bytes details)
    ]"#
);

/// Read-only view of the two on-chain registries.
#[async_trait]
pub trait RegistryReader: Send + Sync {
    /// Api3ServerV1 `dapiNameHashToDataFeedId`.
    async fn data_feed_id(&self, dapi_name_hash: H256) -> Result<H256>;

    /// AirseekerRegistry `dataFeedIdToDetails`.
    async fn data_feed_details(&self, data_feed_id: H256) -> Result<Bytes>;
}

/// Registry reader backed by a JSON-RPC provider.
pub struct OnChainRegistry {
    server: Api3ServerV1<Provider<Http>>,
    registry: AirseekerRegistry<Provider<Http>>,
}

impl OnChainRegistry {
    pub fn connect(chain: &ChainConfig) -> Result<Self> {
        let provider = Provider::<Http>::try_from(chain.rpc_url.as_str())
            .map_err(|e| FeedError::Config(format!("invalid RPC URL {:?}: {e}", chain.rpc_url)))?;
        let provider = Arc::new(provider);

        let server_address: Address = chain
            .api3_server_v1
            .parse()
            .map_err(|e| FeedError::Config(format!("invalid Api3ServerV1 address: {e}")))?;
        let registry_address: Address = chain
            .airseeker_registry
            .parse()
            .map_err(|e| FeedError::Config(format!("invalid AirseekerRegistry address: {e}")))?;

        Ok(Self {
            server: Api3ServerV1::new(server_address, Arc::clone(&provider)),
            registry: AirseekerRegistry::new(registry_address, provider),
        })
    }
}

#[async_trait]
impl RegistryReader for OnChainRegistry {
    async fn data_feed_id(&self, dapi_name_hash: H256) -> Result<H256> {
        let id = self
            .server
            .dapi_name_hash_to_data_feed_id(dapi_name_hash.to_fixed_bytes())
            .call()
            .await
            .map_err(|e| FeedError::Rpc(e.to_string()))?;
        Ok(H256::from(id))
    }

    async fn data_feed_details(&self, data_feed_id: H256) -> Result<Bytes> {
        self.registry
            .data_feed_id_to_details(data_feed_id.to_fixed_bytes())
            .call()
            .await
            .map_err(|e| FeedError::Rpc(e.to_string()))
    }
}

/// Encode a dAPI name into its fixed 32-byte, null-padded on-chain form.
pub fn encode_dapi_name(dapi_name: &str) -> Result<[u8; 32]> {
    format_bytes32_string(dapi_name)
        .map_err(|e| FeedError::DapiName(format!("{dapi_name:?}: {e}")))
}

/// Keccak-256 of the encoded dAPI name; the Api3ServerV1 lookup key.
pub fn dapi_name_hash(dapi_name: &str) -> Result<H256> {
    Ok(H256::from(keccak256(encode_dapi_name(dapi_name)?)))
}

/// Decode a data feed details blob into its beacon references.
///
/// The two decoded arrays are positionally paired; a length mismatch means
/// the registry handed back something we cannot interpret.
pub fn decode_data_feed_details(details: &[u8]) -> Result<Vec<BeaconRef>> {
    let tokens = abi::decode(
        &[
            ParamType::Array(Box::new(ParamType::Address)),
            ParamType::Array(Box::new(ParamType::FixedBytes(32))),
        ],
        details,
    )
    .map_err(|e| FeedError::Descriptor(format!("ABI decode failed: {e}")))?;

    let mut tokens = tokens.into_iter();
    let (Some(Token::Array(airnodes)), Some(Token::Array(template_ids))) =
        (tokens.next(), tokens.next())
    else {
        return Err(FeedError::Descriptor(
            "details blob is not (address[], bytes32[])".to_string(),
        ));
    };

    if airnodes.len() != template_ids.len() {
        return Err(FeedError::Descriptor(format!(
            "airnode/template count mismatch: {} vs {}",
            airnodes.len(),
            template_ids.len()
        )));
    }

    airnodes
        .into_iter()
        .zip(template_ids)
        .map(|pair| match pair {
            (Token::Address(airnode), Token::FixedBytes(raw)) if raw.len() == 32 => Ok(BeaconRef {
                airnode,
                template_id: H256::from_slice(&raw),
            }),
            other => Err(FeedError::Descriptor(format!(
                "unexpected beacon tokens: {other:?}"
            ))),
        })
        .collect()
}

/// Resolve a dAPI name to its full descriptor.
///
/// Any failure here is fatal for the run; there is nothing to aggregate
/// without a descriptor.
pub async fn resolve_dapi<R: RegistryReader + ?Sized>(
    registry: &R,
    dapi_name: &str,
) -> Result<FeedDescriptor> {
    let name_hash = dapi_name_hash(dapi_name)?;
    debug!("dAPI name hash for {dapi_name:?}: {name_hash:?}");

    let data_feed_id = registry.data_feed_id(name_hash).await?;
    if data_feed_id.is_zero() {
        return Err(FeedError::UnregisteredDapi(dapi_name.to_string()));
    }

    let details = registry.data_feed_details(data_feed_id).await?;
    if details.is_empty() {
        return Err(FeedError::Descriptor(format!(
            "empty details blob for data feed {data_feed_id:?}"
        )));
    }

    let beacons = decode_data_feed_details(&details)?;
    info!(
        "resolved dAPI {} to {} beacon(s) (data feed {data_feed_id:?})",
        dapi_name,
        beacons.len()
    );

    Ok(FeedDescriptor {
        dapi_name: dapi_name.to_string(),
        data_feed_id,
        beacons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    struct MockRegistry {
        feed_id: H256,
        details: Bytes,
    }

    #[async_trait]
    impl RegistryReader for MockRegistry {
        async fn data_feed_id(&self, _dapi_name_hash: H256) -> Result<H256> {
            Ok(self.feed_id)
        }

        async fn data_feed_details(&self, _data_feed_id: H256) -> Result<Bytes> {
            Ok(self.details.clone())
        }
    }

    fn encode_details(beacons: &[(Address, H256)]) -> Bytes {
        let airnodes = beacons
            .iter()
            .map(|(a, _)| Token::Address(*a))
            .collect::<Vec<_>>();
        let template_ids = beacons
            .iter()
            .map(|(_, t)| Token::FixedBytes(t.as_bytes().to_vec()))
            .collect::<Vec<_>>();
        abi::encode(&[Token::Array(airnodes), Token::Array(template_ids)]).into()
    }

    #[test]
    fn test_encode_dapi_name() {
        let encoded = encode_dapi_name("ETH/USD").unwrap();
        assert_eq!(
            hex::encode(encoded),
            "4554482f55534400000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_encode_dapi_name_too_long() {
        let long = "X".repeat(40);
        assert!(matches!(
            encode_dapi_name(&long),
            Err(FeedError::DapiName(_))
        ));
    }

    #[test]
    fn test_dapi_name_hash() {
        let hash = dapi_name_hash("ETH/USD").unwrap();
        let expected =
            H256::from_str("0x9e6138f8f57d7b493a8364edb0a0ac92399dfd890eecb9121050836a1749ba42")
                .unwrap();
        assert_eq!(hash, expected);
    }

    #[test]
    fn test_decode_details_pairs_positionally() {
        let beacons = vec![
            (Address::repeat_byte(0x11), H256::repeat_byte(0xa1)),
            (Address::repeat_byte(0x22), H256::repeat_byte(0xa2)),
            (Address::repeat_byte(0x33), H256::repeat_byte(0xa3)),
        ];
        let decoded = decode_data_feed_details(&encode_details(&beacons)).unwrap();
        assert_eq!(decoded.len(), 3);
        for (beacon, (airnode, template_id)) in decoded.iter().zip(&beacons) {
            assert_eq!(beacon.airnode, *airnode);
            assert_eq!(beacon.template_id, *template_id);
        }
    }

    #[test]
    fn test_decode_details_rejects_garbage() {
        assert!(matches!(
            decode_data_feed_details(&[0xde, 0xad, 0xbe, 0xef]),
            Err(FeedError::Descriptor(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_dapi() {
        let beacons = vec![(Address::repeat_byte(0x11), H256::repeat_byte(0xa1))];
        let registry = MockRegistry {
            feed_id: H256::repeat_byte(0x42),
            details: encode_details(&beacons),
        };

        let descriptor = resolve_dapi(&registry, "ETH/USD").await.unwrap();
        assert_eq!(descriptor.dapi_name, "ETH/USD");
        assert_eq!(descriptor.data_feed_id, H256::repeat_byte(0x42));
        assert_eq!(descriptor.beacons.len(), 1);
        assert_eq!(descriptor.beacons[0].airnode, Address::repeat_byte(0x11));
    }

    #[tokio::test]
    async fn test_resolve_unregistered_dapi() {
        let registry = MockRegistry {
            feed_id: H256::zero(),
            details: Bytes::default(),
        };

        assert!(matches!(
            resolve_dapi(&registry, "NOT/REGISTERED").await,
            Err(FeedError::UnregisteredDapi(name)) if name == "NOT/REGISTERED"
        ));
    }

    #[tokio::test]
    async fn test_resolve_empty_details_is_fatal() {
        let registry = MockRegistry {
            feed_id: H256::repeat_byte(0x42),
            details: Bytes::default(),
        };

        assert!(matches!(
            resolve_dapi(&registry, "ETH/USD").await,
            Err(FeedError::Descriptor(_))
        ));
    }
}
