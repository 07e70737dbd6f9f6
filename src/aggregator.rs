//! Pipeline orchestration
//!
//! Resolves the dAPI once, then fans the per-beacon work out as independent
//! tasks: derive the OEV template ID, fetch the signed document, select the
//! freshest matching update, decode its value. Beacon failures are recorded
//! and never abort the run; only resolution failures do.

use crate::error::{FeedError, Result};
use crate::oev::derive_oev_template_id;
use crate::registry::{resolve_dapi, RegistryReader};
use crate::selector::{decode_price, select_latest};
use crate::signed_api::SignedDataSource;
use crate::types::{AggregateResult, BeaconFailure, BeaconPrice, BeaconRef, FeedSnapshot};
use futures_util::future::join_all;
use tracing::{info, warn};

pub struct FeedAggregator<R, S> {
    registry: R,
    signed_api: S,
}

impl<R: RegistryReader, S: SignedDataSource> FeedAggregator<R, S> {
    pub fn new(registry: R, signed_api: S) -> Self {
        Self {
            registry,
            signed_api,
        }
    }

    /// Run the full pipeline for one dAPI name.
    ///
    /// Beacons are fetched concurrently; `join_all` hands results back in
    /// beacon order, so completion order never leaks into the snapshot.
    pub async fn run(&self, dapi_name: &str) -> Result<FeedSnapshot> {
        let descriptor = resolve_dapi(&self.registry, dapi_name).await?;

        let outcomes = join_all(
            descriptor
                .beacons
                .iter()
                .map(|beacon| self.collect_beacon(beacon)),
        )
        .await;

        let mut prices = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(price) => prices.push(price),
                Err(failure) => {
                    warn!(
                        "beacon {:?} excluded from aggregate: {}",
                        failure.airnode, failure.error
                    );
                    failures.push(failure);
                }
            }
        }

        let aggregate = AggregateResult::from_prices(&prices);
        info!(
            "aggregated {} of {} beacon(s) for {}",
            aggregate.sample_count,
            descriptor.beacons.len(),
            dapi_name
        );

        Ok(FeedSnapshot {
            descriptor,
            prices,
            failures,
            aggregate,
        })
    }

    async fn collect_beacon(
        &self,
        beacon: &BeaconRef,
    ) -> std::result::Result<BeaconPrice, BeaconFailure> {
        let fail = |error: FeedError| BeaconFailure {
            airnode: beacon.airnode,
            error,
        };

        let oev_template_id = derive_oev_template_id(beacon.template_id);

        let updates = self
            .signed_api
            .latest_updates(beacon.airnode)
            .await
            .map_err(fail)?;

        let update =
            select_latest(&updates, oev_template_id).ok_or_else(|| fail(FeedError::NoMatchingUpdate))?;

        let (price_usd, price_exact) = decode_price(update).map_err(fail)?;

        Ok(BeaconPrice {
            airnode: beacon.airnode,
            price_usd,
            price_exact,
            timestamp: update.timestamp,
        })
    }
}
