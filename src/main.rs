//! dAPI beacon price reader
//!
//! Resolves a dAPI name on-chain, reads each beacon's latest signed OEV
//! update, and prints the aggregated price.

use clap::{Parser, Subcommand};
use dapi_aggregator::{
    aggregator::FeedAggregator,
    config::Config,
    oev::derive_oev_template_id,
    registry::{self, OnChainRegistry},
    signed_api::SignedApiClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dapi-aggregator")]
#[command(about = "Read and aggregate the latest signed beacon prices for an API3 dAPI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (defaults to config.toml if present)
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a dAPI and aggregate its latest signed prices
    Aggregate {
        /// dAPI name (defaults to the configured feed)
        dapi: Option<String>,
    },
    /// Show the beacons backing a dAPI without fetching prices
    Beacons {
        /// dAPI name (defaults to the configured feed)
        dapi: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    match cli.command {
        Commands::Aggregate { dapi } => {
            let name = dapi.unwrap_or_else(|| config.feed.dapi_name.clone());
            aggregate(config, &name).await
        }
        Commands::Beacons { dapi } => {
            let name = dapi.unwrap_or_else(|| config.feed.dapi_name.clone());
            show_beacons(config, &name).await
        }
    }
}

async fn aggregate(config: Config, dapi_name: &str) -> anyhow::Result<()> {
    let registry = OnChainRegistry::connect(&config.chain)?;
    let signed_api =
        SignedApiClient::new(&config.signed_api.base_url, config.signed_api.fetch_timeout())?;
    let feed = FeedAggregator::new(registry, signed_api);

    let encoded = registry::encode_dapi_name(dapi_name)?;
    println!("\n📡 dAPI: {}", dapi_name);
    println!("Encoded name: 0x{}", hex::encode(encoded));
    println!("Name hash:    {:?}", registry::dapi_name_hash(dapi_name)?);

    let snapshot = feed.run(dapi_name).await?;
    println!("Data feed ID: {:?}", snapshot.descriptor.data_feed_id);

    println!("\nBeacon prices:");
    for price in &snapshot.prices {
        let observed = price
            .observed_at()
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| price.timestamp.to_string());
        println!("  {:?}  ${:.2}  ({})", price.airnode, price.price_usd, observed);
    }
    for failure in &snapshot.failures {
        println!("  {:?}  excluded: {}", failure.airnode, failure.error);
    }

    if snapshot.aggregate.is_empty() {
        println!("\nNo beacon produced a price; nothing to aggregate.");
        return Ok(());
    }

    println!(
        "\nMedian: ${:.2}  Mean: ${:.2}  Samples: {}/{}",
        snapshot.aggregate.median.unwrap_or_default(),
        snapshot.aggregate.mean.unwrap_or_default(),
        snapshot.aggregate.sample_count,
        snapshot.descriptor.beacons.len()
    );

    Ok(())
}

async fn show_beacons(config: Config, dapi_name: &str) -> anyhow::Result<()> {
    let registry = OnChainRegistry::connect(&config.chain)?;
    let descriptor = registry::resolve_dapi(&registry, dapi_name).await?;

    println!("\n📡 Beacons for {}:", dapi_name);
    println!("Data feed ID: {:?}\n", descriptor.data_feed_id);

    for (i, beacon) in descriptor.beacons.iter().enumerate() {
        println!("Beacon {}:", i + 1);
        println!("  Airnode:         {:?}", beacon.airnode);
        println!("  Template ID:     {:?}", beacon.template_id);
        println!(
            "  OEV template ID: {:?}",
            derive_oev_template_id(beacon.template_id)
        );
    }

    Ok(())
}
