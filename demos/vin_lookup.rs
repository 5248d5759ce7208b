//! Decode a VIN with the configured service and list the fitting parts.
//!
//! ```text
//! FITMENT_VIN_DECODE_SECRET=... cargo run --example vin_lookup --features vin,sqlite -- \
//!     fitment.toml 3FAHP0HA6AR123456 1,3
//! ```

use std::sync::Arc;

use fitment::core::*;
use fitment::resolve::FitmentEngine;
use fitment::sqlite::SqliteFitmentStore;
use fitment::vindecode::VinDecodeClient;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fitment=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(config_path), Some(vin)) = (args.next(), args.next()) else {
        eprintln!("usage: vin_lookup <config.toml> <vin> [brand,brand,...]");
        std::process::exit(2);
    };
    let brands: Vec<i64> = args
        .next()
        .unwrap_or_else(|| "1".to_string())
        .split(',')
        .map(|b| b.trim().parse())
        .collect::<Result<_, _>>()?;

    let config = FitmentConfig::load(&config_path)?;
    let store = Arc::new(SqliteFitmentStore::from_config(&config.store)?);
    let decoder = VinDecodeClient::new(config.vin_decode.clone())?;
    let engine = FitmentEngine::new(store.clone(), store, decoder, &config.parts)?;

    let lookup = engine.lookup_vin(&vin, &BrandScope::new(brands))?;
    println!("{}", serde_json::to_string_pretty(&lookup)?);
    Ok(())
}
