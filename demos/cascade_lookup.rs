//! Walk a year → make → model → style cascade against a small in-memory
//! catalog.
//!
//! Run with: `RUST_LOG=fitment=debug cargo run --example cascade_lookup --features sqlite`

use std::sync::Arc;

use fitment::core::*;
use fitment::resolve::FitmentEngine;
use fitment::sqlite::SqliteFitmentStore;
use tracing_subscriber::EnvFilter;

const CATALOG: &str = "
    INSERT INTO make VALUES (1, 'Ford', 54), (2, 'Chevrolet', 47);
    INSERT INTO model VALUES (1, 'Fusion', 1030), (2, 'Malibu', 777);
    INSERT INTO base_vehicle VALUES (1, 5912, 2010, 1, 1), (2, 6001, 2010, 2, 2);
    INSERT INTO submodel VALUES (1, 20, 'SE'), (2, 21, 'SEL'), (3, 30, 'LT');
    INSERT INTO vehicle VALUES (1, 1, 1), (2, 1, 2), (3, 2, 3);
    INSERT INTO part VALUES
        (100, 1, 800, 'Class II receiver hitch'),
        (101, 1, 900, 'Hitch wiring harness'),
        (200, 3, 800, 'LED tail light');
    INSERT INTO vehicle_part VALUES (1, 100), (1, 101), (2, 100), (3, 200);
";

/// Cascades never decode VINs.
struct Unused;

impl VinDecoder for Unused {
    fn decode(&self, _vin: &str) -> Result<DecodedVehicle, DecodeError> {
        Err(DecodeError::Transport("VIN decoding is not configured".into()))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = Arc::new(SqliteFitmentStore::open_in_memory()?);
    store.execute_batch(CATALOG)?;
    let engine = FitmentEngine::new(store.clone(), store, Unused, &PartsConfig::default())?;
    let scope = BrandScope::new([1, 3]);

    let mut query = CascadeQuery::new();
    loop {
        let lookup = engine.cascade(&query, &scope)?;
        match lookup.status {
            LookupStatus::Options(Dimension::Year) => {
                println!("years:  {:?}", lookup.available_years);
                let Some(year) = lookup.available_years.first() else {
                    break;
                };
                query = query.year(year.to_string());
            }
            LookupStatus::Options(dimension) => {
                let options = match dimension {
                    Dimension::Make => &lookup.available_makes,
                    Dimension::Model => &lookup.available_models,
                    _ => &lookup.available_styles,
                };
                println!("{dimension}: {options:?}");
                // vehicles without a submodel only surface under "All"
                let choice = options
                    .first()
                    .cloned()
                    .unwrap_or_else(|| fitment::resolve::ALL_STYLES.to_string());
                query = match dimension {
                    Dimension::Make => query.make(choice),
                    Dimension::Model => query.model(choice),
                    _ => query.style(choice),
                };
            }
            status => {
                println!("{status:?} for {:?}", lookup.selection);
                for part in &lookup.parts {
                    println!(
                        "  #{} brand {}: {}",
                        part.id,
                        part.brand_id,
                        part.short_description.as_deref().unwrap_or("-")
                    );
                }
                break;
            }
        }
    }
    Ok(())
}
