//! VIN and vehicle-id lookups: canned decode responses resolved against the
//! SQLite fixture catalog.

#![cfg(all(feature = "vin", feature = "sqlite"))]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fitment::core::*;
use fitment::resolve::FitmentEngine;
use fitment::sqlite::SqliteFitmentStore;
use fitment::vindecode::{build_request, decode_response};

const FUSION_SE: &str = "3FAHP0HA6AR123456";
const FUSION_2012: &str = "3FAHP0HA6CR000012";
const UNKNOWN_BASE: &str = "1G1ZB5E00AF000002";
const BAD_CHECKSUM: &str = "1G1ZB5E00AF999999";
const WAGON: &str = "3FAHP0HA6AR777777";

fn response(code: i32, vin: &str, fields: &[(&str, &str)]) -> String {
    let fields: String = fields
        .iter()
        .map(|(name, value)| format!(r#"<Field name="{name}">{value}</Field>"#))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<VinDecodeResponse>
  <ReturnCode>{code}</ReturnCode>
  <Vin>{vin}</Vin>
  <Fields>{fields}</Fields>
</VinDecodeResponse>"#
    )
}

/// Decoder answering from canned response envelopes, keyed by VIN.
struct CannedDecoder {
    responses: HashMap<&'static str, String>,
    calls: AtomicUsize,
}

impl CannedDecoder {
    fn new() -> Self {
        let mut responses = HashMap::new();
        responses.insert(
            FUSION_SE,
            response(
                0,
                FUSION_SE,
                &[
                    ("BaseVehicleID", "5912"),
                    ("SubmodelID", "20"),
                    ("YearID", "2010"),
                    ("DriveTypeID", "6"),
                    ("EngineBaseID", "1002"),
                    ("BodyTypeID", "5"),
                    ("BedLengthID", "3"),
                    ("ValvesID", "0"),
                ],
            ),
        );
        responses.insert(
            FUSION_2012,
            response(
                0,
                FUSION_2012,
                &[("BaseVehicleID", "9100"), ("SubmodelID", "20")],
            ),
        );
        responses.insert(
            UNKNOWN_BASE,
            response(1, UNKNOWN_BASE, &[("BaseVehicleID", "99999")]),
        );
        responses.insert(BAD_CHECKSUM, response(5, BAD_CHECKSUM, &[]));
        responses.insert(
            WAGON,
            response(
                0,
                WAGON,
                &[
                    ("BaseVehicleID", "5912"),
                    ("SubmodelID", "21"),
                    ("BodyTypeID", "7"),
                ],
            ),
        );
        Self {
            responses,
            calls: AtomicUsize::new(0),
        }
    }
}

impl VinDecoder for CannedDecoder {
    fn decode(&self, vin: &str) -> Result<DecodedVehicle, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(vin) {
            Some(xml) => decode_response(xml, vin),
            None => Err(DecodeError::Transport(format!("no canned response for {vin}"))),
        }
    }
}

type Engine =
    FitmentEngine<Arc<SqliteFitmentStore>, Arc<SqliteFitmentStore>, Arc<CannedDecoder>>;

fn setup() -> (Engine, Arc<SqliteFitmentStore>, Arc<CannedDecoder>) {
    let store = Arc::new(SqliteFitmentStore::open_in_memory().unwrap());
    store
        .execute_batch(include_str!("fixtures/seed.sql"))
        .unwrap();
    let decoder = Arc::new(CannedDecoder::new());
    let engine = FitmentEngine::new(
        store.clone(),
        store.clone(),
        decoder.clone(),
        &PartsConfig {
            batch_size: 2,
            max_concurrency: 2,
        },
    )
    .unwrap();
    (engine, store, decoder)
}

fn scope() -> BrandScope {
    BrandScope::new([1, 3])
}

// --- VIN path ---

#[test]
fn vin_resolves_every_matching_vehicle() {
    let (engine, _, _) = setup();
    let lookup = engine.lookup_vin(FUSION_SE, &scope()).unwrap();

    assert_eq!(lookup.status, LookupStatus::Resolved);
    let vehicle_ids: Vec<i64> = lookup.resolved_vehicles.iter().map(|v| v.id).collect();
    assert_eq!(vehicle_ids, vec![1, 11]);
    let part_ids: Vec<i64> = lookup.parts.iter().map(|p| p.id).collect();
    assert_eq!(part_ids, vec![100, 101, 102, 200]);

    let decoded = lookup.decoded_vehicle.as_ref().unwrap();
    assert_eq!(decoded.base_vehicle_external_id, Some(5912));
    assert_eq!(decoded.year_id, Some(2010));
}

#[test]
fn vin_reports_union_of_configurations() {
    let (engine, _, _) = setup();
    let lookup = engine.lookup_vin(FUSION_SE, &scope()).unwrap();

    let config = &lookup.resolved_configuration;
    assert_eq!(config["Drive Type"], vec!["AWD", "FWD"]);
    assert_eq!(config["Engine"], vec!["2.5L L4", "3.0L V6"]);
    assert_eq!(config["Body Type"], vec!["Sedan"]);
}

#[test]
fn vin_maps_decoded_configuration() {
    let (engine, _, _) = setup();
    let lookup = engine.lookup_vin(FUSION_SE, &scope()).unwrap();

    let decoded = lookup.decoded_configuration.as_ref().unwrap();
    assert_eq!(decoded.get("Drive Type"), Some("FWD"));
    assert_eq!(decoded.get("Engine"), Some("2.5L L4"));
    assert_eq!(decoded.get("Body Type"), Some("Sedan"));
    assert_eq!(decoded.len(), 3);

    // no cross-reference for bed length; ValvesID 0 is absent
    assert_eq!(
        lookup.unmapped_attributes,
        vec![UnmappedAttribute {
            type_code: "BedLengthID".into(),
            value: "3".into(),
        }]
    );
}

#[test]
fn vin_is_normalized_before_decoding() {
    let (engine, _, _) = setup();
    let lookup = engine
        .lookup_vin(" 3fahp0ha6ar123456 ", &scope())
        .unwrap();
    assert_eq!(lookup.status, LookupStatus::Resolved);
}

#[test]
fn vin_scope_limits_parts() {
    let (engine, _, _) = setup();
    let lookup = engine
        .lookup_vin(FUSION_SE, &BrandScope::new([3]))
        .unwrap();
    let part_ids: Vec<i64> = lookup.parts.iter().map(|p| p.id).collect();
    assert_eq!(part_ids, vec![200]);
}

#[test]
fn unknown_base_vehicle_is_no_vehicle() {
    let (engine, _, _) = setup();
    let lookup = engine.lookup_vin(UNKNOWN_BASE, &scope()).unwrap();
    assert_eq!(lookup.status, LookupStatus::NoVehicle);
    assert!(lookup.resolved_vehicles.is_empty());
    assert!(lookup.decoded_vehicle.is_some());
}

#[test]
fn vehicle_without_parts_is_no_fitment() {
    let (engine, _, _) = setup();
    let lookup = engine.lookup_vin(FUSION_2012, &scope()).unwrap();
    assert_eq!(lookup.status, LookupStatus::NoFitment);
    assert_eq!(lookup.resolved_vehicles.len(), 1);
    assert!(lookup.parts.is_empty());
}

#[test]
fn decode_failure_is_an_error() {
    let (engine, _, _) = setup();
    let err = engine.lookup_vin(BAD_CHECKSUM, &scope()).unwrap_err();
    assert!(matches!(
        err,
        FitmentError::Decode(DecodeError::InvalidChecksum)
    ));
    assert!(!err.is_client_error());
}

#[test]
fn malformed_vin_never_reaches_the_decoder() {
    let (engine, _, decoder) = setup();
    for vin in ["", "3FAHP0HA6AR12345", "3FAHP0HA6AR12345O", "3FAHP0HA6AR-23456"] {
        let err = engine.lookup_vin(vin, &scope()).unwrap_err();
        assert!(err.is_client_error(), "{vin:?} should be rejected");
    }
    assert_eq!(decoder.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn empty_scope_is_rejected_before_decoding() {
    let (engine, _, decoder) = setup();
    assert!(engine.lookup_vin(FUSION_SE, &BrandScope::default()).is_err());
    assert_eq!(decoder.calls.load(Ordering::SeqCst), 0);
}

// --- Cross-reference snapshot ---

#[test]
fn cross_reference_loads_on_first_vin_lookup() {
    let (engine, _, _) = setup();
    assert!(engine.cross_reference().is_none());
    engine.lookup_vin(FUSION_SE, &scope()).unwrap();
    let xref = engine.cross_reference().unwrap();
    assert_eq!(xref.len(), 5);
    assert_eq!(xref.get("DriveTypeID", "1"), Some(("Drive Type", "AWD")));
}

#[test]
fn reload_picks_up_new_master_data() {
    let (engine, store, _) = setup();
    let before = engine.lookup_vin(WAGON, &scope()).unwrap();
    assert_eq!(before.unmapped_attributes.len(), 1);

    store
        .execute_batch("INSERT INTO config_attribute VALUES (7, 3, 'Wagon', '7');")
        .unwrap();
    // the snapshot is unchanged until reloaded
    let stale = engine.lookup_vin(WAGON, &scope()).unwrap();
    assert_eq!(stale.unmapped_attributes.len(), 1);

    let xref = engine.reload_cross_reference().unwrap();
    assert_eq!(xref.len(), 6);
    let after = engine.lookup_vin(WAGON, &scope()).unwrap();
    assert!(after.unmapped_attributes.is_empty());
    assert_eq!(
        after.decoded_configuration.unwrap().get("Body Type"),
        Some("Wagon")
    );
}

// --- Vehicle path ---

#[test]
fn vehicle_parts_for_known_vehicle() {
    let (engine, _, _) = setup();
    let lookup = engine.vehicle_parts(11, &scope()).unwrap();
    assert_eq!(lookup.status, LookupStatus::Resolved);
    let part_ids: Vec<i64> = lookup.parts.iter().map(|p| p.id).collect();
    assert_eq!(part_ids, vec![102, 200]);
    assert_eq!(lookup.resolved_vehicles.len(), 1);
    assert_eq!(lookup.resolved_configuration["Drive Type"], vec!["AWD"]);
    assert!(lookup.decoded_vehicle.is_none());
}

#[test]
fn vehicle_parts_for_unknown_vehicle() {
    let (engine, _, _) = setup();
    let lookup = engine.vehicle_parts(999, &scope()).unwrap();
    assert_eq!(lookup.status, LookupStatus::NoVehicle);
}

#[test]
fn vehicle_parts_without_fitment() {
    let (engine, _, _) = setup();
    let lookup = engine.vehicle_parts(10, &scope()).unwrap();
    assert_eq!(lookup.status, LookupStatus::NoFitment);
}

#[test]
fn vehicle_id_must_be_positive() {
    let (engine, _, _) = setup();
    let err = engine.vehicle_parts(0, &scope()).unwrap_err();
    assert!(matches!(
        err,
        FitmentError::InvalidInput {
            field: "vehicle_id",
            ..
        }
    ));
}

// --- Request envelope ---

#[test]
fn request_envelope_layout() {
    let xml = build_request(FUSION_SE, &["BaseVehicleID", "DriveTypeID"]).unwrap();
    insta::assert_snapshot!(xml, @r#"
    <?xml version="1.0" encoding="UTF-8"?>
    <VinDecodeRequest>
      <Vin>3FAHP0HA6AR123456</Vin>
      <RequestedFields>
        <Field>BaseVehicleID</Field>
        <Field>DriveTypeID</Field>
      </RequestedFields>
    </VinDecodeRequest>
    "#);
}
