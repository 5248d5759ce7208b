use std::collections::BTreeMap;
use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use fitment::core::*;
use fitment::resolve::{CrossReference, FitmentEngine, sort_names};
use fitment::sqlite::SqliteFitmentStore;

struct StaticDecoder;

impl VinDecoder for StaticDecoder {
    fn decode(&self, vin: &str) -> Result<DecodedVehicle, DecodeError> {
        let mut attributes = BTreeMap::new();
        attributes.insert("DriveTypeID".to_string(), AttributeValue::Code(1));
        attributes.insert("EngineBaseID".to_string(), AttributeValue::Code(2));
        Ok(DecodedVehicle {
            vin: vin.to_string(),
            base_vehicle_external_id: Some(1_001),
            submodel_external_id: Some(1),
            external_config_attributes: attributes,
            ..Default::default()
        })
    }
}

/// Ten makes with ten models each, four styles per model and three parts per
/// vehicle across two brands.
fn seeded_store() -> Arc<SqliteFitmentStore> {
    let store = Arc::new(SqliteFitmentStore::open_in_memory().unwrap());
    let mut sql = String::from(
        "INSERT INTO config_attribute_type VALUES (1, 'Drive Type', 'DriveTypeID'), (2, 'Engine', 'EngineBaseID');
         INSERT INTO config_attribute VALUES (1, 1, 'AWD', '1'), (2, 2, '2.0L', '2');
         INSERT INTO submodel VALUES (1, 1, 'Base'), (2, 2, 'Sport'), (3, 3, 'Touring'), (4, 4, 'Limited');\n",
    );
    let mut vehicle = 0;
    let mut part = 0;
    for make in 1..=10 {
        sql.push_str(&format!("INSERT INTO make VALUES ({make}, 'Make {make}', {make});\n"));
        for m in 1..=10 {
            let model = make * 100 + m;
            let base = model + 1_000 - 100;
            sql.push_str(&format!(
                "INSERT INTO model VALUES ({model}, 'Model {m}', {model});
                 INSERT INTO base_vehicle VALUES ({base}, {base}, {}, {make}, {model});\n",
                2000 + m
            ));
            for submodel in 1..=4 {
                vehicle += 1;
                sql.push_str(&format!(
                    "INSERT INTO vehicle VALUES ({vehicle}, {base}, {submodel});
                     INSERT INTO vehicle_config_attribute VALUES ({vehicle}, 1), ({vehicle}, 2);\n"
                ));
                for _ in 0..3 {
                    part += 1;
                    sql.push_str(&format!(
                        "INSERT INTO part VALUES ({part}, {}, 800, 'Part {part}');
                         INSERT INTO vehicle_part VALUES ({vehicle}, {part});\n",
                        part % 2 + 1
                    ));
                }
            }
        }
    }
    store.execute_batch(&sql).unwrap();
    store
}

fn bench_lookups(c: &mut Criterion) {
    let store = seeded_store();
    let engine =
        FitmentEngine::new(store.clone(), store, StaticDecoder, &PartsConfig::default()).unwrap();
    let scope = BrandScope::new([1, 2]);

    c.bench_function("cascade_years", |b| {
        b.iter(|| engine.cascade(black_box(&CascadeQuery::new()), &scope).unwrap())
    });

    let terminal = CascadeQuery::new()
        .year("2001")
        .make("Make 1")
        .model("Model 1")
        .style("All");
    c.bench_function("cascade_terminal", |b| {
        b.iter(|| engine.cascade(black_box(&terminal), &scope).unwrap())
    });

    c.bench_function("lookup_vin", |b| {
        b.iter(|| {
            engine
                .lookup_vin(black_box("1FAHP3FN8AW123456"), &scope)
                .unwrap()
        })
    });
}

fn bench_cross_reference(c: &mut Criterion) {
    let types: Vec<ConfigAttributeType> = (1..=30)
        .map(|id| ConfigAttributeType {
            id,
            name: format!("Type {id}"),
            external_type_code: Some(format!("Type{id}ID")),
        })
        .collect();
    let attributes: Vec<ConfigAttribute> = (1..=3_000)
        .map(|id| ConfigAttribute {
            id,
            type_id: id % 30 + 1,
            value: format!("Value {id}"),
            external_value_code: Some(id.to_string()),
        })
        .collect();

    c.bench_function("cross_reference_build_3000", |b| {
        b.iter(|| CrossReference::build(black_box(&types), black_box(&attributes)))
    });

    let xref = CrossReference::build(&types, &attributes);
    let decoded: BTreeMap<String, AttributeValue> = (1..=30)
        .map(|i| (format!("Type{i}ID"), AttributeValue::Code(i * 7)))
        .collect();
    c.bench_function("cross_reference_map_30", |b| {
        b.iter(|| xref.map(black_box(&decoded)))
    });
}

fn bench_sorting(c: &mut Criterion) {
    let names: Vec<String> = (0..500)
        .map(|i| {
            if i % 3 == 0 {
                format!("model {i}")
            } else {
                format!("Model {i}")
            }
        })
        .collect();
    c.bench_function("sort_names_500", |b| {
        b.iter(|| sort_names(black_box(names.clone())))
    });
}

criterion_group!(benches, bench_lookups, bench_cross_reference, bench_sorting);
criterion_main!(benches);
