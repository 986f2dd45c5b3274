use bson::oid::ObjectId;
use serde_json::json;

use etl_core::integrate::integrate;
use etl_core::{Cell, KeySpec, RecordSet};

fn spec() -> KeySpec {
    KeySpec::new(
        "pais",
        vec![
            "pais".to_string(),
            "país".to_string(),
            "nombre_pais".to_string(),
            "country".to_string(),
        ],
    )
}

fn population() -> RecordSet {
    let mut set = RecordSet::new(vec!["pais".to_string(), "pop".to_string()]);
    set.push_row(vec![Cell::Text("Peru".to_string()), Cell::Int(100)]);
    set
}

fn aging() -> RecordSet {
    let mut set = RecordSet::new(vec!["nombre_pais".to_string(), "tasa".to_string()]);
    set.push_row(vec![Cell::Text(" PERU ".to_string()), Cell::Int(5)]);
    set
}

#[test]
fn relational_tables_join_on_the_normalized_key() {
    let unified = integrate(population(), aging(), "envejecimiento", Vec::new(), &spec());

    assert_eq!(unified.len(), 1);
    assert_eq!(unified.columns(), ["pais", "pop", "tasa"]);
    assert_eq!(
        unified.rows()[0],
        vec![Cell::Text("peru".to_string()), Cell::Int(100), Cell::Int(5)]
    );
}

#[test]
fn document_collections_fold_in_with_suffixes_and_coercion() {
    let oid = ObjectId::new();
    let mut costos = RecordSet::new(vec![
        "_id".to_string(),
        "país".to_string(),
        "costos".to_string(),
        "pop".to_string(),
    ]);
    costos.push_row(vec![
        Cell::Id(oid),
        Cell::Text("Perú ".to_string()),
        Cell::Nested(json!({"hotel": 80})),
        Cell::Int(99),
    ]);

    let unified = integrate(
        population(),
        aging(),
        "envejecimiento",
        vec![("costos_turisticos".to_string(), costos)],
        &spec(),
    );

    // "perú" and "peru" are distinct keys: no accent folding, so the
    // fold-in appends a second row rather than matching.
    assert_eq!(unified.len(), 2);
    assert_eq!(
        unified.columns(),
        ["pais", "pop", "tasa", "_id", "costos", "pop_costos_turisticos"]
    );

    let peru = unified
        .rows()
        .iter()
        .find(|r| r[0] == Cell::Text("peru".to_string()))
        .unwrap();
    assert_eq!(peru[3], Cell::Null);

    let acc = unified
        .rows()
        .iter()
        .find(|r| r[0] == Cell::Text("perú".to_string()))
        .unwrap();
    assert_eq!(acc[1], Cell::Null);
    assert_eq!(acc[3], Cell::Text(oid.to_hex()));
    let Cell::Text(costos_json) = &acc[4] else {
        panic!("nested document was not coerced to text");
    };
    assert!(costos_json.contains("hotel"));
    assert_eq!(acc[5], Cell::Int(99));
}

#[test]
fn collections_without_a_country_field_are_skipped() {
    let mut keyless = RecordSet::new(vec!["precio".to_string()]);
    keyless.push_row(vec![Cell::Float(3.5)]);

    let unified = integrate(
        population(),
        aging(),
        "envejecimiento",
        vec![("paises_bigmac".to_string(), keyless)],
        &spec(),
    );

    // the fold-in is skipped, not fatal, and contributes nothing
    assert_eq!(unified.len(), 1);
    assert_eq!(unified.columns(), ["pais", "pop", "tasa"]);
}

#[test]
fn incomplete_rows_are_dropped_before_joining() {
    let mut population = population();
    population.push_row(vec![Cell::Text("Chile".to_string()), Cell::Null]);

    let unified = integrate(population, aging(), "envejecimiento", Vec::new(), &spec());

    assert_eq!(unified.len(), 1);
    assert_eq!(unified.rows()[0][0], Cell::Text("peru".to_string()));
}
