use catalog_harvester::features::{load_snapshot, SnapshotWriter};
use catalog_harvester::{CaptureAggregator, SourceLabel};
use serde_json::json;
use tokio_test::assert_ok;

#[test]
fn listing_then_detail_from_both_sources_builds_one_record() {
    let agg = CaptureAggregator::new();

    agg.submit(
        &json!({"productos": [
            {"id_producto": "7", "descripcion": "X", "stock": "5"},
            {"id_producto": 8, "descripcion": "Y"}
        ]}),
        SourceLabel::Network,
    );
    agg.set_awaited(Some("7".into()));
    agg.submit(
        &json!({"data": {"producto_precios_especificos": [
            {"id_producto": "7", "cantidad": 1, "precio": 99.5, "bonificacion": 10}
        ], "mejor_precio": 99.5}}),
        SourceLabel::MemoryCache,
    );
    // Same detail seen again on the wire: no new tier, new source.
    agg.submit(
        &json!({"producto_precios_especificos": [
            {"bonificacion": 10, "precio": 99.5, "cantidad": 1, "id_producto": "7"}
        ], "mejor_precio": 99.5}),
        SourceLabel::Network,
    );

    assert!(agg.last_harvest().is_some());
    let rec = agg.record("7").unwrap();
    assert_eq!(rec.card_field("descripcion"), Some(&json!("X")));
    assert_eq!(rec.card_field("stock"), Some(&json!("5")));
    assert_eq!(rec.bonus(), Some(&json!(10)));
    assert_eq!(rec.best_price(), Some(&json!(99.5)));
    assert_eq!(rec.specific_prices().len(), 1);
    assert_eq!(rec.sources(), &[SourceLabel::Network, SourceLabel::MemoryCache]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("products.json");
    let writer = SnapshotWriter::new(&path);
    assert_ok!(writer.write(&agg.snapshot()));

    let snap = assert_ok!(load_snapshot(&path));
    assert_eq!(snap.count, 2);
    let first = &snap.products[0];
    assert_eq!(first["id_producto"], json!("7"));
    assert_eq!(first["descripcion"], json!("X"));
    assert_eq!(first["bonificacion"], json!(10));
    assert_eq!(first["mejor_precio"], json!(99.5));
    assert_eq!(first["producto_precios_especificos"].as_array().unwrap().len(), 1);
    assert_eq!(first["sources"], json!(["NETWORK", "MEMORY_CACHE"]));
    assert_eq!(snap.products[1]["id_producto"], json!("8"));
}

#[test]
fn later_blank_values_never_erase_known_fields() {
    let agg = CaptureAggregator::new();
    agg.submit(
        &json!({"productos": [{"id_producto": "3", "descripcion": "Tape", "precio_base": "12.50"}]}),
        SourceLabel::Network,
    );
    agg.submit(
        &json!({"productos": [{"id_producto": "3", "descripcion": "", "precio_base": "0,00", "stock": null}]}),
        SourceLabel::Network,
    );

    let rec = agg.record("3").unwrap();
    assert_eq!(rec.card_field("descripcion"), Some(&json!("Tape")));
    assert_eq!(rec.card_field("precio_base"), Some(&json!("12.50")));
    assert_eq!(rec.card_field("stock"), None);
}

#[test]
fn detail_for_another_product_does_not_correlate() {
    let agg = CaptureAggregator::new();
    agg.set_awaited(Some("1".into()));
    agg.submit(
        &json!({"producto_descuentos_financieros": [{"id_producto": "2", "porcentaje": 5}]}),
        SourceLabel::Network,
    );
    assert!(agg.last_harvest().is_none());
    assert_eq!(agg.record("2").unwrap().financial_discounts().len(), 1);
}
