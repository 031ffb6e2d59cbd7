//! Capture aggregator: folds partial product fragments from both producers
//! into canonical per-product records.
//!
//! Producers (the network observer task and the page-buffer poll) only call
//! [`CaptureAggregator::submit`]; they never hold references into the record
//! map. The lock is held for the duration of one merge and never across an
//! `.await`.

pub mod debug_dump;
pub mod fragment;
pub mod record;
pub mod tiers;

pub use debug_dump::DebugDumper;
pub use record::ProductRecord;

use crate::types::SourceLabel;
use chrono::{DateTime, Utc};
use fragment::FragmentShape;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Running counters, reported at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub network_fragments: u64,
    pub buffer_fragments: u64,
    /// Fragments that touched at least one record.
    pub merged_fragments: u64,
}

#[derive(Debug, Default)]
struct Inner {
    records: IndexMap<String, ProductRecord>,
    awaited_product_id: Option<String>,
    last_harvest: Option<DateTime<Utc>>,
    stats: CaptureStats,
}

impl Inner {
    fn record_mut(&mut self, id: &str) -> &mut ProductRecord {
        self.records
            .entry(id.to_string())
            .or_insert_with(|| ProductRecord::new(id))
    }

    fn merge(&mut self, fragment: &Value, source: SourceLabel) -> usize {
        match fragment::classify(fragment) {
            FragmentShape::Catalog(entries) => {
                let mut merged = 0;
                for entry in entries {
                    let Some(map) = entry.as_object() else {
                        continue;
                    };
                    let Some(id) = map.get(fragment::ID_KEY).and_then(fragment::id_string) else {
                        continue;
                    };
                    let rec = self.record_mut(&id);
                    rec.merge_card(map);
                    rec.add_source(source);
                    merged += 1;
                }
                merged
            }
            FragmentShape::Tree => {
                let nodes = fragment::detail_nodes(fragment);
                for (node, id) in &nodes {
                    self.record_mut(id).merge_detail(node, source);
                    if self.awaited_product_id.as_deref() == Some(id.as_str()) {
                        self.last_harvest = Some(Utc::now());
                        info!("[✓] data received for product {} ({})", id, source);
                    }
                }
                nodes.len()
            }
        }
    }
}

/// Canonical in-memory record set plus the click-correlation slot.
#[derive(Debug, Default)]
pub struct CaptureAggregator {
    inner: Mutex<Inner>,
}

impl CaptureAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock still holds consistent records: every merge step
        // leaves the map valid.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Merge one fragment. Never fails; fragments with no recognisable
    /// product data are ignored. Returns the number of nodes merged.
    pub fn submit(&self, fragment: &Value, source: SourceLabel) -> usize {
        let mut inner = self.lock();
        match source {
            SourceLabel::Network => inner.stats.network_fragments += 1,
            SourceLabel::MemoryCache => inner.stats.buffer_fragments += 1,
        }
        let merged = inner.merge(fragment, source);
        if merged > 0 {
            inner.stats.merged_fragments += 1;
            debug!(
                "capture: {} node(s) merged from {} ({} products)",
                merged,
                source,
                inner.records.len()
            );
        }
        merged
    }

    /// Mark the product the interaction cycle is waiting on (`None` disables
    /// correlation).
    pub fn set_awaited(&self, product_id: Option<String>) {
        self.lock().awaited_product_id = product_id;
    }

    pub fn awaited(&self) -> Option<String> {
        self.lock().awaited_product_id.clone()
    }

    pub fn last_harvest(&self) -> Option<DateTime<Utc>> {
        self.lock().last_harvest
    }

    /// Whether data for the awaited product arrived at or after `since`.
    pub fn harvested_since(&self, since: DateTime<Utc>) -> bool {
        self.last_harvest().is_some_and(|t| t >= since)
    }

    pub fn record(&self, id: &str) -> Option<ProductRecord> {
        self.lock().records.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every record in first-seen order.
    pub fn snapshot(&self) -> Vec<ProductRecord> {
        self.lock().records.values().cloned().collect()
    }

    pub fn stats(&self) -> CaptureStats {
        self.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail() -> Value {
        json!({
            "data": {
                "producto_precios_especificos": [
                    {"id_producto": "7", "cantidad": 1, "precio": 100, "bonificacion": 10},
                    {"precio": 90, "cantidad": 12, "id_producto": "7"}
                ],
                "mejor_precio": 90,
                "cantidad_desde_optima": 12
            }
        })
    }

    #[test]
    fn test_submit_is_idempotent() {
        let agg = CaptureAggregator::new();
        agg.submit(&detail(), SourceLabel::Network);
        let once = agg.record("7").unwrap();
        agg.submit(&detail(), SourceLabel::Network);
        let twice = agg.record("7").unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.specific_prices().len(), 2);
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn test_reordered_tier_keys_collapse() {
        let agg = CaptureAggregator::new();
        agg.submit(
            &json!({"producto_precios_especificos": [{"id_producto": "7", "precio": 1}]}),
            SourceLabel::Network,
        );
        agg.submit(
            &json!({"producto_precios_especificos": [{"precio": 1, "id_producto": "7"}, {"id_producto": "7", "precio": 2}]}),
            SourceLabel::MemoryCache,
        );
        let rec = agg.record("7").unwrap();
        assert_eq!(
            rec.specific_prices(),
            &[json!({"id_producto": "7", "precio": 1}), json!({"id_producto": "7", "precio": 2})]
        );
        assert_eq!(rec.sources(), &[SourceLabel::Network, SourceLabel::MemoryCache]);
    }

    #[test]
    fn test_correlation_only_for_awaited_product() {
        let agg = CaptureAggregator::new();
        agg.set_awaited(Some("7".into()));

        agg.submit(
            &json!({"producto_precios_especificos": [{"id_producto": "8"}]}),
            SourceLabel::Network,
        );
        assert!(agg.last_harvest().is_none());

        let before = Utc::now();
        agg.submit(&detail(), SourceLabel::MemoryCache);
        assert!(agg.harvested_since(before));

        agg.set_awaited(None);
        assert!(agg.awaited().is_none());
    }

    #[test]
    fn test_catalog_listing_does_not_correlate_or_price() {
        let agg = CaptureAggregator::new();
        agg.set_awaited(Some("7".into()));
        agg.submit(
            &json!({"productos": [
                {"id_producto": "7", "descripcion": "X", "mejor_precio": 5,
                 "producto_precios_especificos": [{"id_producto": "7"}]},
                {"descripcion": "no id"},
                "junk"
            ]}),
            SourceLabel::Network,
        );
        let rec = agg.record("7").unwrap();
        assert_eq!(rec.card_field("descripcion"), Some(&json!("X")));
        assert!(rec.best_price().is_none());
        assert!(rec.specific_prices().is_empty());
        assert!(agg.last_harvest().is_none());
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn test_irrelevant_fragments_are_ignored() {
        let agg = CaptureAggregator::new();
        assert_eq!(agg.submit(&json!({"status": "ok"}), SourceLabel::Network), 0);
        assert_eq!(agg.submit(&json!(null), SourceLabel::Network), 0);
        assert_eq!(agg.submit(&json!([1, "a", {"b": []}]), SourceLabel::MemoryCache), 0);
        assert!(agg.is_empty());
        let stats = agg.stats();
        assert_eq!(stats.network_fragments, 2);
        assert_eq!(stats.buffer_fragments, 1);
        assert_eq!(stats.merged_fragments, 0);
    }

    #[test]
    fn test_snapshot_keeps_first_seen_order() {
        let agg = CaptureAggregator::new();
        agg.submit(&json!({"productos": [{"id_producto": "30"}, {"id_producto": "4"}]}), SourceLabel::Network);
        agg.submit(&json!({"id_producto": "100"}), SourceLabel::Network);
        let ids: Vec<String> = agg.snapshot().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["30", "4", "100"]);
    }
}
