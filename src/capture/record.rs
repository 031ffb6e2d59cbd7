use super::fragment::{
    is_blank, BEST_PRICE_KEY, BONUS_KEY, CARD_FIELDS, FINANCIAL_DISCOUNTS_KEY, ID_KEY,
    OPTIMAL_QUANTITY_KEY, SPECIFIC_PRICES_KEY,
};
use super::tiers::{dedup_entries, TierList};
use crate::types::SourceLabel;
use serde_json::{Map, Value};

/// Canonical per-product record. Fields only accumulate: once set to a
/// non-empty value nothing in the merge rules can clear them.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    id: String,
    card: Map<String, Value>,
    bonus: Option<Value>,
    best_price: Option<Value>,
    optimal_quantity: Option<Value>,
    specific_prices: TierList,
    financial_discounts: TierList,
    sources: Vec<SourceLabel>,
}

impl ProductRecord {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut card = Map::new();
        card.insert(ID_KEY.to_string(), Value::String(id.clone()));
        Self {
            id,
            card,
            bonus: None,
            best_price: None,
            optimal_quantity: None,
            specific_prices: TierList::new(),
            financial_discounts: TierList::new(),
            sources: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn card_field(&self, key: &str) -> Option<&Value> {
        self.card.get(key)
    }

    pub fn bonus(&self) -> Option<&Value> {
        self.bonus.as_ref()
    }

    pub fn best_price(&self) -> Option<&Value> {
        self.best_price.as_ref()
    }

    pub fn optimal_quantity(&self) -> Option<&Value> {
        self.optimal_quantity.as_ref()
    }

    pub fn specific_prices(&self) -> &[Value] {
        self.specific_prices.entries()
    }

    pub fn financial_discounts(&self) -> &[Value] {
        self.financial_discounts.entries()
    }

    pub fn sources(&self) -> &[SourceLabel] {
        &self.sources
    }

    /// Last-non-empty-wins over the card keys. The id key is identity and is
    /// never rewritten.
    pub fn merge_card(&mut self, node: &Map<String, Value>) {
        for key in CARD_FIELDS.iter().copied().filter(|k| *k != ID_KEY) {
            let incoming = node.get(key);
            if !is_blank(incoming) {
                if let Some(v) = incoming {
                    self.card.insert(key.to_string(), v.clone());
                }
            }
        }
    }

    /// Full detail merge: card projection, scalar pricing, tier lists, bonus.
    pub fn merge_detail(&mut self, node: &Map<String, Value>, source: SourceLabel) {
        self.merge_card(node);

        if let Some(v) = node.get(BEST_PRICE_KEY).filter(|v| !v.is_null()) {
            self.best_price = Some(v.clone());
        }
        if let Some(v) = node.get(OPTIMAL_QUANTITY_KEY).filter(|v| !v.is_null()) {
            self.optimal_quantity = Some(v.clone());
        }

        if let Some(rows) = node.get(SPECIFIC_PRICES_KEY).and_then(Value::as_array) {
            for row in rows {
                self.take_bonus(row);
                self.specific_prices.insert(row.clone());
            }
        }
        if let Some(rows) = node.get(FINANCIAL_DISCOUNTS_KEY).and_then(Value::as_array) {
            for row in rows {
                self.take_bonus(row);
                self.financial_discounts.insert(row.clone());
            }
        }

        self.add_source(source);
    }

    fn take_bonus(&mut self, row: &Value) {
        let bonus = row.get(BONUS_KEY);
        if !is_blank(bonus) {
            self.bonus = bonus.cloned();
        }
    }

    pub fn add_source(&mut self, source: SourceLabel) {
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }

    /// Flattened snapshot form: id, card fields inline, pricing, tier lists
    /// (deduplicated once more) and contributing sources.
    pub fn to_snapshot_entry(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert(ID_KEY.to_string(), Value::String(self.id.clone()));
        for key in CARD_FIELDS.iter().copied().filter(|k| *k != ID_KEY) {
            if let Some(v) = self.card.get(key) {
                out.insert(key.to_string(), v.clone());
            }
        }
        out.insert(
            BONUS_KEY.to_string(),
            self.bonus.clone().unwrap_or(Value::Null),
        );
        out.insert(
            BEST_PRICE_KEY.to_string(),
            self.best_price.clone().unwrap_or(Value::Null),
        );
        out.insert(
            OPTIMAL_QUANTITY_KEY.to_string(),
            self.optimal_quantity.clone().unwrap_or(Value::Null),
        );
        out.insert(
            SPECIFIC_PRICES_KEY.to_string(),
            Value::Array(dedup_entries(self.specific_prices.entries())),
        );
        out.insert(
            FINANCIAL_DISCOUNTS_KEY.to_string(),
            Value::Array(dedup_entries(self.financial_discounts.entries())),
        );
        out.insert(
            "sources".to_string(),
            Value::Array(
                self.sources
                    .iter()
                    .map(|s| Value::String(s.as_str().to_string()))
                    .collect(),
            ),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_card_fields_never_regress() {
        let mut rec = ProductRecord::new("7");
        rec.merge_card(&obj(json!({"descripcion": "Ibuprofeno", "stock": "12", "codigo": "A1"})));
        rec.merge_card(&obj(json!({"descripcion": "", "stock": "0", "codigo": null})));
        assert_eq!(rec.card_field("descripcion"), Some(&json!("Ibuprofeno")));
        assert_eq!(rec.card_field("stock"), Some(&json!("12")));
        assert_eq!(rec.card_field("codigo"), Some(&json!("A1")));

        rec.merge_card(&obj(json!({"stock": "3"})));
        assert_eq!(rec.card_field("stock"), Some(&json!("3")));
    }

    #[test]
    fn test_identity_is_fixed() {
        let mut rec = ProductRecord::new("7");
        rec.merge_card(&obj(json!({"id_producto": 8})));
        assert_eq!(rec.id(), "7");
        assert_eq!(rec.card_field("id_producto"), Some(&json!("7")));
    }

    #[test]
    fn test_scalar_pricing_only_overwritten_when_present() {
        let mut rec = ProductRecord::new("7");
        rec.merge_detail(&obj(json!({"mejor_precio": 99.5, "cantidad_desde_optima": 6})), SourceLabel::Network);
        rec.merge_detail(&obj(json!({"mejor_precio": null})), SourceLabel::Network);
        rec.merge_detail(&obj(json!({"descripcion": "X"})), SourceLabel::Network);
        assert_eq!(rec.best_price(), Some(&json!(99.5)));
        assert_eq!(rec.optimal_quantity(), Some(&json!(6)));

        rec.merge_detail(&obj(json!({"mejor_precio": 80})), SourceLabel::Network);
        assert_eq!(rec.best_price(), Some(&json!(80)));
    }

    #[test]
    fn test_bonus_last_non_empty_tier_wins() {
        let mut rec = ProductRecord::new("7");
        rec.merge_detail(
            &obj(json!({
                "producto_precios_especificos": [
                    {"id_producto": "7", "cantidad": 1, "bonificacion": 5},
                    {"id_producto": "7", "cantidad": 10, "bonificacion": 12},
                    {"id_producto": "7", "cantidad": 20, "bonificacion": "0"}
                ]
            })),
            SourceLabel::MemoryCache,
        );
        assert_eq!(rec.bonus(), Some(&json!(12)));
        assert_eq!(rec.specific_prices().len(), 3);
        assert_eq!(rec.sources(), &[SourceLabel::MemoryCache]);
    }

    #[test]
    fn test_snapshot_entry_shape() {
        let mut rec = ProductRecord::new("7");
        rec.merge_card(&obj(json!({"descripcion": "X", "stock": "5"})));
        rec.add_source(SourceLabel::Network);
        rec.add_source(SourceLabel::Network);
        let entry = rec.to_snapshot_entry();
        assert_eq!(entry["id_producto"], json!("7"));
        assert_eq!(entry["descripcion"], json!("X"));
        assert_eq!(entry["bonificacion"], Value::Null);
        assert_eq!(entry["producto_precios_especificos"], json!([]));
        assert_eq!(entry["sources"], json!(["NETWORK"]));
    }
}
