//! Structural recognition of captured payloads.
//!
//! Payloads are untyped `serde_json::Value` trees. Nothing here assumes a
//! schema: a node is interesting when it carries a product id (directly or via
//! its tier lists), wherever it sits in the tree.

use serde_json::{Map, Value};

pub const ID_KEY: &str = "id_producto";
pub const CATALOG_KEY: &str = "productos";
pub const SPECIFIC_PRICES_KEY: &str = "producto_precios_especificos";
pub const FINANCIAL_DISCOUNTS_KEY: &str = "producto_descuentos_financieros";
pub const BONUS_KEY: &str = "bonificacion";
pub const BEST_PRICE_KEY: &str = "mejor_precio";
pub const OPTIMAL_QUANTITY_KEY: &str = "cantidad_desde_optima";

/// Card projection keys, in snapshot order.
pub const CARD_FIELDS: &[&str] = &[
    "id_producto",
    "codigo",
    "descripcion",
    "stock",
    "precio_base",
    "precio_minimo",
    "url_imagen",
    "imagen",
];

/// `true` for values that must never overwrite stored data: absent, null,
/// empty string, and zero in its usual spellings.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => matches!(s.trim(), "" | "0" | "0.00" | "0,00"),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

/// String form of an identifier value. Numbers and non-empty strings qualify.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_entry_id(node: &Map<String, Value>, list_key: &str) -> Option<String> {
    node.get(list_key)?
        .as_array()?
        .first()?
        .as_object()?
        .get(ID_KEY)
        .and_then(id_string)
}

/// Infer the product a node describes: its own id, else the id of the first
/// specific-price tier, else the id of the first financial-discount tier.
pub fn infer_product_id(node: &Map<String, Value>) -> Option<String> {
    node.get(ID_KEY)
        .and_then(id_string)
        .or_else(|| first_entry_id(node, SPECIFIC_PRICES_KEY))
        .or_else(|| first_entry_id(node, FINANCIAL_DISCOUNTS_KEY))
}

/// The two payload families recognised by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FragmentShape<'a> {
    /// `{"productos": [...]}` listing; entries feed the card projection only.
    Catalog(&'a [Value]),
    /// Anything else; searched depth-first for detail nodes.
    Tree,
}

pub fn classify(fragment: &Value) -> FragmentShape<'_> {
    match fragment
        .as_object()
        .and_then(|m| m.get(CATALOG_KEY))
        .and_then(Value::as_array)
    {
        Some(entries) => FragmentShape::Catalog(entries.as_slice()),
        None => FragmentShape::Tree,
    }
}

/// Every object node with an inferable id, in pre-order. Nodes without an id
/// are skipped but their children are still visited.
pub fn detail_nodes(fragment: &Value) -> Vec<(&Map<String, Value>, String)> {
    let mut found = Vec::new();
    let mut stack: Vec<&Value> = vec![fragment];

    while let Some(node) = stack.pop() {
        match node {
            Value::Object(map) => {
                if let Some(pid) = infer_product_id(map) {
                    found.push((map, pid));
                }
                for child in map.values().rev() {
                    if child.is_object() || child.is_array() {
                        stack.push(child);
                    }
                }
            }
            Value::Array(items) => {
                for child in items.iter().rev() {
                    stack.push(child);
                }
            }
            _ => {}
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_values() {
        for v in [json!(null), json!(""), json!("0"), json!(0), json!(0.0), json!("0.00"), json!("0,00")] {
            assert!(is_blank(Some(&v)), "{v} should be blank");
        }
        assert!(is_blank(None));
        for v in [json!("5"), json!(1), json!(0.5), json!("X"), json!(false), json!([])] {
            assert!(!is_blank(Some(&v)), "{v} should not be blank");
        }
    }

    #[test]
    fn test_id_inference_priority() {
        let own = json!({
            "id_producto": 1,
            "producto_precios_especificos": [{"id_producto": "2"}],
            "producto_descuentos_financieros": [{"id_producto": "3"}]
        });
        assert_eq!(infer_product_id(own.as_object().unwrap()), Some("1".into()));

        let tiers = json!({
            "producto_precios_especificos": [{"id_producto": "2"}],
            "producto_descuentos_financieros": [{"id_producto": "3"}]
        });
        assert_eq!(infer_product_id(tiers.as_object().unwrap()), Some("2".into()));

        let financial = json!({
            "producto_precios_especificos": [],
            "producto_descuentos_financieros": [{"id_producto": 3}]
        });
        assert_eq!(infer_product_id(financial.as_object().unwrap()), Some("3".into()));

        let none = json!({"producto_precios_especificos": [{"precio": 1}]});
        assert_eq!(infer_product_id(none.as_object().unwrap()), None);
    }

    #[test]
    fn test_null_own_id_falls_through() {
        let node = json!({"id_producto": null, "producto_precios_especificos": [{"id_producto": "9"}]});
        assert_eq!(infer_product_id(node.as_object().unwrap()), Some("9".into()));
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            classify(&json!({"productos": [{"id_producto": "1"}]})),
            FragmentShape::Catalog(entries) if entries.len() == 1
        ));
        assert_eq!(classify(&json!({"productos": "nope"})), FragmentShape::Tree);
        assert_eq!(classify(&json!([1, 2])), FragmentShape::Tree);
    }

    #[test]
    fn test_detail_nodes_found_at_any_depth() {
        let fragment = json!({
            "data": {
                "wrapper": [
                    {"ignored": true},
                    {"inner": {"producto_precios_especificos": [{"id_producto": "42", "bonificacion": 5}]}}
                ]
            }
        });
        let ids: Vec<String> = detail_nodes(&fragment).into_iter().map(|(_, id)| id).collect();
        // The detail node itself and the tier entry inside it.
        assert_eq!(ids, vec!["42".to_string(), "42".to_string()]);
    }

    #[test]
    fn test_detail_nodes_on_scalars() {
        assert!(detail_nodes(&json!(17)).is_empty());
        assert!(detail_nodes(&json!("text")).is_empty());
    }
}
