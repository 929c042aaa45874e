//! Condition backend evaluated against in-memory rows

#[cfg(test)]
mod condition_tests {
    use qrcompiler::join_catalog::{CatalogConfig, ColumnRef, DataSourceHandle};
    use qrcompiler::qr_parser::Scalar;
    use qrcompiler::query_generator::{Condition, ConditionBackend, DialectKind, PageLimits, Row};
    use qrcompiler::session::QuerySession;
    use serde_json::json;

    const CATALOG: &str = r#"
root: Order
tables:
  - entity: Order
    table: orders
    fields: { id: id, customerId: customer_id, total: total, note: note }
  - entity: Customer
    table: customers
    fields: { id: id, name: name }
joins:
  - left: { entity: Order, field: customerId }
    right: { entity: Customer, field: id }
    kind: left
"#;

    fn session() -> QuerySession {
        let catalog = CatalogConfig::from_yaml_str(CATALOG).unwrap();
        QuerySession::build(
            &catalog,
            &DataSourceHandle::default(),
            &catalog.join_description(),
            DialectKind::Mysql,
            PageLimits::default(),
        )
        .unwrap()
    }

    fn rows() -> Vec<Row> {
        vec![
            Row::new()
                .with("orders", "total", 10_i64)
                .with("customers", "name", "Alice")
                .with("orders", "note", "50% off"),
            Row::new()
                .with("orders", "total", 250_i64)
                .with("customers", "name", "Bob"),
            Row::new()
                .with("orders", "total", 99_i64)
                .with("customers", "name", "Alina"),
        ]
    }

    fn filter(criteria: serde_json::Value) -> Vec<i64> {
        let compiled = session()
            .compile_json(&ConditionBackend, &json!({ "criteria": criteria }))
            .unwrap();
        let rows = rows();
        let total = ColumnRef::new("orders", "total");
        compiled
            .predicate
            .filter(&rows)
            .into_iter()
            .filter_map(|row| match row.get(&total) {
                Some(Scalar::Int(total)) => Some(*total),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_in_matches_nothing_and_empty_not_in_matches_everything() {
        assert!(filter(json!({ "field": "total", "op": "i", "value": [] })).is_empty());
        assert_eq!(
            filter(json!({ "field": "total", "op": "ni", "value": [] })).len(),
            rows().len()
        );
    }

    #[test]
    fn test_empty_group_matches_everything() {
        let compiled = session()
            .compile_json(&ConditionBackend, &json!({}))
            .unwrap();
        assert_eq!(compiled.predicate, Condition::True);
        assert_eq!(compiled.predicate.filter(&rows()).len(), 3);
    }

    #[test]
    fn test_prefix_match_across_joined_table() {
        assert_eq!(filter(json!({ "field": "name", "op": "s", "value": "Al" })), vec![10, 99]);
    }

    #[test]
    fn test_wildcards_in_literal_are_matched_literally() {
        assert_eq!(filter(json!({ "field": "note", "op": "c", "value": "0%" })), vec![10]);
        assert!(filter(json!({ "field": "note", "op": "c", "value": "_" })).is_empty());
    }

    #[test]
    fn test_missing_value_is_null() {
        assert_eq!(filter(json!({ "field": "note", "op": "n" })), vec![250, 99]);
        // comparisons against NULL are never true, negated or not
        assert_eq!(filter(json!({ "field": "note", "op": "<>", "value": "x" })), vec![10]);
    }

    #[test]
    fn test_or_of_ranges() {
        let criteria = json!({
            "connector": "OR",
            "children": [
                { "field": "total", "op": "<", "value": 50 },
                { "field": "total", "op": ">=", "value": 200 }
            ]
        });
        assert_eq!(filter(criteria), vec![10, 250]);
    }

    #[test]
    fn test_display_renders_escaped_tree() {
        let compiled = session()
            .compile_json(
                &ConditionBackend,
                &json!({
                    "criteria": {
                        "connector": "AND",
                        "children": [
                            { "field": "name", "op": "e", "value": "ce" },
                            { "field": "total", "op": "i", "value": [1, 2] }
                        ]
                    },
                    "sorter": [{ "field": "total", "direction": "DESC" }]
                }),
            )
            .unwrap();
        assert_eq!(
            compiled.predicate.to_string(),
            "(customers.name like '%ce' escape '!' and orders.total in (1, 2))"
        );
        assert_eq!(compiled.order_by[0].to_string(), "orders.total desc");
        assert_eq!(compiled.joins[0].kind.to_sql(), "LEFT JOIN");
    }
}
