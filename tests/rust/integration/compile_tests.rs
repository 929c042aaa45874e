//! End-to-end compilation of query documents against a YAML catalog

#[cfg(test)]
mod compile_tests {
    use std::io::Write;

    use qrcompiler::join_catalog::{
        CatalogConfig, DataSourceHandle, FieldRef, JoinCatalogError, JoinKind,
    };
    use qrcompiler::query_generator::{
        CompileError, CompileWarning, DialectKind, PageLimits, SqlBackend,
    };
    use qrcompiler::session::QuerySession;
    use serde_json::json;

    const ORDERS_CATALOG: &str = r#"
root: Order
tables:
  - entity: Order
    table: orders
    fields:
      id: id
      customerId: customer_id
      group: group
      total: total
  - entity: Customer
    table: customers
    fields:
      id: id
      name: name
    aliases:
      customerName: name
joins:
  - left: { entity: Order, field: customerId }
    right: { entity: Customer, field: id }
"#;

    fn session(dialect: DialectKind) -> QuerySession {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ORDERS_CATALOG.as_bytes()).unwrap();
        let catalog = CatalogConfig::from_yaml_file(file.path()).unwrap();
        QuerySession::build(
            &catalog,
            &DataSourceHandle::default(),
            &catalog.join_description(),
            dialect,
            PageLimits::default(),
        )
        .unwrap()
    }

    fn document() -> serde_json::Value {
        json!({
            "criteria": {
                "connector": "AND",
                "children": [
                    { "field": "name", "op": "s", "value": "Al" },
                    { "field": "group", "op": "i", "value": ["a", "b"] }
                ]
            },
            "pager": { "page": 3, "size": 10 },
            "sorter": [
                { "field": "customerName", "direction": "desc" },
                { "field": "bogus" }
            ],
            "projection": ["orders.id", "name"]
        })
    }

    #[test]
    fn test_join_resolves_fields_to_their_tables() {
        let session = session(DialectKind::Mysql);
        let compiled = session.compile_json(&SqlBackend, &document()).unwrap();

        assert_eq!(compiled.from, "orders");
        assert_eq!(compiled.joins.len(), 1);
        assert_eq!(compiled.joins[0].table, "customers");
        assert_eq!(compiled.joins[0].left, "orders.customer_id");
        assert_eq!(compiled.joins[0].right, "customers.id");
        assert_eq!(
            compiled.predicate.sql,
            "customers.name LIKE ? AND orders.`group` IN (?, ?)"
        );
        assert_eq!(
            compiled.predicate.to_debug_sql(),
            "customers.name LIKE 'Al%' AND orders.`group` IN ('a', 'b')"
        );
    }

    #[test]
    fn test_render_select_mysql() {
        let session = session(DialectKind::Mysql);
        let compiled = session.compile_json(&SqlBackend, &document()).unwrap();
        let statement = SqlBackend.render_select(&compiled);
        assert_eq!(
            statement.sql,
            "SELECT orders.id, customers.name FROM orders \
             INNER JOIN customers ON orders.customer_id = customers.id \
             WHERE customers.name LIKE ? AND orders.`group` IN (?, ?) \
             ORDER BY customers.name DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(statement.params.len(), 3);
    }

    #[test]
    fn test_render_select_postgres_quotes_reserved_words() {
        let session = session(DialectKind::Postgres);
        let compiled = session.compile_json(&SqlBackend, &document()).unwrap();
        assert_eq!(
            compiled.predicate.sql,
            "customers.name LIKE ? AND orders.\"group\" IN (?, ?)"
        );
    }

    #[test]
    fn test_bad_sort_field_is_skipped_with_one_warning() {
        let session = session(DialectKind::Mysql);
        let compiled = session.compile_json(&SqlBackend, &document()).unwrap();
        assert_eq!(compiled.order_by, vec!["customers.name DESC".to_string()]);
        assert_eq!(compiled.warnings.len(), 1);
        match &compiled.warnings[0] {
            CompileWarning::UnresolvedSortField { field, reason } => {
                assert_eq!(field, "bogus");
                assert!(matches!(reason, JoinCatalogError::UnresolvedField { .. }));
            }
            other => panic!("expected UnresolvedSortField, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_sort_column_through_alias_is_dropped() {
        let session = session(DialectKind::Mysql);
        let doc = json!({
            "sorter": [
                { "field": "name", "direction": "asc" },
                { "field": "customerName", "direction": "desc" }
            ]
        });
        let compiled = session.compile_json(&SqlBackend, &doc).unwrap();
        assert_eq!(compiled.order_by, vec!["customers.name ASC".to_string()]);
        assert!(matches!(
            compiled.warnings.as_slice(),
            [CompileWarning::DuplicateSortField { .. }]
        ));
    }

    #[test]
    fn test_unresolved_leaf_fails_the_whole_compilation() {
        let session = session(DialectKind::Mysql);
        let doc = json!({
            "criteria": {
                "connector": "OR",
                "children": [
                    { "field": "name", "op": "=", "value": "x" },
                    { "field": "missing", "op": "=", "value": "y" }
                ]
            }
        });
        let err = session.compile_json(&SqlBackend, &doc).unwrap_err();
        assert!(err.is_unresolved_field());
        match err {
            CompileError::Leaf { field, .. } => assert_eq!(field, "missing"),
            other => panic!("expected Leaf error, got {:?}", other),
        }
    }

    #[test]
    fn test_shared_bare_field_is_ambiguous() {
        let session = session(DialectKind::Mysql);
        let doc = json!({ "criteria": { "field": "id", "op": "=", "value": 1 } });
        let err = session.compile_json(&SqlBackend, &doc).unwrap_err();
        assert!(err.is_ambiguous_alias());

        let qualified = json!({ "criteria": { "field": "customers.id", "op": "=", "value": 1 } });
        let compiled = session.compile_json(&SqlBackend, &qualified).unwrap();
        assert_eq!(compiled.predicate.sql, "customers.id = ?");
    }

    #[test]
    fn test_unresolved_projection_is_fatal() {
        let session = session(DialectKind::Mysql);
        let doc = json!({ "projection": ["name", "nope"] });
        let err = session.compile_json(&SqlBackend, &doc).unwrap_err();
        assert!(err.is_unresolved_field());
    }

    #[test]
    fn test_empty_membership_lists_compile_to_constants() {
        let session = session(DialectKind::Mysql);
        let empty_in = json!({ "criteria": { "field": "total", "op": "i", "value": [] } });
        let empty_not_in = json!({ "criteria": { "field": "total", "op": "ni", "value": [] } });
        assert_eq!(
            session.compile_json(&SqlBackend, &empty_in).unwrap().predicate.sql,
            "1 = 0"
        );
        assert_eq!(
            session.compile_json(&SqlBackend, &empty_not_in).unwrap().predicate.sql,
            "1 = 1"
        );
    }

    #[test]
    fn test_table_joined_twice_is_rejected_before_rendering() {
        let catalog = CatalogConfig::from_yaml_str(ORDERS_CATALOG).unwrap();
        let description = catalog.join_description().join(
            FieldRef::new("Customer", "id"),
            FieldRef::new("Order", "customerId"),
            JoinKind::Inner,
        );
        let err = QuerySession::build(
            &catalog,
            &DataSourceHandle::default(),
            &description,
            DialectKind::Mysql,
            PageLimits::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            JoinCatalogError::RepeatedJoinEntity {
                entity: "Order".to_string()
            }
        );
    }

    #[test]
    fn test_disconnected_join_is_rejected() {
        let catalog = CatalogConfig::from_yaml_str(
            r#"
root: Order
tables:
  - entity: Order
    table: orders
    fields: { id: id }
  - entity: Customer
    table: customers
    fields: { id: id, regionId: region_id }
  - entity: Region
    table: regions
    fields: { id: id }
joins:
  - left: { entity: Customer, field: regionId }
    right: { entity: Region, field: id }
"#,
        )
        .unwrap();
        let err = QuerySession::build(
            &catalog,
            &DataSourceHandle::default(),
            &catalog.join_description(),
            DialectKind::Mysql,
            PageLimits::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            JoinCatalogError::DisconnectedJoin {
                entity: "Customer".to_string()
            }
        );
    }
}
