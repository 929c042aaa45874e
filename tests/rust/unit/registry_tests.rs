//! Alias registry resolution and collision rules

#[cfg(test)]
mod registry_tests {
    use std::collections::BTreeMap;

    use qrcompiler::join_catalog::{AliasRegistry, ColumnRef, JoinCatalogError};

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn orders_and_customers() -> AliasRegistry {
        let mut registry = AliasRegistry::new();
        registry
            .register(
                "orders",
                &map(&[("id", "id"), ("customerId", "customer_id")]),
                &map(&[("orderId", "id")]),
            )
            .unwrap();
        registry
            .register(
                "customers",
                &map(&[("id", "id"), ("name", "name")]),
                &map(&[("customerName", "name")]),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_unique_names_resolve_to_their_table() {
        let registry = orders_and_customers();
        assert_eq!(registry.resolve_table("name").unwrap(), "customers");
        assert_eq!(registry.resolve_table("customerName").unwrap(), "customers");
        assert_eq!(
            registry.resolve_column("customerId").unwrap(),
            &ColumnRef::new("orders", "customer_id")
        );
        assert_eq!(
            registry.resolve_column("orderId").unwrap(),
            &ColumnRef::new("orders", "id")
        );
    }

    #[test]
    fn test_shared_bare_field_is_ambiguous_but_qualified_resolves() {
        let registry = orders_and_customers();
        let err = registry.resolve_column("id").unwrap_err();
        assert!(matches!(err, JoinCatalogError::AmbiguousAlias { .. }));
        assert_eq!(registry.resolve_table("orders.id").unwrap(), "orders");
        assert_eq!(registry.resolve_table("customers.id").unwrap(), "customers");
    }

    #[test]
    fn test_unknown_name_is_unresolved() {
        let registry = orders_and_customers();
        assert_eq!(
            registry.resolve_column("missing").unwrap_err(),
            JoinCatalogError::UnresolvedField {
                field: "missing".to_string()
            }
        );
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn test_explicit_alias_collision_across_tables_is_rejected() {
        let mut registry = orders_and_customers();
        let before = registry.clone();
        let err = registry
            .register("invoices", &map(&[("total", "total")]), &map(&[("orderId", "total")]))
            .unwrap_err();
        match err {
            JoinCatalogError::AmbiguousAlias {
                alias,
                first_table,
                second_table,
            } => {
                assert_eq!(alias, "orderId");
                assert_eq!(first_table, "orders");
                assert_eq!(second_table, "invoices");
            }
            other => panic!("expected AmbiguousAlias, got {:?}", other),
        }
        assert_eq!(registry.tables(), before.tables(), "failed registration must not leak");
        assert!(!registry.contains("total"));
    }

    #[test]
    fn test_aliases_of_lists_every_name() {
        let registry = orders_and_customers();
        let names: Vec<&str> = registry
            .aliases_of(&ColumnRef::new("customers", "name"))
            .unwrap()
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(names, vec!["customerName", "name"]);
    }
}
