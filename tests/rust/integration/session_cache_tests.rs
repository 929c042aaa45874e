//! Session cache sharing across threads

#[cfg(test)]
mod session_cache_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use qrcompiler::config::CompilerConfig;
    use qrcompiler::join_catalog::{CatalogConfig, DataSourceHandle, EntityRef, JoinCatalogError};
    use qrcompiler::query_generator::{BackendKind, DialectKind, PageLimits, SqlBackend};
    use qrcompiler::session::{QuerySession, SessionCache, SessionCacheConfig, SessionKey};
    use serde_json::json;

    const CATALOG: &str = r#"
root: Order
tables:
  - entity: Order
    table: orders
    fields: { id: id, customerId: customer_id }
  - entity: Customer
    table: customers
    fields: { id: id, name: name }
joins:
  - left: { entity: Order, field: customerId }
    right: { entity: Customer, field: id }
"#;

    fn build(catalog: &CatalogConfig) -> Result<QuerySession, JoinCatalogError> {
        QuerySession::build(
            catalog,
            &DataSourceHandle::default(),
            &catalog.join_description(),
            DialectKind::Mysql,
            PageLimits::default(),
        )
    }

    fn key(catalog: &CatalogConfig, backend: BackendKind, dialect: DialectKind) -> SessionKey {
        SessionKey::new(
            DataSourceHandle::default(),
            catalog.join_description(),
            backend,
            dialect,
            PageLimits::default(),
        )
    }

    #[test]
    fn test_concurrent_requests_build_once() {
        let catalog = Arc::new(CatalogConfig::from_yaml_str(CATALOG).unwrap());
        let cache = Arc::new(SessionCache::with_defaults());
        let key = key(&catalog, BackendKind::Sql, DialectKind::Mysql);
        let built = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let (catalog, cache, key, built, barrier) = (
                    Arc::clone(&catalog),
                    Arc::clone(&cache),
                    key.clone(),
                    Arc::clone(&built),
                    Arc::clone(&barrier),
                );
                thread::spawn(move || {
                    barrier.wait();
                    let session = cache
                        .get_or_build(&key, || {
                            built.fetch_add(1, Ordering::SeqCst);
                            build(&catalog)
                        })
                        .unwrap();
                    let doc = json!({ "criteria": { "field": "name", "op": "=", "value": "x" } });
                    session.compile_json(&SqlBackend, &doc).unwrap().predicate.sql
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "customers.name = ?");
        }
        assert_eq!(built.load(Ordering::SeqCst), 1);
        let metrics = cache.metrics();
        assert_eq!(metrics.builds, 1);
        assert_eq!(metrics.hits + metrics.misses, 8);
        assert_eq!(metrics.size, 1);
    }

    #[test]
    fn test_invalidate_entity_drops_dependent_sessions() {
        let catalog = CatalogConfig::from_yaml_str(CATALOG).unwrap();
        let cache = SessionCache::new(SessionCacheConfig {
            enabled: true,
            max_entries: 4,
        });
        let key = key(&catalog, BackendKind::Sql, DialectKind::Mysql);
        cache.get_or_build(&key, || build(&catalog)).unwrap();
        assert!(cache.get(&key).is_some());

        cache.invalidate_entity(&EntityRef::new("Customer"));
        assert!(cache.get(&key).is_none());

        cache.get_or_build(&key, || build(&catalog)).unwrap();
        assert_eq!(cache.metrics().builds, 2);
    }

    #[test]
    fn test_keys_differ_per_backend_and_dialect() {
        let catalog = CatalogConfig::from_yaml_str(CATALOG).unwrap();
        let sql = key(&catalog, BackendKind::Sql, DialectKind::Mysql);
        let condition = key(&catalog, BackendKind::Condition, DialectKind::Mysql);
        let postgres = key(&catalog, BackendKind::Sql, DialectKind::Postgres);
        assert_ne!(sql, condition);
        assert_ne!(sql, postgres);
        assert!(sql.entities.contains(&EntityRef::new("Order")));
        assert!(sql.entities.contains(&EntityRef::new("Customer")));
    }

    #[test]
    fn test_page_cap_is_not_shared_between_callers() {
        let catalog = CatalogConfig::from_yaml_str(CATALOG).unwrap();
        let cache = SessionCache::with_defaults();
        let doc = json!({ "pager": { "page": 1, "size": 1000 } });

        let mut generous = key(&catalog, BackendKind::Sql, DialectKind::Mysql);
        generous.limits.max_size = 1000;
        let mut strict = generous.clone();
        strict.limits.max_size = 10;

        let wide = cache.get_or_load(&catalog, &generous).unwrap();
        let narrow = cache.get_or_load(&catalog, &strict).unwrap();

        let wide_window = wide.compile_json(&SqlBackend, &doc).unwrap().window;
        let narrow_window = narrow.compile_json(&SqlBackend, &doc).unwrap().window;
        assert_eq!(wide_window.limit, 1000);
        assert_eq!(narrow_window.limit, 10);
        assert_eq!(cache.metrics().builds, 2);
    }

    #[test]
    fn test_cache_built_from_config_honours_disable_switch() {
        let config = CompilerConfig {
            cache_enabled: false,
            ..CompilerConfig::default()
        };
        let catalog = CatalogConfig::from_yaml_str(CATALOG).unwrap();
        let cache = SessionCache::from_config(&config);
        let key = key(&catalog, BackendKind::Sql, config.dialect);
        cache.get_or_load(&catalog, &key).unwrap();
        cache.get_or_load(&catalog, &key).unwrap();
        assert_eq!(cache.metrics().builds, 2);
        assert!(cache.get(&key).is_none());
    }
}
