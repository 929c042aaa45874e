//! Identifier escaping per dialect

#[cfg(test)]
mod dialect_tests {
    use qrcompiler::query_generator::{Dialect, DialectKind, MySqlDialect, PostgresDialect};
    use test_case::test_case;

    #[test_case("name", "name"; "plain identifier untouched")]
    #[test_case("group", "`group`"; "reserved word quoted")]
    #[test_case("KEY", "`KEY`"; "reserved regardless of case")]
    #[test_case("order date", "`order date`"; "space quoted")]
    #[test_case("we`ird", "`we``ird`"; "quote char doubled")]
    fn test_mysql_escape_identifier(input: &str, expected: &str) {
        assert_eq!(MySqlDialect.escape_identifier(input), expected);
    }

    #[test_case("name", "name"; "plain identifier untouched")]
    #[test_case("user", "\"user\""; "reserved word quoted")]
    #[test_case("customerId", "\"customerId\""; "mixed case quoted")]
    fn test_postgres_escape_identifier(input: &str, expected: &str) {
        assert_eq!(PostgresDialect.escape_identifier(input), expected);
    }

    #[test]
    fn test_escape_qualifies_with_owner() {
        let owner = |_: &str| -> Option<String> { Some("orders".to_string()) };
        assert_eq!(MySqlDialect.escape("KEY", Some(&owner)), "orders.`KEY`");
        assert_eq!(PostgresDialect.escape("KEY", Some(&owner)), "orders.\"KEY\"");
    }

    #[test]
    fn test_escape_without_owner_is_unqualified() {
        let nobody = |_: &str| -> Option<String> { None };
        assert_eq!(MySqlDialect.escape("select", Some(&nobody)), "`select`");
        assert_eq!(MySqlDialect.escape("total", None), "total");
    }

    #[test]
    fn test_dialect_kind_parses_names() {
        assert_eq!("mysql".parse::<DialectKind>().unwrap(), DialectKind::Mysql);
        assert_eq!("Postgres".parse::<DialectKind>().unwrap(), DialectKind::Postgres);
        assert!("oracle".parse::<DialectKind>().is_err());
        assert_eq!(DialectKind::Postgres.dialect().quote_char(), '"');
    }
}
