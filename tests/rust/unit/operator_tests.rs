//! Operator vocabulary and criteria document parsing

#[cfg(test)]
mod operator_tests {
    use qrcompiler::qr_parser::{
        parse_document, Arity, CriteriaNode, LeafValue, Operator, QrParseError, Scalar,
    };
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_every_operator_round_trips_through_its_literal() {
        for op in Operator::ALL {
            assert_eq!(Operator::parse(op.literal()).unwrap(), op);
        }
        let mut literals: Vec<&str> = Operator::ALL.iter().map(|op| op.literal()).collect();
        literals.sort_unstable();
        literals.dedup();
        assert_eq!(literals.len(), Operator::ALL.len(), "operator literals must be distinct");
    }

    #[test_case("AND", None; "and is a connector")]
    #[test_case("n", Some(Arity::None); "null takes no value")]
    #[test_case("<=", Some(Arity::One); "comparison takes one value")]
    #[test_case("c", Some(Arity::One); "contain takes one value")]
    #[test_case("ni", Some(Arity::Many); "not in takes a list")]
    fn test_operator_arity(literal: &str, expected: Option<Arity>) {
        assert_eq!(Operator::parse(literal).unwrap().arity(), expected);
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let doc = json!({ "criteria": { "field": "name", "op": "~" } });
        match parse_document(&doc) {
            Err(QrParseError::UnknownOperator { token }) => assert_eq!(token, "~"),
            other => panic!("expected UnknownOperator, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_then_serialize_preserves_the_tree() {
        let doc = json!({
            "criteria": {
                "connector": "OR",
                "children": [
                    { "field": "status", "op": "=", "value": "open" },
                    {
                        "connector": "AND",
                        "children": [
                            { "field": "total", "op": ">=", "value": 100 },
                            { "field": "note", "op": "nn" },
                            { "field": "region", "op": "i", "value": ["eu", "us"] }
                        ]
                    }
                ]
            },
            "pager": { "page": 2, "size": 5 },
            "sorter": [{ "field": "total", "direction": "desc" }],
            "projection": ["status", "total"]
        });
        let parsed = parse_document(&doc).unwrap();
        let reparsed = parse_document(&parsed.to_document()).unwrap();
        assert_eq!(parsed, reparsed);
        assert_eq!(parsed.criteria.leaf_count(), 4);
        assert_eq!(parsed.criteria.fields(), vec!["status", "total", "note", "region"]);
    }

    #[test]
    fn test_leaf_with_list_for_scalar_operator_reports_its_path() {
        let doc = json!({
            "criteria": {
                "connector": "AND",
                "children": [
                    { "field": "a", "op": "=", "value": 1 },
                    { "field": "b", "op": "=", "value": [1, 2] }
                ]
            }
        });
        let err = parse_document(&doc).unwrap_err();
        assert!(matches!(err, QrParseError::InvalidLeafArity { .. }));
        assert_eq!(err.path(), Some("criteria.children[1].value"));
    }

    #[test]
    fn test_empty_membership_list_is_accepted() {
        let doc = json!({ "criteria": { "field": "id", "op": "i", "value": [] } });
        let parsed = parse_document(&doc).unwrap();
        match parsed.criteria {
            CriteriaNode::Leaf { op, value, .. } => {
                assert_eq!(op, Operator::In);
                assert_eq!(value, LeafValue::Many(Vec::new()));
            }
            other => panic!("expected a leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_criteria_matches_everything() {
        let parsed = parse_document(&json!({})).unwrap();
        assert_eq!(parsed.criteria, CriteriaNode::default());
        assert_eq!(parsed.criteria.leaf_count(), 0);
    }

    #[test]
    fn test_scalar_ordering_across_numeric_types() {
        use std::cmp::Ordering;
        assert_eq!(Scalar::Int(2).compare(&Scalar::Float(2.5)), Some(Ordering::Less));
        assert_eq!(Scalar::from("a").compare(&Scalar::Int(1)), None);
    }
}
