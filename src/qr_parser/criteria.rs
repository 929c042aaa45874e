//! Criteria tree model
//!
//! Grammar (JSON):
//!
//! ```text
//! group := { "connector": "AND" | "OR", "children": [node, ...] }
//! leaf  := { "field": string, "op": literal, "value": scalar | [scalar, ...] | null }
//! node  := group | leaf
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde_json::{Map, Value};

use super::errors::QrParseError;
use super::operator::{Arity, Connector, Operator};

/// A single literal value carried by a leaf
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Convert a JSON value; `None` for null, arrays and objects
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Scalar::Int(i)),
                None => n.as_f64().map(Scalar::Float),
            },
            Value::String(s) => Some(Scalar::Str(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::from(*i),
            Scalar::Float(f) => Value::from(*f),
            Scalar::Str(s) => Value::String(s.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Ordering across comparable scalars. Numbers compare across int/float;
    /// mismatched kinds are incomparable.
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
            (Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(b)),
            (Scalar::Int(a), Scalar::Float(b)) => (*a as f64).partial_cmp(b),
            (Scalar::Float(a), Scalar::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Scalar::Float(a), Scalar::Float(b)) => a.partial_cmp(b),
            (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// Leaf value, shaped by the operator's arity
#[derive(Debug, Clone, PartialEq)]
pub enum LeafValue {
    None,
    One(Scalar),
    Many(Vec<Scalar>),
}

impl LeafValue {
    pub fn arity(&self) -> Arity {
        match self {
            LeafValue::None => Arity::None,
            LeafValue::One(_) => Arity::One,
            LeafValue::Many(_) => Arity::Many,
        }
    }

    fn to_json(&self) -> Option<Value> {
        match self {
            LeafValue::None => None,
            LeafValue::One(s) => Some(s.to_json()),
            LeafValue::Many(values) => {
                Some(Value::Array(values.iter().map(Scalar::to_json).collect()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CriteriaNode {
    Group {
        connector: Connector,
        children: Vec<CriteriaNode>,
    },
    Leaf {
        field: String,
        op: Operator,
        value: LeafValue,
    },
}

impl Default for CriteriaNode {
    /// Empty AND group, which matches everything
    fn default() -> Self {
        CriteriaNode::Group {
            connector: Connector::And,
            children: Vec::new(),
        }
    }
}

impl CriteriaNode {
    /// Build a leaf, checking the field name and the value against the operator's arity.
    /// Field names are kept verbatim, as the parser keeps them.
    pub fn leaf(
        field: impl Into<String>,
        op: Operator,
        value: LeafValue,
    ) -> Result<Self, QrParseError> {
        let field = field.into();
        if is_blank(&field) {
            return Err(QrParseError::malformed("leaf.field", "field name is empty"));
        }
        check_arity(&field, op, &value)?;
        Ok(CriteriaNode::Leaf { field, op, value })
    }

    pub fn group(connector: Connector, children: Vec<CriteriaNode>) -> Self {
        CriteriaNode::Group {
            connector,
            children,
        }
    }

    /// Parse a node located at `path` in the document
    pub fn parse(value: &Value, path: &str) -> Result<Self, QrParseError> {
        let map = value
            .as_object()
            .ok_or_else(|| QrParseError::malformed(path, "expected an object"))?;

        if map.contains_key("connector") {
            parse_group(map, path)
        } else if map.contains_key("field") || map.contains_key("op") {
            parse_leaf(map, path)
        } else {
            Err(QrParseError::malformed(
                path,
                "expected either a `connector` group or a `field`/`op` leaf",
            ))
        }
    }

    /// Serialise back into the document grammar accepted by [`CriteriaNode::parse`]
    pub fn to_document(&self) -> Value {
        match self {
            CriteriaNode::Group {
                connector,
                children,
            } => {
                let mut map = Map::new();
                map.insert("connector".to_string(), Value::from(connector.literal()));
                map.insert(
                    "children".to_string(),
                    Value::Array(children.iter().map(CriteriaNode::to_document).collect()),
                );
                Value::Object(map)
            }
            CriteriaNode::Leaf { field, op, value } => {
                let mut map = Map::new();
                map.insert("field".to_string(), Value::from(field.as_str()));
                map.insert("op".to_string(), Value::from(op.literal()));
                if let Some(v) = value.to_json() {
                    map.insert("value".to_string(), v);
                }
                Value::Object(map)
            }
        }
    }

    /// Count of leaves in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            CriteriaNode::Group { children, .. } => children.iter().map(|c| c.leaf_count()).sum(),
            CriteriaNode::Leaf { .. } => 1,
        }
    }

    /// Fields referenced by leaves, in document order
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            CriteriaNode::Group { children, .. } => {
                for child in children {
                    child.collect_fields(out);
                }
            }
            CriteriaNode::Leaf { field, .. } => out.push(field),
        }
    }
}

fn parse_group(map: &Map<String, Value>, path: &str) -> Result<CriteriaNode, QrParseError> {
    let connector_path = format!("{}.connector", path);
    let token = map
        .get("connector")
        .and_then(Value::as_str)
        .ok_or_else(|| QrParseError::malformed(&connector_path, "expected a string"))?;
    let connector = match Operator::parse(token)? {
        Operator::And => Connector::And,
        Operator::Or => Connector::Or,
        other => {
            return Err(QrParseError::malformed(
                connector_path,
                format!("`{}` is not a connector", other),
            ))
        }
    };

    let children_path = format!("{}.children", path);
    let children = match map.get("children") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| CriteriaNode::parse(item, &format!("{}[{}]", children_path, i)))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(QrParseError::malformed(children_path, "expected an array")),
    };

    Ok(CriteriaNode::Group {
        connector,
        children,
    })
}

fn parse_leaf(map: &Map<String, Value>, path: &str) -> Result<CriteriaNode, QrParseError> {
    let field = match map.get("field") {
        Some(Value::String(s)) if !is_blank(s) => s.clone(),
        Some(Value::String(_)) => {
            return Err(QrParseError::malformed(
                format!("{}.field", path),
                "field name is empty",
            ))
        }
        Some(_) => {
            return Err(QrParseError::malformed(
                format!("{}.field", path),
                "expected a string",
            ))
        }
        None => {
            return Err(QrParseError::malformed(
                format!("{}.field", path),
                "missing required key",
            ))
        }
    };

    let op_path = format!("{}.op", path);
    let token = match map.get("op") {
        Some(Value::String(s)) => s,
        Some(_) => return Err(QrParseError::malformed(op_path, "expected a string")),
        None => return Err(QrParseError::malformed(op_path, "missing required key")),
    };
    let op = Operator::parse(token)?;
    let expected = op.arity().ok_or_else(|| {
        QrParseError::malformed(&op_path, format!("connector `{}` used as a leaf operator", op))
    })?;

    let value_path = format!("{}.value", path);
    let raw = map.get("value").unwrap_or(&Value::Null);
    let value = match (expected, raw) {
        (Arity::None, Value::Null) => LeafValue::None,
        (Arity::One, Value::Array(_) | Value::Object(_) | Value::Null)
        | (Arity::None, _)
        | (Arity::Many, Value::Null) => {
            return Err(arity_error(value_path, op, expected, describe(raw)))
        }
        (Arity::One, scalar) => LeafValue::One(
            Scalar::from_json(scalar)
                .ok_or_else(|| arity_error(&value_path, op, expected, describe(raw)))?,
        ),
        (Arity::Many, Value::Array(items)) => {
            let mut values = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let scalar = Scalar::from_json(item).ok_or_else(|| {
                    QrParseError::malformed(
                        format!("{}[{}]", value_path, i),
                        "expected a scalar",
                    )
                })?;
                values.push(scalar);
            }
            LeafValue::Many(values)
        }
        (Arity::Many, _) => return Err(arity_error(value_path, op, expected, describe(raw))),
    };

    Ok(CriteriaNode::Leaf { field, op, value })
}

pub(crate) fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}

fn check_arity(field: &str, op: Operator, value: &LeafValue) -> Result<(), QrParseError> {
    let path = format!("leaf({})", field);
    let expected = op.arity().ok_or_else(|| {
        QrParseError::malformed(&path, format!("connector `{}` used as a leaf operator", op))
    })?;
    if expected != value.arity() {
        return Err(arity_error(path, op, expected, value.arity().to_string()));
    }
    Ok(())
}

fn arity_error(
    path: impl Into<String>,
    op: Operator,
    expected: Arity,
    found: impl Into<String>,
) -> QrParseError {
    QrParseError::InvalidLeafArity {
        path: path.into(),
        op: op.literal().to_string(),
        expected,
        found: found.into(),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "no value".to_string(),
        Value::Array(items) => format!("an array of {} item(s)", items.len()),
        Value::Object(_) => "an object".to_string(),
        _ => "a single scalar".to_string(),
    }
}
