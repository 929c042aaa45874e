//! Top-level Qr query document: `criteria`, `pager`, `sorter`, `projection`.

use std::fmt;

use serde_json::{Map, Value};

use super::criteria::{is_blank, CriteriaNode};
use super::errors::QrParseError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Requested page. Values are kept as submitted; clamping happens at compile time
/// against the session's limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub page: u64,
    pub size: Option<u64>,
}

impl Default for Pager {
    fn default() -> Self {
        Pager {
            page: DEFAULT_PAGE,
            size: None,
        }
    }
}

impl Pager {
    pub fn new(page: u64, size: u64) -> Self {
        Pager {
            page,
            size: Some(size),
        }
    }

    fn parse(value: &Value, path: &str) -> Result<Self, QrParseError> {
        let map = value
            .as_object()
            .ok_or_else(|| QrParseError::malformed(path, "expected an object"))?;
        let page = read_count(map, "page", path)?.unwrap_or(DEFAULT_PAGE);
        let size = read_count(map, "size", path)?;
        Ok(Pager { page, size })
    }

    fn to_document(self) -> Value {
        let mut map = Map::new();
        map.insert("page".to_string(), Value::from(self.page));
        if let Some(size) = self.size {
            map.insert("size".to_string(), Value::from(size));
        }
        Value::Object(map)
    }
}

fn read_count(
    map: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<u64>, QrParseError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or_else(|| {
            QrParseError::malformed(
                format!("{}.{}", path, key),
                "expected a non-negative integer",
            )
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Asc)
        } else if token.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }

    pub fn to_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        SortKey {
            field: field.into(),
            direction,
        }
    }
}

/// Ordered sort keys. Duplicates are preserved here and resolved by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sorter {
    pub keys: Vec<SortKey>,
}

impl Sorter {
    fn parse(value: &Value, path: &str) -> Result<Self, QrParseError> {
        let items = value
            .as_array()
            .ok_or_else(|| QrParseError::malformed(path, "expected an array"))?;
        let mut keys = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let item_path = format!("{}[{}]", path, i);
            let map = item
                .as_object()
                .ok_or_else(|| QrParseError::malformed(&item_path, "expected an object"))?;
            let field = map
                .get("field")
                .and_then(Value::as_str)
                .filter(|s| !is_blank(s))
                .ok_or_else(|| {
                    QrParseError::malformed(format!("{}.field", item_path), "expected a field name")
                })?;
            let direction = match map.get("direction") {
                None | Some(Value::Null) => SortDirection::default(),
                Some(Value::String(s)) => SortDirection::parse(s).ok_or_else(|| {
                    QrParseError::malformed(
                        format!("{}.direction", item_path),
                        format!("expected ASC or DESC, found `{}`", s),
                    )
                })?,
                Some(_) => {
                    return Err(QrParseError::malformed(
                        format!("{}.direction", item_path),
                        "expected a string",
                    ))
                }
            };
            keys.push(SortKey::new(field, direction));
        }
        Ok(Sorter { keys })
    }

    fn to_document(&self) -> Value {
        Value::Array(
            self.keys
                .iter()
                .map(|k| {
                    let mut map = Map::new();
                    map.insert("field".to_string(), Value::from(k.field.as_str()));
                    map.insert("direction".to_string(), Value::from(k.direction.to_sql()));
                    Value::Object(map)
                })
                .collect(),
        )
    }
}

/// Field names to select; empty selects everything
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    pub fields: Vec<String>,
}

impl Projection {
    pub fn is_all(&self) -> bool {
        self.fields.is_empty()
    }

    fn parse(value: &Value, path: &str) -> Result<Self, QrParseError> {
        let items = value
            .as_array()
            .ok_or_else(|| QrParseError::malformed(path, "expected an array"))?;
        let mut fields: Vec<String> = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let name = item
                .as_str()
                .filter(|s| !is_blank(s))
                .ok_or_else(|| {
                    QrParseError::malformed(format!("{}[{}]", path, i), "expected a field name")
                })?;
            if !fields.iter().any(|f| f == name) {
                fields.push(name.to_string());
            }
        }
        Ok(Projection { fields })
    }
}

/// A fully parsed query document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryDocument {
    pub criteria: CriteriaNode,
    pub pager: Pager,
    pub sorter: Sorter,
    pub projection: Projection,
}

impl QueryDocument {
    pub fn to_document(&self) -> Value {
        let mut map = Map::new();
        map.insert("criteria".to_string(), self.criteria.to_document());
        map.insert("pager".to_string(), self.pager.to_document());
        map.insert("sorter".to_string(), self.sorter.to_document());
        map.insert(
            "projection".to_string(),
            Value::Array(self.projection.fields.iter().map(|f| Value::from(f.as_str())).collect()),
        );
        Value::Object(map)
    }
}

/// Parse a query document. Unknown top-level keys are ignored.
pub fn parse_document(value: &Value) -> Result<QueryDocument, QrParseError> {
    let map = value
        .as_object()
        .ok_or_else(|| QrParseError::malformed("$", "expected an object"))?;

    let criteria = match map.get("criteria") {
        None | Some(Value::Null) => CriteriaNode::default(),
        Some(v) => CriteriaNode::parse(v, "criteria")?,
    };
    let pager = match map.get("pager") {
        None | Some(Value::Null) => Pager::default(),
        Some(v) => Pager::parse(v, "pager")?,
    };
    let sorter = match map.get("sorter") {
        None | Some(Value::Null) => Sorter::default(),
        Some(v) => Sorter::parse(v, "sorter")?,
    };
    let projection = match map.get("projection") {
        None | Some(Value::Null) => Projection::default(),
        Some(v) => Projection::parse(v, "projection")?,
    };

    log::debug!(
        "parsed query document: {} leaf(s), {} sort key(s), {} projected field(s)",
        criteria.leaf_count(),
        sorter.keys.len(),
        projection.fields.len()
    );

    Ok(QueryDocument {
        criteria,
        pager,
        sorter,
        projection,
    })
}

/// Parse JSON text into a query document
pub fn parse_document_str(text: &str) -> Result<QueryDocument, QrParseError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| QrParseError::malformed("$", format!("invalid JSON: {}", e)))?;
    parse_document(&value)
}
