//! Typed condition backend.
//!
//! Predicates are a closed [`Condition`] tree over table-qualified fields, the shape typed
//! query DSLs consume. Conditions can be evaluated against in-memory rows with SQL semantics
//! for NULL (any comparison with a missing value is false).

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use super::{Backend, BackendKind, CompareOp, PatternKind, ResolvedColumn};
use crate::join_catalog::ColumnRef;
use crate::qr_parser::{Connector, Scalar, SortDirection};

/// Escape character for LIKE patterns built by this backend
pub const LIKE_ESCAPE: char = '!';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub column: ColumnRef,
    /// Escaped, qualified rendering
    pub rendered: String,
}

impl From<&ResolvedColumn> for Field {
    fn from(column: &ResolvedColumn) -> Self {
        Field {
            column: column.column.clone(),
            rendered: column.sql.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    True,
    False,
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Compare {
        field: Field,
        op: CompareOp,
        value: Scalar,
    },
    IsNull {
        field: Field,
        negated: bool,
    },
    In {
        field: Field,
        values: Vec<Scalar>,
        negated: bool,
    },
    Like {
        field: Field,
        pattern: String,
        escape: char,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: Field,
    pub direction: SortDirection,
}

/// An in-memory row keyed by physical column. Absent columns read as NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: HashMap<ColumnRef, Scalar>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, table: &str, column: &str, value: impl Into<Scalar>) -> Self {
        self.values.insert(ColumnRef::new(table, column), value.into());
        self
    }

    pub fn get(&self, column: &ColumnRef) -> Option<&Scalar> {
        self.values.get(column)
    }
}

impl Condition {
    pub fn evaluate(&self, row: &Row) -> bool {
        match self {
            Condition::True => true,
            Condition::False => false,
            Condition::And(parts) => parts.iter().all(|c| c.evaluate(row)),
            Condition::Or(parts) => parts.iter().any(|c| c.evaluate(row)),
            Condition::Compare { field, op, value } => match row.get(&field.column) {
                Some(actual) => compare_matches(actual.compare(value), *op),
                None => false,
            },
            Condition::IsNull { field, negated } => row.get(&field.column).is_none() != *negated,
            Condition::In {
                field,
                values,
                negated,
            } => match row.get(&field.column) {
                Some(actual) => {
                    let found = values
                        .iter()
                        .any(|v| actual.compare(v) == Some(Ordering::Equal));
                    found != *negated
                }
                None => false,
            },
            Condition::Like {
                field,
                pattern,
                escape,
            } => match row.get(&field.column) {
                Some(Scalar::Str(s)) => like_matches(s, pattern, *escape),
                Some(other) => like_matches(&other.to_string(), pattern, *escape),
                None => false,
            },
        }
    }

    /// Rows of `rows` matching this condition
    pub fn filter<'a>(&self, rows: &'a [Row]) -> Vec<&'a Row> {
        rows.iter().filter(|r| self.evaluate(r)).collect()
    }
}

fn compare_matches(ordering: Option<Ordering>, op: CompareOp) -> bool {
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Neq => ordering != Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Gte => ordering != Ordering::Less,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Lte => ordering != Ordering::Greater,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LikeToken {
    Literal(char),
    AnyOne,
    AnyMany,
}

fn tokenize_like(pattern: &str, escape: char) -> Vec<LikeToken> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let token = match c {
            c if c == escape => LikeToken::Literal(chars.next().unwrap_or(escape)),
            '%' => LikeToken::AnyMany,
            '_' => LikeToken::AnyOne,
            c => LikeToken::Literal(c),
        };
        tokens.push(token);
    }
    tokens
}

/// SQL LIKE matching with an explicit escape character
pub fn like_matches(value: &str, pattern: &str, escape: char) -> bool {
    let tokens = tokenize_like(pattern, escape);
    let chars: Vec<char> = value.chars().collect();

    // matched[j]: the first i tokens match chars[..j]
    let mut matched = vec![false; chars.len() + 1];
    matched[0] = true;
    for token in &tokens {
        let mut next = vec![false; chars.len() + 1];
        match token {
            LikeToken::AnyMany => {
                let mut reachable = false;
                for j in 0..=chars.len() {
                    reachable |= matched[j];
                    next[j] = reachable;
                }
            }
            LikeToken::AnyOne => {
                for j in 1..=chars.len() {
                    next[j] = matched[j - 1];
                }
            }
            LikeToken::Literal(c) => {
                for j in 1..=chars.len() {
                    next[j] = matched[j - 1] && chars[j - 1] == *c;
                }
            }
        }
        matched = next;
    }
    matched[chars.len()]
}

/// Escape LIKE metacharacters with [`LIKE_ESCAPE`]
pub fn escape_like(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if c == LIKE_ESCAPE || c == '%' || c == '_' {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::True => write!(f, "true"),
            Condition::False => write!(f, "false"),
            Condition::And(parts) | Condition::Or(parts) => {
                let separator = if matches!(self, Condition::And(_)) {
                    " and "
                } else {
                    " or "
                };
                write!(f, "(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(separator)?;
                    }
                    write!(f, "{}", part)?;
                }
                write!(f, ")")
            }
            Condition::Compare { field, op, value } => {
                write!(f, "{} {} {}", field.rendered, op.to_sql(), value)
            }
            Condition::IsNull { field, negated } => {
                let check = if *negated { "is not null" } else { "is null" };
                write!(f, "{} {}", field.rendered, check)
            }
            Condition::In {
                field,
                values,
                negated,
            } => {
                let keyword = if *negated { "not in" } else { "in" };
                let list: Vec<String> = values.iter().map(Scalar::to_string).collect();
                write!(f, "{} {} ({})", field.rendered, keyword, list.join(", "))
            }
            Condition::Like {
                field,
                pattern,
                escape,
            } => {
                let pattern = Scalar::Str(pattern.clone());
                write!(f, "{} like {} escape '{}'", field.rendered, pattern, escape)
            }
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{} {}", self.field.rendered, direction)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionBackend;

impl Backend for ConditionBackend {
    type Predicate = Condition;
    type Order = SortField;

    fn kind(&self) -> BackendKind {
        BackendKind::Condition
    }

    fn always_true(&self) -> Condition {
        Condition::True
    }

    fn always_false(&self) -> Condition {
        Condition::False
    }

    fn combine(&self, connector: Connector, parts: Vec<Condition>) -> Condition {
        match connector {
            Connector::And => Condition::And(parts),
            Connector::Or => Condition::Or(parts),
        }
    }

    fn compare(&self, column: &ResolvedColumn, op: CompareOp, value: &Scalar) -> Condition {
        Condition::Compare {
            field: column.into(),
            op,
            value: value.clone(),
        }
    }

    fn null_check(&self, column: &ResolvedColumn, negated: bool) -> Condition {
        Condition::IsNull {
            field: column.into(),
            negated,
        }
    }

    fn membership(&self, column: &ResolvedColumn, values: &[Scalar], negated: bool) -> Condition {
        Condition::In {
            field: column.into(),
            values: values.to_vec(),
            negated,
        }
    }

    fn pattern(&self, column: &ResolvedColumn, kind: PatternKind, literal: &str) -> Condition {
        Condition::Like {
            field: column.into(),
            pattern: kind.wrap(&escape_like(literal)),
            escape: LIKE_ESCAPE,
        }
    }

    fn order(&self, column: &ResolvedColumn, direction: SortDirection) -> SortField {
        SortField {
            field: column.into(),
            direction,
        }
    }
}
