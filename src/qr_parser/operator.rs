//! Operator vocabulary of the Qr criteria DSL.
//!
//! Each operator has exactly one wire literal. Connectors (`AND`/`OR`) share the
//! vocabulary but are only legal as group connectors, never as leaf operators.

use std::fmt;
use std::str::FromStr;

use super::errors::QrParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Null,
    NotNull,
    In,
    NotIn,
    Start,
    End,
    Contain,
}

/// Number of values a leaf operator expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    None,
    One,
    Many,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::None => write!(f, "no value"),
            Arity::One => write!(f, "a single scalar"),
            Arity::Many => write!(f, "an array of scalars"),
        }
    }
}

impl Operator {
    pub const ALL: [Operator; 15] = [
        Operator::And,
        Operator::Or,
        Operator::Eq,
        Operator::Neq,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Null,
        Operator::NotNull,
        Operator::In,
        Operator::NotIn,
        Operator::Start,
        Operator::End,
        Operator::Contain,
    ];

    /// Resolve a wire literal. Matching is exact; anything outside the closed set fails.
    pub fn parse(token: &str) -> Result<Self, QrParseError> {
        let op = match token {
            "AND" => Operator::And,
            "OR" => Operator::Or,
            "=" => Operator::Eq,
            "<>" => Operator::Neq,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            "n" => Operator::Null,
            "nn" => Operator::NotNull,
            "i" => Operator::In,
            "ni" => Operator::NotIn,
            "s" => Operator::Start,
            "e" => Operator::End,
            "c" => Operator::Contain,
            _ => {
                return Err(QrParseError::UnknownOperator {
                    token: token.to_string(),
                })
            }
        };
        Ok(op)
    }

    pub fn literal(self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Eq => "=",
            Operator::Neq => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Null => "n",
            Operator::NotNull => "nn",
            Operator::In => "i",
            Operator::NotIn => "ni",
            Operator::Start => "s",
            Operator::End => "e",
            Operator::Contain => "c",
        }
    }

    /// Expected leaf value arity; `None` for connectors, which never appear on leaves.
    pub fn arity(self) -> Option<Arity> {
        match self {
            Operator::And | Operator::Or => None,
            Operator::Null | Operator::NotNull => Some(Arity::None),
            Operator::In | Operator::NotIn => Some(Arity::Many),
            Operator::Eq
            | Operator::Neq
            | Operator::Gt
            | Operator::Gte
            | Operator::Lt
            | Operator::Lte
            | Operator::Start
            | Operator::End
            | Operator::Contain => Some(Arity::One),
        }
    }

    pub fn is_connector(self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }
}

impl FromStr for Operator {
    type Err = QrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::parse(s)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal())
    }
}

/// Group connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    pub fn parse(token: &str) -> Option<Self> {
        match Operator::parse(token).ok()? {
            Operator::And => Some(Connector::And),
            Operator::Or => Some(Connector::Or),
            _ => None,
        }
    }

    pub fn literal(self) -> &'static str {
        match self {
            Connector::And => Operator::And.literal(),
            Connector::Or => Operator::Or.literal(),
        }
    }
}
