use thiserror::Error;

use super::operator::Arity;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QrParseError {
    #[error("Unknown operator token `{token}`")]
    UnknownOperator { token: String },

    #[error("Malformed criteria at `{path}`: {reason}")]
    MalformedCriteria { path: String, reason: String },

    #[error("Invalid value for operator `{op}` at `{path}`: expected {expected}, found {found}")]
    InvalidLeafArity {
        path: String,
        op: String,
        expected: Arity,
        found: String,
    },
}

impl QrParseError {
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        QrParseError::MalformedCriteria {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Path of the offending document node, when the error carries one
    pub fn path(&self) -> Option<&str> {
        match self {
            QrParseError::UnknownOperator { .. } => None,
            QrParseError::MalformedCriteria { path, .. }
            | QrParseError::InvalidLeafArity { path, .. } => Some(path),
        }
    }
}
