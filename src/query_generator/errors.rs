use thiserror::Error;

use crate::join_catalog::JoinCatalogError;
use crate::qr_parser::QrParseError;

/// Fatal compilation failure. No partial predicate is ever returned alongside one.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] QrParseError),

    #[error(transparent)]
    Catalog(#[from] JoinCatalogError),

    #[error("Criteria leaf on `{field}` could not be compiled: {source}")]
    Leaf {
        field: String,
        #[source]
        source: JoinCatalogError,
    },

    #[error("Unknown dialect `{0}` (expected mysql or postgres)")]
    UnknownDialect(String),

    #[error("Unknown backend `{0}` (expected sql or condition)")]
    UnknownBackend(String),
}

impl CompileError {
    /// The catalog error behind this failure, if any
    pub fn catalog_error(&self) -> Option<&JoinCatalogError> {
        match self {
            CompileError::Catalog(e) | CompileError::Leaf { source: e, .. } => Some(e),
            _ => None,
        }
    }

    pub fn is_unresolved_field(&self) -> bool {
        matches!(
            self.catalog_error(),
            Some(JoinCatalogError::UnresolvedField { .. })
        )
    }

    pub fn is_ambiguous_alias(&self) -> bool {
        matches!(
            self.catalog_error(),
            Some(JoinCatalogError::AmbiguousAlias { .. })
        )
    }
}
