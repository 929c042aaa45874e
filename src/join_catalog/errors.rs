//! Errors raised while registering aliases, building join graphs and loading catalogs.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum JoinCatalogError {
    #[error("Field or alias `{field}` is not registered in this session")]
    UnresolvedField { field: String },

    #[error("Alias `{alias}` is claimed by both `{first_table}` and `{second_table}`; qualify it as `table.{alias}`")]
    AmbiguousAlias {
        alias: String,
        first_table: String,
        second_table: String,
    },

    #[error("No table is configured for entity `{entity}`")]
    UnknownEntity { entity: String },

    #[error("Entity `{entity}` has no field or alias `{field}`")]
    UnknownJoinField { entity: String, field: String },

    #[error("Join on `{entity}` does not connect to any table already in the graph")]
    DisconnectedJoin { entity: String },

    #[error("Entity `{entity}` is joined into the graph a second time")]
    RepeatedJoinEntity { entity: String },

    #[error("Failed to read catalog file: {error}")]
    ConfigReadError { error: String },

    #[error("Failed to parse catalog: {error}")]
    ConfigParseError { error: String },

    #[error("Invalid catalog: {message}")]
    InvalidConfig { message: String },
}

impl JoinCatalogError {
    pub fn unresolved(field: impl Into<String>) -> Self {
        JoinCatalogError::UnresolvedField {
            field: field.into(),
        }
    }

    pub fn ambiguous(
        alias: impl Into<String>,
        first_table: impl Into<String>,
        second_table: impl Into<String>,
    ) -> Self {
        JoinCatalogError::AmbiguousAlias {
            alias: alias.into(),
            first_table: first_table.into(),
            second_table: second_table.into(),
        }
    }
}
