use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::JoinCatalogError;
use super::join_graph::{
    DataSourceHandle, DbNode, EntityRef, JoinDescription, JoinSpec, NodeLoader,
};

/// Table catalog loaded from YAML.
///
/// ```yaml
/// root: Order                 # entity the query selects from
/// tables:
///   - entity: Order
///     table: orders
///     fields:                 # field -> physical column
///       id: id
///       customerId: customer_id
///     aliases:                # alias -> field
///       orderId: id
///   - entity: Customer
///     table: customers
///     fields:
///       id: id
///       name: name
/// joins:
///   - left: { entity: Order, field: customerId }
///     right: { entity: Customer, field: id }
///     kind: left              # inner (default) | left
/// ```
///
/// The catalog doubles as a [`NodeLoader`]: it serves node metadata for any data-source
/// handle, since everything it knows was read up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub root: EntityRef,
    pub tables: Vec<TableConfig>,
    #[serde(default)]
    pub joins: Vec<JoinSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub entity: EntityRef,
    pub table: String,
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl TableConfig {
    fn to_node(&self) -> DbNode {
        DbNode {
            entity: self.entity.clone(),
            table: self.table.clone(),
            fields: self.fields.clone(),
            aliases: self.aliases.clone(),
        }
    }
}

impl CatalogConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, JoinCatalogError> {
        let config: CatalogConfig =
            serde_yaml::from_str(content).map_err(|e| JoinCatalogError::ConfigParseError {
                error: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, JoinCatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| JoinCatalogError::ConfigReadError {
            error: format!("{}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Structural checks: unique entities and tables, aliases pointing at declared fields,
    /// root and join endpoints naming declared entities and fields, and no entity joined in
    /// twice (the root included).
    pub fn validate(&self) -> Result<(), JoinCatalogError> {
        let mut entities = HashSet::new();
        let mut tables = HashSet::new();
        for table in &self.tables {
            if table.table.trim().is_empty() {
                return Err(invalid(format!("entity `{}` has an empty table name", table.entity)));
            }
            if !entities.insert(&table.entity) {
                return Err(invalid(format!("entity `{}` is declared twice", table.entity)));
            }
            if !tables.insert(table.table.as_str()) {
                return Err(invalid(format!(
                    "table `{}` is mapped by more than one entity",
                    table.table
                )));
            }
            if table.fields.is_empty() {
                return Err(invalid(format!("entity `{}` declares no fields", table.entity)));
            }
            for (alias, field) in &table.aliases {
                if !table.fields.contains_key(field) {
                    return Err(invalid(format!(
                        "alias `{}` of entity `{}` points at unknown field `{}`",
                        alias, table.entity, field
                    )));
                }
            }
        }

        self.table_for(&self.root)?;
        let mut joined = HashSet::new();
        joined.insert(&self.root);
        for join in &self.joins {
            if join.left.entity == join.right.entity || !joined.insert(&join.right.entity) {
                return Err(JoinCatalogError::RepeatedJoinEntity {
                    entity: join.right.entity.to_string(),
                });
            }
            for end in [&join.left, &join.right] {
                let table = self.table_for(&end.entity)?;
                if table.to_node().canonical_field(&end.field).is_none() {
                    return Err(JoinCatalogError::UnknownJoinField {
                        entity: end.entity.to_string(),
                        field: end.field.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn table_for(&self, entity: &EntityRef) -> Result<&TableConfig, JoinCatalogError> {
        self.tables
            .iter()
            .find(|t| &t.entity == entity)
            .ok_or_else(|| JoinCatalogError::UnknownEntity {
                entity: entity.to_string(),
            })
    }

    pub fn join_description(&self) -> JoinDescription {
        JoinDescription {
            root: self.root.clone(),
            joins: self.joins.clone(),
        }
    }
}

impl NodeLoader for CatalogConfig {
    fn configure(
        &self,
        entity: &EntityRef,
        field: Option<&str>,
        source: &DataSourceHandle,
    ) -> Result<DbNode, JoinCatalogError> {
        let node = self.table_for(entity)?.to_node();
        if let Some(field) = field {
            if node.canonical_field(field).is_none() {
                return Err(JoinCatalogError::UnknownJoinField {
                    entity: entity.to_string(),
                    field: field.to_string(),
                });
            }
        }
        log::debug!("catalog served `{}` for data source `{}`", entity, source.name);
        Ok(node)
    }
}

fn invalid(message: String) -> JoinCatalogError {
    JoinCatalogError::InvalidConfig { message }
}
