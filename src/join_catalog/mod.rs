//! Table/field metadata for a query session: alias registry, join graph and the YAML
//! catalog that feeds them.

pub mod alias_registry;
pub mod catalog_config;
pub mod errors;
pub mod join_graph;

pub use alias_registry::{AliasRegistry, ColumnRef};
pub use catalog_config::{CatalogConfig, TableConfig};
pub use errors::JoinCatalogError;
pub use join_graph::{
    DataSourceHandle, DbNode, DbRef, EntityRef, FieldRef, JoinDescription, JoinGraph,
    JoinGraphBuilder, JoinKind, JoinOn, JoinSpec, NodeLoader,
};
