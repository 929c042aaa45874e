//! Join graph: participating tables (`DbNode`), equality join links (`JoinOn`) and the
//! node pairs they connect (`DbRef`).
//!
//! Nodes are produced by a [`NodeLoader`], the collaborator that knows table metadata.
//! A [`JoinGraphBuilder`] memoises loader results for the lifetime of one builder, so each
//! `(entity, field)` pair is loaded at most once per session.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::errors::JoinCatalogError;

/// Name of a mapped entity (the logical type a table is mapped from)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRef(pub String);

impl EntityRef {
    pub fn new(name: impl Into<String>) -> Self {
        EntityRef(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle to the data source a loader reads metadata from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataSourceHandle {
    pub name: String,
}

impl DataSourceHandle {
    pub fn new(name: impl Into<String>) -> Self {
        DataSourceHandle { name: name.into() }
    }
}

impl Default for DataSourceHandle {
    fn default() -> Self {
        DataSourceHandle::new("default")
    }
}

/// One participating table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbNode {
    pub entity: EntityRef,
    pub table: String,
    /// field → column
    pub fields: BTreeMap<String, String>,
    /// alias → field
    pub aliases: BTreeMap<String, String>,
}

impl DbNode {
    /// Canonical field name for a field or alias of this node
    pub fn canonical_field<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.fields.contains_key(name) {
            Some(name)
        } else {
            self.aliases.get(name).map(String::as_str)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
}

impl JoinKind {
    pub fn to_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// Equality join predicate `from_table.from_field = to_table.to_field`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinOn {
    pub from_table: String,
    pub from_field: String,
    pub to_table: String,
    pub to_field: String,
}

impl fmt::Display for JoinOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} = {}.{}",
            self.from_table, self.from_field, self.to_table, self.to_field
        )
    }
}

/// A left/right node pair and the field pair joining them.
///
/// Identity is the `(left table, left field, right table, right field)` tuple.
#[derive(Debug, Clone)]
pub struct DbRef {
    pub left: DbNode,
    pub right: DbNode,
    pub on: JoinOn,
    pub kind: JoinKind,
}

impl DbRef {
    pub fn new(left: DbNode, right: DbNode, field_pair: (&str, &str), kind: JoinKind) -> Self {
        let on = JoinOn {
            from_table: left.table.clone(),
            from_field: field_pair.0.to_string(),
            to_table: right.table.clone(),
            to_field: field_pair.1.to_string(),
        };
        DbRef {
            left,
            right,
            on,
            kind,
        }
    }
}

impl PartialEq for DbRef {
    fn eq(&self, other: &Self) -> bool {
        self.on == other.on
    }
}

impl Eq for DbRef {}

impl Hash for DbRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.on.hash(state);
    }
}

/// Entity + field reference inside a join description
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldRef {
    pub entity: EntityRef,
    pub field: String,
}

impl FieldRef {
    pub fn new(entity: impl Into<String>, field: impl Into<String>) -> Self {
        FieldRef {
            entity: EntityRef::new(entity),
            field: field.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinSpec {
    pub left: FieldRef,
    pub right: FieldRef,
    #[serde(default)]
    pub kind: JoinKind,
}

/// Declarative description of the tables taking part in a query. Hashable so it can key
/// the session cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinDescription {
    pub root: EntityRef,
    pub joins: Vec<JoinSpec>,
}

impl JoinDescription {
    pub fn single(root: impl Into<String>) -> Self {
        JoinDescription {
            root: EntityRef::new(root),
            joins: Vec::new(),
        }
    }

    pub fn join(mut self, left: FieldRef, right: FieldRef, kind: JoinKind) -> Self {
        self.joins.push(JoinSpec { left, right, kind });
        self
    }

    /// Every entity named by the description, root first, without repeats
    pub fn entities(&self) -> Vec<&EntityRef> {
        let mut seen = HashSet::new();
        std::iter::once(&self.root)
            .chain(self.joins.iter().flat_map(|j| [&j.left.entity, &j.right.entity]))
            .filter(|e| seen.insert(*e))
            .collect()
    }
}

/// Supplies table metadata for an entity.
///
/// `field` is the join field the node is requested for (`None` for the root table).
/// Must be deterministic for a given `(entity, field, source)` triple.
pub trait NodeLoader {
    fn configure(
        &self,
        entity: &EntityRef,
        field: Option<&str>,
        source: &DataSourceHandle,
    ) -> Result<DbNode, JoinCatalogError>;
}

/// Resolved join graph of one session
#[derive(Debug, Clone)]
pub struct JoinGraph {
    pub root: DbNode,
    pub refs: Vec<DbRef>,
}

impl JoinGraph {
    /// Distinct participating nodes, root first then in join order
    pub fn nodes(&self) -> Vec<&DbNode> {
        let mut seen = HashSet::new();
        std::iter::once(&self.root)
            .chain(self.refs.iter().flat_map(|r| [&r.left, &r.right]))
            .filter(|n| seen.insert(n.table.clone()))
            .collect()
    }
}

pub struct JoinGraphBuilder<'a, L: NodeLoader + ?Sized> {
    loader: &'a L,
    source: &'a DataSourceHandle,
    memo: HashMap<(EntityRef, Option<String>), DbNode>,
    loads: usize,
}

impl<'a, L: NodeLoader + ?Sized> JoinGraphBuilder<'a, L> {
    pub fn new(loader: &'a L, source: &'a DataSourceHandle) -> Self {
        JoinGraphBuilder {
            loader,
            source,
            memo: HashMap::new(),
            loads: 0,
        }
    }

    /// Number of loader invocations made so far
    pub fn loads(&self) -> usize {
        self.loads
    }

    pub fn node(
        &mut self,
        entity: &EntityRef,
        field: Option<&str>,
    ) -> Result<DbNode, JoinCatalogError> {
        let key = (entity.clone(), field.map(str::to_string));
        if let Some(node) = self.memo.get(&key) {
            return Ok(node.clone());
        }
        let node = self.loader.configure(entity, field, self.source)?;
        self.loads += 1;
        log::debug!(
            "loaded node `{}` -> `{}` (field {:?}) from `{}`",
            entity,
            node.table,
            field,
            self.source.name
        );
        self.memo.insert(key, node.clone());
        Ok(node)
    }

    /// Resolve every join of `description`. Each join's left entity must already be part of
    /// the graph (the root or the right side of an earlier join), and its right entity must
    /// not be: every table appears once, unaliased.
    pub fn build(&mut self, description: &JoinDescription) -> Result<JoinGraph, JoinCatalogError> {
        let root = self.node(&description.root, None)?;
        let mut connected: HashSet<EntityRef> = HashSet::new();
        connected.insert(description.root.clone());

        let mut refs = Vec::with_capacity(description.joins.len());
        for spec in &description.joins {
            if !connected.contains(&spec.left.entity) {
                return Err(JoinCatalogError::DisconnectedJoin {
                    entity: spec.left.entity.to_string(),
                });
            }
            if connected.contains(&spec.right.entity) {
                return Err(JoinCatalogError::RepeatedJoinEntity {
                    entity: spec.right.entity.to_string(),
                });
            }
            let left = self.node(&spec.left.entity, Some(spec.left.field.as_str()))?;
            let right = self.node(&spec.right.entity, Some(spec.right.field.as_str()))?;
            let left_field = canonical(&left, &spec.left)?;
            let right_field = canonical(&right, &spec.right)?;
            refs.push(DbRef::new(
                left,
                right,
                (left_field.as_str(), right_field.as_str()),
                spec.kind,
            ));
            connected.insert(spec.right.entity.clone());
        }

        Ok(JoinGraph { root, refs })
    }
}

fn canonical(node: &DbNode, field: &FieldRef) -> Result<String, JoinCatalogError> {
    node.canonical_field(&field.field)
        .map(str::to_string)
        .ok_or_else(|| JoinCatalogError::UnknownJoinField {
            entity: field.entity.to_string(),
            field: field.field.clone(),
        })
}
