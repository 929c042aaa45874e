//! Backend compiler.
//!
//! A single tree walk turns a [`QueryDocument`] into backend-native artifacts. Backends only
//! supply the emission primitives ([`Backend`]); resolution, escaping, empty-set handling,
//! sorting and paging are shared.

pub mod condition;
pub mod dialect;
pub mod errors;
pub mod pagination;
pub mod sql_fragment;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::join_catalog::{AliasRegistry, ColumnRef, JoinCatalogError, JoinGraph, JoinKind};
use crate::qr_parser::{
    Connector, CriteriaNode, LeafValue, Operator, QueryDocument, Scalar, SortDirection,
};

pub use condition::{Condition, ConditionBackend, Row};
pub use dialect::{Dialect, DialectKind, MySqlDialect, PostgresDialect};
pub use errors::CompileError;
pub use pagination::{page_window, PageLimits, PageWindow};
pub use sql_fragment::{SqlBackend, SqlFragment};

/// Binary comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn to_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// Which part of the value a pattern pins down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Prefix,
    Suffix,
    Contains,
}

impl PatternKind {
    /// Wrap an already-escaped literal in `%` wildcards
    pub fn wrap(self, escaped: &str) -> String {
        match self {
            PatternKind::Prefix => format!("{}%", escaped),
            PatternKind::Suffix => format!("%{}", escaped),
            PatternKind::Contains => format!("%{}%", escaped),
        }
    }
}

/// A field reference resolved to its physical column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    /// Name as written in the document
    pub field: String,
    pub column: ColumnRef,
    /// Escaped, table-qualified identifier
    pub sql: String,
}

/// Emission primitives of one query-execution backend
pub trait Backend {
    type Predicate: Clone + fmt::Debug;
    type Order: Clone + fmt::Debug;

    fn kind(&self) -> BackendKind;

    fn always_true(&self) -> Self::Predicate;

    fn always_false(&self) -> Self::Predicate;

    /// Combine two or more compiled children
    fn combine(&self, connector: Connector, parts: Vec<Self::Predicate>) -> Self::Predicate;

    fn compare(&self, column: &ResolvedColumn, op: CompareOp, value: &Scalar) -> Self::Predicate;

    fn null_check(&self, column: &ResolvedColumn, negated: bool) -> Self::Predicate;

    /// Membership test; `values` is never empty
    fn membership(&self, column: &ResolvedColumn, values: &[Scalar], negated: bool)
        -> Self::Predicate;

    /// Pattern match on the raw literal; the backend escapes its own wildcards
    fn pattern(&self, column: &ResolvedColumn, kind: PatternKind, literal: &str) -> Self::Predicate;

    fn order(&self, column: &ResolvedColumn, direction: SortDirection) -> Self::Order;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sql,
    Condition,
}

impl FromStr for BackendKind {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sql" => Ok(BackendKind::Sql),
            "condition" => Ok(BackendKind::Condition),
            _ => Err(CompileError::UnknownBackend(s.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Sql => write!(f, "sql"),
            BackendKind::Condition => write!(f, "condition"),
        }
    }
}

/// Non-fatal issue recorded next to a successful compilation
#[derive(Debug, Clone, PartialEq)]
pub enum CompileWarning {
    UnresolvedSortField {
        field: String,
        reason: JoinCatalogError,
    },
    DuplicateSortField {
        field: String,
    },
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileWarning::UnresolvedSortField { field, reason } => {
                write!(f, "sort field `{}` skipped: {}", field, reason)
            }
            CompileWarning::DuplicateSortField { field } => {
                write!(f, "sort field `{}` repeats an earlier sort key and was ignored", field)
            }
        }
    }
}

/// One join of the FROM clause, identifiers already escaped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: String,
    pub left: String,
    pub right: String,
}

/// Everything a compilation produces
#[derive(Debug, Clone)]
pub struct Compiled<P, O> {
    /// Escaped root table
    pub from: String,
    pub joins: Vec<JoinClause>,
    pub projection: Vec<ResolvedColumn>,
    pub predicate: P,
    pub order_by: Vec<O>,
    pub window: PageWindow,
    pub warnings: Vec<CompileWarning>,
}

pub type CompiledFor<B> = Compiled<<B as Backend>::Predicate, <B as Backend>::Order>;

/// Read-only view of the session state the walker needs
#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    pub registry: &'a AliasRegistry,
    pub graph: &'a JoinGraph,
    pub dialect: &'a dyn Dialect,
    pub limits: PageLimits,
}

impl CompileContext<'_> {
    pub fn resolve(&self, field: &str) -> Result<ResolvedColumn, JoinCatalogError> {
        let column = self.registry.resolve_column(field)?;
        let table = column.table.clone();
        let owner = move |_: &str| Some(table.clone());
        let sql = self.dialect.escape(&column.column, Some(&owner));
        Ok(ResolvedColumn {
            field: field.to_string(),
            column: column.clone(),
            sql,
        })
    }
}

/// Compile a whole document for one backend
pub fn compile<B: Backend>(
    ctx: &CompileContext<'_>,
    backend: &B,
    document: &QueryDocument,
) -> Result<CompiledFor<B>, CompileError> {
    let joins = compile_joins(ctx)?;
    let projection = document
        .projection
        .fields
        .iter()
        .map(|f| ctx.resolve(f))
        .collect::<Result<Vec<_>, _>>()?;
    let predicate = compile_criteria(ctx, backend, &document.criteria)?;

    let mut warnings = Vec::new();
    let order_by = compile_sorter(ctx, backend, document, &mut warnings);
    let window = page_window(&document.pager, &ctx.limits);

    log::debug!(
        "compiled for {} backend: {} join(s), {} sort key(s), window {:?}, {} warning(s)",
        backend.kind(),
        joins.len(),
        order_by.len(),
        window,
        warnings.len()
    );

    Ok(Compiled {
        from: ctx.dialect.escape(&ctx.graph.root.table, None),
        joins,
        projection,
        predicate,
        order_by,
        window,
        warnings,
    })
}

/// Compile a criteria tree. Any resolution failure aborts the whole compilation.
pub fn compile_criteria<B: Backend>(
    ctx: &CompileContext<'_>,
    backend: &B,
    node: &CriteriaNode,
) -> Result<B::Predicate, CompileError> {
    match node {
        CriteriaNode::Group {
            connector,
            children,
        } => {
            let mut parts = children
                .iter()
                .map(|child| compile_criteria(ctx, backend, child))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match parts.len() {
                0 => backend.always_true(),
                1 => parts.remove(0),
                _ => backend.combine(*connector, parts),
            })
        }
        CriteriaNode::Leaf { field, op, value } => {
            let column = ctx.resolve(field).map_err(|source| CompileError::Leaf {
                field: field.clone(),
                source,
            })?;
            log::debug!("leaf `{}` resolved to {}", field, column.sql);
            Ok(compile_leaf(backend, &column, *op, value))
        }
    }
}

fn compile_leaf<B: Backend>(
    backend: &B,
    column: &ResolvedColumn,
    op: Operator,
    value: &LeafValue,
) -> B::Predicate {
    let compare = |cmp: CompareOp| match value {
        LeafValue::One(v) => backend.compare(column, cmp, v),
        // arity is validated at parse time; treat a stray shape as matching nothing
        _ => backend.always_false(),
    };
    let values: &[Scalar] = match value {
        LeafValue::Many(values) => values,
        LeafValue::One(v) => std::slice::from_ref(v),
        LeafValue::None => &[],
    };

    match op {
        Operator::Eq => compare(CompareOp::Eq),
        Operator::Neq => compare(CompareOp::Neq),
        Operator::Gt => compare(CompareOp::Gt),
        Operator::Gte => compare(CompareOp::Gte),
        Operator::Lt => compare(CompareOp::Lt),
        Operator::Lte => compare(CompareOp::Lte),
        Operator::Null => backend.null_check(column, false),
        Operator::NotNull => backend.null_check(column, true),
        Operator::In if values.is_empty() => backend.always_false(),
        Operator::NotIn if values.is_empty() => backend.always_true(),
        Operator::In => backend.membership(column, values, false),
        Operator::NotIn => backend.membership(column, values, true),
        Operator::Start | Operator::End | Operator::Contain => {
            let kind = match op {
                Operator::Start => PatternKind::Prefix,
                Operator::End => PatternKind::Suffix,
                _ => PatternKind::Contains,
            };
            match value {
                LeafValue::One(v) => backend.pattern(column, kind, &pattern_literal(v)),
                _ => backend.always_false(),
            }
        }
        // connectors never reach a leaf: the parser rejects them
        Operator::And | Operator::Or => backend.always_false(),
    }
}

fn pattern_literal(value: &Scalar) -> String {
    match value {
        Scalar::Str(s) => s.clone(),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
    }
}

/// Compile sort keys. Unresolvable fields and repeated columns are skipped with a warning.
pub fn compile_sorter<B: Backend>(
    ctx: &CompileContext<'_>,
    backend: &B,
    document: &QueryDocument,
    warnings: &mut Vec<CompileWarning>,
) -> Vec<B::Order> {
    let mut seen: HashSet<ColumnRef> = HashSet::new();
    let mut orders = Vec::with_capacity(document.sorter.keys.len());
    for key in &document.sorter.keys {
        let column = match ctx.resolve(&key.field) {
            Ok(column) => column,
            Err(reason) => {
                log::warn!("skipping sort field `{}`: {}", key.field, reason);
                warnings.push(CompileWarning::UnresolvedSortField {
                    field: key.field.clone(),
                    reason,
                });
                continue;
            }
        };
        if !seen.insert(column.column.clone()) {
            log::warn!("ignoring repeated sort field `{}`", key.field);
            warnings.push(CompileWarning::DuplicateSortField {
                field: key.field.clone(),
            });
            continue;
        }
        orders.push(backend.order(&column, key.direction));
    }
    orders
}

fn compile_joins(ctx: &CompileContext<'_>) -> Result<Vec<JoinClause>, CompileError> {
    ctx.graph
        .refs
        .iter()
        .map(|r| {
            let left = ctx.resolve(&format!("{}.{}", r.on.from_table, r.on.from_field))?;
            let right = ctx.resolve(&format!("{}.{}", r.on.to_table, r.on.to_field))?;
            Ok(JoinClause {
                kind: r.kind,
                table: ctx.dialect.escape(&r.right.table, None),
                left: left.sql,
                right: right.sql,
            })
        })
        .collect()
}
