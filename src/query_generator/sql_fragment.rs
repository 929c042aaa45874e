//! SQL-segment backend: predicates are SQL text with `?` placeholders and an ordered list of
//! bind parameters, the shape wrapper-style ORMs consume.

use std::fmt::Write;

use super::{Backend, BackendKind, CompareOp, CompiledFor, PatternKind, ResolvedColumn};
use crate::qr_parser::{Connector, Scalar, SortDirection};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Scalar>,
    /// Set when the fragment joins several conditions and needs parentheses when nested
    compound: bool,
}

impl SqlFragment {
    pub fn new(sql: impl Into<String>, params: Vec<Scalar>) -> Self {
        SqlFragment {
            sql: sql.into(),
            params,
            compound: false,
        }
    }

    /// Inline parameters for display. Not meant for execution.
    pub fn to_debug_sql(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut params = self.params.iter();
        for c in self.sql.chars() {
            if c == '?' {
                if let Some(p) = params.next() {
                    let _ = write!(out, "{}", p);
                    continue;
                }
            }
            out.push(c);
        }
        out
    }
}

/// Escape LIKE metacharacters with a backslash, the default escape of MySQL and PostgreSQL
pub fn escape_like(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlBackend;

impl Backend for SqlBackend {
    type Predicate = SqlFragment;
    type Order = String;

    fn kind(&self) -> BackendKind {
        BackendKind::Sql
    }

    fn always_true(&self) -> SqlFragment {
        SqlFragment::new("1 = 1", Vec::new())
    }

    fn always_false(&self) -> SqlFragment {
        SqlFragment::new("1 = 0", Vec::new())
    }

    fn combine(&self, connector: Connector, parts: Vec<SqlFragment>) -> SqlFragment {
        let separator = format!(" {} ", connector.literal());
        let mut sql = String::new();
        let mut params = Vec::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                sql.push_str(&separator);
            }
            if part.compound {
                let _ = write!(sql, "({})", part.sql);
            } else {
                sql.push_str(&part.sql);
            }
            params.extend(part.params);
        }
        SqlFragment {
            sql,
            params,
            compound: true,
        }
    }

    fn compare(&self, column: &ResolvedColumn, op: CompareOp, value: &Scalar) -> SqlFragment {
        SqlFragment::new(
            format!("{} {} ?", column.sql, op.to_sql()),
            vec![value.clone()],
        )
    }

    fn null_check(&self, column: &ResolvedColumn, negated: bool) -> SqlFragment {
        let check = if negated { "IS NOT NULL" } else { "IS NULL" };
        SqlFragment::new(format!("{} {}", column.sql, check), Vec::new())
    }

    fn membership(&self, column: &ResolvedColumn, values: &[Scalar], negated: bool) -> SqlFragment {
        let placeholders = vec!["?"; values.len()].join(", ");
        let keyword = if negated { "NOT IN" } else { "IN" };
        SqlFragment::new(
            format!("{} {} ({})", column.sql, keyword, placeholders),
            values.to_vec(),
        )
    }

    fn pattern(&self, column: &ResolvedColumn, kind: PatternKind, literal: &str) -> SqlFragment {
        SqlFragment::new(
            format!("{} LIKE ?", column.sql),
            vec![Scalar::Str(kind.wrap(&escape_like(literal)))],
        )
    }

    fn order(&self, column: &ResolvedColumn, direction: SortDirection) -> String {
        format!("{} {}", column.sql, direction.to_sql())
    }
}

impl SqlBackend {
    /// Render a complete SELECT statement from compiled artifacts
    pub fn render_select(&self, compiled: &CompiledFor<Self>) -> SqlFragment {
        let mut sql = String::from("SELECT ");
        if compiled.projection.is_empty() {
            sql.push('*');
        } else {
            let columns: Vec<&str> = compiled.projection.iter().map(|c| c.sql.as_str()).collect();
            sql.push_str(&columns.join(", "));
        }
        let _ = write!(sql, " FROM {}", compiled.from);
        for join in &compiled.joins {
            let _ = write!(
                sql,
                " {} {} ON {} = {}",
                join.kind.to_sql(),
                join.table,
                join.left,
                join.right
            );
        }
        let _ = write!(sql, " WHERE {}", compiled.predicate.sql);
        if !compiled.order_by.is_empty() {
            let _ = write!(sql, " ORDER BY {}", compiled.order_by.join(", "));
        }
        let _ = write!(
            sql,
            " LIMIT {} OFFSET {}",
            compiled.window.limit, compiled.window.offset
        );
        SqlFragment::new(sql, compiled.predicate.params.clone())
    }
}
