//! Per-dialect identifier escaping.
//!
//! An identifier is quoted when it is a reserved word of the dialect or is not a plain
//! identifier (`[A-Za-z_][A-Za-z0-9_]*`). Embedded quote characters are doubled.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::CompileError;

lazy_static! {
    static ref PLAIN_IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();

    static ref MYSQL_KEYWORDS: HashSet<&'static str> = [
        "ACCESSIBLE", "ADD", "ALL", "ALTER", "ANALYZE", "AND", "AS", "ASC", "BEFORE",
        "BETWEEN", "BIGINT", "BINARY", "BLOB", "BOTH", "BY", "CALL", "CASCADE", "CASE",
        "CHANGE", "CHAR", "CHARACTER", "CHECK", "COLLATE", "COLUMN", "CONDITION",
        "CONSTRAINT", "CONTINUE", "CONVERT", "CREATE", "CROSS", "CUBE", "CURRENT_DATE",
        "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "CURSOR", "DATABASE",
        "DATABASES", "DAY_HOUR", "DEC", "DECIMAL", "DECLARE", "DEFAULT", "DELAYED", "DELETE",
        "DESC", "DESCRIBE", "DISTINCT", "DIV", "DOUBLE", "DROP", "DUAL", "EACH", "ELSE",
        "ELSEIF", "ENCLOSED", "ESCAPED", "EXISTS", "EXIT", "EXPLAIN", "FALSE", "FETCH",
        "FLOAT", "FOR", "FORCE", "FOREIGN", "FROM", "FULLTEXT", "FUNCTION", "GENERATED",
        "GET", "GRANT", "GROUP", "GROUPS", "HAVING", "HIGH_PRIORITY", "IF", "IGNORE", "IN",
        "INDEX", "INFILE", "INNER", "INOUT", "INSERT", "INT", "INTEGER", "INTERVAL", "INTO",
        "IS", "ITERATE", "JOIN", "KEY", "KEYS", "KILL", "LAG", "LEAD", "LEADING", "LEAVE",
        "LEFT", "LIKE", "LIMIT", "LINES", "LOAD", "LOCALTIME", "LOCK", "LONG", "LOOP",
        "MATCH", "MOD", "NATURAL", "NOT", "NULL", "NUMERIC", "OF", "ON", "OPTION", "OR",
        "ORDER", "OUT", "OUTER", "OVER", "PARTITION", "PRECISION", "PRIMARY", "PROCEDURE",
        "RANGE", "RANK", "READ", "REAL", "RECURSIVE", "REFERENCES", "REGEXP", "RELEASE",
        "RENAME", "REPEAT", "REPLACE", "REQUIRE", "RESIGNAL", "RESTRICT", "RETURN", "REVOKE",
        "RIGHT", "RLIKE", "ROW", "ROWS", "SCHEMA", "SCHEMAS", "SELECT", "SET", "SHOW",
        "SIGNAL", "SMALLINT", "SPATIAL", "SQL", "STARTING", "STORED", "STRAIGHT_JOIN",
        "SYSTEM", "TABLE", "TERMINATED", "THEN", "TO", "TRAILING", "TRIGGER", "TRUE", "UNDO",
        "UNION", "UNIQUE", "UNLOCK", "UNSIGNED", "UPDATE", "USAGE", "USE", "USING", "VALUES",
        "VARCHAR", "VARYING", "VIRTUAL", "WHEN", "WHERE", "WHILE", "WINDOW", "WITH", "WRITE",
        "XOR", "YEAR_MONTH", "ZEROFILL",
    ]
    .into_iter()
    .collect();

    static ref POSTGRES_KEYWORDS: HashSet<&'static str> = [
        "ALL", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC", "ASYMMETRIC",
        "AUTHORIZATION", "BINARY", "BOTH", "CASE", "CAST", "CHECK", "COLLATE", "COLLATION",
        "COLUMN", "CONCURRENTLY", "CONSTRAINT", "CREATE", "CROSS", "CURRENT_CATALOG",
        "CURRENT_DATE", "CURRENT_ROLE", "CURRENT_SCHEMA", "CURRENT_TIME", "CURRENT_TIMESTAMP",
        "CURRENT_USER", "DEFAULT", "DEFERRABLE", "DESC", "DISTINCT", "DO", "ELSE", "END",
        "EXCEPT", "FALSE", "FETCH", "FOR", "FOREIGN", "FREEZE", "FROM", "FULL", "GRANT",
        "GROUP", "HAVING", "ILIKE", "IN", "INITIALLY", "INNER", "INTERSECT", "INTO", "IS",
        "ISNULL", "JOIN", "LATERAL", "LEADING", "LEFT", "LIKE", "LIMIT", "LOCALTIME",
        "LOCALTIMESTAMP", "NATURAL", "NOT", "NOTNULL", "NULL", "OFFSET", "ON", "ONLY", "OR",
        "ORDER", "OUTER", "OVERLAPS", "PLACING", "PRIMARY", "REFERENCES", "RETURNING",
        "RIGHT", "SELECT", "SESSION_USER", "SIMILAR", "SOME", "SYMMETRIC", "TABLE",
        "TABLESAMPLE", "THEN", "TO", "TRAILING", "TRUE", "UNION", "UNIQUE", "USER", "USING",
        "VARIADIC", "VERBOSE", "WHEN", "WHERE", "WINDOW", "WITH",
    ]
    .into_iter()
    .collect();
}

/// Resolves the owning table of an identifier, if it has one
pub type OwnerFn<'a> = &'a dyn Fn(&str) -> Option<String>;

pub trait Dialect: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn quote_char(&self) -> char;

    /// Case-insensitive reserved word check
    fn is_reserved(&self, identifier: &str) -> bool;

    fn needs_quoting(&self, identifier: &str) -> bool {
        self.is_reserved(identifier) || !PLAIN_IDENTIFIER.is_match(identifier)
    }

    /// Wrap in the dialect's quotes, doubling embedded quote characters
    fn quote(&self, identifier: &str) -> String {
        let q = self.quote_char();
        let doubled: String = [q, q].iter().collect();
        format!("{q}{}{q}", identifier.replace(q, &doubled))
    }

    fn escape_identifier(&self, identifier: &str) -> String {
        if self.needs_quoting(identifier) {
            self.quote(identifier)
        } else {
            identifier.to_string()
        }
    }

    /// Escape `identifier`, qualified as `table.identifier` when `owner` resolves a table
    fn escape(&self, identifier: &str, owner: Option<OwnerFn<'_>>) -> String {
        let column = self.escape_identifier(identifier);
        match owner.and_then(|resolve| resolve(identifier)) {
            Some(table) => format!("{}.{}", self.escape_identifier(&table), column),
            None => column,
        }
    }
}

/// Backtick quoting, MySQL reserved words
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn is_reserved(&self, identifier: &str) -> bool {
        MYSQL_KEYWORDS.contains(identifier.to_ascii_uppercase().as_str())
    }
}

/// Double-quote quoting, PostgreSQL reserved words. Mixed-case identifiers are quoted too,
/// since PostgreSQL folds unquoted names to lower case.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn is_reserved(&self, identifier: &str) -> bool {
        POSTGRES_KEYWORDS.contains(identifier.to_ascii_uppercase().as_str())
    }

    fn needs_quoting(&self, identifier: &str) -> bool {
        self.is_reserved(identifier)
            || !PLAIN_IDENTIFIER.is_match(identifier)
            || identifier.chars().any(|c| c.is_ascii_uppercase())
    }
}

static MYSQL: MySqlDialect = MySqlDialect;
static POSTGRES: PostgresDialect = PostgresDialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Mysql,
    Postgres,
}

impl DialectKind {
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            DialectKind::Mysql => &MYSQL,
            DialectKind::Postgres => &POSTGRES,
        }
    }
}

impl FromStr for DialectKind {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(DialectKind::Mysql),
            "postgres" | "postgresql" => Ok(DialectKind::Postgres),
            _ => Err(CompileError::UnknownDialect(s.to_string())),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dialect().name())
    }
}
