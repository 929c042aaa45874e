/// Alias registry: maps field names and aliases to their owning table and physical column.
///
/// Every name is registered twice, bare (`name`) and qualified (`table.name`). A bare
/// *field* name declared by more than one table becomes shared and only resolves in its
/// qualified form. An explicit *alias* must be unique across tables; a collision is
/// rejected at registration time.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use super::errors::JoinCatalogError;

/// A physical column owned by a table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        ColumnRef {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasRegistry {
    /// name (bare or qualified) → column
    owners: HashMap<String, ColumnRef>,
    /// bare field names declared by several tables → those tables
    shared: HashMap<String, BTreeSet<String>>,
    /// explicit alias → declaring table
    explicit: HashMap<String, String>,
    /// column → every name it is known by (canonical field included)
    aliases: HashMap<ColumnRef, BTreeSet<String>>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one table scope.
    ///
    /// `fields` maps field name → column, `aliases` maps alias → field name (of this table,
    /// from this or an earlier registration). The registry is left untouched on error.
    pub fn register(
        &mut self,
        table: &str,
        fields: &BTreeMap<String, String>,
        aliases: &BTreeMap<String, String>,
    ) -> Result<(), JoinCatalogError> {
        let mut staged = self.clone();
        for (field, column) in fields {
            staged.register_field(table, field, column)?;
        }
        for (alias, field) in aliases {
            staged.register_alias(table, alias, field)?;
        }
        log::debug!(
            "registered table `{}`: {} field(s), {} alias(es)",
            table,
            fields.len(),
            aliases.len()
        );
        *self = staged;
        Ok(())
    }

    fn register_field(
        &mut self,
        table: &str,
        field: &str,
        column: &str,
    ) -> Result<(), JoinCatalogError> {
        if let Some(owner) = self.explicit.get(field) {
            if owner != table {
                return Err(JoinCatalogError::ambiguous(field, owner.as_str(), table));
            }
        }

        let col = ColumnRef::new(table, column);
        if let Some(tables) = self.shared.get_mut(field) {
            tables.insert(table.to_string());
        } else {
            match self.owners.get(field) {
                Some(existing) if existing.table != table => {
                    let mut tables = BTreeSet::new();
                    tables.insert(existing.table.clone());
                    tables.insert(table.to_string());
                    self.owners.remove(field);
                    self.shared.insert(field.to_string(), tables);
                }
                _ => {
                    self.rebind(field, &col);
                }
            }
        }

        self.rebind(&qualify(table, field), &col);
        self.aliases.entry(col).or_default().insert(field.to_string());
        Ok(())
    }

    fn register_alias(
        &mut self,
        table: &str,
        alias: &str,
        field: &str,
    ) -> Result<(), JoinCatalogError> {
        let col = self
            .owners
            .get(&qualify(table, field))
            .cloned()
            .ok_or_else(|| JoinCatalogError::unresolved(qualify(table, field)))?;

        if let Some(owner) = self.explicit.get(alias) {
            if owner != table {
                return Err(JoinCatalogError::ambiguous(alias, owner.as_str(), table));
            }
        }
        if let Some(tables) = self.shared.get(alias) {
            let first = tables.iter().next().map(String::as_str).unwrap_or_default();
            return Err(JoinCatalogError::ambiguous(alias, first, table));
        }
        if let Some(existing) = self.owners.get(alias) {
            if existing.table != table {
                return Err(JoinCatalogError::ambiguous(
                    alias,
                    existing.table.as_str(),
                    table,
                ));
            }
        }

        self.rebind(alias, &col);
        self.rebind(&qualify(table, alias), &col);
        self.explicit.insert(alias.to_string(), table.to_string());
        self.aliases.entry(col).or_default().insert(alias.to_string());
        Ok(())
    }

    /// Point `name` at `col`, dropping it from the alias set of the column it used to name
    fn rebind(&mut self, name: &str, col: &ColumnRef) {
        if let Some(previous) = self.owners.insert(name.to_string(), col.clone()) {
            if &previous != col {
                let bare = name.rsplit('.').next().unwrap_or(name);
                if let Some(set) = self.aliases.get_mut(&previous) {
                    set.remove(bare);
                }
            }
        }
    }

    /// Owning table of a field or alias
    pub fn resolve_table(&self, name: &str) -> Result<&str, JoinCatalogError> {
        self.resolve_column(name).map(|c| c.table.as_str())
    }

    /// Physical column of a field or alias
    pub fn resolve_column(&self, name: &str) -> Result<&ColumnRef, JoinCatalogError> {
        if let Some(col) = self.owners.get(name) {
            return Ok(col);
        }
        if let Some(tables) = self.shared.get(name) {
            let mut iter = tables.iter();
            let first = iter.next().map(String::as_str).unwrap_or_default();
            let second = iter.next().map(String::as_str).unwrap_or_default();
            return Err(JoinCatalogError::ambiguous(name, first, second));
        }
        Err(JoinCatalogError::unresolved(name))
    }

    /// Every name a column is known by, canonical field included
    pub fn aliases_of(&self, column: &ColumnRef) -> Option<&BTreeSet<String>> {
        self.aliases.get(column)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.owners.contains_key(name) || self.shared.contains_key(name)
    }

    /// Tables registered so far, sorted
    pub fn tables(&self) -> BTreeSet<&str> {
        self.aliases.keys().map(|c| c.table.as_str()).collect()
    }
}

fn qualify(table: &str, name: &str) -> String {
    format!("{}.{}", table, name)
}
