//! Schema catalog
//!
//! Static definitions of the seven warehouse tables and the order in which
//! they are created and dropped.
//!
//! # Overview
//!
//! - `Catalog` - Ordered table set; create order is declaration order and
//!   drop order is its exact reverse
//! - `TableDef` / `ColumnDef` - Typed table definitions rendered to DDL by a
//!   [`SqlDialect`](crate::dialect::SqlDialect)
//!
//! The catalog never executes anything; the pipeline driver does.

pub mod tables;
mod types;

pub use types::{ColumnDef, ColumnType, DistStyle, Reference, TableDef, TableKind};

use crate::error::{Error, Result};
use std::collections::HashSet;

/// Ordered set of table definitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    /// Tables in create order
    tables: Vec<TableDef>,
}

impl Catalog {
    /// Build a catalog from tables listed in create order
    pub fn new(tables: Vec<TableDef>) -> Self {
        Self { tables }
    }

    /// The song-play star schema: staging, then dimensions, then the fact table
    pub fn star_schema() -> Self {
        Self::new(vec![
            tables::staging_events(),
            tables::staging_songs(),
            tables::users(),
            tables::songs(),
            tables::artists(),
            tables::time(),
            tables::songplays(),
        ])
    }

    /// Tables in create order
    pub fn create_order(&self) -> impl DoubleEndedIterator<Item = &TableDef> {
        self.tables.iter()
    }

    /// Tables in drop order (reverse of create order)
    pub fn drop_order(&self) -> impl DoubleEndedIterator<Item = &TableDef> {
        self.tables.iter().rev()
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Tables of the given kind, in create order
    pub fn tables_of_kind(&self, kind: TableKind) -> impl Iterator<Item = &TableDef> {
        self.tables.iter().filter(move |t| t.kind == kind)
    }

    /// Table names in create order
    pub fn table_names(&self) -> Vec<&'static str> {
        self.tables.iter().map(|t| t.name).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Check the structural invariants the load order relies on
    pub fn validate(&self) -> Result<()> {
        let mut created: HashSet<&str> = HashSet::new();

        for table in &self.tables {
            if !created.insert(table.name) {
                return Err(Error::catalog(format!("duplicate table '{}'", table.name)));
            }

            let mut columns = HashSet::new();
            for column in &table.columns {
                if !columns.insert(column.name) {
                    return Err(Error::catalog(format!(
                        "duplicate column '{}.{}'",
                        table.name, column.name
                    )));
                }
            }

            if table.columns.iter().filter(|c| c.primary_key).count() > 1 {
                return Err(Error::catalog(format!(
                    "table '{}' declares more than one primary key column",
                    table.name
                )));
            }

            if table.kind == TableKind::Staging
                && table
                    .columns
                    .iter()
                    .any(|c| c.primary_key || c.references.is_some())
            {
                return Err(Error::catalog(format!(
                    "staging table '{}' must not declare keys",
                    table.name
                )));
            }

            if let Some(sort_key) = table.sort_key {
                if table.column(sort_key).is_none() {
                    return Err(Error::catalog(format!(
                        "sort key '{sort_key}' is not a column of '{}'",
                        table.name
                    )));
                }
            }

            for column in &table.columns {
                let Some(reference) = &column.references else {
                    continue;
                };
                // Referenced tables must already exist when this one is created
                let target = self
                    .tables
                    .iter()
                    .find(|t| t.name == reference.table && created.contains(t.name))
                    .filter(|t| t.name != table.name)
                    .ok_or_else(|| {
                        Error::catalog(format!(
                            "'{}.{}' references '{}' which is not created before it",
                            table.name, column.name, reference.table
                        ))
                    })?;
                if target.column(reference.column).is_none() {
                    return Err(Error::catalog(format!(
                        "'{}.{}' references unknown column '{}.{}'",
                        table.name, column.name, reference.table, reference.column
                    )));
                }
            }
        }

        let facts = self.tables_of_kind(TableKind::Fact).count();
        if facts != 1 {
            return Err(Error::catalog(format!(
                "expected exactly one fact table, found {facts}"
            )));
        }

        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::star_schema()
    }
}
