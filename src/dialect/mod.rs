//! SQL dialects
//!
//! The catalog and the load statements are engine-neutral; a dialect renders
//! the few pieces that differ between Redshift and DuckDB:
//! - column types and table options (`IDENTITY`, `DISTSTYLE`, `SORTKEY`)
//! - foreign key clauses
//! - epoch-millisecond to timestamp conversion
//! - the bulk copy command

mod duckdb;
mod redshift;

pub use self::duckdb::DuckdbDialect;
pub use self::redshift::RedshiftDialect;

use crate::catalog::{ColumnDef, ColumnType, Reference, TableDef};
use crate::error::Result;
use crate::types::Engine;

/// Everything a bulk copy needs to know about its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySource<'a> {
    /// Object storage path or prefix (or a local path/glob for DuckDB)
    pub path: &'a str,
    /// IAM role the warehouse assumes to read the path
    pub iam_role: Option<&'a str>,
    /// JSONPaths manifest mapping nested fields to columns; `None` = match by name
    pub json_paths: Option<&'a str>,
    /// Region of the bucket
    pub region: &'a str,
}

/// SQL dialect trait for rendering engine-specific statements
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Render a column type
    fn column_type(&self, table: &TableDef, column_type: ColumnType) -> String;

    /// Render a foreign key clause, or `None` if the engine should not get one
    fn references(&self, reference: &Reference) -> Option<String>;

    /// Table options appended after the column list
    fn table_options(&self, _table: &TableDef) -> Option<String> {
        None
    }

    /// Statements that must run before `CREATE TABLE`
    fn create_preamble(&self, _table: &TableDef) -> Option<String> {
        None
    }

    /// Statements that must run after `DROP TABLE`
    fn drop_epilogue(&self, _table: &TableDef) -> Option<String> {
        None
    }

    /// Convert an epoch-millisecond expression to a timestamp, truncating to
    /// whole seconds
    fn epoch_millis_to_timestamp(&self, expr: &str) -> String;

    /// Render the bulk copy of JSON records into a staging table
    fn copy_json(&self, table: &TableDef, source: &CopySource<'_>) -> Result<String>;

    /// Render one column definition
    fn column(&self, table: &TableDef, column: &ColumnDef) -> String {
        let mut sql = format!("{} {}", column.name, self.column_type(table, column.column_type));
        if column.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if column.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(clause) = column.references.as_ref().and_then(|r| self.references(r)) {
            sql.push(' ');
            sql.push_str(&clause);
        }
        sql
    }

    /// Render `CREATE TABLE IF NOT EXISTS`
    fn create_table(&self, table: &TableDef) -> String {
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("    {}", self.column(table, c)))
            .collect();

        let mut sql = String::new();
        if let Some(preamble) = self.create_preamble(table) {
            sql.push_str(&preamble);
            sql.push_str(";\n");
        }
        sql.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            table.name,
            columns.join(",\n")
        ));
        if let Some(options) = self.table_options(table) {
            sql.push('\n');
            sql.push_str(&options);
        }
        sql
    }

    /// Render `DROP TABLE IF EXISTS`
    fn drop_table(&self, table: &TableDef) -> String {
        let mut sql = format!("DROP TABLE IF EXISTS {}", table.name);
        if let Some(epilogue) = self.drop_epilogue(table) {
            sql.push_str(";\n");
            sql.push_str(&epilogue);
        }
        sql
    }
}

/// Dialect for the given engine
pub fn for_engine(engine: Engine) -> &'static dyn SqlDialect {
    match engine {
        Engine::Redshift => &RedshiftDialect,
        Engine::Duckdb => &DuckdbDialect,
    }
}

/// Quote a string literal, doubling embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
