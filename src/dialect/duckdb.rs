//! DuckDB SQL dialect implementation

use super::{quote_literal, CopySource, SqlDialect};
use crate::catalog::{ColumnType, Reference, TableDef};
use crate::error::Result;

/// DuckDB SQL dialect
///
/// DuckDB enforces foreign keys (Redshift does not), and the fact table is
/// loaded before the time dimension, so references are left out. Identity
/// columns are backed by a per-table sequence.
pub struct DuckdbDialect;

impl DuckdbDialect {
    fn sequence_name(table: &TableDef) -> Option<String> {
        table
            .columns
            .iter()
            .find(|c| c.column_type == ColumnType::Identity)
            .map(|c| format!("{}_{}_seq", table.name, c.name))
    }
}

impl SqlDialect for DuckdbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn column_type(&self, table: &TableDef, column_type: ColumnType) -> String {
        match column_type {
            ColumnType::Varchar => "VARCHAR".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Decimal(precision, scale) => format!("DECIMAL({precision},{scale})"),
            ColumnType::Double => "DOUBLE".to_string(),
            ColumnType::Timestamp => "TIMESTAMP".to_string(),
            ColumnType::Identity => match Self::sequence_name(table) {
                Some(seq) => format!("INTEGER DEFAULT nextval('{seq}')"),
                None => "INTEGER".to_string(),
            },
        }
    }

    fn references(&self, _reference: &Reference) -> Option<String> {
        None
    }

    fn create_preamble(&self, table: &TableDef) -> Option<String> {
        Self::sequence_name(table).map(|seq| format!("CREATE SEQUENCE IF NOT EXISTS {seq} START 1"))
    }

    fn drop_epilogue(&self, table: &TableDef) -> Option<String> {
        Self::sequence_name(table).map(|seq| format!("DROP SEQUENCE IF EXISTS {seq}"))
    }

    fn epoch_millis_to_timestamp(&self, expr: &str) -> String {
        format!("epoch_ms(({expr} // 1000) * 1000)")
    }

    fn copy_json(&self, table: &TableDef, source: &CopySource<'_>) -> Result<String> {
        // Keys are matched to column names; JSONPaths manifests and IAM roles
        // only apply to Redshift. Integer fields arrive as numbers, numeric
        // strings or "" (logged-out events), so they are read as text and
        // cast here; anything unparsable becomes NULL.
        let mut targets = Vec::with_capacity(table.columns.len());
        let mut selects = Vec::with_capacity(table.columns.len());
        let mut read_types = Vec::with_capacity(table.columns.len());

        for column in &table.columns {
            let name = column.name;
            let (read_type, select) = match column.column_type {
                ColumnType::Identity => continue,
                ColumnType::Integer | ColumnType::BigInt => {
                    let sql_type = self.column_type(table, column.column_type);
                    (
                        "VARCHAR".to_string(),
                        format!("TRY_CAST(NULLIF(trim({name}), '') AS {sql_type}) AS {name}"),
                    )
                }
                other => (self.column_type(table, other), name.to_string()),
            };
            targets.push(name);
            selects.push(select);
            read_types.push(format!("{}: {}", quote_literal(name), quote_literal(&read_type)));
        }

        Ok(format!(
            "INSERT INTO {table} ({targets})\nSELECT\n    {selects}\nFROM read_json({path}, format = 'auto', columns = {{{columns}}})",
            table = table.name,
            targets = targets.join(", "),
            selects = selects.join(",\n    "),
            path = quote_literal(source.path),
            columns = read_types.join(", "),
        ))
    }
}
