//! Amazon Redshift SQL dialect

use super::{quote_literal, CopySource, SqlDialect};
use crate::catalog::{ColumnType, DistStyle, Reference, TableDef};
use crate::error::{Error, Result};

/// Redshift SQL dialect
///
/// Foreign keys are rendered but Redshift treats them as planner hints only.
pub struct RedshiftDialect;

impl SqlDialect for RedshiftDialect {
    fn name(&self) -> &'static str {
        "redshift"
    }

    fn column_type(&self, _table: &TableDef, column_type: ColumnType) -> String {
        match column_type {
            ColumnType::Varchar => "VARCHAR".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Decimal(precision, scale) => format!("DECIMAL({precision},{scale})"),
            ColumnType::Double => "DOUBLE PRECISION".to_string(),
            ColumnType::Timestamp => "TIMESTAMP".to_string(),
            ColumnType::Identity => "INTEGER IDENTITY(0,1)".to_string(),
        }
    }

    fn references(&self, reference: &Reference) -> Option<String> {
        Some(format!("REFERENCES {}({})", reference.table, reference.column))
    }

    fn table_options(&self, table: &TableDef) -> Option<String> {
        let mut options = Vec::new();
        match table.dist_style {
            DistStyle::Auto => {}
            DistStyle::All => options.push("DISTSTYLE ALL".to_string()),
            DistStyle::Even => options.push("DISTSTYLE EVEN".to_string()),
        }
        if let Some(sort_key) = table.sort_key {
            options.push(format!("SORTKEY({sort_key})"));
        }
        (!options.is_empty()).then(|| options.join(" "))
    }

    fn epoch_millis_to_timestamp(&self, expr: &str) -> String {
        // BIGINT / 1000 is integer division
        format!("TIMESTAMP 'epoch' + {expr}/1000 * INTERVAL '1 second'")
    }

    fn copy_json(&self, table: &TableDef, source: &CopySource<'_>) -> Result<String> {
        let role = source
            .iam_role
            .ok_or_else(|| Error::missing_field("iam_role.arn"))?;
        let format = source.json_paths.map_or_else(|| "'auto'".to_string(), quote_literal);

        Ok(format!(
            "COPY {table} FROM {path}\nCREDENTIALS {credentials}\nFORMAT AS JSON {format}\nREGION {region}",
            table = table.name,
            path = quote_literal(source.path),
            credentials = quote_literal(&format!("aws_iam_role={role}")),
            region = quote_literal(source.region),
        ))
    }
}
