//! Embedded DuckDB warehouse
//!
//! Runs the same pipeline locally: bulk copies read newline-delimited JSON
//! from local paths and transforms run in-process.

use super::Warehouse;
use crate::config::DuckDbConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use duckdb::types::{TimeUnit, Value as DuckValue};
use duckdb::Connection;
use serde_json::Value;

/// DuckDB-backed warehouse
pub struct DuckDbWarehouse {
    /// DuckDB connection
    conn: Connection,
    /// Database file or `:memory:`
    path: String,
}

impl DuckDbWarehouse {
    /// Open (or create) the configured database
    pub fn open(config: &DuckDbConfig) -> Result<Self> {
        let conn = if config.is_in_memory() {
            Connection::open_in_memory()
        } else {
            Connection::open(&config.path)
        }
        .map_err(|e| Error::connection(format!("duckdb:{}", config.path), e.to_string()))?;

        Ok(Self {
            conn,
            path: config.path.clone(),
        })
    }

    /// Open a fresh in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::open(&DuckDbConfig::default())
    }

    /// Run a query and return every row as JSON values in column order
    pub fn query_rows(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| Error::query(format!("Failed to prepare query: {e}")))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| Error::query(format!("Failed to run query: {e}")))?;

        let column_count = rows.as_ref().map_or(0, |s| s.column_count());
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                let value: DuckValue = row.get(idx)?;
                values.push(duckdb_value_to_json(value));
            }
            result.push(values);
        }
        Ok(result)
    }

    /// Column names and types of a table, in declaration order
    pub fn table_columns(&self, table: &str) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name, data_type FROM information_schema.columns
             WHERE table_name = ? ORDER BY ordinal_position",
        )?;
        let columns = stmt
            .query_map([table], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<(String, String)>, _>>()?;
        Ok(columns)
    }

    /// Names of all base tables in the main schema
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM information_schema.tables
             WHERE table_schema = 'main' AND table_type = 'BASE TABLE'
             ORDER BY table_name",
        )?;
        let tables = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(tables)
    }
}

#[async_trait(?Send)]
impl Warehouse for DuckDbWarehouse {
    fn describe(&self) -> String {
        format!("duckdb:{}", self.path)
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        // Autocommit: each batch is committed when it returns
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    async fn ping(&mut self) -> Result<()> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i32>(0))
            .map_err(|e| Error::query(format!("Connection check failed: {e}")))?;
        Ok(())
    }

    async fn count_rows(&mut self, table: &str) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn timestamp_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value * 1_000_000,
        TimeUnit::Millisecond => value * 1_000,
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

/// Convert DuckDB Value to JSON Value
fn duckdb_value_to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::Number(i.into()),
        DuckValue::SmallInt(i) => Value::Number(i.into()),
        DuckValue::Int(i) => Value::Number(i.into()),
        DuckValue::BigInt(i) => Value::Number(i.into()),
        DuckValue::HugeInt(i) => Value::String(i.to_string()),
        DuckValue::UTinyInt(i) => Value::Number(i.into()),
        DuckValue::USmallInt(i) => Value::Number(i.into()),
        DuckValue::UInt(i) => Value::Number(i.into()),
        DuckValue::UBigInt(i) => Value::Number(i.into()),
        DuckValue::Float(f) => {
            serde_json::Number::from_f64(f64::from(f)).map_or(Value::Null, Value::Number)
        }
        DuckValue::Double(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        DuckValue::Text(s) => Value::String(s),
        DuckValue::Timestamp(unit, i) => {
            let micros = timestamp_micros(unit, i);
            chrono::DateTime::from_timestamp_micros(micros)
                .map(|dt| Value::String(dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string()))
                .unwrap_or(Value::Number(i.into()))
        }
        DuckValue::Date32(d) => {
            // Days since epoch (719163 is the number of days from 1 CE to 1970-01-01)
            chrono::NaiveDate::from_num_days_from_ce_opt(d + 719_163)
                .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Number(d.into()))
        }
        // Decimals and anything else: keep the engine's rendering
        _ => Value::String(format!("{value:?}")),
    }
}
