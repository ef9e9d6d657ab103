//! Warehouse connections
//!
//! The pipeline talks to the warehouse through the [`Warehouse`] trait: one
//! connection, one statement at a time, each statement committed on its own.
//!
//! - [`RedshiftWarehouse`] - Amazon Redshift over the Postgres wire protocol
//! - [`DuckDbWarehouse`] - embedded DuckDB for local runs and tests

mod duckdb;
mod redshift;

pub use self::duckdb::DuckDbWarehouse;
pub use self::redshift::RedshiftWarehouse;

use crate::config::WarehouseConfig;
use crate::error::Result;
use async_trait::async_trait;

/// A live warehouse connection
#[async_trait(?Send)]
pub trait Warehouse {
    /// Connection description for logs (no credentials)
    fn describe(&self) -> String;

    /// Execute one statement (possibly several `;`-separated commands) and
    /// commit it as a single unit
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Run a trivial query to check the connection
    async fn ping(&mut self) -> Result<()>;

    /// Number of rows in a table
    async fn count_rows(&mut self, table: &str) -> Result<u64>;

    /// Shut the connection down; later calls fail
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Open the configured warehouse; any failure here is fatal for the run
pub async fn connect(config: &WarehouseConfig) -> Result<Box<dyn Warehouse>> {
    let warehouse: Box<dyn Warehouse> = match config {
        WarehouseConfig::Redshift(cluster) => Box::new(RedshiftWarehouse::connect(cluster).await?),
        WarehouseConfig::Duckdb(duckdb) => Box::new(DuckDbWarehouse::open(duckdb)?),
    };
    tracing::info!("connected to {}", warehouse.describe());
    Ok(warehouse)
}
