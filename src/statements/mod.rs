//! Statement builder
//!
//! Produces the SQL for every pipeline phase from an explicit [`Config`].
//! Statement text is rendered on demand, so each run sees the configuration
//! it was started with.
//!
//! Each [`Statement`] carries the object it targets alongside its SQL; log
//! lines and failure reports use that name directly.

pub mod transforms;

use crate::catalog::tables::{STAGING_EVENTS, STAGING_SONGS};
use crate::catalog::{Catalog, TableDef};
use crate::config::{Config, SourcesConfig};
use crate::dialect::{self, CopySource, SqlDialect};
use crate::error::{Error, Result};
use crate::types::Phase;
use serde::Serialize;

/// A single SQL statement and the table it acts on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub phase: Phase,
    pub target: String,
    pub sql: String,
}

impl Statement {
    pub fn new(phase: Phase, target: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            phase,
            target: target.into(),
            sql: sql.into(),
        }
    }
}

/// Renders catalog DDL, bulk copies and transforms for one configuration
pub struct StatementBuilder {
    dialect: &'static dyn SqlDialect,
    catalog: Catalog,
    sources: SourcesConfig,
    iam_role: Option<String>,
}

impl StatementBuilder {
    /// Builder for the star schema on the configured engine
    pub fn new(config: &Config) -> Self {
        Self {
            dialect: dialect::for_engine(config.warehouse.engine()),
            catalog: Catalog::star_schema(),
            sources: config.sources.clone(),
            iam_role: config.iam_role.as_ref().map(|r| r.arn.clone()),
        }
    }

    /// Replace the catalog
    #[must_use]
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn dialect(&self) -> &'static dyn SqlDialect {
        self.dialect
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// `DROP TABLE IF EXISTS` for every table, fact table first
    pub fn drop_statements(&self) -> Vec<Statement> {
        self.catalog
            .drop_order()
            .map(|t| Statement::new(Phase::Drop, t.name, self.dialect.drop_table(t)))
            .collect()
    }

    /// `CREATE TABLE IF NOT EXISTS` for every table, staging tables first
    pub fn create_statements(&self) -> Vec<Statement> {
        self.catalog
            .create_order()
            .map(|t| Statement::new(Phase::Create, t.name, self.dialect.create_table(t)))
            .collect()
    }

    /// Bulk copies into the two staging tables (events, then songs)
    pub fn copy_statements(&self) -> Result<Vec<Statement>> {
        let events = CopySource {
            path: &self.sources.log_data,
            iam_role: self.iam_role.as_deref(),
            json_paths: self.sources.log_jsonpath.as_deref(),
            region: &self.sources.region,
        };
        let songs = CopySource {
            path: &self.sources.song_data,
            iam_role: self.iam_role.as_deref(),
            json_paths: None,
            region: &self.sources.region,
        };

        [(STAGING_EVENTS, events), (STAGING_SONGS, songs)]
            .into_iter()
            .map(|(name, source)| {
                let table = self.table(name)?;
                let sql = self.dialect.copy_json(table, &source)?;
                Ok(Statement::new(Phase::Stage, name, sql))
            })
            .collect()
    }

    /// INSERT ... SELECT for the star schema, fact table first, `time` last
    pub fn insert_statements(&self) -> Result<Vec<Statement>> {
        transforms::TRANSFORM_ORDER
            .iter()
            .map(|&table| {
                self.table(table)?;
                let sql = transforms::render(table, self.dialect)
                    .ok_or_else(|| Error::catalog(format!("no transform for '{table}'")))?;
                Ok(Statement::new(Phase::Transform, table, sql))
            })
            .collect()
    }

    /// Statements for a single phase
    pub fn phase(&self, phase: Phase) -> Result<Vec<Statement>> {
        match phase {
            Phase::Drop => Ok(self.drop_statements()),
            Phase::Create => Ok(self.create_statements()),
            Phase::Stage => self.copy_statements(),
            Phase::Transform => self.insert_statements(),
        }
    }

    fn table(&self, name: &str) -> Result<&TableDef> {
        self.catalog
            .table(name)
            .ok_or_else(|| Error::catalog(format!("table '{name}' is not in the catalog")))
    }
}
