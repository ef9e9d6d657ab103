//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, PhaseArg};
use crate::config::{Config, WarehouseConfig};
use crate::error::{Error, Result};
use crate::pipeline::{Pipeline, RunReport};
use crate::statements::StatementBuilder;
use crate::types::{ErrorPolicy, Phase};
use crate::warehouse::{self, Warehouse};
use serde_json::{json, Value};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::CreateTables => self.create_tables().await,
            Commands::Etl => self.etl().await,
            Commands::Run => self.run_all().await,
            Commands::Sql { phase } => self.sql(*phase),
            Commands::Check => self.check().await,
            Commands::Counts => self.counts().await,
        }
    }

    /// Load and validate the configuration file
    fn load_config(&self) -> Result<Config> {
        tracing::debug!("loading config from {}", self.cli.config.display());
        Config::load(&self.cli.config)
    }

    /// Error policy from the config, `--fail-fast` wins
    fn error_policy(&self, config: &Config) -> ErrorPolicy {
        if self.cli.fail_fast {
            ErrorPolicy::FailFast
        } else {
            config.pipeline.error_policy
        }
    }

    fn build_pipeline(&self, config: &Config) -> Pipeline {
        Pipeline::new(StatementBuilder::new(config), self.error_policy(config))
    }

    /// Reset the schema
    async fn create_tables(&self) -> Result<()> {
        let config = self.load_config()?;
        require_persistent(&config, "create-tables")?;
        let pipeline = self.build_pipeline(&config);
        let mut warehouse = warehouse::connect(&config.warehouse).await?;

        let report = pipeline.reset_schema(warehouse.as_mut()).await;
        close(warehouse.as_mut()).await;
        self.finish("create-tables", report?)
    }

    /// Stage and transform
    async fn etl(&self) -> Result<()> {
        let config = self.load_config()?;
        require_persistent(&config, "etl")?;
        let pipeline = self.build_pipeline(&config);
        let mut warehouse = warehouse::connect(&config.warehouse).await?;

        let report = pipeline.run_load(warehouse.as_mut()).await;
        close(warehouse.as_mut()).await;
        self.finish("etl", report?)
    }

    /// Reset, stage and transform
    async fn run_all(&self) -> Result<()> {
        let config = self.load_config()?;
        let pipeline = self.build_pipeline(&config);
        let mut warehouse = warehouse::connect(&config.warehouse).await?;

        let report = pipeline.run_all(warehouse.as_mut()).await;
        close(warehouse.as_mut()).await;
        self.finish("run", report?)
    }

    /// Print rendered statements
    fn sql(&self, phase: Option<PhaseArg>) -> Result<()> {
        let config = self.load_config()?;
        let builder = StatementBuilder::new(&config);
        let phases: Vec<Phase> = match phase {
            Some(p) => vec![p.into()],
            None => Phase::ALL.to_vec(),
        };

        for phase in phases {
            for statement in builder.phase(phase)? {
                match self.cli.format {
                    OutputFormat::Json => self.output_message(&json!({
                        "type": "STATEMENT",
                        "statement": statement,
                    })),
                    OutputFormat::Pretty => {
                        println!("-- {} {}", phase.command(), statement.target);
                        println!("{};\n", statement.sql);
                    }
                }
            }
        }
        Ok(())
    }

    /// Check connection
    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;
        let target = config.warehouse.connection_info();

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!("Checking connection to {target}")
            }
        }));

        let result = match warehouse::connect(&config.warehouse).await {
            Ok(mut warehouse) => {
                let result = warehouse.ping().await;
                close(warehouse.as_mut()).await;
                result
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "SUCCEEDED",
                        "message": "Connection successful"
                    }
                }));
                Ok(())
            }
            Err(e) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "FAILED",
                        "message": format!("Connection failed: {e}")
                    }
                }));
                Err(e)
            }
        }
    }

    /// Row counts for every table
    async fn counts(&self) -> Result<()> {
        let config = self.load_config()?;
        let builder = StatementBuilder::new(&config);
        let mut warehouse = warehouse::connect(&config.warehouse).await?;

        let counts = table_counts(warehouse.as_mut(), &builder).await;
        close(warehouse.as_mut()).await;
        self.output_message(&json!({
            "type": "COUNTS",
            "counts": counts,
        }));
        Ok(())
    }

    /// Log and print the run summary; any failed statement fails the command
    fn finish(&self, command: &str, report: RunReport) -> Result<()> {
        let summary = report.summary();
        if report.is_success() {
            tracing::info!(
                "{command} completed: {} statements succeeded",
                summary.succeeded
            );
        } else {
            tracing::warn!(
                "{command} finished with {} failed and {} skipped statements",
                summary.failed,
                summary.skipped
            );
        }

        self.output_message(&json!({
            "type": "RUN_SUMMARY",
            "command": command,
            "summary": summary,
        }));

        report.into_result().map(|_| ())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Line printed when a command fails
pub fn error_message(err: &Error) -> String {
    if err.is_fatal() {
        format!("Error: {err}")
    } else {
        format!("Pipeline finished with errors: {err}")
    }
}

/// `create-tables` and `etl` run as separate processes, so an in-memory
/// database would not survive from one to the other
fn require_persistent(config: &Config, command: &str) -> Result<()> {
    match &config.warehouse {
        WarehouseConfig::Duckdb(duckdb) if duckdb.is_in_memory() => Err(Error::invalid_value(
            "warehouse.path",
            format!(
                "`{command}` needs a database file; an in-memory database is lost when the \
                 process exits (use `run` to reset and load in one process)"
            ),
        )),
        _ => Ok(()),
    }
}

/// Close the connection; a failure here does not change the command's outcome
async fn close(warehouse: &mut dyn Warehouse) {
    if let Err(e) = warehouse.close().await {
        tracing::warn!("failed to close {}: {e}", warehouse.describe());
    }
}

/// Row count per catalog table in create order; tables that cannot be
/// counted map to null
async fn table_counts(warehouse: &mut dyn Warehouse, builder: &StatementBuilder) -> Value {
    let mut counts = serde_json::Map::new();
    for table in builder.catalog().create_order() {
        let value = match warehouse.count_rows(table.name).await {
            Ok(n) => json!(n),
            Err(e) => {
                tracing::warn!(table = table.name, "count failed: {e}");
                Value::Null
            }
        };
        counts.insert(table.name.to_string(), value);
    }
    Value::Object(counts)
}
