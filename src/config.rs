//! Configuration
//!
//! The pipeline reads one YAML (or JSON) file describing the warehouse
//! connection, the IAM role used by bulk copies and the staged sources:
//!
//! ```yaml
//! vars:
//!   bucket: udacity-dend
//! warehouse:
//!   engine: redshift
//!   host: dwhcluster.abc123.us-west-2.redshift.amazonaws.com
//!   db_name: dwh
//!   db_user: dwhuser
//!   db_password: "{{ env.DWH_DB_PASSWORD }}"
//!   db_port: 5439
//! iam_role:
//!   arn: arn:aws:iam::123456789012:role/dwhRole
//! sources:
//!   log_data: "s3://{{ vars.bucket }}/log_data"
//!   log_jsonpath: "s3://{{ vars.bucket }}/log_json_path.json"
//!   song_data: "s3://{{ vars.bucket }}/song_data"
//!   region: us-west-2
//! pipeline:
//!   error_policy: continue
//! ```
//!
//! String values may reference environment variables with `{{ env.NAME }}`
//! and entries of the `vars` section with `{{ vars.name }}` (or `{{ name }}`).
//! Vars themselves may only reference `env`.

use crate::error::{Error, Result, ResultExt};
use crate::template::{self, TemplateContext};
use crate::types::{Engine, ErrorPolicy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Default configuration filename
pub const CONFIG_FILENAME: &str = "dwh.yaml";

/// Environment variable overriding the configuration path
pub const ENV_CONFIG_PATH: &str = "DWH_CONFIG";

/// Default Redshift port
pub const DEFAULT_REDSHIFT_PORT: u16 = 5439;

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Scalar values shared by the rest of the file
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, Value>,

    /// Where the warehouse lives
    pub warehouse: WarehouseConfig,

    /// Role the warehouse assumes to read object storage
    #[serde(default)]
    pub iam_role: Option<IamRoleConfig>,

    /// Staged JSON sources
    pub sources: SourcesConfig,

    /// Pipeline behaviour
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Warehouse connection, tagged by engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all = "snake_case")]
pub enum WarehouseConfig {
    Redshift(ClusterConfig),
    Duckdb(DuckDbConfig),
}

impl WarehouseConfig {
    pub fn engine(&self) -> Engine {
        match self {
            WarehouseConfig::Redshift(_) => Engine::Redshift,
            WarehouseConfig::Duckdb(_) => Engine::Duckdb,
        }
    }

    /// Human-readable target, password masked
    pub fn connection_info(&self) -> String {
        match self {
            WarehouseConfig::Redshift(cluster) => cluster.connection_info(),
            WarehouseConfig::Duckdb(duckdb) => format!("duckdb:{}", duckdb.path),
        }
    }
}

/// Redshift cluster endpoint and credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub host: String,

    #[serde(default = "default_db_name")]
    pub db_name: String,

    pub db_user: String,

    #[serde(default, skip_serializing)]
    pub db_password: String,

    #[serde(default = "default_port")]
    pub db_port: u16,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_db_name() -> String {
    "dwh".to_string()
}

fn default_port() -> u16 {
    DEFAULT_REDSHIFT_PORT
}

fn default_connect_timeout() -> u64 {
    30
}

impl ClusterConfig {
    /// `user@host:port/db`, never including the password
    pub fn connection_info(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.db_user, self.host, self.db_port, self.db_name
        )
    }
}

impl std::fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("host", &self.host)
            .field("db_name", &self.db_name)
            .field("db_user", &self.db_user)
            .field("db_password", &"****")
            .field("db_port", &self.db_port)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Local DuckDB database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuckDbConfig {
    /// Database file, or `:memory:`
    #[serde(default = "default_duckdb_path")]
    pub path: String,
}

/// DuckDB path selecting an in-memory database
pub const IN_MEMORY_PATH: &str = ":memory:";

fn default_duckdb_path() -> String {
    IN_MEMORY_PATH.to_string()
}

impl DuckDbConfig {
    /// Whether the database disappears when the process exits
    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY_PATH
    }
}

impl Default for DuckDbConfig {
    fn default() -> Self {
        Self {
            path: default_duckdb_path(),
        }
    }
}

/// IAM role reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IamRoleConfig {
    pub arn: String,
}

/// Staged JSON sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Event log prefix
    pub log_data: String,

    /// JSONPaths manifest for the event logs
    #[serde(default)]
    pub log_jsonpath: Option<String>,

    /// Song metadata prefix
    pub song_data: String,

    /// Bucket region
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    "us-west-2".to_string()
}

/// Pipeline behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub error_policy: ErrorPolicy,
}

impl Config {
    /// Load, interpolate and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_str_with(&content, &TemplateContext::from_env())
    }

    /// Parse config text, rendering `{{ ... }}` placeholders from `ctx`
    pub fn from_str_with(content: &str, ctx: &TemplateContext) -> Result<Self> {
        let raw: Value = serde_yaml::from_str(content)?;
        let ctx = with_config_vars(&raw, ctx)?;
        let rendered = template::render_value(&raw, &ctx)?;
        let config: Config = serde_json::from_value(rendered)
            .map_err(|e| Error::config(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields for the selected engine
    pub fn validate(&self) -> Result<()> {
        if let WarehouseConfig::Redshift(cluster) = &self.warehouse {
            require("warehouse.host", &cluster.host)?;
            require("warehouse.db_name", &cluster.db_name)?;
            require("warehouse.db_user", &cluster.db_user)?;
            if cluster.db_port == 0 {
                return Err(Error::invalid_value("warehouse.db_port", "must be non-zero"));
            }
            // Copies cannot authenticate without a role
            match &self.iam_role {
                Some(role) => require("iam_role.arn", &role.arn)?,
                None => return Err(Error::missing_field("iam_role.arn")),
            }
        }

        require("sources.log_data", &self.sources.log_data)?;
        require("sources.song_data", &self.sources.song_data)?;
        require("sources.region", &self.sources.region)?;
        if let Some(manifest) = &self.sources.log_jsonpath {
            require("sources.log_jsonpath", manifest)?;
        }

        Ok(())
    }
}

/// `ctx` extended with the file's `vars` section, rendered against `ctx`
fn with_config_vars(raw: &Value, ctx: &TemplateContext) -> Result<TemplateContext> {
    let vars = match raw.get("vars") {
        None | Some(Value::Null) => return Ok(ctx.clone()),
        Some(Value::Object(vars)) => vars,
        Some(_) => return Err(Error::invalid_value("vars", "must be a mapping")),
    };

    let mut extended = ctx.clone();
    for (name, value) in vars {
        let value = match value {
            Value::String(s) => template::render(s, ctx)?,
            Value::Number(_) | Value::Bool(_) => value.to_string(),
            Value::Null => String::new(),
            Value::Array(_) | Value::Object(_) => {
                return Err(Error::invalid_value(
                    format!("vars.{name}"),
                    "must be a scalar",
                ))
            }
        };
        extended.set_var(name.clone(), value);
    }
    Ok(extended)
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::missing_field(field))
    } else {
        Ok(())
    }
}
