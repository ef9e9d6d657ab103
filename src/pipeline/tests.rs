//! Tests for the pipeline driver

use super::*;
use crate::catalog::{tables, Catalog};
use crate::config::Config;
use crate::error::Error;
use crate::template::TemplateContext;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Records every statement; fails those starting with one of `failing`
#[derive(Default)]
struct RecordingWarehouse {
    executed: Vec<String>,
    failing: Vec<&'static str>,
}

impl RecordingWarehouse {
    fn failing_on(prefixes: &[&'static str]) -> Self {
        Self {
            executed: Vec::new(),
            failing: prefixes.to_vec(),
        }
    }
}

#[async_trait(?Send)]
impl Warehouse for RecordingWarehouse {
    fn describe(&self) -> String {
        "recording".to_string()
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.executed.push(sql.to_string());
        if self.failing.iter().any(|p| sql.starts_with(p)) {
            return Err(Error::query("relation does not exist"));
        }
        Ok(())
    }

    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    async fn count_rows(&mut self, _table: &str) -> Result<u64> {
        Ok(0)
    }
}

fn config() -> Config {
    let yaml = r#"
warehouse:
  engine: redshift
  host: dwhcluster.example.com
  db_user: dwhuser
  db_password: secret
iam_role:
  arn: arn:aws:iam::123456789012:role/dwhRole
sources:
  log_data: s3://udacity-dend/log_data
  log_jsonpath: s3://udacity-dend/log_json_path.json
  song_data: s3://udacity-dend/song_data
"#;
    Config::from_str_with(yaml, &TemplateContext::new()).unwrap()
}

fn pipeline(policy: ErrorPolicy) -> Pipeline {
    Pipeline::new(StatementBuilder::new(&config()), policy)
}

fn targets(report: &PhaseReport) -> Vec<&str> {
    report.outcomes.iter().map(|o| o.target.as_str()).collect()
}

#[tokio::test]
async fn test_reset_schema_drops_then_creates() {
    let mut warehouse = RecordingWarehouse::default();
    let report = pipeline(ErrorPolicy::Continue)
        .reset_schema(&mut warehouse)
        .await
        .unwrap();

    assert_eq!(warehouse.executed.len(), 14);
    assert!(warehouse.executed[..7].iter().all(|s| s.starts_with("DROP TABLE")));
    assert!(warehouse.executed[7..].iter().all(|s| s.starts_with("CREATE TABLE")));

    let drop = report.phase(Phase::Drop).unwrap();
    let create = report.phase(Phase::Create).unwrap();
    assert_eq!(targets(drop)[0], "songplays");
    assert_eq!(targets(create)[0], "staging_events");

    let mut reversed = targets(drop);
    reversed.reverse();
    assert_eq!(targets(create), reversed);
    assert!(report.is_success());
}

#[tokio::test]
async fn test_load_staging_then_warehouse() {
    let mut warehouse = RecordingWarehouse::default();
    let pipeline = pipeline(ErrorPolicy::Continue);
    let report = pipeline.run_load(&mut warehouse).await.unwrap();

    assert_eq!(
        targets(report.phase(Phase::Stage).unwrap()),
        vec!["staging_events", "staging_songs"]
    );
    assert_eq!(
        targets(report.phase(Phase::Transform).unwrap()),
        vec!["songplays", "users", "songs", "artists", "time"]
    );
    assert!(warehouse.executed[0].starts_with("COPY staging_events"));
    assert_eq!(report.attempted(), 7);
}

#[tokio::test]
async fn test_continue_policy_collects_failures() {
    let mut warehouse =
        RecordingWarehouse::failing_on(&["COPY staging_events", "INSERT INTO users ("]);
    let report = pipeline(ErrorPolicy::Continue)
        .run_load(&mut warehouse)
        .await
        .unwrap();

    // Every statement is still attempted
    assert_eq!(warehouse.executed.len(), 7);
    assert_eq!(report.attempted(), 7);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.skipped(), 0);

    let failed: Vec<&str> = report.failures().map(|o| o.target.as_str()).collect();
    assert_eq!(failed, vec!["staging_events", "users"]);
    assert!(report
        .failures()
        .all(|o| o.error.as_deref().is_some_and(|e| e.contains("relation does not exist"))));

    let err = report.into_result().unwrap_err();
    assert!(matches!(
        err,
        Error::PipelineFailed {
            failed: 2,
            attempted: 7
        }
    ));
}

#[tokio::test]
async fn test_fail_fast_skips_remaining_statements() {
    let mut warehouse = RecordingWarehouse::failing_on(&["DROP TABLE IF EXISTS time"]);
    let report = pipeline(ErrorPolicy::FailFast)
        .run_all(&mut warehouse)
        .await
        .unwrap();

    // songplays, then the failing time drop
    assert_eq!(warehouse.executed.len(), 2);
    assert_eq!(report.attempted(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.skipped(), 5 + 7 + 2 + 5);

    let create = report.phase(Phase::Create).unwrap();
    assert!(create
        .outcomes
        .iter()
        .all(|o| o.status == OutcomeStatus::Skipped));
}

#[tokio::test]
async fn test_render_error_before_execution() {
    let mut config = config();
    config.iam_role = None;
    let pipeline = Pipeline::new(StatementBuilder::new(&config), ErrorPolicy::Continue);
    let mut warehouse = RecordingWarehouse::default();

    let err = pipeline.run_all(&mut warehouse).await.unwrap_err();
    assert!(matches!(err, Error::MissingConfigField { .. }));
    assert!(warehouse.executed.is_empty());
}

/// Collects formatted log output
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn test_outcomes_logged_at_info() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut warehouse = RecordingWarehouse::failing_on(&["INSERT INTO users"]);
    pipeline(ErrorPolicy::Continue)
        .load_warehouse(&mut warehouse)
        .await
        .unwrap();

    let output = logs.contents();
    let line_for = |table: &str| {
        output
            .lines()
            .filter(|l| l.contains(&format!("table={table}")))
            .map(str::to_string)
            .collect::<Vec<_>>()
    };
    assert!(line_for("songplays").iter().any(|l| l.contains("succeeded")), "{output}");
    assert!(line_for("time").iter().any(|l| l.contains("succeeded")), "{output}");
    assert!(line_for("users").iter().any(|l| l.contains("ERROR")), "{output}");
    assert!(!line_for("users").iter().any(|l| l.contains("succeeded")), "{output}");
    assert!(!output.contains("executing"), "{output}");
}

#[tokio::test]
async fn test_invalid_catalog_rejected_before_execution() {
    // Fact table ahead of the dimensions it references
    let catalog = Catalog::new(vec![
        tables::staging_events(),
        tables::staging_songs(),
        tables::songplays(),
        tables::users(),
        tables::songs(),
        tables::artists(),
        tables::time(),
    ]);
    let builder = StatementBuilder::new(&config()).with_catalog(catalog);
    let pipeline = Pipeline::new(builder, ErrorPolicy::Continue);
    let mut warehouse = RecordingWarehouse::default();

    let err = pipeline.reset_schema(&mut warehouse).await.unwrap_err();
    assert!(matches!(err, Error::Catalog { .. }), "{err}");
    assert!(warehouse.executed.is_empty());
}

#[test]
fn test_summary_serializes_failures_only() {
    let mut phase = PhaseReport::new(Phase::Transform);
    phase.push(StatementOutcome::succeeded(Phase::Transform, "songplays", 12));
    phase.push(StatementOutcome::failed(
        Phase::Transform,
        "users",
        "duplicate key",
        3,
    ));
    phase.push(StatementOutcome::skipped(Phase::Transform, "songs"));
    let mut report = RunReport::new();
    report.push(phase);

    let summary = serde_json::to_value(report.summary()).unwrap();
    assert_eq!(
        summary,
        serde_json::json!({
            "attempted": 2,
            "succeeded": 1,
            "failed": 1,
            "skipped": 1,
            "failures": [{
                "phase": "transform",
                "target": "users",
                "status": "failed",
                "error": "duplicate key",
                "elapsed_ms": 3
            }]
        })
    );
}
