//! End-to-end pipeline tests against embedded DuckDB
//!
//! Staging data is written as newline-delimited JSON to a temp directory,
//! read into the staging tables and transformed with the same INSERT
//! statements a Redshift run uses.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sparkify_dwh::catalog::{Catalog, ColumnType};
use sparkify_dwh::config::Config;
use sparkify_dwh::pipeline::{OutcomeStatus, Pipeline};
use sparkify_dwh::statements::StatementBuilder;
use sparkify_dwh::template::TemplateContext;
use sparkify_dwh::warehouse::{DuckDbWarehouse, Warehouse};
use sparkify_dwh::{Error, ErrorPolicy, Phase};
use std::path::Path;
use tempfile::TempDir;

const TS: i64 = 1_542_247_071_796;

fn event(page: &str, ts: i64, user_id: i64, level: &str, song: Option<(&str, &str, f64)>) -> Value {
    let (artist, title, length) = match song {
        Some((artist, title, length)) => (json!(artist), json!(title), json!(length)),
        None => (Value::Null, Value::Null, Value::Null),
    };
    json!({
        "artist": artist,
        "auth": "Logged In",
        "firstName": "Walter",
        "gender": "M",
        "itemInSession": 0,
        "lastName": "Frye",
        "length": length,
        "level": level,
        "location": "San Francisco-Oakland-Hayward, CA",
        "method": "PUT",
        "page": page,
        "registration": 1_540_919_166_796.0,
        "sessionId": 38,
        "song": title,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0 (Windows NT 6.1; WOW64)",
        "userId": user_id
    })
}

fn song(song_id: &str, title: &str, artist_id: &str, artist_name: &str, duration: f64) -> Value {
    json!({
        "num_songs": 1,
        "artist_id": artist_id,
        "artist_latitude": null,
        "artist_longitude": null,
        "artist_location": "",
        "artist_name": artist_name,
        "song_id": song_id,
        "title": title,
        "duration": duration,
        "year": 2004
    })
}

fn write_ndjson(path: &Path, records: &[Value]) {
    let lines: Vec<String> = records.iter().map(Value::to_string).collect();
    std::fs::write(path, lines.join("\n")).unwrap();
}

/// Staged files plus a DuckDB config pointing at them
fn stage(events: &[Value], songs: &[Value]) -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("events.json");
    let song_path = dir.path().join("songs.json");
    write_ndjson(&log_path, events);
    write_ndjson(&song_path, songs);

    let yaml = format!(
        "warehouse:\n  engine: duckdb\nsources:\n  log_data: {}\n  song_data: {}\n",
        log_path.display(),
        song_path.display()
    );
    let config = Config::from_str_with(&yaml, &TemplateContext::new()).unwrap();
    (dir, config)
}

async fn run_all(config: &Config, warehouse: &mut DuckDbWarehouse) {
    let pipeline = Pipeline::new(StatementBuilder::new(config), ErrorPolicy::FailFast);
    let report = pipeline.run_all(warehouse).await.unwrap();
    assert!(report.is_success(), "{:?}", report.summary());
}

fn default_songs() -> Vec<Value> {
    vec![
        song("SOA", "Setanta matins", "ARA", "Elena", 269.58322),
        song("SOB", "Intro", "ARB", "Des'ree", 218.93179),
    ]
}

#[tokio::test]
async fn test_reset_creates_empty_catalog_tables() {
    let (_dir, config) = stage(&[], &[]);
    let mut warehouse = DuckDbWarehouse::in_memory().unwrap();
    let pipeline = Pipeline::new(StatementBuilder::new(&config), ErrorPolicy::FailFast);

    let report = pipeline.reset_schema(&mut warehouse).await.unwrap();
    assert!(report.is_success());

    let catalog = Catalog::star_schema();
    let mut expected = catalog.table_names();
    expected.sort_unstable();
    assert_eq!(warehouse.list_tables().unwrap(), expected);

    for table in catalog.create_order() {
        let columns = warehouse.table_columns(table.name).unwrap();
        let expected: Vec<(String, String)> = table
            .columns
            .iter()
            .map(|c| (c.name.to_string(), storage_type(c.column_type)))
            .collect();
        assert_eq!(columns, expected, "columns of {}", table.name);
        assert_eq!(warehouse.count_rows(table.name).await.unwrap(), 0);
    }

    let column_type = |table: &str, column: &str| -> String {
        warehouse
            .table_columns(table)
            .unwrap()
            .into_iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| ty)
            .unwrap()
    };
    assert_eq!(column_type("staging_events", "length"), "DECIMAL(10,5)");
    assert_eq!(column_type("staging_events", "ts"), "BIGINT");
    assert_eq!(column_type("songs", "duration"), "DECIMAL(10,5)");
    assert_eq!(column_type("songplays", "songplay_id"), "INTEGER");
    assert_eq!(column_type("songplays", "start_time"), "TIMESTAMP");
    assert_eq!(column_type("time", "start_time"), "TIMESTAMP");
    assert_eq!(column_type("users", "user_id"), "INTEGER");
}

/// Type name DuckDB reports in `information_schema.columns`
fn storage_type(column_type: ColumnType) -> String {
    match column_type {
        ColumnType::Varchar => "VARCHAR".to_string(),
        ColumnType::Integer | ColumnType::Identity => "INTEGER".to_string(),
        ColumnType::BigInt => "BIGINT".to_string(),
        ColumnType::Decimal(precision, scale) => format!("DECIMAL({precision},{scale})"),
        ColumnType::Double => "DOUBLE".to_string(),
        ColumnType::Timestamp => "TIMESTAMP".to_string(),
    }
}

#[tokio::test]
async fn test_reset_twice_succeeds() {
    let (_dir, config) = stage(&[], &[]);
    let mut warehouse = DuckDbWarehouse::in_memory().unwrap();
    let pipeline = Pipeline::new(StatementBuilder::new(&config), ErrorPolicy::FailFast);

    pipeline.reset_schema(&mut warehouse).await.unwrap().into_result().unwrap();
    pipeline.reset_schema(&mut warehouse).await.unwrap().into_result().unwrap();
    assert_eq!(warehouse.list_tables().unwrap().len(), 7);
}

#[tokio::test]
async fn test_songplays_only_from_nextsong_events() {
    let events = vec![
        event("NextSong", TS, 10, "free", Some(("Elena", "Setanta matins", 269.58322))),
        event("Home", TS + 1_000, 10, "free", None),
        event("NextSong", TS + 2_000, 10, "free", Some(("Des'ree", "Intro", 218.93179))),
    ];
    let (_dir, config) = stage(&events, &default_songs());
    let mut warehouse = DuckDbWarehouse::in_memory().unwrap();
    run_all(&config, &mut warehouse).await;

    assert_eq!(warehouse.count_rows("staging_events").await.unwrap(), 3);
    assert_eq!(warehouse.count_rows("songplays").await.unwrap(), 2);

    let rows = warehouse
        .query_rows("SELECT song_id, artist_id, user_id, session_id FROM songplays ORDER BY song_id")
        .unwrap();
    assert_eq!(
        rows,
        vec![
            vec![json!("SOA"), json!("ARA"), json!(10), json!(38)],
            vec![json!("SOB"), json!("ARB"), json!(10), json!(38)],
        ]
    );
}

#[tokio::test]
async fn test_event_log_with_string_and_empty_user_ids() {
    // Event logs carry userId as a string, empty for logged-out users
    let mut played = event("NextSong", TS, 0, "free", Some(("Elena", "Setanta matins", 269.58322)));
    played["userId"] = json!("39");
    let mut logged_out = event("Home", TS + 1_000, 0, "free", None);
    logged_out["userId"] = json!("");
    logged_out["auth"] = json!("Logged Out");
    logged_out["sessionId"] = json!("38");

    let (_dir, config) = stage(&[played, logged_out], &default_songs());
    let mut warehouse = DuckDbWarehouse::in_memory().unwrap();
    let pipeline = Pipeline::new(StatementBuilder::new(&config), ErrorPolicy::Continue);
    let report = pipeline.run_all(&mut warehouse).await.unwrap();
    assert!(report.is_success(), "{:?}", report.summary());

    assert_eq!(warehouse.count_rows("staging_events").await.unwrap(), 2);
    let rows = warehouse
        .query_rows("SELECT userId, sessionId FROM staging_events ORDER BY ts")
        .unwrap();
    assert_eq!(
        rows,
        vec![vec![json!(39), json!(38)], vec![Value::Null, json!(38)]]
    );

    let rows = warehouse
        .query_rows("SELECT user_id, song_id FROM songplays")
        .unwrap();
    assert_eq!(rows, vec![vec![json!(39), json!("SOA")]]);
    let rows = warehouse.query_rows("SELECT user_id FROM users").unwrap();
    assert_eq!(rows, vec![vec![json!(39)]]);
}

#[tokio::test]
async fn test_users_deduplicated_latest_level_wins() {
    let events = vec![
        event("NextSong", TS, 10, "free", Some(("Elena", "Setanta matins", 269.58322))),
        event("NextSong", TS + 60_000, 10, "paid", Some(("Des'ree", "Intro", 218.93179))),
    ];
    let (_dir, config) = stage(&events, &default_songs());
    let mut warehouse = DuckDbWarehouse::in_memory().unwrap();
    run_all(&config, &mut warehouse).await;

    let rows = warehouse
        .query_rows("SELECT user_id, first_name, level FROM users")
        .unwrap();
    assert_eq!(rows, vec![vec![json!(10), json!("Walter"), json!("paid")]]);
}

#[tokio::test]
async fn test_epoch_millis_truncated_to_whole_seconds() {
    let events = vec![event(
        "NextSong",
        TS,
        10,
        "free",
        Some(("Elena", "Setanta matins", 269.58322)),
    )];
    let (_dir, config) = stage(&events, &default_songs());
    let mut warehouse = DuckDbWarehouse::in_memory().unwrap();
    run_all(&config, &mut warehouse).await;

    let rows = warehouse
        .query_rows("SELECT CAST(start_time AS VARCHAR) FROM songplays")
        .unwrap();
    assert_eq!(rows, vec![vec![json!("2018-11-15 01:57:51")]]);

    let rows = warehouse
        .query_rows("SELECT hour, day, week, month, year, weekday FROM time")
        .unwrap();
    assert_eq!(
        rows,
        vec![vec![json!(1), json!(15), json!(46), json!(11), json!(2018), json!(4)]]
    );
}

#[tokio::test]
async fn test_unmatched_event_produces_no_songplay() {
    let events = vec![
        // Same artist and title, duration off in the last digit
        event("NextSong", TS, 10, "free", Some(("Elena", "Setanta matins", 269.58321))),
        event("NextSong", TS, 11, "free", Some(("Unknown", "Nothing", 100.0))),
    ];
    let (_dir, config) = stage(&events, &default_songs());
    let mut warehouse = DuckDbWarehouse::in_memory().unwrap();
    run_all(&config, &mut warehouse).await;

    assert_eq!(warehouse.count_rows("songplays").await.unwrap(), 0);
    assert_eq!(warehouse.count_rows("time").await.unwrap(), 0);
    // Dimensions are still populated from staging
    assert_eq!(warehouse.count_rows("users").await.unwrap(), 2);
    assert_eq!(warehouse.count_rows("songs").await.unwrap(), 2);
    assert_eq!(warehouse.count_rows("artists").await.unwrap(), 2);
}

#[tokio::test]
async fn test_full_run_is_repeatable() {
    let events = vec![
        event("NextSong", TS, 10, "free", Some(("Elena", "Setanta matins", 269.58322))),
        event("NextSong", TS + 5_000, 11, "paid", Some(("Des'ree", "Intro", 218.93179))),
        event("Logout", TS + 9_000, 11, "paid", None),
    ];
    let (_dir, config) = stage(&events, &default_songs());
    let mut warehouse = DuckDbWarehouse::in_memory().unwrap();
    let catalog = Catalog::star_schema();

    let snapshot = |warehouse: &DuckDbWarehouse| -> Vec<Vec<Vec<Value>>> {
        catalog
            .table_names()
            .into_iter()
            .map(|t| {
                warehouse
                    .query_rows(&format!("SELECT * FROM {t} ORDER BY ALL"))
                    .unwrap()
            })
            .collect()
    };

    run_all(&config, &mut warehouse).await;
    let first = snapshot(&warehouse);
    run_all(&config, &mut warehouse).await;
    let second = snapshot(&warehouse);

    assert_eq!(first, second);
    assert_eq!(first[6].len(), 2, "songplays rows");
}

#[tokio::test]
async fn test_missing_source_under_each_policy() {
    let (dir, mut config) = stage(&[], &default_songs());
    config.sources.log_data = dir.path().join("missing.json").display().to_string();

    // Fail fast: the events copy fails, everything after it is skipped
    let mut warehouse = DuckDbWarehouse::in_memory().unwrap();
    let pipeline = Pipeline::new(StatementBuilder::new(&config), ErrorPolicy::FailFast);
    let report = pipeline.run_all(&mut warehouse).await.unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.skipped(), 1 + 5);
    let copies = report.phase(Phase::Stage).unwrap();
    assert_eq!(copies.outcomes[0].status, OutcomeStatus::Failed);
    assert_eq!(copies.outcomes[1].status, OutcomeStatus::Skipped);
    assert_eq!(warehouse.count_rows("staging_songs").await.unwrap(), 0);
    assert!(matches!(
        report.into_result(),
        Err(Error::PipelineFailed { failed: 1, .. })
    ));

    // Continue: the songs copy and every transform still run
    let mut warehouse = DuckDbWarehouse::in_memory().unwrap();
    let pipeline = Pipeline::new(StatementBuilder::new(&config), ErrorPolicy::Continue);
    let report = pipeline.run_all(&mut warehouse).await.unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.skipped(), 0);
    assert_eq!(report.attempted(), 7 + 7 + 2 + 5);
    assert_eq!(warehouse.count_rows("staging_songs").await.unwrap(), 2);
    assert_eq!(warehouse.count_rows("songs").await.unwrap(), 2);
}
