//! INSERT ... SELECT statements that reshape staging data into the star schema

use crate::catalog::tables::{ARTISTS, SONGPLAYS, SONGS, TIME, USERS};
use crate::dialect::SqlDialect;

/// Target tables in load order; `time` is derived from `songplays`
pub const TRANSFORM_ORDER: [&str; 5] = [SONGPLAYS, USERS, SONGS, ARTISTS, TIME];

/// Render the transform for a target table
pub fn render(target: &str, dialect: &dyn SqlDialect) -> Option<String> {
    match target {
        SONGPLAYS => Some(songplays(dialect)),
        USERS => Some(users()),
        SONGS => Some(songs()),
        ARTISTS => Some(artists()),
        TIME => Some(time()),
        _ => None,
    }
}

/// NextSong events joined to their song by exact (artist, title, duration)
/// match. Unmatched events are dropped; the duration comparison is exact, so
/// any rounding difference between the two sources loses the event.
pub fn songplays(dialect: &dyn SqlDialect) -> String {
    format!(
        "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
SELECT DISTINCT
    {start_time} AS start_time,
    se.userId AS user_id,
    se.level AS level,
    ss.song_id AS song_id,
    ss.artist_id AS artist_id,
    se.sessionId AS session_id,
    se.location AS location,
    se.userAgent AS user_agent
FROM staging_events AS se
JOIN staging_songs AS ss
    ON se.artist = ss.artist_name
    AND se.song = ss.title
    AND se.length = ss.duration
WHERE lower(se.page) = 'nextsong'",
        start_time = dialect.epoch_millis_to_timestamp("se.ts"),
    )
}

/// One row per user; the level of the user's latest event wins. Events with
/// the same latest `ts` leave the choice to the engine.
pub fn users() -> String {
    "INSERT INTO users (user_id, first_name, last_name, gender, level)
SELECT user_id, first_name, last_name, gender, level
FROM (
    SELECT
        se.userId AS user_id,
        se.firstName AS first_name,
        se.lastName AS last_name,
        se.gender AS gender,
        se.level AS level,
        ROW_NUMBER() OVER (PARTITION BY se.userId ORDER BY se.ts DESC) AS row_num
    FROM staging_events AS se
    WHERE lower(se.page) = 'nextsong'
        AND se.userId IS NOT NULL
) AS latest
WHERE row_num = 1"
        .to_string()
}

pub fn songs() -> String {
    "INSERT INTO songs (song_id, title, artist_id, year, duration)
SELECT song_id, title, artist_id, year, duration
FROM (
    SELECT
        ss.song_id AS song_id,
        ss.title AS title,
        ss.artist_id AS artist_id,
        ss.year AS year,
        ss.duration AS duration,
        ROW_NUMBER() OVER (PARTITION BY ss.song_id ORDER BY ss.year DESC, ss.title) AS row_num
    FROM staging_songs AS ss
    WHERE ss.song_id IS NOT NULL
) AS deduped
WHERE row_num = 1"
        .to_string()
}

pub fn artists() -> String {
    "INSERT INTO artists (artist_id, name, location, latitude, longitude)
SELECT artist_id, name, location, latitude, longitude
FROM (
    SELECT
        ss.artist_id AS artist_id,
        ss.artist_name AS name,
        ss.artist_location AS location,
        ss.artist_latitude AS latitude,
        ss.artist_longitude AS longitude,
        ROW_NUMBER() OVER (PARTITION BY ss.artist_id ORDER BY ss.artist_name) AS row_num
    FROM staging_songs AS ss
    WHERE ss.artist_id IS NOT NULL
) AS deduped
WHERE row_num = 1"
        .to_string()
}

/// Calendar parts of every distinct songplay start time
pub fn time() -> String {
    "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
SELECT DISTINCT
    sp.start_time AS start_time,
    EXTRACT(hour FROM sp.start_time) AS hour,
    EXTRACT(day FROM sp.start_time) AS day,
    EXTRACT(week FROM sp.start_time) AS week,
    EXTRACT(month FROM sp.start_time) AS month,
    EXTRACT(year FROM sp.start_time) AS year,
    EXTRACT(dow FROM sp.start_time) AS weekday
FROM songplays AS sp
WHERE sp.start_time IS NOT NULL"
        .to_string()
}
