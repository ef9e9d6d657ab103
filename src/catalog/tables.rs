//! Star-schema table definitions

use super::types::{ColumnDef, ColumnType, DistStyle, TableDef, TableKind};

pub const STAGING_EVENTS: &str = "staging_events";
pub const STAGING_SONGS: &str = "staging_songs";
pub const USERS: &str = "users";
pub const SONGS: &str = "songs";
pub const ARTISTS: &str = "artists";
pub const TIME: &str = "time";
pub const SONGPLAYS: &str = "songplays";

/// Event/track lengths in seconds, e.g. 218.93179
const LENGTH: ColumnType = ColumnType::Decimal(10, 5);

/// Raw user activity log, one row per JSON log line
pub fn staging_events() -> TableDef {
    use ColumnType::{BigInt, Double, Integer, Varchar};

    TableDef::new(
        STAGING_EVENTS,
        TableKind::Staging,
        vec![
            ColumnDef::new("artist", Varchar),
            ColumnDef::new("auth", Varchar),
            ColumnDef::new("firstName", Varchar),
            ColumnDef::new("gender", Varchar),
            ColumnDef::new("itemInSession", Integer),
            ColumnDef::new("lastName", Varchar),
            ColumnDef::new("length", LENGTH),
            ColumnDef::new("level", Varchar),
            ColumnDef::new("location", Varchar),
            ColumnDef::new("method", Varchar),
            ColumnDef::new("page", Varchar),
            ColumnDef::new("registration", Double),
            ColumnDef::new("sessionId", Integer),
            ColumnDef::new("song", Varchar),
            ColumnDef::new("status", Integer),
            ColumnDef::new("ts", BigInt),
            ColumnDef::new("userAgent", Varchar),
            ColumnDef::new("userId", Integer),
        ],
    )
    .with_dist_style(DistStyle::Even)
}

/// Raw song metadata, one row per song JSON document
pub fn staging_songs() -> TableDef {
    use ColumnType::{Double, Integer, Varchar};

    TableDef::new(
        STAGING_SONGS,
        TableKind::Staging,
        vec![
            ColumnDef::new("num_songs", Integer),
            ColumnDef::new("artist_id", Varchar),
            ColumnDef::new("artist_latitude", Double),
            ColumnDef::new("artist_longitude", Double),
            ColumnDef::new("artist_location", Varchar),
            ColumnDef::new("artist_name", Varchar),
            ColumnDef::new("song_id", Varchar),
            ColumnDef::new("title", Varchar),
            ColumnDef::new("duration", LENGTH),
            ColumnDef::new("year", Integer),
        ],
    )
    .with_dist_style(DistStyle::Even)
}

pub fn users() -> TableDef {
    use ColumnType::{Integer, Varchar};

    TableDef::new(
        USERS,
        TableKind::Dimension,
        vec![
            ColumnDef::new("user_id", Integer).primary_key(),
            ColumnDef::new("first_name", Varchar),
            ColumnDef::new("last_name", Varchar),
            ColumnDef::new("gender", Varchar),
            ColumnDef::new("level", Varchar),
        ],
    )
    .with_dist_style(DistStyle::All)
    .with_sort_key("user_id")
}

pub fn songs() -> TableDef {
    use ColumnType::{Integer, Varchar};

    // artist_id is required but deliberately not declared as a reference
    TableDef::new(
        SONGS,
        TableKind::Dimension,
        vec![
            ColumnDef::new("song_id", Varchar).primary_key(),
            ColumnDef::new("title", Varchar),
            ColumnDef::new("artist_id", Varchar).not_null(),
            ColumnDef::new("year", Integer),
            ColumnDef::new("duration", LENGTH),
        ],
    )
    .with_sort_key("song_id")
}

pub fn artists() -> TableDef {
    use ColumnType::{Double, Varchar};

    TableDef::new(
        ARTISTS,
        TableKind::Dimension,
        vec![
            ColumnDef::new("artist_id", Varchar).primary_key(),
            ColumnDef::new("name", Varchar),
            ColumnDef::new("location", Varchar),
            ColumnDef::new("latitude", Double),
            ColumnDef::new("longitude", Double),
        ],
    )
    .with_dist_style(DistStyle::All)
    .with_sort_key("artist_id")
}

pub fn time() -> TableDef {
    use ColumnType::{Integer, Timestamp};

    TableDef::new(
        TIME,
        TableKind::Dimension,
        vec![
            ColumnDef::new("start_time", Timestamp).primary_key(),
            ColumnDef::new("hour", Integer),
            ColumnDef::new("day", Integer),
            ColumnDef::new("week", Integer),
            ColumnDef::new("month", Integer),
            ColumnDef::new("year", Integer),
            ColumnDef::new("weekday", Integer),
        ],
    )
    .with_dist_style(DistStyle::All)
    .with_sort_key("start_time")
}

pub fn songplays() -> TableDef {
    use ColumnType::{Identity, Integer, Timestamp, Varchar};

    TableDef::new(
        SONGPLAYS,
        TableKind::Fact,
        vec![
            ColumnDef::new("songplay_id", Identity).primary_key(),
            ColumnDef::new("start_time", Timestamp).references(TIME, "start_time"),
            ColumnDef::new("user_id", Integer).references(USERS, "user_id"),
            ColumnDef::new("level", Varchar),
            ColumnDef::new("song_id", Varchar).references(SONGS, "song_id"),
            ColumnDef::new("artist_id", Varchar).references(ARTISTS, "artist_id"),
            ColumnDef::new("session_id", Integer),
            ColumnDef::new("location", Varchar),
            ColumnDef::new("user_agent", Varchar),
        ],
    )
    .with_sort_key("start_time")
}
