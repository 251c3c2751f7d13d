//! The SQLite-backed store.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::timefmt::{format_timestamp, parse_timestamp};

const USER_LEN: usize = 300;
const ROLE_LEN: usize = 300;
const LOOP_LEN: usize = 200;
const URI_LEN: usize = 300;

/// Participation state recorded with an event row. `None` marks absence
/// and is never inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipationState {
    None,
    Recv,
    Send,
}

impl ParticipationState {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipationState::None => "none",
            ParticipationState::Recv => "recv",
            ParticipationState::Send => "send",
        }
    }

    pub fn from_str(text: &str) -> Result<Self> {
        match text {
            "none" => Ok(ParticipationState::None),
            "recv" => Ok(ParticipationState::Recv),
            "send" => Ok(ParticipationState::Send),
            other => Err(Error::InvalidState(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipationEvent {
    pub user: String,
    pub role: String,
    pub loop_name: String,
    pub state: ParticipationState,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub id: Uuid,
    pub uri: String,
    pub loop_name: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

/// Result page of a bounded query.
///
/// Queries run with `LIMIT max + 1`; an overflowing page becomes
/// `TooManyResults` so callers can tell truncation from completion.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPage<T> {
    Results(Vec<T>),
    TooManyResults,
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub user: Option<String>,
    pub role: Option<String>,
    pub loop_name: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingFilter {
    pub loop_name: Option<String>,
    /// Restrict to recordings overlapping a participation of this user.
    pub user: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (and create if missing) a database at `url`, e.g.
    /// `sqlite:///var/lib/voxloop/recorder.db`.
    pub async fn open(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(sqlx::Error::from)?
            .create_if_missing(true);
        // a single connection: SQLite serializes writers anyway, and the
        // in-memory database would otherwise split per connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn open_in_memory() -> Result<Self> {
        Self::open("sqlite::memory:").await
    }

    /// Create the tables if they do not exist yet.
    pub async fn prepare(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS recordings \
             (id CHAR(36), uri VARCHAR(300), loop VARCHAR(200), \
              starttime TIMESTAMP, endtime TIMESTAMP)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS events \
             (usr VARCHAR(300), role VARCHAR(300), loop VARCHAR(200), \
              evstate VARCHAR(15), evtime TIMESTAMP)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert one participation-state event.
    ///
    /// `ParticipationState::None` is not a recordable state and is
    /// rejected.
    pub async fn add_participation_event(&self, event: &ParticipationEvent) -> Result<()> {
        if event.state == ParticipationState::None {
            return Err(Error::InvalidState("none".to_string()));
        }
        check_len("user", &event.user, USER_LEN)?;
        check_len("role", &event.role, ROLE_LEN)?;
        check_len("loop", &event.loop_name, LOOP_LEN)?;

        sqlx::query(
            "INSERT INTO events (usr, role, loop, evstate, evtime) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(event.user.as_str())
        .bind(event.role.as_str())
        .bind(event.loop_name.as_str())
        .bind(event.state.as_str())
        .bind(format_timestamp(event.time))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Query participation events, newest first.
    pub async fn get_participation_events(
        &self,
        filter: &EventFilter,
        max_num_results: u32,
        offset: u32,
    ) -> Result<QueryPage<ParticipationEvent>> {
        let mut sql =
            String::from("SELECT usr, role, loop, evstate, evtime FROM events");
        let mut binds: Vec<String> = Vec::new();
        let mut clauses: Vec<String> = Vec::new();

        if let Some(user) = &filter.user {
            binds.push(user.clone());
            clauses.push(format!("usr = ?{}", binds.len()));
        }
        if let Some(role) = &filter.role {
            binds.push(role.clone());
            clauses.push(format!("role = ?{}", binds.len()));
        }
        if let Some(loop_name) = &filter.loop_name {
            binds.push(loop_name.clone());
            clauses.push(format!("loop = ?{}", binds.len()));
        }
        if let Some(from) = filter.from {
            binds.push(format_timestamp(from));
            clauses.push(format!("evtime >= ?{}", binds.len()));
        }
        if let Some(until) = filter.until {
            binds.push(format_timestamp(until));
            clauses.push(format!("evtime <= ?{}", binds.len()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY evtime DESC");
        push_page_clause(&mut sql, max_num_results, offset);

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;

        if overflows(rows.len(), max_num_results) {
            return Ok(QueryPage::TooManyResults);
        }

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            events.push(ParticipationEvent {
                user: row.get("usr"),
                role: row.get("role"),
                loop_name: row.get("loop"),
                state: ParticipationState::from_str(&row.get::<String, _>("evstate"))?,
                time: parse_timestamp(&row.get::<String, _>("evtime"))?,
            });
        }
        Ok(QueryPage::Results(events))
    }

    /// Insert a started recording (no end time yet).
    pub async fn add_recording(
        &self,
        id: Uuid,
        uri: &str,
        loop_name: &str,
        start: DateTime<Utc>,
    ) -> Result<()> {
        check_len("uri", uri, URI_LEN)?;
        check_len("loop", loop_name, LOOP_LEN)?;
        sqlx::query(
            "INSERT INTO recordings (id, uri, loop, starttime, endtime) \
             VALUES (?1, ?2, ?3, ?4, NULL)",
        )
        .bind(id.to_string())
        .bind(uri)
        .bind(loop_name)
        .bind(format_timestamp(start))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Close a recording by setting its end time.
    pub async fn finish_recording(&self, id: Uuid, end: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE recordings SET endtime = ?1 WHERE id = ?2")
            .bind(format_timestamp(end))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Query recordings, newest first.
    pub async fn get_recordings(
        &self,
        filter: &RecordingFilter,
        max_num_results: u32,
        offset: u32,
    ) -> Result<QueryPage<Recording>> {
        let mut sql = String::from(
            "SELECT r.id, r.uri, r.loop, r.starttime, r.endtime FROM recordings r",
        );
        let mut binds: Vec<String> = Vec::new();
        let mut clauses: Vec<String> = Vec::new();

        if let Some(loop_name) = &filter.loop_name {
            binds.push(loop_name.clone());
            clauses.push(format!("r.loop = ?{}", binds.len()));
        }
        if let Some(user) = &filter.user {
            binds.push(user.clone());
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM events e WHERE e.usr = ?{} \
                 AND e.loop = r.loop \
                 AND e.evtime >= r.starttime \
                 AND (r.endtime IS NULL OR e.evtime <= r.endtime))",
                binds.len()
            ));
        }
        if let Some(from) = filter.from {
            binds.push(format_timestamp(from));
            clauses.push(format!(
                "(r.endtime IS NULL OR r.endtime >= ?{})",
                binds.len()
            ));
        }
        if let Some(until) = filter.until {
            binds.push(format_timestamp(until));
            clauses.push(format!("r.starttime <= ?{}", binds.len()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY r.starttime DESC");
        push_page_clause(&mut sql, max_num_results, offset);

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;

        if overflows(rows.len(), max_num_results) {
            return Ok(QueryPage::TooManyResults);
        }

        let mut recordings = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let end: Option<String> = row.get("endtime");
            recordings.push(Recording {
                id: Uuid::parse_str(&id).unwrap_or_default(),
                uri: row.get("uri"),
                loop_name: row.get("loop"),
                start: parse_timestamp(&row.get::<String, _>("starttime"))?,
                end: end.as_deref().map(parse_timestamp).transpose()?,
            });
        }
        Ok(QueryPage::Results(recordings))
    }
}

/// Append `LIMIT`/`OFFSET`. One row more than requested is fetched so the
/// caller can detect overflow; `max == 0` means unbounded.
fn push_page_clause(sql: &mut String, max_num_results: u32, offset: u32) {
    if max_num_results > 0 {
        sql.push_str(&format!(" LIMIT {}", max_num_results + 1));
        if offset > 0 {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
    } else if offset > 0 {
        sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset));
    }
}

fn overflows(rows: usize, max_num_results: u32) -> bool {
    max_num_results > 0 && rows > max_num_results as usize
}

fn check_len(what: &'static str, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(Error::ValueTooLong(what, max));
    }
    Ok(())
}
