//! SQLite-backed [`ReferenceStore`].
//!
//! One row per person document; the face set and metadata are JSON
//! columns. `tokio-rusqlite` funnels all access through a single
//! background connection, so each mutating call's read-modify-write
//! runs inside one transaction and is atomic with respect to every
//! other call — the per-document atomicity the core relies on.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so lexicographic comparison in SQL matches
//! chronological order.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use faceset_core::store::{PersonFilter, PersonUpdate, ReferenceStore, StoreError};
use faceset_core::types::{FaceSample, Metadata, PersonDoc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS persons (
    id           TEXT PRIMARY KEY,
    owner_id     TEXT NOT NULL,
    name         TEXT NOT NULL,
    description  TEXT,
    department   TEXT,
    employee_id  TEXT,
    position     TEXT,
    access_level TEXT,
    metadata     TEXT NOT NULL DEFAULT '{}',
    active       INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    faces        TEXT NOT NULL DEFAULT '[]'
);
CREATE INDEX IF NOT EXISTS idx_persons_owner ON persons(owner_id, created_at);
";

const COLUMNS: &str = "id, owner_id, name, description, department, employee_id, \
                       position, access_level, metadata, active, created_at, updated_at, faces";

/// Person document store backed by a SQLite database file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        tracing::info!(path = %path.display(), "opening person store");
        let conn = Connection::open(path).await.map_err(backend)?;
        Self::init(conn).await
    }

    /// In-memory database, used by tests.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await.map_err(backend)?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(backend)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl ReferenceStore for SqliteStore {
    async fn insert_one(&self, doc: PersonDoc) -> Result<(), StoreError> {
        self.conn
            .call(move |conn| {
                let metadata = serde_json::to_string(&doc.metadata).map_err(other)?;
                let faces = serde_json::to_string(&doc.faces).map_err(other)?;
                conn.execute(
                    "INSERT INTO persons (id, owner_id, name, description, department, \
                     employee_id, position, access_level, metadata, active, created_at, \
                     updated_at, faces) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    params![
                        doc.id,
                        doc.owner_id,
                        doc.name,
                        doc.description,
                        doc.department,
                        doc.employee_id,
                        doc.position,
                        doc.access_level,
                        metadata,
                        doc.active,
                        ts(&doc.created_at),
                        ts(&doc.updated_at),
                        faces,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(backend)
    }

    async fn find_one(
        &self,
        person_id: &str,
        owner_id: &str,
    ) -> Result<Option<PersonDoc>, StoreError> {
        let person_id = person_id.to_string();
        let owner_id = owner_id.to_string();
        let raw = self
            .conn
            .call(move |conn| Ok(query_raw(conn, &person_id, &owner_id)?))
            .await
            .map_err(backend)?;
        raw.map(parse_doc).transpose()
    }

    async fn update_one(
        &self,
        person_id: &str,
        owner_id: &str,
        update: PersonUpdate,
    ) -> Result<bool, StoreError> {
        let person_id = person_id.to_string();
        let owner_id = owner_id.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let Some(raw) = query_raw(&tx, &person_id, &owner_id)? else {
                    return Ok(false);
                };
                let mut doc = parse_doc(raw).map_err(other)?;
                update.apply(&mut doc);
                write_doc(&tx, &doc)?;
                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(backend)
    }

    async fn delete_one(&self, person_id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let person_id = person_id.to_string();
        let owner_id = owner_id.to_string();
        self.conn
            .call(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM persons WHERE id = ?1 AND owner_id = ?2",
                    params![person_id, owner_id],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(backend)
    }

    async fn count_documents(
        &self,
        owner_id: &str,
        filter: PersonFilter,
    ) -> Result<u64, StoreError> {
        let owner_id = owner_id.to_string();
        self.conn
            .call(move |conn| {
                let mut sql = String::from("SELECT COUNT(*) FROM persons WHERE owner_id = ?1");
                let created_after = filter.created_after.map(|t| ts(&t));
                let mut values: Vec<&dyn rusqlite::types::ToSql> = vec![&owner_id];
                if let Some(ref active) = filter.active {
                    values.push(active);
                    sql.push_str(&format!(" AND active = ?{}", values.len()));
                }
                if let Some(ref after) = created_after {
                    values.push(after);
                    sql.push_str(&format!(" AND created_at >= ?{}", values.len()));
                }
                let count: i64 = conn.query_row(&sql, values.as_slice(), |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(backend)
    }

    async fn find_sorted(
        &self,
        owner_id: &str,
        include_inactive: bool,
    ) -> Result<Vec<PersonDoc>, StoreError> {
        let owner_id = owner_id.to_string();
        let rows = self
            .conn
            .call(move |conn| {
                let sql = if include_inactive {
                    format!(
                        "SELECT {COLUMNS} FROM persons WHERE owner_id = ?1 \
                         ORDER BY created_at DESC"
                    )
                } else {
                    format!(
                        "SELECT {COLUMNS} FROM persons WHERE owner_id = ?1 AND active = 1 \
                         ORDER BY created_at DESC"
                    )
                };
                let mut stmt = conn.prepare(&sql)?;
                let mapped = stmt.query_map(params![owner_id], raw_from_row)?;
                let mut out = Vec::new();
                for row in mapped {
                    out.push(row?);
                }
                Ok(out)
            })
            .await
            .map_err(backend)?;
        rows.into_iter().map(parse_doc).collect()
    }
}

/// Row image before JSON/timestamp parsing.
struct RawPerson {
    id: String,
    owner_id: String,
    name: String,
    description: Option<String>,
    department: Option<String>,
    employee_id: Option<String>,
    position: Option<String>,
    access_level: Option<String>,
    metadata: String,
    active: bool,
    created_at: String,
    updated_at: String,
    faces: String,
}

fn raw_from_row(row: &Row<'_>) -> rusqlite::Result<RawPerson> {
    Ok(RawPerson {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        department: row.get(4)?,
        employee_id: row.get(5)?,
        position: row.get(6)?,
        access_level: row.get(7)?,
        metadata: row.get(8)?,
        active: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        faces: row.get(12)?,
    })
}

fn query_raw(
    conn: &rusqlite::Connection,
    person_id: &str,
    owner_id: &str,
) -> rusqlite::Result<Option<RawPerson>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM persons WHERE id = ?1 AND owner_id = ?2"),
        params![person_id, owner_id],
        raw_from_row,
    )
    .optional()
}

fn parse_doc(raw: RawPerson) -> Result<PersonDoc, StoreError> {
    let metadata: Metadata = serde_json::from_str(&raw.metadata)?;
    let faces: Vec<FaceSample> = serde_json::from_str(&raw.faces)?;
    Ok(PersonDoc {
        id: raw.id,
        owner_id: raw.owner_id,
        name: raw.name,
        description: raw.description,
        department: raw.department,
        employee_id: raw.employee_id,
        position: raw.position,
        access_level: raw.access_level,
        metadata,
        active: raw.active,
        created_at: parse_ts(&raw.created_at)?,
        updated_at: parse_ts(&raw.updated_at)?,
        faces,
    })
}

/// Write every mutable column of a loaded document back to its row.
fn write_doc(conn: &rusqlite::Connection, doc: &PersonDoc) -> Result<(), tokio_rusqlite::Error> {
    let metadata = serde_json::to_string(&doc.metadata).map_err(other)?;
    let faces = serde_json::to_string(&doc.faces).map_err(other)?;
    conn.execute(
        "UPDATE persons SET name = ?1, description = ?2, department = ?3, employee_id = ?4, \
         position = ?5, access_level = ?6, metadata = ?7, active = ?8, updated_at = ?9, \
         faces = ?10 WHERE id = ?11 AND owner_id = ?12",
        params![
            doc.name,
            doc.description,
            doc.department,
            doc.employee_id,
            doc.position,
            doc.access_level,
            metadata,
            doc.active,
            ts(&doc.updated_at),
            faces,
            doc.id,
            doc.owner_id,
        ],
    )?;
    Ok(())
}

/// Fixed-width RFC 3339 so string comparison orders chronologically.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(format!("bad timestamp '{s}': {e}")))
}

fn backend(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn other(err: impl std::error::Error + Send + Sync + 'static) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Other(Box::new(err))
}
