//! SQLite persistence layer.
//!
//! RULE: only the store modules talk to the database. Domain code calls
//! store methods — it never executes SQL directly. Per-entity queries live
//! in the submodules; this file owns the connection, the migrations, and
//! the audit log.

use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

mod account;
mod check;
mod company;
mod report;
mod user;

pub struct Store {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl Store {
    pub fn open(path: &str) -> AppResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database. For in-memory
    /// databases this returns a fresh, isolated database.
    pub fn reopen(&self) -> AppResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AppResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_companies_accounts.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/002_identity.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/003_checks.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/004_audit.sql"))?;
        Ok(())
    }

    // ── Audit log ──────────────────────────────────────────────

    pub(crate) fn audit(
        &self,
        entity: &str,
        entity_id: i64,
        action: &str,
        payload: &impl Serialize,
    ) -> AppResult<()> {
        self.conn.execute(
            "INSERT INTO audit_log (entity, entity_id, action, payload, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entity,
                entity_id,
                action,
                serde_json::to_string(payload)?,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    pub fn audit_entries(&self, entity: &str, entity_id: i64) -> AppResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity, entity_id, action, payload, recorded_at
             FROM audit_log WHERE entity = ?1 AND entity_id = ?2
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![entity, entity_id], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    entity: row.get(1)?,
                    entity_id: row.get(2)?,
                    action: row.get(3)?,
                    payload: row.get(4)?,
                    recorded_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub entity: String,
    pub entity_id: i64,
    pub action: String,
    pub payload: String,
    pub recorded_at: DateTime<Utc>,
}

/// Read a TEXT column holding a 2-dp decimal string.
pub(crate) fn decimal_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Owned bind values for dynamically assembled listing queries.
pub(crate) type BindValues = Vec<Box<dyn rusqlite::types::ToSql>>;

pub(crate) fn bind_refs(binds: &BindValues) -> impl Iterator<Item = &dyn rusqlite::types::ToSql> {
    binds.iter().map(|b| b.as_ref())
}

/// Map a SQLite constraint failure (FK RESTRICT, UNIQUE) onto the
/// domain-level conflict error; everything else stays a database error.
pub(crate) fn constraint_as_conflict(err: rusqlite::Error, message: &str) -> AppError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}
