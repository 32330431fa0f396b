// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed usage ledger store.
//!
//! A single-row counter table is all the durability the ledger needs:
//! `{period_start, spent_usd}` read at startup and overwritten on every
//! commit and rollover. All operations go through the tokio-rusqlite
//! background thread.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quorum_core::{LedgerStore, PersistedLedger, QuorumError};
use rusqlite::OptionalExtension;

/// Convert a tokio-rusqlite error into `QuorumError::Storage`.
fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> QuorumError {
    QuorumError::Storage {
        source: Box::new(e),
    }
}

/// Persistent ledger store backed by SQLite.
pub struct SqliteLedgerStore {
    conn: tokio_rusqlite::Connection,
}

impl SqliteLedgerStore {
    /// Open (or create) the ledger database at the given path.
    pub async fn open(path: &str) -> Result<Self, QuorumError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| QuorumError::Storage {
                source: Box::new(e),
            })?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory database; used by tests.
    pub async fn open_in_memory() -> Result<Self, QuorumError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| QuorumError::Storage {
                source: Box::new(e),
            })?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), QuorumError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS usage_ledger (
                        id INTEGER PRIMARY KEY CHECK (id = 1),
                        period_start TEXT NOT NULL,
                        spent_usd REAL NOT NULL DEFAULT 0.0
                    );",
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn load(&self) -> Result<Option<PersistedLedger>, QuorumError> {
        let row: Option<(String, f64)> = self
            .conn
            .call(|conn| {
                let row = conn
                    .query_row(
                        "SELECT period_start, spent_usd FROM usage_ledger WHERE id = 1",
                        [],
                        |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(map_tr_err)?;

        match row {
            None => Ok(None),
            Some((start, spent_usd)) => {
                let period_start = DateTime::parse_from_rfc3339(&start)
                    .map_err(|e| QuorumError::Storage {
                        source: Box::new(e),
                    })?
                    .with_timezone(&Utc);
                Ok(Some(PersistedLedger {
                    period_start,
                    spent_usd,
                }))
            }
        }
    }

    async fn save(&self, state: &PersistedLedger) -> Result<(), QuorumError> {
        let period_start = state.period_start.to_rfc3339();
        let spent_usd = state.spent_usd;
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO usage_ledger (id, period_start, spent_usd)
                     VALUES (1, ?1, ?2)
                     ON CONFLICT(id) DO UPDATE SET
                         period_start = excluded.period_start,
                         spent_usd = excluded.spent_usd",
                    rusqlite::params![period_start, spent_usd],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}
