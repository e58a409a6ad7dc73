//! Persistent response store.
//!
//! Remembers the JSON body of every successful movie API response, keyed by
//! request URL, so searches keep answering when the network is gone.
//!
//! - One record per URL; writes are upserts, last commit wins.
//! - Reads fail closed: a missing, corrupt or unreadable record is a miss.
//! - Records are never evicted unless a purge is asked for explicitly.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

use crate::Error;
use crate::db::Db;

/// A stored API payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredRecord {
    pub url: String,
    /// Serialized JSON payload.
    pub response: String,
    pub stored_at: String,
}

/// Handle to the persistent response store.
#[derive(Clone, Debug)]
pub struct ResponseStore {
    db: Db,
}

impl ResponseStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Serialize `value` and upsert it under `url`.
    ///
    /// # Errors
    ///
    /// Returns a store error when the database is unavailable or the write aborts.
    /// Callers on the request path log it and carry on.
    pub async fn put(&self, url: &str, value: &serde_json::Value) -> Result<(), Error> {
        let url = url.to_string();
        let response = serde_json::to_string(value)?;
        let stored_at = Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO responses (url, response, stored_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(url) DO UPDATE SET
                        response = excluded.response,
                        stored_at = excluded.stored_at",
                    params![url, response, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the payload stored for `url`.
    ///
    /// Returns `None` when nothing is stored, when the stored payload is JSON
    /// `null` or not valid JSON, or when the database itself fails.
    pub async fn get(&self, url: &str) -> Option<serde_json::Value> {
        let record = match self.get_record(url).await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(url, error = %e, "response store read failed");
                return None;
            }
        };

        match serde_json::from_str(&record.response) {
            Ok(serde_json::Value::Null) => None,
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(url, error = %e, "discarding corrupt stored response");
                None
            }
        }
    }

    /// Get the raw record for `url`.
    pub async fn get_record(&self, url: &str) -> Result<Option<StoredRecord>, Error> {
        let url = url.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<Option<StoredRecord>, Error> {
                let mut stmt = conn.prepare("SELECT url, response, stored_at FROM responses WHERE url = ?1")?;

                let result = stmt.query_row(params![url], |row| {
                    Ok(StoredRecord { url: row.get(0)?, response: row.get(1)?, stored_at: row.get(2)? })
                });

                match result {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<u64, Error> {
        self.db
            .conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete records stored more than `days` days ago.
    ///
    /// Returns the number of deleted records.
    pub async fn purge_older_than(&self, days: i64) -> Result<u64, Error> {
        let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM responses WHERE stored_at < ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge the least recently written records until count <= max_records.
    ///
    /// Returns the number of deleted records.
    pub async fn purge_lru(&self, max_records: usize) -> Result<u64, Error> {
        let max = i64::try_from(max_records).unwrap_or(i64::MAX);
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let deleted = conn.execute(
                    "DELETE FROM responses WHERE url IN (
                    SELECT url FROM responses ORDER BY stored_at ASC, rowid ASC LIMIT ?1
                )",
                    params![count - max],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
