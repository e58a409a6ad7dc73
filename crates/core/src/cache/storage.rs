//! Cache generation management: open, list, delete.

use chrono::Utc;
use tokio_rusqlite::params;

use super::entries::CacheHandle;
use crate::Error;
use crate::db::Db;

/// Handle to every cache generation in the database.
#[derive(Clone, Debug)]
pub struct CacheStorage {
    db: Db,
}

impl CacheStorage {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Open the generation called `name`, creating it if absent.
    pub async fn open(&self, name: &str) -> Result<CacheHandle, Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("cache name cannot be empty".into()));
        }

        let owned = name.to_string();
        let created_at = Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_generations (name, created_at) VALUES (?1, ?2)",
                    params![owned, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(CacheHandle::new(self.db.clone(), name.to_string()))
    }

    /// Whether a generation called `name` exists.
    pub async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and every response stored in it.
    ///
    /// Returns false if no such generation existed.
    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cache_entries WHERE cache_name = ?1", params![name])?;
                let removed = tx.execute("DELETE FROM cache_generations WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all generations, stale or current, oldest first.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.db
            .conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_generations ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }
}
