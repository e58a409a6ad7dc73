//! Request → response entries within one cache generation.

use chrono::Utc;
use tokio_rusqlite::{params, rusqlite};

use super::hash::compute_request_key;
use crate::Error;
use crate::db::Db;
use crate::http::{Request, Response};

/// One open cache generation.
#[derive(Clone, Debug)]
pub struct CacheHandle {
    db: Db,
    name: String,
}

/// A row ready to be written, computed outside the database thread.
struct EntryRow {
    request_key: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        Ok(Self {
            request_key: compute_request_key(&request.method, request.url.as_str()),
            method: request.method.clone(),
            url: request.url.to_string(),
            status: response.status,
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
        })
    }
}

const UPSERT_ENTRY: &str = "INSERT INTO cache_entries (
        cache_name, request_key, method, url, status, headers_json, body, stored_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(cache_name, request_key) DO UPDATE SET
        method = excluded.method,
        url = excluded.url,
        status = excluded.status,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

impl CacheHandle {
    pub(crate) fn new(db: Db, name: String) -> Self {
        Self { db, name }
    }

    /// Generation name (the worker version it belongs to).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exact lookup of `request` in this generation only.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        let name = self.name.clone();
        let key = compute_request_key(&request.method, request.url.as_str());
        self.db
            .conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, headers_json, body, url FROM cache_entries
                     WHERE cache_name = ?1 AND request_key = ?2",
                )?;

                let result = stmt.query_row(params![name, key], |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                });

                match result {
                    Ok((status, headers_json, body, url)) => {
                        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
                        Ok(Some(Response::new(status, headers, body).with_url(url)))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Store a copy of `response` for `request`, replacing any previous entry.
    ///
    /// The caller keeps its own `response`; the stored copy is independent.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_all(vec![(request.clone(), response.clone())]).await
    }

    /// Store several entries in one transaction; either all are written or none.
    pub async fn put_all(&self, entries: Vec<(Request, Response)>) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(req, resp)| EntryRow::new(req, resp))
            .collect::<Result<Vec<_>, _>>()?;
        let name = self.name.clone();
        let stored_at = Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for row in &rows {
                    tx.execute(
                        UPSERT_ENTRY,
                        params![
                            &name,
                            &row.request_key,
                            &row.method,
                            &row.url,
                            row.status,
                            &row.headers_json,
                            &row.body,
                            &stored_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for `request`. Returns false if nothing was stored.
    pub async fn delete(&self, request: &Request) -> Result<bool, Error> {
        let name = self.name.clone();
        let key = compute_request_key(&request.method, request.url.as_str());
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let removed = conn.execute(
                    "DELETE FROM cache_entries WHERE cache_name = ?1 AND request_key = ?2",
                    params![name, key],
                )?;
                Ok(removed > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs with a stored response in this generation.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE cache_name = ?1 ORDER BY url ASC")?;
                let urls = stmt
                    .query_map(params![name], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}
