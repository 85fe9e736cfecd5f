//! Cache bucket storage trait with SQLite and in-memory implementations.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
#[cfg(test)]
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

use crate::http::{Response, ResponseType};

/// Trait for cache storage backends.
///
/// Buckets are named collections of request URL → response snapshot. Every
/// method is a single atomic operation.
pub trait CacheStorage: Send + Sync {
  /// Create the bucket if it does not exist yet.
  fn open_bucket(&self, name: &str) -> Result<()>;

  /// All bucket names, oldest first.
  fn bucket_names(&self) -> Result<Vec<String>>;

  /// Delete a bucket and every entry in it. Returns whether it existed.
  fn delete_bucket(&self, name: &str) -> Result<bool>;

  /// Find a stored response for `url`, searching buckets oldest first.
  fn match_url(&self, url: &Url) -> Result<Option<Response>>;

  /// Store entries in `bucket`, creating it if needed. Either every entry is
  /// written or none is.
  fn put_all(&self, bucket: &str, entries: &[(Url, Response)]) -> Result<()>;

  /// Store a single entry, replacing any previous one for the same URL.
  fn put(&self, bucket: &str, url: &Url, response: &Response) -> Result<()> {
    self.put_all(bucket, &[(url.clone(), response.clone())])
  }
}

/// Stable, fixed-length key for a request URL. Fragments never reach the
/// network, so they do not take part in matching.
pub fn url_hash(url: &Url) -> String {
  let mut url = url.clone();
  url.set_fragment(None);

  let mut hasher = Sha256::new();
  hasher.update(url.as_str().as_bytes());
  hex::encode(hasher.finalize())
}

#[cfg(test)]
#[derive(Default)]
struct MemoryBucket {
  name: String,
  entries: HashMap<String, Response>,
}

/// Process-local cache storage.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
  buckets: Mutex<Vec<MemoryBucket>>,
}

#[cfg(test)]
impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

#[cfg(test)]
impl CacheStorage for MemoryStorage {
  fn open_bucket(&self, name: &str) -> Result<()> {
    let mut buckets = self
      .buckets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    if !buckets.iter().any(|b| b.name == name) {
      buckets.push(MemoryBucket {
        name: name.to_string(),
        ..Default::default()
      });
    }
    Ok(())
  }

  fn bucket_names(&self) -> Result<Vec<String>> {
    let buckets = self
      .buckets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(buckets.iter().map(|b| b.name.clone()).collect())
  }

  fn delete_bucket(&self, name: &str) -> Result<bool> {
    let mut buckets = self
      .buckets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let before = buckets.len();
    buckets.retain(|b| b.name != name);
    Ok(buckets.len() != before)
  }

  fn match_url(&self, url: &Url) -> Result<Option<Response>> {
    let buckets = self
      .buckets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let key = url_hash(url);
    Ok(buckets.iter().find_map(|b| b.entries.get(&key).cloned()))
  }

  fn put_all(&self, bucket: &str, entries: &[(Url, Response)]) -> Result<()> {
    let mut buckets = self
      .buckets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let index = match buckets.iter().position(|b| b.name == bucket) {
      Some(index) => index,
      None => {
        buckets.push(MemoryBucket {
          name: bucket.to_string(),
          ..Default::default()
        });
        buckets.len() - 1
      }
    };

    for (url, response) in entries {
      buckets[index]
        .entries
        .insert(url_hash(url), response.clone());
    }
    Ok(())
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Wrap a connection that already has the schema applied.
  pub fn new(conn: Connection) -> Self {
    Self {
      conn: Mutex::new(conn),
    }
  }
}

impl CacheStorage for SqliteStorage {
  fn open_bucket(&self, name: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR IGNORE INTO cache_buckets (name) VALUES (?)",
        params![name],
      )
      .map_err(|e| eyre!("Failed to open cache bucket {}: {}", name, e))?;

    Ok(())
  }

  fn bucket_names(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT name FROM cache_buckets ORDER BY created_at, rowid")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list cache buckets: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read cache bucket name: {}", e))?;

    Ok(names)
  }

  fn delete_bucket(&self, name: &str) -> Result<bool> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute("DELETE FROM cache_entries WHERE bucket = ?", params![name])
      .map_err(|e| eyre!("Failed to delete entries of {}: {}", name, e))?;
    let deleted = tx
      .execute("DELETE FROM cache_buckets WHERE name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete cache bucket {}: {}", name, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(deleted > 0)
  }

  fn match_url(&self, url: &Url) -> Result<Option<Response>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(u16, String, String, Vec<u8>)> = conn
      .query_row(
        "SELECT ce.status, ce.response_type, ce.headers, ce.body
         FROM cache_entries ce
         INNER JOIN cache_buckets cb ON cb.name = ce.bucket
         WHERE ce.url_hash = ?
         ORDER BY cb.created_at, cb.rowid
         LIMIT 1",
        params![url_hash(url)],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up {}: {}", url, e))?;

    let Some((status, response_type, headers, body)) = row else {
      return Ok(None);
    };

    let response_type: ResponseType = response_type
      .parse()
      .map_err(|e| eyre!("Corrupt cache entry for {}: {}", url, e))?;
    let headers: Vec<(String, String)> = serde_json::from_str(&headers)
      .map_err(|e| eyre!("Corrupt cache headers for {}: {}", url, e))?;

    Ok(Some(Response {
      status,
      response_type,
      headers,
      body,
    }))
  }

  fn put_all(&self, bucket: &str, entries: &[(Url, Response)]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "INSERT OR IGNORE INTO cache_buckets (name) VALUES (?)",
      params![bucket],
    )
    .map_err(|e| eyre!("Failed to open cache bucket {}: {}", bucket, e))?;

    for (url, response) in entries {
      let headers = serde_json::to_string(&response.headers)
        .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

      tx.execute(
        "INSERT OR REPLACE INTO cache_entries
           (bucket, url_hash, url, status, response_type, headers, body, cached_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))",
        params![
          bucket,
          url_hash(url),
          url.as_str(),
          response.status,
          response.response_type.as_str(),
          headers,
          response.body,
        ],
      )
      .map_err(|e| eyre!("Failed to store {}: {}", url, e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }
}
