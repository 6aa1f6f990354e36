//! Durable per-domain result cache
//!
//! One SQLite table keyed by fully-qualified domain. Entries never expire;
//! a present row, even one recording an error, answers every later lookup
//! for that domain until it is removed.

use rusqlite::{params, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_rusqlite::Connection;

use crate::error::{DomainScoutError, Result};
use crate::types::DomainOutcome;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS domain_cache (
    domain TEXT PRIMARY KEY,
    available INTEGER,
    price_usd REAL,
    provider TEXT,
    error TEXT
)";

/// SQLite-backed outcome store.
///
/// The connection lives on its own background thread; every operation is a
/// message to that thread, so callers never block the async runtime and
/// writes are applied one at a time.
#[derive(Clone)]
pub struct DomainCache {
    path: PathBuf,
    conn: Connection,
}

impl DomainCache {
    /// Open (creating if needed) the cache file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DomainScoutError::io(e.to_string(), Some(parent.to_string_lossy().to_string()))
            })?;
        }

        let conn = Connection::open(&path).await?;
        conn.call(|conn| {
            conn.busy_timeout(Duration::from_secs(5))?;
            // journal_mode answers with a row, so it cannot go through execute.
            conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        tracing::debug!(path = %path.display(), "Domain cache opened");
        Ok(Self { path, conn })
    }

    /// A private cache that disappears with the process.
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        conn.call(|conn| Ok(conn.execute_batch(SCHEMA)?)).await?;
        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the stored outcome for `domain`.
    pub async fn get(&self, domain: &str) -> Result<Option<DomainOutcome>> {
        let key = domain.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT available, price_usd, provider, error FROM domain_cache WHERE domain = ?1",
                        params![key],
                        |row| {
                            Ok((
                                row.get::<_, Option<bool>>(0)?,
                                row.get::<_, Option<f64>>(1)?,
                                row.get::<_, Option<String>>(2)?,
                                row.get::<_, Option<String>>(3)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        Ok(row.map(|(available, price_usd, provider, error)| DomainOutcome {
            domain: domain.to_string(),
            available,
            price_usd,
            provider: provider.unwrap_or_default(),
            error,
            price_comparison: None,
        }))
    }

    /// Store `outcome` under `domain`, replacing any previous row.
    pub async fn set(&self, domain: &str, outcome: &DomainOutcome) -> Result<()> {
        let key = domain.to_string();
        let (available, price_usd) = (outcome.available, outcome.price_usd);
        let (provider, error) = (outcome.provider.clone(), outcome.error.clone());
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO domain_cache (domain, available, price_usd, provider, error)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![key, available, price_usd, provider, error],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Forget one domain. Returns whether a row existed.
    pub async fn remove(&self, domain: &str) -> Result<bool> {
        let key = domain.to_string();
        let removed = self
            .conn
            .call(move |conn| Ok(conn.execute("DELETE FROM domain_cache WHERE domain = ?1", params![key])?))
            .await?;
        Ok(removed > 0)
    }

    /// Forget everything. Returns the number of rows removed.
    pub async fn clear(&self) -> Result<usize> {
        let removed = self
            .conn
            .call(|conn| Ok(conn.execute("DELETE FROM domain_cache", [])?))
            .await?;
        Ok(removed)
    }

    pub async fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM domain_cache", [], |row| row.get(0))?))
            .await?;
        Ok(count as usize)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

impl std::fmt::Debug for DomainCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainCache").field("path", &self.path).finish()
    }
}
