use std::sync::Mutex;

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use newsfeed_core::ContentKey;
use tracing::debug;

use crate::{now_ms, BlobStore};

/// SQLite-backed blob store. Simple, synchronous, one connection behind a mutex.
pub struct SqliteStore {
    db: Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    pub fn open_default() -> Result<Self> {
        let path = std::env::var("NEWSFEED_DB_PATH").unwrap_or_else(|_| default_db_path());
        Self::open(&path)
    }

    pub fn open(path: &str) -> Result<Self> {
        let started = std::time::Instant::now();
        let db = rusqlite::Connection::open(path).with_context(|| format!("opening sqlite db at {}", path))?;
        db.pragma_update(None, "journal_mode", &"WAL").ok();
        db.pragma_update(None, "synchronous", &"NORMAL").ok();
        db.execute(
            "CREATE TABLE IF NOT EXISTS blobs (
                key         TEXT PRIMARY KEY,
                bytes       BLOB NOT NULL,
                last_access INTEGER NOT NULL
            )",
            [],
        )
        .context("creating blobs table")?;
        db.execute("CREATE INDEX IF NOT EXISTS idx_blobs_last_access ON blobs(last_access DESC)", [])
            .ok();
        let me = Self { db: Mutex::new(db) };
        histogram!("persist_open_ms", started.elapsed().as_secs_f64() * 1000.0);
        debug!(path, "blob store opened");
        Ok(me)
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, rusqlite::Connection> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BlobStore for SqliteStore {
    fn read(&self, key: &ContentKey) -> Result<Option<Vec<u8>>> {
        let started = std::time::Instant::now();
        let hex = key.to_hex();
        let db = self.conn();
        let mut stmt = db.prepare_cached("SELECT bytes FROM blobs WHERE key = ?1")?;
        let mut rows = stmt.query([&hex])?;
        let found: Option<Vec<u8>> = match rows.next()? {
            Some(row) => Some(row.get(0)?),
            None => None,
        };
        drop(rows);
        drop(stmt);
        if found.is_some() {
            db.execute("UPDATE blobs SET last_access = ?1 WHERE key = ?2", (now_ms(), &hex))
                .context("touching blob")?;
        }
        histogram!("persist_read_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(found)
    }

    fn write(&self, key: &ContentKey, bytes: &[u8]) -> Result<()> {
        let started = std::time::Instant::now();
        let db = self.conn();
        db.execute(
            "INSERT OR REPLACE INTO blobs(key, bytes, last_access) VALUES (?1, ?2, ?3)",
            (key.to_hex(), bytes, now_ms()),
        )
        .with_context(|| format!("writing blob {}", key))?;
        histogram!("persist_write_ms", started.elapsed().as_secs_f64() * 1000.0);
        counter!("persist_write_total", 1u64);
        Ok(())
    }

    fn trim(&self, keep: usize) -> Result<usize> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        let removed = tx.execute(
            "DELETE FROM blobs
             WHERE rowid NOT IN (
                 SELECT rowid FROM blobs ORDER BY last_access DESC, rowid DESC LIMIT ?1
             )",
            [keep as i64],
        )?;
        tx.commit()?;
        if removed > 0 {
            debug!(removed, keep, "blob store trimmed");
        }
        Ok(removed)
    }
}

fn default_db_path() -> String {
    if let Some(home) = std::env::var_os("HOME") {
        let mut p = std::path::PathBuf::from(home);
        p.push(".newsfeed");
        let _ = std::fs::create_dir_all(&p);
        p.push("cache.db");
        return p.to_string_lossy().to_string();
    }
    "newsfeed-cache.db".to_string()
}
