use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

// @module: Sqlite-backed translation reuse store

/// Persistent store of validated translations, keyed by content hash and
/// model name so a re-run of the same book costs nothing it already paid for.
pub struct TranslationMemory {
    /// Sqlite connection; a single pipeline accesses it sequentially
    conn: Mutex<Connection>,
}

impl TranslationMemory {
    /// Open (or create) a memory database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open translation memory: {:?}", path.as_ref()))?;
        Self::initialize(conn)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS translations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                original_hash TEXT NOT NULL,
                original_text TEXT NOT NULL,
                translated_text TEXT NOT NULL,
                model_name TEXT NOT NULL,
                UNIQUE(original_hash, model_name)
            )",
            [],
        )
        .context("Failed to create translations table")?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Fetch a stored translation of exactly this text under this model
    pub fn get(&self, original_text: &str, model_name: &str) -> Result<Option<String>> {
        let hash = content_hash(original_text);
        let conn = self.conn.lock();
        let result = conn
            .query_row(
                "SELECT translated_text FROM translations WHERE original_hash = ?1 AND model_name = ?2",
                params![hash, model_name],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .context("Translation memory query failed")?;

        if result.is_some() {
            debug!("Translation memory hit ({} chars)", original_text.len());
        }
        Ok(result)
    }

    /// Store a translation, replacing any previous one for the same key
    pub fn save(&self, original_text: &str, translated_text: &str, model_name: &str) -> Result<()> {
        let hash = content_hash(original_text);
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO translations
                (original_hash, original_text, translated_text, model_name)
             VALUES (?1, ?2, ?3, ?4)",
            params![hash, original_text, translated_text, model_name],
        )
        .context("Translation memory insert failed")?;
        Ok(())
    }

    /// Number of stored translations
    pub fn len(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM translations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Hex SHA-256 of the original text
fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
