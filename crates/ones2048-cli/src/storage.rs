//! Persistence backends for the session's two saved values.

use std::path::Path;

use log::warn;
use rusqlite::{params, Connection, OptionalExtension};

use ones2048_core::Storage;

const HISTORY_KEY: &str = "history";
const BEST_KEY: &str = "best";

/// Key-value store over one SQLite `state` table.
///
/// Load and write failures degrade to "no value" plus a warning; persistence
/// trouble must never take the game down.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open or create the save database at `path` and ensure the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS state (
                state_key TEXT PRIMARY KEY,
                state_value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { conn })
    }

    fn get(&self, key: &str) -> Option<String> {
        match self
            .conn
            .query_row(
                "SELECT state_value FROM state WHERE state_key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
        {
            Ok(value) => value,
            Err(err) => {
                warn!("failed to read {key} from the save database: {err}");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        let result = self.conn.execute(
            "INSERT INTO state (state_key, state_value) VALUES (?1, ?2)
             ON CONFLICT(state_key) DO UPDATE SET state_value=excluded.state_value",
            params![key, value],
        );
        if let Err(err) = result {
            warn!("failed to write {key} to the save database: {err}");
        }
    }
}

impl Storage for SqliteStorage {
    fn load_history(&self) -> Option<String> {
        self.get(HISTORY_KEY)
    }

    fn load_best(&self) -> Option<u32> {
        self.get(BEST_KEY).and_then(|raw| raw.parse().ok())
    }

    fn save_history(&mut self, encoded: &str) {
        self.set(HISTORY_KEY, encoded);
    }

    fn save_best(&mut self, best: u32) {
        self.set(BEST_KEY, &best.to_string());
    }
}

/// In-memory stand-in used by batch games, which never persist.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    history: Option<String>,
    best: Option<u32>,
}

impl Storage for MemoryStorage {
    fn load_history(&self) -> Option<String> {
        self.history.clone()
    }

    fn load_best(&self) -> Option<u32> {
        self.best
    }

    fn save_history(&mut self, encoded: &str) {
        self.history = Some(encoded.to_string());
    }

    fn save_best(&mut self, best: u32) {
        self.best = Some(best);
    }
}
