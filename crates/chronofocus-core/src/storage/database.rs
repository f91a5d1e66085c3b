//! SQLite-backed persistent state store.
//!
//! A single `kv` table holds the engine's durable records as JSON
//! documents, one key per logical record:
//!
//! - `current_session` -- the active session, absent when idle
//! - `session_outcome` -- the last resolved outcome, absent once consumed
//! - `user_stats` -- cumulative statistics
//! - `pomodoros_<date>` -- day-keyed completed-pomodoro counters
//! - `session_history` -- bounded recent-session log
//!
//! Every write is a whole-record overwrite, so a retried write is always
//! safe. There is no multi-key transaction guarantee beyond per-call
//! atomicity.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::data_dir;
use crate::battle::Session;
use crate::error::StorageError;
use crate::stats::{SessionHistoryEntry, SessionOutcome, UserStats};

const KEY_SESSION: &str = "current_session";
const KEY_OUTCOME: &str = "session_outcome";
const KEY_STATS: &str = "user_stats";
const KEY_HISTORY: &str = "session_history";

/// Fixed capacity of the recent-session history log.
pub const HISTORY_CAPACITY: usize = 5;

/// SQLite database holding all durable engine state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/chronofocus/chronofocus.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self, StorageError> {
        let path = data_dir()
            .map_err(|e| StorageError::QueryFailed(format!("data dir: {e}")))?
            .join("chronofocus.db");
        Self::open_at(&path)
    }

    /// Open the database at an explicit path.
    pub fn open_at(path: &std::path::Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (tests, ephemeral hosts).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    // ── Raw kv access ────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key from the kv store. Removing an absent key is a no-op.
    pub fn kv_remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn get_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.kv_get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::CorruptRecord {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn set_record<T: Serialize>(&self, key: &str, record: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(record).map_err(|e| StorageError::CorruptRecord {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.kv_set(key, &raw)
    }

    // ── Typed records ────────────────────────────────────────────────

    pub fn load_session(&self) -> Result<Option<Session>, StorageError> {
        self.get_record(KEY_SESSION)
    }

    pub fn save_session(&self, session: &Session) -> Result<(), StorageError> {
        self.set_record(KEY_SESSION, session)
    }

    pub fn clear_session(&self) -> Result<(), StorageError> {
        self.kv_remove(KEY_SESSION)
    }

    pub fn load_outcome(&self) -> Result<Option<SessionOutcome>, StorageError> {
        self.get_record(KEY_OUTCOME)
    }

    pub fn save_outcome(&self, outcome: &SessionOutcome) -> Result<(), StorageError> {
        self.set_record(KEY_OUTCOME, outcome)
    }

    pub fn clear_outcome(&self) -> Result<(), StorageError> {
        self.kv_remove(KEY_OUTCOME)
    }

    pub fn load_stats(&self) -> Result<Option<UserStats>, StorageError> {
        self.get_record(KEY_STATS)
    }

    pub fn save_stats(&self, stats: &UserStats) -> Result<(), StorageError> {
        self.set_record(KEY_STATS, stats)
    }

    // ── Day-keyed pomodoro counters ──────────────────────────────────

    fn pomodoro_key(date: NaiveDate) -> String {
        format!("pomodoros_{}", date.format("%Y-%m-%d"))
    }

    /// Completed pomodoros recorded for `date`.
    pub fn pomodoros_on(&self, date: NaiveDate) -> Result<u32, StorageError> {
        let raw = self.kv_get(&Self::pomodoro_key(date))?;
        Ok(raw.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    /// Increment the counter for `date`, returning the new count.
    pub fn add_pomodoro(&self, date: NaiveDate) -> Result<u32, StorageError> {
        let count = self.pomodoros_on(date)? + 1;
        self.kv_set(&Self::pomodoro_key(date), &count.to_string())?;
        Ok(count)
    }

    // ── Recent-session history ───────────────────────────────────────

    pub fn history(&self) -> Result<Vec<SessionHistoryEntry>, StorageError> {
        Ok(self
            .get_record::<Vec<SessionHistoryEntry>>(KEY_HISTORY)?
            .unwrap_or_default())
    }

    /// Append an entry, keeping only the newest [`HISTORY_CAPACITY`].
    pub fn push_history(&self, entry: SessionHistoryEntry) -> Result<(), StorageError> {
        let mut history = self.history()?;
        history.push(entry);
        if history.len() > HISTORY_CAPACITY {
            let overflow = history.len() - HISTORY_CAPACITY;
            history.drain(..overflow);
        }
        self.set_record(KEY_HISTORY, &history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_remove("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn stats_round_trip() {
        let db = Database::open_memory().unwrap();
        assert!(db.load_stats().unwrap().is_none());

        let mut stats = UserStats::default();
        stats.current_xp = 420;
        stats.monsters_defeated.insert("scrollfiend".into(), 3);
        db.save_stats(&stats).unwrap();

        let loaded = db.load_stats().unwrap().unwrap();
        assert_eq!(loaded, stats);
    }

    #[test]
    fn corrupt_record_is_an_error_not_a_panic() {
        let db = Database::open_memory().unwrap();
        db.kv_set("user_stats", "not json").unwrap();
        let err = db.load_stats().unwrap_err();
        assert!(matches!(err, StorageError::CorruptRecord { .. }));
    }

    #[test]
    fn pomodoro_counters_are_day_keyed() {
        let db = Database::open_memory().unwrap();
        let day1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();

        assert_eq!(db.pomodoros_on(day1).unwrap(), 0);
        assert_eq!(db.add_pomodoro(day1).unwrap(), 1);
        assert_eq!(db.add_pomodoro(day1).unwrap(), 2);
        assert_eq!(db.pomodoros_on(day2).unwrap(), 0);
    }

    #[test]
    fn history_is_bounded() {
        let db = Database::open_memory().unwrap();
        for i in 0..8 {
            db.push_history(SessionHistoryEntry {
                success: i % 2 == 0,
                date: Utc::now(),
            })
            .unwrap();
        }
        let history = db.history().unwrap();
        assert_eq!(history.len(), HISTORY_CAPACITY);
        // Oldest entries were dropped; the final push (i == 7) survives.
        assert!(!history.last().unwrap().success);
    }
}
