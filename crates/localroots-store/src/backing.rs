//! Persistent key-value backing.
//!
//! The rest of the crate only ever sees this contract: named string slots
//! with a monotonically increasing version per slot.  Any medium that can
//! honour it is substitutable; the crate ships a SQLite implementation for
//! durability and an in-memory one for tests and embedding.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};

/// Schema version kept in the `user_version` pragma, so setup runs exactly
/// once per database file.  Bump it alongside [`SCHEMA_SQL`] when the schema
/// changes.
const SCHEMA_VERSION: u32 = 1;

/// The whole schema is one table.  Every domain collection is one row: a
/// JSON-encoded payload plus a write version used both for optimistic
/// concurrency and for cross-instance change detection.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS slots (
    key     TEXT PRIMARY KEY NOT NULL,   -- e.g. "products", "wallet:<user id>"
    value   TEXT NOT NULL,               -- JSON array / object
    version INTEGER NOT NULL DEFAULT 1   -- bumped by exactly 1 per write
);
"#;

fn init_schema(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if current < SCHEMA_VERSION {
        tracing::info!(
            from_version = current,
            to_version = SCHEMA_VERSION,
            "initialising slot schema"
        );
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

/// A slot's current contents and write version.
///
/// The version starts at 1 on first write and increases by exactly one per
/// successful write, so it doubles as the change-detection generation used
/// by [`crate::Store::refresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotValue {
    pub value: String,
    pub version: u64,
}

/// Contract every backing medium must satisfy.
///
/// `get` and the write operations never fail for well-formed keys on a
/// healthy medium; errors signal the medium itself is broken.
pub trait KvBacking: Send + Sync {
    /// Read a slot.  `None` means the slot has never been written.
    fn get(&self, key: &str) -> Result<Option<SlotValue>>;

    /// Unconditional write (last-writer-wins).  Bumps the version.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Write only if the slot is still at `expected_version` (0 means
    /// "expect absent").  Returns `false` when another writer got there
    /// first.
    fn compare_and_set(&self, key: &str, value: &str, expected_version: u64) -> Result<bool>;

    /// Current version of every written slot, for cross-instance change
    /// detection.
    fn versions(&self) -> Result<Vec<(String, u64)>>;
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

/// Durable backing: one `slots` table in a SQLite database.
pub struct SqliteBacking {
    conn: Mutex<Connection>,
}

impl SqliteBacking {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/localroots/localroots.db`
    /// - macOS:   `~/Library/Application Support/com.localroots.localroots/localroots.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\localroots\localroots\data\localroots.db`
    pub fn open_default() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "localroots", "localroots").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("localroots.db");

        tracing::info!(path = %db_path.display(), "opening slot database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    ///
    /// Useful for tests and for embedding the store inside custom directory
    /// layouts.  Two backings opened at the same path see each other's
    /// writes, which is how sibling app instances stay in sync.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Fully in-memory database.  Nothing survives the process.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5_000)?;

        init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.lock().ok()?.path().map(PathBuf::from)
    }
}

impl KvBacking for SqliteBacking {
    fn get(&self, key: &str) -> Result<Option<SlotValue>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT value, version FROM slots WHERE key = ?1",
                params![key],
                |row| {
                    Ok(SlotValue {
                        value: row.get(0)?,
                        version: row.get::<_, i64>(1)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO slots (key, value, version) VALUES (?1, ?2, 1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            version = slots.version + 1",
            params![key, value],
        )?;
        Ok(())
    }

    fn compare_and_set(&self, key: &str, value: &str, expected_version: u64) -> Result<bool> {
        let conn = self.lock()?;
        let affected = if expected_version == 0 {
            conn.execute(
                "INSERT INTO slots (key, value, version) VALUES (?1, ?2, 1)
                 ON CONFLICT(key) DO NOTHING",
                params![key, value],
            )?
        } else {
            conn.execute(
                "UPDATE slots SET value = ?2, version = version + 1
                 WHERE key = ?1 AND version = ?3",
                params![key, value, expected_version as i64],
            )?
        };
        Ok(affected > 0)
    }

    fn versions(&self) -> Result<Vec<(String, u64)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key, version FROM slots")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut versions = Vec::new();
        for row in rows {
            versions.push(row?);
        }
        Ok(versions)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Volatile backing over a `HashMap`, for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryBacking {
    slots: Mutex<HashMap<String, SlotValue>>,
}

impl MemoryBacking {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, SlotValue>>> {
        self.slots.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl KvBacking for MemoryBacking {
    fn get(&self, key: &str) -> Result<Option<SlotValue>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.lock()?;
        let version = slots.get(key).map(|s| s.version).unwrap_or(0) + 1;
        slots.insert(
            key.to_string(),
            SlotValue {
                value: value.to_string(),
                version,
            },
        );
        Ok(())
    }

    fn compare_and_set(&self, key: &str, value: &str, expected_version: u64) -> Result<bool> {
        let mut slots = self.lock()?;
        let current = slots.get(key).map(|s| s.version).unwrap_or(0);
        if current != expected_version {
            return Ok(false);
        }
        slots.insert(
            key.to_string(),
            SlotValue {
                value: value.to_string(),
                version: current + 1,
            },
        );
        Ok(true)
    }

    fn versions(&self) -> Result<Vec<(String, u64)>> {
        Ok(self
            .lock()?
            .iter()
            .map(|(k, s)| (k.clone(), s.version))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_contract(backing: &dyn KvBacking) {
        assert_eq!(backing.get("products").unwrap(), None);

        // First write must expect version 0.
        assert!(backing.compare_and_set("products", "[]", 0).unwrap());
        let slot = backing.get("products").unwrap().unwrap();
        assert_eq!(slot.value, "[]");
        assert_eq!(slot.version, 1);

        // Stale expectations lose.
        assert!(!backing.compare_and_set("products", "[1]", 0).unwrap());
        assert!(!backing.compare_and_set("products", "[1]", 5).unwrap());
        assert_eq!(backing.get("products").unwrap().unwrap().value, "[]");

        // Matching expectation wins and bumps the version.
        assert!(backing.compare_and_set("products", "[1]", 1).unwrap());
        assert_eq!(backing.get("products").unwrap().unwrap().version, 2);

        // Unconditional set also bumps.
        backing.set("products", "[1,2]").unwrap();
        assert_eq!(backing.get("products").unwrap().unwrap().version, 3);

        backing.set("orders", "[]").unwrap();
        let mut versions = backing.versions().unwrap();
        versions.sort();
        assert_eq!(
            versions,
            vec![("orders".to_string(), 1), ("products".to_string(), 3)]
        );
    }

    #[test]
    fn memory_backing_contract() {
        check_contract(&MemoryBacking::new());
    }

    #[test]
    fn sqlite_backing_contract() {
        check_contract(&SqliteBacking::open_in_memory().unwrap());
    }

    #[test]
    fn sqlite_backing_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slots.db");

        {
            let backing = SqliteBacking::open_at(&path).unwrap();
            backing.set("products", "[\"palm oil\"]").unwrap();
        }

        let backing = SqliteBacking::open_at(&path).unwrap();
        let slot = backing.get("products").unwrap().unwrap();
        assert_eq!(slot.value, "[\"palm oil\"]");
        assert_eq!(slot.version, 1);
    }
}
