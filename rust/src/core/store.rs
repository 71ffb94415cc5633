// Persisted popup state: the last good plaintext config and the ignored versions.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::dialog::IgnoredVersionSet;

const POPUP_DB_FILE: &str = "popup.sqlite3";
const CACHED_CONFIG_KEY: &str = "cached_config";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS ignored_versions (
        version TEXT PRIMARY KEY
    );
";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

pub trait ConfigStore: Send + Sync + 'static {
    fn cached_config(&self) -> Result<Option<String>, StoreError>;
    fn put_cached_config(&self, plaintext: &str) -> Result<(), StoreError>;
    fn ignored_versions(&self) -> Result<IgnoredVersionSet, StoreError>;
    fn contains_ignored_version(&self, version: &str) -> Result<bool, StoreError>;
    fn add_ignored_version(&self, version: &str) -> Result<(), StoreError>;
}

pub(crate) type SharedStore = Arc<dyn ConfigStore>;

pub struct SqliteConfigStore {
    conn: Mutex<Connection>,
}

impl SqliteConfigStore {
    pub fn open(data_dir: &str) -> Result<Self, StoreError> {
        let path = Path::new(data_dir).join(POPUP_DB_FILE);
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ConfigStore for SqliteConfigStore {
    fn cached_config(&self) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [CACHED_CONFIG_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_cached_config(&self, plaintext: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![CACHED_CONFIG_KEY, plaintext],
        )?;
        Ok(())
    }

    fn ignored_versions(&self) -> Result<IgnoredVersionSet, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT version FROM ignored_versions")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut set = IgnoredVersionSet::new();
        for version in rows {
            set.insert(version?);
        }
        Ok(set)
    }

    fn contains_ignored_version(&self, version: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM ignored_versions WHERE version = ?1",
                [version],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn add_ignored_version(&self, version: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO ignored_versions (version) VALUES (?1)",
            [version],
        )?;
        Ok(())
    }
}

/// Process-local store, used when the on-disk database cannot be opened.
#[derive(Default)]
pub struct MemoryConfigStore {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    cached_config: Option<String>,
    ignored: IgnoredVersionSet,
}

impl MemoryConfigStore {
    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ConfigStore for MemoryConfigStore {
    fn cached_config(&self) -> Result<Option<String>, StoreError> {
        Ok(self.state()?.cached_config.clone())
    }

    fn put_cached_config(&self, plaintext: &str) -> Result<(), StoreError> {
        self.state()?.cached_config = Some(plaintext.to_string());
        Ok(())
    }

    fn ignored_versions(&self) -> Result<IgnoredVersionSet, StoreError> {
        Ok(self.state()?.ignored.clone())
    }

    fn contains_ignored_version(&self, version: &str) -> Result<bool, StoreError> {
        Ok(self.state()?.ignored.contains(version))
    }

    fn add_ignored_version(&self, version: &str) -> Result<(), StoreError> {
        self.state()?.ignored.insert(version);
        Ok(())
    }
}

/// Opens the on-disk store, degrading to memory so popups still work this session.
pub(crate) fn open_store(data_dir: &str) -> SharedStore {
    match SqliteConfigStore::open(data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(%e, "failed to open popup db; using in-memory store");
            Arc::new(MemoryConfigStore::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn ConfigStore) {
        assert_eq!(store.cached_config().unwrap(), None);
        store.put_cached_config(r#"{"title":"a"}"#).unwrap();
        store.put_cached_config(r#"{"title":"b"}"#).unwrap();
        assert_eq!(
            store.cached_config().unwrap().as_deref(),
            Some(r#"{"title":"b"}"#)
        );

        assert!(!store.contains_ignored_version("2.3.0").unwrap());
        store.add_ignored_version("2.3.0").unwrap();
        store.add_ignored_version("2.3.0").unwrap();
        store.add_ignored_version("2.4.0").unwrap();
        assert!(store.contains_ignored_version("2.3.0").unwrap());
        let ignored = store.ignored_versions().unwrap();
        assert_eq!(ignored.len(), 2);
        assert!(ignored.contains("2.4.0"));
    }

    #[test]
    fn memory_store_semantics() {
        exercise(&MemoryConfigStore::default());
    }

    #[test]
    fn sqlite_store_semantics() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SqliteConfigStore::open(&dir.path().to_string_lossy()).expect("open");
        exercise(&store);
    }

    #[test]
    fn sqlite_store_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data_dir = dir.path().to_string_lossy().into_owned();
        {
            let store = SqliteConfigStore::open(&data_dir).expect("open");
            store.put_cached_config("{}").unwrap();
            store.add_ignored_version("9.9").unwrap();
        }
        let reopened = SqliteConfigStore::open(&data_dir).expect("reopen");
        assert_eq!(reopened.cached_config().unwrap().as_deref(), Some("{}"));
        assert!(reopened.contains_ignored_version("9.9").unwrap());
    }

    #[test]
    fn unopenable_dir_falls_back_to_memory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("does/not/exist");
        let store = open_store(&missing.to_string_lossy());
        store.put_cached_config("{}").unwrap();
        assert_eq!(store.cached_config().unwrap().as_deref(), Some("{}"));
    }
}
