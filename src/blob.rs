// Key-value blob persistence backends

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const DB_FILENAME: &str = "unitasks.db";

/// Synchronous string-blob key-value store
///
/// Mirrors the browser's local storage: one named slot per key, read and
/// written wholesale.
pub trait BlobStore {
    /// Read the blob stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob stored under `key`
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

impl<B: BlobStore + ?Sized> BlobStore for Box<B> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Keys double as filenames for the file backend
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Storage key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Storage key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.') {
        return Err(eyre!("Invalid storage key: {} (must be alphanumeric with _/-/.)", key));
    }
    if key.starts_with('.') {
        return Err(eyre!("Invalid storage key: {} (must not start with '.')", key));
    }
    Ok(())
}

// ============================================================================
// SQLite backend
// ============================================================================

/// Blob store backed by a single SQLite table
pub struct SqliteBlobStore {
    db: Connection,
}

impl SqliteBlobStore {
    /// Open or create `unitasks.db` inside `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).context("Failed to create store directory")?;

        let db_path = dir.join(DB_FILENAME);
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;
        debug!(path = ?db_path, "Opened SQLite blob store");

        let store = Self { db };
        store.create_schema()?;
        Ok(store)
    }

    /// In-memory database, nothing touches disk
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let store = Self { db };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating blob store schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

impl BlobStore for SqliteBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;

        let value = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .context("Failed to read blob")?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;

        self.db
            .execute(
                "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, now_ms()],
            )
            .context("Failed to write blob")?;

        debug!(key, bytes = value.len(), "Wrote blob to SQLite");
        Ok(())
    }
}

// ============================================================================
// File backend
// ============================================================================

/// Blob store keeping one `<key>.json` file per key
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create store directory")?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    // Keys never start with '.', so these cannot clash with a blob file
    fn temp_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", key))
    }

    fn lock_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{}.lock", key))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;

        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let mut file = fs::File::open(&path).context("Failed to open blob file")?;
        file.lock_shared().context("Failed to acquire file lock")?;

        let mut content = String::new();
        file.read_to_string(&mut content).context("Failed to read blob file")?;
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;

        let path = self.path_for(key);
        let tmp_path = self.temp_path_for(key);

        // Serialize writers; readers only ever see a complete blob file
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path_for(key))
            .context("Failed to open blob lock file")?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        let mut tmp = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp_path)
            .context("Failed to open temporary blob file")?;
        tmp.write_all(value.as_bytes()).context("Failed to write temporary blob file")?;
        tmp.sync_all().context("Failed to sync temporary blob file")?;
        drop(tmp);

        fs::rename(&tmp_path, &path).context("Failed to replace blob file")?;

        debug!(path = ?path, bytes = value.len(), "Wrote blob file");
        Ok(())
    }
}

// ============================================================================
// Memory backend
// ============================================================================

/// Process-local blob store
#[derive(Debug, Default, Clone)]
pub struct MemoryBlobStore {
    slots: HashMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self.slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Current timestamp in milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sqlite_open_creates_database() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");

        let _store = SqliteBlobStore::open(&dir).unwrap();
        assert!(dir.join(DB_FILENAME).exists());
    }

    #[test]
    fn test_sqlite_get_missing() {
        let store = SqliteBlobStore::open_in_memory().unwrap();
        assert_eq!(store.get("universityTasks").unwrap(), None);
    }

    #[test]
    fn test_sqlite_set_and_overwrite() {
        let mut store = SqliteBlobStore::open_in_memory().unwrap();

        store.set("universityTasks", "[1]").unwrap();
        store.set("universityTasks", "[2]").unwrap();
        assert_eq!(store.get("universityTasks").unwrap().as_deref(), Some("[2]"));
    }

    #[test]
    fn test_sqlite_persists_across_opens() {
        let temp = TempDir::new().unwrap();

        {
            let mut store = SqliteBlobStore::open(temp.path()).unwrap();
            store.set("universityTasks", "[]").unwrap();
        }

        let store = SqliteBlobStore::open(temp.path()).unwrap();
        assert_eq!(store.get("universityTasks").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_set_and_get() {
        let temp = TempDir::new().unwrap();
        let mut store = FileBlobStore::open(temp.path()).unwrap();

        assert_eq!(store.get("universityTasks").unwrap(), None);

        store.set("universityTasks", "[\"a long first value\"]").unwrap();
        store.set("universityTasks", "[]").unwrap();

        // Shorter second write must not leave a tail behind
        assert_eq!(store.get("universityTasks").unwrap().as_deref(), Some("[]"));
        assert!(temp.path().join("universityTasks.json").exists());
    }

    #[test]
    fn test_file_set_replaces_without_leftovers() {
        let temp = TempDir::new().unwrap();
        let mut store = FileBlobStore::open(temp.path()).unwrap();

        store.set("universityTasks", "[1]").unwrap();
        store.set("universityTasks", "[2]").unwrap();

        assert!(!store.temp_path_for("universityTasks").exists());
        assert_eq!(
            fs::read_to_string(store.path_for("universityTasks")).unwrap(),
            "[2]"
        );
    }

    #[test]
    fn test_file_set_stale_temp_file() {
        let temp = TempDir::new().unwrap();
        let mut store = FileBlobStore::open(temp.path()).unwrap();

        store.set("universityTasks", "[\"kept\"]").unwrap();
        // Leftover from a write that died before the rename
        fs::write(store.temp_path_for("universityTasks"), "[\"partial").unwrap();
        assert_eq!(store.get("universityTasks").unwrap().as_deref(), Some("[\"kept\"]"));

        store.set("universityTasks", "[]").unwrap();
        assert_eq!(store.get("universityTasks").unwrap().as_deref(), Some("[]"));
        assert!(!store.temp_path_for("universityTasks").exists());
    }

    #[test]
    fn test_all_backends_reject_bad_keys() {
        let temp = TempDir::new().unwrap();
        let backends: Vec<Box<dyn BlobStore>> = vec![
            Box::new(SqliteBlobStore::open_in_memory().unwrap()),
            Box::new(FileBlobStore::open(temp.path()).unwrap()),
            Box::new(MemoryBlobStore::new()),
        ];

        for mut store in backends {
            for key in ["", "../x", ".hidden", "a/b"] {
                assert!(store.get(key).is_err(), "get accepted {:?}", key);
                assert!(store.set(key, "[]").is_err(), "set accepted {:?}", key);
            }
        }
    }

    #[test]
    fn test_memory_set_and_get() {
        let mut store = MemoryBlobStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.get("other").unwrap(), None);
    }

    #[test]
    fn test_boxed_store() {
        let mut store: Box<dyn BlobStore> = Box::new(MemoryBlobStore::new());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("universityTasks").is_ok());
        assert!(validate_key("tasks-2025.v1").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key(&"a".repeat(65)).is_err());
    }
}
