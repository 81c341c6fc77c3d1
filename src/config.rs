// Application configuration, read from YAML

use crate::blob::{self, BlobStore, FileBlobStore, SqliteBlobStore};
use crate::store::DEFAULT_STORAGE_KEY;
use chrono::format::{Item, StrftimeItems};
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{Level, debug};

const APP_DIR: &str = "unitasks";
const CONFIG_FILENAME: &str = "unitasks.yml";

/// Which blob store backs the task collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Json,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::Json => write!(f, "json"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "json" | "file" => Ok(Backend::Json),
            _ => Err(format!("Unknown backend: {} (expected sqlite or json)", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the blob store
    pub store_path: PathBuf,
    pub backend: Backend,
    /// Slot name the task list is stored under
    pub storage_key: String,
    /// strftime pattern for due dates
    pub date_format: String,
    pub color: bool,
    /// Used when no `-v` flag is given
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            backend: Backend::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            date_format: "%d/%m/%Y".to_string(),
            color: true,
            log_level: "warn".to_string(),
        }
    }
}

/// `<data_dir>/unitasks`, or `./.unitasks` when the platform has no data dir
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".unitasks"))
}

/// `<config_dir>/unitasks/unitasks.yml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

impl Config {
    /// Load from an explicit path, else the default location, else defaults
    ///
    /// An explicit path must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    debug!("No config file, using defaults");
                    Self::default()
                }
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config file {}", path.display()))?;

        debug!(path = ?path, "Loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        blob::validate_key(&self.storage_key)?;

        if self.date_format.is_empty() {
            return Err(eyre!("date_format cannot be empty"));
        }
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(eyre!("Invalid date_format: {}", self.date_format));
        }

        self.level()?;
        Ok(())
    }

    pub fn level(&self) -> Result<Level> {
        self.log_level
            .parse::<Level>()
            .map_err(|_| eyre!("Invalid log_level: {}", self.log_level))
    }

    /// Open the configured backend at `store_path`
    pub fn open_blob_store(&self) -> Result<Box<dyn BlobStore>> {
        debug!(backend = %self.backend, path = ?self.store_path, "Opening blob store");

        let store: Box<dyn BlobStore> = match self.backend {
            Backend::Sqlite => Box::new(SqliteBlobStore::open(&self.store_path)?),
            Backend::Json => Box::new(FileBlobStore::open(&self.store_path)?),
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.level().unwrap(), Level::WARN);
    }

    #[test]
    fn test_load_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("unitasks.yml");
        fs::write(&path, "backend: json\ndate_format: \"%Y-%m-%d\"\ncolor: false\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.backend, Backend::Json);
        assert_eq!(config.date_format, "%Y-%m-%d");
        assert!(!config.color);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        assert!(Config::load(Some(temp.path().join("missing.yml").as_path())).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            date_format: "%Q".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            storage_key: "a/b".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            log_level: "loud".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("sqlite".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert_eq!("JSON".parse::<Backend>().unwrap(), Backend::Json);
        assert!("redis".parse::<Backend>().is_err());
    }

    #[test]
    fn test_open_blob_store_json() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            store_path: temp.path().join("store"),
            backend: Backend::Json,
            ..Config::default()
        };

        let mut store = config.open_blob_store().unwrap();
        store.set(&config.storage_key, "[]").unwrap();
        assert!(temp.path().join("store").join("universityTasks.json").exists());
    }
}
