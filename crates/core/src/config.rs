use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Overrides the base directory used for default paths.
pub const HOME_ENV: &str = "ITEMSHELF_HOME";

/// Runtime settings for a [`crate::Shelf`], usually read from a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfConfig {
    /// SQLite catalog file.
    pub database_path: PathBuf,
    /// Directory holding `<sha256>.jpg` blobs and `default.jpg`.
    pub image_dir: PathBuf,
    pub pool_size: u32,
    pub busy_timeout_ms: u64,
    /// Budget for a whole ingestion, blob write included. Unbounded when absent.
    pub ingest_timeout_ms: Option<u64>,
    /// Budget for writing the image alone. Unbounded when absent.
    pub blob_write_timeout_ms: Option<u64>,
    /// How many times a retryable conflict re-runs the ingest transaction.
    pub conflict_retries: u32,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self::rooted_at(&default_home())
    }
}

impl ShelfConfig {
    /// Defaults with both stores placed under `root`.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            database_path: root.join("catalog.db"),
            image_dir: root.join("images"),
            pool_size: 8,
            busy_timeout_ms: 5_000,
            ingest_timeout_ms: None,
            blob_write_timeout_ms: None,
            conflict_retries: 1,
        }
    }

    /// Parse a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    /// Load `path` if given and present, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => Self::load(p),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::Config("pool_size must be at least 1".to_string()));
        }
        if self.image_dir.as_os_str().is_empty() {
            return Err(Error::Config("image_dir must not be empty".to_string()));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("database_path must not be empty".to_string()));
        }
        Ok(())
    }
}

/// `$ITEMSHELF_HOME`, or `$HOME/.itemshelf`.
pub fn default_home() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_ENV) {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".itemshelf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rooted_at_places_stores_under_root() {
        let c = ShelfConfig::rooted_at(Path::new("/srv/shelf"));
        assert_eq!(c.database_path, PathBuf::from("/srv/shelf/catalog.db"));
        assert_eq!(c.image_dir, PathBuf::from("/srv/shelf/images"));
        assert_eq!(c.pool_size, 8);
        assert_eq!(c.conflict_retries, 1);
        assert!(c.ingest_timeout_ms.is_none());
    }

    #[test]
    fn test_home_env_overrides_default_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let previous = std::env::var_os(HOME_ENV);
        std::env::set_var(HOME_ENV, tmp.path());

        let c = ShelfConfig::default();
        let home = default_home();

        match previous {
            Some(value) => std::env::set_var(HOME_ENV, value),
            None => std::env::remove_var(HOME_ENV),
        }
        assert_eq!(home, tmp.path());
        assert_eq!(c.database_path, tmp.path().join("catalog.db"));
        assert_eq!(c.image_dir, tmp.path().join("images"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let c = ShelfConfig::from_toml(
            r#"
            image_dir = "/data/images"
            ingest_timeout_ms = 2500
            "#,
        )
        .unwrap();
        assert_eq!(c.image_dir, PathBuf::from("/data/images"));
        assert_eq!(c.ingest_timeout_ms, Some(2500));
        assert_eq!(c.busy_timeout_ms, 5_000);
    }

    #[test]
    fn test_zero_pool_rejected() {
        let err = ShelfConfig::from_toml("pool_size = 0").unwrap_err();
        assert!(err.to_string().contains("pool_size"));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = ShelfConfig::from_toml("pool_size = \"many\"").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_load_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("shelf.toml");
        std::fs::write(&path, "conflict_retries = 3\n").unwrap();
        let c = ShelfConfig::load(&path).unwrap();
        assert_eq!(c.conflict_retries, 3);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let c = ShelfConfig::load_or_default(Some(&tmp.path().join("absent.toml"))).unwrap();
        assert_eq!(c.pool_size, ShelfConfig::default().pool_size);
    }

    #[test]
    fn test_load_unreadable_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ShelfConfig::load(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
