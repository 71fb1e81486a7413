use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::parser::DEFAULT_DESCRIPTION_LEN;
use crate::service::ConversationStore;
use crate::storage::{Storage, StorageError, BACKEND_FILE, BACKEND_MEMORY};

pub const ENV_PREFIX: &str = "CHATHUB";

/// Unprefixed file-backend root read by older deployments. Lowest precedence.
pub const LEGACY_FILE_ROOT_ENV: &str = "FILE_ROOT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("failed to open storage: {0}")]
    Storage(#[from] StorageError),
}

/// Where conversations are stored and how they are written.
///
/// Loaded from an optional TOML file, then overridden by `CHATHUB_*`
/// environment variables (`CHATHUB_BACKEND`, `CHATHUB_FOLDER`,
/// `CHATHUB_FILE_ROOT`, `CHATHUB_DESCRIPTION_MAX_LEN`). A bare `FILE_ROOT`
/// is still honoured when nothing else sets `file_root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `memory` or `file`.
    pub backend: String,
    /// Root folder inside the backend.
    pub folder: String,
    /// Directory for the `file` backend.
    pub file_root: Option<PathBuf>,
    pub description_max_len: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BACKEND_MEMORY.into(),
            folder: "conversations".into(),
            file_root: None,
            description_max_len: DEFAULT_DESCRIPTION_LEN,
        }
    }
}

impl StoreConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, std::env::var(LEGACY_FILE_ROOT_ENV).ok())
    }

    fn load_with(path: Option<&Path>, legacy_file_root: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(root) = legacy_file_root.filter(|root| !root.is_empty()) {
            builder = builder.set_default("file_root", root)?;
        }
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        let config: StoreConfig = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.backend.as_str() {
            BACKEND_MEMORY => {}
            BACKEND_FILE => {
                if self.file_root.as_deref().map_or(true, |root| root.as_os_str().is_empty()) {
                    return Err(ConfigError::Invalid("file_root is required for the file backend".into()));
                }
            }
            other => return Err(ConfigError::Invalid(format!("invalid backend: {other}"))),
        }
        if self.folder.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid("folder must not be empty".into()));
        }
        if self.description_max_len == 0 {
            return Err(ConfigError::Invalid("description_max_len must be positive".into()));
        }
        Ok(())
    }

    /// Key/value options for [`crate::storage::open`].
    pub fn backend_config(&self) -> BTreeMap<String, String> {
        let mut options = BTreeMap::new();
        if self.backend == BACKEND_FILE {
            if let Some(root) = &self.file_root {
                options.insert("root".to_string(), root.display().to_string());
            }
        }
        options
    }

    pub fn open_storage(&self) -> Result<Storage, ConfigError> {
        self.validate()?;
        Ok(Storage::open(&self.backend, &self.backend_config(), self.folder.clone())?)
    }

    pub fn open_store(&self) -> Result<ConversationStore, ConfigError> {
        let store = ConversationStore::new(self.open_storage()?)
            .with_description_max_len(self.description_max_len);
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid() {
        let config = StoreConfig::default();
        assert_eq!(config.backend, "memory");
        assert_eq!(config.folder, "conversations");
        assert_eq!(config.description_max_len, 150);
        config.validate().unwrap();
    }

    #[test]
    fn loads_toml_file() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("data");
        let path = dir.path().join("chathub.toml");
        fs::write(
            &path,
            format!(
                "backend = \"file\"\nfolder = \"chats\"\nfile_root = {:?}\ndescription_max_len = 80\n",
                root.display().to_string()
            ),
        )
        .unwrap();

        let config = StoreConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.backend, "file");
        assert_eq!(config.folder, "chats");
        assert_eq!(config.file_root.as_deref(), Some(root.as_path()));
        assert_eq!(config.description_max_len, 80);
        assert_eq!(config.backend_config().get("root"), Some(&root.display().to_string()));

        let store = config.open_store().unwrap();
        assert_eq!(store.storage().folder(), "chats");
        assert!(root.is_dir());
    }

    #[test]
    fn rejects_bad_settings() {
        let file_without_root = StoreConfig {
            backend: "file".into(),
            ..Default::default()
        };
        assert!(matches!(file_without_root.validate(), Err(ConfigError::Invalid(_))));

        let unknown = StoreConfig {
            backend: "github".into(),
            ..Default::default()
        };
        assert!(matches!(unknown.validate(), Err(ConfigError::Invalid(_))));

        let no_folder = StoreConfig {
            folder: "/".into(),
            ..Default::default()
        };
        assert!(no_folder.validate().is_err());

        let zero_len = StoreConfig {
            description_max_len: 0,
            ..Default::default()
        };
        assert!(zero_len.validate().is_err());
    }

    #[test]
    fn legacy_file_root_fills_in_when_unset() {
        let dir = tempdir().unwrap();
        let legacy = dir.path().join("legacy");

        let config = StoreConfig::load_with(None, Some(legacy.display().to_string())).unwrap();
        assert_eq!(config.file_root.as_deref(), Some(legacy.as_path()));

        let file_backend = StoreConfig {
            backend: "file".into(),
            ..config
        };
        file_backend.validate().unwrap();
    }

    #[test]
    fn config_file_root_wins_over_legacy_variable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chathub.toml");
        fs::write(&path, "backend = \"file\"\nfile_root = \"from-file\"\n").unwrap();

        let config = StoreConfig::load_with(Some(path.as_path()), Some("from-env".into())).unwrap();
        assert_eq!(config.file_root.as_deref(), Some(Path::new("from-file")));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempdir().unwrap();
        let err = StoreConfig::load(Some(dir.path().join("absent.toml").as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
