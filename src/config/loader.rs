use super::{Config, ConfigError, CONFIG_FILE_NAME};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Locates and reads `blockflow.toml`
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    explicit: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    skip_env: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read this file instead of searching; it must exist
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Directory searched before the platform config directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Platform config directory, e.g. `~/.config/blockflow` on Linux
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "blockflow", "blockflow").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// The file that would be read, if any
    pub fn locate(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit {
            return Some(path.clone());
        }

        let local = self
            .working_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }

        Self::global_config_dir()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .filter(|path| path.is_file())
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        let mut config = match self.locate() {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration");
                read_file(&path)?
            }
            None => {
                debug!("No configuration file found, using defaults");
                Config::default()
            }
        };

        if !self.skip_env {
            config.merge_env_vars()?;
        }
        Ok(config)
    }
}

fn read_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Config::from_toml(&content, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_working_dir_file_is_preferred() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "log_level = \"warn\"\n").unwrap();

        let loader = ConfigLoader::new().with_working_dir(dir.path()).without_env();
        assert_eq!(loader.locate(), Some(dir.path().join(CONFIG_FILE_NAME)));
        assert_eq!(loader.load().unwrap().log_level, "warn");
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = TempDir::new().unwrap();
        let err = ConfigLoader::new()
            .with_file(dir.path().join("missing.toml"))
            .without_env()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_explicit_file_overrides_search() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[stop_error]\ndefault_log_file = \"out/stop.log\"\n").unwrap();

        let config = ConfigLoader::new().with_file(&path).without_env().load().unwrap();
        assert_eq!(config.stop_error.default_log_file, PathBuf::from("out/stop.log"));
    }
}
