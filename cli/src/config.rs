//! Configuration file loading.
//!
//! Precedence, lowest first: built-in defaults, `config.toml`,
//! `BOOKSHELF_BASE_URL`, then `--base-url`.

use std::fs;
use std::path::{Path, PathBuf};

use bookshelf_core::{ClientConfig, ConfigError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// `<config dir>/bookshelf/config.toml`, when the platform has a config dir.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bookshelf").join("config.toml"))
}

/// Resolve the effective configuration.
///
/// An explicit `path` must exist; the default location is optional.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or the result is
/// not a usable configuration.
pub fn load<F>(path: Option<&Path>, base_url: Option<&str>, env: F) -> Result<ClientConfig, LoadError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match path {
        Some(path) => load_from_file(path)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => load_from_file(&path)?,
            None => ClientConfig::default(),
        },
    };

    let mut config = config.with_env(env);
    if let Some(url) = base_url {
        config.base_url = url.to_string();
    }
    config.validate()?;
    tracing::debug!(base_url = %config.base_url, stale_after_secs = config.stale_after_secs, "configuration loaded");
    Ok(config)
}

fn load_from_file(path: &Path) -> Result<ClientConfig, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "base_url = \"http://books.test\"\n").unwrap();

        let config = load(Some(&path), None, no_env).unwrap();
        assert_eq!(config.base_url, "http://books.test");
        assert_eq!(config.stale_after_secs, 10);
    }

    #[test]
    fn env_then_flag_take_precedence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "base_url = \"http://file.test\"\nstale_after_secs = 30\n").unwrap();
        let env = |key: &str| (key == "BOOKSHELF_BASE_URL").then(|| "http://env.test".to_string());

        let config = load(Some(&path), None, env).unwrap();
        assert_eq!(config.base_url, "http://env.test");
        assert_eq!(config.stale_after_secs, 30);

        let config = load(Some(&path), Some("http://flag.test"), env).unwrap();
        assert_eq!(config.base_url, "http://flag.test");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load(Some(&dir.path().join("absent.toml")), None, no_env).unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "stale_after_secs = \"soon\"").unwrap();
        assert!(matches!(load(Some(&path), None, no_env), Err(LoadError::Parse { .. })));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "").unwrap();
        let err = load(Some(&path), Some("localhost:5513"), no_env).unwrap_err();
        assert!(matches!(err, LoadError::Invalid(_)));
    }
}
