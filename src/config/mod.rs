//! Application Configuration
//!
//! User settings stored in TOML format. Every field has a default, so a
//! config file only needs the keys it wants to change.

use crate::core::recognizer::{RecognizerKind, SymbolFormat};
use crate::core::scanner::DEFAULT_EXTENSIONS;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application name, used for config and cache directories
pub const APP_NAME: &str = "symbol-sieve";

/// Config files looked up in the working directory, in order
const LOCAL_CONFIG_FILES: &[&str] = &[".symbol-sieve.toml", "symbol-sieve.toml"];

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheSettings,
    pub batch: BatchSettings,
    pub decode: DecodeSettings,
    pub logging: LoggingSettings,
}

/// Result cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
    /// Cache directory; the user cache directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 86_400,
            directory: None,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Configured directory, else `<user cache dir>/symbol-sieve`, else
    /// `.cache` under the working directory
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .map(|dir| dir.join(APP_NAME))
                .unwrap_or_else(|| PathBuf::from(".cache"))
        })
    }
}

/// Batch processing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub recursive: bool,
    pub parallel: bool,
    /// Worker threads; one per CPU when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    pub extensions: Vec<String>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            recursive: false,
            parallel: true,
            workers: None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Decoding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeSettings {
    pub format: SymbolFormat,
    pub recognizer: RecognizerKind,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            format: SymbolFormat::Pdf417,
            recognizer: RecognizerKind::Rxing,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    let write_error = |reason: String| ConfigError::Write {
        path: path.to_path_buf(),
        reason,
    };

    let content = toml::to_string_pretty(config).map_err(|e| write_error(e.to_string()))?;
    std::fs::write(path, content).map_err(|e| write_error(e.to_string()))
}

/// Candidate config files in lookup order
pub fn config_search_paths(working_dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = LOCAL_CONFIG_FILES
        .iter()
        .map(|name| working_dir.join(name))
        .collect();

    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(APP_NAME).join("config.toml"));
    }

    paths
}

/// Load `explicit` if given, otherwise the first config file that exists,
/// otherwise the defaults
pub fn discover_config(explicit: Option<&Path>, working_dir: &Path) -> Result<AppConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_config(path);
    }

    match config_search_paths(working_dir).into_iter().find(|p| p.is_file()) {
        Some(path) => {
            debug!("Using config file {}", path.display());
            load_config(&path)
        }
        None => Ok(AppConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl(), Duration::from_secs(24 * 60 * 60));
        assert!(config.cache.directory.is_none());

        assert!(!config.batch.recursive);
        assert!(config.batch.parallel);
        assert!(config.batch.workers.is_none());
        assert!(config.batch.extensions.contains(&"tif".to_string()));

        assert_eq!(config.decode.format, SymbolFormat::Pdf417);
        assert_eq!(config.decode.recognizer, RecognizerKind::Rxing);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [cache]
            ttl_secs = 60

            [batch]
            workers = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.ttl_secs, 60);
        assert!(config.cache.enabled);
        assert_eq!(config.batch.workers, Some(3));
        assert!(config.batch.parallel);
        assert_eq!(config.decode, DecodeSettings::default());
    }

    #[test]
    fn test_format_names() {
        let config: AppConfig = toml::from_str("[decode]\nformat = \"pdf417\"\n").unwrap();
        assert_eq!(config.decode.format, SymbolFormat::Pdf417);

        let config: AppConfig =
            toml::from_str("[decode]\nformat = \"qr\"\nrecognizer = \"rqrr\"\n").unwrap();
        assert_eq!(config.decode.format, SymbolFormat::QrCode);
        assert_eq!(config.decode.recognizer, RecognizerKind::Rqrr);
    }

    #[test]
    fn test_config_save_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config.cache.directory = Some(PathBuf::from("/var/cache/sieve"));
        config.batch.recursive = true;

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\nttl_secs = \"soon\"\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = discover_config(Some(&temp_dir.path().join("missing.toml")), temp_dir.path());
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_discovery_prefers_dotfile() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(".symbol-sieve.toml"), "[batch]\nworkers = 2\n").unwrap();
        std::fs::write(temp_dir.path().join("symbol-sieve.toml"), "[batch]\nworkers = 7\n").unwrap();

        let config = discover_config(None, temp_dir.path()).unwrap();

        assert_eq!(config.batch.workers, Some(2));
    }

    #[test]
    fn test_search_paths_start_in_working_dir() {
        let paths = config_search_paths(Path::new("/work"));
        assert_eq!(paths[0], PathBuf::from("/work/.symbol-sieve.toml"));
        assert_eq!(paths[1], PathBuf::from("/work/symbol-sieve.toml"));
    }
}
