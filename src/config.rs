//! Configuration file parser for ~/.config/wallpapers/config.toml.
//!
//! The config file is optional. A missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning when the file
//! contains potential typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides `pixabay_api_key`.
pub const API_KEY_ENV: &str = "PIXABAY_API_KEY";

const DEFAULT_CATEGORY_PAGE_SIZE: u32 = 10;
const DEFAULT_IMAGE_PAGE_SIZE: u32 = 20;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Where catalog data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Remote,
    Fixture,
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// `Debug` masks `pixabay_api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceKind,

    /// Pixabay API key (alternative to PIXABAY_API_KEY env var).
    /// Env var takes precedence over config file.
    pub pixabay_api_key: Option<String>,

    /// Override for the search endpoint. Must be HTTPS unless it points at localhost.
    pub api_base_url: Option<String>,

    pub category_page_size: u32,
    pub image_page_size: u32,

    /// Defaults to `~/Downloads`.
    pub download_dir: Option<PathBuf>,

    /// Defaults to `~/.local/share/wallpapers`.
    pub wallpaper_dir: Option<PathBuf>,

    /// Command run after each wallpaper file is written, e.g.
    /// `["swww", "img", "{path}"]`.
    pub wallpaper_command: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceKind::Remote,
            pixabay_api_key: None,
            api_base_url: None,
            category_page_size: DEFAULT_CATEGORY_PAGE_SIZE,
            image_page_size: DEFAULT_IMAGE_PAGE_SIZE,
            download_dir: None,
            wallpaper_dir: None,
            wallpaper_command: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("source", &self.source)
            .field(
                "pixabay_api_key",
                &self.pixabay_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base_url", &self.api_base_url)
            .field("category_page_size", &self.category_page_size)
            .field("image_page_size", &self.image_page_size)
            .field("download_dir", &self.download_dir)
            .field("wallpaper_dir", &self.wallpaper_dir)
            .field("wallpaper_command", &self.wallpaper_command)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "source",
        "pixabay_api_key",
        "api_base_url",
        "category_page_size",
        "image_page_size",
        "download_dir",
        "wallpaper_dir",
        "wallpaper_command",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Zero page size → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        if config.category_page_size == 0 || config.image_page_size == 0 {
            return Err(ConfigError::Invalid(
                "page sizes must be at least 1".to_string(),
            ));
        }
        tracing::info!(
            path = %path.display(),
            source = ?config.source,
            category_page_size = config.category_page_size,
            image_page_size = config.image_page_size,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// The API key to use: `env_value` (normally `PIXABAY_API_KEY`) if set and
    /// non-blank, otherwise the config file's key.
    pub fn api_key(&self, env_value: Option<String>) -> Option<String> {
        env_value
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.pixabay_api_key.clone())
    }

    pub fn download_dir(&self, home: &Path) -> PathBuf {
        match &self.download_dir {
            Some(dir) => expand_home(dir, home),
            None => home.join("Downloads"),
        }
    }

    pub fn wallpaper_dir(&self, home: &Path) -> PathBuf {
        match &self.wallpaper_dir {
            Some(dir) => expand_home(dir, home),
            None => home.join(".local").join("share").join("wallpapers"),
        }
    }
}

/// Expands a leading `~` to `home`.
fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

// ============================================================================
// Tests
// ============================================================================
