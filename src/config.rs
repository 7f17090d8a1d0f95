//! Configuration file support for SpyLab.
//!
//! Settings are stored as versioned JSON: in the user's config directory on
//! native, in `localStorage` in the browser.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_DISTANCE_DECIMALS, DEFAULT_MAX_DISPLAY_HEIGHT, DEFAULT_PAGE_SIZE,
};
use crate::model::SimilarityFilters;

/// Verbosity of the `log` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter for `env_logger`.
    pub fn to_level_filter(self) -> log::LevelFilter {
        self.to_level().to_level_filter()
    }

    /// Level for `console_log`.
    pub fn to_level(self) -> log::Level {
        match self {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Format version written into every config; newer files are rejected.
pub const CONFIG_VERSION: u32 = 1;

/// File name of the native config, inside `<config dir>/spylab/`.
pub const CONFIG_FILENAME: &str = "spylab-config.json";

/// Settings shared by the native and browser hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub preferences: UserPreferences,
}

/// Where the backend lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl ApiConfig {
    /// Absolute URL of an endpoint path such as `/analyze`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// How results are filtered and shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub log_level: LogLevel,
    /// Only list faces of good quality
    pub high_quality_only: bool,
    /// Maximum height of the analyzed image on screen
    pub max_display_height: u32,
    /// Decimals shown for similarity distances
    pub distance_decimals: u32,
    /// Result rows per page
    pub page_size: usize,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            high_quality_only: false,
            max_display_height: DEFAULT_MAX_DISPLAY_HEIGHT,
            distance_decimals: DEFAULT_DISTANCE_DECIMALS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl UserPreferences {
    /// Similarity filters implied by these preferences.
    pub fn filters(&self) -> SimilarityFilters {
        SimilarityFilters::high_quality(self.high_quality_only)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: ApiConfig::default(),
            preferences: UserPreferences::default(),
        }
    }
}

impl AppConfig {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a config, refusing versions this build does not understand.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }
        Ok(config)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AppConfig {
    /// `<config dir>/spylab/spylab-config.json`, falling back to `~/.config`.
    pub fn default_path() -> Option<std::path::PathBuf> {
        let base = dirs::config_dir().or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;
        Some(base.join("spylab").join(CONFIG_FILENAME))
    }

    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let config = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// The config at [`default_path`](Self::default_path), if there is a
    /// readable one.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path().filter(|path| path.exists())?;
        Self::load(&path)
            .map_err(|e| log::warn!("Ignoring {}: {}", path.display(), e))
            .ok()
    }
}

#[cfg(target_arch = "wasm32")]
impl AppConfig {
    const STORAGE_KEY: &'static str = "spylab-config";

    fn storage() -> Result<web_sys::Storage, ConfigError> {
        web_sys::window()
            .ok_or_else(|| ConfigError::Storage("no window".to_string()))?
            .local_storage()
            .map_err(|e| ConfigError::Storage(format!("{:?}", e)))?
            .ok_or_else(|| ConfigError::Storage("localStorage unavailable".to_string()))
    }

    /// The config saved in `localStorage`, if any.
    pub fn load_from_local_storage() -> Option<Self> {
        let json = match Self::storage().and_then(|storage| {
            storage
                .get_item(Self::STORAGE_KEY)
                .map_err(|e| ConfigError::Storage(format!("{:?}", e)))
        }) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("{}", e);
                return None;
            }
        };
        Self::from_json(&json)
            .map_err(|e| log::warn!("Ignoring stored configuration: {}", e))
            .ok()
    }

    pub fn save_to_local_storage(&self) -> Result<(), ConfigError> {
        let json = self.to_json()?;
        Self::storage()?
            .set_item(Self::STORAGE_KEY, &json)
            .map_err(|e| ConfigError::Storage(format!("{:?}", e)))?;
        log::debug!("Saved configuration to localStorage");
        Ok(())
    }
}

/// Why a configuration could not be loaded or stored.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(
        "Configuration version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `localStorage` was unavailable or refused the write
    #[error("Storage error: {0}")]
    Storage(String),
}
