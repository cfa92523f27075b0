//! # Configuration Module
//!
//! Runtime settings for `blue`, resolved once in `main` before any command
//! runs.
//!
//! ## Sources
//!
//! Later sources win:
//!
//! 1. Built-in defaults ([`DEFAULT_HOST`], [`DEFAULT_PORT`], ...)
//! 2. Environment (`BLUE_HOST`, `BLUE_PORT`, `BLUE_CACHE_DIR`) and the
//!    matching global command-line options, both handled by clap
//! 3. For the recommendation provider: `OPENAI_API_KEY`, then the keys file
//!
//! ## Data Storage
//!
//! - Cache: `dirs::cache_dir()/blue/` (one JSON file per cached query)
//! - History: `dirs::data_dir()/blue/history.db`
//! - Keys: `dirs::config_dir()/blue_cli/keys.json`
//!
//! The keys file is optional:
//!
//! ```json
//! {
//!   "api_key": "sk-...",
//!   "model": "gpt-5-2025-08-07",
//!   "base_url": "https://openrouter.ai/api/v1",
//!   "exclude": ["Rap", "Hip-Hop"]
//! }
//! ```

use crate::recommend::{DEFAULT_BASE_URL, DEFAULT_EXCLUDE, DEFAULT_MODEL};
use crate::volume::RampConfig;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Player address used when neither `--host` nor `BLUE_HOST` is given.
pub const DEFAULT_HOST: &str = "192.168.88.15";

/// The player's HTTP API port.
pub const DEFAULT_PORT: u16 = 11000;

/// Browse entry holding the local library.
pub const MEDIA_LOCATION: &str = "Library";

/// Streaming service used by `online` and `ai`.
pub const ONLINE_SERVICE: &str = "Tidal";

/// Timeout for requests to the player.
pub const DEVICE_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for requests to the recommendation provider.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(120);

fn platform_dir(base: Option<PathBuf>, kind: &str) -> Result<PathBuf> {
    base.ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system {kind} directory. Please ensure your platform supports standard directories."
        )
    })
}

/// Returns the platform-appropriate cache directory.
///
/// - **Linux**: `~/.cache/blue`
/// - **macOS**: `~/Library/Caches/blue`
/// - **Windows**: `%LOCALAPPDATA%\blue`
///
/// The directory itself is created by
/// [`ResultCache::open`](crate::cache::ResultCache::open).
///
/// # Errors
///
/// Fails if the system cache directory cannot be determined.
pub fn get_cache_dir() -> Result<PathBuf> {
    Ok(platform_dir(dirs::cache_dir(), "cache")?.join("blue"))
}

/// Returns the path of the random-album history database.
///
/// # Errors
///
/// Fails if the system data directory cannot be determined.
pub fn get_history_path() -> Result<PathBuf> {
    Ok(platform_dir(dirs::data_dir(), "data")?.join("blue").join("history.db"))
}

/// Returns the path of the provider keys file.
///
/// # Errors
///
/// Fails if the system config directory cannot be determined.
pub fn get_keys_path() -> Result<PathBuf> {
    Ok(platform_dir(dirs::config_dir(), "config")?
        .join("blue_cli")
        .join("keys.json"))
}

/// Contents of the optional keys file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysFile {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
}

impl KeysFile {
    #[must_use]
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Genres to keep out of recommendations.
    #[must_use]
    pub fn exclude(&self) -> Vec<String> {
        match &self.exclude {
            Some(exclude) => exclude.clone(),
            None => DEFAULT_EXCLUDE.iter().map(|genre| (*genre).to_string()).collect(),
        }
    }
}

/// Read the keys file. A missing file gives the defaults; an unreadable or
/// invalid one is reported and also gives the defaults.
#[must_use]
pub fn load_keys(path: &Path) -> KeysFile {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("No keys file at {}: {e}", path.display());
            return KeysFile::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(keys) => keys,
        Err(e) => {
            warn!("Ignoring invalid keys file {}: {e}", path.display());
            KeysFile::default()
        }
    }
}

/// The environment key wins over the keys file. Blank values count as unset.
#[must_use]
pub fn resolve_api_key(env: Option<String>, keys: &KeysFile) -> Option<String> {
    env.filter(|key| !key.trim().is_empty())
        .or_else(|| keys.api_key.clone())
        .filter(|key| !key.trim().is_empty())
}

/// Everything a command run needs to know about its environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub cache_dir: PathBuf,
    pub history_path: PathBuf,
    pub media_location: String,
    pub online_service: String,
    pub device_timeout: Duration,
    pub provider_timeout: Duration,
    pub ramp: RampConfig,
    pub keys: KeysFile,
    pub api_key: Option<String>,
}

impl Config {
    /// Build the configuration from the resolved global options, the
    /// platform directories, the keys file and `OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Fails if a platform directory cannot be determined.
    pub fn load(host: &str, port: u16, cache_dir: Option<PathBuf>) -> Result<Self> {
        let cache_dir = match cache_dir {
            Some(dir) => dir,
            None => get_cache_dir().context("Failed to locate the cache directory")?,
        };
        let keys = load_keys(&get_keys_path()?);
        let api_key = resolve_api_key(std::env::var("OPENAI_API_KEY").ok(), &keys);

        Ok(Self {
            history_path: get_history_path()?,
            api_key,
            keys,
            ..Self::with_cache_dir(host, port, cache_dir)
        })
    }

    /// Configuration with defaults everywhere except the given address and
    /// cache directory. No keys, no environment lookups.
    #[must_use]
    pub fn with_cache_dir(host: &str, port: u16, cache_dir: PathBuf) -> Self {
        Self {
            host: host.to_string(),
            port,
            history_path: cache_dir.join("history.db"),
            cache_dir,
            media_location: MEDIA_LOCATION.to_string(),
            online_service: ONLINE_SERVICE.to_string(),
            device_timeout: DEVICE_TIMEOUT,
            provider_timeout: PROVIDER_TIMEOUT,
            ramp: RampConfig::default(),
            keys: KeysFile::default(),
            api_key: None,
        }
    }
}
