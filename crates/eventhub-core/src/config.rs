//! Configuration resolution for `EventHub`.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/eventhub/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables (`EVENTHUB_*`)
//! 5. CLI arguments (highest priority, applied by the binary)
//!
//! Secrets (QR signing key, JWT key) are deliberately absent from the file
//! formats and are only taken from the command line or environment.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete `EventHub` configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    /// Base URL of the public web app, used for quick-access deep links.
    pub public_base_url: String,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_path: None,
            public_base_url: "http://localhost:3000".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Bearer token validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of access tokens minted by operator tooling (seconds).
    pub access_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: 3600,
        }
    }
}

/// One config file as written on disk. Absent keys leave the lower layer alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    server: ServerLayer,
    auth: AuthLayer,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ServerLayer {
    listen_addr: Option<SocketAddr>,
    database_path: Option<PathBuf>,
    public_base_url: Option<String>,
    log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AuthLayer {
    access_ttl_secs: Option<i64>,
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit_path: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    if let Some(path) = explicit_path {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }
        let explicit = load_config_file(path)?;
        merge_config(&mut config, explicit);
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".eventhub").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/eventhub/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("eventhub").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// Default location of the server database.
pub fn default_database_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".eventhub").join("eventhub.db"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_DATA_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".local").join("share"))
            })
            .map(|p| p.join("eventhub").join("eventhub.db"))
    }
}

fn load_config_file(path: &Path) -> Result<ConfigLayer> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: ConfigLayer) {
    let ServerLayer {
        listen_addr,
        database_path,
        public_base_url,
        log_level,
    } = overlay.server;

    if let Some(addr) = listen_addr {
        base.server.listen_addr = addr;
    }
    if database_path.is_some() {
        base.server.database_path = database_path;
    }
    if let Some(url) = public_base_url {
        base.server.public_base_url = url;
    }
    if let Some(level) = log_level {
        base.server.log_level = level;
    }
    if let Some(ttl) = overlay.auth.access_ttl_secs {
        base.auth.access_ttl_secs = ttl;
    }
}

/// Apply `EVENTHUB_*` overrides using the given variable lookup.
///
/// Unparsable values are ignored and the previous layer's value is kept.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("EVENTHUB_LISTEN_ADDR") {
        if let Ok(addr) = val.parse() {
            config.server.listen_addr = addr;
        }
    }
    if let Some(val) = lookup("EVENTHUB_DATABASE_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("EVENTHUB_PUBLIC_BASE_URL") {
        config.server.public_base_url = val;
    }
    if let Some(val) = lookup("EVENTHUB_LOG_LEVEL") {
        config.server.log_level = val;
    }
    if let Some(val) = lookup("EVENTHUB_ACCESS_TTL_SECS") {
        if let Ok(n) = val.parse() {
            config.auth.access_ttl_secs = n;
        }
    }
}
