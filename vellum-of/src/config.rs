//! Configuration resolution for vellum-of
//!
//! Multi-source resolution with CLI > environment > TOML file > default
//! priority. Composition rules are explicit at startup: a missing provider
//! key is fatal, an unopenable database puts the store in declared degraded
//! mode, and missing mailer/community keys put the notifier in mock mode.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use vellum_common::{Error, Result};

/// TOML file contents (`~/.config/vellum/vellum-of.toml` by default)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// SQLite database file path
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub provider: ProviderToml,
    #[serde(default)]
    pub mailer: MailerToml,
    #[serde(default)]
    pub community: CommunityToml,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderToml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailerToml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommunityToml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub community: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// SQLite database path; `None` only when resolution found nothing usable
    pub database: Option<PathBuf>,
    pub provider: ProviderConfig,
    pub mailer: MailerConfig,
    pub community: CommunityConfig,
}

/// Content provider (Gemini) settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    /// Override for the API base URL; the client supplies the default
    pub base_url: Option<String>,
    /// Override for the per-request timeout; the client supplies the default
    pub timeout_secs: Option<u64>,
}

/// Mail platform settings; `api_key: None` selects mock mode
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub group: String,
}

/// Community platform settings; `api_key: None` selects mock mode
#[derive(Debug, Clone)]
pub struct CommunityConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub community: String,
}

const DEFAULT_MAILER_BASE_URL: &str = "https://connect.mailerlite.com/api";
const DEFAULT_COMMUNITY_BASE_URL: &str = "https://api.skool.com/v1";
const DEFAULT_COMMUNITY_NAME: &str = "vellum-mastermind";
const DEFAULT_MAILER_GROUP: &str = "vellum-buyers";

/// Load the TOML config file
///
/// An explicitly supplied path must parse; a missing default-location file
/// yields empty defaults.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(TomlConfig::default()),
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read config {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse config {} failed: {}", path.display(), e)))?;
    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Platform config file location: `<config dir>/vellum/vellum-of.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vellum").join("vellum-of.toml"))
}

/// Default database location: `<local data dir>/vellum/orders.db`
pub fn default_database_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("vellum").join("orders.db"))
}

/// Resolve the Gemini API key
///
/// **Priority:** environment > TOML. Generation is the product, so a
/// missing key is a startup error rather than a degraded mode.
pub fn resolve_provider_api_key(toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var("VELLUM_GEMINI_API_KEY").ok();
    let toml_key = toml_config.provider.api_key.as_ref();

    let mut sources = Vec::new();
    if env_key.as_deref().is_some_and(is_valid_key) {
        sources.push("environment");
    }
    if toml_key.map(|k| is_valid_key(k)).unwrap_or(false) {
        sources.push("TOML");
    }
    if sources.len() > 1 {
        warn!(
            "Gemini API key found in multiple sources: {}. Using environment (highest priority).",
            sources.join(", ")
        );
    }

    if let Some(key) = env_key {
        if is_valid_key(&key) {
            info!("Gemini API key loaded from environment variable");
            return Ok(key);
        }
    }
    if let Some(key) = toml_key {
        if is_valid_key(key) {
            info!("Gemini API key loaded from TOML config");
            return Ok(key.clone());
        }
    }

    Err(Error::Config(
        "Gemini API key not configured. Please configure using one of:\n\
         1. Environment: VELLUM_GEMINI_API_KEY=your-key-here\n\
         2. TOML config: ~/.config/vellum/vellum-of.toml ([provider] api_key = \"your-key\")\n\
         \n\
         Obtain an API key at: https://aistudio.google.com/apikey"
            .to_string(),
    ))
}

/// Resolve the database path
///
/// **Priority:** CLI > environment > TOML > platform default.
pub fn resolve_database_path(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var("VELLUM_OF_DATABASE") {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    if let Some(path) = &toml_config.database {
        return Some(path.clone());
    }
    default_database_path()
}

/// Resolve mailer settings; no valid key means mock mode
pub fn resolve_mailer(toml_config: &TomlConfig) -> MailerConfig {
    let api_key = std::env::var("VELLUM_MAILER_API_KEY")
        .ok()
        .filter(|k| is_valid_key(k))
        .or_else(|| {
            toml_config
                .mailer
                .api_key
                .clone()
                .filter(|k| is_valid_key(k))
        });
    if api_key.is_none() {
        warn!("Mailer API key not configured; notifier runs in mock mode");
    }
    MailerConfig {
        api_key,
        base_url: toml_config
            .mailer
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_MAILER_BASE_URL.to_string()),
        group: toml_config
            .mailer
            .group
            .clone()
            .unwrap_or_else(|| DEFAULT_MAILER_GROUP.to_string()),
    }
}

/// Resolve community platform settings; no valid key means mock mode
pub fn resolve_community(toml_config: &TomlConfig) -> CommunityConfig {
    let api_key = std::env::var("VELLUM_COMMUNITY_API_KEY")
        .ok()
        .filter(|k| is_valid_key(k))
        .or_else(|| {
            toml_config
                .community
                .api_key
                .clone()
                .filter(|k| is_valid_key(k))
        });
    if api_key.is_none() {
        warn!("Community API key not configured; access grants run in mock mode");
    }
    CommunityConfig {
        api_key,
        base_url: toml_config
            .community
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_COMMUNITY_BASE_URL.to_string()),
        community: toml_config
            .community
            .community
            .clone()
            .unwrap_or_else(|| DEFAULT_COMMUNITY_NAME.to_string()),
    }
}

/// Resolve the whole service configuration
pub fn resolve(cli_database: Option<&Path>, toml_config: &TomlConfig) -> Result<ServiceConfig> {
    let provider = ProviderConfig {
        api_key: resolve_provider_api_key(toml_config)?,
        base_url: std::env::var("VELLUM_GEMINI_BASE_URL")
            .ok()
            .or_else(|| toml_config.provider.base_url.clone()),
        timeout_secs: toml_config.provider.timeout_secs,
    };
    Ok(ServiceConfig {
        database: resolve_database_path(cli_database, toml_config),
        provider,
        mailer: resolve_mailer(toml_config),
        community: resolve_community(toml_config),
    })
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
