//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.kgchat/config.json`) and
//! environment. Missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Backend endpoint settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Chat defaults.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Backend base URL (one endpoint serves chat, sessions, and health).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Base URL of the chatbot API (default "http://localhost:8000").
    /// Overridden by KGCHAT_API_URL env when set.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Chat defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    /// Whether general LLM responses are enabled by default ("AI-enhanced").
    /// When false, the backend answers from the knowledge base only.
    #[serde(default = "default_enable_llm")]
    pub enable_llm: bool,
}

fn default_enable_llm() -> bool {
    true
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enable_llm: default_enable_llm(),
        }
    }
}

/// Resolve the backend base URL: env KGCHAT_API_URL overrides config.
/// Trailing slashes are trimmed.
pub fn resolve_base_url(config: &Config) -> String {
    std::env::var("KGCHAT_API_URL")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.backend.base_url.trim().to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("KGCHAT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".kgchat").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or KGCHAT_CONFIG_PATH). Missing file =>
/// default config. Returns the config and the path that was used (for
/// resolving sibling files like the persisted session id).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Path of the persisted current-session id: `session_id` next to the config file.
pub fn session_id_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join("session_id")
}
