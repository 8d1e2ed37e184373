use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::DEFAULT_LATENCY;
use crate::view::SortOrder;

/// Name of the per-project data directory.
pub const DESK_DIR: &str = ".quickdesk";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub comments: CommentConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Simulated delay applied to login and register.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            sort: default_sort(),
            limit: default_limit(),
        }
    }
}

impl ListConfig {
    /// Parsed default sort order for `qd list`.
    pub fn sort_order(&self) -> Result<SortOrder> {
        self.sort
            .parse()
            .with_context(|| format!("Invalid [list] sort = \"{}\"", self.sort))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

impl ProjectConfig {
    /// Auth latency, with `QUICKDESK_AUTH_LATENCY_MS` taking precedence over
    /// the `[auth]` table.
    #[must_use]
    pub fn auth_latency(&self) -> Duration {
        auth_latency(self, env::var("QUICKDESK_AUTH_LATENCY_MS").ok())
    }
}

fn auth_latency(project: &ProjectConfig, env_override: Option<String>) -> Duration {
    let ms = env_override
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(project.auth.latency_ms);
    Duration::from_millis(ms)
}

#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(DESK_DIR).join("config.toml")
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("quickdesk/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Canonical output mode name for `raw`, accepting the `human`/`table`
/// spellings.
#[must_use]
pub fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" | "plain" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

/// Commented starter file written by `qd init`.
#[must_use]
pub fn default_project_config_toml() -> String {
    format!(
        "# quickdesk project settings\n\n\
         [auth]\n\
         # simulated login/register round-trip\n\
         latency_ms = {}\n\n\
         [list]\n\
         sort = \"{}\"\n\
         limit = {}\n\n\
         [comments]\n\
         max_chars = {}\n",
        default_latency_ms(),
        default_sort(),
        default_limit(),
        default_max_chars(),
    )
}

fn default_latency_ms() -> u64 {
    u64::try_from(DEFAULT_LATENCY.as_millis()).unwrap_or(500)
}

fn default_sort() -> String {
    SortOrder::default().to_string()
}

const fn default_limit() -> usize {
    50
}

const fn default_max_chars() -> usize {
    8192
}
