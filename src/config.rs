use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EztkError, Result};

/// One dashboard column: a remote repository and where it lives on disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoConfig {
    pub name: String,
    pub path: String,
}

/// External programs used by the local launcher.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchConfig {
    /// Absent: let the system opener pick the browser.
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default = "default_terminal")]
    pub terminal: String,
    #[serde(default = "default_file_manager")]
    pub file_manager: String,
    #[serde(default = "default_editor")]
    pub editor: String,
    /// Editor command run on startup; `{number}` is replaced by the issue number.
    #[serde(default = "default_editor_command")]
    pub editor_command: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            browser: None,
            terminal: default_terminal(),
            file_manager: default_file_manager(),
            editor: default_editor(),
            editor_command: default_editor_command(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub owner: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_web_url")]
    pub web_url: String,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default)]
    pub token_command: Option<String>,
    #[serde(default)]
    pub launch: LaunchConfig,
    #[serde(default)]
    pub repos: Vec<RepoConfig>,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_web_url() -> String {
    "https://github.com".to_string()
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_terminal() -> String {
    env_or("TERMINAL", "xterm")
}

fn default_file_manager() -> String {
    "ranger".to_string()
}

fn default_editor() -> String {
    env_or("EDITOR", "nvim")
}

fn default_editor_command() -> String {
    "Octo issue edit {number}".to_string()
}

fn env_or(var: &str, fallback: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// ~/.config/eztk (Linux) or ~/Library/Application Support/eztk (macOS)
pub fn config_dir() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("eztk"))
}

fn config_path() -> Option<PathBuf> {
    Some(config_dir()?.join("config.toml"))
}

impl Config {
    /// Load the configuration from `path`, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()
                .ok_or_else(|| EztkError::Config("no configuration directory".to_string()))?,
        };

        let content = std::fs::read_to_string(&path).map_err(|e| {
            EztkError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| EztkError::Config(e.to_string()))?;
        config.validate()?;
        for repo in &mut config.repos {
            repo.path = expand_path(&repo.path);
        }
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.owner.trim().is_empty() {
            return Err(EztkError::Config("`owner` must not be empty".to_string()));
        }
        if self.repos.is_empty() {
            return Err(EztkError::Config(
                "at least one [[repos]] entry is required".to_string(),
            ));
        }
        if self.refresh_interval_secs == 0 {
            return Err(EztkError::Config(
                "`refresh_interval_secs` must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for repo in &self.repos {
            if repo.name.trim().is_empty() {
                return Err(EztkError::Config("repository names must not be empty".to_string()));
            }
            if !seen.insert(repo.name.as_str()) {
                return Err(EztkError::Config(format!(
                    "repository '{}' is listed twice",
                    repo.name
                )));
            }
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn repo(&self, name: &str) -> Option<&RepoConfig> {
        self.repos.iter().find(|r| r.name == name)
    }
}

/// Expand `~` and environment variables; keep the raw string if expansion fails.
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
