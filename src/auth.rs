use crate::config::{self, Config};
use crate::error::{EztkError, Result};

/// Try to run a CLI command and capture stdout as a token
fn try_cli_token(command: &str) -> Option<String> {
    let output = std::process::Command::new("sh")
        .args(["-c", command])
        .output()
        .ok()?;

    if output.status.success() {
        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !token.is_empty() {
            return Some(token);
        }
    }
    None
}

/// ~/.config/eztk/token
fn token_path() -> Option<std::path::PathBuf> {
    Some(config::config_dir()?.join("token"))
}

fn load_stored_token() -> Option<String> {
    let path = token_path()?;
    let token = std::fs::read_to_string(path).ok()?;
    non_empty(token.trim())
}

fn non_empty(token: &str) -> Option<String> {
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the API token, trying in order:
/// 1. the env var named by `token_env`
/// 2. the output of `token_command`, run on every load
/// 3. a token written by hand to ~/.config/eztk/token
pub fn load_token(config: &Config) -> Result<String> {
    resolve_token(config, load_stored_token)
}

fn resolve_token(config: &Config, stored: impl FnOnce() -> Option<String>) -> Result<String> {
    if let Some(token) = std::env::var(&config.token_env)
        .ok()
        .and_then(|t| non_empty(t.trim()))
    {
        return Ok(token);
    }

    if let Some(cmd) = &config.token_command {
        match try_cli_token(cmd) {
            Some(token) => return Ok(token),
            None => tracing::warn!(command = %cmd, "token command gave no token"),
        }
    }

    if let Some(token) = stored() {
        return Ok(token);
    }

    Err(EztkError::Auth(format!(
        "no token found. Set {} or configure a token_command.",
        config.token_env
    )))
}
