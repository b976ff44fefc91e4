use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{EztkError, Result};

/// ~/.cache/eztk/eztk.log on Linux
pub fn default_log_path() -> Option<PathBuf> {
    Some(dirs::cache_dir()?.join("eztk").join("eztk.log"))
}

/// Send tracing output to `path` (or the default log file). The terminal
/// belongs to the dashboard, so nothing is written to stdout or stderr.
pub fn init(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p,
        None => default_log_path()
            .ok_or_else(|| EztkError::Config("no cache directory for the log file".to_string()))?,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let file_layer = fmt::layer()
        .with_writer(Arc::new(file))
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(file_layer)
        .try_init()
        .map_err(|e| EztkError::Config(format!("logging: {}", e)))?;

    Ok(path)
}
