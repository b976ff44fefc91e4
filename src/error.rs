use thiserror::Error;

#[derive(Error, Debug)]
pub enum EztkError {
    /// The remote could not be reached at all (connect, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered, but refused the request.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EztkError {
    /// Short label used in diagnostics to tell failure kinds apart.
    pub fn kind(&self) -> &'static str {
        match self {
            EztkError::Transport(_) => "transport",
            EztkError::Api { .. } => "api",
            EztkError::Decode(_) => "decode",
            EztkError::Auth(_) => "auth",
            EztkError::Config(_) => "config",
            EztkError::Clipboard(_) => "clipboard",
            EztkError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, EztkError>;
