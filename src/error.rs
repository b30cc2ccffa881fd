use thiserror::Error;

/// Error types for the cursor layer.
///
/// Errors are `Clone` so the first one observed can be kept on the cursor
/// and handed out again by every later call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CursorError {
    #[error("connection closed, cannot read cursor")]
    Closed,
    #[error("empty result")]
    EmptyResult,
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Server {kind} error: {message}")]
    Server { kind: ServerErrorKind, message: String },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Config error: {0}")]
    Config(String),
}

/// Which class of failure the server reported in an error reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorKind {
    Client,
    Compile,
    Runtime,
}

impl std::fmt::Display for ServerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerErrorKind::Client => write!(f, "client"),
            ServerErrorKind::Compile => write!(f, "compile"),
            ServerErrorKind::Runtime => write!(f, "runtime"),
        }
    }
}

impl CursorError {
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        CursorError::Decode(msg.into())
    }
}

impl From<serde_json::Error> for CursorError {
    fn from(e: serde_json::Error) -> Self {
        CursorError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CursorError>;
