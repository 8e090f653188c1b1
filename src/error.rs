//! Error types for olcli
//!
//! All modules use `OlResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for olcli operations
pub type OlResult<T> = Result<T, OlError>;

/// All errors that can occur in olcli
#[derive(Error, Debug)]
pub enum OlError {
    // Session errors
    #[error("Login failed: {0}")]
    Auth(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    // Service errors
    #[error("Real-time protocol error: {0}")]
    Protocol(String),

    #[error("Compile failed: {0}")]
    Compile(String),

    #[error("Compile failed: service refused the session (status {status} from {url})")]
    CompileUnauthorized { status: u16, url: String },

    #[error("Unknown artifact '{kind}'. Available: {available}")]
    UnknownArtifact { kind: String, available: String },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("Unexpected response from {url}: {reason}")]
    UnexpectedResponse { url: String, reason: String },

    // Local state errors
    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("{0}")]
    User(String),
}

impl OlError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a storage error for a state file
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a transport error for a URL
    pub fn http(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Http {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an unexpected-response error for a URL
    pub fn unexpected(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether the stored session should be replaced by a fresh login
    pub fn needs_login(&self) -> bool {
        matches!(self, Self::SessionExpired(_) | Self::CompileUnauthorized { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Auth(_) => Some("Check your email and password, then run: olcli login"),
            Self::SessionExpired(_) | Self::CompileUnauthorized { .. } => Some("Run: olcli login"),
            Self::Compile(_) => Some("Check the compile log in the editor, or retry with --force"),
            Self::UnknownArtifact { .. } => {
                Some("Run: olcli compile <project> to refresh the available outputs")
            }
            Self::Storage { .. } => Some("Check permissions of the olcli state directory"),
            _ => None,
        }
    }
}
