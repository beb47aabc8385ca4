//! Centralized error types for the logger
//!
//! All logger errors are represented by the `LogError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, LogError>`.
//!
//! Producer-facing calls (`LogEngine::log` and friends) never return these;
//! they surface only from configuration setters, startup and the CLI.

use std::fmt;
use std::path::PathBuf;

/// All logger errors
#[derive(Debug)]
pub enum LogError {
    // === Configuration ===
    /// Level name is not one of the six known levels
    UnknownLevel { name: String },
    /// Maximum sink size must be positive
    InvalidMaxSize { value: u64 },
    /// Mask pattern failed to compile
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
    /// Color name not recognized
    InvalidColor { name: String },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },
    /// Failed to read config file
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    // === IO ===
    /// File system operation failed
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Network ===
    /// Failed to bind WebSocket server
    WebSocketBind { port: u16, source: std::io::Error },
    /// Failed to accept WebSocket connection
    WebSocketAccept {
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },

    // === Runtime ===
    /// Tokio runtime creation failed
    Runtime { source: std::io::Error },
    /// Operation attempted on a closed engine
    EngineClosed,
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConfigRead { source, .. }
            | Self::Io { source, .. }
            | Self::WebSocketBind { source, .. }
            | Self::Runtime { source } => Some(source),
            Self::InvalidPattern { source, .. } => Some(source),
            Self::WebSocketAccept { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownLevel { name } => write!(f, "Unknown log level: {}", name),
            Self::InvalidMaxSize { value } => {
                write!(f, "Invalid max file size: {} (must be > 0)", value)
            }
            Self::InvalidPattern { pattern, source } => {
                write!(f, "Invalid mask pattern '{}': {}", pattern, source)
            }
            Self::InvalidColor { name } => write!(f, "Unknown color: {}", name),
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::ConfigRead { path, .. } => {
                write!(f, "Cannot read config: {}", path.display())
            }
            Self::Io { path, .. } => write!(f, "IO error: {}", path.display()),
            Self::WebSocketBind { port, .. } => write!(f, "Cannot bind WebSocket port {}", port),
            Self::WebSocketAccept { .. } => write!(f, "Failed to accept WebSocket connection"),
            Self::Runtime { .. } => write!(f, "Failed to create runtime"),
            Self::EngineClosed => write!(f, "Log engine is closed"),
        }
    }
}

/// Alias for Result with LogError
pub type Result<T> = std::result::Result<T, LogError>;
