//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Files
// =============================================================================

/// Default directory for log files
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default config file name (looked up in the working directory)
pub const DEFAULT_CONFIG_FILE: &str = "loglens.toml";

/// Default maximum sink size before rotation (5 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Sink receiving every record regardless of level
pub const COMBINED_SINK: &str = "combined";

/// Sink receiving records reported through `LogEngine::exception`
pub const EXCEPTIONS_SINK: &str = "exceptions";

/// Sink receiving the structured form of every record
pub const STRUCTURED_SINK: &str = "logs";

/// Extension of the structured sink file (`logs.json`)
pub const STRUCTURED_EXT: &str = "json";

/// Extension of text sink files
pub const TEXT_EXT: &str = "log";

// =============================================================================
// Masking
// =============================================================================

/// Replacement text for masked substrings
pub const MASK_MARKER: &str = "[MASKED]";

// =============================================================================
// Network
// =============================================================================

/// Default WebSocket port for live log viewers
pub const DEFAULT_WEBSOCKET_PORT: u16 = 3000;

// =============================================================================
// Buffers
// =============================================================================

/// Per-subscriber queue capacity; a subscriber that falls this far behind is dropped
pub const SUBSCRIBER_CAPACITY: usize = 256;
