//! Configuration management
//!
//! Config is read from `loglens.toml` in the working directory unless a path
//! is given. Every field has a default, so a missing file or section is fine.

use crate::constants::{
    DEFAULT_LOG_DIR, DEFAULT_MAX_FILE_SIZE, DEFAULT_WEBSOCKET_PORT, SUBSCRIBER_CAPACITY,
};
use crate::error::{LogError, Result};
use crate::logging::format::parse_color;
use crate::logging::{EngineConfig, Level, MaskRule, OutputMode, Presentation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub engine: EngineSection,
    pub presentation: PresentationSection,
    pub server: ServerSection,
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Directory holding `<level>.log`, `combined.log` and `logs.json`
    pub log_dir: PathBuf,

    /// Threshold level name (error, warn, info, verbose, debug, silly)
    pub level: String,

    /// What the level and combined files receive: "text" or "json"
    pub format: OutputMode,

    /// Rotate a file once it reaches this many bytes
    pub max_file_size: u64,

    /// Subsystem tag added to every record (empty = untagged)
    pub module_tag: String,

    /// Regex patterns masked as `[MASKED]`, applied in order
    pub mask_patterns: Vec<String>,

    /// Prefix each level label with a glyph
    pub use_emoji: bool,

    /// Also print every line to stdout
    pub console: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            level: Level::Info.as_str().to_string(),
            format: OutputMode::Text,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            module_tag: String::new(),
            mask_patterns: Vec::new(),
            use_emoji: false,
            console: false,
        }
    }
}

// =============================================================================
// Presentation
// =============================================================================

/// Per-level overrides, keyed by level name. Missing levels keep defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PresentationSection {
    /// e.g. `error = "[E]"`
    pub prefixes: BTreeMap<String, String>,
    /// e.g. `debug = "dark_grey"`
    pub colors: BTreeMap<String, String>,
}

// =============================================================================
// Live server
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// WebSocket port for live viewers
    pub port: u16,

    /// Payloads a viewer may fall behind before it is disconnected
    pub subscriber_capacity: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_WEBSOCKET_PORT,
            subscriber_capacity: SUBSCRIBER_CAPACITY,
        }
    }
}

impl Config {
    /// Validate and convert into the engine's runtime configuration
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let level = self.engine.level.parse::<Level>()?;

        if self.engine.max_file_size == 0 {
            return Err(LogError::InvalidMaxSize { value: 0 });
        }
        if self.server.subscriber_capacity == 0 {
            return Err(LogError::ConfigValidation {
                field: "server.subscriber_capacity",
                reason: "must be > 0".into(),
            });
        }

        let mask_rules = self
            .engine
            .mask_patterns
            .iter()
            .map(|p| MaskRule::new(p))
            .collect::<Result<Vec<_>>>()?;

        let mut presentation = Presentation::default();
        presentation.use_emoji = self.engine.use_emoji;
        for (name, prefix) in &self.presentation.prefixes {
            presentation.set_prefix(name.parse::<Level>()?, prefix.clone());
        }
        for (name, color) in &self.presentation.colors {
            presentation.set_color(name.parse::<Level>()?, parse_color(color)?);
        }

        Ok(EngineConfig {
            level,
            mask_rules,
            presentation,
            module_tag: self.engine.module_tag.clone(),
            max_file_size: self.engine.max_file_size,
            output_mode: self.engine.format,
            console: self.engine.console,
            subscriber_capacity: self.server.subscriber_capacity,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.engine_config().map(|_| ())
    }
}

/// Load config from `path`, falling back to defaults when missing or invalid
pub fn load(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }

    match read(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}, using defaults", e);
            Config::default()
        }
    }
}

/// Load config from `path`, reporting read and parse errors
pub fn read(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| LogError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| LogError::ConfigValidation {
        field: "config",
        reason: format!("{}: {}", path.display(), e),
    })
}

/// Save config to `path`
pub fn save(path: &Path, config: &Config) -> Result<()> {
    let content = toml::to_string_pretty(config).map_err(|e| LogError::ConfigValidation {
        field: "config",
        reason: e.to_string(),
    })?;
    fs::write(path, content).map_err(|e| LogError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write the default config to `path`; an existing file is kept unless `force`
pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(LogError::ConfigValidation {
            field: "config",
            reason: format!("{} already exists (use --force)", path.display()),
        });
    }
    save(path, &Config::default())?;
    info!("Wrote default config to {}", path.display());
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
