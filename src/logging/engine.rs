//! Log engine
//!
//! Owns the configuration, the sinks and the broadcast hub, and runs every
//! accepted log call through gate → mask → render → sinks → subscribers.
//!
//! The engine is an ordinary value: share it with `Arc<LogEngine>` wherever
//! something needs to log.

use super::format::{colorize, parse_color, render, OutputMode, Presentation};
use super::hub::{BroadcastHub, SubscriberId, Subscription};
use super::mask::{mask, MaskRule};
use super::sink::SinkSet;
use super::{should_log, Level, LogRecord};
use crate::constants::{
    COMBINED_SINK, DEFAULT_MAX_FILE_SIZE, EXCEPTIONS_SINK, STRUCTURED_SINK,
    SUBSCRIBER_CAPACITY,
};
use crate::error::{LogError, Result};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{debug, info, warn};

/// Lifecycle of an engine. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Initializing,
    Active,
    Closing,
    Closed,
}

impl EngineState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => EngineState::Initializing,
            1 => EngineState::Active,
            2 => EngineState::Closing,
            _ => EngineState::Closed,
        }
    }
}

/// Runtime-mutable engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub level: Level,
    pub mask_rules: Vec<MaskRule>,
    pub presentation: Presentation,
    pub module_tag: String,
    pub max_file_size: u64,
    pub output_mode: OutputMode,
    /// Echo rendered lines to stdout, colorized
    pub console: bool,
    /// Backlog per live subscriber before it is dropped
    pub subscriber_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            mask_rules: Vec::new(),
            presentation: Presentation::default(),
            module_tag: String::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            output_mode: OutputMode::Text,
            console: false,
            subscriber_capacity: SUBSCRIBER_CAPACITY,
        }
    }
}

/// Leveled, masked, rotating logger with live fan-out
pub struct LogEngine {
    config: RwLock<EngineConfig>,
    sinks: SinkSet,
    hub: BroadcastHub,
    state: AtomicU8,
    last_timestamp: Mutex<DateTime<Utc>>,
}

impl LogEngine {
    /// Open (or create) every known sink under `dir` and start accepting logs
    pub fn open(dir: impl Into<PathBuf>, config: EngineConfig) -> Result<Self> {
        if config.max_file_size == 0 {
            return Err(LogError::InvalidMaxSize { value: 0 });
        }

        let sinks = SinkSet::new(dir, config.max_file_size)?;
        let hub = BroadcastHub::new(config.subscriber_capacity);

        let engine = Self {
            config: RwLock::new(config),
            sinks,
            hub,
            state: AtomicU8::new(EngineState::Initializing as u8),
            last_timestamp: Mutex::new(DateTime::<Utc>::MIN_UTC),
        };

        for level in Level::ALL {
            engine.sinks.open(level.as_str())?;
        }
        engine.sinks.open(COMBINED_SINK)?;
        engine.sinks.open(EXCEPTIONS_SINK)?;
        engine.sinks.open(STRUCTURED_SINK)?;

        engine.set_state(EngineState::Active);
        info!("Log engine active in {}", engine.sinks.dir().display());
        Ok(engine)
    }

    // === Logging ===

    /// Log one message. Never fails; a no-op when gated out or closed.
    pub fn log(&self, level: Level, message: &str) {
        self.dispatch(level, message, false);
    }

    /// Log at `error` and also append the line to `exceptions.log`
    pub fn exception(&self, message: &str) {
        self.dispatch(Level::Error, message, true);
    }

    fn dispatch(&self, level: Level, message: &str, exception: bool) {
        if self.state() != EngineState::Active {
            return;
        }

        let (rendered, output_mode, console) = {
            let cfg = self.config.read();
            if !should_log(level, cfg.level) {
                return;
            }

            let masked = mask(message, &cfg.mask_rules);
            let record = LogRecord::new(
                self.next_timestamp(),
                level,
                cfg.module_tag.as_str(),
                masked.into_owned(),
            );
            let rendered = render(&record, &cfg.presentation);
            let console = cfg
                .console
                .then(|| cfg.presentation.color(level));
            (rendered, cfg.output_mode, console)
        };

        let line = rendered.for_sinks(output_mode);

        if let Some(color) = console {
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "{}", colorize(line, color));
        }

        self.sinks.append(level.as_str(), line);
        self.sinks.append(COMBINED_SINK, line);
        if exception {
            self.sinks.append(EXCEPTIONS_SINK, line);
        }
        self.sinks.append(STRUCTURED_SINK, &rendered.structured);
        self.hub.publish(&rendered.structured);
    }

    /// Log with a level given by name; unknown names are ignored
    pub fn log_named(&self, level: &str, message: &str) {
        match level.parse::<Level>() {
            Ok(level) => self.log(level, message),
            Err(e) => warn!("Ignoring log call: {}", e),
        }
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    pub fn verbose(&self, message: &str) {
        self.log(Level::Verbose, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn silly(&self, message: &str) {
        self.log(Level::Silly, message);
    }

    // === Configuration ===

    /// Change the threshold by name; unknown names leave it unchanged
    pub fn set_level(&self, name: &str) -> Result<()> {
        let level = name.parse::<Level>()?;
        self.set_level_to(level);
        Ok(())
    }

    pub fn set_level_to(&self, level: Level) {
        self.config.write().level = level;
        debug!("Log level changed to {}", level);
    }

    /// Append a mask rule compiled from `pattern`
    pub fn add_mask_pattern(&self, pattern: &str) -> Result<()> {
        let rule = MaskRule::new(pattern)?;
        self.add_mask_rule(rule);
        Ok(())
    }

    pub fn add_mask_rule(&self, rule: MaskRule) {
        self.config.write().mask_rules.push(rule);
    }

    pub fn set_module_tag(&self, tag: impl Into<String>) {
        self.config.write().module_tag = tag.into();
    }

    /// Rotation threshold in bytes; zero is rejected
    pub fn set_max_file_size(&self, bytes: u64) -> Result<()> {
        if bytes == 0 {
            return Err(LogError::InvalidMaxSize { value: bytes });
        }
        let mut cfg = self.config.write();
        cfg.max_file_size = bytes;
        self.sinks.set_max_bytes(bytes);
        Ok(())
    }

    pub fn set_output_mode(&self, mode: OutputMode) {
        self.config.write().output_mode = mode;
    }

    pub fn set_prefix(&self, level: Level, prefix: impl Into<String>) {
        self.config.write().presentation.set_prefix(level, prefix);
    }

    /// Console color by name (e.g. `red`, `dark_yellow`)
    pub fn set_color(&self, level: Level, color: &str) -> Result<()> {
        let color = parse_color(color)?;
        self.config.write().presentation.set_color(level, color);
        Ok(())
    }

    pub fn set_use_emoji(&self, use_emoji: bool) {
        self.config.write().presentation.use_emoji = use_emoji;
    }

    pub fn set_console(&self, console: bool) {
        self.config.write().console = console;
    }

    // === Accessors ===

    pub fn level(&self) -> Level {
        self.config.read().level
    }

    pub fn module_tag(&self) -> String {
        self.config.read().module_tag.clone()
    }

    pub fn max_file_size(&self) -> u64 {
        self.config.read().max_file_size
    }

    pub fn output_mode(&self) -> OutputMode {
        self.config.read().output_mode
    }

    pub fn mask_patterns(&self) -> Vec<String> {
        self.config
            .read()
            .mask_rules
            .iter()
            .map(|r| r.pattern().to_string())
            .collect()
    }

    /// Snapshot of the whole configuration
    pub fn config(&self) -> EngineConfig {
        self.config.read().clone()
    }

    pub fn log_dir(&self) -> &Path {
        self.sinks.dir()
    }

    /// Canonical file path of a sink (e.g. `"error"`, `"combined"`, `"logs"`)
    pub fn sink_path(&self, name: &str) -> PathBuf {
        self.sinks.path_for(name)
    }

    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    // === History ===

    /// Every parseable record currently in `logs.json`, oldest first.
    /// Pending structured writes are flushed first; malformed lines are skipped.
    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.sinks.flush(STRUCTURED_SINK);
        read_records(&self.sinks.path_for(STRUCTURED_SINK))
    }

    /// Wait until every queued sink write has reached its file
    pub fn flush(&self) {
        self.sinks.flush_all();
    }

    // === Live subscribers ===

    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.hub.unsubscribe(id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    // === Shutdown ===

    /// Drain and release every sink, detach every subscriber. Idempotent.
    pub fn close(&self) {
        if self
            .state
            .compare_exchange(
                EngineState::Active as u8,
                EngineState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        self.sinks.close();
        self.hub.close();
        self.set_state(EngineState::Closed);
        info!("Log engine closed");
    }

    fn set_state(&self, state: EngineState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Wall clock, clamped so it never goes backwards within this engine
    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut last = self.last_timestamp.lock();
        let now = Utc::now();
        if now > *last {
            *last = now;
        }
        *last
    }
}

impl Drop for LogEngine {
    fn drop(&mut self) {
        self.close();
    }
}

/// Parse a structured sink file; a missing file is an empty history
pub fn read_records(path: &Path) -> Vec<LogRecord> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!("Cannot read {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let record = LogRecord::from_json(line);
            if record.is_none() {
                debug!("Skipping malformed record in {}", path.display());
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let base = std::env::temp_dir();
        let pid = std::process::id();
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        base.join(format!("loglens-engine-{}-{}-{}", tag, pid, ts))
    }

    fn engine(tag: &str) -> (LogEngine, PathBuf) {
        let dir = unique_temp_dir(tag);
        let engine = LogEngine::open(&dir, EngineConfig::default()).unwrap();
        (engine, dir)
    }

    fn read(engine: &LogEngine, sink: &str) -> String {
        fs::read_to_string(engine.sink_path(sink)).unwrap_or_default()
    }

    #[test]
    fn test_open_creates_all_sinks() {
        let (engine, dir) = engine("open");
        assert_eq!(engine.state(), EngineState::Active);

        for name in [
            "error",
            "warn",
            "info",
            "verbose",
            "debug",
            "silly",
            "combined",
            "exceptions",
        ] {
            assert!(dir.join(format!("{}.log", name)).exists(), "{}", name);
        }
        assert!(dir.join("logs.json").exists());

        engine.close();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_writes_level_combined_and_structured() {
        let (engine, dir) = engine("write");
        engine.warn("disk almost full");
        engine.flush();

        assert!(read(&engine, "warn").contains("[WARN]: disk almost full"));
        assert!(read(&engine, "combined").contains("[WARN]: disk almost full"));
        assert_eq!(read(&engine, "info"), "");

        let records = engine.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::Warn);
        assert_eq!(records[0].message, "disk almost full");

        engine.close();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_exception_also_lands_in_exceptions_sink() {
        let (engine, dir) = engine("exception");
        engine.error("plain");
        engine.exception("thread 'main' panicked");
        engine.flush();

        let exceptions = read(&engine, "exceptions");
        assert_eq!(exceptions.lines().count(), 1);
        assert!(exceptions.contains("[ERROR]: thread 'main' panicked"));
        assert_eq!(read(&engine, "error").lines().count(), 2);
        assert_eq!(engine.snapshot().len(), 2);

        engine.close();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_error_threshold_suppresses_info() {
        let (engine, dir) = engine("gate");
        let mut sub = engine.subscribe();
        engine.set_level("error").unwrap();

        engine.info("quiet");
        engine.flush();

        assert_eq!(read(&engine, "info"), "");
        assert_eq!(read(&engine, "combined"), "");
        assert!(engine.snapshot().is_empty());
        assert!(sub.try_recv().is_none());

        engine.close();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_setters_keep_previous_values() {
        let (engine, dir) = engine("setters");

        assert!(matches!(
            engine.set_level("loud"),
            Err(LogError::UnknownLevel { .. })
        ));
        assert_eq!(engine.level(), Level::Info);

        assert!(matches!(
            engine.set_max_file_size(0),
            Err(LogError::InvalidMaxSize { value: 0 })
        ));
        assert_eq!(engine.max_file_size(), DEFAULT_MAX_FILE_SIZE);

        assert!(engine.add_mask_pattern("[").is_err());
        assert!(engine.mask_patterns().is_empty());

        assert!(engine.set_color(Level::Info, "sparkly").is_err());
        assert_eq!(
            engine.config().presentation.color(Level::Info),
            crossterm::style::Color::Green
        );

        engine.close();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_mask_rules_append_in_order() {
        let (engine, dir) = engine("masks");
        engine.add_mask_pattern("a").unwrap();
        engine.add_mask_pattern("b").unwrap();
        assert_eq!(engine.mask_patterns(), vec!["a", "b"]);

        engine.close();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_module_tag_in_text_and_record() {
        let (engine, dir) = engine("module");
        engine.set_module_tag("billing");
        engine.info("charged");
        engine.flush();

        assert!(read(&engine, "info").contains("[INFO]: [billing] charged"));
        assert_eq!(engine.snapshot()[0].module, "billing");

        engine.close();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_json_mode_writes_structured_lines() {
        let (engine, dir) = engine("json");
        engine.set_output_mode(OutputMode::Json);
        engine.error("structured");
        engine.flush();

        let line = read(&engine, "error");
        let record = LogRecord::from_json(line.trim_end()).unwrap();
        assert_eq!(record.message, "structured");
        assert_eq!(read(&engine, "combined"), line);

        engine.close();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_log_named_ignores_unknown() {
        let (engine, dir) = engine("named");
        engine.log_named("loud", "nope");
        engine.log_named("error", "yes");
        engine.flush();

        let records = engine.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "yes");

        engine.close();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_close_is_terminal() {
        let (engine, dir) = engine("close");
        let mut sub = engine.subscribe();
        engine.close();
        assert_eq!(engine.state(), EngineState::Closed);

        engine.error("after close");
        engine.close();

        assert_eq!(read(&engine, "error"), "");
        assert!(sub.try_recv().is_none());
        assert_eq!(engine.subscriber_count(), 0);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_snapshot_skips_malformed_lines() {
        let (engine, dir) = engine("snapshot");
        engine.info("one");
        engine.flush();

        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(engine.sink_path("logs"))
            .unwrap();
        writeln!(file, "{{not json").unwrap();
        drop(file);

        engine.info("two");
        let messages: Vec<String> = engine.snapshot().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["one", "two"]);

        engine.close();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_timestamps_non_decreasing() {
        let (engine, dir) = engine("stamps");
        engine.set_level_to(Level::Silly);
        for i in 0..20 {
            engine.silly(&i.to_string());
        }

        let stamps: Vec<String> = engine.snapshot().into_iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps.len(), 20);
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));

        engine.close();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_zero_max_size_rejected_at_open() {
        let dir = unique_temp_dir("zero");
        let config = EngineConfig {
            max_file_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            LogEngine::open(&dir, config),
            Err(LogError::InvalidMaxSize { .. })
        ));
    }
}
