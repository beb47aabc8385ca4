//! loglens - leveled, masked, rotating file logger with live fan-out
//!
//! A [`logging::LogEngine`] gates each call by level, masks the message,
//! renders it once, appends it to `<level>.log`, `combined.log` and
//! `logs.json`, and pushes the JSON record to every live subscriber.

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod server;

pub use error::{LogError, Result};
pub use logging::{EngineConfig, Level, LogEngine, LogRecord, OutputMode};
