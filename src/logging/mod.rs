//! Logging engine
//!
//! - `Level` / `should_log` - severity ranks and gating
//! - `mask` - ordered regex redaction
//! - `LogRecord` / `format` - the record and its text and JSON renderings
//! - `SinkSet` - rotating per-name files, one writer thread each
//! - `BroadcastHub` - live subscriber fan-out
//! - `LogEngine` - ties the above together

pub mod engine;
pub mod format;
pub mod hub;
pub mod level;
pub mod mask;
pub mod record;
pub mod sink;

pub use engine::{EngineConfig, EngineState, LogEngine};
pub use format::{OutputMode, Presentation};
pub use hub::{BroadcastHub, SubscriberId, Subscription};
pub use level::{should_log, Level};
pub use mask::MaskRule;
pub use record::LogRecord;
pub use sink::SinkSet;

/// Initialize internal tracing for the engine's own diagnostics
///
/// Call early in main() before any logging occurs.
/// Set `verbose` to true for debug-level output.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose { "debug" } else { "warn" };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(false)
                .compact(),
        )
        .with(tracing_subscriber::EnvFilter::new(level))
        .try_init();
}
