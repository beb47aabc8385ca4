//! Record rendering
//!
//! Text lines for humans, the JSON encoding for machines and live viewers,
//! and ANSI colorizing for console echo. Pure functions of a record and a
//! presentation snapshot.

use super::{Level, LogRecord};
use crate::error::{LogError, Result};
use crossterm::style::{Color, Stylize};
use serde::{Deserialize, Serialize};

// Level glyphs (used when emoji decoration is on)
pub const GLYPH_ERROR: &str = "❌";
pub const GLYPH_WARN: &str = "⚠️";
pub const GLYPH_INFO: &str = "ℹ️";
pub const GLYPH_VERBOSE: &str = "🔍";
pub const GLYPH_DEBUG: &str = "🐞";
pub const GLYPH_SILLY: &str = "🎉";

/// What the per-level and combined sinks receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// `<timestamp> <prefix>: [<module>] <message>`
    #[default]
    Text,
    /// Structured JSON line, same as `logs.json`
    Json,
}

impl std::str::FromStr for OutputMode {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(OutputMode::Text),
            "json" => Ok(OutputMode::Json),
            other => Err(LogError::ConfigValidation {
                field: "format",
                reason: format!("expected \"text\" or \"json\", got \"{}\"", other),
            }),
        }
    }
}

/// Per-level labels, colors and decoration. Presentation only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    prefixes: [String; 6],
    colors: [Color; 6],
    pub use_emoji: bool,
}

impl Default for Presentation {
    fn default() -> Self {
        Self {
            prefixes: Level::ALL.map(|l| format!("[{}]", l.as_str().to_uppercase())),
            colors: [
                Color::Red,
                Color::Yellow,
                Color::Green,
                Color::Blue,
                Color::Cyan,
                Color::Magenta,
            ],
            use_emoji: false,
        }
    }
}

impl Presentation {
    pub fn prefix(&self, level: Level) -> &str {
        &self.prefixes[level.index()]
    }

    pub fn set_prefix(&mut self, level: Level, prefix: impl Into<String>) {
        self.prefixes[level.index()] = prefix.into();
    }

    pub fn color(&self, level: Level) -> Color {
        self.colors[level.index()]
    }

    pub fn set_color(&mut self, level: Level, color: Color) {
        self.colors[level.index()] = color;
    }

    /// Label with the glyph in front when decoration is on
    pub fn decorated_prefix(&self, level: Level) -> String {
        if self.use_emoji {
            format!("{} {}", glyph(level), self.prefix(level))
        } else {
            self.prefix(level).to_string()
        }
    }
}

/// Decorative glyph for a level
pub fn glyph(level: Level) -> &'static str {
    match level {
        Level::Error => GLYPH_ERROR,
        Level::Warn => GLYPH_WARN,
        Level::Info => GLYPH_INFO,
        Level::Verbose => GLYPH_VERBOSE,
        Level::Debug => GLYPH_DEBUG,
        Level::Silly => GLYPH_SILLY,
    }
}

/// Parse a color name such as `red`, `dark_cyan` or `grey`
pub fn parse_color(name: &str) -> Result<Color> {
    Color::try_from(name).map_err(|_| LogError::InvalidColor {
        name: name.to_string(),
    })
}

/// Both renderings of one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub structured: String,
}

impl Rendered {
    /// Form written to the level and combined sinks
    pub fn for_sinks(&self, mode: OutputMode) -> &str {
        match mode {
            OutputMode::Text => &self.text,
            OutputMode::Json => &self.structured,
        }
    }
}

/// Human-readable line
pub fn format_text(record: &LogRecord, presentation: &Presentation) -> String {
    let prefix = presentation.decorated_prefix(record.level);
    if record.module.is_empty() {
        format!("{} {}: {}", record.timestamp, prefix, record.message)
    } else {
        format!(
            "{} {}: [{}] {}",
            record.timestamp, prefix, record.module, record.message
        )
    }
}

/// Render once for every destination
pub fn render(record: &LogRecord, presentation: &Presentation) -> Rendered {
    Rendered {
        text: format_text(record, presentation),
        structured: record.to_json(),
    }
}

/// Wrap a line in ANSI color codes for terminal output
pub fn colorize(line: &str, color: Color) -> String {
    line.with(color).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(level: Level, module: &str, message: &str) -> LogRecord {
        LogRecord {
            timestamp: "2026-10-18T09:15:02.123Z".to_string(),
            level,
            module: module.to_string(),
            message: message.to_string(),
            pid: 7,
        }
    }

    #[test]
    fn test_text_untagged() {
        let line = format_text(&record(Level::Info, "", "hello"), &Presentation::default());
        assert_eq!(line, "2026-10-18T09:15:02.123Z [INFO]: hello");
    }

    #[test]
    fn test_text_with_module() {
        let line = format_text(&record(Level::Warn, "db", "slow"), &Presentation::default());
        assert_eq!(line, "2026-10-18T09:15:02.123Z [WARN]: [db] slow");
    }

    #[test]
    fn test_text_with_emoji_and_custom_prefix() {
        let mut p = Presentation::default();
        p.use_emoji = true;
        p.set_prefix(Level::Error, "<E>");
        let line = format_text(&record(Level::Error, "", "bad"), &p);
        assert_eq!(line, "2026-10-18T09:15:02.123Z ❌ <E>: bad");
    }

    #[test]
    fn test_default_prefixes() {
        let p = Presentation::default();
        assert_eq!(p.prefix(Level::Verbose), "[VERBOSE]");
        assert_eq!(p.prefix(Level::Silly), "[SILLY]");
    }

    #[test]
    fn test_for_sinks_mode() {
        let rendered = render(&record(Level::Debug, "", "x"), &Presentation::default());
        assert_eq!(rendered.for_sinks(OutputMode::Text), rendered.text);
        assert_eq!(rendered.for_sinks(OutputMode::Json), rendered.structured);
        assert!(rendered.structured.starts_with(r#"{"timestamp":"#));
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("red").unwrap(), Color::Red);
        assert_eq!(parse_color("dark_cyan").unwrap(), Color::DarkCyan);
        assert!(matches!(
            parse_color("chartreuse"),
            Err(LogError::InvalidColor { .. })
        ));
    }

    #[test]
    fn test_colorize_wraps_text() {
        // Escape codes may be suppressed by NO_COLOR; the text must survive either way.
        let colored = colorize("line", Color::Green);
        assert!(colored.contains("line"));
    }

    #[test]
    fn test_output_mode_parse() {
        assert_eq!("json".parse::<OutputMode>().unwrap(), OutputMode::Json);
        assert!("xml".parse::<OutputMode>().is_err());
    }
}
