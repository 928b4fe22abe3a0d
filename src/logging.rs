//! Timestamped log lines on stderr.
//!
//! The threshold is read once from `LANGCARD_LOG` (`error`, `warn` or
//! `info`); anything else falls back to `info`.

use chrono::Utc;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Level::Error),
            "warn" | "warning" => Some(Level::Warn),
            "info" => Some(Level::Info),
            _ => None,
        }
    }
}

static MAX_LEVEL: OnceLock<Level> = OnceLock::new();

fn max_level() -> Level {
    *MAX_LEVEL.get_or_init(|| {
        std::env::var("LANGCARD_LOG")
            .ok()
            .and_then(|v| Level::parse(&v))
            .unwrap_or(Level::Info)
    })
}

pub fn enabled(level: Level) -> bool {
    level <= max_level()
}

/// Writes one log line. Use the `info!`, `warn!` and `error!` macros instead.
pub fn emit(level: Level, args: fmt::Arguments<'_>) {
    if !enabled(level) {
        return;
    }
    eprintln!("{}", format_line(level, args));
}

fn format_line(level: Level, args: fmt::Arguments<'_>) -> String {
    format!(
        "{} {:<5} {args}",
        Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        level.as_str()
    )
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Error, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_by_severity() {
        assert!(Level::Error < Level::Warn);
        assert!(Level::Warn < Level::Info);
    }

    #[test]
    fn parses_level_names() {
        assert_eq!(Level::parse("WARN"), Some(Level::Warn));
        assert_eq!(Level::parse(" error "), Some(Level::Error));
        assert_eq!(Level::parse("verbose"), None);
    }

    #[test]
    fn line_carries_level_and_message() {
        let line = format_line(Level::Warn, format_args!("skipped {}", "repo"));
        assert!(line.contains("WARN "));
        assert!(line.ends_with("skipped repo"));
        assert!(line.contains('T') && line.contains('Z'));
    }
}
