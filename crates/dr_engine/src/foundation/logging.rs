//! Logging utilities and the injectable log sink
//!
//! Library code logs through the `log` facade. Dead reckoning takes a
//! [`LogSink`] explicitly so callers can route or capture its per-actor output.

use std::fmt;
use std::sync::Mutex;

pub use log::{debug, error, info, trace, warn, Level};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging with an explicit filter such as `"debug"` or `"dr_engine=trace"`.
///
/// `RUST_LOG` still wins when it is set. Calling this twice is harmless.
pub fn init_with_level(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Leveled log collaborator
pub trait LogSink {
    /// Whether messages at `level` would be recorded
    fn is_level_enabled(&self, level: Level) -> bool;

    /// Record one message. `function` and `line` identify the call site.
    fn log_message(&self, level: Level, function: &str, line: u32, args: fmt::Arguments<'_>);
}

/// Sink that forwards to the `log` facade under a fixed target
#[derive(Debug, Clone)]
pub struct DefaultLogSink {
    target: &'static str,
}

impl DefaultLogSink {
    /// Create a sink logging under `target`
    pub const fn new(target: &'static str) -> Self {
        Self { target }
    }

    /// Target used for every record
    pub const fn target(&self) -> &'static str {
        self.target
    }
}

impl Default for DefaultLogSink {
    fn default() -> Self {
        Self::new("dr_engine")
    }
}

impl LogSink for DefaultLogSink {
    fn is_level_enabled(&self, level: Level) -> bool {
        log::log_enabled!(target: self.target, level)
    }

    fn log_message(&self, level: Level, function: &str, line: u32, args: fmt::Arguments<'_>) {
        log::log!(target: self.target, level, "{function}:{line}: {args}");
    }
}

/// A message captured by [`RecordingLogSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedMessage {
    /// Severity
    pub level: Level,
    /// Function that produced it
    pub function: String,
    /// Formatted text
    pub text: String,
}

/// Sink that keeps every message in memory
#[derive(Debug)]
pub struct RecordingLogSink {
    max_level: Level,
    messages: Mutex<Vec<LoggedMessage>>,
}

impl RecordingLogSink {
    /// Record everything up to and including `max_level`
    pub const fn new(max_level: Level) -> Self {
        Self {
            max_level,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the captured messages
    pub fn messages(&self) -> Vec<LoggedMessage> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Number of captured messages at exactly `level`
    pub fn count(&self, level: Level) -> usize {
        self.messages()
            .iter()
            .filter(|m| m.level == level)
            .count()
    }
}

impl Default for RecordingLogSink {
    fn default() -> Self {
        Self::new(Level::Trace)
    }
}

impl LogSink for RecordingLogSink {
    fn is_level_enabled(&self, level: Level) -> bool {
        level <= self.max_level
    }

    fn log_message(&self, level: Level, function: &str, _line: u32, args: fmt::Arguments<'_>) {
        if !self.is_level_enabled(level) {
            return;
        }
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(LoggedMessage {
                level,
                function: function.to_string(),
                text: args.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_filters_by_level() {
        let sink = RecordingLogSink::new(Level::Info);
        assert!(sink.is_level_enabled(Level::Warn));
        assert!(!sink.is_level_enabled(Level::Debug));

        sink.log_message(Level::Debug, "f", 1, format_args!("hidden"));
        sink.log_message(Level::Warn, "f", 2, format_args!("value {}", 3));

        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "value 3");
        assert_eq!(sink.count(Level::Warn), 1);
    }

    #[test]
    fn test_default_sink_target() {
        let sink = DefaultLogSink::default();
        assert_eq!(sink.target(), "dr_engine");
    }
}
