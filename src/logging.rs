/// Debug logging for the weather alert service
///
/// Every notable event is appended to a plain-text debug log as
/// `"{timestamp}: {message}"`, one line per event. The same event is
/// echoed to the console according to its severity. File writes are
/// best-effort: a failure is reported on stderr and never aborts a run.

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Timestamp layout for debug log lines, e.g. `2024-07-01 06:00:00.123456`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Debug Log
// ---------------------------------------------------------------------------

pub struct DebugLog {
    /// Append-only text file; `None` disables file output.
    log_file: Option<PathBuf>,
    /// Minimum level echoed to the console.
    console_level: LogLevel,
    /// Whether to echo to the console at all.
    console: bool,
}

impl DebugLog {
    pub fn new(log_file: Option<PathBuf>, console_level: LogLevel) -> Self {
        Self {
            log_file,
            console_level,
            console: true,
        }
    }

    /// A logger that writes only to `path`, with no console echo.
    pub fn file_only(path: impl Into<PathBuf>) -> Self {
        Self {
            log_file: Some(path.into()),
            console_level: LogLevel::Error,
            console: false,
        }
    }

    /// A logger that discards everything.
    pub fn disabled() -> Self {
        Self {
            log_file: None,
            console_level: LogLevel::Error,
            console: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    fn log(&self, level: LogLevel, message: &str) {
        if self.console && level >= self.console_level {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}", message),
                LogLevel::Warning => eprintln!("   ⚠ {}", message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}", message),
            }
        }

        // The file receives every level; the format carries no level tag.
        if let Some(ref path) = self.log_file {
            let entry = format_entry(&Local::now().format(TIMESTAMP_FORMAT).to_string(), message);
            if let Err(e) = Self::append_to_file(path, &entry) {
                eprintln!("Failed to write to debug log {}: {}", path.display(), e);
            }
        }
    }

    fn append_to_file(path: &Path, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

/// Formats one debug log line (without the trailing newline).
pub fn format_entry(timestamp: &str, message: &str) -> String {
    format!("{}: {}", timestamp, message)
}
