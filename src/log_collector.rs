//! Console logging with optional on-disk persistence.
//!
//! Every `log::*` record becomes one line on stderr. Status lines carry their
//! own `[OK]`/`[SKIP]`/`[WARN]`/`[FAIL]` tag, so the console shows the bare
//! message. When a log file is configured, the line is appended there with a
//! timestamp and the record level, so CI artifacts keep a copy of the report.
//!
//! ```text
//! log::info!(..)
//!     |
//! [LogCollector]
//!     |            \
//!   stderr      <log file> (optional, appended)
//! ```

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    /// The actual log message
    pub message: String,
    pub level: Level,
    /// Timestamp of when the log was created
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: String) -> Self {
        LogLine {
            message,
            level,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    /// Line as shown on the console
    pub fn console(&self) -> &str {
        &self.message
    }

    /// Line as persisted to disk
    pub fn persisted(&self) -> String {
        format!("{} [{}] {}", self.timestamp, self.level, self.message)
    }
}

/// Logger that writes to stderr and, optionally, to a file
pub struct LogCollector {
    level: LevelFilter,
    log_file: Option<Mutex<File>>,
}

impl LogCollector {
    /// Create a collector; opens (appends to) `log_path` if given
    pub fn new(level: LevelFilter, log_path: Option<&Path>) -> Result<Self, String> {
        let log_file = match log_path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| format!("Failed to create log directory: {}", e))?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))?;
                Some(Mutex::new(file))
            }
            None => None,
        };

        Ok(LogCollector { level, log_file })
    }

    /// Register as the global logger for the `log` crate
    pub fn install(self) -> Result<(), String> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))
            .map(|()| log::set_max_level(level))
            .map_err(|e| format!("Failed to set global logger: {}", e))
    }

    fn persist(&self, line: &LogLine) {
        if let Some(file) = &self.log_file {
            if let Ok(mut file) = file.lock() {
                // A broken log file must not abort the fix pass.
                let _ = writeln!(file, "{}", line.persisted());
            }
        }
    }
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = LogLine::new(record.level(), record.args().to_string());
            eprintln!("{}", line.console());
            self.persist(&line);
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.log_file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

/// Map `-v`/`-q` counts to a level filter
pub fn level_from_verbosity(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Warn;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
