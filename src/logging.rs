//! File Logging Module for PageSearch
//!
//! A process-wide file logger. Fetch failures are swallowed by the list and
//! only ever show up here, so every fetch life-cycle event has a helper below.
//!
//! Nothing is written until [`init`] has been called; library users and
//! tests that never call it pay nothing.

use chrono::Local;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Global logger instance
static LOGGER: OnceLock<Mutex<SearchLogger>> = OnceLock::new();

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Main logger struct
pub struct SearchLogger {
    file: Option<File>,
    path: PathBuf,
    min_level: LogLevel,
}

impl SearchLogger {
    fn new(path: PathBuf, min_level: LogLevel) -> Self {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok();

        Self {
            file,
            path,
            min_level,
        }
    }

    /// Default log file: next to the executable
    fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pagesearch.log")
    }

    fn log(&mut self, level: LogLevel, module: &str, message: &str) {
        if level < self.min_level {
            return;
        }

        let entry = format_entry(level, module, message);

        if let Some(ref mut file) = self.file {
            let _ = file.write_all(entry.as_bytes());
            let _ = file.flush();
        }
    }
}

fn format_entry(level: LogLevel, module: &str, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    format!("[{}] [{:5}] [{}] {}\n", timestamp, level, module, message)
}

/// Initialize the global logger. `None` logs next to the executable.
///
/// Only the first call has an effect.
pub fn init(path: Option<&Path>, min_level: LogLevel) {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(SearchLogger::default_path);
    let _ = LOGGER.set(Mutex::new(SearchLogger::new(path, min_level)));
}

/// Path of the active log file, if logging was initialized and the file opened
pub fn log_path() -> Option<PathBuf> {
    let logger = LOGGER.get()?.lock();
    logger.file.as_ref().map(|_| logger.path.clone())
}

fn log(level: LogLevel, module: &str, message: &str) {
    if let Some(logger) = LOGGER.get() {
        logger.lock().log(level, module, message);
    }
}

/// Log debug message
pub fn debug(module: &str, message: &str) {
    log(LogLevel::Debug, module, message);
}

/// Log info message
pub fn info(module: &str, message: &str) {
    log(LogLevel::Info, module, message);
}

/// Log warning message
pub fn warn(module: &str, message: &str) {
    log(LogLevel::Warn, module, message);
}

/// Log error message
pub fn error(module: &str, message: &str) {
    log(LogLevel::Error, module, message);
}

// ============================================================================
// Fetch life-cycle helpers
// ============================================================================

/// A request left the list
pub fn log_fetch_issued(seq: u64, url: &str) {
    debug("FETCH", &format!("#{} GET {}", seq, url));
}

/// A response was applied to the list
pub fn log_fetch_resolved(seq: u64, page_index: u32, received: usize, has_more: bool) {
    debug(
        "FETCH",
        &format!(
            "#{} page={} received={} has_more={}",
            seq, page_index, received, has_more
        ),
    );
}

/// A request failed; the list keeps its previous items
pub fn log_fetch_failed(seq: u64, err: &crate::SearchError) {
    error("FETCH", &fetch_failure_message(seq, err));
}

fn fetch_failure_message(seq: u64, err: &crate::SearchError) -> String {
    let kind = if err.is_transient() { "transient" } else { "permanent" };
    format!("#{} failed ({}): {}", seq, kind, err)
}

/// A response arrived for a request that is no longer current
pub fn log_stale_response(seq: u64, current: Option<u64>) {
    match current {
        Some(current) => warn(
            "FETCH",
            &format!("#{} dropped, superseded by #{}", seq, current),
        ),
        None => warn("FETCH", &format!("#{} dropped, list no longer waiting", seq)),
    }
}

/// The `results` envelope was missing or not an array
pub fn log_malformed_page(seq: u64) {
    warn("FETCH", &format!("#{} has no results array, treating as empty", seq));
}

/// An option was forwarded to the owner
pub fn log_selection(value: &serde_json::Value) {
    info("SELECT", &format!("selected {}", value));
}
