use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

pub const LOG_CAPACITY: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

/// Bounded activity log served at `/logs`. Every entry is also emitted
/// through `tracing`.
#[derive(Debug, Default)]
pub struct LogBuffer {
    entries: Mutex<VecDeque<LogEntry>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, level: &str, source: &str, message: &str) -> LogEntry {
        match level {
            "ERROR" => error!(source, "{}", message),
            "WARN" => warn!(source, "{}", message),
            "DEBUG" => debug!(source, "{}", message),
            _ => info!(source, "{}", message),
        }

        let entry = LogEntry {
            time: Local::now().format("%H:%M:%S").to_string(),
            level: level.to_string(),
            source: source.to_string(),
            message: message.to_string(),
        };

        let mut entries = self.lock();
        entries.push_back(entry.clone());
        while entries.len() > LOG_CAPACITY {
            entries.pop_front();
        }
        entry
    }

    pub fn info(&self, source: &str, message: &str) {
        self.add("INFO", source, message);
    }

    pub fn error(&self, source: &str, message: &str) {
        self.add("ERROR", source, message);
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        // A panic while holding the lock cannot leave the deque inconsistent.
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}
