//! Bounded, ordered record of console output

use chrono::{DateTime, Local};
use shared::LogLevel;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Unique and strictly increasing for the lifetime of the buffer
    pub id: u64,
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
    /// Request this entry belongs to, for command echoes and their results
    pub request_id: Option<u64>,
}

impl LogEntry {
    /// Renders the entry as `[timestamp] [LEVEL] message`.
    ///
    /// Line breaks inside the message are written as `\n` and `\r` so every
    /// entry stays on exactly one line.
    pub fn format_line(&self) -> String {
        format!(
            "[{}] [{}] {}",
            self.timestamp.format("%H:%M:%S"),
            self.level,
            self.message.replace('\r', "\\r").replace('\n', "\\n")
        )
    }
}

/// Append-only log with FIFO eviction once `capacity` entries are held
#[derive(Debug)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_id: u64,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_id: 1,
        }
    }

    pub fn append(&mut self, level: LogLevel, message: impl Into<String>) -> LogEntry {
        self.push(level, message.into(), None)
    }

    pub fn append_for_request(
        &mut self,
        request_id: u64,
        level: LogLevel,
        message: impl Into<String>,
    ) -> LogEntry {
        self.push(level, message.into(), Some(request_id))
    }

    fn push(&mut self, level: LogLevel, message: String, request_id: Option<u64>) -> LogEntry {
        let entry = LogEntry {
            id: self.next_id,
            timestamp: Local::now(),
            level,
            message,
            request_id,
        };
        self.next_id += 1;

        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.clone());
        entry
    }

    /// Drops every retained entry. Ids keep increasing afterwards.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// One line per retained entry, oldest first, joined by newlines
    pub fn export(&self) -> String {
        self.entries
            .iter()
            .map(LogEntry::format_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Entries appended after the entry with id `last_seen`
    pub fn since(&self, last_seen: u64) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |entry| entry.id > last_seen)
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
