//! Shell-style history of submitted commands

use std::collections::VecDeque;

#[derive(Debug)]
pub struct CommandHistory {
    entries: VecDeque<String>,
    limit: usize,
    cursor: Option<usize>,
}

impl CommandHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
            cursor: None,
        }
    }

    /// Records a submitted command and resets navigation
    pub fn push(&mut self, command: &str) {
        let command = command.trim();
        self.cursor = None;
        if command.is_empty() {
            return;
        }
        if self.entries.len() == self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(command.to_string());
    }

    /// Steps towards older commands, stopping at the oldest
    pub fn previous(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let index = match self.cursor {
            None => self.entries.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.cursor = Some(index);
        self.entries.get(index).map(String::as_str)
    }

    /// Steps towards newer commands. Moving past the newest clears the cursor
    /// and returns None, leaving an empty prompt.
    pub fn next(&mut self) -> Option<&str> {
        let current = self.cursor?;
        if current + 1 < self.entries.len() {
            self.cursor = Some(current + 1);
            self.entries.get(current + 1).map(String::as_str)
        } else {
            self.cursor = None;
            None
        }
    }

    /// Oldest first
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
