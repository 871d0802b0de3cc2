use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::command::{Command, CommandSource};

const DEFAULT_CAPACITY: usize = 500;

/// A command as executed on the control lane
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub timestamp_ms: u64,
    pub source: CommandSource,
    pub command: Command,
}

/// Ring buffer of recently executed commands, in execution order
pub struct EventLog {
    events: VecDeque<Event>,
    next_id: u64,
    capacity: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            next_id: 1,
            capacity: capacity.max(1),
        }
    }

    /// Record an executed command; returns its event id if it was kept
    pub fn record(&mut self, command: &Command, source: CommandSource) -> Option<u64> {
        if !command.is_loggable() {
            return None;
        }

        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let id = self.next_id;
        self.next_id += 1;
        self.events.push_back(Event {
            id,
            timestamp_ms,
            source,
            command: command.clone(),
        });

        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
        Some(id)
    }

    /// Events with an id greater than `since_id`
    pub fn since(&self, since_id: u64) -> Vec<Event> {
        self.events
            .iter()
            .filter(|e| e.id > since_id)
            .cloned()
            .collect()
    }

    pub fn latest_id(&self) -> u64 {
        self.next_id - 1
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_ticks_and_numbers_the_rest() {
        let mut log = EventLog::new();
        assert_eq!(log.record(&Command::Play, CommandSource::Tui), Some(1));
        assert_eq!(log.record(&Command::Tick, CommandSource::Ticker), None);
        assert_eq!(log.record(&Command::Pause, CommandSource::Api), Some(2));
        assert_eq!(log.latest_id(), 2);
        let since = log.since(1);
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].command, Command::Pause);
    }

    #[test]
    fn drops_oldest_past_capacity() {
        let mut log = EventLog::with_capacity(3);
        for i in 0..5 {
            log.record(&Command::Seek(i as f64), CommandSource::Api);
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.since(0)[0].command, Command::Seek(2.0));
        assert_eq!(log.latest_id(), 5);
    }
}
