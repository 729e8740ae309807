// Detection of a device poller that keeps returning a frozen status snapshot
use crate::domain::sensor::DataColumn;
use std::collections::{HashMap, VecDeque};

pub const DEFAULT_STUCK_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq)]
struct StatusSnapshot {
    live_value: String,
    live_value_timestamp: Option<i64>,
}

/// Per-column sliding window of status snapshots. A column is stuck when the
/// window is full and every entry repeats both value and timestamp; a plateau
/// in value alone is not suspicious.
#[derive(Debug)]
pub struct StuckSensorDetector {
    window: usize,
    history: HashMap<String, VecDeque<StatusSnapshot>>,
}

impl Default for StuckSensorDetector {
    fn default() -> Self {
        Self::new(DEFAULT_STUCK_WINDOW)
    }
}

impl StuckSensorDetector {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(2),
            history: HashMap::new(),
        }
    }

    /// Record the column's current snapshot and report whether it is stuck.
    pub fn observe(&mut self, column: &DataColumn) -> bool {
        let entries = self.history.entry(column.id.clone()).or_default();
        entries.push_back(StatusSnapshot {
            live_value: column.live_value.clone(),
            live_value_timestamp: column.live_value_timestamp,
        });
        while entries.len() > self.window {
            entries.pop_front();
        }
        Self::is_frozen(entries, self.window)
    }

    pub fn is_stuck(&self, column_id: &str) -> bool {
        self.history
            .get(column_id)
            .is_some_and(|entries| Self::is_frozen(entries, self.window))
    }

    pub fn forget(&mut self, column_id: &str) {
        self.history.remove(column_id);
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    fn is_frozen(entries: &VecDeque<StatusSnapshot>, window: usize) -> bool {
        match entries.front() {
            Some(first) if entries.len() >= window => entries.iter().all(|e| e == first),
            _ => false,
        }
    }
}
