use serde::Serialize;
use std::collections::VecDeque;

/// Most-recent-first list of raw SQL the console has run. View-local, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct QueryHistory {
    entries: VecDeque<String>,
    #[serde(skip)]
    limit: usize,
}

impl QueryHistory {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Push `sql` to the front unless it is already remembered anywhere in the list.
    /// Returns whether the history changed.
    pub fn record(&mut self, sql: &str) -> bool {
        if sql.is_empty() || self.entries.iter().any(|e| e == sql) {
            return false;
        }
        self.entries.push_front(sql.to_string());
        self.entries.truncate(self.limit);
        true
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first_and_capped() {
        let mut history = QueryHistory::new(10);
        for i in 0..12 {
            history.record(&format!("SELECT {i}"));
        }
        assert_eq!(history.len(), 10);
        assert_eq!(history.get(0), Some("SELECT 11"));
        assert_eq!(history.get(9), Some("SELECT 2"));
        assert_eq!(history.get(10), None);
    }

    #[test]
    fn already_remembered_text_is_not_repeated() {
        let mut history = QueryHistory::new(10);
        assert!(history.record("SELECT 1"));
        assert!(history.record("SELECT 2"));
        assert!(!history.record("SELECT 1"));
        assert_eq!(history.iter().collect::<Vec<_>>(), vec!["SELECT 2", "SELECT 1"]);
    }

    #[test]
    fn empty_text_is_ignored() {
        let mut history = QueryHistory::new(3);
        assert!(!history.record(""));
        assert!(history.is_empty());
    }

    #[test]
    fn zero_limit_still_keeps_latest() {
        let mut history = QueryHistory::new(0);
        history.record("a");
        history.record("b");
        assert_eq!(history.limit(), 1);
        assert_eq!(history.iter().collect::<Vec<_>>(), vec!["b"]);
    }
}
