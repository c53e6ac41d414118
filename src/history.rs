//! History store (C7).
//!
//! Append-only per-agent history with bounded retrieval (spec §3
//! HistoryEntry, §4.5 step 10, P7).

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub agent_id: String,
    pub task_text: String,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
    pub kpis: HashMap<String, f64>,
    pub succeeded: bool,
}

/// Per-agent append-only history. Internally ordered oldest-first; retrieval
/// always returns newest-first (spec P7: t2 before t1 for t1 < t2).
#[derive(Default)]
pub struct HistoryStore {
    by_agent: Mutex<HashMap<String, VecDeque<HistoryEntry>>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, entry: HistoryEntry) {
        let mut guard = self.by_agent.lock().unwrap();
        guard.entry(entry.agent_id.clone()).or_default().push_back(entry);
    }

    /// Returns up to `limit` entries for `agent_id`, most recently completed first.
    pub fn recent(&self, agent_id: &str, limit: usize) -> Vec<HistoryEntry> {
        let guard = self.by_agent.lock().unwrap();
        match guard.get(agent_id) {
            Some(entries) => entries.iter().rev().take(limit).cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn all_for_agent(&self, agent_id: &str) -> Vec<HistoryEntry> {
        let guard = self.by_agent.lock().unwrap();
        guard
            .get(agent_id)
            .map(|entries| entries.iter().rev().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(agent: &str, text: &str, succeeded: bool) -> HistoryEntry {
        HistoryEntry {
            id: Uuid::new_v4(),
            agent_id: agent.to_string(),
            task_text: text.to_string(),
            reasoning: "because".to_string(),
            timestamp: Utc::now(),
            kpis: HashMap::new(),
            succeeded,
        }
    }

    #[test]
    fn retrieval_is_newest_first() {
        let store = HistoryStore::new();
        store.append(entry("a", "first", true));
        store.append(entry("a", "second", true));

        let recent = store.recent("a", 10);
        assert_eq!(recent[0].task_text, "second");
        assert_eq!(recent[1].task_text, "first");
    }

    #[test]
    fn retrieval_is_bounded() {
        let store = HistoryStore::new();
        for i in 0..5 {
            store.append(entry("a", &i.to_string(), true));
        }
        assert_eq!(store.recent("a", 2).len(), 2);
    }

    #[test]
    fn unknown_agent_returns_empty() {
        let store = HistoryStore::new();
        assert!(store.recent("nobody", 5).is_empty());
    }
}
