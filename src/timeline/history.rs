use std::collections::VecDeque;
use std::sync::Arc;

use crate::models::SessionTimeline;

pub const DEFAULT_HISTORY_LIMIT: usize = 30;

/// Archived timelines, oldest first. Entries are immutable once archived and
/// shared through `Arc`, so readers need no synchronization.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    entries: VecDeque<Arc<SessionTimeline>>,
    limit: usize,
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl SessionHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Move the live timeline into history and leave a fresh empty one with
    /// `next_total_secs` in its place.
    pub fn archive(
        &mut self,
        live: &mut SessionTimeline,
        next_total_secs: u64,
    ) -> Arc<SessionTimeline> {
        let finished = std::mem::replace(live, SessionTimeline::new(next_total_secs));
        let archived = Arc::new(finished);
        self.push(Arc::clone(&archived));
        archived
    }

    pub fn push(&mut self, timeline: Arc<SessionTimeline>) {
        self.entries.push_back(timeline);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<SessionTimeline>> {
        self.entries.iter().find(|t| t.id() == id).cloned()
    }

    pub fn delete(&mut self, id: &str) -> Option<Arc<SessionTimeline>> {
        let index = self.entries.iter().position(|t| t.id() == id)?;
        self.entries.remove(index)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Arc<SessionTimeline>> {
        self.entries.iter()
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

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TitleInterval;

    #[test]
    fn archive_swaps_in_a_fresh_timeline() {
        let mut history = SessionHistory::new(5);
        let mut live = SessionTimeline::new(60);
        live.insert("code", [TitleInterval::new("a", 0, 5).unwrap()])
            .unwrap();
        let old_id = live.id().to_string();

        let archived = history.archive(&mut live, 90);

        assert_eq!(archived.id(), old_id);
        assert_ne!(live.id(), old_id);
        assert!(live.is_empty());
        assert_eq!(live.total_duration_secs(), 90);
        assert_eq!(history.get(&old_id).unwrap().windows().len(), 1);
    }

    #[test]
    fn evicts_oldest_beyond_limit() {
        let mut history = SessionHistory::new(2);
        let ids: Vec<String> = (0..3)
            .map(|_| {
                let timeline = Arc::new(SessionTimeline::new(10));
                let id = timeline.id().to_string();
                history.push(timeline);
                id
            })
            .collect();

        assert_eq!(history.len(), 2);
        assert!(history.get(&ids[0]).is_none());
        assert!(history.get(&ids[2]).is_some());
    }

    #[test]
    fn delete_by_id() {
        let mut history = SessionHistory::default();
        let timeline = Arc::new(SessionTimeline::new(10));
        let id = timeline.id().to_string();
        history.push(timeline);

        assert!(history.delete("missing").is_none());
        assert!(history.delete(&id).is_some());
        assert!(history.is_empty());
    }
}
