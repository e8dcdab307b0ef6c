//! Queue Registry
//!
//! Independent FIFO queues addressed by name and created on first use.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

// == Queue Snapshot ==
/// Point-in-time length of one named queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    pub name: String,
    pub size: usize,
}

// == Queue Registry ==
/// Process-local collection of named FIFO queues.
///
/// Dequeue never blocks and contents are not persisted.
#[derive(Debug)]
pub struct QueueRegistry<T> {
    queues: HashMap<String, VecDeque<T>>,
}

impl<T> Default for QueueRegistry<T> {
    fn default() -> Self {
        Self {
            queues: HashMap::new(),
        }
    }
}

impl<T> QueueRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    // == Enqueue ==
    /// Appends `item` to the tail of `name`, creating the queue if needed.
    ///
    /// Returns the queue length after the push.
    pub fn enqueue(&mut self, name: &str, item: T) -> usize {
        let queue = self.queues.entry(name.to_string()).or_default();
        queue.push_back(item);
        queue.len()
    }

    // == Dequeue ==
    /// Removes and returns the head of `name`.
    ///
    /// `None` when the queue does not exist or is empty.
    pub fn dequeue(&mut self, name: &str) -> Option<T> {
        self.queues.get_mut(name).and_then(VecDeque::pop_front)
    }

    /// Head of `name` without removing it.
    pub fn peek(&self, name: &str) -> Option<&T> {
        self.queues.get(name).and_then(VecDeque::front)
    }

    // == Size ==
    /// Current length of `name`; 0 for a queue that was never created.
    pub fn size(&self, name: &str) -> usize {
        self.queues.get(name).map_or(0, VecDeque::len)
    }

    /// Drops every item in `name`. Returns how many were discarded.
    pub fn clear(&mut self, name: &str) -> usize {
        self.queues.get_mut(name).map_or(0, |queue| {
            let count = queue.len();
            queue.clear();
            count
        })
    }

    /// Lengths of all known queues, sorted by name.
    pub fn snapshot(&self) -> Vec<QueueSnapshot> {
        let mut snapshot: Vec<QueueSnapshot> = self
            .queues
            .iter()
            .map(|(name, queue)| QueueSnapshot {
                name: name.clone(),
                size: queue.len(),
            })
            .collect();
        snapshot.sort_by(|a, b| a.name.cmp(&b.name));
        snapshot
    }

    /// Items held across all queues.
    pub fn total_items(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_fifo_order() {
        let mut queues = QueueRegistry::new();
        queues.enqueue("q", "a");
        queues.enqueue("q", "b");
        queues.enqueue("q", "c");

        assert_eq!(queues.dequeue("q"), Some("a"));
        assert_eq!(queues.size("q"), 2);
        assert_eq!(queues.dequeue("q"), Some("b"));
        assert_eq!(queues.dequeue("q"), Some("c"));
        assert_eq!(queues.dequeue("q"), None);
    }

    #[test]
    fn test_unknown_queue_is_empty() {
        let mut queues: QueueRegistry<u32> = QueueRegistry::new();
        assert_eq!(queues.size("never-used"), 0);
        assert_eq!(queues.dequeue("never-used"), None);
        assert!(queues.peek("never-used").is_none());
        assert_eq!(queues.clear("never-used"), 0);
    }

    #[test]
    fn test_queues_are_independent() {
        let mut queues = QueueRegistry::new();
        queues.enqueue("emails", 1);
        queues.enqueue("thumbnails", 2);
        queues.enqueue("emails", 3);

        assert_eq!(queues.dequeue("thumbnails"), Some(2));
        assert_eq!(queues.size("emails"), 2);
        assert_eq!(queues.total_items(), 2);
    }

    #[test]
    fn test_jobs_scenario() {
        let mut queues: QueueRegistry<Value> = QueueRegistry::new();
        queues.enqueue("jobs", json!({"task": 1}));
        queues.enqueue("jobs", json!({"task": 2}));
        assert_eq!(queues.size("jobs"), 2);

        assert_eq!(queues.dequeue("jobs"), Some(json!({"task": 1})));
        assert_eq!(queues.size("jobs"), 1);

        assert_eq!(queues.dequeue("jobs"), Some(json!({"task": 2})));
        assert_eq!(queues.size("jobs"), 0);

        assert_eq!(queues.dequeue("jobs"), None);
    }

    #[test]
    fn test_peek_and_clear() {
        let mut queues = QueueRegistry::new();
        queues.enqueue("q", 10);
        queues.enqueue("q", 20);

        assert_eq!(queues.peek("q"), Some(&10));
        assert_eq!(queues.size("q"), 2);
        assert_eq!(queues.clear("q"), 2);
        assert_eq!(queues.size("q"), 0);
    }

    #[test]
    fn test_snapshot_sorted_by_name() {
        let mut queues = QueueRegistry::new();
        queues.enqueue("zeta", ());
        queues.enqueue("alpha", ());
        queues.enqueue("alpha", ());

        let snapshot = queues.snapshot();
        assert_eq!(
            snapshot,
            vec![
                QueueSnapshot { name: "alpha".into(), size: 2 },
                QueueSnapshot { name: "zeta".into(), size: 1 },
            ]
        );
    }
}
