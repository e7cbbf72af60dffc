//! Conversation Memory
//!
//! A bounded, process-wide record of the most recent pipeline turns. Each
//! entry is filed under one category (intent classification, data API call,
//! design API call). When the memory is full, appending evicts the oldest
//! entry first. Nothing is persisted; a restart starts empty.

use sdk::types::{ConversationEntry, MemorySnapshot};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default number of entries kept
pub const DEFAULT_CAPACITY: usize = 5;

/// FIFO ring of conversation entries, safe to share between requests
#[derive(Debug)]
pub struct ConversationMemory {
    entries: Mutex<VecDeque<ConversationEntry>>,
    capacity: usize,
}

impl ConversationMemory {
    /// Create a memory holding at most `capacity` entries (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest one if the memory is full
    pub fn append(&self, entry: ConversationEntry) {
        let mut entries = self.lock();
        if entries.len() == self.capacity {
            if let Some(evicted) = entries.pop_front() {
                tracing::debug!(
                    category = %evicted.category,
                    "Evicted oldest conversation entry"
                );
            }
        }
        entries.push_back(entry);
    }

    /// Categorized copy of the current contents
    pub fn snapshot(&self) -> MemorySnapshot {
        let entries = self.lock();
        MemorySnapshot::from_entries(entries.iter(), self.capacity)
    }

    /// Entries in insertion order
    pub fn entries(&self) -> Vec<ConversationEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<ConversationEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::types::EntryCategory;
    use std::sync::Arc;

    fn entry(input: &str) -> ConversationEntry {
        ConversationEntry::new(EntryCategory::ApiCall, input, "ok")
    }

    #[test]
    fn test_new_memory_is_empty() {
        let memory = ConversationMemory::default();
        assert!(memory.is_empty());
        assert_eq!(memory.capacity(), DEFAULT_CAPACITY);
        assert_eq!(memory.snapshot().count, 0);
    }

    #[test]
    fn test_append_evicts_oldest_when_full() {
        let memory = ConversationMemory::new(3);
        for input in ["a", "b", "c", "d"] {
            memory.append(entry(input));
        }

        let inputs: Vec<_> = memory
            .entries()
            .into_iter()
            .map(|e| e.input_summary)
            .collect();
        assert_eq!(inputs, vec!["b", "c", "d"]);
        assert_eq!(memory.len(), 3);
    }

    #[test]
    fn test_clear() {
        let memory = ConversationMemory::new(2);
        memory.append(entry("a"));
        memory.clear();

        let snapshot = memory.snapshot();
        assert_eq!(snapshot.count, 0);
        assert!(snapshot.api_calls.is_empty());
        assert_eq!(snapshot.capacity, 2);
    }

    #[test]
    fn test_zero_capacity_is_treated_as_one() {
        let memory = ConversationMemory::new(0);
        memory.append(entry("a"));
        memory.append(entry("b"));

        assert_eq!(memory.capacity(), 1);
        assert_eq!(memory.entries()[0].input_summary, "b");
    }

    #[test]
    fn test_snapshot_groups_categories() {
        let memory = ConversationMemory::new(5);
        memory.append(ConversationEntry::new(
            EntryCategory::IntentClassification,
            "hi",
            "hello",
        ));
        memory.append(entry("usage"));
        memory.append(ConversationEntry::new(EntryCategory::DesignCall, "form", "ok"));

        let snapshot = memory.snapshot();
        assert_eq!(snapshot.count, 3);
        assert_eq!(snapshot.intent_classifications.len(), 1);
        assert_eq!(snapshot.api_calls.len(), 1);
        assert_eq!(snapshot.design_calls.len(), 1);
    }

    #[test]
    fn test_concurrent_appends_respect_capacity() {
        let memory = Arc::new(ConversationMemory::new(5));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let memory = Arc::clone(&memory);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        memory.append(entry(&format!("{}-{}", t, i)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(memory.len(), 5);
        assert_eq!(memory.snapshot().count, 5);
    }
}
