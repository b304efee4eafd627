use crate::models::fragment::now_rfc3339;
use crate::models::Fragment;
use serde::{Deserialize, Serialize};

/// Kind of edit that produced a history entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Add,
    Delete,
    Clear,
    Modify,
}

/// Immutable snapshot of a fragment after an edit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub fragment: Fragment,
    pub action: HistoryAction,
    /// RFC 3339 wall-clock time of the edit
    pub timestamp: String,
}

impl HistoryEntry {
    pub fn new(fragment: Fragment, action: HistoryAction) -> Self {
        Self {
            fragment,
            action,
            timestamp: now_rfc3339(),
        }
    }
}

/// Bounded linear undo/redo history of fragment snapshots
///
/// The cursor always points at the entry matching the working fragment.
/// Pushing truncates everything after the cursor, so there is no branching.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    /// Maximum number of entries to keep
    max_entries: usize,
}

impl History {
    /// Create a history holding only `initial`
    pub fn new(initial: HistoryEntry, max_entries: usize) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            max_entries: max_entries.max(1),
        }
    }

    /// Record a new entry after the cursor
    pub fn push(&mut self, entry: HistoryEntry) {
        // Truncate any redo history when a new entry is added
        self.entries.truncate(self.cursor + 1);
        self.entries.push(entry);
        self.cursor = self.entries.len() - 1;
        self.enforce_limit();
    }

    /// Move the cursor back one entry and return the entry now current
    pub fn step_back(&mut self) -> Option<&HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Move the cursor forward one entry and return the entry now current
    pub fn step_forward(&mut self) -> Option<&HistoryEntry> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    /// Drop all entries and start over from `initial`
    pub fn reset(&mut self, initial: HistoryEntry) {
        self.entries.clear();
        self.entries.push(initial);
        self.cursor = 0;
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Change the bound, evicting the oldest entries if needed
    pub fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries.max(1);
        self.enforce_limit();
    }

    /// Get the number of available undo steps
    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    /// Get the number of available redo steps
    pub fn redo_count(&self) -> usize {
        self.entries.len() - self.cursor - 1
    }

    fn enforce_limit(&mut self) {
        while self.entries.len() > self.max_entries {
            if self.cursor > 0 {
                self.entries.remove(0);
                self.cursor -= 1;
            } else {
                // The current entry is the oldest one; shed redo entries instead
                self.entries.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with_tempo(tempo: u16, action: HistoryAction) -> HistoryEntry {
        let mut fragment = Fragment::new();
        fragment.tempo = tempo;
        HistoryEntry::new(fragment, action)
    }

    #[test]
    fn test_history_basic() {
        let mut history = History::new(entry_with_tempo(100, HistoryAction::Clear), 10);
        assert!(!history.can_undo());
        assert!(!history.can_redo());

        history.push(entry_with_tempo(101, HistoryAction::Modify));
        assert!(history.can_undo());
        assert!(!history.can_redo());

        assert_eq!(history.step_back().unwrap().fragment.tempo, 100);
        assert!(!history.can_undo());
        assert!(history.can_redo());

        assert_eq!(history.step_forward().unwrap().fragment.tempo, 101);
        assert!(history.step_forward().is_none());
    }

    #[test]
    fn test_push_truncates_redo() {
        let mut history = History::new(entry_with_tempo(100, HistoryAction::Clear), 10);
        history.push(entry_with_tempo(101, HistoryAction::Modify));
        history.push(entry_with_tempo(102, HistoryAction::Modify));
        history.step_back();
        history.step_back();

        history.push(entry_with_tempo(200, HistoryAction::Modify));
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert_eq!(history.current().unwrap().fragment.tempo, 200);
    }

    #[test]
    fn test_max_size_enforcement() {
        let mut history = History::new(entry_with_tempo(0, HistoryAction::Clear), 3);

        for i in 1..=5 {
            history.push(entry_with_tempo(i, HistoryAction::Modify));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 2);
        assert_eq!(history.entries()[0].fragment.tempo, 3);
        assert_eq!(history.undo_count(), 2);
    }

    #[test]
    fn test_shrinking_limit_keeps_cursor_valid() {
        let mut history = History::new(entry_with_tempo(0, HistoryAction::Clear), 10);
        for i in 1..=4 {
            history.push(entry_with_tempo(i, HistoryAction::Modify));
        }
        history.step_back();

        history.set_max_entries(2);
        assert_eq!(history.len(), 2);
        assert!(history.current().is_some());
        assert_eq!(history.current().unwrap().fragment.tempo, 3);
        assert_eq!(history.redo_count(), 1);
    }

    #[test]
    fn test_reset() {
        let mut history = History::new(entry_with_tempo(0, HistoryAction::Clear), 10);
        history.push(entry_with_tempo(1, HistoryAction::Add));
        history.reset(entry_with_tempo(7, HistoryAction::Clear));

        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
