//! Fragment manager
//!
//! Owns the working fragment, its linear undo/redo history and the list of
//! committed fragments. Every successful edit recomputes metadata and is
//! snapshotted into history; rejected edits leave both untouched.

pub mod validation;

pub use validation::FragmentError;

use crate::models::fragment::now_rfc3339;
use crate::models::{Fragment, KeySignature, MusicalElement, TimeSignature};
use crate::undo::{History, HistoryAction, HistoryEntry};
use validation::{validate_element, validate_tempo, validate_time_signature};

/// Default number of history entries kept
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Canonical owner of the working fragment
#[derive(Clone, Debug)]
pub struct FragmentManager {
    fragment: Fragment,
    history: History,
    committed: Vec<Fragment>,
}

impl Default for FragmentManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl FragmentManager {
    /// Create a manager with an empty working fragment
    pub fn new(max_history: usize) -> Self {
        let fragment = Fragment::new();
        let history = History::new(HistoryEntry::new(fragment.clone(), HistoryAction::Clear), max_history);
        Self {
            fragment,
            history,
            committed: Vec::new(),
        }
    }

    /// Validate and append an element
    ///
    /// Inline time/key signature and tempo markers also update the header.
    pub fn add_element(&mut self, element: MusicalElement) -> Result<(), FragmentError> {
        validate_element(&self.fragment, &element).inspect_err(|e| {
            log::debug!("rejected {}: {}", element.kind_name(), e);
        })?;

        match &element {
            MusicalElement::TimeSignature(time_signature) => self.fragment.time_signature = *time_signature,
            MusicalElement::KeySignature(key_signature) => self.fragment.key_signature = *key_signature,
            MusicalElement::Tempo { bpm } => self.fragment.tempo = *bpm,
            _ => {}
        }

        log::debug!("add {} at {}", element.kind_name(), self.fragment.len());
        self.fragment.elements.push(element);
        self.record(HistoryAction::Add);
        Ok(())
    }

    /// Remove and return the last element
    pub fn delete_last_element(&mut self) -> Option<MusicalElement> {
        let element = self.fragment.elements.pop()?;
        self.record(HistoryAction::Delete);
        Some(element)
    }

    /// Remove every element, keeping header state
    ///
    /// Returns false when there was nothing to clear.
    pub fn clear(&mut self) -> bool {
        if self.fragment.is_empty() {
            return false;
        }
        self.fragment = self.fragment.successor();
        self.record(HistoryAction::Clear);
        true
    }

    /// Step back one history entry
    pub fn undo(&mut self) -> bool {
        match self.history.step_back() {
            Some(entry) => {
                self.fragment = entry.fragment.clone();
                true
            }
            None => false,
        }
    }

    /// Step forward one history entry
    pub fn redo(&mut self) -> bool {
        match self.history.step_forward() {
            Some(entry) => {
                self.fragment = entry.fragment.clone();
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Archive the working fragment and start a new one
    ///
    /// The new working fragment keeps the header state and history restarts
    /// from it. Fails without side effects when the fragment is empty.
    pub fn commit(&mut self) -> Result<Fragment, FragmentError> {
        if self.fragment.is_empty() {
            return Err(FragmentError::EmptyFragment);
        }

        let next = self.fragment.successor();
        let mut committed = std::mem::replace(&mut self.fragment, next);
        committed.committed_at = Some(now_rfc3339());
        committed.refresh_metadata();

        log::info!(
            "committed fragment {} ({} elements, {})",
            committed.id,
            committed.len(),
            committed.metadata.total_duration
        );

        self.committed.push(committed.clone());
        self.history
            .reset(HistoryEntry::new(self.fragment.clone(), HistoryAction::Clear));
        Ok(committed)
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) -> Result<(), FragmentError> {
        validate_time_signature(&time_signature)?;
        self.fragment.time_signature = time_signature;
        self.record(HistoryAction::Modify);
        Ok(())
    }

    pub fn set_key_signature(&mut self, key_signature: KeySignature) {
        self.fragment.key_signature = key_signature;
        self.record(HistoryAction::Modify);
    }

    pub fn set_tempo(&mut self, bpm: u16) -> Result<(), FragmentError> {
        validate_tempo(bpm)?;
        self.fragment.tempo = bpm;
        self.record(HistoryAction::Modify);
        Ok(())
    }

    /// Borrow the working fragment
    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    /// Owned copy of the working fragment
    pub fn snapshot(&self) -> Fragment {
        self.fragment.clone()
    }

    pub fn elements(&self) -> &[MusicalElement] {
        &self.fragment.elements
    }

    pub fn len(&self) -> usize {
        self.fragment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragment.is_empty()
    }

    /// Previously committed fragments, oldest first
    pub fn committed(&self) -> &[Fragment] {
        &self.committed
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Change the history bound; oldest entries are evicted if needed
    pub fn set_max_history(&mut self, max_history: usize) {
        self.history.set_max_entries(max_history);
    }

    fn record(&mut self, action: HistoryAction) {
        self.fragment.refresh_metadata();
        self.history
            .push(HistoryEntry::new(self.fragment.clone(), action));
    }
}
