//! Cancellable scheduled tasks
//!
//! Each [`TimerKind`] has at most one task in flight: scheduling a kind
//! replaces any pending task of that kind. The queue never fires on its own;
//! the orchestrator drains due tasks when the host calls `tick()`.

use serde::Serialize;

/// The concerns that own a timer
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TimerKind {
    ChordTimeout,
    PreviewDebounce,
    AutoCommit,
}

/// Handle returned by [`TimerQueue::schedule`]
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Clone, Copy, Debug)]
struct ScheduledTask {
    id: TimerId,
    kind: TimerKind,
    due_ms: u64,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    tasks: Vec<ScheduledTask>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` to fire `delay_ms` after `now_ms`, replacing any
    /// pending task of the same kind
    pub fn schedule(&mut self, kind: TimerKind, now_ms: u64, delay_ms: u64) -> TimerId {
        self.cancel(kind);
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.tasks.push(ScheduledTask {
            id,
            kind,
            due_ms: now_ms.saturating_add(delay_ms),
        });
        id
    }

    /// Cancel the pending task of `kind`; true if one existed
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.kind != kind);
        self.tasks.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.tasks.iter().any(|task| task.kind == kind)
    }

    pub fn pending_id(&self, kind: TimerKind) -> Option<TimerId> {
        self.tasks.iter().find(|task| task.kind == kind).map(|task| task.id)
    }

    /// Earliest due time among pending tasks
    pub fn next_deadline(&self) -> Option<u64> {
        self.tasks.iter().map(|task| task.due_ms).min()
    }

    /// Remove and return the next task due at or before `now_ms`
    pub fn pop_due(&mut self, now_ms: u64) -> Option<TimerKind> {
        let index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due_ms <= now_ms)
            .min_by_key(|(_, task)| (task.due_ms, task.id.0))
            .map(|(index, _)| index)?;
        Some(self.tasks.remove(index).kind)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
