//! Wall-clock abstraction
//!
//! The shortcut engine stamps chord notes and the capture orchestrator fires
//! timers against a [`Clock`]. Hosts inject [`SystemClock`]; tests drive a
//! [`ManualClock`].

use std::cell::Cell;

/// Source of wall-clock milliseconds
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Real time, via chrono (works on wasm through `wasmbind`)
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Manually advanced clock
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}
