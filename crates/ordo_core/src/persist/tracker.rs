//! Save-action status tracking for UI indicators.
//!
//! One drop is one action regardless of how many store calls it fans out to.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Aggregate status shown by save indicators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving { in_flight: usize },
    Saved,
    Failed { message: String },
}

/// Lifetime counters of tracked actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveCounters {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug)]
struct TrackerState {
    in_flight: usize,
    last: SaveStatus,
    counters: SaveCounters,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self {
            in_flight: 0,
            last: SaveStatus::Idle,
            counters: SaveCounters::default(),
        }
    }
}

/// Shared tracker handle; clones observe the same actions.
#[derive(Debug, Clone, Default)]
pub struct SaveTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl SaveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens one action. It finishes through [`SaveAction::succeed`] or
    /// [`SaveAction::fail`]; dropping it unfinished counts as failure.
    pub fn begin(&self) -> SaveAction {
        let mut state = self.state();
        state.in_flight += 1;
        state.counters.started += 1;
        SaveAction {
            tracker: self.clone(),
            finished: false,
        }
    }

    pub fn status(&self) -> SaveStatus {
        let state = self.state();
        if state.in_flight > 0 {
            return SaveStatus::Saving {
                in_flight: state.in_flight,
            };
        }
        state.last.clone()
    }

    pub fn counters(&self) -> SaveCounters {
        self.state().counters
    }

    fn finish(&self, outcome: SaveStatus) {
        let mut state = self.state();
        state.in_flight = state.in_flight.saturating_sub(1);
        match &outcome {
            SaveStatus::Failed { .. } => state.counters.failed += 1,
            _ => state.counters.succeeded += 1,
        }
        // A failure stays visible until a later action succeeds.
        state.last = outcome;
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One in-flight tracked action.
#[derive(Debug)]
pub struct SaveAction {
    tracker: SaveTracker,
    finished: bool,
}

impl SaveAction {
    pub fn succeed(mut self) {
        self.finished = true;
        self.tracker.finish(SaveStatus::Saved);
    }

    pub fn fail(mut self, message: impl Into<String>) {
        self.finished = true;
        self.tracker.finish(SaveStatus::Failed {
            message: message.into(),
        });
    }
}

impl Drop for SaveAction {
    fn drop(&mut self) {
        if !self.finished {
            self.tracker.finish(SaveStatus::Failed {
                message: "save action abandoned".to_string(),
            });
        }
    }
}
