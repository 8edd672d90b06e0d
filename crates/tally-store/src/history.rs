//! Bounded linear undo/redo over whole-collection snapshots.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Undo/redo depth, exposed so clients can enable or disable their controls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryDepth {
    pub undo: usize,
    pub redo: usize,
}

/// Snapshot stack with a redo list.
///
/// `states` runs oldest to newest and its last element is the current state.
/// `future` holds undone states, nearest first. Any push clears `future`.
#[derive(Clone, Debug)]
pub struct SnapshotHistory<T> {
    capacity: usize,
    states: VecDeque<T>,
    future: VecDeque<T>,
}

impl<T: Clone> SnapshotHistory<T> {
    /// Create a history seeded with `initial` as the current state.
    /// A capacity below 1 is raised to 1.
    pub fn new(capacity: usize, initial: T) -> Self {
        let mut history = Self {
            capacity: capacity.max(1),
            states: VecDeque::new(),
            future: VecDeque::new(),
        };
        history.reset(initial);
        history
    }

    /// Discard all history and make `snapshot` the only state.
    pub fn reset(&mut self, snapshot: T) {
        self.future.clear();
        self.states.clear();
        self.states.push_back(snapshot);
    }

    /// Record a new current state, evicting the oldest beyond capacity.
    pub fn push(&mut self, snapshot: T) {
        self.future.clear();
        self.states.push_back(snapshot);
        while self.states.len() > self.capacity {
            self.states.pop_front();
        }
    }

    /// Step back one state and return the state to restore.
    pub fn undo(&mut self) -> StoreResult<T> {
        if self.states.len() <= 1 {
            return Err(StoreError::UndoUnavailable);
        }
        if let Some(current) = self.states.pop_back() {
            self.future.push_front(current);
        }
        self.states
            .back()
            .cloned()
            .ok_or(StoreError::UndoUnavailable)
    }

    /// Step forward one undone state and return the state to restore.
    pub fn redo(&mut self) -> StoreResult<T> {
        let next = self.future.pop_front().ok_or(StoreError::RedoUnavailable)?;
        self.states.push_back(next.clone());
        Ok(next)
    }

    pub fn undo_count(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    pub fn redo_count(&self) -> usize {
        self.future.len()
    }

    pub fn depth(&self) -> HistoryDepth {
        HistoryDepth {
            undo: self.undo_count(),
            redo: self.redo_count(),
        }
    }
}
