/// Session undo log for marking edits
///
/// Only creations and deletions are recorded; position drags and style
/// edits are not undoable. The log lives in memory for one editing session
/// and is never persisted.

use std::collections::VecDeque;

use super::data::Marking;

/// Maximum number of actions kept; the oldest fall off first
pub const UNDO_CAPACITY: usize = 50;

/// A reversible action
#[derive(Debug, Clone, PartialEq)]
pub enum UndoAction {
    /// A marking with this id was created
    Create(i64),
    /// This marking was deleted (full record kept for restoring)
    Delete(Marking),
}

/// Bounded last-in-first-out action log
#[derive(Debug, Clone)]
pub struct UndoLog {
    actions: VecDeque<UndoAction>,
    capacity: usize,
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::with_capacity(UNDO_CAPACITY)
    }
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            actions: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Record an action, dropping the oldest one when full
    pub fn push(&mut self, action: UndoAction) {
        if self.actions.len() == self.capacity {
            self.actions.pop_front();
        }
        self.actions.push_back(action);
    }

    /// Take the most recent action
    pub fn pop(&mut self) -> Option<UndoAction> {
        self.actions.pop_back()
    }

    /// Put an action back on top, e.g. after undoing it failed
    pub fn restore(&mut self, action: UndoAction) {
        self.push(action);
    }

    pub fn peek(&self) -> Option<&UndoAction> {
        self.actions.back()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}
