//! # Undo/Redo Stack
//!
//! Inverse-operation history, bounded by edit count rather than tree size.
//!
//! ## Design
//!
//! - Each committed batch records the ops it applied (normalization repairs
//!   included) and their inverses in reverse order
//! - Undo replays the inverses as one new atomic batch; redo replays the
//!   forward ops
//! - New batches clear the redo stack
//! - History resets only on full document replacement, never partially

use blockdoc_model::Range;

use crate::ops::Op;

/// One undoable unit: everything a committed batch applied, plus the
/// selection on either side of it.
#[derive(Debug, Clone)]
pub struct EditBatch {
    /// Ops in application order, including normalization repairs.
    pub ops: Vec<Op>,

    /// Inverse ops in reverse application order.
    pub inverses: Vec<Op>,

    pub selection_before: Option<Range>,
    pub selection_after: Option<Range>,

    /// Short label for debugging and logging.
    pub description: Option<String>,
}

/// Undo/redo stack for document editing.
#[derive(Debug, Default)]
pub struct UndoStack {
    undo_stack: Vec<EditBatch>,
    redo_stack: Vec<EditBatch>,
    /// Maximum number of undo levels (0 = unlimited).
    max_levels: usize,
}

impl UndoStack {
    /// New stack with the default bound of 100 levels.
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record a freshly committed batch. Invalidates the redo future.
    pub fn push(&mut self, batch: EditBatch) {
        self.undo_stack.push(batch);
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Take the most recent batch for undoing.
    pub(crate) fn pop_undo(&mut self) -> Option<EditBatch> {
        self.undo_stack.pop()
    }

    /// Park an undone batch on the redo stack.
    pub(crate) fn push_undone(&mut self, batch: EditBatch) {
        self.redo_stack.push(batch);
    }

    /// Take the most recently undone batch for redoing.
    pub(crate) fn pop_redo(&mut self) -> Option<EditBatch> {
        self.redo_stack.pop()
    }

    /// Put a redone batch back on the undo stack without clearing redo.
    pub(crate) fn push_redone(&mut self, batch: EditBatch) {
        self.undo_stack.push(batch);
    }

    /// Put a batch back after a failed replay.
    pub(crate) fn restore_undo(&mut self, batch: EditBatch) {
        self.undo_stack.push(batch);
    }

    pub(crate) fn restore_redo(&mut self, batch: EditBatch) {
        self.redo_stack.push(batch);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Drop all history. Called on full document replacement.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }
}
