//! # Drag Reorder & Column Synthesis Engine
//!
//! Translates pointer-drag sessions into move/wrap batches. The session is an
//! explicit value with a start/over/end/cancel lifecycle, not ambient UI
//! state. One session exists at a time, and drag-end applies exactly one
//! batch (or none, when the pointer is released outside a valid target).
//!
//! Column synthesis: dragging one root-level block onto another with the
//! cursor past 40% of the target's width wraps both into a two-cell
//! side-by-side column. The left/right placement is a separate, two-sided
//! midpoint comparison. Cells emptied by later drags and single-cell columns
//! dissolve through the shared normalization pass, inside the same batch.

use blockdoc_model::{Block, BlockKind, Child, Path};
use serde::{Deserialize, Serialize};

use crate::editor::{Editor, Patch};
use crate::errors::TransformError;
use crate::ops::Op;

/// Horizontal fraction of the target's width past which a drop synthesizes a
/// column instead of reordering.
const COLUMN_THRESHOLD: f64 = 0.4;

/// Which cell the dragged block lands in when a column is synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropSide {
    Left,
    Right,
}

/// State of the drag currently in flight.
#[derive(Debug, Clone)]
pub struct DragSession {
    pub active_id: String,
    pub over_id: Option<String>,
    pub creating_column: bool,
    pub drop_side: DropSide,
}

/// Geometry reported by the UI while dragging over a target block.
#[derive(Debug, Clone)]
pub struct DragOverEvent {
    pub over_id: String,
    pub cursor_x: f64,
    pub target_left: f64,
    pub target_width: f64,
}

impl Editor {
    /// Begin a drag session for the block carrying `active_id`.
    pub fn drag_start(&mut self, active_id: &str) {
        if self.drag.is_some() {
            tracing::warn!(active_id, "replacing unfinished drag session");
        }
        self.drag = Some(DragSession {
            active_id: active_id.to_string(),
            over_id: None,
            creating_column: false,
            drop_side: DropSide::Right,
        });
    }

    /// Update the session with the pointer's position over a target block.
    ///
    /// Column creation is only eligible when both blocks sit at root depth.
    pub fn drag_over(&mut self, event: DragOverEvent) {
        let Some(active_id) = self.drag.as_ref().map(|s| s.active_id.clone()) else {
            return;
        };
        let root_pair = self.path_of(&active_id).is_some_and(|p| p.len() == 1)
            && self.path_of(&event.over_id).is_some_and(|p| p.len() == 1);
        let fraction = if event.target_width > 0.0 {
            (event.cursor_x - event.target_left) / event.target_width
        } else {
            0.0
        };

        if let Some(session) = self.drag.as_mut() {
            session.over_id = Some(event.over_id.clone());
            if root_pair && event.over_id != active_id {
                session.creating_column = fraction > COLUMN_THRESHOLD;
                session.drop_side = if fraction >= 0.5 {
                    DropSide::Right
                } else {
                    DropSide::Left
                };
            } else {
                session.creating_column = false;
            }
        }
    }

    /// Finish the session and apply its single batch. `Ok(None)` when the
    /// release was a no-op: no session, no target, target == source, or an id
    /// that no longer resolves.
    pub fn drag_end(&mut self) -> Result<Option<Patch>, TransformError> {
        let Some(session) = self.drag.take() else {
            return Ok(None);
        };
        let Some(over_id) = session.over_id else {
            return Ok(None);
        };
        if over_id == session.active_id {
            return Ok(None);
        }
        let Some(from) = self.path_of(&session.active_id) else {
            tracing::warn!(id = %session.active_id, "dragged block vanished, dropping session");
            return Ok(None);
        };
        let Some(to) = self.path_of(&over_id) else {
            tracing::warn!(id = %over_id, "drop target vanished, dropping session");
            return Ok(None);
        };

        if from.len() == 1 && to.len() == 1 && session.creating_column {
            return self
                .synthesize_column(&from, &to, session.drop_side)
                .map(Some);
        }

        // Dropping downward lands after the target, upward lands before it,
        // keeping visual order stable.
        let adjusted = match (from.index(), to.index()) {
            (Some(f), Some(t)) if from.is_sibling_of(&to) && f < t => to
                .next()
                .ok_or_else(|| TransformError::InvalidPath(to.clone()))?,
            _ => to.clone(),
        };
        let patch = self.apply_batch(
            vec![Op::MoveNode { from, to: adjusted }],
            "move-block",
        )?;
        Ok(Some(patch))
    }

    /// Discard the session without applying anything.
    pub fn drag_cancel(&mut self) {
        self.drag = None;
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Wrap the target and the dragged block into a fresh two-cell column at
    /// the target's position, one batch.
    fn synthesize_column(
        &mut self,
        from: &Path,
        to: &Path,
        side: DropSide,
    ) -> Result<Patch, TransformError> {
        let column_id = self.new_id();
        let cells = vec![
            Child::Block(Block::with_children(
                self.new_id(),
                BlockKind::ColumnCell,
                vec![],
            )),
            Child::Block(Block::with_children(
                self.new_id(),
                BlockKind::ColumnCell,
                vec![],
            )),
        ];
        let column = Block::with_children(column_id, BlockKind::Column, cells);

        let (target_cell, source_cell) = match side {
            DropSide::Right => (0, 1),
            DropSide::Left => (1, 0),
        };

        let insert_at = to
            .next()
            .ok_or_else(|| TransformError::InvalidPath(to.clone()))?;
        let ops = vec![
            Op::InsertNode {
                at: insert_at.clone(),
                node: Child::Block(column),
            },
            // The target slides into its cell, leaving the column at the
            // target's former position.
            Op::MoveNode {
                from: to.clone(),
                to: insert_at.child(target_cell).child(0),
            },
            Op::MoveNode {
                from: from.clone(),
                to: to.child(source_cell).child(0),
            },
        ];
        self.apply_batch(ops, "create-column")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> Editor {
        let mut editor = Editor::new("drag-tests");
        editor
            .load(vec![
                Block::with_text("b-1", BlockKind::Paragraph, "one"),
                Block::with_text("b-2", BlockKind::Paragraph, "two"),
                Block::with_text("b-3", BlockKind::Paragraph, "three"),
            ])
            .unwrap();
        editor
    }

    fn over(over_id: &str, cursor_x: f64) -> DragOverEvent {
        DragOverEvent {
            over_id: over_id.to_string(),
            cursor_x,
            target_left: 0.0,
            target_width: 100.0,
        }
    }

    #[test]
    fn test_over_threshold_arms_column_creation() {
        let mut e = editor();
        e.drag_start("b-1");

        e.drag_over(over("b-2", 41.0));
        let session = e.drag_session().unwrap();
        assert!(session.creating_column);
        assert_eq!(session.drop_side, DropSide::Left);

        e.drag_over(over("b-2", 75.0));
        let session = e.drag_session().unwrap();
        assert!(session.creating_column);
        assert_eq!(session.drop_side, DropSide::Right);

        e.drag_over(over("b-2", 39.0));
        assert!(!e.drag_session().unwrap().creating_column);
    }

    #[test]
    fn test_over_self_never_arms_column() {
        let mut e = editor();
        e.drag_start("b-1");
        e.drag_over(over("b-1", 90.0));
        assert!(!e.drag_session().unwrap().creating_column);
    }

    #[test]
    fn test_end_without_target_is_noop() {
        let mut e = editor();
        e.drag_start("b-1");
        let patch = e.drag_end().unwrap();
        assert!(patch.is_none());
        assert_eq!(e.version(), 0);
        assert!(e.drag_session().is_none());
    }

    #[test]
    fn test_cancel_discards_session() {
        let mut e = editor();
        e.drag_start("b-1");
        e.drag_over(over("b-2", 80.0));
        e.drag_cancel();
        assert!(e.drag_session().is_none());
        assert_eq!(e.version(), 0);
    }

    #[test]
    fn test_downward_move_lands_after_target() {
        let mut e = editor();
        e.drag_start("b-1");
        e.drag_over(over("b-3", 10.0));
        e.drag_end().unwrap().unwrap();

        let order: Vec<&str> = e.document().blocks().map(|b| b.id.as_str()).collect();
        assert_eq!(order, vec!["b-2", "b-3", "b-1"]);
    }

    #[test]
    fn test_upward_move_lands_before_target() {
        let mut e = editor();
        e.drag_start("b-3");
        e.drag_over(over("b-1", 10.0));
        e.drag_end().unwrap().unwrap();

        let order: Vec<&str> = e.document().blocks().map(|b| b.id.as_str()).collect();
        assert_eq!(order, vec!["b-3", "b-1", "b-2"]);
    }
}
