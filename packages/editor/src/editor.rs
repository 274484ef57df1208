//! # Editor Handle
//!
//! The single entry point collaborators hold: owns the document tree, the
//! selection, the undo history, and the id generator, and applies every edit
//! as one atomic batch.
//!
//! ## Batch Lifecycle
//!
//! ```text
//! ops → validate/invert/apply (working copy) → normalize → remap selection
//!     → commit: swap tree, bump version, record inverses, notify once
//! ```
//!
//! Any failure mid-batch drops the working copy: the committed tree,
//! selection, version, and history are untouched and the abort is logged.

use blockdoc_model::{query, Block, BlockKind, Child, Document, IdGenerator, Path, Range};
use serde::Serialize;

use crate::drag::DragSession;
use crate::errors::{EditorError, TransformError};
use crate::history::{EditBatch, UndoStack};
use crate::normalize;
use crate::ops::Op;
use crate::selection::{self, RangeXform};

/// Runaway guard for the normalization fixpoint loop.
const MAX_NORMALIZE_ROUNDS: usize = 10_000;

/// What a committed batch tells the outside world.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patch {
    pub version: u64,
    pub selection: Option<Range>,
}

/// Partial property update for [`Editor::set_nodes`]. Unset fields leave the
/// current value in place.
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
    pub kind: Option<BlockKind>,
    pub latex: Option<String>,
    pub alt_text: Option<String>,
    pub correct_answer: Option<bool>,
    pub question_number: Option<u32>,
    pub zoom: Option<u32>,
    pub width: Option<String>,
    pub audio_url: Option<String>,
    pub voice_id: Option<String>,
}

type ChangeCallback = Box<dyn FnMut(&Document, &Patch)>;

/// The structured document editing core.
pub struct Editor {
    doc: Document,
    selection: Option<Range>,
    version: u64,
    history: UndoStack,
    ids: IdGenerator,
    on_change: Option<ChangeCallback>,
    pub(crate) drag: Option<DragSession>,
}

struct BatchOutcome {
    doc: Document,
    selection: Option<Range>,
    applied: Vec<Op>,
    inverses: Vec<Op>,
    ids: IdGenerator,
}

impl Editor {
    /// New editor for a workspace, holding a single empty paragraph with the
    /// cursor at its start.
    pub fn new(workspace_id: &str) -> Self {
        let mut ids = IdGenerator::new(workspace_id);
        let paragraph = Block::new(ids.new_id(), BlockKind::Paragraph);
        let doc = Document::new(vec![paragraph]);
        let selection = query::start_point(&doc, &Path::from(vec![0])).map(Range::collapsed);
        Self {
            doc,
            selection,
            version: 0,
            history: UndoStack::new(),
            ids,
            on_change: None,
            drag: None,
        }
    }

    /// Replace the document with an ordered sequence of root blocks.
    ///
    /// Validates ids and structural arity (`MalformedInsert` on violation),
    /// advances the id generator past every loaded id, and resets history,
    /// version, and selection. This is the only operation that resets history.
    pub fn load(&mut self, blocks: Vec<Block>) -> Result<(), EditorError> {
        let mut doc = Document::default();
        for (index, block) in blocks.into_iter().enumerate() {
            let op = Op::InsertNode {
                at: Path::from(vec![index]),
                node: Child::Block(block),
            };
            op.validate(&doc)?;
            op.apply(&mut doc)?;
        }

        let mut ids = self.ids.clone();
        for (_, block) in query::blocks(&doc) {
            ids.bump_past(&block.id);
        }

        // Bring a loosely-shaped load up to the invariants before editing.
        normalize_in_place(&mut doc, &mut ids)?;

        self.doc = doc;
        self.ids = ids;
        self.selection = None;
        self.version = 0;
        self.history.clear();
        self.drag = None;
        Ok(())
    }

    /// Apply a batch of primitive ops as one atomic, undoable unit.
    pub fn apply_batch(
        &mut self,
        ops: Vec<Op>,
        description: impl Into<String>,
    ) -> Result<Patch, TransformError> {
        let description = description.into();
        if ops.is_empty() {
            return Ok(self.current_patch());
        }
        match self.try_apply(&ops) {
            Ok(outcome) => Ok(self.commit(outcome, description)),
            Err(error) => {
                tracing::warn!(batch = %description, %error, "batch aborted, tree unchanged");
                Err(error)
            }
        }
    }

    fn try_apply(&self, ops: &[Op]) -> Result<BatchOutcome, TransformError> {
        let mut doc = self.doc.clone();
        let mut selection = self.selection.clone();
        let mut ids = self.ids.clone();
        let mut applied = Vec::new();
        let mut inverses = Vec::new();

        for op in ops {
            apply_one(&mut doc, &mut selection, &mut applied, &mut inverses, op)?;
        }

        let mut rounds = 0;
        while let Some(step) = normalize::repair_step(&doc, &mut ids) {
            rounds += 1;
            if rounds > MAX_NORMALIZE_ROUNDS {
                tracing::warn!("normalization did not converge, giving up");
                break;
            }
            for op in step {
                apply_one(&mut doc, &mut selection, &mut applied, &mut inverses, &op)?;
            }
        }

        Ok(BatchOutcome {
            doc,
            selection,
            applied,
            inverses,
            ids,
        })
    }

    fn commit(&mut self, outcome: BatchOutcome, description: String) -> Patch {
        let selection_before = self.selection.clone();
        self.doc = outcome.doc;
        self.selection = outcome.selection;
        self.ids = outcome.ids;
        self.version += 1;
        self.history.push(EditBatch {
            ops: outcome.applied,
            inverses: outcome.inverses,
            selection_before,
            selection_after: self.selection.clone(),
            description: Some(description),
        });
        let patch = self.current_patch();
        self.notify(&patch);
        patch
    }

    /// Undo the most recent batch. `Ok(None)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<Option<Patch>, TransformError> {
        let Some(batch) = self.history.pop_undo() else {
            return Ok(None);
        };
        match self.replay(&batch.inverses, batch.selection_before.clone()) {
            Ok(patch) => {
                self.history.push_undone(batch);
                Ok(Some(patch))
            }
            Err(error) => {
                self.history.restore_undo(batch);
                tracing::warn!(%error, "undo aborted, tree unchanged");
                Err(error)
            }
        }
    }

    /// Redo the most recently undone batch.
    pub fn redo(&mut self) -> Result<Option<Patch>, TransformError> {
        let Some(batch) = self.history.pop_redo() else {
            return Ok(None);
        };
        match self.replay(&batch.ops, batch.selection_after.clone()) {
            Ok(patch) => {
                self.history.push_redone(batch);
                Ok(Some(patch))
            }
            Err(error) => {
                self.history.restore_redo(batch);
                tracing::warn!(%error, "redo aborted, tree unchanged");
                Err(error)
            }
        }
    }

    /// Replay recorded ops verbatim, then settle invariants without
    /// recording anything: undoing a merge leaves the junction leaves
    /// unfused, and the silent pass restores the normalized pre-batch shape
    /// exactly. No new history is recorded.
    fn replay(
        &mut self,
        ops: &[Op],
        selection: Option<Range>,
    ) -> Result<Patch, TransformError> {
        let mut doc = self.doc.clone();
        for op in ops {
            op.validate(&doc)?;
            op.apply(&mut doc)?;
        }
        let mut ids = self.ids.clone();
        normalize_in_place(&mut doc, &mut ids)?;
        self.doc = doc;
        self.selection = selection;
        self.version += 1;
        let patch = self.current_patch();
        self.notify(&patch);
        Ok(patch)
    }

    /// Insert blocks consecutively starting at `start`, as one batch.
    pub fn insert_nodes_at_path(
        &mut self,
        nodes: Vec<Block>,
        start: &Path,
    ) -> Result<Patch, TransformError> {
        let mut ops = Vec::with_capacity(nodes.len());
        let mut at = start.clone();
        for node in nodes {
            ops.push(Op::InsertNode {
                at: at.clone(),
                node: Child::Block(node),
            });
            at = at
                .next()
                .ok_or_else(|| TransformError::InvalidPath(start.clone()))?;
        }
        self.apply_batch(ops, "insert-nodes")
    }

    /// Partial property update on the block at `at` (equation editor popup and
    /// friends).
    pub fn set_nodes(&mut self, at: &Path, patch: NodePatch) -> Result<Patch, TransformError> {
        let block = query::block_at(&self.doc, at)
            .ok_or_else(|| TransformError::InvalidPath(at.clone()))?;
        let kind = patch.kind.unwrap_or(block.kind);
        let mut props = block.props.clone();
        if let Some(latex) = patch.latex {
            props.latex = Some(latex);
        }
        if let Some(alt_text) = patch.alt_text {
            props.alt_text = Some(alt_text);
        }
        if let Some(correct_answer) = patch.correct_answer {
            props.correct_answer = Some(correct_answer);
        }
        if let Some(question_number) = patch.question_number {
            props.question_number = Some(question_number);
        }
        if let Some(zoom) = patch.zoom {
            props.zoom = Some(zoom);
        }
        if let Some(width) = patch.width {
            props.width = Some(width);
        }
        if let Some(audio_url) = patch.audio_url {
            props.audio_url = Some(audio_url);
        }
        if let Some(voice_id) = patch.voice_id {
            props.voice_id = Some(voice_id);
        }
        self.apply_batch(
            vec![Op::SetNodeProps {
                at: at.clone(),
                kind,
                props,
            }],
            "set-nodes",
        )
    }

    /// Move the cursor without creating an edit batch.
    pub fn select(&mut self, range: Option<Range>) -> Result<(), TransformError> {
        Op::SetSelection {
            range: range.clone(),
        }
        .validate(&self.doc)?;
        self.selection = range;
        Ok(())
    }

    /// Register the change notification fired once per committed batch.
    pub fn on_change(&mut self, callback: impl FnMut(&Document, &Patch) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    fn notify(&mut self, patch: &Patch) {
        if let Some(callback) = self.on_change.as_mut() {
            callback(&self.doc, patch);
        }
    }

    fn current_patch(&self) -> Patch {
        Patch {
            version: self.version,
            selection: self.selection.clone(),
        }
    }

    // ----- read surface -----

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Full tree snapshot for autosave/persist collaborators.
    pub fn snapshot(&self) -> Document {
        self.doc.clone()
    }

    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string(&self.doc)?)
    }

    pub fn selection(&self) -> Option<&Range> {
        self.selection.as_ref()
    }

    pub fn serialized_selection(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string(&self.selection)?)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn block_at(&self, path: &Path) -> Option<&Block> {
        query::block_at(&self.doc, path)
    }

    pub fn block_by_id(&self, id: &str) -> Option<(Path, &Block)> {
        query::block_by_id(&self.doc, id)
    }

    pub fn path_of(&self, id: &str) -> Option<Path> {
        query::find_path_by_id(&self.doc, id)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub(crate) fn new_id(&mut self) -> String {
        self.ids.new_id()
    }
}

/// Drive the repair loop to a fixpoint without recording inverses.
fn normalize_in_place(doc: &mut Document, ids: &mut IdGenerator) -> Result<(), TransformError> {
    let mut rounds = 0;
    while let Some(step) = normalize::repair_step(doc, ids) {
        rounds += 1;
        if rounds > MAX_NORMALIZE_ROUNDS {
            tracing::warn!("normalization did not converge, giving up");
            break;
        }
        for op in step {
            op.validate(doc)?;
            op.apply(doc)?;
        }
    }
    Ok(())
}

fn apply_one(
    doc: &mut Document,
    selection: &mut Option<Range>,
    applied: &mut Vec<Op>,
    inverses: &mut Vec<Op>,
    op: &Op,
) -> Result<(), TransformError> {
    op.validate(doc)?;
    let inverse = op.invert(doc)?;

    let xform = selection
        .as_ref()
        .map(|current| selection::transform_range(current, op, doc));

    op.apply(doc)?;

    if let Op::SetSelection { range } = op {
        *selection = range.clone();
    } else if let Some(xform) = xform {
        *selection = match xform {
            RangeXform::Mapped(range) => Some(range),
            RangeXform::Dead(removed) => {
                tracing::debug!(removed = %removed, "selection auto-recovered to nearest boundary");
                selection::recover_point(doc, &removed).map(Range::collapsed)
            }
        };
    }

    applied.push(op.clone());
    for inverse_op in inverse.into_iter().rev() {
        inverses.insert(0, inverse_op);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockdoc_model::Point;
    use std::cell::Cell;
    use std::rc::Rc;

    fn editor_with(blocks: Vec<Block>) -> Editor {
        let mut editor = Editor::new("test-workspace");
        editor.load(blocks).unwrap();
        editor
    }

    #[test]
    fn test_new_editor_holds_empty_paragraph() {
        let editor = Editor::new("test-workspace");
        assert_eq!(editor.document().len(), 1);
        let block = editor.block_at(&Path::from(vec![0])).unwrap();
        assert!(block.is_empty_text());
        assert!(editor.selection().is_some());
    }

    #[test]
    fn test_abort_leaves_everything_untouched() {
        let mut editor = editor_with(vec![
            Block::with_text("p-1", BlockKind::Paragraph, "one"),
            Block::with_text("p-2", BlockKind::Paragraph, "two"),
        ]);
        let before = editor.snapshot();

        let result = editor.apply_batch(
            vec![
                Op::RemoveNode {
                    at: Path::from(vec![0]),
                },
                Op::RemoveNode {
                    at: Path::from(vec![7]),
                },
            ],
            "bad-batch",
        );

        assert!(matches!(result, Err(TransformError::InvalidPath(_))));
        assert_eq!(editor.snapshot(), before);
        assert_eq!(editor.version(), 0);
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_notify_fires_once_per_batch() {
        let mut editor = editor_with(vec![Block::with_text("p-1", BlockKind::Paragraph, "x")]);
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        editor.on_change(move |_, _| seen.set(seen.get() + 1));

        editor
            .apply_batch(
                vec![
                    Op::InsertText {
                        at: Point::new(vec![0, 0], 1),
                        text: "y".to_string(),
                    },
                    Op::InsertText {
                        at: Point::new(vec![0, 0], 2),
                        text: "z".to_string(),
                    },
                ],
                "type",
            )
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(editor.version(), 1);
    }

    #[test]
    fn test_insert_nodes_at_path_is_one_batch() {
        let mut editor = editor_with(vec![Block::with_text("p-1", BlockKind::Paragraph, "head")]);
        editor
            .insert_nodes_at_path(
                vec![
                    Block::with_text("g-1", BlockKind::Paragraph, "gen one"),
                    Block::with_text("g-2", BlockKind::Paragraph, "gen two"),
                    Block::with_text("g-3", BlockKind::Paragraph, "gen three"),
                ],
                &Path::from(vec![1]),
            )
            .unwrap();

        let order: Vec<&str> = editor.document().blocks().map(|b| b.id.as_str()).collect();
        assert_eq!(order, vec!["p-1", "g-1", "g-2", "g-3"]);

        editor.undo().unwrap();
        let order: Vec<&str> = editor.document().blocks().map(|b| b.id.as_str()).collect();
        assert_eq!(order, vec!["p-1"]);
    }

    #[test]
    fn test_load_rejects_duplicate_ids() {
        let mut editor = Editor::new("test-workspace");
        let result = editor.load(vec![
            Block::with_text("dup", BlockKind::Paragraph, "a"),
            Block::with_text("dup", BlockKind::Paragraph, "b"),
        ]);
        assert!(matches!(
            result,
            Err(EditorError::Transform(TransformError::MalformedInsert(_)))
        ));
    }

    #[test]
    fn test_load_resets_history() {
        let mut editor = editor_with(vec![Block::with_text("p-1", BlockKind::Paragraph, "a")]);
        editor
            .apply_batch(
                vec![Op::InsertText {
                    at: Point::new(vec![0, 0], 1),
                    text: "b".to_string(),
                }],
                "type",
            )
            .unwrap();
        assert!(editor.can_undo());

        editor
            .load(vec![Block::with_text("p-9", BlockKind::Paragraph, "fresh")])
            .unwrap();
        assert!(!editor.can_undo());
        assert_eq!(editor.version(), 0);
        assert!(editor.selection().is_none());
    }

    #[test]
    fn test_set_nodes_merges_props() {
        let mut editor = editor_with(vec![{
            let mut eq = Block::new("e-1", BlockKind::Equation);
            eq.props.latex = Some("x".to_string());
            eq.props.alt_text = Some("ex".to_string());
            eq
        }]);

        editor
            .set_nodes(
                &Path::from(vec![0]),
                NodePatch {
                    latex: Some("x^2".to_string()),
                    ..NodePatch::default()
                },
            )
            .unwrap();

        let block = editor.block_at(&Path::from(vec![0])).unwrap();
        assert_eq!(block.props.latex.as_deref(), Some("x^2"));
        // Untouched fields survive
        assert_eq!(block.props.alt_text.as_deref(), Some("ex"));
    }

    #[test]
    fn test_minted_ids_do_not_collide_with_loaded_ids() {
        let mut editor = Editor::new("ws");
        let seed = {
            let mut ids = IdGenerator::new("ws");
            ids.new_id();
            ids.seed().to_string()
        };
        editor
            .load(vec![Block::with_text(
                format!("{seed}-40"),
                BlockKind::Paragraph,
                "loaded",
            )])
            .unwrap();
        let fresh = editor.new_id();
        assert_eq!(fresh, format!("{seed}-41"));
    }
}
