//! # Keyboard Command Dispatcher
//!
//! Translates key events plus the nearest block-type ancestor into transform
//! batches. Every rule is an exhaustive match over [`BlockKind`], so a new
//! block kind fails to compile until its keyboard behavior is decided.
//!
//! ## Rules
//!
//! - **Enter**: paragraph-likes insert an empty paragraph at block end and
//!   split elsewhere; titles refuse at the start and split into
//!   title + paragraph in the middle; option list items insert a sibling
//!   option; atomic blocks insert a paragraph after themselves
//! - **Backspace**: atomic blocks are never deleted or merged from the
//!   keyboard: at the start of a block following one, the cursor relocates to
//!   the end of the nearest preceding paragraph instead; an mcq never drops
//!   below 2 options; everything else is plain char deletion or a merge into
//!   the previous sibling
//! - **Underscore runs**: typing `_` after two or more underscores rewrites
//!   the run into a fill-in-the-blank marker, one batch, one normalization
//! - **Ctrl/Cmd+Z, Ctrl/Cmd+Shift+Z, Ctrl/Cmd+Y**: undo/redo
//! - Plain characters insert text; anything else is reported as ignored

use blockdoc_model::{query, Block, BlockKind, Child, Document, Leaf, Path, Point, Range};

use crate::editor::{Editor, Patch};
use crate::errors::TransformError;
use crate::ops::Op;

/// Decoded key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Char(char),
}

/// A key press plus its modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
}

impl KeyEvent {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            shift: false,
            ctrl: false,
            meta: false,
            alt: false,
        }
    }

    pub fn char(c: char) -> Self {
        Self::plain(Key::Char(c))
    }

    pub fn undo() -> Self {
        Self {
            ctrl: true,
            ..Self::plain(Key::Char('z'))
        }
    }

    pub fn redo() -> Self {
        Self {
            ctrl: true,
            shift: true,
            ..Self::plain(Key::Char('z'))
        }
    }
}

/// Whether the dispatcher consumed the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    Ignored,
}

impl Editor {
    /// Feed a key event through the dispatcher.
    pub fn handle_key(&mut self, event: KeyEvent) -> Result<KeyOutcome, TransformError> {
        dispatch(self, event)
    }

    /// Delete the text covered by `range` as one batch: the character-unit
    /// composite over the primitive ops. A collapsed range is a no-op.
    pub fn delete_range(&mut self, range: &Range) -> Result<Patch, TransformError> {
        let ops = delete_range_ops(self.document(), range)?;
        self.apply_batch(ops, "delete-range")
    }
}

pub(crate) fn dispatch(editor: &mut Editor, event: KeyEvent) -> Result<KeyOutcome, TransformError> {
    if event.ctrl || event.meta {
        return handle_modifier(editor, event);
    }
    let Some(selection) = editor.selection().cloned() else {
        return Ok(KeyOutcome::Ignored);
    };
    match event.key {
        Key::Enter => handle_enter(editor, &selection),
        Key::Backspace => handle_backspace(editor, &selection),
        Key::Char(c) if !event.alt => handle_char(editor, &selection, c),
        Key::Char(_) => Ok(KeyOutcome::Ignored),
    }
}

fn handle_modifier(editor: &mut Editor, event: KeyEvent) -> Result<KeyOutcome, TransformError> {
    match event.key {
        Key::Char('z') if event.shift => {
            editor.redo()?;
            Ok(KeyOutcome::Handled)
        }
        Key::Char('z') => {
            editor.undo()?;
            Ok(KeyOutcome::Handled)
        }
        Key::Char('y') if !event.shift => {
            editor.redo()?;
            Ok(KeyOutcome::Handled)
        }
        _ => Ok(KeyOutcome::Ignored),
    }
}

// ----- Enter -----

fn handle_enter(editor: &mut Editor, selection: &Range) -> Result<KeyOutcome, TransformError> {
    if !selection.is_collapsed() {
        return enter_over_selection(editor, selection);
    }

    let caret = selection.anchor.clone();
    let block_path = caret
        .path
        .parent()
        .ok_or_else(|| TransformError::InvalidPath(caret.path.clone()))?;
    let kind = editor
        .block_at(&block_path)
        .ok_or_else(|| TransformError::InvalidPath(block_path.clone()))?
        .kind;

    match kind {
        BlockKind::Title => title_enter(editor, &caret, &block_path),
        BlockKind::OptionListItem => option_enter(editor, &block_path),
        BlockKind::Equation | BlockKind::Map | BlockKind::Tts => {
            insert_paragraph_after(editor, &block_path)
        }
        BlockKind::Paragraph
        | BlockKind::HeadingOne
        | BlockKind::HeadingTwo
        | BlockKind::HeadingThree
        | BlockKind::ListItem
        | BlockKind::Mcq
        | BlockKind::Ol
        | BlockKind::Column
        | BlockKind::ColumnCell => paragraph_enter(editor, &caret, &block_path),
    }
}

fn paragraph_enter(
    editor: &mut Editor,
    caret: &Point,
    block_path: &Path,
) -> Result<KeyOutcome, TransformError> {
    if query::is_at_end(editor.document(), caret, block_path) {
        return insert_paragraph_after(editor, block_path);
    }
    let right_id = editor.new_id();
    let next = block_path
        .next()
        .ok_or_else(|| TransformError::InvalidPath(block_path.clone()))?;
    editor.apply_batch(
        vec![
            Op::SplitNode {
                at: caret.clone(),
                right_id,
            },
            Op::SetSelection {
                range: Some(Range::collapsed(Point::new(next.child(0), 0))),
            },
        ],
        "split-block",
    )?;
    Ok(KeyOutcome::Handled)
}

fn title_enter(
    editor: &mut Editor,
    caret: &Point,
    block_path: &Path,
) -> Result<KeyOutcome, TransformError> {
    if query::is_at_start(editor.document(), caret, block_path) {
        return Ok(KeyOutcome::Handled);
    }
    if query::is_at_end(editor.document(), caret, block_path) {
        // Lands between the title and whatever follows it, atomic or not.
        return insert_paragraph_after(editor, block_path);
    }
    let right_id = editor.new_id();
    let next = block_path
        .next()
        .ok_or_else(|| TransformError::InvalidPath(block_path.clone()))?;
    editor.apply_batch(
        vec![
            Op::SplitNode {
                at: caret.clone(),
                right_id,
            },
            Op::SetNodeProps {
                at: next.clone(),
                kind: BlockKind::Paragraph,
                props: Default::default(),
            },
            Op::SetSelection {
                range: Some(Range::collapsed(Point::new(next.child(0), 0))),
            },
        ],
        "split-title",
    )?;
    Ok(KeyOutcome::Handled)
}

fn option_enter(editor: &mut Editor, block_path: &Path) -> Result<KeyOutcome, TransformError> {
    let id = editor.new_id();
    let mut option = Block::new(id, BlockKind::OptionListItem);
    option.props.correct_answer = Some(false);
    let next = block_path
        .next()
        .ok_or_else(|| TransformError::InvalidPath(block_path.clone()))?;
    editor.apply_batch(
        vec![
            Op::InsertNode {
                at: next.clone(),
                node: Child::Block(option),
            },
            Op::SetSelection {
                range: Some(Range::collapsed(Point::new(next.child(0), 0))),
            },
        ],
        "insert-option",
    )?;
    Ok(KeyOutcome::Handled)
}

fn insert_paragraph_after(
    editor: &mut Editor,
    block_path: &Path,
) -> Result<KeyOutcome, TransformError> {
    let id = editor.new_id();
    let next = block_path
        .next()
        .ok_or_else(|| TransformError::InvalidPath(block_path.clone()))?;
    editor.apply_batch(
        vec![
            Op::InsertNode {
                at: next.clone(),
                node: Child::Block(Block::new(id, BlockKind::Paragraph)),
            },
            Op::SetSelection {
                range: Some(Range::collapsed(Point::new(next.child(0), 0))),
            },
        ],
        "insert-paragraph",
    )?;
    Ok(KeyOutcome::Handled)
}

fn enter_over_selection(
    editor: &mut Editor,
    selection: &Range,
) -> Result<KeyOutcome, TransformError> {
    let start = selection.start().clone();
    let mut ops = delete_range_ops(editor.document(), selection)?;
    let block_path = start
        .path
        .parent()
        .ok_or_else(|| TransformError::InvalidPath(start.path.clone()))?;
    let kind = editor
        .block_at(&block_path)
        .ok_or_else(|| TransformError::InvalidPath(block_path.clone()))?
        .kind;
    if !kind.is_atomic() {
        let right_id = editor.new_id();
        let next = block_path
            .next()
            .ok_or_else(|| TransformError::InvalidPath(block_path.clone()))?;
        ops.push(Op::SplitNode {
            at: start,
            right_id,
        });
        ops.push(Op::SetSelection {
            range: Some(Range::collapsed(Point::new(next.child(0), 0))),
        });
    }
    editor.apply_batch(ops, "split-block")?;
    Ok(KeyOutcome::Handled)
}

// ----- Backspace -----

fn handle_backspace(editor: &mut Editor, selection: &Range) -> Result<KeyOutcome, TransformError> {
    if !selection.is_collapsed() {
        let ops = delete_range_ops(editor.document(), selection)?;
        editor.apply_batch(ops, "delete-selection")?;
        return Ok(KeyOutcome::Handled);
    }

    let caret = selection.anchor.clone();
    let block_path = caret
        .path
        .parent()
        .ok_or_else(|| TransformError::InvalidPath(caret.path.clone()))?;
    let block = editor
        .block_at(&block_path)
        .ok_or_else(|| TransformError::InvalidPath(block_path.clone()))?;
    let kind = block.kind;
    let block_empty = block.is_empty_text();

    // The keyboard never decomposes an atomic block from inside.
    if kind.is_atomic() {
        return Ok(KeyOutcome::Handled);
    }

    if query::is_at_start(editor.document(), &caret, &block_path) {
        return backspace_at_block_start(editor, &block_path, kind, block_empty);
    }

    if caret.offset > 0 {
        editor.apply_batch(
            vec![Op::RemoveText {
                at: Point::new(caret.path.clone(), caret.offset - 1),
                count: 1,
            }],
            "delete-char",
        )?;
        return Ok(KeyOutcome::Handled);
    }

    // Offset 0 at an interior leaf boundary: the previous character lives at
    // the end of the previous leaf.
    if let Some(prev_leaf_path) = caret.path.previous() {
        if let Some(prev_leaf) = query::leaf_at(editor.document(), &prev_leaf_path) {
            let len = prev_leaf.char_len();
            if len > 0 {
                editor.apply_batch(
                    vec![Op::RemoveText {
                        at: Point::new(prev_leaf_path, len - 1),
                        count: 1,
                    }],
                    "delete-char",
                )?;
            }
        }
    }
    Ok(KeyOutcome::Handled)
}

fn backspace_at_block_start(
    editor: &mut Editor,
    block_path: &Path,
    kind: BlockKind,
    block_empty: bool,
) -> Result<KeyOutcome, TransformError> {
    // A preceding atomic sibling is untouchable: park the cursor at the end
    // of the nearest paragraph before it instead.
    if let Some(prev_path) = block_path.previous() {
        let prev_atomic = query::block_at(editor.document(), &prev_path)
            .is_some_and(|prev| prev.kind.is_atomic());
        if prev_atomic {
            let target = query::previous_block_matching(editor.document(), &prev_path, |b| {
                b.kind == BlockKind::Paragraph
            })
            .and_then(|(path, _)| query::end_point(editor.document(), &path));
            if let Some(point) = target {
                editor.select(Some(Range::collapsed(point)))?;
            }
            return Ok(KeyOutcome::Handled);
        }
    }

    match kind {
        BlockKind::OptionListItem => {
            if let Some(count) = mcq_option_count(editor.document(), block_path) {
                if count <= 2 {
                    return Ok(KeyOutcome::Handled);
                }
            }
            merge_into_previous(editor, block_path, kind)
        }
        BlockKind::ListItem => {
            // The mcq question line never merges away while its mcq stands.
            let inside_mcq = block_path
                .parent()
                .and_then(|parent| query::block_at(editor.document(), &parent))
                .is_some_and(|parent| parent.kind == BlockKind::Mcq);
            if inside_mcq && block_empty {
                return Ok(KeyOutcome::Handled);
            }
            merge_into_previous(editor, block_path, kind)
        }
        BlockKind::Equation | BlockKind::Map | BlockKind::Tts => Ok(KeyOutcome::Handled),
        BlockKind::Paragraph
        | BlockKind::Title
        | BlockKind::HeadingOne
        | BlockKind::HeadingTwo
        | BlockKind::HeadingThree
        | BlockKind::Mcq
        | BlockKind::Ol
        | BlockKind::Column
        | BlockKind::ColumnCell => merge_into_previous(editor, block_path, kind),
    }
}

fn merge_into_previous(
    editor: &mut Editor,
    block_path: &Path,
    kind: BlockKind,
) -> Result<KeyOutcome, TransformError> {
    let Some(prev_path) = block_path.previous() else {
        return Ok(KeyOutcome::Handled);
    };
    let doc = editor.document();
    let Some(prev) = query::block_at(doc, &prev_path) else {
        return Ok(KeyOutcome::Handled);
    };
    let mergeable =
        !prev.kind.is_atomic() && prev.kind.has_leaf_children() && kind.has_leaf_children();
    if !mergeable {
        return Ok(KeyOutcome::Handled);
    }

    let mut ops = vec![Op::MergeNode {
        at: block_path.clone(),
    }];
    if let Some(junction) = query::end_point(doc, &prev_path) {
        ops.push(Op::SetSelection {
            range: Some(Range::collapsed(junction)),
        });
    }
    editor.apply_batch(ops, "merge-block")?;
    Ok(KeyOutcome::Handled)
}

/// Option count of the mcq owning this option list item, when it has one.
fn mcq_option_count(doc: &Document, option_path: &Path) -> Option<usize> {
    let ol_path = option_path.parent()?;
    let ol = query::block_at(doc, &ol_path)?;
    if ol.kind != BlockKind::Ol {
        return None;
    }
    let mcq_path = ol_path.parent()?;
    if query::block_at(doc, &mcq_path)?.kind != BlockKind::Mcq {
        return None;
    }
    Some(
        ol.child_blocks()
            .filter(|b| b.kind == BlockKind::OptionListItem)
            .count(),
    )
}

// ----- Text input -----

fn handle_char(
    editor: &mut Editor,
    selection: &Range,
    c: char,
) -> Result<KeyOutcome, TransformError> {
    if !selection.is_collapsed() {
        let start = selection.start().clone();
        let mut ops = delete_range_ops(editor.document(), selection)?;
        ops.push(Op::InsertText {
            at: start.clone(),
            text: c.to_string(),
        });
        ops.push(Op::SetSelection {
            range: Some(Range::collapsed(Point::new(
                start.path.clone(),
                start.offset + 1,
            ))),
        });
        editor.apply_batch(ops, "insert-text")?;
        return Ok(KeyOutcome::Handled);
    }

    let caret = selection.anchor.clone();
    if c == '_' {
        if let Some(outcome) = try_blank_rewrite(editor, &caret)? {
            return Ok(outcome);
        }
    }

    editor.apply_batch(
        vec![
            Op::InsertText {
                at: caret.clone(),
                text: c.to_string(),
            },
            Op::SetSelection {
                range: Some(Range::collapsed(Point::new(
                    caret.path.clone(),
                    caret.offset + 1,
                ))),
            },
        ],
        "insert-text",
    )?;
    Ok(KeyOutcome::Handled)
}

/// Typing `_` after a run of two or more underscores rewrites the leaf into
/// `[prefix][blank marker][plain space][suffix]`, cursor at the start of the
/// plain-space leaf. One batch, one normalization.
fn try_blank_rewrite(
    editor: &mut Editor,
    caret: &Point,
) -> Result<Option<KeyOutcome>, TransformError> {
    let doc = editor.document();
    let Some(leaf) = query::leaf_at(doc, &caret.path) else {
        return Ok(None);
    };
    let before: String = leaf.text.chars().take(caret.offset).collect();
    let run = before.chars().rev().take_while(|&ch| ch == '_').count();
    if run < 2 {
        return Ok(None);
    }

    let prefix: String = before.chars().take(caret.offset - run).collect();
    let suffix: String = leaf.text.chars().skip(caret.offset).collect();
    let (Some(parent), Some(index)) = (caret.path.parent(), caret.path.index()) else {
        return Ok(None);
    };

    let mut prefix_leaf = leaf.clone();
    prefix_leaf.text = prefix;
    let mut suffix_leaf = leaf.clone();
    suffix_leaf.text = suffix;

    editor.apply_batch(
        vec![
            Op::RemoveNode {
                at: caret.path.clone(),
            },
            Op::InsertNode {
                at: parent.child(index),
                node: Child::Leaf(prefix_leaf),
            },
            Op::InsertNode {
                at: parent.child(index + 1),
                node: Child::Leaf(Leaf::blank()),
            },
            Op::InsertNode {
                at: parent.child(index + 2),
                node: Child::Leaf(Leaf::new(" ")),
            },
            Op::InsertNode {
                at: parent.child(index + 3),
                node: Child::Leaf(suffix_leaf),
            },
            Op::SetSelection {
                range: Some(Range::collapsed(Point::new(parent.child(index + 2), 0))),
            },
        ],
        "blank-rewrite",
    )?;
    Ok(Some(KeyOutcome::Handled))
}

// ----- Range deletion -----

/// Compile a text-unit deletion of `range` into primitive ops: trim the edge
/// leaves, drop everything wholly inside, and merge the tail block into the
/// head block when both are text blocks. Ends with the cursor collapsed at
/// the range start.
pub(crate) fn delete_range_ops(
    doc: &Document,
    range: &Range,
) -> Result<Vec<Op>, TransformError> {
    let start = range.start().clone();
    let end = range.end().clone();
    if start == end {
        return Ok(Vec::new());
    }

    let start_leaf = query::leaf_at(doc, &start.path)
        .ok_or_else(|| TransformError::InvalidPath(start.path.clone()))?;
    query::leaf_at(doc, &end.path)
        .ok_or_else(|| TransformError::InvalidPath(end.path.clone()))?;
    let start_block = start
        .path
        .parent()
        .ok_or_else(|| TransformError::InvalidPath(start.path.clone()))?;
    let end_block = end
        .path
        .parent()
        .ok_or_else(|| TransformError::InvalidPath(end.path.clone()))?;

    let mut ops = Vec::new();

    if start.path == end.path {
        if end.offset > start.offset {
            ops.push(Op::RemoveText {
                at: start.clone(),
                count: end.offset - start.offset,
            });
        }
    } else {
        let tail = start_leaf.char_len().saturating_sub(start.offset);
        if tail > 0 {
            ops.push(Op::RemoveText {
                at: start.clone(),
                count: tail,
            });
        }
        if end.offset > 0 {
            ops.push(Op::RemoveText {
                at: Point::new(end.path.clone(), 0),
                count: end.offset,
            });
        }

        let start_index = index_of(&start.path)?;
        let end_index = index_of(&end.path)?;

        if start_block == end_block {
            for i in (start_index + 1..end_index).rev() {
                ops.push(Op::RemoveNode {
                    at: start_block.child(i),
                });
            }
        } else if start_block.is_sibling_of(&end_block) {
            let start_children = query::children_of(doc, &start_block)
                .ok_or_else(|| TransformError::InvalidPath(start_block.clone()))?
                .len();
            for i in (start_index + 1..start_children).rev() {
                ops.push(Op::RemoveNode {
                    at: start_block.child(i),
                });
            }
            for i in (0..end_index).rev() {
                ops.push(Op::RemoveNode {
                    at: end_block.child(i),
                });
            }

            let sb = index_of(&start_block)?;
            let eb = index_of(&end_block)?;
            let parent = start_block
                .parent()
                .ok_or_else(|| TransformError::InvalidPath(start_block.clone()))?;
            for i in (sb + 1..eb).rev() {
                ops.push(Op::RemoveNode {
                    at: parent.child(i),
                });
            }

            let start_kind = query::block_at(doc, &start_block)
                .ok_or_else(|| TransformError::InvalidPath(start_block.clone()))?
                .kind;
            let end_kind = query::block_at(doc, &end_block)
                .ok_or_else(|| TransformError::InvalidPath(end_block.clone()))?
                .kind;
            let mergeable = !start_kind.is_atomic()
                && !end_kind.is_atomic()
                && start_kind.has_leaf_children()
                && end_kind.has_leaf_children();
            if mergeable {
                ops.push(Op::MergeNode {
                    at: parent.child(sb + 1),
                });
            }
        } else {
            tracing::debug!("cross-container selection delete trims edge leaves only");
        }
    }

    ops.push(Op::SetSelection {
        range: Some(Range::collapsed(start)),
    });
    Ok(ops)
}

fn index_of(path: &Path) -> Result<usize, TransformError> {
    path.index()
        .ok_or_else(|| TransformError::InvalidPath(path.clone()))
}
