//! Block construction commands.
//!
//! The insertion surface behind the editor chrome: the add-block dropdown
//! (mcq, map, equation), the block-type switcher, and the click-below-content
//! affordance. All of them share one placement rule: an empty paragraph under
//! the target path is replaced in place, anything else gets the new block
//! inserted after it.

use blockdoc_model::{Block, BlockKind, Child, Leaf, Path, Point, Props, Range};

use crate::editor::{Editor, Patch};
use crate::errors::TransformError;
use crate::ops::Op;

/// Where a block-construction command put its new node.
#[derive(Debug, Clone)]
pub struct Inserted {
    pub id: String,
    pub path: Path,
    pub patch: Patch,
}

impl Editor {
    /// Insert an mcq scaffold: a question line plus an option list holding
    /// one wrong and one correct answer. Cursor moves to the question line.
    pub fn add_mcq_block(&mut self, at: &Path) -> Result<Inserted, TransformError> {
        let mcq_id = self.new_id();
        let question = Block::new(self.new_id(), BlockKind::ListItem);
        let mut wrong = Block::new(self.new_id(), BlockKind::OptionListItem);
        wrong.props.correct_answer = Some(false);
        let mut right = Block::new(self.new_id(), BlockKind::OptionListItem);
        right.props.correct_answer = Some(true);
        let ol = Block::with_children(
            self.new_id(),
            BlockKind::Ol,
            vec![Child::Block(wrong), Child::Block(right)],
        );
        let mcq = Block::with_children(
            mcq_id,
            BlockKind::Mcq,
            vec![Child::Block(question), Child::Block(ol)],
        );

        self.place_block(at, mcq, "add-mcq", |path| {
            Some(Point::new(path.child(0).child(0), 0))
        })
    }

    /// Insert a map block (`zoom: 11`, full width).
    pub fn add_map_block(&mut self, at: &Path) -> Result<Inserted, TransformError> {
        let mut map = Block::new(self.new_id(), BlockKind::Map);
        map.props = Props {
            zoom: Some(11),
            width: Some("100%".to_string()),
            ..Props::default()
        };
        self.place_block(at, map, "add-map", |_| None)
    }

    /// Insert an equation block with the given latex and empty alt text.
    /// Returns the new node's id and path so the equation popup can target it.
    pub fn add_equation_block(
        &mut self,
        latex: &str,
        at: &Path,
    ) -> Result<Inserted, TransformError> {
        let mut equation = Block::new(self.new_id(), BlockKind::Equation);
        equation.props = Props {
            latex: Some(latex.to_string()),
            alt_text: Some(String::new()),
            ..Props::default()
        };
        self.place_block(at, equation, "add-equation", |_| None)
    }

    /// Retag the block under the cursor, toggling back to a paragraph when it
    /// already has the requested kind. Id and children are preserved.
    pub fn toggle_block(&mut self, kind: BlockKind) -> Result<Patch, TransformError> {
        let caret = self
            .selection()
            .map(|range| range.anchor.clone())
            .ok_or_else(|| TransformError::InvalidPath(Path::root()))?;
        let block_path = caret
            .path
            .parent()
            .ok_or_else(|| TransformError::InvalidPath(caret.path.clone()))?;
        let block = self
            .block_at(&block_path)
            .ok_or_else(|| TransformError::InvalidPath(block_path.clone()))?;
        let next_kind = if block.kind == kind {
            BlockKind::Paragraph
        } else {
            kind
        };
        let props = block.props.clone();
        self.apply_batch(
            vec![Op::SetNodeProps {
                at: block_path,
                kind: next_kind,
                props,
            }],
            "toggle-block",
        )
    }

    /// Append an empty paragraph after the last root block unless one is
    /// already there, and move the cursor into it. Backs the click-below-
    /// content affordance and keeps a trailing equation reachable.
    pub fn ensure_trailing_paragraph(&mut self) -> Result<Option<Patch>, TransformError> {
        let count = self.document().len();
        if count == 0 {
            return Ok(None);
        }
        let last_path = Path::from(vec![count - 1]);
        let last_is_empty_paragraph = self
            .block_at(&last_path)
            .is_some_and(|last| last.kind == BlockKind::Paragraph && last.is_empty_text());
        if last_is_empty_paragraph {
            return Ok(None);
        }

        let id = self.new_id();
        let at = Path::from(vec![count]);
        let patch = self.apply_batch(
            vec![
                Op::InsertNode {
                    at: at.clone(),
                    node: Child::Block(Block::new(id, BlockKind::Paragraph)),
                },
                Op::SetSelection {
                    range: Some(Range::collapsed(Point::new(at.child(0), 0))),
                },
            ],
            "trailing-paragraph",
        )?;
        Ok(Some(patch))
    }

    /// Insert a paragraph carrying `text` after the block at `at` (equation
    /// popup note insertion).
    pub fn insert_note_after(&mut self, at: &Path, text: &str) -> Result<Patch, TransformError> {
        let id = self.new_id();
        let next = at
            .next()
            .ok_or_else(|| TransformError::InvalidPath(at.clone()))?;
        self.apply_batch(
            vec![Op::InsertNode {
                at: next,
                node: Child::Block(Block::with_children(
                    id,
                    BlockKind::Paragraph,
                    vec![Child::Leaf(Leaf::new(text))],
                )),
            }],
            "insert-note",
        )
    }

    fn place_block(
        &mut self,
        at: &Path,
        block: Block,
        description: &str,
        caret: impl Fn(&Path) -> Option<Point>,
    ) -> Result<Inserted, TransformError> {
        let target = self
            .block_at(at)
            .ok_or_else(|| TransformError::InvalidPath(at.clone()))?;
        let replace = target.kind == BlockKind::Paragraph && target.is_empty_text();
        let new_path = if replace {
            at.clone()
        } else {
            at.next()
                .ok_or_else(|| TransformError::InvalidPath(at.clone()))?
        };

        let id = block.id.clone();
        let mut ops = Vec::new();
        if replace {
            ops.push(Op::RemoveNode { at: at.clone() });
        }
        ops.push(Op::InsertNode {
            at: new_path.clone(),
            node: Child::Block(block),
        });
        if let Some(point) = caret(&new_path) {
            ops.push(Op::SetSelection {
                range: Some(Range::collapsed(point)),
            });
        }

        let patch = self.apply_batch(ops, description)?;
        Ok(Inserted {
            id,
            path: new_path,
            patch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor_with(blocks: Vec<Block>) -> Editor {
        let mut editor = Editor::new("blocks-tests");
        editor.load(blocks).unwrap();
        editor
    }

    #[test]
    fn test_add_mcq_replaces_empty_paragraph() {
        let mut editor = editor_with(vec![Block::new("p-1", BlockKind::Paragraph)]);
        let inserted = editor.add_mcq_block(&Path::from(vec![0])).unwrap();

        assert_eq!(inserted.path, Path::from(vec![0]));
        assert_eq!(editor.document().len(), 1);
        let mcq = editor.block_at(&Path::from(vec![0])).unwrap();
        assert_eq!(mcq.kind, BlockKind::Mcq);
        assert_eq!(mcq.id, inserted.id);

        let ol = editor.block_at(&Path::from(vec![0, 1])).unwrap();
        assert_eq!(ol.kind, BlockKind::Ol);
        let answers: Vec<Option<bool>> = ol
            .child_blocks()
            .map(|option| option.props.correct_answer)
            .collect();
        assert_eq!(answers, vec![Some(false), Some(true)]);

        // Cursor lands on the question line
        let caret = editor.selection().unwrap().anchor.clone();
        assert_eq!(caret, Point::new(vec![0, 0, 0], 0));
    }

    #[test]
    fn test_add_mcq_after_non_empty_paragraph() {
        let mut editor = editor_with(vec![Block::with_text("p-1", BlockKind::Paragraph, "text")]);
        let inserted = editor.add_mcq_block(&Path::from(vec![0])).unwrap();

        assert_eq!(inserted.path, Path::from(vec![1]));
        assert_eq!(editor.document().len(), 2);
        assert_eq!(editor.block_at(&Path::from(vec![0])).unwrap().id, "p-1");
    }

    #[test]
    fn test_add_map_props() {
        let mut editor = editor_with(vec![Block::with_text("p-1", BlockKind::Paragraph, "x")]);
        let inserted = editor.add_map_block(&Path::from(vec![0])).unwrap();
        let map = editor.block_at(&inserted.path).unwrap();
        assert_eq!(map.kind, BlockKind::Map);
        assert_eq!(map.props.zoom, Some(11));
        assert_eq!(map.props.width.as_deref(), Some("100%"));
    }

    #[test]
    fn test_add_equation_then_edit_via_set_nodes() {
        let mut editor = editor_with(vec![Block::new("p-1", BlockKind::Paragraph)]);
        let inserted = editor.add_equation_block("", &Path::from(vec![0])).unwrap();

        let equation = editor.block_at(&inserted.path).unwrap();
        assert_eq!(equation.kind, BlockKind::Equation);
        assert_eq!(equation.props.alt_text.as_deref(), Some(""));

        editor
            .set_nodes(
                &inserted.path,
                crate::editor::NodePatch {
                    latex: Some("\\frac{1}{2}".to_string()),
                    alt_text: Some("one half".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        let equation = editor.block_at(&inserted.path).unwrap();
        assert_eq!(equation.props.latex.as_deref(), Some("\\frac{1}{2}"));
        assert_eq!(equation.props.alt_text.as_deref(), Some("one half"));
    }

    #[test]
    fn test_toggle_block_cycles_back_to_paragraph() {
        let mut editor = editor_with(vec![Block::with_text("p-1", BlockKind::Paragraph, "head")]);
        editor
            .select(Some(Range::collapsed(Point::new(vec![0, 0], 0))))
            .unwrap();

        editor.toggle_block(BlockKind::HeadingOne).unwrap();
        assert_eq!(
            editor.block_at(&Path::from(vec![0])).unwrap().kind,
            BlockKind::HeadingOne
        );

        editor.toggle_block(BlockKind::HeadingOne).unwrap();
        assert_eq!(
            editor.block_at(&Path::from(vec![0])).unwrap().kind,
            BlockKind::Paragraph
        );

        // Id survives retagging
        assert_eq!(editor.block_at(&Path::from(vec![0])).unwrap().id, "p-1");
    }

    #[test]
    fn test_ensure_trailing_paragraph_after_equation() {
        let mut equation = Block::new("e-1", BlockKind::Equation);
        equation.props.latex = Some("x".to_string());
        let mut editor = editor_with(vec![equation]);

        let patch = editor.ensure_trailing_paragraph().unwrap();
        assert!(patch.is_some());
        assert_eq!(editor.document().len(), 2);
        assert_eq!(
            editor.block_at(&Path::from(vec![1])).unwrap().kind,
            BlockKind::Paragraph
        );

        // Idempotent once a trailing empty paragraph exists
        assert!(editor.ensure_trailing_paragraph().unwrap().is_none());
    }

    #[test]
    fn test_insert_note_after() {
        let mut editor = editor_with(vec![Block::with_text("e-1", BlockKind::Paragraph, "eq")]);
        editor
            .insert_note_after(&Path::from(vec![0]), "remember this")
            .unwrap();
        assert_eq!(
            editor.block_at(&Path::from(vec![1])).unwrap().text(),
            "remember this"
        );
    }

    #[test]
    fn test_added_blocks_use_generated_ids() {
        let mut editor = editor_with(vec![Block::new("p-1", BlockKind::Paragraph)]);
        let inserted = editor.add_mcq_block(&Path::from(vec![0])).unwrap();
        assert!(inserted.id.contains('-'));
        assert_ne!(inserted.id, "p-1");
    }
}
