//! Normalization: the post-mutation pass enforcing tree invariants.
//!
//! A batch applies its primitives without intermediate normalization, then the
//! engine drives this module to a fixpoint: [`repair_step`] scans for the
//! first violation in document order and answers the ops that fix it. Repairs
//! run through the same op machinery as user edits, so their inverses land in
//! the same undo batch and the whole unit stays atomic.
//!
//! Rules, in scan order per block:
//!
//! - a `Column` with no cells is removed; with a single cell its content is
//!   hoisted out one child at a time, after which the emptied cell and column
//!   dissolve
//! - a `ColumnCell` without block content is removed
//! - an `Mcq` whose `Ol` has fewer than 2 options is padded with an empty one
//! - a childless block gains an empty leaf (text blocks) or is removed
//!   (containers)
//! - an empty leaf with siblings is dropped; adjacent leaves with identical
//!   marks are fused into one run

use blockdoc_model::{
    query, Block, BlockKind, Child, Document, IdGenerator, Leaf, Path, Point, Props,
};

use crate::ops::Op;

/// Find the first invariant violation and answer the ops repairing it, or
/// `None` when the tree is clean.
pub(crate) fn repair_step(doc: &Document, ids: &mut IdGenerator) -> Option<Vec<Op>> {
    for (path, block) in query::blocks(doc) {
        match block.kind {
            BlockKind::Column => {
                let cells = block.children.len();
                if cells == 0 {
                    return Some(vec![Op::RemoveNode { at: path }]);
                }
                if cells == 1 {
                    let occupied = block
                        .children[0]
                        .as_block()
                        .is_some_and(|cell| !cell.children.is_empty());
                    if occupied {
                        // Hoist the cell's first child to the column's own
                        // position; repeat until the cell drains.
                        return Some(vec![Op::MoveNode {
                            from: path.child(0).child(0),
                            to: path.clone(),
                        }]);
                    }
                }
            }
            BlockKind::ColumnCell => {
                if block.child_blocks().next().is_none() {
                    return Some(vec![Op::RemoveNode { at: path }]);
                }
            }
            BlockKind::Mcq => {
                if let Some(step) = pad_mcq_options(&path, block, ids) {
                    return Some(step);
                }
            }
            _ => {}
        }

        if block.children.is_empty() {
            if block.kind.has_leaf_children() {
                return Some(vec![Op::InsertNode {
                    at: path.child(0),
                    node: Child::Leaf(Leaf::default()),
                }]);
            }
            return Some(vec![Op::RemoveNode { at: path }]);
        }

        if block.kind.has_leaf_children() {
            if let Some(step) = repair_leaves(&path, block) {
                return Some(step);
            }
        }
    }
    None
}

fn pad_mcq_options(path: &Path, block: &Block, ids: &mut IdGenerator) -> Option<Vec<Op>> {
    let (ol_index, ol) = block
        .children
        .iter()
        .enumerate()
        .find_map(|(index, child)| match child {
            Child::Block(b) if b.kind == BlockKind::Ol => Some((index, b)),
            _ => None,
        })?;

    let options = ol
        .child_blocks()
        .filter(|b| b.kind == BlockKind::OptionListItem)
        .count();
    if options >= 2 {
        return None;
    }

    let mut option = Block::new(ids.new_id(), BlockKind::OptionListItem);
    option.props = Props {
        correct_answer: Some(false),
        ..Props::default()
    };
    Some(vec![Op::InsertNode {
        at: path.child(ol_index).child(ol.children.len()),
        node: Child::Block(option),
    }])
}

fn repair_leaves(path: &Path, block: &Block) -> Option<Vec<Op>> {
    if block.children.len() > 1 {
        for (index, child) in block.children.iter().enumerate() {
            if let Child::Leaf(leaf) = child {
                if leaf.text.is_empty() {
                    return Some(vec![Op::RemoveNode {
                        at: path.child(index),
                    }]);
                }
            }
        }
    }

    for index in 0..block.children.len().saturating_sub(1) {
        let (Child::Leaf(left), Child::Leaf(right)) =
            (&block.children[index], &block.children[index + 1])
        else {
            continue;
        };
        if left.same_marks(right) {
            return Some(vec![
                Op::InsertText {
                    at: Point::new(path.child(index), left.char_len()),
                    text: right.text.clone(),
                },
                Op::RemoveNode {
                    at: path.child(index + 1),
                },
            ]);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockdoc_model::Path;

    fn normalize_fully(doc: &mut Document, ids: &mut IdGenerator) {
        while let Some(step) = repair_step(doc, ids) {
            for op in step {
                op.apply(doc).unwrap();
            }
        }
    }

    fn ids() -> IdGenerator {
        IdGenerator::from_seed("norm")
    }

    #[test]
    fn test_clean_tree_needs_no_repair() {
        let doc = Document::new(vec![Block::with_text("a-1", BlockKind::Paragraph, "hi")]);
        assert!(repair_step(&doc, &mut ids()).is_none());
    }

    #[test]
    fn test_childless_text_block_gains_empty_leaf() {
        let mut doc = Document::new(vec![Block::with_children(
            "a-1",
            BlockKind::Paragraph,
            vec![],
        )]);
        normalize_fully(&mut doc, &mut ids());
        let block = query::block_at(&doc, &Path::from(vec![0])).unwrap();
        assert_eq!(block.children.len(), 1);
        assert!(block.is_empty_text());
    }

    #[test]
    fn test_empty_leaf_with_siblings_is_dropped() {
        let mut doc = Document::new(vec![Block::with_children(
            "a-1",
            BlockKind::Paragraph,
            vec![
                Child::Leaf(Leaf::new("keep")),
                Child::Leaf(Leaf::new("")),
            ],
        )]);
        normalize_fully(&mut doc, &mut ids());
        let block = query::block_at(&doc, &Path::from(vec![0])).unwrap();
        assert_eq!(block.children.len(), 1);
        assert_eq!(block.text(), "keep");
    }

    #[test]
    fn test_adjacent_plain_leaves_fuse() {
        let mut doc = Document::new(vec![Block::with_children(
            "a-1",
            BlockKind::Paragraph,
            vec![
                Child::Leaf(Leaf::new("hello ")),
                Child::Leaf(Leaf::new("world")),
            ],
        )]);
        normalize_fully(&mut doc, &mut ids());
        let block = query::block_at(&doc, &Path::from(vec![0])).unwrap();
        assert_eq!(block.children.len(), 1);
        assert_eq!(block.text(), "hello world");
    }

    #[test]
    fn test_blank_marker_leaf_is_not_fused() {
        let mut doc = Document::new(vec![Block::with_children(
            "a-1",
            BlockKind::Paragraph,
            vec![
                Child::Leaf(Leaf::new("fill ")),
                Child::Leaf(Leaf::blank()),
                Child::Leaf(Leaf::new(" after")),
            ],
        )]);
        normalize_fully(&mut doc, &mut ids());
        let block = query::block_at(&doc, &Path::from(vec![0])).unwrap();
        assert_eq!(block.children.len(), 3);
        assert!(block.children[1].as_leaf().unwrap().blank);
    }

    #[test]
    fn test_single_cell_column_unwraps() {
        let mut doc = Document::new(vec![
            Block::with_text("p-1", BlockKind::Paragraph, "before"),
            Block::with_children(
                "col-1",
                BlockKind::Column,
                vec![Child::Block(Block::with_children(
                    "cell-1",
                    BlockKind::ColumnCell,
                    vec![
                        Child::Block(Block::with_text("p-2", BlockKind::Paragraph, "one")),
                        Child::Block(Block::with_text("p-3", BlockKind::Paragraph, "two")),
                    ],
                ))],
            ),
            Block::with_text("p-4", BlockKind::Paragraph, "after"),
        ]);
        normalize_fully(&mut doc, &mut ids());

        let order: Vec<&str> = doc.blocks().map(|b| b.id.as_str()).collect();
        assert_eq!(order, vec!["p-1", "p-2", "p-3", "p-4"]);
    }

    #[test]
    fn test_emptied_cell_is_removed_but_column_survives() {
        let mut doc = Document::new(vec![Block::with_children(
            "col-1",
            BlockKind::Column,
            vec![
                Child::Block(Block::with_children("cell-1", BlockKind::ColumnCell, vec![])),
                Child::Block(Block::with_children(
                    "cell-2",
                    BlockKind::ColumnCell,
                    vec![Child::Block(Block::with_text(
                        "p-1",
                        BlockKind::Paragraph,
                        "keep",
                    ))],
                )),
                Child::Block(Block::with_children(
                    "cell-3",
                    BlockKind::ColumnCell,
                    vec![Child::Block(Block::with_text(
                        "p-2",
                        BlockKind::Paragraph,
                        "also",
                    ))],
                )),
            ],
        )]);
        normalize_fully(&mut doc, &mut ids());

        let column = query::block_at(&doc, &Path::from(vec![0])).unwrap();
        assert_eq!(column.kind, BlockKind::Column);
        let cells: Vec<&str> = column.child_blocks().map(|b| b.id.as_str()).collect();
        assert_eq!(cells, vec!["cell-2", "cell-3"]);
    }

    #[test]
    fn test_mcq_below_floor_is_padded() {
        let mut doc = Document::new(vec![Block::with_children(
            "m-1",
            BlockKind::Mcq,
            vec![
                Child::Block(Block::with_text("q-1", BlockKind::ListItem, "Q?")),
                Child::Block(Block::with_children(
                    "ol-1",
                    BlockKind::Ol,
                    vec![Child::Block(Block::with_text(
                        "o-1",
                        BlockKind::OptionListItem,
                        "only",
                    ))],
                )),
            ],
        )]);
        normalize_fully(&mut doc, &mut ids());

        let ol = query::block_at(&doc, &Path::from(vec![0, 1])).unwrap();
        let options = ol
            .child_blocks()
            .filter(|b| b.kind == BlockKind::OptionListItem)
            .count();
        assert_eq!(options, 2);
    }
}
