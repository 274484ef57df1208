//! # Transform Primitives
//!
//! The operation algebra every edit compiles down to.
//!
//! ## Design
//!
//! 1. **Validated**: each op checks structural constraints against the tree it
//!    is about to mutate before touching it
//! 2. **Invertible**: each op produces its inverse from the pre-op tree, so a
//!    batch can be undone without snapshots
//! 3. **Path-addressed**: ops carry plain paths; the engine is responsible for
//!    emitting them in application order
//! 4. **Serializable**: ops round-trip through serde for logging and debugging
//!
//! ## Op Semantics
//!
//! ### MoveNode
//! - `to` is expressed in pre-removal coordinates and transformed through the
//!   removal on application
//! - Moving a node into its own subtree is rejected
//!
//! ### SplitNode / MergeNode
//! - Split keeps the original id on the left half; the right half receives
//!   `right_id`
//! - Merge folds a block into its previous sibling; the previous sibling's id
//!   survives
//! - Merging the document root (or anything with no previous sibling) fails
//!
//! ### SetSelection
//! - Carried in batches so cursor placement is part of the undoable unit; it
//!   never touches the tree itself

use std::collections::HashSet;

use blockdoc_model::{query, Block, BlockKind, Child, Document, Leaf, Path, Point, Props, Range};
use serde::{Deserialize, Serialize};

use crate::errors::TransformError;

/// A primitive transform operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    /// Insert a child (block or leaf) at a path.
    InsertNode { at: Path, node: Child },

    /// Remove the child at a path, cascading to its descendants.
    RemoveNode { at: Path },

    /// Relocate the child at `from` to `to` (pre-removal coordinates).
    MoveNode { from: Path, to: Path },

    /// Split the block containing `at` into two siblings at that point.
    SplitNode { at: Point, right_id: String },

    /// Merge the block at `at` into its previous sibling.
    MergeNode { at: Path },

    /// Replace a block's kind and attributes.
    SetNodeProps {
        at: Path,
        kind: BlockKind,
        props: Props,
    },

    /// Insert text into a leaf at a character offset.
    InsertText { at: Point, text: String },

    /// Remove `count` characters from a leaf starting at a character offset.
    RemoveText { at: Point, count: usize },

    /// Set the editor selection as part of the batch.
    SetSelection { range: Option<Range> },
}

impl Op {
    /// Debug name used in logging.
    pub fn name(&self) -> &'static str {
        match self {
            Op::InsertNode { .. } => "insert_node",
            Op::RemoveNode { .. } => "remove_node",
            Op::MoveNode { .. } => "move_node",
            Op::SplitNode { .. } => "split_node",
            Op::MergeNode { .. } => "merge_node",
            Op::SetNodeProps { .. } => "set_node_props",
            Op::InsertText { .. } => "insert_text",
            Op::RemoveText { .. } => "remove_text",
            Op::SetSelection { .. } => "set_selection",
        }
    }

    /// Check that this op can be applied to `doc` without touching it.
    pub fn validate(&self, doc: &Document) -> Result<(), TransformError> {
        match self {
            Op::InsertNode { at, node } => {
                let (parent, index) = locate(at)?;
                let children = query::children_of(doc, &parent)
                    .ok_or_else(|| TransformError::InvalidPath(at.clone()))?;
                if index > children.len() {
                    return Err(TransformError::InvalidPath(at.clone()));
                }
                validate_inserted_child(doc, &parent, node)
            }

            Op::RemoveNode { at } => {
                if at.is_root() {
                    return Err(TransformError::RootViolation);
                }
                query::child_at(doc, at)
                    .map(|_| ())
                    .ok_or_else(|| TransformError::InvalidPath(at.clone()))
            }

            Op::MoveNode { from, to } => {
                let (_, _) = locate(from)?;
                let moved = query::child_at(doc, from)
                    .ok_or_else(|| TransformError::InvalidPath(from.clone()))?;
                if from == to || from.is_ancestor_of(to) {
                    return Err(TransformError::InvalidPath(to.clone()));
                }
                let (to_parent, to_index) = locate(to)?;
                let siblings = query::children_of(doc, &to_parent)
                    .ok_or_else(|| TransformError::InvalidPath(to.clone()))?;
                if to_index > siblings.len() {
                    return Err(TransformError::InvalidPath(to.clone()));
                }
                // Same placement rules an insert would enforce.
                let parent_kind = if to_parent.is_root() {
                    None
                } else {
                    query::block_at(doc, &to_parent).map(|block| block.kind)
                };
                match moved {
                    Child::Leaf(_) => match parent_kind {
                        None => {
                            return Err(TransformError::MalformedInsert(
                                "text leaf at document root".to_string(),
                            ));
                        }
                        Some(kind) if !kind.has_leaf_children() => {
                            return Err(TransformError::MalformedInsert(
                                "text leaf inside a container block".to_string(),
                            ));
                        }
                        Some(_) => {}
                    },
                    Child::Block(block) => {
                        if parent_kind == Some(BlockKind::Column)
                            && block.kind != BlockKind::ColumnCell
                        {
                            return Err(TransformError::MalformedInsert(
                                "column children must be column cells".to_string(),
                            ));
                        }
                        if parent_kind != Some(BlockKind::Column)
                            && block.kind == BlockKind::ColumnCell
                        {
                            return Err(TransformError::MalformedInsert(
                                "column cell outside a column".to_string(),
                            ));
                        }
                    }
                }
                Ok(())
            }

            Op::SplitNode { at, right_id } => {
                let (block_path, _) = locate(&at.path)?;
                let block = query::block_at(doc, &block_path)
                    .ok_or_else(|| TransformError::InvalidPath(at.path.clone()))?;
                if block.kind.is_atomic() {
                    return Err(TransformError::MalformedInsert(
                        "cannot split an atomic block".to_string(),
                    ));
                }
                let leaf = query::leaf_at(doc, &at.path)
                    .ok_or_else(|| TransformError::InvalidPath(at.path.clone()))?;
                if at.offset > leaf.char_len() {
                    return Err(TransformError::InvalidPath(at.path.clone()));
                }
                if right_id.is_empty() {
                    return Err(TransformError::MalformedInsert(
                        "node is missing an id".to_string(),
                    ));
                }
                if id_exists(doc, right_id) {
                    return Err(TransformError::MalformedInsert(format!(
                        "duplicate id: {right_id}"
                    )));
                }
                Ok(())
            }

            Op::MergeNode { at } => {
                if at.is_root() {
                    return Err(TransformError::RootViolation);
                }
                let block = query::block_at(doc, at)
                    .ok_or_else(|| TransformError::InvalidPath(at.clone()))?;
                let prev_path = at
                    .previous()
                    .ok_or_else(|| TransformError::InvalidPath(at.clone()))?;
                let prev = query::block_at(doc, &prev_path)
                    .ok_or_else(|| TransformError::InvalidPath(prev_path.clone()))?;
                if block.kind.is_atomic() || prev.kind.is_atomic() {
                    return Err(TransformError::MalformedInsert(
                        "cannot merge an atomic block".to_string(),
                    ));
                }
                if !block.children.iter().all(Child::is_leaf)
                    || !prev.children.iter().all(Child::is_leaf)
                {
                    return Err(TransformError::MalformedInsert(
                        "cannot merge container blocks".to_string(),
                    ));
                }
                Ok(())
            }

            Op::SetNodeProps { at, .. } => query::block_at(doc, at)
                .map(|_| ())
                .ok_or_else(|| TransformError::InvalidPath(at.clone())),

            Op::InsertText { at, .. } => {
                let leaf = query::leaf_at(doc, &at.path)
                    .ok_or_else(|| TransformError::InvalidPath(at.path.clone()))?;
                if at.offset > leaf.char_len() {
                    return Err(TransformError::InvalidPath(at.path.clone()));
                }
                Ok(())
            }

            Op::RemoveText { at, count } => {
                let leaf = query::leaf_at(doc, &at.path)
                    .ok_or_else(|| TransformError::InvalidPath(at.path.clone()))?;
                if at.offset + count > leaf.char_len() {
                    return Err(TransformError::InvalidPath(at.path.clone()));
                }
                Ok(())
            }

            Op::SetSelection { range } => {
                if let Some(range) = range {
                    for point in [&range.anchor, &range.focus] {
                        let leaf = query::leaf_at(doc, &point.path)
                            .ok_or_else(|| TransformError::InvalidPath(point.path.clone()))?;
                        if point.offset > leaf.char_len() {
                            return Err(TransformError::InvalidPath(point.path.clone()));
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Build the inverse of this op against the pre-op tree.
    ///
    /// Most ops invert to a single op; `MergeNode` needs a split plus a
    /// re-prop of the resurrected right half.
    pub fn invert(&self, doc: &Document) -> Result<Vec<Op>, TransformError> {
        match self {
            Op::InsertNode { at, .. } => Ok(vec![Op::RemoveNode { at: at.clone() }]),

            Op::RemoveNode { at } => {
                let node = query::child_at(doc, at)
                    .ok_or_else(|| TransformError::InvalidPath(at.clone()))?
                    .clone();
                Ok(vec![Op::InsertNode {
                    at: at.clone(),
                    node,
                }])
            }

            Op::MoveNode { from, to } => {
                let landing = to
                    .transform_for_remove(from)
                    .ok_or_else(|| TransformError::InvalidPath(to.clone()))?;
                let back = from.transform_for_insert(&landing);
                Ok(vec![Op::MoveNode {
                    from: landing,
                    to: back,
                }])
            }

            Op::SplitNode { at, .. } => {
                let (block_path, _) = locate(&at.path)?;
                let right = block_path
                    .next()
                    .ok_or_else(|| TransformError::InvalidPath(block_path.clone()))?;
                Ok(vec![Op::MergeNode { at: right }])
            }

            Op::MergeNode { at } => {
                let merged = query::block_at(doc, at)
                    .ok_or_else(|| TransformError::InvalidPath(at.clone()))?;
                let prev_path = at
                    .previous()
                    .ok_or_else(|| TransformError::InvalidPath(at.clone()))?;
                let prev = query::block_at(doc, &prev_path)
                    .ok_or_else(|| TransformError::InvalidPath(prev_path.clone()))?;

                if merged.children.is_empty() {
                    return Ok(vec![Op::InsertNode {
                        at: at.clone(),
                        node: Child::Block(merged.clone()),
                    }]);
                }

                let junction = prev.children.len();
                Ok(vec![
                    Op::SplitNode {
                        at: Point::new(prev_path.child(junction), 0),
                        right_id: merged.id.clone(),
                    },
                    Op::SetNodeProps {
                        at: at.clone(),
                        kind: merged.kind,
                        props: merged.props.clone(),
                    },
                ])
            }

            Op::SetNodeProps { at, .. } => {
                let block = query::block_at(doc, at)
                    .ok_or_else(|| TransformError::InvalidPath(at.clone()))?;
                Ok(vec![Op::SetNodeProps {
                    at: at.clone(),
                    kind: block.kind,
                    props: block.props.clone(),
                }])
            }

            Op::InsertText { at, text } => Ok(vec![Op::RemoveText {
                at: at.clone(),
                count: text.chars().count(),
            }]),

            Op::RemoveText { at, count } => {
                let leaf = query::leaf_at(doc, &at.path)
                    .ok_or_else(|| TransformError::InvalidPath(at.path.clone()))?;
                let removed = char_slice(&leaf.text, at.offset, at.offset + count)
                    .ok_or_else(|| TransformError::InvalidPath(at.path.clone()))?;
                Ok(vec![Op::InsertText {
                    at: at.clone(),
                    text: removed,
                }])
            }

            Op::SetSelection { .. } => Ok(Vec::new()),
        }
    }

    /// Apply this op to `doc`. The engine applies ops to a working copy, so a
    /// mid-op failure never reaches the committed tree.
    pub fn apply(&self, doc: &mut Document) -> Result<(), TransformError> {
        match self {
            Op::InsertNode { at, node } => {
                let (parent, index) = locate(at)?;
                let children = query::children_of_mut(doc, &parent)
                    .ok_or_else(|| TransformError::InvalidPath(at.clone()))?;
                if index > children.len() {
                    return Err(TransformError::InvalidPath(at.clone()));
                }
                children.insert(index, node.clone());
                Ok(())
            }

            Op::RemoveNode { at } => {
                let (parent, index) = locate(at)?;
                let children = query::children_of_mut(doc, &parent)
                    .ok_or_else(|| TransformError::InvalidPath(at.clone()))?;
                if index >= children.len() {
                    return Err(TransformError::InvalidPath(at.clone()));
                }
                children.remove(index);
                Ok(())
            }

            Op::MoveNode { from, to } => {
                let landing = to
                    .transform_for_remove(from)
                    .ok_or_else(|| TransformError::InvalidPath(to.clone()))?;

                let (from_parent, from_index) = locate(from)?;
                let source = query::children_of_mut(doc, &from_parent)
                    .ok_or_else(|| TransformError::InvalidPath(from.clone()))?;
                if from_index >= source.len() {
                    return Err(TransformError::InvalidPath(from.clone()));
                }
                let node = source.remove(from_index);

                let (to_parent, to_index) = locate(&landing)?;
                let target = query::children_of_mut(doc, &to_parent)
                    .ok_or_else(|| TransformError::InvalidPath(to.clone()))?;
                if to_index > target.len() {
                    return Err(TransformError::InvalidPath(to.clone()));
                }
                target.insert(to_index, node);
                Ok(())
            }

            Op::SplitNode { at, right_id } => {
                let (block_path, leaf_index) = locate(&at.path)?;
                let leaf = query::leaf_at(doc, &at.path)
                    .ok_or_else(|| TransformError::InvalidPath(at.path.clone()))?;
                let len = leaf.char_len();
                if at.offset > len {
                    return Err(TransformError::InvalidPath(at.path.clone()));
                }

                // Child index where the right half begins, plus the leaf text
                // split when the point falls inside the leaf.
                let (boundary, split_text) = if at.offset == 0 {
                    (leaf_index, None)
                } else if at.offset == len {
                    (leaf_index + 1, None)
                } else {
                    let left = char_slice(&leaf.text, 0, at.offset)
                        .ok_or_else(|| TransformError::InvalidPath(at.path.clone()))?;
                    let right = char_slice(&leaf.text, at.offset, len)
                        .ok_or_else(|| TransformError::InvalidPath(at.path.clone()))?;
                    (leaf_index + 1, Some((left, right)))
                };

                let right_block = {
                    let block = query::block_at_mut(doc, &block_path)
                        .ok_or_else(|| TransformError::InvalidPath(block_path.clone()))?;
                    let mut carry = None;
                    if let Some((left_text, right_text)) = split_text {
                        if let Some(leaf) = block.children[leaf_index].as_leaf_mut() {
                            let mut right_leaf = leaf.clone();
                            leaf.text = left_text;
                            right_leaf.text = right_text;
                            carry = Some(Child::Leaf(right_leaf));
                        }
                    }
                    let mut right_children = block.children.split_off(boundary);
                    if let Some(leaf) = carry {
                        right_children.insert(0, leaf);
                    }
                    // A boundary split leaves one side without content; both
                    // halves must stay addressable within the same batch.
                    if right_children.is_empty() {
                        right_children.push(Child::Leaf(Leaf::default()));
                    }
                    if block.children.is_empty() {
                        block.children.push(Child::Leaf(Leaf::default()));
                    }
                    Block {
                        id: right_id.clone(),
                        kind: block.kind,
                        props: block.props.clone(),
                        children: right_children,
                    }
                };

                let (parent, block_index) = locate(&block_path)?;
                let siblings = query::children_of_mut(doc, &parent)
                    .ok_or_else(|| TransformError::InvalidPath(block_path.clone()))?;
                siblings.insert(block_index + 1, Child::Block(right_block));
                Ok(())
            }

            Op::MergeNode { at } => {
                let (parent, index) = locate(at)?;
                if index == 0 {
                    return Err(TransformError::InvalidPath(at.clone()));
                }
                let children = query::children_of_mut(doc, &parent)
                    .ok_or_else(|| TransformError::InvalidPath(at.clone()))?;
                if index >= children.len()
                    || !children[index].is_block()
                    || !children[index - 1].is_block()
                {
                    return Err(TransformError::InvalidPath(at.clone()));
                }
                let merged = match children.remove(index) {
                    Child::Block(block) => block,
                    Child::Leaf(_) => return Err(TransformError::InvalidPath(at.clone())),
                };
                if let Some(prev) = children[index - 1].as_block_mut() {
                    prev.children.extend(merged.children);
                }
                Ok(())
            }

            Op::SetNodeProps { at, kind, props } => {
                let block = query::block_at_mut(doc, at)
                    .ok_or_else(|| TransformError::InvalidPath(at.clone()))?;
                block.kind = *kind;
                block.props = props.clone();
                Ok(())
            }

            Op::InsertText { at, text } => {
                let leaf = query::leaf_at_mut(doc, &at.path)
                    .ok_or_else(|| TransformError::InvalidPath(at.path.clone()))?;
                let byte = byte_offset(&leaf.text, at.offset)
                    .ok_or_else(|| TransformError::InvalidPath(at.path.clone()))?;
                leaf.text.insert_str(byte, text);
                Ok(())
            }

            Op::RemoveText { at, count } => {
                let leaf = query::leaf_at_mut(doc, &at.path)
                    .ok_or_else(|| TransformError::InvalidPath(at.path.clone()))?;
                let start = byte_offset(&leaf.text, at.offset)
                    .ok_or_else(|| TransformError::InvalidPath(at.path.clone()))?;
                let end = byte_offset(&leaf.text, at.offset + count)
                    .ok_or_else(|| TransformError::InvalidPath(at.path.clone()))?;
                leaf.text.replace_range(start..end, "");
                Ok(())
            }

            // Selection is engine state, not tree state.
            Op::SetSelection { .. } => Ok(()),
        }
    }
}

/// Split a non-root path into its parent and sibling index.
pub(crate) fn locate(path: &Path) -> Result<(Path, usize), TransformError> {
    match (path.parent(), path.index()) {
        (Some(parent), Some(index)) => Ok((parent, index)),
        _ => Err(TransformError::InvalidPath(path.clone())),
    }
}

/// Byte position of a character offset, `None` when out of bounds.
pub(crate) fn byte_offset(text: &str, char_offset: usize) -> Option<usize> {
    if char_offset == 0 {
        return Some(0);
    }
    text.char_indices()
        .map(|(index, _)| index)
        .chain(std::iter::once(text.len()))
        .nth(char_offset)
}

/// Substring between two character offsets.
pub(crate) fn char_slice(text: &str, start: usize, end: usize) -> Option<String> {
    let start = byte_offset(text, start)?;
    let end = byte_offset(text, end)?;
    text.get(start..end).map(str::to_string)
}

fn id_exists(doc: &Document, id: &str) -> bool {
    query::blocks(doc).any(|(_, block)| block.id == id)
}

fn validate_inserted_child(
    doc: &Document,
    parent: &Path,
    node: &Child,
) -> Result<(), TransformError> {
    let parent_kind = if parent.is_root() {
        None
    } else {
        Some(
            query::block_at(doc, parent)
                .ok_or_else(|| TransformError::InvalidPath(parent.clone()))?
                .kind,
        )
    };

    match node {
        Child::Leaf(_) => {
            match parent_kind {
                None => Err(TransformError::MalformedInsert(
                    "text leaf at document root".to_string(),
                )),
                Some(kind) if !kind.has_leaf_children() => Err(TransformError::MalformedInsert(
                    "text leaf inside a container block".to_string(),
                )),
                Some(_) => Ok(()),
            }
        }
        Child::Block(block) => {
            if parent_kind == Some(BlockKind::Column) && block.kind != BlockKind::ColumnCell {
                return Err(TransformError::MalformedInsert(
                    "column children must be column cells".to_string(),
                ));
            }
            if parent_kind != Some(BlockKind::Column) && block.kind == BlockKind::ColumnCell {
                return Err(TransformError::MalformedInsert(
                    "column cell outside a column".to_string(),
                ));
            }
            validate_block_shape(block)?;

            let mut seen = HashSet::new();
            collect_unique_ids(block, &mut seen)?;
            for id in &seen {
                if id_exists(doc, id) {
                    return Err(TransformError::MalformedInsert(format!(
                        "duplicate id: {id}"
                    )));
                }
            }
            Ok(())
        }
    }
}

fn validate_block_shape(block: &Block) -> Result<(), TransformError> {
    if block.id.is_empty() {
        return Err(TransformError::MalformedInsert(
            "node is missing an id".to_string(),
        ));
    }
    match block.kind {
        BlockKind::Column => {
            let all_cells = block
                .children
                .iter()
                .all(|child| matches!(child, Child::Block(b) if b.kind == BlockKind::ColumnCell));
            if !all_cells {
                return Err(TransformError::MalformedInsert(
                    "column children must be column cells".to_string(),
                ));
            }
        }
        BlockKind::Mcq => {
            let options = block
                .child_blocks()
                .find(|b| b.kind == BlockKind::Ol)
                .map(|ol| {
                    ol.child_blocks()
                        .filter(|b| b.kind == BlockKind::OptionListItem)
                        .count()
                })
                .unwrap_or(0);
            if options < 2 {
                return Err(TransformError::MalformedInsert(
                    "mcq requires at least 2 options".to_string(),
                ));
            }
        }
        _ => {}
    }
    for child in block.child_blocks() {
        validate_block_shape(child)?;
    }
    Ok(())
}

fn collect_unique_ids<'a>(
    block: &'a Block,
    seen: &mut HashSet<&'a str>,
) -> Result<(), TransformError> {
    if !seen.insert(block.id.as_str()) {
        return Err(TransformError::MalformedInsert(format!(
            "duplicate id: {}",
            block.id
        )));
    }
    for child in block.child_blocks() {
        collect_unique_ids(child, seen)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(vec![
            Block::with_text("a-1", BlockKind::Paragraph, "hello world"),
            Block::with_text("a-2", BlockKind::Paragraph, "second"),
        ])
    }

    fn apply(doc: &mut Document, op: &Op) -> Vec<Op> {
        op.validate(doc).unwrap();
        let inverse = op.invert(doc).unwrap();
        op.apply(doc).unwrap();
        inverse
    }

    #[test]
    fn test_insert_and_invert() {
        let mut d = doc();
        let op = Op::InsertNode {
            at: Path::from(vec![1]),
            node: Child::Block(Block::with_text("a-3", BlockKind::Paragraph, "mid")),
        };
        let inverse = apply(&mut d, &op);

        assert_eq!(query::block_at(&d, &Path::from(vec![1])).unwrap().id, "a-3");
        assert_eq!(query::block_at(&d, &Path::from(vec![2])).unwrap().id, "a-2");

        for op in &inverse {
            op.apply(&mut d).unwrap();
        }
        assert_eq!(d, doc());
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let d = doc();
        let op = Op::InsertNode {
            at: Path::from(vec![0]),
            node: Child::Block(Block::with_text("a-1", BlockKind::Paragraph, "dup")),
        };
        assert!(matches!(
            op.validate(&d),
            Err(TransformError::MalformedInsert(_))
        ));
    }

    #[test]
    fn test_remove_root_is_root_violation() {
        let d = doc();
        let op = Op::RemoveNode { at: Path::root() };
        assert_eq!(op.validate(&d), Err(TransformError::RootViolation));
    }

    #[test]
    fn test_move_within_parent() {
        let mut d = Document::new(vec![
            Block::with_text("a-1", BlockKind::Paragraph, "one"),
            Block::with_text("a-2", BlockKind::Paragraph, "two"),
            Block::with_text("a-3", BlockKind::Paragraph, "three"),
        ]);
        let op = Op::MoveNode {
            from: Path::from(vec![0]),
            to: Path::from(vec![3]),
        };
        let inverse = apply(&mut d, &op);

        let order: Vec<&str> = d.blocks().map(|b| b.id.as_str()).collect();
        assert_eq!(order, vec!["a-2", "a-3", "a-1"]);

        for op in &inverse {
            op.apply(&mut d).unwrap();
        }
        let order: Vec<&str> = d.blocks().map(|b| b.id.as_str()).collect();
        assert_eq!(order, vec!["a-1", "a-2", "a-3"]);
    }

    #[test]
    fn test_move_into_own_subtree_is_rejected() {
        let d = Document::new(vec![Block::with_children(
            "c-1",
            BlockKind::Column,
            vec![Child::Block(Block::with_children(
                "c-2",
                BlockKind::ColumnCell,
                vec![Child::Block(Block::with_text(
                    "c-3",
                    BlockKind::Paragraph,
                    "inner",
                ))],
            ))],
        )]);
        let op = Op::MoveNode {
            from: Path::from(vec![0]),
            to: Path::from(vec![0, 0, 0]),
        };
        assert!(matches!(
            op.validate(&d),
            Err(TransformError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_split_then_inverse_merge_round_trip() {
        let mut d = doc();
        let op = Op::SplitNode {
            at: Point::new(vec![0, 0], 5),
            right_id: "a-9".to_string(),
        };
        let inverse = apply(&mut d, &op);

        let left = query::block_at(&d, &Path::from(vec![0])).unwrap();
        let right = query::block_at(&d, &Path::from(vec![1])).unwrap();
        assert_eq!(left.id, "a-1");
        assert_eq!(left.text(), "hello");
        assert_eq!(right.id, "a-9");
        assert_eq!(right.text(), " world");
        assert_eq!(query::block_at(&d, &Path::from(vec![2])).unwrap().id, "a-2");

        for op in &inverse {
            op.apply(&mut d).unwrap();
        }
        let restored = query::block_at(&d, &Path::from(vec![0])).unwrap();
        assert_eq!(restored.id, "a-1");
        assert_eq!(restored.text(), "hello world");
    }

    #[test]
    fn test_split_atomic_rejected() {
        let mut equation = Block::new("e-1", BlockKind::Equation);
        equation.props.latex = Some("x".to_string());
        let d = Document::new(vec![equation]);
        let op = Op::SplitNode {
            at: Point::new(vec![0, 0], 0),
            right_id: "e-2".to_string(),
        };
        assert!(matches!(
            op.validate(&d),
            Err(TransformError::MalformedInsert(_))
        ));
    }

    #[test]
    fn test_merge_restores_kind_on_undo() {
        let mut d = Document::new(vec![
            Block::with_text("t-1", BlockKind::Title, "Heading"),
            Block::with_text("p-1", BlockKind::Paragraph, "body"),
        ]);
        let op = Op::MergeNode {
            at: Path::from(vec![1]),
        };
        let inverse = apply(&mut d, &op);

        assert_eq!(d.len(), 1);
        let merged = query::block_at(&d, &Path::from(vec![0])).unwrap();
        assert_eq!(merged.id, "t-1");
        assert_eq!(merged.text(), "Headingbody");

        for op in &inverse {
            op.apply(&mut d).unwrap();
        }
        let back = query::block_at(&d, &Path::from(vec![1])).unwrap();
        assert_eq!(back.id, "p-1");
        assert_eq!(back.kind, BlockKind::Paragraph);
        assert_eq!(back.text(), "body");
    }

    #[test]
    fn test_merge_first_sibling_rejected() {
        let d = doc();
        let op = Op::MergeNode {
            at: Path::from(vec![0]),
        };
        assert!(matches!(
            op.validate(&d),
            Err(TransformError::InvalidPath(_))
        ));
        assert_eq!(
            Op::MergeNode { at: Path::root() }.validate(&d),
            Err(TransformError::RootViolation)
        );
    }

    #[test]
    fn test_text_ops_round_trip() {
        let mut d = doc();
        let insert = Op::InsertText {
            at: Point::new(vec![0, 0], 5),
            text: " there".to_string(),
        };
        let inverse = apply(&mut d, &insert);
        assert_eq!(
            query::block_at(&d, &Path::from(vec![0])).unwrap().text(),
            "hello there world"
        );

        for op in &inverse {
            op.apply(&mut d).unwrap();
        }
        assert_eq!(d, doc());
    }

    #[test]
    fn test_remove_text_inverse_restores_content() {
        let mut d = doc();
        let remove = Op::RemoveText {
            at: Point::new(vec![0, 0], 0),
            count: 6,
        };
        let inverse = apply(&mut d, &remove);
        assert_eq!(
            query::block_at(&d, &Path::from(vec![0])).unwrap().text(),
            "world"
        );

        for op in &inverse {
            op.apply(&mut d).unwrap();
        }
        assert_eq!(d, doc());
    }

    #[test]
    fn test_char_offsets_are_not_bytes() {
        let mut d = Document::new(vec![Block::with_text("u-1", BlockKind::Paragraph, "héllo")]);
        let op = Op::InsertText {
            at: Point::new(vec![0, 0], 2),
            text: "x".to_string(),
        };
        apply(&mut d, &op);
        assert_eq!(
            query::block_at(&d, &Path::from(vec![0])).unwrap().text(),
            "héxllo"
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let op = Op::MoveNode {
            from: Path::from(vec![2]),
            to: Path::from(vec![0, 1, 0]),
        };
        let json = serde_json::to_string(&op).unwrap();
        let back: Op = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);
    }
}
