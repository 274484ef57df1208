//! Pure, side-effect-free lookups over a document.
//!
//! Everything here returns `Option`; callers that need a hard failure (the
//! transform engine) convert misses into their own error type.

use crate::node::{Block, Child, Document, Leaf};
use crate::path::{Path, Point};

/// Immutable reference to a node of either flavor.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Block(&'a Block),
    Leaf(&'a Leaf),
}

/// The child at `path`, or `None` when the path does not resolve (including
/// the root, which is not a child).
pub fn child_at<'a>(doc: &'a Document, path: &Path) -> Option<&'a Child> {
    let (last, ancestors) = path.indices().split_last()?;
    let mut children = &doc.children;
    for &index in ancestors {
        children = &children.get(index)?.as_block()?.children;
    }
    children.get(*last)
}

/// The node at `path` as a [`NodeRef`].
pub fn node_at<'a>(doc: &'a Document, path: &Path) -> Option<NodeRef<'a>> {
    match child_at(doc, path)? {
        Child::Block(block) => Some(NodeRef::Block(block)),
        Child::Leaf(leaf) => Some(NodeRef::Leaf(leaf)),
    }
}

/// The block at `path`; `None` when the path resolves to a leaf or nothing.
pub fn block_at<'a>(doc: &'a Document, path: &Path) -> Option<&'a Block> {
    child_at(doc, path)?.as_block()
}

pub fn block_at_mut<'a>(doc: &'a mut Document, path: &Path) -> Option<&'a mut Block> {
    child_at_mut(doc, path)?.as_block_mut()
}

/// The leaf at `path`; `None` when the path resolves to a block or nothing.
pub fn leaf_at<'a>(doc: &'a Document, path: &Path) -> Option<&'a Leaf> {
    child_at(doc, path)?.as_leaf()
}

pub fn leaf_at_mut<'a>(doc: &'a mut Document, path: &Path) -> Option<&'a mut Leaf> {
    child_at_mut(doc, path)?.as_leaf_mut()
}

pub fn child_at_mut<'a>(doc: &'a mut Document, path: &Path) -> Option<&'a mut Child> {
    let (last, ancestors) = path.indices().split_last()?;
    let mut children = &mut doc.children;
    for &index in ancestors {
        children = &mut children.get_mut(index)?.as_block_mut()?.children;
    }
    children.get_mut(*last)
}

/// The child list owned by the node at `path`: the root's children when the
/// path is the root, a block's children otherwise. `None` for leaves and
/// unresolvable paths.
pub fn children_of<'a>(doc: &'a Document, path: &Path) -> Option<&'a Vec<Child>> {
    if path.is_root() {
        return Some(&doc.children);
    }
    Some(&block_at(doc, path)?.children)
}

pub fn children_of_mut<'a>(doc: &'a mut Document, path: &Path) -> Option<&'a mut Vec<Child>> {
    if path.is_root() {
        return Some(&mut doc.children);
    }
    Some(&mut block_at_mut(doc, path)?.children)
}

/// Document-order (pre-order) iterator over all blocks with their paths.
pub struct BlockIter<'a> {
    stack: Vec<(Path, &'a Block)>,
}

impl<'a> Iterator for BlockIter<'a> {
    type Item = (Path, &'a Block);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, block) = self.stack.pop()?;
        for (index, child) in block.children.iter().enumerate().rev() {
            if let Child::Block(nested) = child {
                self.stack.push((path.child(index), nested));
            }
        }
        Some((path, block))
    }
}

/// All blocks in document order.
pub fn blocks(doc: &Document) -> BlockIter<'_> {
    let mut stack = Vec::new();
    for (index, child) in doc.children.iter().enumerate().rev() {
        if let Child::Block(block) = child {
            stack.push((Path::root().child(index), block));
        }
    }
    BlockIter { stack }
}

/// Path of the block carrying `id`, if present.
pub fn find_path_by_id(doc: &Document, id: &str) -> Option<Path> {
    blocks(doc).find(|(_, block)| block.id == id).map(|(path, _)| path)
}

/// Block carrying `id` together with its path.
pub fn block_by_id<'a>(doc: &'a Document, id: &str) -> Option<(Path, &'a Block)> {
    blocks(doc).find(|(_, block)| block.id == id)
}

/// The last block strictly before `before` in document order that satisfies
/// `predicate`.
pub fn previous_block_matching<'a>(
    doc: &'a Document,
    before: &Path,
    predicate: impl Fn(&Block) -> bool,
) -> Option<(Path, &'a Block)> {
    let mut found = None;
    for (path, block) in blocks(doc) {
        if &path >= before {
            break;
        }
        if predicate(block) {
            found = Some((path, block));
        }
    }
    found
}

/// The first point inside the subtree at `path`, the start of its first leaf
/// descendant. For a leaf path, the leaf's own start.
pub fn start_point(doc: &Document, path: &Path) -> Option<Point> {
    let mut current = path.clone();
    loop {
        match node_at(doc, &current)? {
            NodeRef::Leaf(_) => return Some(Point::new(current, 0)),
            NodeRef::Block(block) => {
                if block.children.is_empty() {
                    return None;
                }
                current = current.child(0);
            }
        }
    }
}

/// The last point inside the subtree at `path`, the end of its last leaf
/// descendant.
pub fn end_point(doc: &Document, path: &Path) -> Option<Point> {
    let mut current = path.clone();
    loop {
        match node_at(doc, &current)? {
            NodeRef::Leaf(leaf) => return Some(Point::new(current, leaf.char_len())),
            NodeRef::Block(block) => {
                if block.children.is_empty() {
                    return None;
                }
                current = current.child(block.children.len() - 1);
            }
        }
    }
}

/// True when `point` sits at the very start of the subtree at `ancestor`.
pub fn is_at_start(doc: &Document, point: &Point, ancestor: &Path) -> bool {
    start_point(doc, ancestor).as_ref() == Some(point)
}

/// True when `point` sits at the very end of the subtree at `ancestor`.
pub fn is_at_end(doc: &Document, point: &Point, ancestor: &Path) -> bool {
    end_point(doc, ancestor).as_ref() == Some(point)
}
