//! Selection remapping.
//!
//! After each applied op the current anchor/focus points are pushed through
//! the same shift rules the tree uses. A point that pointed inside a removed
//! subtree is reported as dead and recovered to the nearest valid boundary:
//! the start of the following sibling, or the end of the preceding sibling at
//! the end of the parent.

use blockdoc_model::{query, Document, Path, Point, Range};

use crate::ops::Op;

/// Result of pushing a range through one op.
pub(crate) enum RangeXform {
    Mapped(Range),
    /// The range touched a removed subtree; carries the removed path in
    /// post-removal coordinates for recovery.
    Dead(Path),
}

enum PointXform {
    Mapped(Point),
    Dead(Path),
}

/// Transform `range` through `op`. `before` is the tree the op has not yet
/// been applied to; split and merge arithmetic needs pre-op child counts.
pub(crate) fn transform_range(range: &Range, op: &Op, before: &Document) -> RangeXform {
    let anchor = transform_point(&range.anchor, op, before);
    let focus = transform_point(&range.focus, op, before);
    match (anchor, focus) {
        (PointXform::Mapped(anchor), PointXform::Mapped(focus)) => {
            RangeXform::Mapped(Range::new(anchor, focus))
        }
        (PointXform::Dead(path), _) | (_, PointXform::Dead(path)) => RangeXform::Dead(path),
    }
}

fn transform_point(point: &Point, op: &Op, before: &Document) -> PointXform {
    match op {
        Op::InsertNode { at, .. } => PointXform::Mapped(Point::new(
            point.path.transform_for_insert(at),
            point.offset,
        )),

        Op::RemoveNode { at } => match point.path.transform_for_remove(at) {
            Some(path) => PointXform::Mapped(Point::new(path, point.offset)),
            None => PointXform::Dead(at.clone()),
        },

        Op::MoveNode { from, to } => match to.transform_for_remove(from) {
            Some(landing) => PointXform::Mapped(Point::new(
                point.path.transform_for_move(from, &landing),
                point.offset,
            )),
            None => PointXform::Mapped(point.clone()),
        },

        Op::SplitNode { at, .. } => transform_for_split(point, at, before),

        Op::MergeNode { at } => transform_for_merge(point, at, before),

        // Strictly-after only: a caret sitting exactly at the insertion point
        // stays put (explicit SetSelection ops move it when typing).
        Op::InsertText { at, text } => {
            let mut offset = point.offset;
            if point.path == at.path && point.offset > at.offset {
                offset += text.chars().count();
            }
            PointXform::Mapped(Point::new(point.path.clone(), offset))
        }

        Op::RemoveText { at, count } => {
            let mut offset = point.offset;
            if point.path == at.path && point.offset > at.offset {
                if point.offset >= at.offset + count {
                    offset -= count;
                } else {
                    offset = at.offset;
                }
            }
            PointXform::Mapped(Point::new(point.path.clone(), offset))
        }

        Op::SetNodeProps { .. } | Op::SetSelection { .. } => PointXform::Mapped(point.clone()),
    }
}

fn transform_for_split(point: &Point, at: &Point, before: &Document) -> PointXform {
    let (Some(block_path), Some(leaf_index)) = (at.path.parent(), at.path.index()) else {
        return PointXform::Mapped(point.clone());
    };
    let Some(right_path) = block_path.next() else {
        return PointXform::Mapped(point.clone());
    };
    let leaf_len = query::leaf_at(before, &at.path).map_or(0, |leaf| leaf.char_len());
    let mid_split = at.offset > 0 && at.offset < leaf_len;
    // Child index in the original block where the right half begins.
    let boundary = if at.offset == 0 {
        leaf_index
    } else {
        leaf_index + 1
    };

    if point.path == at.path {
        let goes_right = if mid_split {
            point.offset >= at.offset
        } else {
            at.offset == 0
        };
        if goes_right {
            let offset = if mid_split {
                point.offset - at.offset
            } else {
                point.offset
            };
            return PointXform::Mapped(Point::new(right_path.child(0), offset));
        }
        return PointXform::Mapped(point.clone());
    }

    if point.path.parent().as_ref() == Some(&block_path) {
        if let Some(index) = point.path.index() {
            if index >= boundary {
                let carried = usize::from(mid_split);
                return PointXform::Mapped(Point::new(
                    right_path.child(index - boundary + carried),
                    point.offset,
                ));
            }
        }
        return PointXform::Mapped(point.clone());
    }

    PointXform::Mapped(Point::new(
        point.path.transform_for_insert(&right_path),
        point.offset,
    ))
}

fn transform_for_merge(point: &Point, at: &Path, before: &Document) -> PointXform {
    let Some(prev_path) = at.previous() else {
        return PointXform::Mapped(point.clone());
    };
    let junction = query::block_at(before, &prev_path).map_or(0, |prev| prev.children.len());

    if at.is_ancestor_of(&point.path) {
        let suffix = &point.path.indices()[at.len()..];
        let mut indices = prev_path.indices().to_vec();
        indices.push(junction + suffix[0]);
        indices.extend_from_slice(&suffix[1..]);
        return PointXform::Mapped(Point::new(Path::new(indices), point.offset));
    }

    match point.path.transform_for_remove(at) {
        Some(path) => PointXform::Mapped(Point::new(path, point.offset)),
        None => PointXform::Mapped(point.clone()),
    }
}

/// Collapse a dead selection to the nearest valid boundary after the batch
/// removed the subtree at `removed` (post-removal coordinates).
pub(crate) fn recover_point(doc: &Document, removed: &Path) -> Option<Point> {
    let mut at = removed.clone();
    loop {
        let parent = at.parent()?;
        let index = at.index()?;
        match query::children_of(doc, &parent) {
            None => {
                at = parent;
                continue;
            }
            Some(siblings) => {
                if index < siblings.len() {
                    if let Some(point) = query::start_point(doc, &parent.child(index)) {
                        return Some(point);
                    }
                }
                if !siblings.is_empty() {
                    if let Some(point) = query::end_point(doc, &parent.child(siblings.len() - 1)) {
                        return Some(point);
                    }
                }
                at = parent;
            }
        }
    }
}
