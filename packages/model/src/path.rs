use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of a node as the sequence of sibling indices from the document
/// root. Root children live at depth 1; the empty path is the root itself.
///
/// `Ord` is document order: a parent sorts before its descendants, earlier
/// siblings before later ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn new(indices: Vec<usize>) -> Self {
        Path(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Sibling index at the deepest level; `None` for the root.
    pub fn index(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        Some(Path(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Path of a child at `index`.
    pub fn child(&self, index: usize) -> Path {
        let mut indices = self.0.clone();
        indices.push(index);
        Path(indices)
    }

    /// Path of the next sibling; `None` for the root.
    pub fn next(&self) -> Option<Path> {
        let mut indices = self.0.clone();
        *indices.last_mut()? += 1;
        Some(Path(indices))
    }

    /// Path of the previous sibling; `None` at index 0 or the root.
    pub fn previous(&self) -> Option<Path> {
        let mut indices = self.0.clone();
        let last = indices.last_mut()?;
        if *last == 0 {
            return None;
        }
        *last -= 1;
        Some(Path(indices))
    }

    /// True when `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// True when both paths share a parent.
    pub fn is_sibling_of(&self, other: &Path) -> bool {
        !self.is_root()
            && self.0.len() == other.0.len()
            && self.0[..self.0.len() - 1] == other.0[..other.0.len() - 1]
    }

    /// Remap this path across an insertion at `at`: siblings at or after the
    /// insertion index shift down by one, as do their descendants.
    pub fn transform_for_insert(&self, at: &Path) -> Path {
        let mut out = self.clone();
        if at.is_root() {
            return out;
        }
        let depth = at.0.len() - 1;
        if out.0.len() >= at.0.len()
            && out.0[..depth] == at.0[..depth]
            && out.0[depth] >= at.0[depth]
        {
            out.0[depth] += 1;
        }
        out
    }

    /// Remap this path across a removal at `at`. Returns `None` when the path
    /// addressed the removed node or something inside it.
    pub fn transform_for_remove(&self, at: &Path) -> Option<Path> {
        let mut out = self.clone();
        if at.is_root() {
            return Some(out);
        }
        let depth = at.0.len() - 1;
        if out.0.len() >= at.0.len() && out.0[..depth] == at.0[..depth] {
            if out.0[depth] == at.0[depth] {
                // Same prefix up to and including the removed index means the
                // path lived inside the removed subtree.
                return None;
            }
            if out.0[depth] > at.0[depth] {
                out.0[depth] -= 1;
            }
        }
        Some(out)
    }

    /// Remap this path across a move of the subtree at `from` to the landing
    /// position `to` (expressed in post-removal coordinates). Paths inside the
    /// moved subtree follow it.
    pub fn transform_for_move(&self, from: &Path, to: &Path) -> Path {
        match self.transform_for_remove(from) {
            // Inside the moved subtree: reattach the suffix under the landing
            // position.
            None => {
                let mut out = to.clone();
                out.0.extend_from_slice(&self.0[from.0.len()..]);
                out
            }
            Some(shifted) => shifted.transform_for_insert(to),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{index}")?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Path(indices)
    }
}

impl From<&[usize]> for Path {
    fn from(indices: &[usize]) -> Self {
        Path(indices.to_vec())
    }
}

/// A character position inside a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: impl Into<Path>, offset: usize) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }
}

/// A selection between two points. Collapsed iff anchor equals focus.
///
/// Anchor and focus are free to appear in either document order; `start` and
/// `end` give the ordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Point,
    pub focus: Point,
}

impl Range {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn start(&self) -> &Point {
        Point::min(&self.anchor, &self.focus)
    }

    pub fn end(&self) -> &Point {
        Point::max(&self.anchor, &self.focus)
    }
}

impl Point {
    fn min<'a>(&'a self, other: &'a Point) -> &'a Point {
        if self <= other { self } else { other }
    }

    fn max<'a>(&'a self, other: &'a Point) -> &'a Point {
        if self >= other { self } else { other }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(indices: &[usize]) -> Path {
        Path::from(indices)
    }

    #[test]
    fn test_parent_next_previous() {
        let p = path(&[2, 1]);
        assert_eq!(p.parent(), Some(path(&[2])));
        assert_eq!(p.next(), Some(path(&[2, 2])));
        assert_eq!(p.previous(), Some(path(&[2, 0])));
        assert_eq!(path(&[2, 0]).previous(), None);
        assert_eq!(Path::root().parent(), None);
        assert_eq!(Path::root().next(), None);
    }

    #[test]
    fn test_document_order() {
        assert!(path(&[1]) < path(&[1, 0]));
        assert!(path(&[1, 5]) < path(&[2]));
        assert!(path(&[0, 2]) < path(&[0, 10]));
    }

    #[test]
    fn test_ancestor_and_sibling() {
        assert!(path(&[1]).is_ancestor_of(&path(&[1, 0, 2])));
        assert!(!path(&[1]).is_ancestor_of(&path(&[1])));
        assert!(!path(&[1, 0]).is_ancestor_of(&path(&[2, 0])));
        assert!(path(&[1, 0]).is_sibling_of(&path(&[1, 3])));
        assert!(!path(&[1, 0]).is_sibling_of(&path(&[2, 0])));
    }

    #[test]
    fn test_transform_for_insert_shifts_later_siblings() {
        // Inserting at [2] shifts a previously held [3] to [4]
        assert_eq!(path(&[3]).transform_for_insert(&path(&[2])), path(&[4]));
        assert_eq!(path(&[2]).transform_for_insert(&path(&[2])), path(&[3]));
        assert_eq!(path(&[1]).transform_for_insert(&path(&[2])), path(&[1]));
        // Descendants shift with their ancestors
        assert_eq!(
            path(&[3, 0, 1]).transform_for_insert(&path(&[2])),
            path(&[4, 0, 1])
        );
        // Other subtrees are untouched
        assert_eq!(
            path(&[1, 4]).transform_for_insert(&path(&[2, 0])),
            path(&[1, 4])
        );
    }

    #[test]
    fn test_transform_for_remove_shifts_and_kills() {
        // Removing [2] shifts [3] to [2]
        assert_eq!(
            path(&[3]).transform_for_remove(&path(&[2])),
            Some(path(&[2]))
        );
        assert_eq!(
            path(&[1]).transform_for_remove(&path(&[2])),
            Some(path(&[1]))
        );
        // The removed node and its descendants die
        assert_eq!(path(&[2]).transform_for_remove(&path(&[2])), None);
        assert_eq!(path(&[2, 1, 0]).transform_for_remove(&path(&[2])), None);
    }

    #[test]
    fn test_transform_for_move_follows_subtree() {
        // The moved node itself lands at the destination
        assert_eq!(
            path(&[1]).transform_for_move(&path(&[1]), &path(&[4])),
            path(&[4])
        );
        // Paths inside it keep their suffix
        assert_eq!(
            path(&[1, 2]).transform_for_move(&path(&[1]), &path(&[4, 0])),
            path(&[4, 0, 2])
        );
        // Bystanders get the remove+insert composition
        assert_eq!(
            path(&[3]).transform_for_move(&path(&[1]), &path(&[0])),
            path(&[3])
        );
        assert_eq!(
            path(&[2]).transform_for_move(&path(&[5]), &path(&[1])),
            path(&[3])
        );
    }

    #[test]
    fn test_range_orientation() {
        let forward = Range::new(Point::new(vec![0, 0], 1), Point::new(vec![1, 0], 2));
        assert_eq!(forward.start().offset, 1);

        let backward = Range::new(Point::new(vec![1, 0], 2), Point::new(vec![0, 0], 1));
        assert_eq!(backward.start().offset, 1);
        assert_eq!(backward.end().offset, 2);

        assert!(Range::collapsed(Point::new(vec![0, 0], 3)).is_collapsed());
        assert!(!forward.is_collapsed());
    }
}
