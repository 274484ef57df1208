use serde::{Deserialize, Serialize};

/// Closed set of block kinds understood by the editor.
///
/// Serialized kebab-case to match the persisted document format. Transform and
/// keyboard logic matches on this exhaustively, so adding a kind is a
/// compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Paragraph,
    Title,
    HeadingOne,
    HeadingTwo,
    HeadingThree,
    Mcq,
    ListItem,
    Ol,
    OptionListItem,
    Equation,
    Map,
    Column,
    ColumnCell,
    Tts,
}

impl BlockKind {
    /// Atomic blocks are never split, merged, or entered
    /// character-by-character; cursor navigation skips over them.
    pub fn is_atomic(&self) -> bool {
        matches!(self, BlockKind::Equation | BlockKind::Map | BlockKind::Tts)
    }

    /// Kinds whose children are text leaves rather than nested blocks.
    pub fn has_leaf_children(&self) -> bool {
        !matches!(
            self,
            BlockKind::Mcq | BlockKind::Ol | BlockKind::Column | BlockKind::ColumnCell
        )
    }
}

/// Kind-specific block attributes. Absent fields are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Props {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latex: Option<String>,

    #[serde(rename = "altText", skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,

    #[serde(rename = "correctAnswer", skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<bool>,

    #[serde(rename = "questionNumber", skip_serializing_if = "Option::is_none")]
    pub question_number: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,

    #[serde(rename = "audioUrl", skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,

    #[serde(rename = "voiceId", skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
}

/// A run of text inside a block, with optional formatting marks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub text: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,

    /// Fill-in-the-blank marker (rendered as an answer slot).
    #[serde(default, skip_serializing_if = "is_false")]
    pub blank: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Leaf {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// A single-space leaf carrying the blank marker.
    pub fn blank() -> Self {
        Self {
            text: " ".to_string(),
            blank: true,
            ..Self::default()
        }
    }

    /// Length in characters (offsets are char-based, not byte-based).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// True when the two leaves carry identical formatting and can be fused
    /// into a single run.
    pub fn same_marks(&self, other: &Leaf) -> bool {
        self.bold == other.bold
            && self.italic == other.italic
            && self.underline == other.underline
            && self.strikethrough == other.strikethrough
            && self.blank == other.blank
    }
}

/// A structural node of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Globally unique, assigned once at creation and preserved across moves
    /// and the surviving side of merges.
    pub id: String,

    #[serde(rename = "type")]
    pub kind: BlockKind,

    #[serde(flatten)]
    pub props: Props,

    pub children: Vec<Child>,
}

impl Block {
    /// New block of `kind` holding a single empty leaf.
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            kind,
            props: Props::default(),
            children: vec![Child::Leaf(Leaf::default())],
        }
    }

    /// New block of `kind` holding a single text leaf.
    pub fn with_text(id: impl Into<String>, kind: BlockKind, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            props: Props::default(),
            children: vec![Child::Leaf(Leaf::new(text))],
        }
    }

    /// New block with explicit children.
    pub fn with_children(id: impl Into<String>, kind: BlockKind, children: Vec<Child>) -> Self {
        Self {
            id: id.into(),
            kind,
            props: Props::default(),
            children,
        }
    }

    /// Child block references, skipping leaves.
    pub fn child_blocks(&self) -> impl Iterator<Item = &Block> {
        self.children.iter().filter_map(Child::as_block)
    }

    /// Child leaf references, skipping nested blocks.
    pub fn child_leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.children.iter().filter_map(Child::as_leaf)
    }

    /// Concatenated text of all descendant leaves.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// True for a block whose content is a single empty leaf, the shape of a
    /// freshly inserted paragraph.
    pub fn is_empty_text(&self) -> bool {
        matches!(self.children.as_slice(), [Child::Leaf(leaf)] if leaf.text.is_empty())
    }
}

fn collect_text(children: &[Child], out: &mut String) {
    for child in children {
        match child {
            Child::Leaf(leaf) => out.push_str(&leaf.text),
            Child::Block(block) => collect_text(&block.children, out),
        }
    }
}

/// A child slot in the tree: either a nested block or a text leaf.
///
/// Untagged on the wire: a block is recognized by its `type` tag, a leaf by
/// its `text` field, matching the persisted format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Child {
    Block(Block),
    Leaf(Leaf),
}

impl Child {
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Child::Block(block) => Some(block),
            Child::Leaf(_) => None,
        }
    }

    pub fn as_block_mut(&mut self) -> Option<&mut Block> {
        match self {
            Child::Block(block) => Some(block),
            Child::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Child::Leaf(leaf) => Some(leaf),
            Child::Block(_) => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut Leaf> {
        match self {
            Child::Leaf(leaf) => Some(leaf),
            Child::Block(_) => None,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Child::Block(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Child::Leaf(_))
    }
}

/// The document root. Root-level children are always blocks.
///
/// Serialized transparently as the ordered block array collaborators load and
/// persist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub children: Vec<Child>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            children: blocks.into_iter().map(Child::Block).collect(),
        }
    }

    /// Root-level blocks in order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.children.iter().filter_map(Child::as_block)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
