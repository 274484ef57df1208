//! # Blockdoc Model
//!
//! The canonical in-memory representation of a block document:
//!
//! - [`node`]: the tree itself: [`Block`], [`Leaf`], the closed [`BlockKind`]
//!   tag set, and the [`Document`] root
//! - [`path`]: sibling-index addressing ([`Path`], [`Point`], [`Range`]) and
//!   the shift rules used to remap addresses across edits
//! - [`query`]: pure, side-effect-free lookups over a document
//! - [`id`]: document-seeded sequential node id generation
//!
//! Everything here is data and pure functions. Mutation lives in
//! `blockdoc-editor`, which applies validated operation batches on top of
//! these types.

pub mod id;
pub mod node;
pub mod path;
pub mod query;

pub use id::IdGenerator;
pub use node::{Block, BlockKind, Child, Document, Leaf, Props};
pub use path::{Path, Point, Range};
