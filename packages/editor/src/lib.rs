//! # Blockdoc Editor
//!
//! The structured document editing core behind the block editor UI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ model: tree, paths, pure queries            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: batches over primitive ops          │
//! │  - validate → invert → apply, atomically    │
//! │  - one normalization pass per batch         │
//! │  - one selection remap per batch            │
//! │  - inverse-op undo/redo                     │
//! └─────────────────────────────────────────────┘
//!                     ↑
//! ┌─────────────────────────────────────────────┐
//! │ commands / drag: keyboard rules and drag    │
//! │ sessions compiled into batches              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The tree is the source of truth**: rendering, persistence, and audio
//!    are collaborators that read snapshots and feed batches back in
//! 2. **One batch, one undo step, one notification**: composite actions never
//!    leak intermediate states
//! 3. **Aborts are total**: a failing op anywhere in a batch leaves the
//!    committed tree, selection, version, and history untouched
//! 4. **Closed block-kind set**: keyboard and transform dispatch match
//!    exhaustively, so new kinds are compile-time-checked
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blockdoc_editor::{Editor, Key, KeyEvent};
//!
//! let mut editor = Editor::new("workspace-1");
//! editor.load(blocks)?;
//!
//! editor.on_change(|doc, patch| persist(doc, patch.version));
//!
//! editor.handle_key(KeyEvent::char('H'))?;
//! editor.handle_key(KeyEvent::plain(Key::Enter))?;
//!
//! editor.drag_start("block-id");
//! editor.drag_over(over_event);
//! editor.drag_end()?;
//!
//! editor.undo()?;
//! ```

mod blocks;
mod commands;
mod drag;
mod editor;
mod errors;
mod history;
mod normalize;
mod ops;
mod selection;

pub use blocks::Inserted;
pub use commands::{Key, KeyEvent, KeyOutcome};
pub use drag::{DragOverEvent, DragSession, DropSide};
pub use editor::{Editor, NodePatch, Patch};
pub use errors::{EditorError, TransformError};
pub use history::{EditBatch, UndoStack};
pub use ops::Op;

// Re-export the model types callers need to build and inspect documents.
pub use blockdoc_model::{
    query, Block, BlockKind, Child, Document, IdGenerator, Leaf, Path, Point, Props, Range,
};
