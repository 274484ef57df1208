//! Error types for the editing core.

use blockdoc_model::Path;
use thiserror::Error;

/// Structural failures raised by the transform engine.
///
/// Every variant aborts the whole batch: no partial application is ever
/// visible and the committed tree, selection, and history are untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("path does not resolve: {0}")]
    InvalidPath(Path),

    #[error("cannot remove or merge the document root")]
    RootViolation,

    #[error("malformed insert: {0}")]
    MalformedInsert(String),
}

/// Top-level error type for the editor handle.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
