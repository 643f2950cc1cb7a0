//! Errors raised by scene editing.
//!
//! Rendering itself never fails: degenerate math is absorbed with epsilons
//! and sentinels. Only edits that would break the scene's invariants are
//! rejected here.

use thiserror::Error;

/// Errors that can occur while editing a [`Scene`](crate::Scene).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("material index {index} out of range ({len} materials)")]
    MaterialOutOfRange { index: usize, len: usize },

    #[error("primitive index {index} out of range ({len} primitives)")]
    PrimitiveOutOfRange { index: usize, len: usize },

    #[error("material {index} is still referenced by a primitive")]
    MaterialInUse { index: usize },

    #[error("invalid shape: {0}")]
    InvalidShape(String),
}

/// Result type for scene editing operations.
pub type Result<T> = std::result::Result<T, SceneError>;
