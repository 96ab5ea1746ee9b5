//! Error types for paint operations.

use tripaint_mesh::{MeshError, TriangleId};

/// Errors that can occur while planning or applying a paint command
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaintError {
    #[error("Seed triangle {0:?} is not part of the mesh")]
    InvalidSeed(TriangleId),

    #[error("No stroke in progress")]
    NoStroke,

    #[error(transparent)]
    Mesh(#[from] MeshError),
}
