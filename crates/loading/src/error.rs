//! Error types for loading.

use tripaint_mesh::MeshError;

/// Errors decoding an interchange file
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Unsupported file type: {0:?}")]
    UnsupportedExtension(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OBJ line {line}: {message}")]
    Obj { line: usize, message: String },

    #[error("STL: {0}")]
    Stl(String),

    #[error("PLY: {0}")]
    Ply(String),
}

/// Why a load did not produce a mesh (or produced a degraded one)
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("A mesh is already loading")]
    Busy,

    #[error("Invalid file: {0}")]
    Format(#[from] FormatError),

    #[error("Corrupt project file: {0}. Try loading an earlier backup version")]
    CorruptProject(String),

    #[error("The file contains no triangles")]
    EmptyMesh,

    #[error("Invalid mesh data: {0}")]
    Malformed(MeshError),

    #[error("Inconsistent mesh data: {0}")]
    Consistency(MeshError),

    #[error("Degenerate geometry: {0}")]
    Degenerate(MeshError),

    #[error("Loading task panicked: {0}")]
    Panicked(String),

    /// Soft failure: the mesh loads but volume-aware tools are disabled
    #[error("Mesh is not a closed manifold: {0}. Most tools are disabled, the Triangle Painter is still available")]
    Manifold(MeshError),
}

/// Errors starting the worker pool; these are fatal at startup
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Worker pool needs at least {min} workers, got {requested}")]
    TooFewWorkers { requested: usize, min: usize },

    #[error("Failed to start worker runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
