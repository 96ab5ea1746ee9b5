//! Error types for session operations.

use tripaint_loading::{LoadError, PoolError, SaveError};
use tripaint_mesh::{MeshError, TriangleId};
use tripaint_painting::PaintError;

/// Errors returned by the tool-facing session API
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No mesh is loaded")]
    NoMesh,

    #[error("A mesh is already loading")]
    LoadInProgress,

    #[error("Triangle {0:?} is not part of the mesh")]
    InvalidTriangle(TriangleId),

    #[error("The project has not been saved yet; choose a file first")]
    NoProjectPath,

    #[error("Project was not saved: {0}")]
    Save(#[from] SaveError),

    #[error("Paint operation failed: {0}")]
    Paint(PaintError),

    #[error("Load failed: {0}")]
    Load(LoadError),

    /// Fatal; the application must shut down
    #[error("Startup failed: {0}")]
    Startup(String),
}

impl From<PaintError> for SessionError {
    fn from(e: PaintError) -> Self {
        match e {
            PaintError::InvalidSeed(triangle) => SessionError::InvalidTriangle(triangle),
            PaintError::Mesh(MeshError::NoSuchTriangle(triangle)) => {
                SessionError::InvalidTriangle(triangle)
            }
            e => SessionError::Paint(e),
        }
    }
}

impl From<LoadError> for SessionError {
    fn from(e: LoadError) -> Self {
        match e {
            LoadError::Busy => SessionError::LoadInProgress,
            e => SessionError::Load(e),
        }
    }
}

impl From<PoolError> for SessionError {
    fn from(e: PoolError) -> Self {
        SessionError::Startup(e.to_string())
    }
}
