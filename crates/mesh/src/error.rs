//! Error types for mesh construction and mutation.

use crate::types::{TriangleId, VertexId};

/// Errors that can occur while building or editing a mesh
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("Mesh has no triangles")]
    Empty,
    #[error("Triangle {triangle} references vertex {index} but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("Color buffer has {colors} entries for {triangles} triangles")]
    ColorCountMismatch { colors: usize, triangles: usize },
    #[error("Color {color} is outside the palette of {palette_len} colors")]
    ColorOutOfRange { color: u8, palette_len: usize },
    #[error("Palette must hold between 1 and 255 colors, got {0}")]
    InvalidPalette(usize),
    #[error("Vertex {0:?} has a non-finite coordinate")]
    NonFinite(VertexId),
    #[error("Triangle {triangle:?} is degenerate (area {area})")]
    Degenerate { triangle: TriangleId, area: f32 },
    #[error("No such triangle {0:?}")]
    NoSuchTriangle(TriangleId),
    #[error("Mesh is too large: {0} elements exceed the u32 index range")]
    TooLarge(usize),
    #[error("Non-manifold edge ({0:?}, {1:?}): {2}")]
    NonManifoldEdge(VertexId, VertexId, String),
    #[error("Non-manifold vertex {0:?}: faces around it form {1} separate fans")]
    NonManifoldVertex(VertexId, usize),
}
