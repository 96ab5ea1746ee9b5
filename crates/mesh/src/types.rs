//! Type definitions for the triangle mesh.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::MeshError;

/// Type-safe vertex identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub u32);

/// Type-safe triangle identifier.
///
/// This is the triangle's index in the mesh and is never reused while the
/// mesh exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriangleId(pub u32);

impl TriangleId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl VertexId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index into the mesh palette
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ColorIndex(pub u8);

/// A vertex shared by index between triangles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Vec3,
    /// Area-weighted average of the adjacent face normals
    pub normal: Vec3,
}

/// A triangle of the mesh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// Vertex indices in counter-clockwise order
    pub vertices: [VertexId; 3],
    /// Cached face normal
    pub normal: Vec3,
    /// Palette color currently assigned
    pub color: ColorIndex,
}

impl Triangle {
    /// The three undirected edges of this triangle as canonical (min, max) keys
    pub fn edge_keys(&self) -> [(VertexId, VertexId); 3] {
        let [a, b, c] = self.vertices;
        [edge_key(a, b), edge_key(b, c), edge_key(c, a)]
    }

    /// The three directed edges following the winding order
    pub fn directed_edges(&self) -> [(VertexId, VertexId); 3] {
        let [a, b, c] = self.vertices;
        [(a, b), (b, c), (c, a)]
    }
}

/// Canonical key of an undirected edge
#[inline]
pub fn edge_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a < b { (a, b) } else { (b, a) }
}

/// Color palette shared by all triangles of a mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<[f32; 4]>,
    active: ColorIndex,
}

impl Palette {
    /// Create a palette; must contain between 1 and 255 colors
    pub fn new(colors: Vec<[f32; 4]>) -> Result<Self, MeshError> {
        if colors.is_empty() || colors.len() > u8::MAX as usize {
            return Err(MeshError::InvalidPalette(colors.len()));
        }
        Ok(Self {
            colors,
            active: ColorIndex(0),
        })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn contains(&self, color: ColorIndex) -> bool {
        (color.0 as usize) < self.colors.len()
    }

    /// RGBA value of a palette entry
    pub fn rgba(&self, color: ColorIndex) -> Option<[f32; 4]> {
        self.colors.get(color.0 as usize).copied()
    }

    pub fn colors(&self) -> &[[f32; 4]] {
        &self.colors
    }

    /// Color selected for the next paint operation
    pub fn active(&self) -> ColorIndex {
        self.active
    }

    pub fn set_active(&mut self, color: ColorIndex) -> Result<(), MeshError> {
        if !self.contains(color) {
            return Err(MeshError::ColorOutOfRange {
                color: color.0,
                palette_len: self.colors.len(),
            });
        }
        self.active = color;
        Ok(())
    }

    /// Replace the RGBA value of an existing entry
    pub fn set_rgba(&mut self, color: ColorIndex, rgba: [f32; 4]) -> Result<(), MeshError> {
        let len = self.colors.len();
        let slot = self
            .colors
            .get_mut(color.0 as usize)
            .ok_or(MeshError::ColorOutOfRange {
                color: color.0,
                palette_len: len,
            })?;
        *slot = rgba;
        Ok(())
    }
}

/// A text decal stamped onto the surface.
///
/// Rasterizing the glyphs onto triangles happens outside the core; the
/// record keeps what is needed to re-edit and persist the decal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDecal {
    pub text: String,
    pub font_size: f32,
    /// Point on the surface the text is centered on
    pub anchor: Vec3,
    /// Projection direction (towards the surface)
    pub direction: Vec3,
    pub color: ColorIndex,
}

/// Which tools a committed mesh supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshCapabilities {
    /// A valid manifold solid was built; volume-aware tools may run
    pub solid: bool,
}
