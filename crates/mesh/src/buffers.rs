//! GPU-ready render buffers.
//!
//! Triangles are de-indexed so each corner carries its face normal (flat
//! shading) and the palette index of its triangle. Color edits only touch
//! the three color slots of the edited triangle.

use std::collections::HashSet;

use crate::types::{Triangle, TriangleId, Vertex};

/// A single render vertex
///
/// Layout matches the vertex shader input (position then normal).
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct RenderVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Vertex, index and color buffers for one mesh
#[derive(Debug, Clone, Default)]
pub struct RenderBuffers {
    pub vertices: Vec<RenderVertex>,
    pub indices: Vec<u32>,
    /// Palette index per corner (three entries per triangle)
    pub color_indices: Vec<u32>,
}

impl RenderBuffers {
    /// Build buffers for the whole mesh
    pub fn build(vertices: &[Vertex], triangles: &[Triangle]) -> Self {
        let mut buffers = Self {
            vertices: Vec::with_capacity(triangles.len() * 3),
            indices: Vec::with_capacity(triangles.len() * 3),
            color_indices: Vec::with_capacity(triangles.len() * 3),
        };

        for triangle in triangles {
            let normal = triangle.normal.to_array();
            for vertex in triangle.vertices {
                buffers.indices.push(buffers.vertices.len() as u32);
                buffers.vertices.push(RenderVertex {
                    position: vertices[vertex.index()].position.to_array(),
                    normal,
                });
                buffers.color_indices.push(triangle.color.0 as u32);
            }
        }

        buffers
    }

    /// Rewrite the color slots of the given triangles
    pub fn refresh_colors(&mut self, triangles: &[Triangle], dirty: impl IntoIterator<Item = TriangleId>) {
        for id in dirty {
            let Some(triangle) = triangles.get(id.index()) else {
                continue;
            };
            let base = id.index() * 3;
            if let Some(slots) = self.color_indices.get_mut(base..base + 3) {
                slots.fill(triangle.color.0 as u32);
            }
        }
    }

    /// Vertex data as raw bytes for upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.color_indices)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Triangles whose colors changed since the renderer last synced
#[derive(Debug, Clone, Default)]
pub struct DirtyTriangles {
    dirty: HashSet<TriangleId>,
}

impl DirtyTriangles {
    #[inline]
    pub fn mark(&mut self, triangle: TriangleId) {
        self.dirty.insert(triangle);
    }

    /// Get all dirty triangles and clear the dirty set
    pub fn take(&mut self) -> Vec<TriangleId> {
        let mut taken: Vec<_> = self.dirty.drain().collect();
        taken.sort();
        taken
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dirty.len()
    }
}
