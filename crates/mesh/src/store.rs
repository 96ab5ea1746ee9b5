//! The mesh store: geometry, colors and derived acceleration structures.
//!
//! A store is assembled once from fully built parts and never exposed half
//! built. Loading a new file produces a new store; editing mutates only
//! triangle colors, the palette and the decal list of the current one, so
//! the adjacency and spatial index stay valid for the store's lifetime.

use glam::Vec3;
use tracing::debug;

use crate::adjacency::AdjacencyIndex;
use crate::buffers::{DirtyTriangles, RenderBuffers};
use crate::error::MeshError;
use crate::manifold::SolidMesh;
use crate::raycast::Ray;
use crate::spatial::{PickHit, SpatialIndex};
use crate::types::{
    ColorIndex, MeshCapabilities, Palette, TextDecal, Triangle, TriangleId, Vertex, VertexId,
};

/// Vertices and triangles of a mesh, before acceleration structures exist
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGeometry {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl MeshGeometry {
    /// Build from an indexed triangle list.
    ///
    /// Face normals and area-weighted vertex normals are computed here.
    /// `colors`, when given, must hold one entry per triangle; otherwise
    /// every triangle starts at palette index 0.
    pub fn from_indexed(
        positions: &[Vec3],
        indices: &[[u32; 3]],
        colors: Option<&[ColorIndex]>,
    ) -> Result<Self, MeshError> {
        if indices.is_empty() {
            return Err(MeshError::Empty);
        }
        if indices.len() > u32::MAX as usize {
            return Err(MeshError::TooLarge(indices.len()));
        }
        if positions.len() > u32::MAX as usize {
            return Err(MeshError::TooLarge(positions.len()));
        }
        if let Some(colors) = colors {
            if colors.len() != indices.len() {
                return Err(MeshError::ColorCountMismatch {
                    colors: colors.len(),
                    triangles: indices.len(),
                });
            }
        }

        let mut normal_sums = vec![Vec3::ZERO; positions.len()];
        let mut triangles = Vec::with_capacity(indices.len());

        for (tri_idx, corners) in indices.iter().enumerate() {
            for &index in corners {
                if index as usize >= positions.len() {
                    return Err(MeshError::IndexOutOfRange {
                        triangle: tri_idx,
                        index,
                        vertex_count: positions.len(),
                    });
                }
            }

            let [p0, p1, p2] = corners.map(|i| positions[i as usize]);
            // Cross product length is twice the area, which weights the vertex normals
            let weighted = (p1 - p0).cross(p2 - p0);
            for &index in corners {
                normal_sums[index as usize] += weighted;
            }

            triangles.push(Triangle {
                vertices: corners.map(VertexId),
                normal: weighted.normalize_or_zero(),
                color: colors.map_or(ColorIndex(0), |c| c[tri_idx]),
            });
        }

        let vertices = positions
            .iter()
            .zip(normal_sums)
            .map(|(&position, sum)| Vertex {
                position,
                normal: sum.normalize_or_zero(),
            })
            .collect();

        Ok(Self {
            vertices,
            triangles,
        })
    }

    /// Ensure every triangle color exists in the palette
    pub fn check_palette(&self, palette: &Palette) -> Result<(), MeshError> {
        match self.triangles.iter().find(|t| !palette.contains(t.color)) {
            Some(t) => Err(MeshError::ColorOutOfRange {
                color: t.color.0,
                palette_len: palette.len(),
            }),
            None => Ok(()),
        }
    }

    /// Reject non-finite coordinates and triangles with area at or below `area_tolerance`
    pub fn check_degenerate(&self, area_tolerance: f32) -> Result<(), MeshError> {
        if let Some(idx) = self.vertices.iter().position(|v| !v.position.is_finite()) {
            return Err(MeshError::NonFinite(VertexId(idx as u32)));
        }
        for (idx, triangle) in self.triangles.iter().enumerate() {
            let area = self.triangle_area(triangle);
            if area <= area_tolerance {
                return Err(MeshError::Degenerate {
                    triangle: TriangleId(idx as u32),
                    area,
                });
            }
        }
        Ok(())
    }

    fn triangle_area(&self, triangle: &Triangle) -> f32 {
        let [p0, p1, p2] = triangle.vertices.map(|v| self.vertices[v.index()].position);
        (p1 - p0).cross(p2 - p0).length() * 0.5
    }
}

/// Fully built components of a mesh store
#[derive(Debug)]
pub struct MeshParts {
    pub geometry: MeshGeometry,
    pub palette: Palette,
    pub decals: Vec<TextDecal>,
    pub render: RenderBuffers,
    pub adjacency: AdjacencyIndex,
    pub spatial: SpatialIndex,
    /// Manifold build result; failure only disables volume-aware tools
    pub solid: Result<SolidMesh, MeshError>,
}

/// One mesh snapshot with its derived structures
#[derive(Debug)]
pub struct MeshStore {
    geometry: MeshGeometry,
    palette: Palette,
    decals: Vec<TextDecal>,
    render: RenderBuffers,
    adjacency: AdjacencyIndex,
    spatial: SpatialIndex,
    solid: Option<SolidMesh>,
    solid_error: Option<MeshError>,
    dirty: DirtyTriangles,
}

impl MeshStore {
    /// Assemble a store from parts built by the loading stages
    pub fn assemble(parts: MeshParts) -> Self {
        let (solid, solid_error) = match parts.solid {
            Ok(solid) => (Some(solid), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            geometry: parts.geometry,
            palette: parts.palette,
            decals: parts.decals,
            render: parts.render,
            adjacency: parts.adjacency,
            spatial: parts.spatial,
            solid,
            solid_error,
            dirty: DirtyTriangles::default(),
        }
    }

    /// Build every structure synchronously from an indexed triangle list
    pub fn from_indexed(
        positions: &[Vec3],
        indices: &[[u32; 3]],
        palette: Palette,
    ) -> Result<Self, MeshError> {
        let geometry = MeshGeometry::from_indexed(positions, indices, None)?;
        geometry.check_palette(&palette)?;
        let render = RenderBuffers::build(&geometry.vertices, &geometry.triangles);
        let adjacency = AdjacencyIndex::build(&geometry.triangles);
        let spatial = SpatialIndex::build(&geometry.vertices, &geometry.triangles);
        let solid = SolidMesh::build(geometry.vertices.len(), &geometry.triangles);
        Ok(Self::assemble(MeshParts {
            geometry,
            palette,
            decals: Vec::new(),
            render,
            adjacency,
            spatial,
            solid,
        }))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn vertices(&self) -> &[Vertex] {
        &self.geometry.vertices
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.geometry.triangles
    }

    pub fn triangle(&self, id: TriangleId) -> Option<&Triangle> {
        self.geometry.triangles.get(id.index())
    }

    pub fn triangle_count(&self) -> usize {
        self.geometry.triangles.len()
    }

    pub fn contains(&self, id: TriangleId) -> bool {
        id.index() < self.geometry.triangles.len()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn palette_mut(&mut self) -> &mut Palette {
        &mut self.palette
    }

    pub fn decals(&self) -> &[TextDecal] {
        &self.decals
    }

    pub fn adjacency(&self) -> &AdjacencyIndex {
        &self.adjacency
    }

    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    pub fn solid(&self) -> Option<&SolidMesh> {
        self.solid.as_ref()
    }

    /// Why the manifold solid could not be built, if it could not
    pub fn solid_error(&self) -> Option<&MeshError> {
        self.solid_error.as_ref()
    }

    pub fn capabilities(&self) -> MeshCapabilities {
        MeshCapabilities {
            solid: self.solid.is_some(),
        }
    }

    pub fn render_buffers(&self) -> &RenderBuffers {
        &self.render
    }

    /// Current color of every triangle, in triangle order
    pub fn colors(&self) -> Vec<ColorIndex> {
        self.geometry.triangles.iter().map(|t| t.color).collect()
    }

    pub fn color(&self, id: TriangleId) -> Option<ColorIndex> {
        self.triangle(id).map(|t| t.color)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Set a triangle's color, returning the previous one
    pub fn set_color(&mut self, id: TriangleId, color: ColorIndex) -> Result<ColorIndex, MeshError> {
        if !self.palette.contains(color) {
            return Err(MeshError::ColorOutOfRange {
                color: color.0,
                palette_len: self.palette.len(),
            });
        }
        let triangle = self
            .geometry
            .triangles
            .get_mut(id.index())
            .ok_or(MeshError::NoSuchTriangle(id))?;
        let previous = std::mem::replace(&mut triangle.color, color);
        if previous != color {
            self.dirty.mark(id);
        }
        Ok(previous)
    }

    pub fn push_decal(&mut self, decal: TextDecal) {
        self.decals.push(decal);
    }

    pub fn pop_decal(&mut self) -> Option<TextDecal> {
        self.decals.pop()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Resolve a pick ray to the nearest triangle hit
    pub fn pick(&self, ray: &Ray) -> Option<PickHit> {
        self.spatial.query_closest_hit(ray)
    }

    /// Triangle whose surface contains the point
    pub fn triangle_at(&self, point: Vec3) -> Option<TriangleId> {
        self.spatial.query_contains(point)
    }

    // ========================================================================
    // Render sync
    // ========================================================================

    pub fn has_dirty_triangles(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Take the set of triangles recolored since the last call
    pub fn take_dirty_triangles(&mut self) -> Vec<TriangleId> {
        self.dirty.take()
    }

    /// Push pending color changes into the render buffers.
    ///
    /// Returns the number of triangles refreshed.
    pub fn sync_render_colors(&mut self) -> usize {
        let dirty = self.dirty.take();
        let count = dirty.len();
        if count > 0 {
            self.render.refresh_colors(&self.geometry.triangles, dirty);
            debug!("sync_render_colors: refreshed {} triangles", count);
        }
        count
    }
}
