//! Manifold solid representation.
//!
//! A half-edge structure built from the triangle list. Construction succeeds
//! only when the surface is an oriented 2-manifold (possibly with boundary):
//!
//! - every directed edge appears once, so each undirected edge borders at
//!   most two triangles and neighbors agree on orientation
//! - the triangles around every vertex form a single fan
//!
//! Volume-aware tools require a successfully built [`SolidMesh`].

use std::collections::HashMap;

use tracing::debug;

use crate::error::MeshError;
use crate::types::{Triangle, TriangleId, VertexId};

/// Type-safe half-edge identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HalfEdgeId(pub u32);

impl HalfEdgeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A half-edge of the solid
#[derive(Debug, Clone)]
pub struct HalfEdge {
    /// The vertex this half-edge originates from
    pub origin: VertexId,
    /// The opposite half-edge (None on the boundary)
    pub twin: Option<HalfEdgeId>,
    /// The next half-edge around the face
    pub next: HalfEdgeId,
    /// The triangle this half-edge borders
    pub face: TriangleId,
}

/// Oriented manifold half-edge mesh
#[derive(Debug, Clone)]
pub struct SolidMesh {
    half_edges: Vec<HalfEdge>,
    /// Every outgoing half-edge per vertex
    outgoing: Vec<Vec<HalfEdgeId>>,
    boundary_half_edges: usize,
}

impl SolidMesh {
    /// Build the solid, failing on the first non-manifold feature found
    pub fn build(vertex_count: usize, triangles: &[Triangle]) -> Result<Self, MeshError> {
        let mut half_edges: Vec<HalfEdge> = Vec::with_capacity(triangles.len() * 3);
        let mut outgoing: Vec<Vec<HalfEdgeId>> = vec![Vec::new(); vertex_count];
        let mut edge_map: HashMap<(VertexId, VertexId), HalfEdgeId> =
            HashMap::with_capacity(triangles.len() * 3);

        for (tri_idx, triangle) in triangles.iter().enumerate() {
            let face = TriangleId(tri_idx as u32);
            let base = half_edges.len() as u32;

            for (i, (origin, dest)) in triangle.directed_edges().into_iter().enumerate() {
                let id = HalfEdgeId(base + i as u32);
                if origin == dest {
                    return Err(MeshError::NonManifoldEdge(
                        origin,
                        dest,
                        format!("triangle {} has a collapsed edge", tri_idx),
                    ));
                }

                // A repeated directed edge means a third face or a flipped neighbor
                if edge_map.insert((origin, dest), id).is_some() {
                    return Err(MeshError::NonManifoldEdge(
                        origin,
                        dest,
                        "directed edge used twice (more than two faces or inconsistent winding)"
                            .to_string(),
                    ));
                }

                half_edges.push(HalfEdge {
                    origin,
                    twin: None,
                    next: HalfEdgeId(base + ((i as u32 + 1) % 3)),
                    face,
                });
                outgoing[origin.index()].push(id);
            }
        }

        // Link twins
        let mut boundary_half_edges = 0;
        for idx in 0..half_edges.len() {
            let origin = half_edges[idx].origin;
            let dest = half_edges[half_edges[idx].next.index()].origin;
            match edge_map.get(&(dest, origin)) {
                Some(&twin) => half_edges[idx].twin = Some(twin),
                None => boundary_half_edges += 1,
            }
        }

        let solid = Self {
            half_edges,
            outgoing,
            boundary_half_edges,
        };

        let mut visited = vec![false; solid.half_edges.len()];
        for vertex in 0..vertex_count {
            let fans = solid.fan_count(VertexId(vertex as u32), &mut visited);
            if fans > 1 {
                return Err(MeshError::NonManifoldVertex(VertexId(vertex as u32), fans));
            }
        }

        debug!(
            "SolidMesh::build: {} half-edges, {} boundary, closed={}",
            solid.half_edges.len(),
            solid.boundary_half_edges,
            solid.is_closed()
        );

        Ok(solid)
    }

    /// Number of connected triangle fans around a vertex.
    ///
    /// A manifold vertex has one fan (zero if unused). `visited` is indexed
    /// by half-edge and may be shared across vertices, since every
    /// half-edge leaves exactly one vertex.
    fn fan_count(&self, vertex: VertexId, visited: &mut [bool]) -> usize {
        let mut fans = 0;

        for &start in &self.outgoing[vertex.index()] {
            if visited[start.index()] {
                continue;
            }
            fans += 1;

            // Rotate one way until the boundary or back at start
            let mut current = start;
            loop {
                visited[current.index()] = true;
                match self.rotate_cw(current) {
                    Some(next) if !visited[next.index()] => current = next,
                    _ => break,
                }
            }

            // Then the other way, for fans that end at a boundary
            let mut current = start;
            while let Some(next) = self.rotate_ccw(current) {
                if visited[next.index()] {
                    break;
                }
                visited[next.index()] = true;
                current = next;
            }
        }

        fans
    }

    /// Next outgoing half-edge around the origin: twin(prev(h))
    fn rotate_cw(&self, he: HalfEdgeId) -> Option<HalfEdgeId> {
        let next = self.half_edges[he.index()].next;
        let prev = self.half_edges[next.index()].next;
        self.half_edges[prev.index()].twin
    }

    /// Previous outgoing half-edge around the origin: next(twin(h))
    fn rotate_ccw(&self, he: HalfEdgeId) -> Option<HalfEdgeId> {
        let twin = self.half_edges[he.index()].twin?;
        Some(self.half_edges[twin.index()].next)
    }

    /// Whether the surface has no boundary, i.e. bounds a volume
    pub fn is_closed(&self) -> bool {
        self.boundary_half_edges == 0
    }

    pub fn boundary_edge_count(&self) -> usize {
        self.boundary_half_edges
    }

    pub fn half_edge(&self, id: HalfEdgeId) -> Option<&HalfEdge> {
        self.half_edges.get(id.index())
    }

    pub fn half_edge_count(&self) -> usize {
        self.half_edges.len()
    }

    pub fn face_count(&self) -> usize {
        self.half_edges.len() / 3
    }

    /// Check twin symmetry and face cycles
    pub fn validate(&self) -> Result<(), String> {
        for (idx, he) in self.half_edges.iter().enumerate() {
            let id = HalfEdgeId(idx as u32);
            if let Some(twin) = he.twin {
                let back = self
                    .half_edge(twin)
                    .ok_or_else(|| format!("Half-edge {:?}: twin {:?} doesn't exist", id, twin))?;
                if back.twin != Some(id) {
                    return Err(format!(
                        "Half-edge {:?}: twin.twin = {:?}, expected Some({:?})",
                        id, back.twin, id
                    ));
                }
            }
            let third = self.half_edges[self.half_edges[he.next.index()].next.index()].next;
            if third != id {
                return Err(format!("Half-edge {:?}: face cycle is not a triangle", id));
            }
        }
        Ok(())
    }
}
