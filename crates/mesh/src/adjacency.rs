//! Triangle adjacency across shared edges.
//!
//! Neighbors are found by hashing every undirected edge (the unordered pair of
//! its vertex indices) to the triangles that use it. An edge used by exactly
//! two triangles links them. Edges used by more than two triangles are
//! non-manifold: they are recorded and left unlinked, so every triangle keeps
//! at most one neighbor per edge.

use std::collections::HashMap;

use tracing::debug;

use crate::types::{Triangle, TriangleId, VertexId};

/// Per-triangle neighbor table
#[derive(Debug, Clone, Default)]
pub struct AdjacencyIndex {
    /// Neighbor across each edge slot (v0-v1, v1-v2, v2-v0)
    neighbors: Vec<[Option<TriangleId>; 3]>,
    /// Edges shared by more than two triangles
    non_manifold_edges: Vec<(VertexId, VertexId)>,
    /// Edges used by a single triangle
    boundary_edge_count: usize,
}

impl AdjacencyIndex {
    /// Build the adjacency for a triangle list.
    ///
    /// Runs in time linear in the triangle count (amortized hashing).
    pub fn build(triangles: &[Triangle]) -> Self {
        let mut edge_map: HashMap<(VertexId, VertexId), Vec<(TriangleId, usize)>> =
            HashMap::with_capacity(triangles.len() * 3 / 2 + 1);

        for (tri_idx, triangle) in triangles.iter().enumerate() {
            let id = TriangleId(tri_idx as u32);
            for (slot, key) in triangle.edge_keys().into_iter().enumerate() {
                edge_map.entry(key).or_default().push((id, slot));
            }
        }

        let mut neighbors = vec![[None; 3]; triangles.len()];
        let mut non_manifold_edges = Vec::new();
        let mut boundary_edge_count = 0;

        for (key, users) in edge_map {
            match users.as_slice() {
                [_] => boundary_edge_count += 1,
                [(a, slot_a), (b, slot_b)] => {
                    // A triangle with a repeated vertex would pair with itself
                    if a != b {
                        neighbors[a.index()][*slot_a] = Some(*b);
                        neighbors[b.index()][*slot_b] = Some(*a);
                    }
                }
                _ => non_manifold_edges.push(key),
            }
        }

        non_manifold_edges.sort();

        debug!(
            "AdjacencyIndex::build: {} triangles, {} boundary edges, {} non-manifold edges",
            triangles.len(),
            boundary_edge_count,
            non_manifold_edges.len()
        );

        Self {
            neighbors,
            non_manifold_edges,
            boundary_edge_count,
        }
    }

    /// Distinct neighbors of a triangle (at most 3)
    pub fn neighbors(&self, triangle: TriangleId) -> impl Iterator<Item = TriangleId> + '_ {
        let slots = self
            .neighbors
            .get(triangle.index())
            .copied()
            .unwrap_or([None; 3]);
        slots
            .into_iter()
            .enumerate()
            .filter_map(move |(i, n)| {
                let n = n?;
                // Two triangles sharing two edges are still one neighbor
                if slots[..i].contains(&Some(n)) {
                    None
                } else {
                    Some(n)
                }
            })
    }

    /// Neighbor across a specific edge slot
    pub fn neighbor_across(&self, triangle: TriangleId, slot: usize) -> Option<TriangleId> {
        self.neighbors.get(triangle.index())?.get(slot).copied().flatten()
    }

    /// Number of triangles covered by the index
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Edges shared by more than two triangles, sorted
    pub fn non_manifold_edges(&self) -> &[(VertexId, VertexId)] {
        &self.non_manifold_edges
    }

    /// Whether every edge is used by at most two triangles
    pub fn is_edge_manifold(&self) -> bool {
        self.non_manifold_edges.is_empty()
    }

    pub fn boundary_edge_count(&self) -> usize {
        self.boundary_edge_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColorIndex;
    use glam::Vec3;

    fn tri(a: u32, b: u32, c: u32) -> Triangle {
        Triangle {
            vertices: [VertexId(a), VertexId(b), VertexId(c)],
            normal: Vec3::Z,
            color: ColorIndex(0),
        }
    }

    /// A 2x2 quad grid: 8 triangles over 9 vertices
    fn grid() -> Vec<Triangle> {
        let mut tris = Vec::new();
        for row in 0..2u32 {
            for col in 0..2u32 {
                let v = row * 3 + col;
                tris.push(tri(v, v + 1, v + 4));
                tris.push(tri(v, v + 4, v + 3));
            }
        }
        tris
    }

    fn assert_symmetric(adj: &AdjacencyIndex) {
        for t in 0..adj.len() {
            let t = TriangleId(t as u32);
            let ns: Vec<_> = adj.neighbors(t).collect();
            assert!(ns.len() <= 3);
            for n in ns {
                assert!(
                    adj.neighbors(n).any(|back| back == t),
                    "{:?} -> {:?} is not symmetric",
                    t,
                    n
                );
            }
        }
    }

    #[test]
    fn test_single_triangle_has_no_neighbors() {
        let adj = AdjacencyIndex::build(&[tri(0, 1, 2)]);
        assert_eq!(adj.neighbors(TriangleId(0)).count(), 0);
        assert_eq!(adj.boundary_edge_count(), 3);
        assert!(adj.is_edge_manifold());
    }

    #[test]
    fn test_grid_adjacency_is_symmetric() {
        let adj = AdjacencyIndex::build(&grid());
        assert_symmetric(&adj);
        // Interior diagonal pairs
        assert!(adj.neighbors(TriangleId(0)).any(|n| n == TriangleId(1)));
        // Triangle 0 (0,1,4) shares edge 1-4 with triangle 3 (1,5,4)
        assert!(adj.neighbors(TriangleId(0)).any(|n| n == TriangleId(3)));
    }

    #[test]
    fn test_non_manifold_edge_recorded_not_linked() {
        // Three triangles fanning off edge 0-1
        let tris = [tri(0, 1, 2), tri(1, 0, 3), tri(0, 1, 4)];
        let adj = AdjacencyIndex::build(&tris);
        assert_eq!(adj.non_manifold_edges(), &[(VertexId(0), VertexId(1))]);
        assert!(!adj.is_edge_manifold());
        for t in 0..3 {
            assert_eq!(adj.neighbors(TriangleId(t)).count(), 0);
        }
        assert_symmetric(&adj);
    }

    #[test]
    fn test_double_shared_edges_yield_single_neighbor() {
        // Same triangle twice with opposite winding shares all three edges
        let adj = AdjacencyIndex::build(&[tri(0, 1, 2), tri(0, 2, 1)]);
        let ns: Vec<_> = adj.neighbors(TriangleId(0)).collect();
        assert_eq!(ns, vec![TriangleId(1)]);
        assert_symmetric(&adj);
    }

    #[test]
    fn test_neighbor_across_slot() {
        let adj = AdjacencyIndex::build(&[tri(0, 1, 2), tri(2, 1, 3)]);
        // Edge slot 1 of triangle 0 is 1-2
        assert_eq!(adj.neighbor_across(TriangleId(0), 1), Some(TriangleId(1)));
        assert_eq!(adj.neighbor_across(TriangleId(0), 0), None);
    }
}
