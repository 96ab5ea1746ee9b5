//! Bounding volume hierarchy over triangles for pick queries.
//!
//! The tree is rebuilt from scratch whenever triangle positions or the
//! triangle count change. Color-only edits leave it valid.

use glam::Vec3;
use tracing::debug;

use crate::raycast::{Ray, closest_point_on_triangle, ray_triangle_intersection};
use crate::types::{Triangle, TriangleId, Vertex};

/// Maximum triangles per leaf before splitting
const MAX_LEAF_SIZE: usize = 4;

/// Relative tolerance for point containment queries (fraction of the bounds diagonal)
const CONTAINS_RELATIVE_TOLERANCE: f32 = 1e-5;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    pub fn include_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Whether the point lies inside the box grown by `margin`
    pub fn contains_point(&self, point: Vec3, margin: f32) -> bool {
        let min = self.min - Vec3::splat(margin);
        let max = self.max + Vec3::splat(margin);
        point.cmpge(min).all() && point.cmple(max).all()
    }

    /// Slab test; returns the entry distance if the ray hits the box before `max_t`
    pub fn ray_entry(&self, ray: &Ray, max_t: f32) -> Option<f32> {
        let inv = ray.direction.recip();
        let t0 = (self.min - ray.origin) * inv;
        let t1 = (self.max - ray.origin) * inv;
        let t_near = t0.min(t1);
        let t_far = t0.max(t1);
        // NaN from 0 * inf on an axis-parallel ray is ignored by max/min_element
        let enter = t_near.max_element().max(0.0);
        let exit = t_far.min_element().min(max_t);
        (enter <= exit).then_some(enter)
    }

    fn of_triangle(a: Vec3, b: Vec3, c: Vec3) -> Aabb {
        Aabb::new(a.min(b).min(c), a.max(b).max(c))
    }
}

#[derive(Debug, Clone)]
enum BvhNode {
    Leaf {
        bounds: Aabb,
        /// Range into `SpatialIndex::order`
        start: u32,
        count: u32,
    },
    Internal {
        bounds: Aabb,
        left: u32,
        right: u32,
    },
}

impl BvhNode {
    fn bounds(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Internal { bounds, .. } => bounds,
        }
    }
}

/// A ray pick result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub triangle: TriangleId,
    pub point: Vec3,
    pub distance: f32,
}

/// Bounding volume hierarchy over all triangles of a mesh.
///
/// Every triangle index appears in exactly one leaf.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    nodes: Vec<BvhNode>,
    /// Triangle ids permuted so every leaf owns a contiguous range
    order: Vec<TriangleId>,
    /// Cached triangle corners, indexed by triangle id
    corners: Vec<[Vec3; 3]>,
    contains_tolerance: f32,
}

impl SpatialIndex {
    /// Build the hierarchy from vertex positions and triangles
    pub fn build(vertices: &[Vertex], triangles: &[Triangle]) -> Self {
        let corners: Vec<[Vec3; 3]> = triangles
            .iter()
            .map(|t| t.vertices.map(|v| vertices[v.index()].position))
            .collect();
        let boxes: Vec<Aabb> = corners
            .iter()
            .map(|[a, b, c]| Aabb::of_triangle(*a, *b, *c))
            .collect();
        let centroids: Vec<Vec3> = boxes.iter().map(Aabb::center).collect();

        let mut order: Vec<TriangleId> = (0..triangles.len() as u32).map(TriangleId).collect();
        let mut nodes = Vec::with_capacity(triangles.len().max(1) * 2 / MAX_LEAF_SIZE + 1);

        if !order.is_empty() {
            Self::build_node(&mut nodes, &mut order, 0, &boxes, &centroids);
        }

        let diagonal = nodes
            .first()
            .map(|n| n.bounds().size().length())
            .unwrap_or(0.0);
        let contains_tolerance = (diagonal * CONTAINS_RELATIVE_TOLERANCE).max(1e-6);

        debug!(
            "SpatialIndex::build: {} triangles, {} nodes",
            triangles.len(),
            nodes.len()
        );

        Self {
            nodes,
            order,
            corners,
            contains_tolerance,
        }
    }

    /// Recursively build the subtree for `order[offset..offset + slice.len()]`
    fn build_node(
        nodes: &mut Vec<BvhNode>,
        slice: &mut [TriangleId],
        offset: usize,
        boxes: &[Aabb],
        centroids: &[Vec3],
    ) -> u32 {
        let bounds = slice
            .iter()
            .fold(Aabb::empty(), |acc, t| acc.union(&boxes[t.index()]));
        let index = nodes.len() as u32;

        if slice.len() <= MAX_LEAF_SIZE {
            nodes.push(BvhNode::Leaf {
                bounds,
                start: offset as u32,
                count: slice.len() as u32,
            });
            return index;
        }

        // Split at the median centroid along the widest centroid axis
        let mut centroid_bounds = Aabb::empty();
        for t in slice.iter() {
            centroid_bounds.include_point(centroids[t.index()]);
        }
        let extent = centroid_bounds.size();
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };

        let mid = slice.len() / 2;
        slice.select_nth_unstable_by(mid, |a, b| {
            centroids[a.index()][axis].total_cmp(&centroids[b.index()][axis])
        });

        // Reserve our slot, children are appended after it
        nodes.push(BvhNode::Leaf {
            bounds,
            start: 0,
            count: 0,
        });

        let (left_slice, right_slice) = slice.split_at_mut(mid);
        let left = Self::build_node(nodes, left_slice, offset, boxes, centroids);
        let right = Self::build_node(nodes, right_slice, offset + mid, boxes, centroids);

        nodes[index as usize] = BvhNode::Internal {
            bounds,
            left,
            right,
        };
        index
    }

    /// Nearest triangle hit by the ray, with the hit point
    pub fn query_closest_hit(&self, ray: &Ray) -> Option<PickHit> {
        if self.nodes.is_empty() || ray.direction == Vec3::ZERO {
            return None;
        }

        let mut best: Option<PickHit> = None;
        let mut stack = vec![0u32];

        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx as usize];
            let max_t = best.map_or(f32::INFINITY, |b| b.distance);
            if node.bounds().ray_entry(ray, max_t).is_none() {
                continue;
            }

            match node {
                BvhNode::Leaf { start, count, .. } => {
                    for &tri in &self.order[*start as usize..(*start + *count) as usize] {
                        let [a, b, c] = self.corners[tri.index()];
                        if let Some(hit) = ray_triangle_intersection(ray, a, b, c) {
                            let closer = best.map_or(true, |b| hit.t < b.distance);
                            if closer {
                                best = Some(PickHit {
                                    triangle: tri,
                                    point: ray.at(hit.t),
                                    distance: hit.t,
                                });
                            }
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(*left);
                    stack.push(*right);
                }
            }
        }

        best
    }

    /// Triangle whose surface contains the point, within a tolerance
    /// scaled to the mesh size
    pub fn query_contains(&self, point: Vec3) -> Option<TriangleId> {
        self.query_contains_within(point, self.contains_tolerance)
    }

    /// Triangle nearest to the point among those within `tolerance` of it
    pub fn query_contains_within(&self, point: Vec3, tolerance: f32) -> Option<TriangleId> {
        if self.nodes.is_empty() || !point.is_finite() {
            return None;
        }

        let mut best: Option<(TriangleId, f32)> = None;
        let mut stack = vec![0u32];

        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx as usize];
            if !node.bounds().contains_point(point, tolerance) {
                continue;
            }

            match node {
                BvhNode::Leaf { start, count, .. } => {
                    for &tri in &self.order[*start as usize..(*start + *count) as usize] {
                        let [a, b, c] = self.corners[tri.index()];
                        let distance = closest_point_on_triangle(point, a, b, c).distance(point);
                        if distance <= tolerance && best.map_or(true, |(_, d)| distance < d) {
                            best = Some((tri, distance));
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(*left);
                    stack.push(*right);
                }
            }
        }

        best.map(|(tri, _)| tri)
    }

    /// Bounds of the whole mesh
    pub fn bounds(&self) -> Option<Aabb> {
        self.nodes.first().map(|n| *n.bounds())
    }

    /// Number of indexed triangles
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Triangle ids in leaf order
    pub fn leaf_triangles(&self) -> impl Iterator<Item = TriangleId> + '_ {
        self.nodes.iter().flat_map(move |node| match node {
            BvhNode::Leaf { start, count, .. } => {
                self.order[*start as usize..(*start + *count) as usize].iter().copied()
            }
            BvhNode::Internal { .. } => self.order[..0].iter().copied(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorIndex, VertexId};

    /// A strip of `n` unit quads along +X in the z=0 plane
    fn strip(n: u32) -> (Vec<Vertex>, Vec<Triangle>) {
        let mut vertices = Vec::new();
        for i in 0..=n {
            for y in 0..2 {
                vertices.push(Vertex {
                    position: Vec3::new(i as f32, y as f32, 0.0),
                    normal: Vec3::Z,
                });
            }
        }
        let mut triangles = Vec::new();
        for i in 0..n {
            let v = i * 2;
            for verts in [[v, v + 2, v + 3], [v, v + 3, v + 1]] {
                triangles.push(Triangle {
                    vertices: verts.map(VertexId),
                    normal: Vec3::Z,
                    color: ColorIndex(0),
                });
            }
        }
        (vertices, triangles)
    }

    #[test]
    fn test_every_triangle_indexed_once() {
        let (vertices, triangles) = strip(37);
        let index = SpatialIndex::build(&vertices, &triangles);
        let mut seen: Vec<_> = index.leaf_triangles().collect();
        seen.sort();
        let expected: Vec<_> = (0..triangles.len() as u32).map(TriangleId).collect();
        assert_eq!(seen, expected);
        assert_eq!(index.len(), triangles.len());
    }

    #[test]
    fn test_closest_hit_matches_brute_force() {
        let (vertices, triangles) = strip(20);
        let index = SpatialIndex::build(&vertices, &triangles);

        for i in 0..20 {
            let x = i as f32 + 0.7;
            let ray = Ray::new(Vec3::new(x, 0.2, 5.0), Vec3::NEG_Z);
            let hit = index.query_closest_hit(&ray).unwrap();
            // Lower-right triangle of quad i
            assert_eq!(hit.triangle, TriangleId(i * 2));
            assert!((hit.point - Vec3::new(x, 0.2, 0.0)).length() < 1e-4);
            assert!((hit.distance - 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_closest_hit_prefers_nearest_layer() {
        let (mut vertices, mut triangles) = strip(1);
        // Second copy of the quad lifted to z = 2
        let offset = vertices.len() as u32;
        vertices.extend(vertices.clone().into_iter().map(|mut v| {
            v.position.z = 2.0;
            v
        }));
        let lifted: Vec<_> = triangles
            .iter()
            .map(|t| Triangle {
                vertices: t.vertices.map(|v| VertexId(v.0 + offset)),
                ..*t
            })
            .collect();
        triangles.extend(lifted);

        let index = SpatialIndex::build(&vertices, &triangles);
        let hit = index
            .query_closest_hit(&Ray::new(Vec3::new(0.7, 0.2, 5.0), Vec3::NEG_Z))
            .unwrap();
        assert_eq!(hit.triangle, TriangleId(2));

        let hit = index
            .query_closest_hit(&Ray::new(Vec3::new(0.7, 0.2, -5.0), Vec3::Z))
            .unwrap();
        assert_eq!(hit.triangle, TriangleId(0));
    }

    #[test]
    fn test_ray_miss() {
        let (vertices, triangles) = strip(4);
        let index = SpatialIndex::build(&vertices, &triangles);
        let ray = Ray::new(Vec3::new(-3.0, 0.5, 1.0), Vec3::NEG_Z);
        assert!(index.query_closest_hit(&ray).is_none());
    }

    #[test]
    fn test_query_contains() {
        let (vertices, triangles) = strip(8);
        let index = SpatialIndex::build(&vertices, &triangles);
        // Upper-left half of quad 5
        assert_eq!(
            index.query_contains(Vec3::new(5.2, 0.8, 0.0)),
            Some(TriangleId(11))
        );
        assert_eq!(index.query_contains(Vec3::new(5.2, 0.8, 0.5)), None);
        assert_eq!(index.query_contains(Vec3::new(f32::NAN, 0.0, 0.0)), None);
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::build(&[], &[]);
        assert!(index.is_empty());
        assert!(index.bounds().is_none());
        assert!(index.query_closest_hit(&Ray::new(Vec3::ZERO, Vec3::Z)).is_none());
    }
}
