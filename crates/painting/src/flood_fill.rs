//! Connected-region flood fill over the triangle adjacency graph.
//!
//! The region is grown breadth-first from a seed triangle. An edge between
//! the triangle being expanded and a neighbor is crossed only when the
//! [`FillPolicy`] allows it. The region is computed against the colors as
//! they are before the fill, then turned into a [`RecolorTriangles`]
//! command holding exactly the (triangle, previous color) pairs that change.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;
use tripaint_mesh::{ColorIndex, MeshStore, TriangleId};

use crate::commands::{ColorChange, RecolorTriangles};
use crate::error::PaintError;

/// When the fill may continue across an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillPolicy {
    /// Always continue: fill the whole connected component
    Unconditional,
    /// Continue only into neighbors with the same color as the triangle being expanded
    #[default]
    SameColor,
}

impl FillPolicy {
    /// Whether expansion may cross from `from` into `to`
    #[inline]
    pub fn may_continue(self, mesh: &MeshStore, from: TriangleId, to: TriangleId) -> bool {
        match self {
            FillPolicy::Unconditional => true,
            FillPolicy::SameColor => mesh.color(from) == mesh.color(to),
        }
    }
}

/// Triangles reachable from `seed` under `policy`, in visit order.
///
/// Each triangle is visited at most once.
pub fn flood_region(
    mesh: &MeshStore,
    seed: TriangleId,
    policy: FillPolicy,
) -> Result<Vec<TriangleId>, PaintError> {
    if !mesh.contains(seed) {
        return Err(PaintError::InvalidSeed(seed));
    }

    let mut visited = vec![false; mesh.triangle_count()];
    let mut queue = VecDeque::new();
    let mut region = Vec::new();

    visited[seed.index()] = true;
    queue.push_back(seed);

    while let Some(current) = queue.pop_front() {
        region.push(current);
        for neighbor in mesh.adjacency().neighbors(current) {
            if visited[neighbor.index()] || !policy.may_continue(mesh, current, neighbor) {
                continue;
            }
            visited[neighbor.index()] = true;
            queue.push_back(neighbor);
        }
    }

    Ok(region)
}

/// Plan a fill: the recolor command for the region around `seed`.
///
/// Triangles already at `color` are left out, so filling a uniformly
/// colored region with its own color yields an empty command.
pub fn plan_flood_fill(
    mesh: &MeshStore,
    seed: TriangleId,
    policy: FillPolicy,
    color: ColorIndex,
) -> Result<RecolorTriangles, PaintError> {
    if !mesh.palette().contains(color) {
        return Err(tripaint_mesh::MeshError::ColorOutOfRange {
            color: color.0,
            palette_len: mesh.palette().len(),
        }
        .into());
    }

    let region = flood_region(mesh, seed, policy)?;
    let region_len = region.len();

    let changes: Vec<ColorChange> = region
        .into_iter()
        .filter_map(|triangle| {
            let previous = mesh.color(triangle)?;
            (previous != color).then_some(ColorChange {
                triangle,
                previous,
                next: color,
            })
        })
        .collect();

    debug!(
        "plan_flood_fill: seed {:?} {:?} -> region {} triangles, {} changed",
        seed,
        policy,
        region_len,
        changes.len()
    );

    Ok(RecolorTriangles::new("Paint Bucket", changes))
}
