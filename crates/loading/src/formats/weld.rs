//! Merge positionally identical vertices.
//!
//! Triangle-soup formats store every corner separately, which would leave
//! each triangle without neighbors. Positions are quantized to the weld
//! tolerance and corners landing in the same cell share one vertex.
//! Triangles that collapse are kept; the spatial stage rejects them.
//! Non-finite positions are never merged, so the same stage sees them.

use std::collections::HashMap;

use glam::Vec3;
use tracing::debug;

use super::RawMesh;

/// Weld `mesh`, keeping first-seen vertex order
pub fn weld_vertices(mesh: &RawMesh, tolerance: f32) -> RawMesh {
    let scale = if tolerance > 0.0 { 1.0 / tolerance } else { 1.0e6 };
    let quantize = |p: Vec3| -> [i64; 3] {
        let q = (p * scale).round();
        [q.x as i64, q.y as i64, q.z as i64]
    };

    let mut cell_to_vertex: HashMap<[i64; 3], u32> = HashMap::new();
    let mut remap = Vec::with_capacity(mesh.positions.len());
    let mut positions = Vec::new();

    for &position in &mesh.positions {
        let next = positions.len() as u32;
        if !position.is_finite() {
            positions.push(position);
            remap.push(next);
            continue;
        }
        let index = *cell_to_vertex.entry(quantize(position)).or_insert(next);
        if index == next {
            positions.push(position);
        }
        remap.push(index);
    }

    let indices = mesh
        .indices
        .iter()
        .map(|&tri| tri.map(|i| remap.get(i as usize).copied().unwrap_or(i)))
        .collect();

    let welded = mesh.positions.len() - positions.len();
    if welded > 0 {
        debug!(
            "weld_vertices: welded {} duplicate vertices ({} unique of {} total)",
            welded,
            positions.len(),
            mesh.positions.len()
        );
    }

    RawMesh { positions, indices }
}
