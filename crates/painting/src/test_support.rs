//! Mesh fixtures shared by unit tests.

use glam::Vec3;
use tripaint_mesh::{ColorIndex, MeshStore, Palette, TriangleId};

/// A strip of `n` quads (2n triangles) in the z=0 plane.
///
/// Triangles 2i and 2i+1 form quad i; triangle 2i of quad i shares an
/// edge with triangle 2i+3 of quad i+1. Palette: white, red, green.
pub(crate) fn strip(n: u32) -> MeshStore {
    let mut positions = Vec::new();
    for i in 0..=n {
        positions.push(Vec3::new(i as f32, 0.0, 0.0));
        positions.push(Vec3::new(i as f32, 1.0, 0.0));
    }
    let mut indices = Vec::new();
    for i in 0..n {
        let v = i * 2;
        indices.push([v, v + 2, v + 3]);
        indices.push([v, v + 3, v + 1]);
    }
    let palette = Palette::new(vec![
        [1.0, 1.0, 1.0, 1.0],
        [1.0, 0.0, 0.0, 1.0],
        [0.0, 1.0, 0.0, 1.0],
    ])
    .unwrap();
    MeshStore::from_indexed(&positions, &indices, palette).unwrap()
}

/// Colors of every triangle as raw palette indices
pub(crate) fn colors(mesh: &MeshStore) -> Vec<u8> {
    mesh.colors().into_iter().map(|c| c.0).collect()
}

pub(crate) fn paint(mesh: &mut MeshStore, triangles: &[u32], color: u8) {
    for &t in triangles {
        mesh.set_color(TriangleId(t), ColorIndex(color)).unwrap();
    }
}
