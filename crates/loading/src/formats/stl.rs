//! STL reader, ASCII and binary. Produces an unwelded triangle soup.

use glam::Vec3;

use super::RawMesh;
use crate::error::FormatError;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

pub(super) fn parse(bytes: &[u8]) -> Result<RawMesh, FormatError> {
    // Binary files may also start with "solid", so the size check comes first
    if let Some(count) = binary_facet_count(bytes) {
        return Ok(parse_binary(bytes, count));
    }
    if bytes.trim_ascii_start().starts_with(b"solid") {
        return parse_ascii(bytes);
    }
    Err(FormatError::Stl(format!(
        "neither ASCII nor binary STL ({} bytes)",
        bytes.len()
    )))
}

fn binary_facet_count(bytes: &[u8]) -> Option<usize> {
    let count_bytes: [u8; 4] = bytes.get(HEADER_LEN..HEADER_LEN + 4)?.try_into().ok()?;
    let count = u32::from_le_bytes(count_bytes) as usize;
    let expected = count.checked_mul(FACET_LEN)?.checked_add(HEADER_LEN + 4)?;
    (expected == bytes.len()).then_some(count)
}

fn parse_binary(bytes: &[u8], count: usize) -> RawMesh {
    let mut mesh = RawMesh {
        positions: Vec::with_capacity(count * 3),
        indices: Vec::with_capacity(count),
    };
    let read_f32 = |at: usize| f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

    for facet in 0..count {
        // Skip the stored normal; it is recomputed from the winding
        let base = HEADER_LEN + 4 + facet * FACET_LEN + 12;
        let first = mesh.positions.len() as u32;
        for corner in 0..3 {
            let at = base + corner * 12;
            mesh.positions
                .push(Vec3::new(read_f32(at), read_f32(at + 4), read_f32(at + 8)));
        }
        mesh.indices.push([first, first + 1, first + 2]);
    }
    mesh
}

fn parse_ascii(bytes: &[u8]) -> Result<RawMesh, FormatError> {
    let text = String::from_utf8_lossy(bytes);
    let mut mesh = RawMesh::default();

    for (line_idx, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("vertex") {
            continue;
        }
        let mut coords = [0.0f32; 3];
        for coord in &mut coords {
            *coord = tokens
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| FormatError::Stl(format!("line {}: invalid vertex", line_idx + 1)))?;
        }
        mesh.positions.push(Vec3::from(coords));
    }

    if mesh.positions.len() % 3 != 0 {
        return Err(FormatError::Stl(format!(
            "{} vertices do not form whole triangles",
            mesh.positions.len()
        )));
    }
    let triangles = (mesh.positions.len() / 3) as u32;
    mesh.indices = (0..triangles).map(|t| [t * 3, t * 3 + 1, t * 3 + 2]).collect();
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[..5].copy_from_slice(b"solid");
        bytes.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for tri in triangles {
            bytes.extend_from_slice(&[0u8; 12]);
            for corner in tri {
                for c in corner {
                    bytes.extend_from_slice(&c.to_le_bytes());
                }
            }
            bytes.extend_from_slice(&[0u8; 2]);
        }
        bytes
    }

    #[test]
    fn test_binary_starting_with_solid() {
        let bytes = binary(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        let mesh = parse(&bytes).unwrap();
        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.positions[1], Vec3::X);
        assert_eq!(mesh.indices, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_binary_zero_facets() {
        let mesh = parse(&binary(&[])).unwrap();
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn test_ascii_incomplete_facet() {
        let stl = b"solid bad\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nendloop\nendfacet\nendsolid\n";
        assert!(matches!(parse(stl), Err(FormatError::Stl(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse(b"\x01\x02\x03 not a mesh").is_err());
    }
}
