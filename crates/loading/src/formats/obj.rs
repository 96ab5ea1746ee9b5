//! Wavefront OBJ reader (geometry only).

use glam::Vec3;

use super::RawMesh;
use crate::error::FormatError;

pub(super) fn parse(bytes: &[u8]) -> Result<RawMesh, FormatError> {
    let text = String::from_utf8_lossy(bytes);
    let mut mesh = RawMesh::default();
    let mut polygon = Vec::new();

    for (line_idx, raw_line) in text.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = raw_line.split('#').next().unwrap_or("").trim();
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };

        match keyword {
            "v" => {
                let mut coords = [0.0f32; 3];
                for coord in &mut coords {
                    let token = tokens.next().ok_or_else(|| error(line_no, "vertex needs 3 coordinates"))?;
                    *coord = token
                        .parse()
                        .map_err(|_| error(line_no, &format!("invalid coordinate {token:?}")))?;
                }
                mesh.positions.push(Vec3::from(coords));
            }
            "f" => {
                polygon.clear();
                for token in tokens {
                    polygon.push(resolve_index(token, mesh.positions.len(), line_no)?);
                }
                if polygon.len() < 3 {
                    return Err(error(line_no, "face needs at least 3 vertices"));
                }
                mesh.push_polygon(&polygon);
            }
            // Texture coordinates, normals, groups and materials carry no geometry
            _ => {}
        }
    }

    Ok(mesh)
}

/// Resolve `v`, `v/vt`, `v//vn` or `v/vt/vn` to a zero-based vertex index
fn resolve_index(token: &str, vertex_count: usize, line_no: usize) -> Result<u32, FormatError> {
    let vertex = token.split('/').next().unwrap_or("");
    let index: i64 = vertex
        .parse()
        .map_err(|_| error(line_no, &format!("invalid face index {token:?}")))?;

    let resolved = match index {
        0 => return Err(error(line_no, "face index 0 is not valid")),
        i if i > 0 => i - 1,
        // Negative indices count back from the latest vertex
        i => vertex_count as i64 + i,
    };
    u32::try_from(resolved).map_err(|_| error(line_no, &format!("face index {index} out of range")))
}

fn error(line: usize, message: &str) -> FormatError {
    FormatError::Obj {
        line,
        message: message.to_string(),
    }
}
