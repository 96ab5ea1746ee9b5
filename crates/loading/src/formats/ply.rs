//! PLY reader (ASCII and binary) on top of `ply-rs-bw`.

use std::io::Cursor;

use glam::Vec3;
use ply_rs_bw::parser::Parser;
use ply_rs_bw::ply::{DefaultElement, Property};

use super::RawMesh;
use crate::error::FormatError;

pub(super) fn parse(bytes: &[u8]) -> Result<RawMesh, FormatError> {
    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut Cursor::new(bytes))
        .map_err(|e| FormatError::Ply(e.to_string()))?;

    let vertices = ply
        .payload
        .get("vertex")
        .ok_or_else(|| FormatError::Ply("missing vertex element".to_string()))?;

    let mut mesh = RawMesh {
        positions: Vec::with_capacity(vertices.len()),
        indices: Vec::new(),
    };
    for vertex in vertices {
        let coord = |name: &str| {
            vertex
                .get(name)
                .and_then(property_f32)
                .ok_or_else(|| FormatError::Ply(format!("vertex without scalar {name}")))
        };
        mesh.positions.push(Vec3::new(coord("x")?, coord("y")?, coord("z")?));
    }

    // A point cloud has no faces; the empty-mesh check reports it
    let Some(faces) = ply.payload.get("face") else {
        return Ok(mesh);
    };
    for face in faces {
        let polygon = face
            .get("vertex_indices")
            .or_else(|| face.get("vertex_index"))
            .and_then(property_indices)
            .ok_or_else(|| FormatError::Ply("face without vertex index list".to_string()))?;
        if polygon.len() < 3 {
            return Err(FormatError::Ply(format!(
                "face with {} vertices",
                polygon.len()
            )));
        }
        mesh.push_polygon(&polygon);
    }

    Ok(mesh)
}

fn property_f32(prop: &Property) -> Option<f32> {
    match prop {
        Property::Float(v) => Some(*v),
        Property::Double(v) => Some(*v as f32),
        Property::Int(v) => Some(*v as f32),
        Property::UInt(v) => Some(*v as f32),
        Property::Short(v) => Some(*v as f32),
        Property::UShort(v) => Some(*v as f32),
        Property::Char(v) => Some(*v as f32),
        Property::UChar(v) => Some(*v as f32),
        _ => None,
    }
}

/// Vertex index list; negative entries make the whole list invalid
fn property_indices(prop: &Property) -> Option<Vec<u32>> {
    fn convert<T: Copy>(values: &[T]) -> Option<Vec<u32>>
    where
        u32: TryFrom<T>,
    {
        values.iter().map(|&v| u32::try_from(v).ok()).collect()
    }

    match prop {
        Property::ListInt(v) => convert(v),
        Property::ListUInt(v) => Some(v.clone()),
        Property::ListShort(v) => convert(v),
        Property::ListUShort(v) => convert(v),
        Property::ListChar(v) => convert(v),
        Property::ListUChar(v) => convert(v),
        _ => None,
    }
}
