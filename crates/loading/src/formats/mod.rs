//! Interchange mesh formats.
//!
//! Every reader produces a [`RawMesh`]: positions plus an indexed triangle
//! list, already triangulated. Formats that repeat vertices per face are
//! welded so the adjacency stage sees shared edges.

mod obj;
mod ply;
mod stl;
pub mod weld;

use std::path::Path;

use glam::Vec3;

use crate::error::FormatError;

pub use weld::weld_vertices;

/// Extension of saved projects
pub const PROJECT_EXTENSION: &str = "p3d";

/// What a source file contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Obj,
    Stl,
    Ply,
    /// A saved project, decoded by [`crate::project`]
    Project,
}

impl SourceFormat {
    /// Pick the format from a file extension, case-insensitively
    pub fn from_path(path: &Path) -> Result<Self, FormatError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "obj" => Ok(SourceFormat::Obj),
            "stl" => Ok(SourceFormat::Stl),
            "ply" => Ok(SourceFormat::Ply),
            PROJECT_EXTENSION => Ok(SourceFormat::Project),
            _ => Err(FormatError::UnsupportedExtension(extension)),
        }
    }
}

/// Decoded triangle soup before any validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMesh {
    pub positions: Vec<Vec3>,
    pub indices: Vec<[u32; 3]>,
}

impl RawMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Fan-triangulate a polygon given as vertex indices
    pub(crate) fn push_polygon(&mut self, polygon: &[u32]) {
        for i in 1..polygon.len().saturating_sub(1) {
            self.indices.push([polygon[0], polygon[i], polygon[i + 1]]);
        }
    }
}

/// Decode an interchange file; projects are not handled here
pub fn read_mesh(
    format: SourceFormat,
    bytes: &[u8],
    weld_tolerance: f32,
) -> Result<RawMesh, FormatError> {
    match format {
        SourceFormat::Obj => obj::parse(bytes),
        SourceFormat::Ply => ply::parse(bytes),
        SourceFormat::Stl => {
            let soup = stl::parse(bytes)?;
            Ok(weld_vertices(&soup, weld_tolerance))
        }
        SourceFormat::Project => Err(FormatError::UnsupportedExtension(
            PROJECT_EXTENSION.to_string(),
        )),
    }
}
