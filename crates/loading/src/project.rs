//! Saved project files.
//!
//! A project is a bincode snapshot of everything needed to rebuild the mesh
//! store without the original interchange file: vertices, triangle indices
//! and colors, the palette and the text decals. Acceleration structures are
//! rebuilt by the loading stages.

use std::fs;
use std::io::Write;
use std::path::Path;

use bincode::Options;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tripaint_mesh::{ColorIndex, MeshStore, Palette, TextDecal};

use crate::error::LoadError;

/// File signature
pub const PROJECT_MAGIC: [u8; 4] = *b"TPNT";

/// Current format version; older versions are not readable
pub const PROJECT_VERSION: u32 = 1;

/// One triangle as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectTriangle {
    pub vertices: [u32; 3],
    pub color: u8,
}

/// On-disk project layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub magic: [u8; 4],
    pub version: u32,
    pub positions: Vec<Vec3>,
    pub triangles: Vec<ProjectTriangle>,
    pub palette: Vec<[f32; 4]>,
    pub active_color: u8,
    pub decals: Vec<TextDecal>,
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new().reject_trailing_bytes()
}

impl ProjectFile {
    /// Snapshot the committed mesh
    pub fn from_store(mesh: &MeshStore) -> Self {
        Self {
            magic: PROJECT_MAGIC,
            version: PROJECT_VERSION,
            positions: mesh.vertices().iter().map(|v| v.position).collect(),
            triangles: mesh
                .triangles()
                .iter()
                .map(|t| ProjectTriangle {
                    vertices: t.vertices.map(|v| v.0),
                    color: t.color.0,
                })
                .collect(),
            palette: mesh.palette().colors().to_vec(),
            active_color: mesh.palette().active().0,
            decals: mesh.decals().to_vec(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        codec().serialize(self)
    }

    /// Decode and check the header; every failure is a corrupt project
    pub fn decode(bytes: &[u8]) -> Result<Self, LoadError> {
        let file: ProjectFile = codec()
            .deserialize(bytes)
            .map_err(|e| LoadError::CorruptProject(e.to_string()))?;
        if file.magic != PROJECT_MAGIC {
            return Err(LoadError::CorruptProject("not a project file".to_string()));
        }
        if file.version != PROJECT_VERSION {
            return Err(LoadError::CorruptProject(format!(
                "unsupported version {}",
                file.version
            )));
        }
        debug!(
            "Decoded project: {} vertices, {} triangles, {} decals",
            file.positions.len(),
            file.triangles.len(),
            file.decals.len()
        );
        Ok(file)
    }

    pub fn indices(&self) -> Vec<[u32; 3]> {
        self.triangles.iter().map(|t| t.vertices).collect()
    }

    pub fn colors(&self) -> Vec<ColorIndex> {
        self.triangles.iter().map(|t| ColorIndex(t.color)).collect()
    }

    /// Rebuild the palette with its active color
    pub fn palette(&self) -> Result<Palette, LoadError> {
        let mut palette = Palette::new(self.palette.clone())
            .map_err(|e| LoadError::CorruptProject(e.to_string()))?;
        palette
            .set_active(ColorIndex(self.active_color))
            .map_err(|e| LoadError::CorruptProject(e.to_string()))?;
        Ok(palette)
    }
}

/// Errors writing a project to disk
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("Failed to encode project: {0}")]
    Encode(#[from] bincode::Error),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Encode `mesh` and write it to `path` through a temporary sibling.
///
/// The destination is replaced only after the temporary file is fully
/// written, so a failed save leaves any previous file intact.
pub fn save_project(mesh: &MeshStore, path: &Path) -> Result<(), SaveError> {
    let bytes = ProjectFile::from_store(mesh).encode()?;
    let io_error = |source| SaveError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    {
        let mut file = fs::File::create(&tmp_path).map_err(io_error)?;
        file.write_all(&bytes).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_error(e));
    }

    info!("Saved project {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProjectFile {
        ProjectFile {
            magic: PROJECT_MAGIC,
            version: PROJECT_VERSION,
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            triangles: vec![ProjectTriangle {
                vertices: [0, 1, 2],
                color: 1,
            }],
            palette: vec![[1.0; 4], [0.0, 0.0, 0.0, 1.0]],
            active_color: 1,
            decals: vec![],
        }
    }

    #[test]
    fn test_decode_encoded() {
        let file = sample();
        let bytes = file.encode().unwrap();
        assert_eq!(ProjectFile::decode(&bytes).unwrap(), file);
    }

    #[test]
    fn test_rejects_bad_header() {
        let mut file = sample();
        file.magic = *b"NOPE";
        let bytes = file.encode().unwrap();
        assert!(matches!(
            ProjectFile::decode(&bytes),
            Err(LoadError::CorruptProject(_))
        ));

        let mut file = sample();
        file.version = 99;
        let bytes = file.encode().unwrap();
        assert!(matches!(
            ProjectFile::decode(&bytes),
            Err(LoadError::CorruptProject(_))
        ));
    }

    #[test]
    fn test_rejects_trailing_and_truncated_bytes() {
        let mut bytes = sample().encode().unwrap();
        bytes.push(0);
        assert!(matches!(
            ProjectFile::decode(&bytes),
            Err(LoadError::CorruptProject(_))
        ));
        bytes.truncate(bytes.len() / 2);
        assert!(matches!(
            ProjectFile::decode(&bytes),
            Err(LoadError::CorruptProject(_))
        ));
    }

    #[test]
    fn test_palette_active_color_checked() {
        let mut file = sample();
        assert_eq!(file.palette().unwrap().active(), ColorIndex(1));
        file.active_color = 5;
        assert!(matches!(file.palette(), Err(LoadError::CorruptProject(_))));
    }
}
