//! Invertible mesh mutations.
//!
//! A command captures exactly the state needed to apply a mutation and to
//! reverse it. Commands are immutable once built; the [`crate::history`]
//! manager decides when they run.

use std::fmt;

use tripaint_mesh::{ColorIndex, MeshError, MeshStore, TextDecal, TriangleId};

use crate::error::PaintError;

/// An invertible mutation of the current mesh
pub trait Command: Send + fmt::Debug {
    /// Short label for menus ("Undo Paint Bucket")
    fn description(&self) -> &str;

    /// Apply the mutation
    fn apply(&self, mesh: &mut MeshStore) -> Result<(), PaintError>;

    /// Exactly reverse a previous [`Command::apply`]
    fn revert(&self, mesh: &mut MeshStore) -> Result<(), PaintError>;

    /// Whether applying would change nothing; empty commands are never recorded
    fn is_empty(&self) -> bool;
}

/// One triangle's color transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorChange {
    pub triangle: TriangleId,
    pub previous: ColorIndex,
    pub next: ColorIndex,
}

/// Recolor a set of triangles (paint bucket, triangle painter strokes)
#[derive(Debug, Clone, PartialEq)]
pub struct RecolorTriangles {
    description: String,
    changes: Vec<ColorChange>,
}

impl RecolorTriangles {
    pub fn new(description: impl Into<String>, changes: Vec<ColorChange>) -> Self {
        Self {
            description: description.into(),
            changes,
        }
    }

    pub fn changes(&self) -> &[ColorChange] {
        &self.changes
    }

    /// Triangles touched by this command
    pub fn triangles(&self) -> impl Iterator<Item = TriangleId> + '_ {
        self.changes.iter().map(|c| c.triangle)
    }

    /// All-or-nothing: validate every change before writing any
    fn write(
        &self,
        mesh: &mut MeshStore,
        pick: impl Fn(&ColorChange) -> ColorIndex,
    ) -> Result<(), PaintError> {
        for change in &self.changes {
            if !mesh.contains(change.triangle) {
                return Err(MeshError::NoSuchTriangle(change.triangle).into());
            }
            let color = pick(change);
            if !mesh.palette().contains(color) {
                return Err(MeshError::ColorOutOfRange {
                    color: color.0,
                    palette_len: mesh.palette().len(),
                }
                .into());
            }
        }
        for change in &self.changes {
            mesh.set_color(change.triangle, pick(change))?;
        }
        Ok(())
    }
}

impl Command for RecolorTriangles {
    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&self, mesh: &mut MeshStore) -> Result<(), PaintError> {
        self.write(mesh, |c| c.next)
    }

    fn revert(&self, mesh: &mut MeshStore) -> Result<(), PaintError> {
        self.write(mesh, |c| c.previous)
    }

    fn is_empty(&self) -> bool {
        self.changes.iter().all(|c| c.previous == c.next)
    }
}

/// Stamp a text decal: record it and recolor the triangles its glyphs cover
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyDecal {
    decal: TextDecal,
    recolor: RecolorTriangles,
}

impl ApplyDecal {
    /// `covered` are the triangles the text rasterizer selected
    pub fn plan(mesh: &MeshStore, decal: TextDecal, covered: &[TriangleId]) -> Result<Self, PaintError> {
        let mut changes = Vec::with_capacity(covered.len());
        let mut seen = vec![false; mesh.triangle_count()];
        for &triangle in covered {
            let previous = mesh
                .color(triangle)
                .ok_or(MeshError::NoSuchTriangle(triangle))?;
            if std::mem::replace(&mut seen[triangle.index()], true) {
                continue;
            }
            changes.push(ColorChange {
                triangle,
                previous,
                next: decal.color,
            });
        }
        Ok(Self {
            decal,
            recolor: RecolorTriangles::new("Text", changes),
        })
    }

    pub fn decal(&self) -> &TextDecal {
        &self.decal
    }
}

impl Command for ApplyDecal {
    fn description(&self) -> &str {
        "Text"
    }

    fn apply(&self, mesh: &mut MeshStore) -> Result<(), PaintError> {
        self.recolor.apply(mesh)?;
        mesh.push_decal(self.decal.clone());
        Ok(())
    }

    fn revert(&self, mesh: &mut MeshStore) -> Result<(), PaintError> {
        mesh.pop_decal();
        self.recolor.revert(mesh)
    }

    /// A decal record is a change even when no triangle changes color
    fn is_empty(&self) -> bool {
        false
    }
}

/// Change the RGBA value of a palette entry
#[derive(Debug, Clone, PartialEq)]
pub struct SetPaletteColor {
    color: ColorIndex,
    previous: [f32; 4],
    next: [f32; 4],
}

impl SetPaletteColor {
    pub fn plan(mesh: &MeshStore, color: ColorIndex, next: [f32; 4]) -> Result<Self, PaintError> {
        let previous = mesh.palette().rgba(color).ok_or(MeshError::ColorOutOfRange {
            color: color.0,
            palette_len: mesh.palette().len(),
        })?;
        Ok(Self {
            color,
            previous,
            next,
        })
    }
}

impl Command for SetPaletteColor {
    fn description(&self) -> &str {
        "Palette Color"
    }

    fn apply(&self, mesh: &mut MeshStore) -> Result<(), PaintError> {
        mesh.palette_mut().set_rgba(self.color, self.next)?;
        Ok(())
    }

    fn revert(&self, mesh: &mut MeshStore) -> Result<(), PaintError> {
        mesh.palette_mut().set_rgba(self.color, self.previous)?;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.previous == self.next
    }
}
