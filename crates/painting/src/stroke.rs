//! Triangle painter strokes.
//!
//! While the pointer is dragged each picked triangle is painted immediately
//! so the user sees the result. The recorder remembers the first previous
//! color of every touched triangle so the whole drag becomes one undo step.

use std::collections::HashMap;

use tracing::debug;
use tripaint_mesh::{ColorIndex, MeshError, MeshStore, TriangleId};

use crate::commands::{ColorChange, RecolorTriangles};
use crate::error::PaintError;

/// Collects one drag of the triangle painter
#[derive(Debug, Default)]
pub struct StrokeRecorder {
    active: Option<ActiveStroke>,
}

#[derive(Debug)]
struct ActiveStroke {
    color: ColorIndex,
    /// Touched triangles in paint order
    order: Vec<TriangleId>,
    previous: HashMap<TriangleId, ColorIndex>,
}

impl StrokeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Start a stroke; an unfinished previous stroke is kept painted but discarded
    pub fn begin(&mut self, mesh: &MeshStore, color: ColorIndex) -> Result<(), PaintError> {
        if !mesh.palette().contains(color) {
            return Err(MeshError::ColorOutOfRange {
                color: color.0,
                palette_len: mesh.palette().len(),
            }
            .into());
        }
        self.active = Some(ActiveStroke {
            color,
            order: Vec::new(),
            previous: HashMap::new(),
        });
        Ok(())
    }

    /// Paint one triangle with the stroke color
    pub fn paint(&mut self, mesh: &mut MeshStore, triangle: TriangleId) -> Result<(), PaintError> {
        let stroke = self.active.as_mut().ok_or(PaintError::NoStroke)?;
        let previous = mesh.set_color(triangle, stroke.color)?;
        if !stroke.previous.contains_key(&triangle) {
            stroke.previous.insert(triangle, previous);
            stroke.order.push(triangle);
        }
        Ok(())
    }

    /// End the stroke, returning the already-applied command for the history
    pub fn finish(&mut self) -> Result<RecolorTriangles, PaintError> {
        let stroke = self.active.take().ok_or(PaintError::NoStroke)?;
        let changes: Vec<ColorChange> = stroke
            .order
            .iter()
            .filter_map(|&triangle| {
                let previous = stroke.previous[&triangle];
                (previous != stroke.color).then_some(ColorChange {
                    triangle,
                    previous,
                    next: stroke.color,
                })
            })
            .collect();
        debug!(
            "Stroke finished: {} triangles touched, {} changed",
            stroke.order.len(),
            changes.len()
        );
        Ok(RecolorTriangles::new("Triangle Painter", changes))
    }

    /// Abort the stroke and restore every touched triangle
    pub fn cancel(&mut self, mesh: &mut MeshStore) -> Result<(), PaintError> {
        let stroke = self.active.take().ok_or(PaintError::NoStroke)?;
        for triangle in stroke.order.iter().rev() {
            mesh.set_color(*triangle, stroke.previous[triangle])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::history::CommandManager;
    use crate::test_support::{colors, paint, strip};

    #[test]
    fn test_stroke_is_one_undo_step() {
        let mut mesh = strip(2);
        let mut manager = CommandManager::default();
        let mut recorder = StrokeRecorder::new();

        recorder.begin(&mesh, ColorIndex(1)).unwrap();
        for t in [0, 1, 0, 2] {
            recorder.paint(&mut mesh, TriangleId(t)).unwrap();
        }
        assert_eq!(colors(&mesh), vec![1, 1, 1, 0]);

        let command = recorder.finish().unwrap();
        assert_eq!(command.changes().len(), 3);
        assert!(manager.record_applied(Box::new(command)));

        manager.undo(&mut mesh).unwrap();
        assert_eq!(colors(&mesh), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_first_previous_color_wins() {
        let mut mesh = strip(1);
        paint(&mut mesh, &[0], 2);
        let mut recorder = StrokeRecorder::new();
        recorder.begin(&mesh, ColorIndex(1)).unwrap();
        recorder.paint(&mut mesh, TriangleId(0)).unwrap();
        recorder.paint(&mut mesh, TriangleId(0)).unwrap();
        let command = recorder.finish().unwrap();
        assert_eq!(command.changes()[0].previous, ColorIndex(2));
    }

    #[test]
    fn test_stroke_over_same_color_is_empty() {
        let mut mesh = strip(1);
        let mut recorder = StrokeRecorder::new();
        recorder.begin(&mesh, ColorIndex(0)).unwrap();
        recorder.paint(&mut mesh, TriangleId(1)).unwrap();
        assert!(recorder.finish().unwrap().is_empty());
    }

    #[test]
    fn test_cancel_restores_colors() {
        let mut mesh = strip(2);
        let mut recorder = StrokeRecorder::new();
        recorder.begin(&mesh, ColorIndex(2)).unwrap();
        recorder.paint(&mut mesh, TriangleId(3)).unwrap();
        recorder.paint(&mut mesh, TriangleId(1)).unwrap();
        recorder.cancel(&mut mesh).unwrap();
        assert_eq!(colors(&mesh), vec![0, 0, 0, 0]);
        assert!(!recorder.is_active());
    }

    #[test]
    fn test_paint_without_stroke() {
        let mut mesh = strip(1);
        let mut recorder = StrokeRecorder::new();
        assert_eq!(
            recorder.paint(&mut mesh, TriangleId(0)),
            Err(PaintError::NoStroke)
        );
        assert!(recorder.begin(&mesh, ColorIndex(7)).is_err());
        assert!(matches!(recorder.finish(), Err(PaintError::NoStroke)));
    }
}
