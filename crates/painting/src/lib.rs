//! Tripaint painting - mesh mutations and their history
//!
//! This crate provides everything that changes triangle colors:
//! - [`flood_fill`] - Connected-region fill over the adjacency graph
//! - [`commands`] - Invertible commands (recolor, text decal, palette edit)
//! - [`history::CommandManager`] - Linear undo/redo with a version counter
//! - [`stroke::StrokeRecorder`] - Triangle painter drags as single commands

pub mod commands;
pub mod error;
pub mod flood_fill;
pub mod history;
pub mod stroke;

#[cfg(test)]
pub(crate) mod test_support;

pub use commands::{ApplyDecal, ColorChange, Command, RecolorTriangles, SetPaletteColor};
pub use error::PaintError;
pub use flood_fill::{FillPolicy, flood_region, plan_flood_fill};
pub use history::CommandManager;
pub use stroke::StrokeRecorder;
