//! Tripaint mesh core - triangle store and derived structures
//!
//! This crate provides the in-memory mesh and everything derived from it:
//! - [`store::MeshStore`] - Vertices, colored triangles, palette and decals
//! - [`adjacency::AdjacencyIndex`] - Edge-sharing neighbors per triangle
//! - [`spatial::SpatialIndex`] - BVH for ray picks and point queries
//! - [`manifold::SolidMesh`] - Oriented manifold half-edge solid
//! - [`buffers`] - GPU-ready render buffers and color dirty tracking
//! - [`raycast`] - Ray and point tests against single triangles

pub mod adjacency;
pub mod buffers;
pub mod error;
pub mod manifold;
pub mod raycast;
pub mod spatial;
pub mod store;
pub mod types;

pub use adjacency::AdjacencyIndex;
pub use buffers::{DirtyTriangles, RenderBuffers, RenderVertex};
pub use error::MeshError;
pub use manifold::SolidMesh;
pub use raycast::Ray;
pub use spatial::{Aabb, PickHit, SpatialIndex};
pub use store::{MeshGeometry, MeshParts, MeshStore};
pub use types::*;
