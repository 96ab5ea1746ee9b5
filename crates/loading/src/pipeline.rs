//! The four-stage mesh loading pipeline.
//!
//! A load runs on a worker and builds a brand-new [`MeshStore`]; nothing the
//! controller can see is touched until the finish continuation runs on the
//! controlling thread. Stages run strictly in order, each gated on the
//! previous one:
//!
//! 1. [`Stage::ParseRender`] decodes the source and builds render buffers
//! 2. [`Stage::Compute`] checks palette consistency and builds adjacency
//! 3. [`Stage::Spatial`] rejects degenerate geometry and builds the BVH
//! 4. [`Stage::Manifold`] builds the solid; failing here only degrades tools
//!
//! Only one load may be in flight; further requests fail with
//! [`LoadError::Busy`] until the finish continuation has run.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};
use tripaint_config::LoaderConfig;
use tripaint_mesh::{
    AdjacencyIndex, ColorIndex, MeshError, MeshGeometry, MeshParts, MeshStore, Palette,
    RenderBuffers, SolidMesh, SpatialIndex,
};

use crate::controller::ControllerHandle;
use crate::error::{FormatError, LoadError};
use crate::formats::{self, SourceFormat};
use crate::pool::Executor;
use crate::progress::{GeometryProgress, LoadVerdict, ProgressSnapshot, Stage};
use crate::project::ProjectFile;

/// Where to load a mesh from
#[derive(Debug, Clone)]
pub enum LoadSource {
    /// A file; the format follows from its extension
    Path(PathBuf),
    /// In-memory contents with an explicit format
    Bytes {
        name: String,
        format: SourceFormat,
        data: Vec<u8>,
    },
}

impl LoadSource {
    pub fn describe(&self) -> String {
        match self {
            LoadSource::Path(path) => path.display().to_string(),
            LoadSource::Bytes { name, .. } => name.clone(),
        }
    }

    pub fn format(&self) -> Result<SourceFormat, FormatError> {
        match self {
            LoadSource::Path(path) => SourceFormat::from_path(path),
            LoadSource::Bytes { format, .. } => Ok(*format),
        }
    }

    fn path(&self) -> Option<PathBuf> {
        match self {
            LoadSource::Path(path) => Some(path.clone()),
            LoadSource::Bytes { .. } => None,
        }
    }

    fn into_bytes(self) -> Result<Vec<u8>, FormatError> {
        match self {
            LoadSource::Path(path) => Ok(fs::read(path)?),
            LoadSource::Bytes { data, .. } => Ok(data),
        }
    }
}

/// Identifies one accepted load request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(pub u64);

/// A fully built mesh ready to be swapped in
#[derive(Debug)]
pub struct LoadedMesh {
    pub store: MeshStore,
    /// Decoded from a saved project rather than an interchange file
    pub from_project: bool,
}

/// Everything the finish continuation gets to inspect
#[derive(Debug)]
pub struct LoadOutcome {
    pub ticket: LoadTicket,
    pub source: String,
    /// Set when the source was a file on disk
    pub path: Option<PathBuf>,
    /// Final stage percentages
    pub progress: ProgressSnapshot,
    pub result: Result<LoadedMesh, LoadError>,
}

impl LoadOutcome {
    pub fn verdict(&self) -> LoadVerdict {
        self.progress.verdict()
    }

    /// The soft manifold failure, if the mesh loaded without a solid
    pub fn warning(&self) -> Option<LoadError> {
        let loaded = self.result.as_ref().ok()?;
        loaded.store.solid_error().cloned().map(LoadError::Manifold)
    }
}

/// Owns the in-flight slot and the shared progress record
#[derive(Debug)]
pub struct LoadingPipeline {
    config: LoaderConfig,
    palette: Palette,
    progress: Arc<GeometryProgress>,
    in_flight: Arc<AtomicBool>,
    next_ticket: u64,
}

impl LoadingPipeline {
    /// `palette` is assigned to meshes imported from interchange files
    pub fn new(config: LoaderConfig, palette: Palette) -> Self {
        Self {
            config,
            palette,
            progress: Arc::new(GeometryProgress::new()),
            in_flight: Arc::new(AtomicBool::new(false)),
            next_ticket: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Progress of the current (or last) load
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Shared progress record for pollers on other threads
    pub fn progress_handle(&self) -> Arc<GeometryProgress> {
        self.progress.clone()
    }

    /// Start loading `source` on `executor`.
    ///
    /// `on_finished` runs on the controlling thread, via `controller`, with
    /// the outcome of every stage. The in-flight slot is released right
    /// before it runs.
    pub fn begin_load<C, F>(
        &mut self,
        source: LoadSource,
        executor: &dyn Executor,
        controller: &ControllerHandle<C>,
        on_finished: F,
    ) -> Result<LoadTicket, LoadError>
    where
        C: 'static,
        F: FnOnce(&mut C, LoadOutcome) + Send + 'static,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Load of {} rejected: another load is in progress", source.describe());
            return Err(LoadError::Busy);
        }

        self.next_ticket += 1;
        let ticket = LoadTicket(self.next_ticket);
        self.progress.reset();
        info!("Load {:?} started: {}", ticket, source.describe());

        let config = self.config.clone();
        let palette = self.palette.clone();
        let progress = self.progress.clone();
        let in_flight = self.in_flight.clone();
        let controller = controller.clone();

        executor.enqueue(Box::new(move || {
            let description = source.describe();
            let path = source.path();
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                run_stages(source, &config, &palette, &progress)
            }))
            .unwrap_or_else(|payload| Err(LoadError::Panicked(panic_message(payload))));

            let outcome = LoadOutcome {
                ticket,
                source: description,
                path,
                progress: progress.snapshot(),
                result,
            };
            match &outcome.result {
                Ok(_) => info!("Load {:?} finished: {:?}", ticket, outcome.verdict()),
                Err(e) => error!("Load {:?} failed: {}", ticket, e),
            }

            let release = in_flight.clone();
            let delivered = controller.enqueue(move |context: &mut C| {
                release.store(false, Ordering::Release);
                on_finished(context, outcome);
            });
            if !delivered {
                in_flight.store(false, Ordering::Release);
            }
        }));

        Ok(ticket)
    }
}

/// Run every stage on the current thread.
///
/// Progress is written to `progress` as stages advance; a stage that fails
/// keeps its value below 1.0.
pub fn run_stages(
    source: LoadSource,
    config: &LoaderConfig,
    import_palette: &Palette,
    progress: &GeometryProgress,
) -> Result<LoadedMesh, LoadError> {
    // === Stage 1: parse and render buffers ===
    let format = source.format()?;
    let bytes = source.into_bytes()?;
    progress.set(Stage::ParseRender, 0.2);

    let (geometry, palette, decals, from_project) = if format == SourceFormat::Project {
        let file = ProjectFile::decode(&bytes)?;
        let palette = file.palette()?;
        let geometry = build_geometry(&file.positions, &file.indices(), Some(&file.colors()))?;
        (geometry, palette, file.decals, true)
    } else {
        let raw = formats::read_mesh(format, &bytes, config.weld_tolerance)?;
        let geometry = build_geometry(&raw.positions, &raw.indices, None)?;
        (geometry, import_palette.clone(), Vec::new(), false)
    };
    drop(bytes);
    progress.set(Stage::ParseRender, 0.6);

    let render = RenderBuffers::build(&geometry.vertices, &geometry.triangles);
    progress.complete(Stage::ParseRender);
    debug!(
        "Stage {}: {} vertices, {} triangles",
        Stage::ParseRender,
        geometry.vertices.len(),
        geometry.triangles.len()
    );

    // === Stage 2: compute buffers ===
    geometry
        .check_palette(&palette)
        .map_err(LoadError::Consistency)?;
    progress.set(Stage::Compute, 0.3);
    let adjacency = AdjacencyIndex::build(&geometry.triangles);
    progress.complete(Stage::Compute);
    debug!(
        "Stage {}: {} boundary edges, {} non-manifold edges",
        Stage::Compute,
        adjacency.boundary_edge_count(),
        adjacency.non_manifold_edges().len()
    );

    // === Stage 3: spatial index ===
    geometry
        .check_degenerate(config.degenerate_area_tolerance)
        .map_err(LoadError::Degenerate)?;
    progress.set(Stage::Spatial, 0.3);
    let spatial = SpatialIndex::build(&geometry.vertices, &geometry.triangles);
    progress.complete(Stage::Spatial);
    debug!("Stage {}: bounds {:?}", Stage::Spatial, spatial.bounds());

    // === Stage 4: manifold solid (soft) ===
    let solid = SolidMesh::build(geometry.vertices.len(), &geometry.triangles);
    match &solid {
        Ok(solid) => {
            progress.complete(Stage::Manifold);
            debug!("Stage {}: closed = {}", Stage::Manifold, solid.is_closed());
        }
        Err(e) => warn!("Stage {} failed, advanced tools disabled: {}", Stage::Manifold, e),
    }

    let store = MeshStore::assemble(MeshParts {
        geometry,
        palette,
        decals,
        render,
        adjacency,
        spatial,
        solid,
    });
    Ok(LoadedMesh {
        store,
        from_project,
    })
}

fn build_geometry(
    positions: &[glam::Vec3],
    indices: &[[u32; 3]],
    colors: Option<&[ColorIndex]>,
) -> Result<MeshGeometry, LoadError> {
    MeshGeometry::from_indexed(positions, indices, colors).map_err(|e| match e {
        MeshError::Empty => LoadError::EmptyMesh,
        e => LoadError::Malformed(e),
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Palette {
        Palette::new(vec![[1.0; 4], [0.0, 0.0, 0.0, 1.0]]).unwrap()
    }

    fn obj(text: &str) -> LoadSource {
        LoadSource::Bytes {
            name: "test.obj".to_string(),
            format: SourceFormat::Obj,
            data: text.as_bytes().to_vec(),
        }
    }

    fn run(source: LoadSource) -> (Result<LoadedMesh, LoadError>, ProgressSnapshot) {
        let progress = GeometryProgress::new();
        let result = run_stages(source, &LoaderConfig::default(), &palette(), &progress);
        (result, progress.snapshot())
    }

    #[test]
    fn test_single_triangle_completes_every_stage() {
        let (result, progress) = run(obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n"));
        let loaded = result.unwrap();
        assert_eq!(loaded.store.triangle_count(), 1);
        assert!(!loaded.from_project);
        for stage in Stage::ALL {
            assert_eq!(progress.get(stage), 1.0, "{stage}");
        }
        assert_eq!(progress.verdict(), LoadVerdict::Complete);
    }

    #[test]
    fn test_index_out_of_range_fails_first_stage() {
        let (result, progress) = run(obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n"));
        assert!(matches!(result, Err(LoadError::Malformed(_))));
        assert_eq!(progress.verdict(), LoadVerdict::Failed(Stage::ParseRender));
    }

    #[test]
    fn test_degenerate_fails_spatial_stage() {
        let (result, progress) = run(obj("v 0 0 0\nv 1 0 0\nv 2 0 0\nf 1 2 3\n"));
        assert!(matches!(result, Err(LoadError::Degenerate(_))));
        assert_eq!(progress.get(Stage::Compute), 1.0);
        assert_eq!(progress.verdict(), LoadVerdict::Failed(Stage::Spatial));
    }

    #[test]
    fn test_nan_corner_in_stl_fails_spatial_stage() {
        let stl = "solid nan
facet normal 0 0 1
outer loop
vertex 0 0 0
vertex 1 0 0
vertex 1 1 0
endloop
endfacet
facet normal 0 0 1
outer loop
vertex 1 1 0
vertex 0 1 0
vertex NaN NaN NaN
endloop
endfacet
endsolid nan
";
        let (result, progress) = run(LoadSource::Bytes {
            name: "nan.stl".to_string(),
            format: SourceFormat::Stl,
            data: stl.as_bytes().to_vec(),
        });
        assert!(matches!(
            result,
            Err(LoadError::Degenerate(MeshError::NonFinite(_)))
        ));
        assert_eq!(progress.verdict(), LoadVerdict::Failed(Stage::Spatial));
    }

    #[test]
    fn test_project_colors_out_of_palette_fail_compute_stage() {
        let file = crate::project::ProjectFile {
            magic: crate::project::PROJECT_MAGIC,
            version: crate::project::PROJECT_VERSION,
            positions: vec![glam::Vec3::ZERO, glam::Vec3::X, glam::Vec3::Y],
            triangles: vec![crate::project::ProjectTriangle {
                vertices: [0, 1, 2],
                color: 3,
            }],
            palette: vec![[1.0; 4]],
            active_color: 0,
            decals: vec![],
        };
        let (result, progress) = run(LoadSource::Bytes {
            name: "bad.p3d".to_string(),
            format: SourceFormat::Project,
            data: file.encode().unwrap(),
        });
        assert!(matches!(result, Err(LoadError::Consistency(_))));
        assert_eq!(progress.verdict(), LoadVerdict::Failed(Stage::Compute));
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(3u8)), "unknown panic");
    }
}
