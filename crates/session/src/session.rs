//! The controlling-thread session.
//!
//! A [`Session`] owns the committed mesh and everything that mutates it. It
//! hands loads to the [`LoadingPipeline`] and receives the results as
//! continuations through its controller queue, which the embedding
//! application drains once per frame with [`Session::pump`]. The committed
//! mesh is only ever replaced inside that continuation, so tools keep
//! working on the old mesh while a new one loads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use tripaint_config::TripaintConfig;
use tripaint_loading::{
    ControllerQueue, Executor, GeometryProgress, LoadError, LoadOutcome, LoadSource, LoadTicket,
    LoadingPipeline, PROJECT_EXTENSION, ProgressSnapshot, SourceFormat, WorkerPool, save_project,
};
use tripaint_mesh::{
    ColorIndex, MeshCapabilities, MeshStore, Palette, PickHit, Ray, TextDecal, TriangleId,
};
use tripaint_painting::{
    ApplyDecal, CommandManager, FillPolicy, SetPaletteColor, StrokeRecorder, plan_flood_fill,
};

use crate::error::SessionError;
use crate::notice::{Notice, NoticeQueue, Severity};
use crate::tools::ToolRegistry;

/// Application state owned by the controlling thread
pub struct Session {
    config: TripaintConfig,
    executor: Arc<dyn Executor>,
    queue: ControllerQueue<Session>,
    pipeline: LoadingPipeline,

    mesh: Option<MeshStore>,
    history: CommandManager,
    stroke: StrokeRecorder,
    last_saved_version: u64,
    /// Where "save" writes; only set for meshes that came from or went to a project
    project_path: Option<PathBuf>,
    /// File the committed mesh was loaded from
    source_path: Option<PathBuf>,

    tools: ToolRegistry,
    notices: NoticeQueue,
    shutdown_requested: bool,
}

impl Session {
    /// Start a session with its own worker pool.
    ///
    /// Errors are fatal: the application cannot run without workers.
    pub fn start(config: TripaintConfig) -> Result<Self, SessionError> {
        let pool = WorkerPool::from_config(&config.workers)?;
        Self::new(config, Arc::new(pool))
    }

    /// Start a session on an existing executor
    pub fn new(config: TripaintConfig, executor: Arc<dyn Executor>) -> Result<Self, SessionError> {
        let palette = Palette::new(config.palette.sanitized())
            .map_err(|e| SessionError::Startup(format!("invalid default palette: {e}")))?;
        let pipeline = LoadingPipeline::new(config.loader.clone(), palette);
        let history = CommandManager::new(&config.history);
        info!(
            "Session started ({} workers, history of {})",
            executor.worker_count(),
            config.history.max_entries
        );

        Ok(Self {
            config,
            executor,
            queue: ControllerQueue::new(),
            pipeline,
            mesh: None,
            history,
            stroke: StrokeRecorder::new(),
            last_saved_version: 0,
            project_path: None,
            source_path: None,
            tools: ToolRegistry::with_standard_tools(),
            notices: NoticeQueue::new(),
            shutdown_requested: false,
        })
    }

    // ========================================================================
    // Controller queue
    // ========================================================================

    /// Run every continuation queued by workers. Call once per frame.
    pub fn pump(&mut self) -> usize {
        let tasks = self.queue.take_pending();
        let count = tasks.len();
        for task in tasks {
            task(self);
        }
        count
    }

    /// Block until the in-flight load (if any) has been committed or rejected
    pub fn wait_for_load(&mut self) {
        while self.pipeline.is_loading() {
            for task in self.queue.wait_pending() {
                task(self);
            }
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load a mesh or project file in the background
    pub fn open(&mut self, path: impl Into<PathBuf>) -> Result<LoadTicket, SessionError> {
        self.begin_load(LoadSource::Path(path.into()))
    }

    /// Load in-memory file contents in the background
    pub fn open_bytes(
        &mut self,
        name: impl Into<String>,
        format: SourceFormat,
        data: Vec<u8>,
    ) -> Result<LoadTicket, SessionError> {
        self.begin_load(LoadSource::Bytes {
            name: name.into(),
            format,
            data,
        })
    }

    fn begin_load(&mut self, source: LoadSource) -> Result<LoadTicket, SessionError> {
        let ticket = self.pipeline.begin_load(
            source,
            self.executor.as_ref(),
            &self.queue.handle(),
            |session: &mut Session, outcome| session.finish_load(outcome),
        )?;
        Ok(ticket)
    }

    pub fn is_loading(&self) -> bool {
        self.pipeline.is_loading()
    }

    pub fn load_progress(&self) -> ProgressSnapshot {
        self.pipeline.progress()
    }

    /// Progress record that can be polled from another thread
    pub fn load_progress_handle(&self) -> Arc<GeometryProgress> {
        self.pipeline.progress_handle()
    }

    /// Commit or reject a finished load; runs on the controlling thread
    fn finish_load(&mut self, outcome: LoadOutcome) {
        let warning = outcome.warning();
        let loaded = match outcome.result {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(
                    "Load {:?} of {} rejected, keeping current mesh: {}",
                    outcome.ticket, outcome.source, e
                );
                self.notices.push(load_failure_notice(&e));
                return;
            }
        };

        if let Some(warning) = warning {
            self.notices.push(Notice::new(
                Severity::Warning,
                "Warning: Failed to build a solid",
                warning.to_string(),
            ));
        }

        let capabilities = loaded.store.capabilities();
        self.stroke = StrokeRecorder::new();
        self.mesh = Some(loaded.store);
        self.history = CommandManager::new(&self.config.history);
        self.last_saved_version = self.history.version();
        self.project_path = if loaded.from_project {
            outcome.path.clone()
        } else {
            None
        };
        self.source_path = outcome.path;
        self.tools.on_new_geometry_loaded(capabilities);

        info!(
            "Mesh {} committed ({} triangles, solid: {})",
            outcome.source,
            self.mesh.as_ref().map_or(0, MeshStore::triangle_count),
            capabilities.solid
        );
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &TripaintConfig {
        &self.config
    }

    pub fn mesh(&self) -> Option<&MeshStore> {
        self.mesh.as_ref()
    }

    pub fn capabilities(&self) -> Option<MeshCapabilities> {
        self.mesh.as_ref().map(MeshStore::capabilities)
    }

    pub fn history(&self) -> &CommandManager {
        &self.history
    }

    pub fn version(&self) -> u64 {
        self.history.version()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Unsaved changes exist
    pub fn is_dirty(&self) -> bool {
        self.history.version() != self.last_saved_version
    }

    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolRegistry {
        &mut self.tools
    }

    fn mesh_mut(&mut self) -> Result<&mut MeshStore, SessionError> {
        self.mesh.as_mut().ok_or(SessionError::NoMesh)
    }

    // ========================================================================
    // Tool-facing API
    // ========================================================================

    /// Resolve a pick ray to the nearest triangle
    pub fn pick_triangle(&self, ray: &Ray) -> Option<TriangleId> {
        self.pick(ray).map(|hit| hit.triangle)
    }

    /// Resolve a pick ray to the nearest hit with its point and distance
    pub fn pick(&self, ray: &Ray) -> Option<PickHit> {
        self.mesh.as_ref()?.pick(ray)
    }

    /// Paint bucket. Returns whether anything changed.
    pub fn flood_fill(
        &mut self,
        seed: TriangleId,
        policy: FillPolicy,
        color: ColorIndex,
    ) -> Result<bool, SessionError> {
        self.commit_stroke()?;
        let mesh = self.mesh.as_mut().ok_or(SessionError::NoMesh)?;
        let command = plan_flood_fill(mesh, seed, policy, color)?;
        Ok(self.history.execute(mesh, Box::new(command))?)
    }

    /// Start a triangle painter drag with `color`
    pub fn begin_stroke(&mut self, color: ColorIndex) -> Result<(), SessionError> {
        self.commit_stroke()?;
        let mesh = self.mesh.as_ref().ok_or(SessionError::NoMesh)?;
        self.stroke.begin(mesh, color)?;
        Ok(())
    }

    /// Paint one triangle of the current drag
    pub fn paint_triangle(&mut self, triangle: TriangleId) -> Result<(), SessionError> {
        let mesh = self.mesh.as_mut().ok_or(SessionError::NoMesh)?;
        self.stroke.paint(mesh, triangle)?;
        Ok(())
    }

    /// Finish the drag as one undo step. Returns whether anything changed.
    pub fn end_stroke(&mut self) -> Result<bool, SessionError> {
        let command = self.stroke.finish()?;
        Ok(self.history.record_applied(Box::new(command)))
    }

    /// Abort the drag and restore the painted triangles
    pub fn cancel_stroke(&mut self) -> Result<(), SessionError> {
        let mesh = self.mesh.as_mut().ok_or(SessionError::NoMesh)?;
        self.stroke.cancel(mesh)?;
        Ok(())
    }

    /// A stroke still open when another edit arrives is committed first
    fn commit_stroke(&mut self) -> Result<(), SessionError> {
        if self.stroke.is_active() {
            debug!("Committing open stroke before the next edit");
            self.end_stroke()?;
        }
        Ok(())
    }

    /// Stamp a text decal over the triangles the text rasterizer selected
    pub fn apply_decal(
        &mut self,
        decal: TextDecal,
        covered: &[TriangleId],
    ) -> Result<bool, SessionError> {
        self.commit_stroke()?;
        let mesh = self.mesh.as_mut().ok_or(SessionError::NoMesh)?;
        let command = ApplyDecal::plan(mesh, decal, covered)?;
        Ok(self.history.execute(mesh, Box::new(command))?)
    }

    /// Change a palette entry's RGBA value (undoable)
    pub fn set_palette_color(
        &mut self,
        color: ColorIndex,
        rgba: [f32; 4],
    ) -> Result<bool, SessionError> {
        self.commit_stroke()?;
        let mesh = self.mesh.as_mut().ok_or(SessionError::NoMesh)?;
        let command = SetPaletteColor::plan(mesh, color, rgba)?;
        Ok(self.history.execute(mesh, Box::new(command))?)
    }

    /// Select the color used by the next paint operation
    pub fn set_active_color(&mut self, color: ColorIndex) -> Result<(), SessionError> {
        self.mesh_mut()?
            .palette_mut()
            .set_active(color)
            .map_err(|e| SessionError::Paint(e.into()))
    }

    pub fn undo(&mut self) -> Result<bool, SessionError> {
        self.commit_stroke()?;
        let Some(mesh) = self.mesh.as_mut() else {
            return Ok(false);
        };
        Ok(self.history.undo(mesh)?)
    }

    pub fn redo(&mut self) -> Result<bool, SessionError> {
        self.commit_stroke()?;
        let Some(mesh) = self.mesh.as_mut() else {
            return Ok(false);
        };
        Ok(self.history.redo(mesh)?)
    }

    /// Push recolored triangles into the render buffers; returns how many
    pub fn sync_render_colors(&mut self) -> usize {
        self.mesh.as_mut().map_or(0, MeshStore::sync_render_colors)
    }

    // ========================================================================
    // Saving
    // ========================================================================

    /// Save to the current project file
    pub fn save_project(&mut self) -> Result<(), SessionError> {
        let path = self.project_path.clone().ok_or(SessionError::NoProjectPath)?;
        self.save_project_as(path)
    }

    /// Save to `path` (".p3d" is appended when it has no extension) and make it the project file.
    ///
    /// On failure nothing changes except a new error notice, so the dirty
    /// state keeps reporting unsaved work.
    pub fn save_project_as(&mut self, path: impl Into<PathBuf>) -> Result<(), SessionError> {
        let mut path = path.into();
        if path.extension().is_none() {
            path.set_extension(PROJECT_EXTENSION);
        }
        self.commit_stroke()?;
        let mesh = self.mesh.as_ref().ok_or(SessionError::NoMesh)?;

        if let Err(e) = save_project(mesh, &path) {
            self.notices.push(Notice::new(
                Severity::Error,
                "Error: Failed to save project",
                format!("Your project was NOT saved. {e}"),
            ));
            return Err(e.into());
        }

        self.last_saved_version = self.history.version();
        self.project_path = Some(path);
        Ok(())
    }

    // ========================================================================
    // Notices and shutdown
    // ========================================================================

    pub fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    pub fn current_notice(&self) -> Option<&Notice> {
        self.notices.current()
    }

    /// Dismiss the current notice; a fatal one requests shutdown
    pub fn dismiss_notice(&mut self) -> Option<Notice> {
        let notice = self.notices.dismiss()?;
        if notice.severity == Severity::Fatal {
            info!("Fatal notice dismissed, shutting down");
            self.shutdown_requested = true;
        }
        Some(notice)
    }

    /// Report an unrecoverable condition (for example a missing asset)
    pub fn report_fatal(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.notices.push(Notice::new(Severity::Fatal, title, message));
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }
}

fn load_failure_notice(error: &LoadError) -> Notice {
    let title = match error {
        LoadError::CorruptProject(_) => "Error: Project file corrupted",
        LoadError::Format(_) | LoadError::EmptyMesh | LoadError::Malformed(_) => {
            "Error: Invalid file"
        }
        LoadError::Consistency(_) => "Error: Failed to generate buffers",
        LoadError::Degenerate(_) => "Error: Failed to build the spatial index",
        _ => "Error: Loading failed",
    };
    Notice::new(
        Severity::Error,
        title,
        format!("{error}. The file could not be loaded."),
    )
}
