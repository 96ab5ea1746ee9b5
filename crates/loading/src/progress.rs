//! Per-stage load progress shared between a worker and the controller.
//!
//! Each stage owns one atomic so a poller never sees a torn value. Values
//! only grow during a load; a stage left below 1.0 after the load finished
//! is the stage that failed.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Loading stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Decode the source and build render buffers
    ParseRender,
    /// Build CPU-side query structures (adjacency) and check consistency
    Compute,
    /// Build the spatial index; rejects degenerate geometry
    Spatial,
    /// Build the manifold solid; failure only degrades capabilities
    Manifold,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::ParseRender,
        Stage::Compute,
        Stage::Spatial,
        Stage::Manifold,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::ParseRender => "parse and render buffers",
            Stage::Compute => "compute buffers",
            Stage::Spatial => "spatial index",
            Stage::Manifold => "manifold solid",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Live progress record written by the loading worker
#[derive(Debug, Default)]
pub struct GeometryProgress {
    /// `f32` bit patterns in [0.0, 1.0]
    stages: [AtomicU32; 4],
}

impl GeometryProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every stage; called before a new load is dispatched
    pub fn reset(&self) {
        for stage in &self.stages {
            stage.store(0, Ordering::Release);
        }
    }

    /// Raise a stage's fraction; lower values are ignored
    pub fn set(&self, stage: Stage, fraction: f32) {
        let clamped = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        // Non-negative floats order the same as their bit patterns
        self.stages[stage.index()].fetch_max(clamped.to_bits(), Ordering::AcqRel);
    }

    pub fn complete(&self, stage: Stage) {
        self.set(stage, 1.0);
    }

    pub fn get(&self, stage: Stage) -> f32 {
        f32::from_bits(self.stages[stage.index()].load(Ordering::Acquire))
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            stages: Stage::ALL.map(|stage| self.get(stage)),
        }
    }
}

/// How a finished load went, judged from its final progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadVerdict {
    Complete,
    /// Only the manifold stage failed; the mesh is usable with reduced capabilities
    Degraded,
    /// A hard stage failed; no mesh swap happens
    Failed(Stage),
}

/// Point-in-time copy of [`GeometryProgress`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressSnapshot {
    stages: [f32; 4],
}

impl ProgressSnapshot {
    pub fn get(&self, stage: Stage) -> f32 {
        self.stages[stage.index()]
    }

    /// Mean over all stages, for a single progress bar
    pub fn overall(&self) -> f32 {
        self.stages.iter().sum::<f32>() / self.stages.len() as f32
    }

    pub fn first_incomplete(&self) -> Option<Stage> {
        Stage::ALL.into_iter().find(|&stage| self.get(stage) < 1.0)
    }

    /// Classify a finished load. Meaningless while the load is still running.
    pub fn verdict(&self) -> LoadVerdict {
        match self.first_incomplete() {
            None => LoadVerdict::Complete,
            Some(Stage::Manifold) => LoadVerdict::Degraded,
            Some(stage) => LoadVerdict::Failed(stage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic() {
        let progress = GeometryProgress::new();
        progress.set(Stage::Compute, 0.6);
        progress.set(Stage::Compute, 0.2);
        assert_eq!(progress.get(Stage::Compute), 0.6);
        progress.set(Stage::Compute, 7.0);
        assert_eq!(progress.get(Stage::Compute), 1.0);
        progress.set(Stage::Spatial, f32::NAN);
        assert_eq!(progress.get(Stage::Spatial), 0.0);
    }

    #[test]
    fn test_reset_clears_all_stages() {
        let progress = GeometryProgress::new();
        for stage in Stage::ALL {
            progress.complete(stage);
        }
        progress.reset();
        assert_eq!(progress.snapshot(), ProgressSnapshot::default());
    }

    #[test]
    fn test_verdict() {
        let progress = GeometryProgress::new();
        progress.complete(Stage::ParseRender);
        assert_eq!(progress.snapshot().verdict(), LoadVerdict::Failed(Stage::Compute));

        progress.complete(Stage::Compute);
        progress.complete(Stage::Spatial);
        progress.set(Stage::Manifold, 0.5);
        assert_eq!(progress.snapshot().verdict(), LoadVerdict::Degraded);

        progress.complete(Stage::Manifold);
        let snapshot = progress.snapshot();
        assert_eq!(snapshot.verdict(), LoadVerdict::Complete);
        assert_eq!(snapshot.overall(), 1.0);
    }
}
