//! Shared configuration for Tripaint
//!
//! This crate provides the single source of truth for tunables shared by the
//! mesh, loading, painting and session crates: worker pool sizing, loader
//! tolerances, undo history depth and the default color palette.

use serde::{Deserialize, Serialize};

/// Minimum number of background workers.
///
/// Load tasks enqueue follow-up work from inside a worker, so a single-worker
/// pool could starve itself.
pub const MIN_WORKERS: usize = 2;

/// Environment variable overriding the worker count
pub const WORKERS_ENV: &str = "TRIPAINT_WORKERS";

/// Maximum palette size (one color per number-row hotkey)
pub const MAX_PALETTE_COLORS: usize = 10;

/// Default tolerance below which a triangle's area counts as degenerate
pub const DEFAULT_DEGENERATE_AREA_TOLERANCE: f32 = 1e-12;

/// Default welding tolerance for duplicated vertices (world units)
pub const DEFAULT_WELD_TOLERANCE: f32 = 1e-6;

/// Default number of undo steps kept in history
pub const DEFAULT_MAX_HISTORY: usize = 256;

/// Background worker pool configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Explicit worker count; `None` derives it from hardware concurrency
    pub worker_count: Option<usize>,
}

impl WorkerConfig {
    /// Build from the `TRIPAINT_WORKERS` environment variable, if set and valid
    pub fn from_env() -> Self {
        let worker_count = std::env::var(WORKERS_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok());
        Self { worker_count }
    }

    /// Resolve the number of workers to spawn.
    ///
    /// Without an explicit count this is one less than the hardware
    /// concurrency. Either way it is never fewer than [`MIN_WORKERS`].
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.max(MIN_WORKERS),
            None => {
                let hardware = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(0);
                hardware.max(MIN_WORKERS + 1) - 1
            }
        }
    }
}

/// Tolerances applied while ingesting a mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Triangles with area at or below this value fail the spatial-index stage
    pub degenerate_area_tolerance: f32,
    /// Vertices closer than this are merged when welding
    pub weld_tolerance: f32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            degenerate_area_tolerance: DEFAULT_DEGENERATE_AREA_TOLERANCE,
            weld_tolerance: DEFAULT_WELD_TOLERANCE,
        }
    }
}

/// Undo history configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum applied commands retained; oldest are dropped first
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_HISTORY,
        }
    }
}

/// Default palette for freshly imported meshes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteConfig {
    /// RGBA colors, index 0 is the base color of every imported triangle
    pub colors: Vec<[f32; 4]>,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            colors: vec![
                [0.85, 0.85, 0.85, 1.0],
                [0.92, 0.34, 0.34, 1.0],
                [0.18, 0.60, 0.86, 1.0],
                [0.15, 0.68, 0.38, 1.0],
            ],
        }
    }
}

impl PaletteConfig {
    /// Palette clamped to the supported size, falling back to the default when empty
    pub fn sanitized(&self) -> Vec<[f32; 4]> {
        if self.colors.is_empty() {
            return Self::default().colors;
        }
        self.colors
            .iter()
            .copied()
            .take(MAX_PALETTE_COLORS)
            .collect()
    }
}

/// Aggregated configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripaintConfig {
    pub workers: WorkerConfig,
    pub loader: LoaderConfig,
    pub history: HistoryConfig,
    pub palette: PaletteConfig,
}

impl TripaintConfig {
    /// Parse a JSON settings document; missing sections take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Default configuration with the environment worker override applied
    pub fn from_env() -> Self {
        Self {
            workers: WorkerConfig::from_env(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TripaintConfig::default();
        assert_eq!(config.history.max_entries, DEFAULT_MAX_HISTORY);
        assert_eq!(
            config.loader.degenerate_area_tolerance,
            DEFAULT_DEGENERATE_AREA_TOLERANCE
        );
        assert!(config.workers.worker_count.is_none());
    }

    #[test]
    fn test_resolved_worker_count_never_below_minimum() {
        let config = WorkerConfig::default();
        assert!(config.resolved_worker_count() >= MIN_WORKERS);
    }

    #[test]
    fn test_explicit_worker_count() {
        let config = WorkerConfig {
            worker_count: Some(6),
        };
        assert_eq!(config.resolved_worker_count(), 6);
    }

    #[test]
    fn test_explicit_worker_count_clamped_to_minimum() {
        for n in [0, 1] {
            let config = WorkerConfig {
                worker_count: Some(n),
            };
            assert_eq!(config.resolved_worker_count(), MIN_WORKERS);
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TripaintConfig::from_json_str(r#"{"history": {"max_entries": 8}}"#).unwrap();
        assert_eq!(config.history.max_entries, 8);
        assert_eq!(config.loader, LoaderConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = TripaintConfig::default();
        config.workers.worker_count = Some(3);
        let json = config.to_json_string().unwrap();
        assert_eq!(TripaintConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_palette_sanitized() {
        let palette = PaletteConfig {
            colors: vec![[1.0; 4]; 14],
        };
        assert_eq!(palette.sanitized().len(), MAX_PALETTE_COLORS);
        let empty = PaletteConfig { colors: vec![] };
        assert_eq!(empty.sanitized(), PaletteConfig::default().colors);
    }
}
