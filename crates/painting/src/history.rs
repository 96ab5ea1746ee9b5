//! Linear undo/redo history with a version counter.
//!
//! The history is a list of applied commands and a cursor pointing just past
//! the last applied one. Every successful execute, undo or redo increments
//! the version; callers compare it against a saved checkpoint to detect
//! unsaved changes. All mutation goes through the owning thread.

use std::collections::VecDeque;

use tracing::{debug, info};
use tripaint_config::HistoryConfig;
use tripaint_mesh::MeshStore;

use crate::commands::Command;
use crate::error::PaintError;

/// Owns the undo/redo history of one mesh
#[derive(Debug)]
pub struct CommandManager {
    history: VecDeque<Box<dyn Command>>,
    /// Number of applied commands; commands at and after it form the redo tail
    cursor: usize,
    version: u64,
    max_entries: usize,
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new(&HistoryConfig::default())
    }
}

impl CommandManager {
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            history: VecDeque::new(),
            cursor: 0,
            version: 0,
            max_entries: config.max_entries.max(1),
        }
    }

    /// Current version; starts at 0 for a fresh history
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.history.len()
    }

    /// Number of commands that can be undone
    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    /// Number of commands that can be redone
    pub fn redo_count(&self) -> usize {
        self.history.len() - self.cursor
    }

    /// Label of the command the next undo would revert
    pub fn undo_description(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.history.get(i))
            .map(|c| c.description())
    }

    /// Label of the command the next redo would apply
    pub fn redo_description(&self) -> Option<&str> {
        self.history.get(self.cursor).map(|c| c.description())
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Apply a command and record it.
    ///
    /// Returns `Ok(false)` without touching history or version when the
    /// command would change nothing. A failed apply leaves history untouched.
    pub fn execute(
        &mut self,
        mesh: &mut MeshStore,
        command: Box<dyn Command>,
    ) -> Result<bool, PaintError> {
        if command.is_empty() {
            debug!("execute: '{}' is empty, not recorded", command.description());
            return Ok(false);
        }
        command.apply(mesh)?;
        self.push(command);
        Ok(true)
    }

    /// Record a command whose effect is already on the mesh (incremental strokes).
    ///
    /// Same bookkeeping as [`CommandManager::execute`] minus the apply.
    pub fn record_applied(&mut self, command: Box<dyn Command>) -> bool {
        if command.is_empty() {
            debug!(
                "record_applied: '{}' is empty, not recorded",
                command.description()
            );
            return false;
        }
        self.push(command);
        true
    }

    /// Revert the command before the cursor.
    ///
    /// Returns `Ok(false)` at the start of history; the version is unchanged.
    pub fn undo(&mut self, mesh: &mut MeshStore) -> Result<bool, PaintError> {
        let Some(index) = self.cursor.checked_sub(1) else {
            debug!("Undo: no entries available");
            return Ok(false);
        };
        let command = &self.history[index];
        command.revert(mesh)?;
        self.cursor = index;
        self.version += 1;
        info!(
            "Undo '{}' (version {}, {} left)",
            command.description(),
            self.version,
            self.cursor
        );
        Ok(true)
    }

    /// Re-apply the command at the cursor.
    ///
    /// Returns `Ok(false)` at the end of history; the version is unchanged.
    pub fn redo(&mut self, mesh: &mut MeshStore) -> Result<bool, PaintError> {
        let Some(command) = self.history.get(self.cursor) else {
            debug!("Redo: no entries available");
            return Ok(false);
        };
        command.apply(mesh)?;
        self.cursor += 1;
        self.version += 1;
        info!(
            "Redo '{}' (version {}, {} left)",
            command.description(),
            self.version,
            self.history.len() - self.cursor
        );
        Ok(true)
    }

    fn push(&mut self, command: Box<dyn Command>) {
        let dropped_tail = self.history.len() - self.cursor;
        self.history.truncate(self.cursor);
        info!(
            "Execute '{}' (version {}, dropped {} redo entries)",
            command.description(),
            self.version + 1,
            dropped_tail
        );
        self.history.push_back(command);
        self.cursor += 1;

        while self.history.len() > self.max_entries {
            self.history.pop_front();
            self.cursor -= 1;
        }
        self.version += 1;
    }
}
