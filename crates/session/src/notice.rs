//! User-facing notices.
//!
//! The highest-severity notice is shown first; notices of equal severity
//! come out in the order they were raised. Dismissing a fatal notice is the
//! signal for orderly shutdown.

use std::collections::VecDeque;

use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Information,
    /// Dismissible; work continues
    Warning,
    /// Blocking until dismissed
    Error,
    /// Dismissing shuts the application down
    Fatal,
}

impl Severity {
    const COUNT: usize = 4;

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(severity: Severity, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Whether the UI must wait for this notice before accepting input
    pub fn is_blocking(&self) -> bool {
        self.severity >= Severity::Error
    }
}

/// Pending notices ordered by severity
#[derive(Debug, Default)]
pub struct NoticeQueue {
    levels: [VecDeque<Notice>; Severity::COUNT],
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notice: Notice) {
        match notice.severity {
            Severity::Information => info!("Notice: {}", notice.title),
            Severity::Warning => warn!("Notice: {}: {}", notice.title, notice.message),
            Severity::Error | Severity::Fatal => {
                error!("Notice: {}: {}", notice.title, notice.message)
            }
        }
        self.levels[notice.severity.index()].push_back(notice);
    }

    /// Notice to show now
    pub fn current(&self) -> Option<&Notice> {
        self.levels.iter().rev().find_map(|level| level.front())
    }

    /// Remove the current notice
    pub fn dismiss(&mut self) -> Option<Notice> {
        self.levels
            .iter_mut()
            .rev()
            .find(|level| !level.is_empty())
            .and_then(|level| level.pop_front())
    }

    pub fn len(&self) -> usize {
        self.levels.iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(VecDeque::is_empty)
    }

    /// Whether any pending notice blocks input
    pub fn is_blocking(&self) -> bool {
        self.current().is_some_and(Notice::is_blocking)
    }
}
