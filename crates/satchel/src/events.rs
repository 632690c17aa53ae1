//! Progress and error signalling for validation and bagging runs.

use std::fmt;

use tracing::{error, info};

use crate::errors::ValidationError;

/// What a task event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// A run has started.
    Start,
    /// A file entered the run's file map.
    Add,
    /// A file's digests were computed.
    Checksum,
    /// Bytes were read from the container.
    Read,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskKind::Start => "start",
            TaskKind::Add => "add",
            TaskKind::Checksum => "checksum",
            TaskKind::Read => "read",
        })
    }
}

/// One progress event.
#[derive(Debug, Clone)]
pub struct TaskEvent {
    pub kind: TaskKind,
    pub rel_path: String,
    pub message: String,
    /// Completion estimate in percent, when known.
    pub percent: Option<f32>,
}

impl TaskEvent {
    pub fn new(kind: TaskKind, rel_path: impl Into<String>, message: impl Into<String>) -> Self {
        TaskEvent {
            kind,
            rel_path: rel_path.into(),
            message: message.into(),
            percent: None,
        }
    }

    pub fn with_percent(mut self, percent: f32) -> Self {
        self.percent = Some(percent);
        self
    }
}

/// Observer for engine progress. All methods default to no-ops, so
/// implementations only override what they consume.
pub trait BagObserver {
    fn on_task(&self, _event: &TaskEvent) {}
    fn on_error(&self, _error: &ValidationError) {}
    fn on_end(&self, _errors: &[ValidationError]) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl BagObserver for NoopObserver {}

/// Observer forwarding events to the tracing subscriber.
pub struct LogObserver;

impl BagObserver for LogObserver {
    fn on_task(&self, event: &TaskEvent) {
        info!(kind = %event.kind, path = %event.rel_path, percent = ?event.percent, "{}", event.message);
    }

    fn on_error(&self, err: &ValidationError) {
        error!(kind = ?err.kind(), "{err}");
    }

    fn on_end(&self, errors: &[ValidationError]) {
        info!(errors = errors.len(), "Run complete");
    }
}
