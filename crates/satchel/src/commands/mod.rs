pub mod bag;
pub mod profile;
pub mod validate;

use satchel::{BagObserver, TaskEvent, ValidationError};
use tracing::info;

/// Boxed error type shared by command entry points.
pub type CommandError = Box<dyn std::error::Error + Send + Sync>;

/// Observer printing validation findings to stderr as they occur.
pub struct CliObserver;

impl BagObserver for CliObserver {
    fn on_task(&self, event: &TaskEvent) {
        info!(kind = %event.kind, path = %event.rel_path, percent = ?event.percent, "{}", event.message);
    }

    fn on_error(&self, err: &ValidationError) {
        eprintln!("  {err}");
    }
}
