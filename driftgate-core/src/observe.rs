//! Observability hook injected into the validation engine and orchestrator.
//!
//! Control flow never depends on what an observer does with an event.

use std::sync::Arc;

/// Sink for human-readable pipeline events.
pub trait PipelineObserver: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards events to `tracing` under the `driftgate` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn info(&self, message: &str) {
        tracing::info!(target: "driftgate", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "driftgate", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "driftgate", "{message}");
    }
}

/// The observer used when a caller does not supply one.
pub fn default_observer() -> Arc<dyn PipelineObserver> {
    Arc::new(TracingObserver)
}
