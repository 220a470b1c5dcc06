//! The contract every media engine implementation honors.

use std::sync::Arc;

use async_trait::async_trait;
use unmark_common::error::UnmarkResult;

/// Receives progress fractions in `[0.0, 1.0]`.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Receives engine log lines.
pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Callbacks an engine reports through while executing.
#[derive(Clone, Default)]
pub struct EngineEvents {
    pub on_progress: Option<ProgressCallback>,
    pub on_log: Option<LogCallback>,
}

impl EngineEvents {
    pub fn with_progress(mut self, callback: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn with_log(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_log = Some(Arc::new(callback));
        self
    }

    pub fn progress(&self, fraction: f64) {
        if let Some(cb) = &self.on_progress {
            cb(fraction.clamp(0.0, 1.0));
        }
    }

    pub fn log(&self, line: &str) {
        if let Some(cb) = &self.on_log {
            cb(line);
        }
    }
}

impl std::fmt::Debug for EngineEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineEvents")
            .field("on_progress", &self.on_progress.is_some())
            .field("on_log", &self.on_log.is_some())
            .finish()
    }
}

/// An external processing engine with a private file namespace.
///
/// Implementations are driven by [`EngineSession`](crate::EngineSession),
/// which enforces ordering (load before anything else, one execution at a
/// time).
#[async_trait]
pub trait MediaEngine: Send {
    /// Initialize the engine.
    async fn load(&mut self) -> UnmarkResult<()>;

    /// Place bytes in the engine namespace under `name`.
    async fn write_file(&mut self, name: &str, bytes: &[u8]) -> UnmarkResult<()>;

    /// Run one invocation.
    async fn exec(&mut self, args: &[String], events: &EngineEvents) -> UnmarkResult<()>;

    /// Read bytes back out of the engine namespace.
    async fn read_file(&mut self, name: &str) -> UnmarkResult<Vec<u8>>;

    /// Release the namespace and any resources.
    async fn dispose(&mut self) -> UnmarkResult<()> {
        Ok(())
    }

    /// Engine name for logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_progress_is_clamped_before_delivery() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let events = EngineEvents::default().with_progress(move |p| sink.lock().unwrap().push(p));

        events.progress(-0.5);
        events.progress(0.5);
        events.progress(3.0);

        assert_eq!(*seen.lock().unwrap(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_missing_callbacks_are_noops() {
        let events = EngineEvents::default();
        events.progress(0.5);
        events.log("ignored");
        assert_eq!(
            format!("{events:?}"),
            "EngineEvents { on_progress: false, on_log: false }"
        );
    }
}
