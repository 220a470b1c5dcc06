//! Lifecycle wrapper around a [`MediaEngine`].
//!
//! ```text
//! Uninitialized ──load──▶ Loading ──ok──▶ Ready ◀──▶ Executing
//!       ▲                    │              │
//!       └──────── err ───────┘           dispose ──▶ Disposed
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;
use unmark_common::error::{UnmarkError, UnmarkResult};
use unmark_media_model::{AssetRole, MediaAsset, OUTPUT_CONTENT_TYPE};

use crate::engine::{EngineEvents, MediaEngine};
use crate::plan::PipelinePlan;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Loading,
    Ready,
    Executing,
    Disposed,
}

/// A single shared engine instance.
///
/// All methods take `&self` so the session can live behind an `Arc` and be
/// driven from worker tasks while the UI thread polls [`state`](Self::state).
pub struct EngineSession<E: MediaEngine> {
    engine: tokio::sync::Mutex<E>,
    state: Mutex<SessionState>,
    loaded: OnceCell<()>,
    produced: Mutex<Option<String>>,
    events: EngineEvents,
}

impl<E: MediaEngine> EngineSession<E> {
    pub fn new(engine: E, events: EngineEvents) -> Self {
        Self {
            engine: tokio::sync::Mutex::new(engine),
            state: Mutex::new(SessionState::Uninitialized),
            loaded: OnceCell::new(),
            produced: Mutex::new(None),
            events,
        }
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Initialize the engine.
    ///
    /// Concurrent callers wait on the first initialization instead of
    /// starting another. A failed load leaves the session `Uninitialized`.
    pub async fn load(&self) -> UnmarkResult<()> {
        if self.state() == SessionState::Disposed {
            return Err(UnmarkError::not_ready("engine session was disposed"));
        }

        self.loaded
            .get_or_try_init(|| async move {
                self.set_state(SessionState::Loading);
                let mut engine = self.engine.lock().await;
                tracing::info!(engine = engine.name(), "Loading engine");
                match engine.load().await {
                    Ok(()) => {
                        self.set_state(SessionState::Ready);
                        Ok(())
                    }
                    Err(err) => {
                        self.set_state(SessionState::Uninitialized);
                        tracing::error!(error = %err, "Engine failed to load");
                        Err(match err {
                            UnmarkError::EngineLoad { .. } => err,
                            other => UnmarkError::engine_load(other.to_string()),
                        })
                    }
                }
            })
            .await
            .map(|_| ())
    }

    /// Write an asset into the engine namespace under `name`.
    pub async fn stage(&self, name: &str, asset: &MediaAsset) -> UnmarkResult<()> {
        self.require_ready("stage")?;
        tracing::debug!(name, role = %asset.role(), bytes = asset.len(), "Staging asset");
        self.engine
            .lock()
            .await
            .write_file(name, asset.bytes())
            .await
    }

    /// Run a plan against previously staged assets.
    ///
    /// The session returns to `Ready` whether the run succeeds or fails.
    pub async fn execute(&self, plan: PipelinePlan) -> UnmarkResult<()> {
        {
            let mut state = lock(&self.state);
            match *state {
                SessionState::Ready => *state = SessionState::Executing,
                SessionState::Executing => {
                    return Err(UnmarkError::busy("a plan is already executing"))
                }
                other => {
                    return Err(UnmarkError::not_ready(format!(
                        "cannot execute while {other:?}"
                    )))
                }
            }
        }
        let _executing = ExecutingGuard { session: self };

        *lock(&self.produced) = None;
        let args = plan.to_args();
        tracing::info!(
            kind = plan.kind().as_str(),
            output = plan.output_name(),
            args_len = args.len(),
            "Executing plan"
        );

        let result = self.engine.lock().await.exec(&args, &self.events).await;
        match result {
            Ok(()) => {
                *lock(&self.produced) = Some(plan.output_name().to_string());
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "Plan execution failed");
                Err(match err {
                    UnmarkError::Execution { .. } => err,
                    other => UnmarkError::execution(other.to_string()),
                })
            }
        }
    }

    /// Bytes produced by the most recent `execute`.
    pub async fn retrieve(&self, name: &str) -> UnmarkResult<MediaAsset> {
        self.require_ready("retrieve")?;
        if lock(&self.produced).as_deref() != Some(name) {
            return Err(UnmarkError::UnknownArtifact {
                name: name.to_string(),
            });
        }

        let bytes = self.engine.lock().await.read_file(name).await?;
        tracing::debug!(name, bytes = bytes.len(), "Retrieved output");
        Ok(MediaAsset::new(
            AssetRole::VideoOutput,
            OUTPUT_CONTENT_TYPE,
            bytes,
        ))
    }

    /// Release the engine. The session cannot be used afterwards.
    pub async fn dispose(&self) -> UnmarkResult<()> {
        {
            let mut state = lock(&self.state);
            if *state == SessionState::Executing {
                return Err(UnmarkError::busy("cannot dispose while executing"));
            }
            if *state == SessionState::Disposed {
                return Ok(());
            }
            *state = SessionState::Disposed;
        }
        *lock(&self.produced) = None;
        self.engine.lock().await.dispose().await
    }

    fn require_ready(&self, operation: &str) -> UnmarkResult<()> {
        match self.state() {
            SessionState::Ready => Ok(()),
            SessionState::Executing => Err(UnmarkError::busy(format!(
                "cannot {operation} while a plan is executing"
            ))),
            other => Err(UnmarkError::not_ready(format!(
                "cannot {operation} while {other:?}"
            ))),
        }
    }

    fn set_state(&self, next: SessionState) {
        let mut state = lock(&self.state);
        tracing::trace!(from = ?*state, to = ?next, "Session state change");
        *state = next;
    }
}

struct ExecutingGuard<'a, E: MediaEngine> {
    session: &'a EngineSession<E>,
}

impl<E: MediaEngine> Drop for ExecutingGuard<'_, E> {
    fn drop(&mut self) {
        let mut state = lock(&self.session.state);
        if *state == SessionState::Executing {
            *state = SessionState::Ready;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
