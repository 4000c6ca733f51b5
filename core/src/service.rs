//! `CatService`: the lifecycle engine wired to a backend, a clock and event sinks.
//!
//! ```text
//! caller ──> CatService::check_in(actor)
//!              │ now = clock.now()
//!              ▼
//!            backend.commit(actor, |current| lifecycle::plan(CheckIn, actor, current, now))
//!              │ (read ─ plan ─ settle ─ write, atomically)
//!              ▼
//!            sinks.emit(CheckedIn { .. })   // only after the commit landed
//! ```
//!
//! The service keeps no cat state between calls; every call goes through the backend.

use std::sync::Arc;

use ninelives_types::{ActorId, CatRecord, CatView, Timestamp};
use tracing::{debug, info, warn};

use crate::backend::{CatBackend, CatError};
use crate::clock::Clock;
use crate::events::EventSink;
use crate::lifecycle::{self, Action};

pub struct CatService<B> {
    pub(crate) backend: B,
    pub(crate) clock: Arc<dyn Clock>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl<B: CatBackend> CatService<B> {
    pub fn new(backend: B, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            sinks: Vec::new(),
        }
    }

    /// Register a sink that receives every committed event.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn create(&self, actor: &ActorId) -> Result<CatView, CatError> {
        self.create_at(actor, self.now())
    }

    pub fn create_at(&self, actor: &ActorId, now: Timestamp) -> Result<CatView, CatError> {
        self.apply(Action::Create, actor, now)
    }

    pub fn check_in(&self, actor: &ActorId) -> Result<CatView, CatError> {
        self.check_in_at(actor, self.now())
    }

    pub fn check_in_at(&self, actor: &ActorId, now: Timestamp) -> Result<CatView, CatError> {
        self.apply(Action::CheckIn, actor, now)
    }

    pub fn lose_life(&self, actor: &ActorId) -> Result<CatView, CatError> {
        self.lose_life_at(actor, self.now())
    }

    pub fn lose_life_at(&self, actor: &ActorId, now: Timestamp) -> Result<CatView, CatError> {
        self.apply(Action::LoseLife, actor, now)
    }

    /// Restore one life, paying the restoration price to the backend's treasury.
    pub fn restore_life(&self, actor: &ActorId) -> Result<CatView, CatError> {
        self.restore_life_at(actor, self.now())
    }

    pub fn restore_life_at(&self, actor: &ActorId, now: Timestamp) -> Result<CatView, CatError> {
        self.apply(Action::RestoreLife, actor, now)
    }

    /// Run any action at an explicit time.
    pub fn apply(
        &self,
        action: Action,
        actor: &ActorId,
        now: Timestamp,
    ) -> Result<CatView, CatError> {
        let mut plan = |current: Option<&CatRecord>| lifecycle::plan(action, actor, current, now);
        match self.backend.commit(actor, &mut plan) {
            Ok(transition) => {
                let view = transition.record.view();
                info!(
                    backend = self.backend.name(),
                    action = action.as_str(),
                    actor = %actor,
                    lives = view.lives,
                    streak = view.streak,
                    stage = view.stage,
                    "Cat updated"
                );
                for sink in &self.sinks {
                    sink.emit(&transition.event);
                }
                Ok(view)
            }
            Err(CatError::Rejected(err)) => {
                debug!(
                    backend = self.backend.name(),
                    action = action.as_str(),
                    actor = %actor,
                    kind = err.kind(),
                    "Action rejected: {err}"
                );
                Err(CatError::Rejected(err))
            }
            Err(CatError::Backend(err)) => {
                warn!(
                    backend = self.backend.name(),
                    action = action.as_str(),
                    actor = %actor,
                    "Backend failure: {err}"
                );
                Err(CatError::Backend(err))
            }
        }
    }
}
