//! Read-only projections over a backend.
//!
//! Queries never mutate, and the check-in countdown uses the same
//! [`CheckInWindow`] the engine gates on, so `time_until_next_check_in == 0`
//! exactly when a check-in attempted at the same instant would be accepted.

use ninelives_types::{ActorId, CatView, LifecycleError, Timestamp};

use crate::backend::{BackendError, CatBackend, CatError};
use crate::lifecycle::CheckInWindow;
use crate::service::CatService;

/// Everything a front end needs to render one actor's cat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatStatus {
    pub cat: CatView,
    pub secs_until_check_in: u64,
    pub can_check_in: bool,
}

impl<B: CatBackend> CatService<B> {
    pub fn has_cat(&self, actor: &ActorId) -> Result<bool, BackendError> {
        Ok(self.backend.load(actor)?.is_some())
    }

    pub fn get_cat(&self, actor: &ActorId) -> Result<CatView, CatError> {
        self.backend
            .load(actor)?
            .map(|record| record.view())
            .ok_or(CatError::Rejected(LifecycleError::NotFound))
    }

    pub fn time_until_next_check_in(&self, actor: &ActorId) -> Result<u64, BackendError> {
        self.time_until_next_check_in_at(actor, self.clock.now())
    }

    /// Seconds until `actor` may check in; zero when the window is open or there is no cat.
    pub fn time_until_next_check_in_at(
        &self,
        actor: &ActorId,
        now: Timestamp,
    ) -> Result<u64, BackendError> {
        Ok(self.backend.load(actor)?.map_or(0, |record| {
            CheckInWindow::at(record.last_check_in(), now).remaining_secs()
        }))
    }

    pub fn can_check_in(&self, actor: &ActorId) -> Result<bool, BackendError> {
        self.can_check_in_at(actor, self.clock.now())
    }

    /// True when a cat exists and its check-in window is open.
    pub fn can_check_in_at(&self, actor: &ActorId, now: Timestamp) -> Result<bool, BackendError> {
        Ok(self.backend.load(actor)?.is_some_and(|record| {
            CheckInWindow::at(record.last_check_in(), now).remaining_secs() == 0
        }))
    }

    pub fn status(&self, actor: &ActorId) -> Result<Option<CatStatus>, BackendError> {
        self.status_at(actor, self.clock.now())
    }

    pub fn status_at(
        &self,
        actor: &ActorId,
        now: Timestamp,
    ) -> Result<Option<CatStatus>, BackendError> {
        Ok(self.backend.load(actor)?.map(|record| {
            let secs_until_check_in =
                CheckInWindow::at(record.last_check_in(), now).remaining_secs();
            CatStatus {
                cat: record.view(),
                secs_until_check_in,
                can_check_in: secs_until_check_in == 0,
            }
        }))
    }
}
