//! Lifecycle engine.
//!
//! Pure decision logic: given the current record (if any), an action and the time,
//! compute the next record and the event it produces, or reject the action. Nothing
//! here touches storage; backends call [`plan`] from inside their atomic commit step
//! and persist whatever it returns.
//!
//! # Check-in window
//!
//! ```text
//!  last_check_in        +DAY                 +2*DAY
//!  |--------------------|--------------------|---------------->
//!   TooSoon              extends streak       restarts at 1
//! ```

use ninelives_types::{
    ActorId, CatEvent, CatRecord, DAY_SECS, LifecycleError, RESTORE_PRICE, Streak, Timestamp,
    TokenAmount,
};

/// A mutating request against one actor's cat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    CheckIn,
    LoseLife,
    RestoreLife,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::CheckIn => "check_in",
            Action::LoseLife => "lose_life",
            Action::RestoreLife => "restore_life",
        }
    }
}

/// The outcome of a successful plan: what to write, what to charge, what to announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub record: CatRecord,
    /// Amount the actor must pay the treasury in the same atomic step.
    pub charge: Option<TokenAmount>,
    pub event: CatEvent,
}

/// Where `now` falls relative to the last check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInWindow {
    /// Less than a day has passed.
    Closed { remaining_secs: u64 },
    /// At least one day but less than two: the streak continues.
    Continues,
    /// Two days or more: the streak restarts.
    Lapsed,
}

impl CheckInWindow {
    #[must_use]
    pub fn at(last_check_in: Timestamp, now: Timestamp) -> Self {
        let elapsed = now.saturating_elapsed_since(last_check_in);
        if elapsed < DAY_SECS {
            CheckInWindow::Closed {
                remaining_secs: DAY_SECS - elapsed,
            }
        } else if elapsed < 2 * DAY_SECS {
            CheckInWindow::Continues
        } else {
            CheckInWindow::Lapsed
        }
    }

    /// Seconds until a check-in would be accepted; zero once the window is open.
    #[must_use]
    pub const fn remaining_secs(self) -> u64 {
        match self {
            CheckInWindow::Closed { remaining_secs } => remaining_secs,
            CheckInWindow::Continues | CheckInWindow::Lapsed => 0,
        }
    }
}

/// Decide the outcome of `action` for `owner`.
pub fn plan(
    action: Action,
    owner: &ActorId,
    current: Option<&CatRecord>,
    now: Timestamp,
) -> Result<Transition, LifecycleError> {
    match action {
        Action::Create => create(owner, current, now),
        Action::CheckIn => check_in(owner, current, now),
        Action::LoseLife => lose_life(owner, current),
        Action::RestoreLife => restore_life(owner, current),
    }
}

fn create(
    owner: &ActorId,
    current: Option<&CatRecord>,
    now: Timestamp,
) -> Result<Transition, LifecycleError> {
    if current.is_some() {
        return Err(LifecycleError::AlreadyExists);
    }
    Ok(Transition {
        record: CatRecord::hatch(now),
        charge: None,
        event: CatEvent::CatCreated {
            owner: owner.clone(),
        },
    })
}

fn check_in(
    owner: &ActorId,
    current: Option<&CatRecord>,
    now: Timestamp,
) -> Result<Transition, LifecycleError> {
    let cat = current.ok_or(LifecycleError::NotFound)?;
    let streak = match CheckInWindow::at(cat.last_check_in(), now) {
        CheckInWindow::Closed { remaining_secs } => {
            return Err(LifecycleError::TooSoon { remaining_secs });
        }
        CheckInWindow::Continues => cat.streak().increment(),
        CheckInWindow::Lapsed => Streak::RESTART,
    };
    let record = cat.with_check_in(streak, now);
    Ok(Transition {
        record,
        charge: None,
        event: CatEvent::CheckedIn {
            owner: owner.clone(),
            streak: record.streak(),
            stage: record.stage(),
        },
    })
}

fn lose_life(owner: &ActorId, current: Option<&CatRecord>) -> Result<Transition, LifecycleError> {
    let cat = current.ok_or(LifecycleError::NotFound)?;
    let lives = cat.lives().lose_one().ok_or(LifecycleError::NoLivesToLose)?;
    Ok(Transition {
        record: cat.with_lives(lives),
        charge: None,
        event: CatEvent::LifeLost {
            owner: owner.clone(),
            lives,
        },
    })
}

fn restore_life(
    owner: &ActorId,
    current: Option<&CatRecord>,
) -> Result<Transition, LifecycleError> {
    let cat = current.ok_or(LifecycleError::NotFound)?;
    let lives = cat
        .lives()
        .restore_one()
        .ok_or(LifecycleError::MaxLivesReached)?;
    Ok(Transition {
        record: cat.with_lives(lives),
        charge: Some(RESTORE_PRICE),
        event: CatEvent::LifeRestored {
            owner: owner.clone(),
            lives,
        },
    })
}
