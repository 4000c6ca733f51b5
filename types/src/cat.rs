//! Cat record types.
//!
//! A cat's stage is never stored on its own: [`CatRecord`] keeps only lives, streak
//! and the last check-in, and [`CatRecord::stage`] derives the tier from the streak
//! every time it is asked. [`CatView`] is the flat, observable projection that
//! persisted layouts and queries expose, and converting it back validates that the
//! stored stage still agrees with the streak.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::Timestamp;

/// Maximum (and starting) number of lives.
pub const MAX_LIVES: u8 = 9;

/// Lowest streak of each stage tier, indexed by stage.
pub const STAGE_THRESHOLDS: [u32; 4] = [0, 3, 7, 12];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("lives must be between 0 and {MAX_LIVES}, got {0}")]
pub struct InvalidLivesError(pub u8);

/// Remaining lives, always within `0..=MAX_LIVES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lives(u8);

impl Lives {
    pub const FULL: Lives = Lives(MAX_LIVES);
    pub const NONE: Lives = Lives(0);

    pub fn new(value: u8) -> Result<Self, InvalidLivesError> {
        if value > MAX_LIVES {
            return Err(InvalidLivesError(value));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// One life fewer, or `None` when there is nothing left to lose.
    #[must_use]
    pub const fn lose_one(self) -> Option<Lives> {
        if self.0 == 0 {
            None
        } else {
            Some(Lives(self.0 - 1))
        }
    }

    /// One life more, or `None` at the cap.
    #[must_use]
    pub const fn restore_one(self) -> Option<Lives> {
        if self.0 >= MAX_LIVES {
            None
        } else {
            Some(Lives(self.0 + 1))
        }
    }
}

impl fmt::Display for Lives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{MAX_LIVES}", self.0)
    }
}

/// Consecutive-day check-in counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Streak(u32);

impl Streak {
    pub const ZERO: Streak = Streak(0);
    /// Value a streak restarts from after a missed window.
    pub const RESTART: Streak = Streak(1);

    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn increment(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    #[must_use]
    pub const fn stage(self) -> Stage {
        Stage::from_streak(self)
    }
}

impl fmt::Display for Streak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Evolution tier, a pure function of the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    #[default]
    Kitten,
    Young,
    Adult,
    Elder,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Kitten, Stage::Young, Stage::Adult, Stage::Elder];

    /// Tier boundaries are inclusive on the lower end.
    #[must_use]
    pub const fn from_streak(streak: Streak) -> Self {
        let s = streak.get();
        if s >= STAGE_THRESHOLDS[3] {
            Stage::Elder
        } else if s >= STAGE_THRESHOLDS[2] {
            Stage::Adult
        } else if s >= STAGE_THRESHOLDS[1] {
            Stage::Young
        } else {
            Stage::Kitten
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Stage::Kitten => 0,
            Stage::Young => 1,
            Stage::Adult => 2,
            Stage::Elder => 3,
        }
    }

    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Stage::Kitten),
            1 => Some(Stage::Young),
            2 => Some(Stage::Adult),
            3 => Some(Stage::Elder),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Kitten => "kitten",
            Stage::Young => "young",
            Stage::Adult => "adult",
            Stage::Elder => "elder",
        }
    }

    /// Streak needed to reach the next tier, `None` at the top.
    #[must_use]
    pub const fn next_threshold(self) -> Option<u32> {
        match self {
            Stage::Kitten => Some(STAGE_THRESHOLDS[1]),
            Stage::Young => Some(STAGE_THRESHOLDS[2]),
            Stage::Adult => Some(STAGE_THRESHOLDS[3]),
            Stage::Elder => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted state of one actor's cat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CatRecord {
    lives: Lives,
    streak: Streak,
    last_check_in: Timestamp,
}

impl CatRecord {
    /// A freshly created cat: full lives, no streak, window anchored at `now`.
    #[must_use]
    pub const fn hatch(now: Timestamp) -> Self {
        Self {
            lives: Lives::FULL,
            streak: Streak::ZERO,
            last_check_in: now,
        }
    }

    #[must_use]
    pub const fn from_parts(lives: Lives, streak: Streak, last_check_in: Timestamp) -> Self {
        Self {
            lives,
            streak,
            last_check_in,
        }
    }

    #[must_use]
    pub const fn lives(&self) -> Lives {
        self.lives
    }

    #[must_use]
    pub const fn streak(&self) -> Streak {
        self.streak
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.streak.stage()
    }

    #[must_use]
    pub const fn last_check_in(&self) -> Timestamp {
        self.last_check_in
    }

    #[must_use]
    pub const fn with_lives(self, lives: Lives) -> Self {
        Self { lives, ..self }
    }

    #[must_use]
    pub const fn with_check_in(self, streak: Streak, at: Timestamp) -> Self {
        Self {
            streak,
            last_check_in: at,
            ..self
        }
    }

    #[must_use]
    pub fn view(&self) -> CatView {
        CatView::from(*self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorruptRecordError {
    #[error("record is marked as not existing")]
    NotExisting,
    #[error(transparent)]
    Lives(#[from] InvalidLivesError),
    #[error("stored stage {stored} does not match streak {streak} (expected {expected})")]
    StageMismatch { stored: u8, streak: u32, expected: u8 },
}

/// Flat projection of a cat with every observable field, including the derived stage.
///
/// Field names follow the camelCase layout used by the local store's snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatView {
    pub lives: u8,
    pub streak: u32,
    pub stage: u8,
    pub last_check_in: u64,
    pub exists: bool,
}

impl From<CatRecord> for CatView {
    fn from(record: CatRecord) -> Self {
        Self {
            lives: record.lives.get(),
            streak: record.streak.get(),
            stage: record.stage().as_u8(),
            last_check_in: record.last_check_in.as_secs(),
            exists: true,
        }
    }
}

impl TryFrom<CatView> for CatRecord {
    type Error = CorruptRecordError;

    fn try_from(view: CatView) -> Result<Self, Self::Error> {
        if !view.exists {
            return Err(CorruptRecordError::NotExisting);
        }
        let lives = Lives::new(view.lives)?;
        let streak = Streak::new(view.streak);
        let expected = streak.stage().as_u8();
        if view.stage != expected {
            return Err(CorruptRecordError::StageMismatch {
                stored: view.stage,
                streak: view.streak,
                expected,
            });
        }
        Ok(CatRecord::from_parts(
            lives,
            streak,
            Timestamp::from_secs(view.last_check_in),
        ))
    }
}
