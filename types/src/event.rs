use serde::{Deserialize, Serialize};

use crate::cat::{Lives, Stage, Streak};
use crate::ids::ActorId;

/// Notification emitted once per successful mutation, carrying post-mutation values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatEvent {
    CatCreated {
        owner: ActorId,
    },
    CheckedIn {
        owner: ActorId,
        streak: Streak,
        stage: Stage,
    },
    LifeLost {
        owner: ActorId,
        lives: Lives,
    },
    LifeRestored {
        owner: ActorId,
        lives: Lives,
    },
}

impl CatEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CatCreated { .. } => "CatCreated",
            Self::CheckedIn { .. } => "CheckedIn",
            Self::LifeLost { .. } => "LifeLost",
            Self::LifeRestored { .. } => "LifeRestored",
        }
    }

    #[must_use]
    pub fn owner(&self) -> &ActorId {
        match self {
            Self::CatCreated { owner }
            | Self::CheckedIn { owner, .. }
            | Self::LifeLost { owner, .. }
            | Self::LifeRestored { owner, .. } => owner,
        }
    }

    /// Event arguments after the owner, as plain integers.
    #[must_use]
    pub fn args(&self) -> EventArgs {
        match self {
            Self::CatCreated { .. } => EventArgs::default(),
            Self::CheckedIn { streak, stage, .. } => EventArgs {
                streak: Some(streak.get()),
                stage: Some(stage.as_u8()),
                lives: None,
            },
            Self::LifeLost { lives, .. } | Self::LifeRestored { lives, .. } => EventArgs {
                lives: Some(lives.get()),
                ..EventArgs::default()
            },
        }
    }

    /// Format the event as a single human-readable line.
    #[must_use]
    pub fn format(&self) -> String {
        match self {
            Self::CatCreated { owner } => format!("CatCreated({owner})"),
            Self::CheckedIn {
                owner,
                streak,
                stage,
            } => format!("CheckedIn({owner}, streak={streak}, stage={})", stage.as_u8()),
            Self::LifeLost { owner, lives } => format!("LifeLost({owner}, lives={})", lives.get()),
            Self::LifeRestored { owner, lives } => {
                format!("LifeRestored({owner}, lives={})", lives.get())
            }
        }
    }
}

/// Flattened integer arguments of an event, as stored in an event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lives: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<u8>,
}
