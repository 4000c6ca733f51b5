//! Typed rejections.
//!
//! Every variant here is an expected outcome of asking for an action the current
//! state does not allow. None of them mean the system is broken, and a rejected
//! action never changes any record or balance.

use thiserror::Error;

use crate::token::TokenAmount;

/// Why a restoration payment could not be collected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance {
        needed: TokenAmount,
        available: TokenAmount,
    },
    #[error("missing authorization: need allowance {needed}, have {allowance}")]
    MissingAuthorization {
        needed: TokenAmount,
        allowance: TokenAmount,
    },
    #[error("transfer rejected: {reason}")]
    TransferRejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("cat already exists")]
    AlreadyExists,
    #[error("cat does not exist")]
    NotFound,
    #[error("already checked in today; next check-in in {remaining_secs}s")]
    TooSoon { remaining_secs: u64 },
    #[error("cat has no lives to lose")]
    NoLivesToLose,
    #[error("cat already has maximum lives")]
    MaxLivesReached,
    #[error("payment failed: {0}")]
    PaymentFailed(#[from] PaymentError),
}

impl LifecycleError {
    /// Stable machine-readable name for the rejection kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyExists => "already_exists",
            Self::NotFound => "not_found",
            Self::TooSoon { .. } => "too_soon",
            Self::NoLivesToLose => "no_lives_to_lose",
            Self::MaxLivesReached => "max_lives_reached",
            Self::PaymentFailed(_) => "payment_failed",
        }
    }
}
