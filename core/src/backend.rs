//! The storage seam shared by both backends.
//!
//! A [`CatBackend`] owns every cat record plus the payment asset balances it
//! settles against. Its one mutating entry point, [`CatBackend::commit`], is the
//! linearization point for an identity: it reads the current record, lets the
//! lifecycle engine plan the transition, settles the charge if there is one, and
//! writes the result. Either all of that lands or none of it does.

use std::error::Error as StdError;

use thiserror::Error;

use ninelives_types::{ActorId, CatRecord, LifecycleError, TokenAmount};

use crate::lifecycle::Transition;

/// Planner invoked by a backend with the current record, inside the commit step.
pub type Plan<'a> = dyn FnMut(Option<&CatRecord>) -> Result<Transition, LifecycleError> + 'a;

/// Infrastructure failure inside a backend. Never a rejection of the request itself.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("corrupt entry for {key}: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("balance of {actor} would overflow")]
    BalanceOverflow { actor: ActorId },
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

impl BackendError {
    pub fn storage(
        context: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::Storage {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Corrupt {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// What a mutating call can fail with.
#[derive(Debug, Error)]
pub enum CatError {
    #[error(transparent)]
    Rejected(#[from] LifecycleError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl CatError {
    /// The typed rejection, if this was one.
    #[must_use]
    pub fn rejection(&self) -> Option<&LifecycleError> {
        match self {
            CatError::Rejected(err) => Some(err),
            CatError::Backend(_) => None,
        }
    }
}

pub trait CatBackend: Send + Sync {
    /// Short name used in logs ("ledger", "local").
    fn name(&self) -> &'static str;

    /// Destination of restoration payments.
    fn treasury(&self) -> &ActorId;

    fn load(&self, actor: &ActorId) -> Result<Option<CatRecord>, BackendError>;

    /// Atomically read, plan, settle and write one actor's record.
    ///
    /// Implementations must serialize concurrent commits for the same actor and
    /// must leave both the record and all balances untouched when `plan`, the
    /// settlement, or the write fails.
    fn commit(&self, actor: &ActorId, plan: &mut Plan<'_>) -> Result<Transition, CatError>;

    fn balance_of(&self, actor: &ActorId) -> Result<TokenAmount, BackendError>;

    /// Amount `owner` has authorized the game to spend on its behalf.
    fn allowance_of(&self, owner: &ActorId) -> Result<TokenAmount, BackendError>;

    /// Credit `amount` to `actor` out of thin air. Returns the new balance.
    fn mint(&self, actor: &ActorId, amount: TokenAmount) -> Result<TokenAmount, BackendError>;

    /// Replace `owner`'s spending authorization.
    fn approve(&self, owner: &ActorId, amount: TokenAmount) -> Result<(), BackendError>;

    /// Frozen accounts can neither send nor receive restoration payments.
    fn set_frozen(&self, actor: &ActorId, frozen: bool) -> Result<(), BackendError>;
}

impl<B: CatBackend + ?Sized> CatBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn treasury(&self) -> &ActorId {
        (**self).treasury()
    }

    fn load(&self, actor: &ActorId) -> Result<Option<CatRecord>, BackendError> {
        (**self).load(actor)
    }

    fn commit(&self, actor: &ActorId, plan: &mut Plan<'_>) -> Result<Transition, CatError> {
        (**self).commit(actor, plan)
    }

    fn balance_of(&self, actor: &ActorId) -> Result<TokenAmount, BackendError> {
        (**self).balance_of(actor)
    }

    fn allowance_of(&self, owner: &ActorId) -> Result<TokenAmount, BackendError> {
        (**self).allowance_of(owner)
    }

    fn mint(&self, actor: &ActorId, amount: TokenAmount) -> Result<TokenAmount, BackendError> {
        (**self).mint(actor, amount)
    }

    fn approve(&self, owner: &ActorId, amount: TokenAmount) -> Result<(), BackendError> {
        (**self).approve(owner, amount)
    }

    fn set_frozen(&self, actor: &ActorId, frozen: bool) -> Result<(), BackendError> {
        (**self).set_frozen(actor, frozen)
    }
}
