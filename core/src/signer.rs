//! Actor capability.
//!
//! Wallet connection lives outside this workspace; the core only needs to ask
//! "who is acting?". A signer answers with an already-canonicalized [`ActorId`],
//! so identity strings are parsed once, here, and nowhere else.

use ninelives_types::{ActorId, InvalidActorIdError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("no actor address configured (pass --actor or set app.actor in the config)")]
    NoActor,
    #[error(transparent)]
    InvalidAddress(#[from] InvalidActorIdError),
}

pub trait Signer {
    fn address(&self) -> Result<ActorId, SignerError>;
}

/// A signer bound to a fixed address, e.g. from a flag or config entry.
#[derive(Debug, Clone, Default)]
pub struct StaticSigner {
    address: Option<String>,
}

impl StaticSigner {
    #[must_use]
    pub fn new(address: Option<String>) -> Self {
        Self { address }
    }
}

impl Signer for StaticSigner {
    fn address(&self) -> Result<ActorId, SignerError> {
        let raw = self.address.as_deref().ok_or(SignerError::NoActor)?;
        Ok(ActorId::parse(raw)?)
    }
}
