//! Core domain types for Nine Lives.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application: the lifecycle
//! engine, both storage backends, and the CLI.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod cat;
mod error;
mod event;
mod ids;
mod token;

pub use cat::{
    CatRecord, CatView, CorruptRecordError, InvalidLivesError, Lives, MAX_LIVES, STAGE_THRESHOLDS,
    Stage, Streak,
};
pub use error::{LifecycleError, PaymentError};
pub use event::{CatEvent, EventArgs};
pub use ids::{ActorId, DAY_SECS, InvalidActorIdError, Timestamp};
pub use token::{InvalidAmountError, RESTORE_PRICE, TOKEN_DECIMALS, TokenAmount};
