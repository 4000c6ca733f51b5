//! Core domain logic for Nine Lives.
//!
//! This crate holds the cat lifecycle state machine and everything around it that
//! does not depend on a particular storage technology:
//!
//! - **`lifecycle`**: pure transitions (create, check-in, lose life, restore life)
//! - **`backend`**: the [`CatBackend`] seam both storage backends implement
//! - **`payment`**: restoration payment settlement shared by both backends
//! - **`query`**: read-only projections (has cat, countdown, status)
//! - **`service`**: [`CatService`], which wires the engine to a backend, clock and sinks

mod backend;
mod clock;
mod events;
pub mod lifecycle;
pub mod payment;
mod query;
mod service;
mod signer;


pub use backend::{BackendError, CatBackend, CatError, Plan};
pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{EventQueue, EventSink, TracingSink};
pub use lifecycle::{Action, CheckInWindow, Transition};
pub use payment::{TokenLedger, settle};
pub use query::CatStatus;
pub use service::CatService;
pub use signer::{Signer, SignerError, StaticSigner};
