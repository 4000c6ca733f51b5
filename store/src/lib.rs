//! Storage backends for Nine Lives.
//!
//! - [`SqliteLedger`]: the authoritative ledger. One SQLite file, one
//!   transaction per mutation, an append-only event log.
//! - [`LocalStore`]: the local ephemeral store. Per-identity locks in memory, a
//!   [`MockWallet`] for the payment asset, and an optional JSON snapshot.
//!
//! Both implement [`ninelives_core::CatBackend`] and settle payments through the
//! same [`ninelives_core::settle`], so they agree on every observable outcome.

mod atomic_write;
mod ledger;
mod local;
mod private_fs;

pub use ledger::SqliteLedger;
pub use local::{LocalStore, MockWallet};
