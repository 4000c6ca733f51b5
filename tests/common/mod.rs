//! Shared test utilities and fixtures
//!
//! Every harness runs the real service over a real backend with a manual clock,
//! so suites can drive both backends through the same calls.

#![allow(dead_code)]

use std::sync::Arc;

use ninelives_core::{CatBackend, CatService, EventQueue, ManualClock};
use ninelives_store::{LocalStore, SqliteLedger};
use ninelives_types::{ActorId, Timestamp, TokenAmount};

/// Arbitrary fixed start time.
pub const T0: u64 = 1_700_000_000;

pub fn addr(suffix: &str) -> ActorId {
    ActorId::parse(&format!("0x{suffix:0>40}")).expect("valid test address")
}

pub fn treasury() -> ActorId {
    addr("7e")
}

pub struct Harness {
    pub name: &'static str,
    pub service: CatService<Box<dyn CatBackend>>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<EventQueue>,
}

impl Harness {
    pub fn new(backend: Box<dyn CatBackend>) -> Self {
        let name = backend.name();
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(T0)));
        let events = Arc::new(EventQueue::new());
        let service = CatService::new(backend, clock.clone()).with_sink(events.clone());
        Self {
            name,
            service,
            clock,
            events,
        }
    }

    pub fn ledger() -> Self {
        Self::new(Box::new(
            SqliteLedger::open_in_memory(treasury()).expect("in-memory ledger"),
        ))
    }

    pub fn local() -> Self {
        Self::new(Box::new(LocalStore::in_memory(treasury())))
    }

    pub fn backend(&self) -> &dyn CatBackend {
        self.service.backend().as_ref()
    }

    /// Give `actor` a balance and a spending authorization, in base units.
    pub fn fund(&self, actor: &ActorId, balance: u64, allowance: u64) {
        self.backend()
            .mint(actor, TokenAmount::from_base_units(balance))
            .expect("mint");
        self.backend()
            .approve(actor, TokenAmount::from_base_units(allowance))
            .expect("approve");
    }

    pub fn balance(&self, actor: &ActorId) -> u64 {
        self.backend().balance_of(actor).expect("balance").base_units()
    }

    pub fn now(&self) -> Timestamp {
        self.service.now()
    }
}

/// One harness per backend, ledger first.
pub fn harnesses() -> [Harness; 2] {
    [Harness::ledger(), Harness::local()]
}
