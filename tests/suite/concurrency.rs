//! Same-identity operations serialize; different identities do not interfere.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use ninelives_core::{CatBackend, CatService, ManualClock};
use ninelives_store::{LocalStore, SqliteLedger};
use ninelives_types::{ActorId, Timestamp, TokenAmount};

use crate::common::{T0, addr, treasury};

fn backends(dir: &tempfile::TempDir) -> Vec<Box<dyn CatBackend>> {
    let ledger: Box<dyn CatBackend> =
        Box::new(SqliteLedger::open(dir.path().join("ledger.db"), treasury()).unwrap());
    vec![
        ledger,
        Box::new(LocalStore::in_memory(treasury())),
        Box::new(LocalStore::open(dir.path().join("local.json"), treasury()).unwrap()),
    ]
}

fn shared(backend: Box<dyn CatBackend>) -> Arc<CatService<Box<dyn CatBackend>>> {
    let clock = Arc::new(ManualClock::new(Timestamp::from_secs(T0)));
    Arc::new(CatService::new(backend, clock))
}

/// Run `f` on `threads` threads released at the same instant.
fn race<F>(threads: usize, f: F)
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(threads));
    let f = Arc::new(f);
    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            let f = Arc::clone(&f);
            thread::spawn(move || {
                barrier.wait();
                f(i);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn two_concurrent_lose_life_calls_take_two_lives() {
    let dir = tempfile::tempdir().unwrap();
    for backend in backends(&dir) {
        let name = backend.name();
        let service = shared(backend);
        let alice = addr("a1");
        service.create(&alice).unwrap();

        let racer = Arc::clone(&service);
        let target = alice.clone();
        race(2, move |_| {
            racer.lose_life(&target).unwrap();
        });

        assert_eq!(service.get_cat(&alice).unwrap().lives, 7, "{name}");
    }
}

#[test]
fn many_lose_life_calls_stop_at_zero() {
    let dir = tempfile::tempdir().unwrap();
    for backend in backends(&dir) {
        let name = backend.name();
        let service = shared(backend);
        let alice = addr("a1");
        service.create(&alice).unwrap();

        let successes = Arc::new(AtomicUsize::new(0));
        let racer = Arc::clone(&service);
        let counter = Arc::clone(&successes);
        let target = alice.clone();
        race(12, move |_| {
            if racer.lose_life(&target).is_ok() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert_eq!(successes.load(Ordering::SeqCst), 9, "{name}");
        assert_eq!(service.get_cat(&alice).unwrap().lives, 0, "{name}");
    }
}

#[test]
fn concurrent_restores_never_overspend() {
    let dir = tempfile::tempdir().unwrap();
    for backend in backends(&dir) {
        let name = backend.name();
        let service = shared(backend);
        let alice = addr("a1");
        service.create(&alice).unwrap();
        for _ in 0..4 {
            service.lose_life(&alice).unwrap();
        }
        // Funds for exactly two restorations.
        let two = TokenAmount::from_base_units(2_000_000);
        service.backend().mint(&alice, two).unwrap();
        service.backend().approve(&alice, two).unwrap();

        let racer = Arc::clone(&service);
        let target = alice.clone();
        race(4, move |_| {
            let _ = racer.restore_life(&target);
        });

        assert_eq!(service.get_cat(&alice).unwrap().lives, 7, "{name}");
        assert_eq!(
            service.backend().balance_of(&alice).unwrap(),
            TokenAmount::ZERO,
            "{name}"
        );
        assert_eq!(
            service.backend().balance_of(&treasury()).unwrap(),
            two,
            "{name}"
        );
    }
}

#[test]
fn different_identities_progress_independently() {
    let dir = tempfile::tempdir().unwrap();
    for backend in backends(&dir) {
        let name = backend.name();
        let service = shared(backend);
        let actors: Vec<ActorId> = (1..=8).map(|i| addr(&format!("c{i}"))).collect();

        let racer = Arc::clone(&service);
        let shared_actors = Arc::new(actors.clone());
        race(actors.len(), move |i| {
            let actor = &shared_actors[i];
            racer.create(actor).unwrap();
            for _ in 0..i {
                racer.lose_life(actor).unwrap();
            }
        });

        for (i, actor) in actors.iter().enumerate() {
            assert_eq!(
                usize::from(service.get_cat(actor).unwrap().lives),
                9 - i,
                "{name} actor {i}"
            );
        }
    }
}
