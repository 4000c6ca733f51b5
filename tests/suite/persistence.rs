//! On-disk state survives a restart.

use std::sync::Arc;

use ninelives_core::{CatBackend, CatService, ManualClock};
use ninelives_store::{LocalStore, SqliteLedger};
use ninelives_types::{CatEvent, DAY_SECS, Lives, Stage, Streak, Timestamp, TokenAmount};

use crate::common::{T0, addr, treasury};

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Timestamp::from_secs(T0)))
}

#[test]
fn ledger_reopen_keeps_cats_balances_and_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("ledger.db");
    let alice = addr("a1");

    {
        let clock = clock();
        let service = CatService::new(
            SqliteLedger::open(&path, treasury()).unwrap(),
            clock.clone(),
        );
        service.create(&alice).unwrap();
        clock.advance(DAY_SECS);
        service.check_in(&alice).unwrap();
        service.lose_life(&alice).unwrap();
        service
            .backend()
            .mint(&alice, TokenAmount::from_base_units(1_500_000))
            .unwrap();
        service
            .backend()
            .approve(&alice, TokenAmount::from_base_units(1_000_000))
            .unwrap();
        service.restore_life(&alice).unwrap();
    }

    let ledger = SqliteLedger::open(&path, treasury()).unwrap();
    let service = CatService::new(ledger, clock());
    let cat = service.get_cat(&alice).unwrap();
    assert_eq!(cat.lives, 9);
    assert_eq!(cat.streak, 1);
    assert_eq!(cat.last_check_in, T0 + DAY_SECS);

    let backend = service.backend();
    assert_eq!(
        backend.balance_of(&alice).unwrap(),
        TokenAmount::from_base_units(500_000)
    );
    assert_eq!(
        backend.events(&alice).unwrap(),
        vec![
            CatEvent::CatCreated {
                owner: alice.clone()
            },
            CatEvent::CheckedIn {
                owner: alice.clone(),
                streak: Streak::new(1),
                stage: Stage::Kitten,
            },
            CatEvent::LifeLost {
                owner: alice.clone(),
                lives: Lives::new(8).unwrap(),
            },
            CatEvent::LifeRestored {
                owner: alice.clone(),
                lives: Lives::FULL,
            },
        ]
    );
    assert!(backend.events(&addr("b2")).unwrap().is_empty());
}

#[test]
fn ledger_rejects_a_different_treasury() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    drop(SqliteLedger::open(&path, treasury()).unwrap());
    assert!(SqliteLedger::open(&path, addr("99")).is_err());
}

#[test]
fn local_snapshot_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.json");
    let alice = addr("a1");

    {
        let clock = clock();
        let service = CatService::new(LocalStore::open(&path, treasury()).unwrap(), clock.clone());
        service.create(&alice).unwrap();
        for _ in 0..3 {
            clock.advance(DAY_SECS);
            service.check_in(&alice).unwrap();
        }
        service.lose_life(&alice).unwrap();
    }

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let entry = &json["cats"][format!("cat_{alice}")];
    assert_eq!(entry["lives"], 8);
    assert_eq!(entry["streak"], 3);
    assert_eq!(entry["stage"], 1);
    assert_eq!(entry["lastCheckIn"], T0 + 3 * DAY_SECS);
    assert_eq!(entry["exists"], true);

    let service = CatService::new(LocalStore::open(&path, treasury()).unwrap(), clock());
    let cat = service.get_cat(&alice).unwrap();
    assert_eq!(cat.lives, 8);
    assert_eq!(cat.streak, 3);
    assert_eq!(cat.stage, 1);
}

#[test]
fn local_snapshot_with_desynced_stage_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.json");
    let key = format!("cat_{}", addr("a1"));
    let body = serde_json::json!({
        "version": 1,
        "cats": {
            key: { "lives": 9, "streak": 12, "stage": 0, "lastCheckIn": T0, "exists": true }
        }
    });
    std::fs::write(&path, body.to_string()).unwrap();

    assert!(LocalStore::open(&path, treasury()).is_err());
}
