//! Backend parity: the ledger and the local store, driven through the same
//! random operation sequence with the same clock, must agree on every result,
//! every cat view, every balance and every emitted event.

use proptest::prelude::*;

use ninelives_core::CatError;
use ninelives_types::{ActorId, CatView, DAY_SECS, LifecycleError, TokenAmount};

use crate::common::{Harness, addr, treasury};

#[derive(Debug, Clone)]
enum Op {
    Create(usize),
    CheckIn(usize),
    LoseLife(usize),
    RestoreLife(usize),
    Mint(usize, u64),
    Approve(usize, u64),
    Freeze(usize, bool),
    Advance(u64),
}

/// Three players plus the treasury, so self-payment gets exercised too.
fn actors() -> Vec<ActorId> {
    vec![addr("a1"), addr("b2"), addr("c3"), treasury()]
}

fn actor_strategy() -> impl Strategy<Value = usize> {
    0usize..4
}

fn advance_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        0u64..120,
        Just(DAY_SECS - 1),
        Just(DAY_SECS),
        Just(2 * DAY_SECS - 1),
        Just(2 * DAY_SECS),
        DAY_SECS..3 * DAY_SECS,
    ]
}

fn amount_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(0u64),
        Just(999_999),
        Just(1_000_000),
        Just(2_500_000),
        0u64..5_000_000,
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => actor_strategy().prop_map(Op::Create),
        3 => actor_strategy().prop_map(Op::CheckIn),
        3 => actor_strategy().prop_map(Op::LoseLife),
        3 => actor_strategy().prop_map(Op::RestoreLife),
        1 => (actor_strategy(), amount_strategy()).prop_map(|(a, n)| Op::Mint(a, n)),
        1 => (actor_strategy(), amount_strategy()).prop_map(|(a, n)| Op::Approve(a, n)),
        1 => (actor_strategy(), any::<bool>()).prop_map(|(a, f)| Op::Freeze(a, f)),
        3 => advance_strategy().prop_map(Op::Advance),
    ]
}

type Outcome = Result<Option<CatView>, LifecycleError>;

fn apply(h: &Harness, actors: &[ActorId], op: &Op) -> Outcome {
    let mutation = |result: Result<CatView, CatError>| match result {
        Ok(view) => Ok(Some(view)),
        Err(CatError::Rejected(err)) => Err(err),
        Err(CatError::Backend(err)) => panic!("{} backend failure: {err}", h.name),
    };
    match *op {
        Op::Create(i) => mutation(h.service.create(&actors[i])),
        Op::CheckIn(i) => mutation(h.service.check_in(&actors[i])),
        Op::LoseLife(i) => mutation(h.service.lose_life(&actors[i])),
        Op::RestoreLife(i) => mutation(h.service.restore_life(&actors[i])),
        Op::Mint(i, n) => {
            // Balances stay far from u64::MAX, so minting never overflows here.
            h.backend()
                .mint(&actors[i], TokenAmount::from_base_units(n))
                .unwrap();
            Ok(None)
        }
        Op::Approve(i, n) => {
            h.backend()
                .approve(&actors[i], TokenAmount::from_base_units(n))
                .unwrap();
            Ok(None)
        }
        Op::Freeze(i, frozen) => {
            h.backend().set_frozen(&actors[i], frozen).unwrap();
            Ok(None)
        }
        Op::Advance(secs) => {
            h.clock.advance(secs);
            Ok(None)
        }
    }
}

/// Everything a caller can observe about one actor.
#[derive(Debug, PartialEq, Eq)]
struct Observed {
    cat: Option<CatView>,
    secs_until_check_in: u64,
    balance: TokenAmount,
    allowance: TokenAmount,
}

fn observe(h: &Harness, actor: &ActorId) -> Observed {
    Observed {
        cat: h.service.get_cat(actor).ok(),
        secs_until_check_in: h.service.time_until_next_check_in(actor).unwrap(),
        balance: h.backend().balance_of(actor).unwrap(),
        allowance: h.backend().allowance_of(actor).unwrap(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn backends_agree_step_by_step(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let ledger = Harness::ledger();
        let local = Harness::local();
        let actors = actors();

        for (step, op) in ops.iter().enumerate() {
            let left = apply(&ledger, &actors, op);
            let right = apply(&local, &actors, op);
            prop_assert_eq!(&left, &right, "result diverged at step {} ({:?})", step, op);
            prop_assert_eq!(ledger.events.take(), local.events.take(), "events diverged at step {}", step);

            for actor in &actors {
                prop_assert_eq!(
                    observe(&ledger, actor),
                    observe(&local, actor),
                    "state diverged at step {} for {}", step, actor
                );
            }
        }
    }

    #[test]
    fn invariants_hold_after_every_step(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let h = Harness::local();
        let actors = actors();
        let mut previous: Vec<Option<CatView>> = vec![None; actors.len()];

        for op in &ops {
            let result = apply(&h, &actors, op);
            if let Err(err) = &result {
                // A rejection never changes anything.
                for (i, actor) in actors.iter().enumerate() {
                    prop_assert_eq!(h.service.get_cat(actor).ok(), previous[i], "{:?} changed state", err);
                }
            }

            for (i, actor) in actors.iter().enumerate() {
                let current = h.service.get_cat(actor).ok();
                if let Some(view) = current {
                    prop_assert!(view.exists);
                    prop_assert!(view.lives <= 9);
                    let expected_stage = match view.streak {
                        0..=2 => 0,
                        3..=6 => 1,
                        7..=11 => 2,
                        _ => 3,
                    };
                    prop_assert_eq!(view.stage, expected_stage);
                    if let Some(before) = previous[i] {
                        prop_assert!(view.last_check_in >= before.last_check_in);
                    }
                } else {
                    // Existence is monotonic.
                    prop_assert!(previous[i].is_none());
                }
                previous[i] = current;
            }
        }
    }
}
