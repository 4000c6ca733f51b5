//! Restoration payments, run against both backends.

use ninelives_core::CatError;
use ninelives_types::{CatEvent, LifecycleError, Lives, PaymentError, RESTORE_PRICE, TokenAmount};

use crate::common::{Harness, addr, harnesses, treasury};

const PRICE: u64 = RESTORE_PRICE.base_units();

fn payment_failure<T: std::fmt::Debug>(result: Result<T, CatError>) -> PaymentError {
    match result {
        Err(CatError::Rejected(LifecycleError::PaymentFailed(err))) => err,
        other => panic!("expected payment failure, got {other:?}"),
    }
}

/// A cat that has lost one life.
fn wounded(h: &Harness) -> ninelives_types::ActorId {
    let alice = addr("a1");
    h.service.create(&alice).unwrap();
    h.service.lose_life(&alice).unwrap();
    h.events.take();
    alice
}

#[test]
fn restore_at_full_lives_is_rejected_without_charge() {
    for h in harnesses() {
        let alice = addr("a1");
        h.service.create(&alice).unwrap();
        h.fund(&alice, 5 * PRICE, 5 * PRICE);

        assert!(matches!(
            h.service.restore_life(&alice),
            Err(CatError::Rejected(LifecycleError::MaxLivesReached))
        ));
        assert_eq!(h.balance(&alice), 5 * PRICE, "{}", h.name);
        assert_eq!(h.balance(&treasury()), 0, "{}", h.name);
    }
}

#[test]
fn insufficient_balance() {
    for h in harnesses() {
        let alice = wounded(&h);
        h.fund(&alice, PRICE - 1, 10 * PRICE);

        assert_eq!(
            payment_failure(h.service.restore_life(&alice)),
            PaymentError::InsufficientBalance {
                needed: RESTORE_PRICE,
                available: TokenAmount::from_base_units(PRICE - 1),
            },
            "{}",
            h.name
        );
        assert_eq!(h.service.get_cat(&alice).unwrap().lives, 8);
        assert_eq!(h.balance(&alice), PRICE - 1);
        assert_eq!(h.balance(&treasury()), 0);
        assert!(h.events.is_empty());
    }
}

#[test]
fn missing_authorization() {
    for h in harnesses() {
        let alice = wounded(&h);
        h.fund(&alice, 10 * PRICE, PRICE / 2);

        assert_eq!(
            payment_failure(h.service.restore_life(&alice)),
            PaymentError::MissingAuthorization {
                needed: RESTORE_PRICE,
                allowance: TokenAmount::from_base_units(PRICE / 2),
            },
            "{}",
            h.name
        );
        assert_eq!(h.service.get_cat(&alice).unwrap().lives, 8);
        assert_eq!(h.balance(&alice), 10 * PRICE);
        assert_eq!(
            h.backend().allowance_of(&alice).unwrap(),
            TokenAmount::from_base_units(PRICE / 2)
        );
    }
}

#[test]
fn balance_is_checked_before_authorization() {
    for h in harnesses() {
        let alice = wounded(&h);
        assert!(matches!(
            payment_failure(h.service.restore_life(&alice)),
            PaymentError::InsufficientBalance { .. }
        ));
    }
}

#[test]
fn transfer_rejected_when_frozen() {
    for h in harnesses() {
        let alice = wounded(&h);
        h.fund(&alice, PRICE, PRICE);

        h.backend().set_frozen(&alice, true).unwrap();
        assert!(matches!(
            payment_failure(h.service.restore_life(&alice)),
            PaymentError::TransferRejected { .. }
        ));

        h.backend().set_frozen(&alice, false).unwrap();
        h.backend().set_frozen(&treasury(), true).unwrap();
        assert!(matches!(
            payment_failure(h.service.restore_life(&alice)),
            PaymentError::TransferRejected { .. }
        ));

        assert_eq!(h.service.get_cat(&alice).unwrap().lives, 8);
        assert_eq!(h.balance(&alice), PRICE);
        assert!(h.events.is_empty(), "{}", h.name);
    }
}

#[test]
fn successful_restore_moves_exactly_one_unit() {
    for h in harnesses() {
        let alice = wounded(&h);
        h.service.lose_life(&alice).unwrap();
        h.events.take();
        h.fund(&alice, 3 * PRICE, 2 * PRICE);

        let view = h.service.restore_life(&alice).unwrap();
        assert_eq!(view.lives, 8);
        assert_eq!(h.balance(&alice), 2 * PRICE, "{}", h.name);
        assert_eq!(h.balance(&treasury()), PRICE, "{}", h.name);
        assert_eq!(h.backend().allowance_of(&alice).unwrap(), RESTORE_PRICE);
        assert_eq!(
            h.events.take(),
            vec![CatEvent::LifeRestored {
                owner: alice.clone(),
                lives: Lives::new(8).unwrap(),
            }]
        );

        h.service.restore_life(&alice).unwrap();
        assert_eq!(h.service.get_cat(&alice).unwrap().lives, 9);
        assert_eq!(h.balance(&alice), PRICE);
        assert_eq!(h.balance(&treasury()), 2 * PRICE);
        assert_eq!(h.backend().allowance_of(&alice).unwrap(), TokenAmount::ZERO);
    }
}

#[test]
fn treasury_restoring_its_own_cat_spends_only_authorization() {
    for h in harnesses() {
        let owner = treasury();
        h.service.create(&owner).unwrap();
        h.service.lose_life(&owner).unwrap();
        h.fund(&owner, PRICE, PRICE);

        h.service.restore_life(&owner).unwrap();
        assert_eq!(h.balance(&owner), PRICE, "{}", h.name);
        assert_eq!(
            h.backend().allowance_of(&owner).unwrap(),
            TokenAmount::ZERO,
            "{}",
            h.name
        );
    }
}
