//! Payment gate settlement.
//!
//! Both backends settle restoration payments through [`settle`], so the order of
//! checks, and therefore which failure a caller sees for a given wallet state, is
//! identical no matter which backend answers. Backends only supply the raw
//! account reads and writes via [`TokenLedger`], and they call `settle` from
//! inside the same atomic step that writes the cat record.

use ninelives_types::{ActorId, LifecycleError, PaymentError, TokenAmount};
use tracing::debug;

use crate::backend::{BackendError, CatError};

/// Raw account access for the payment asset.
///
/// Methods take `&mut self` so a backend can implement this over a borrowed
/// transaction or a locked in-memory wallet.
pub trait TokenLedger {
    fn balance(&mut self, who: &ActorId) -> Result<TokenAmount, BackendError>;
    fn allowance(&mut self, owner: &ActorId) -> Result<TokenAmount, BackendError>;
    fn is_frozen(&mut self, who: &ActorId) -> Result<bool, BackendError>;
    fn set_balance(&mut self, who: &ActorId, amount: TokenAmount) -> Result<(), BackendError>;
    fn set_allowance(&mut self, owner: &ActorId, amount: TokenAmount) -> Result<(), BackendError>;
}

/// Move `amount` from `payer` to `treasury`, spending `payer`'s allowance.
///
/// Checks run in a fixed order: balance, then authorization, then transfer
/// acceptance. Nothing is written unless every check passes.
pub fn settle<L: TokenLedger + ?Sized>(
    ledger: &mut L,
    payer: &ActorId,
    treasury: &ActorId,
    amount: TokenAmount,
) -> Result<(), CatError> {
    let balance = ledger.balance(payer)?;
    let Some(remaining) = balance.checked_sub(amount) else {
        return Err(reject(PaymentError::InsufficientBalance {
            needed: amount,
            available: balance,
        }));
    };

    let allowance = ledger.allowance(payer)?;
    let Some(remaining_allowance) = allowance.checked_sub(amount) else {
        return Err(reject(PaymentError::MissingAuthorization {
            needed: amount,
            allowance,
        }));
    };

    if ledger.is_frozen(payer)? {
        return Err(reject(PaymentError::TransferRejected {
            reason: format!("sender {payer} is frozen"),
        }));
    }
    if ledger.is_frozen(treasury)? {
        return Err(reject(PaymentError::TransferRejected {
            reason: format!("recipient {treasury} is frozen"),
        }));
    }

    if payer == treasury {
        // Self-transfer: balance is unchanged, authorization is still spent.
        ledger.set_allowance(payer, remaining_allowance)?;
        debug!(payer = %payer, amount = %amount, "Settled self-transfer");
        return Ok(());
    }

    let treasury_balance = ledger.balance(treasury)?;
    let Some(credited) = treasury_balance.checked_add(amount) else {
        return Err(reject(PaymentError::TransferRejected {
            reason: format!("recipient {treasury} balance would overflow"),
        }));
    };

    ledger.set_balance(payer, remaining)?;
    ledger.set_balance(treasury, credited)?;
    ledger.set_allowance(payer, remaining_allowance)?;
    debug!(payer = %payer, treasury = %treasury, amount = %amount, "Settled payment");
    Ok(())
}

fn reject(err: PaymentError) -> CatError {
    CatError::Rejected(LifecycleError::PaymentFailed(err))
}
