//! Payment asset amounts.
//!
//! The payment asset uses six decimals, so one whole unit is `1_000_000` base units.
//! Amounts are plain `u64` base units end to end; there is no floating point anywhere
//! between parsing a user-typed `"2.5"` and debiting a balance.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TOKEN_DECIMALS: u32 = 6;

/// Price of one life restoration.
pub const RESTORE_PRICE: TokenAmount = TokenAmount::ONE_UNIT;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid token amount {input:?}: {reason}")]
pub struct InvalidAmountError {
    pub input: String,
    pub reason: &'static str,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TokenAmount(u64);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(0);
    pub const ONE_UNIT: TokenAmount = TokenAmount(10u64.pow(TOKEN_DECIMALS));

    #[must_use]
    pub const fn from_base_units(units: u64) -> Self {
        Self(units)
    }

    #[must_use]
    pub const fn base_units(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn checked_add(self, other: TokenAmount) -> Option<TokenAmount> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(TokenAmount(sum)),
            None => None,
        }
    }

    #[must_use]
    pub const fn checked_sub(self, other: TokenAmount) -> Option<TokenAmount> {
        match self.0.checked_sub(other.0) {
            Some(diff) => Some(TokenAmount(diff)),
            None => None,
        }
    }

    /// Parse a decimal amount in whole units (`"1"`, `"2.5"`, `"0.000001"`).
    pub fn parse_units(input: &str) -> Result<Self, InvalidAmountError> {
        let invalid = |reason| InvalidAmountError {
            input: input.to_string(),
            reason,
        };

        let trimmed = input.trim();
        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("empty amount"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("expected a non-negative decimal number"));
        }
        if frac.len() > TOKEN_DECIMALS as usize {
            return Err(invalid("more than 6 decimal places"));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("amount too large"))?
        };
        let mut frac_units: u64 = if frac.is_empty() {
            0
        } else {
            frac.parse().map_err(|_| invalid("amount too large"))?
        };
        for _ in frac.len()..TOKEN_DECIMALS as usize {
            frac_units *= 10;
        }

        whole
            .checked_mul(Self::ONE_UNIT.0)
            .and_then(|units| units.checked_add(frac_units))
            .map(Self)
            .ok_or_else(|| invalid("amount too large"))
    }
}

impl FromStr for TokenAmount {
    type Err = InvalidAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_units(s)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = Self::ONE_UNIT.0;
        write!(
            f,
            "{}.{:0width$}",
            self.0 / unit,
            self.0 % unit,
            width = TOKEN_DECIMALS as usize
        )
    }
}
