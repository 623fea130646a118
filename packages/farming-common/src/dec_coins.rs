use std::collections::BTreeMap;
use std::fmt;

use cosmwasm_std::{
    CheckedFromRatioError, Coin, ConversionOverflowError, DecCoin, Decimal256, OverflowError,
    Uint128,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecCoinsError {
    #[error("arithmetic overflow: {reason}")]
    Overflow { reason: String },

    #[error("negative {denom} amount after subtraction")]
    Negative { denom: String },

    #[error("coin {amount}{denom} amount is not positive")]
    NotPositive { denom: String, amount: String },

    #[error("invalid denom: {denom}")]
    InvalidDenom { denom: String },

    #[error("duplicate denom: {denom}")]
    DuplicateDenom { denom: String },
}

impl From<OverflowError> for DecCoinsError {
    fn from(e: OverflowError) -> Self {
        DecCoinsError::Overflow {
            reason: e.to_string(),
        }
    }
}

impl From<CheckedFromRatioError> for DecCoinsError {
    fn from(e: CheckedFromRatioError) -> Self {
        DecCoinsError::Overflow {
            reason: e.to_string(),
        }
    }
}

impl From<ConversionOverflowError> for DecCoinsError {
    fn from(e: ConversionOverflowError) -> Self {
        DecCoinsError::Overflow {
            reason: e.to_string(),
        }
    }
}

/// Checks a denom against the bank module rule `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`.
pub fn validate_denom(denom: &str) -> Result<(), DecCoinsError> {
    let bytes = denom.as_bytes();
    let valid = (3..=128).contains(&bytes.len())
        && bytes[0].is_ascii_alphabetic()
        && bytes[1..]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || b"/:._-".contains(b));
    if !valid {
        return Err(DecCoinsError::InvalidDenom {
            denom: denom.to_string(),
        });
    }
    Ok(())
}

/// Validates a list of integer coins: valid, unique denoms with positive amounts.
pub fn validate_coins(coins: &[Coin]) -> Result<(), DecCoinsError> {
    let mut seen = Vec::with_capacity(coins.len());
    for coin in coins {
        validate_denom(&coin.denom)?;
        if coin.amount.is_zero() {
            return Err(DecCoinsError::NotPositive {
                denom: coin.denom.clone(),
                amount: coin.amount.to_string(),
            });
        }
        if seen.contains(&coin.denom.as_str()) {
            return Err(DecCoinsError::DuplicateDenom {
                denom: coin.denom.clone(),
            });
        }
        seen.push(coin.denom.as_str());
    }
    Ok(())
}

#[inline]
fn int_to_dec(amount: Uint128) -> Decimal256 {
    Decimal256::from_ratio(amount, 1u128)
}

/// A set of decimal coins kept sorted by denom with no zero entries.
///
/// All arithmetic is exact up to 18 fractional digits and checked; anything
/// that would overflow `Decimal256` is reported instead of wrapping or
/// panicking. Division and multiplication truncate toward zero.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default, JsonSchema)]
#[serde(transparent)]
pub struct DecCoins(Vec<DecCoin>);

impl DecCoins {
    pub fn new() -> Self {
        DecCoins(vec![])
    }

    /// Builds a set from untrusted input. Every amount must be positive and
    /// every denom valid and unique; the result is sorted.
    pub fn try_from_vec(coins: Vec<DecCoin>) -> Result<Self, DecCoinsError> {
        let mut map = BTreeMap::new();
        for coin in coins {
            validate_denom(&coin.denom)?;
            if coin.amount.is_zero() {
                return Err(DecCoinsError::NotPositive {
                    denom: coin.denom,
                    amount: coin.amount.to_string(),
                });
            }
            if map.contains_key(&coin.denom) {
                return Err(DecCoinsError::DuplicateDenom { denom: coin.denom });
            }
            map.insert(coin.denom, coin.amount);
        }
        Ok(Self::from_map(map))
    }

    pub fn from_coins(coins: &[Coin]) -> Self {
        let map = coins
            .iter()
            .filter(|c| !c.amount.is_zero())
            .fold(BTreeMap::new(), |mut acc, c| {
                let entry = acc.entry(c.denom.clone()).or_insert_with(Decimal256::zero);
                *entry += int_to_dec(c.amount);
                acc
            });
        Self::from_map(map)
    }

    fn from_map(map: BTreeMap<String, Decimal256>) -> Self {
        DecCoins(
            map.into_iter()
                .filter(|(_, amount)| !amount.is_zero())
                .map(|(denom, amount)| DecCoin { denom, amount })
                .collect(),
        )
    }

    fn to_map(&self) -> BTreeMap<String, Decimal256> {
        self.0
            .iter()
            .map(|c| (c.denom.clone(), c.amount))
            .collect()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecCoin> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<DecCoin> {
        self.0
    }

    pub fn amount_of(&self, denom: &str) -> Decimal256 {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount)
            .unwrap_or_else(Decimal256::zero)
    }

    /// Sum of all amounts regardless of denom. Used for weight tables.
    pub fn total_amount(&self) -> Result<Decimal256, DecCoinsError> {
        self.0
            .iter()
            .try_fold(Decimal256::zero(), |acc, c| Ok(acc.checked_add(c.amount)?))
    }

    pub fn checked_add(&self, other: &DecCoins) -> Result<DecCoins, DecCoinsError> {
        let mut map = self.to_map();
        for coin in other.iter() {
            let entry = map.entry(coin.denom.clone()).or_insert_with(Decimal256::zero);
            *entry = entry.checked_add(coin.amount)?;
        }
        Ok(Self::from_map(map))
    }

    /// Subtracts `other`, failing if any denom would go below zero.
    pub fn checked_sub(&self, other: &DecCoins) -> Result<DecCoins, DecCoinsError> {
        let mut map = self.to_map();
        for coin in other.iter() {
            let current = map.get(&coin.denom).copied().unwrap_or_else(Decimal256::zero);
            let left = current
                .checked_sub(coin.amount)
                .map_err(|_| DecCoinsError::Negative {
                    denom: coin.denom.clone(),
                })?;
            map.insert(coin.denom.clone(), left);
        }
        Ok(Self::from_map(map))
    }

    pub fn mul_dec_truncate(&self, factor: Decimal256) -> Result<DecCoins, DecCoinsError> {
        let mut map = BTreeMap::new();
        for coin in self.iter() {
            map.insert(coin.denom.clone(), coin.amount.checked_mul(factor)?);
        }
        Ok(Self::from_map(map))
    }

    pub fn mul_int_truncate(&self, factor: Uint128) -> Result<DecCoins, DecCoinsError> {
        self.mul_dec_truncate(int_to_dec(factor))
    }

    /// Divides every amount by an integer, truncating at 18 decimal places.
    pub fn quo_int_truncate(&self, divisor: Uint128) -> Result<DecCoins, DecCoinsError> {
        let divisor = int_to_dec(divisor);
        let mut map = BTreeMap::new();
        for coin in self.iter() {
            map.insert(coin.denom.clone(), coin.amount.checked_div(divisor)?);
        }
        Ok(Self::from_map(map))
    }

    /// Splits into the integer coins and the fractional change left behind.
    pub fn truncate_decimal(&self) -> Result<(Vec<Coin>, DecCoins), DecCoinsError> {
        let mut truncated = vec![];
        let mut change = BTreeMap::new();
        for coin in self.iter() {
            let int_amount = Uint128::try_from(coin.amount.to_uint_floor())?;
            let remainder = coin.amount.checked_sub(int_to_dec(int_amount))?;
            if !int_amount.is_zero() {
                truncated.push(Coin {
                    denom: coin.denom.clone(),
                    amount: int_amount,
                });
            }
            change.insert(coin.denom.clone(), remainder);
        }
        Ok((truncated, Self::from_map(change)))
    }
}

impl fmt::Display for DecCoins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|c| format!("{}{}", c.amount, c.denom))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}
