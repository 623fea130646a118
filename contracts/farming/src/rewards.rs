//! Lazy reward accounting.
//!
//! Each staking coin denom keeps a running "cumulative unit rewards" value
//! per epoch: the total reward paid per staked unit from the first epoch up
//! to and including that epoch. An allocation only appends one entry, and a
//! farmer's entitlement is the difference between two entries multiplied by
//! their staked amount, so neither step touches other farmers.
//!
//! Epoch numbering: an allocation made while `CURRENT_EPOCHS[denom] == e`
//! writes `HISTORICAL_REWARDS[(denom, e)]` and moves the counter to `e + 1`.
//! A staking with `starting_epoch = s` is entitled to everything recorded in
//! epochs `s..current`.

use cosmwasm_std::{Addr, Coin, OverflowError, OverflowOperation, StdResult, Storage, Uint128};
use farming_common::DecCoins;

use crate::bank::{self, Account};
use crate::error::ContractError;
use crate::state::{
    HistoricalRewards, OutstandingRewards, Staking, CURRENT_EPOCHS, HISTORICAL_REWARDS,
    OUTSTANDING_REWARDS, STAKINGS,
};

/// Epoch counter of a denom; zero until the denom's first stake is promoted.
pub fn current_epoch(storage: &dyn Storage, denom: &str) -> StdResult<u64> {
    Ok(CURRENT_EPOCHS.may_load(storage, denom)?.unwrap_or_default())
}

/// Sets up epoch 0 for a denom the first time any of it becomes staked.
pub fn initialize_denom(storage: &mut dyn Storage, denom: &str) -> StdResult<u64> {
    if let Some(epoch) = CURRENT_EPOCHS.may_load(storage, denom)? {
        return Ok(epoch);
    }
    HISTORICAL_REWARDS.save(storage, (denom, 0), &HistoricalRewards::default())?;
    CURRENT_EPOCHS.save(storage, denom, &1)?;
    Ok(1)
}

pub fn outstanding_rewards(storage: &dyn Storage, denom: &str) -> StdResult<OutstandingRewards> {
    Ok(OUTSTANDING_REWARDS
        .may_load(storage, denom)?
        .unwrap_or_default())
}

/// Records `coins` as this epoch's reward for everyone staking `denom` and
/// returns the epoch the allocation was written to.
pub fn record_allocation(
    storage: &mut dyn Storage,
    denom: &str,
    coins: &[Coin],
    total_staked: Uint128,
) -> Result<u64, ContractError> {
    if total_staked.is_zero() {
        return Err(ContractError::NoTotalStakings {
            denom: denom.to_string(),
        });
    }

    let epoch = initialize_denom(storage, denom)?;
    let allocated = DecCoins::from_coins(coins);
    let unit_rewards = allocated.quo_int_truncate(total_staked)?;

    let previous_epoch = epoch
        .checked_sub(1)
        .ok_or(OverflowError::new(OverflowOperation::Sub))?;
    let previous = HISTORICAL_REWARDS.load(storage, (denom, previous_epoch))?;
    let cumulative_unit_rewards = previous.cumulative_unit_rewards.checked_add(&unit_rewards)?;
    HISTORICAL_REWARDS.save(
        storage,
        (denom, epoch),
        &HistoricalRewards {
            cumulative_unit_rewards,
        },
    )?;
    CURRENT_EPOCHS.save(storage, denom, &(epoch + 1))?;

    let mut outstanding = outstanding_rewards(storage, denom)?;
    outstanding.rewards = outstanding.rewards.checked_add(&allocated)?;
    OUTSTANDING_REWARDS.save(storage, denom, &outstanding)?;

    Ok(epoch)
}

/// Untruncated rewards accrued by `staking` from its starting epoch through
/// `ending_epoch`.
pub fn accrued_rewards(
    storage: &dyn Storage,
    denom: &str,
    staking: &Staking,
    ending_epoch: u64,
) -> Result<DecCoins, ContractError> {
    if staking.starting_epoch > ending_epoch {
        return Ok(DecCoins::new());
    }
    let starting = HISTORICAL_REWARDS.load(storage, (denom, staking.starting_epoch.saturating_sub(1)))?;
    let ending = HISTORICAL_REWARDS.load(storage, (denom, ending_epoch))?;
    let unit_rewards = ending
        .cumulative_unit_rewards
        .checked_sub(&starting.cumulative_unit_rewards)?;
    Ok(unit_rewards.mul_int_truncate(staking.amount)?)
}

/// What a farmer could withdraw for `denom` right now, in whole coins.
pub fn entitlement(
    storage: &dyn Storage,
    farmer: &Addr,
    denom: &str,
) -> Result<Vec<Coin>, ContractError> {
    let Some(staking) = STAKINGS.may_load(storage, (denom, farmer))? else {
        return Ok(vec![]);
    };
    let current = current_epoch(storage, denom)?;
    let accrued = accrued_rewards(storage, denom, &staking, current.saturating_sub(1))?;
    let (coins, _) = accrued.truncate_decimal()?;
    Ok(coins)
}

/// Pays out a farmer's entitlement for `denom` from the rewards reserve and
/// restarts their accrual at the current epoch. The caller turns the returned
/// coins into a bank send. The fractional part stays in the outstanding
/// rewards as dust.
pub fn withdraw_rewards(
    storage: &mut dyn Storage,
    farmer: &Addr,
    denom: &str,
) -> Result<Vec<Coin>, ContractError> {
    let Some(mut staking) = STAKINGS.may_load(storage, (denom, farmer))? else {
        return Ok(vec![]);
    };
    let current = current_epoch(storage, denom)?;
    let accrued = accrued_rewards(storage, denom, &staking, current.saturating_sub(1))?;
    let (coins, _) = accrued.truncate_decimal()?;

    if !coins.is_empty() {
        let mut outstanding = outstanding_rewards(storage, denom)?;
        outstanding.rewards = outstanding
            .rewards
            .checked_sub(&DecCoins::from_coins(&coins))?;
        if outstanding.rewards.is_zero() {
            OUTSTANDING_REWARDS.remove(storage, denom);
        } else {
            OUTSTANDING_REWARDS.save(storage, denom, &outstanding)?;
        }
        bank::withdraw(storage, Account::RewardsReserve, &coins)?;
    }

    staking.starting_epoch = current;
    STAKINGS.save(storage, (denom, farmer), &staking)?;

    Ok(coins)
}
