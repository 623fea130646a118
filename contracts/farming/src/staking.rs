use cosmwasm_std::{Addr, Coin, Coins, Order, StdResult, Storage, Uint128};
use farming_common::validate_denom;

use crate::bank::{self, Account};
use crate::error::ContractError;
use crate::rewards;
use crate::state::{
    QueuedStaking, Staking, QUEUED_STAKINGS, QUEUED_STAKINGS_BY_FARMER, STAKINGS,
    STAKINGS_BY_FARMER, TOTAL_STAKINGS,
};

/// Rewards paid to a farmer while their queued coins were promoted.
pub struct PromotionPayout {
    pub farmer: Addr,
    pub rewards: Vec<Coin>,
}

pub fn total_stakings(storage: &dyn Storage, denom: &str) -> StdResult<Uint128> {
    Ok(TOTAL_STAKINGS.may_load(storage, denom)?.unwrap_or_default())
}

fn increase_total_stakings(
    storage: &mut dyn Storage,
    denom: &str,
    amount: Uint128,
) -> Result<(), ContractError> {
    let total = total_stakings(storage, denom)?.checked_add(amount)?;
    TOTAL_STAKINGS.save(storage, denom, &total)?;
    Ok(())
}

fn decrease_total_stakings(
    storage: &mut dyn Storage,
    denom: &str,
    amount: Uint128,
) -> Result<(), ContractError> {
    let total = total_stakings(storage, denom)?.checked_sub(amount)?;
    if total.is_zero() {
        TOTAL_STAKINGS.remove(storage, denom);
    } else {
        TOTAL_STAKINGS.save(storage, denom, &total)?;
    }
    Ok(())
}

fn save_staking(
    storage: &mut dyn Storage,
    denom: &str,
    farmer: &Addr,
    staking: &Staking,
) -> StdResult<()> {
    if staking.amount.is_zero() {
        STAKINGS.remove(storage, (denom, farmer));
        STAKINGS_BY_FARMER.remove(storage, (farmer, denom));
        return Ok(());
    }
    STAKINGS.save(storage, (denom, farmer), staking)?;
    STAKINGS_BY_FARMER.save(storage, (farmer, denom), &())
}

fn save_queued_staking(
    storage: &mut dyn Storage,
    denom: &str,
    farmer: &Addr,
    amount: Uint128,
) -> StdResult<()> {
    if amount.is_zero() {
        QUEUED_STAKINGS.remove(storage, (denom, farmer));
        QUEUED_STAKINGS_BY_FARMER.remove(storage, (farmer, denom));
        return Ok(());
    }
    QUEUED_STAKINGS.save(storage, (denom, farmer), &QueuedStaking { amount })?;
    QUEUED_STAKINGS_BY_FARMER.save(storage, (farmer, denom), &())
}

pub fn queued_amount(storage: &dyn Storage, denom: &str, farmer: &Addr) -> StdResult<Uint128> {
    Ok(QUEUED_STAKINGS
        .may_load(storage, (denom, farmer))?
        .map(|q| q.amount)
        .unwrap_or_default())
}

pub fn staked_amount(storage: &dyn Storage, denom: &str, farmer: &Addr) -> StdResult<Uint128> {
    Ok(STAKINGS
        .may_load(storage, (denom, farmer))?
        .map(|s| s.amount)
        .unwrap_or_default())
}

/// Denoms a farmer has promoted staking in, ascending.
pub fn staked_denoms(storage: &dyn Storage, farmer: &Addr) -> StdResult<Vec<String>> {
    STAKINGS_BY_FARMER
        .prefix(farmer)
        .keys(storage, None, None, Order::Ascending)
        .collect()
}

pub fn queued_denoms(storage: &dyn Storage, farmer: &Addr) -> StdResult<Vec<String>> {
    QUEUED_STAKINGS_BY_FARMER
        .prefix(farmer)
        .keys(storage, None, None, Order::Ascending)
        .collect()
}

/// Queues `coins` for the farmer. They start earning after the next epoch
/// advance, so a deposit right before an allocation gets nothing from it.
pub fn stake(storage: &mut dyn Storage, farmer: &Addr, coins: &[Coin]) -> Result<(), ContractError> {
    if coins.is_empty() {
        return Err(ContractError::InvalidAmount {
            reason: "no coins to stake".to_string(),
        });
    }
    for coin in coins {
        validate_denom(&coin.denom)?;
        if coin.amount.is_zero() {
            return Err(ContractError::InvalidAmount {
                reason: format!("stake amount of {} must be positive", coin.denom),
            });
        }
    }

    for coin in coins {
        let queued = queued_amount(storage, &coin.denom, farmer)?.checked_add(coin.amount)?;
        save_queued_staking(storage, &coin.denom, farmer, queued)?;
    }
    bank::deposit(storage, Account::StakingReserve, coins)
}

/// Takes `coins` back out of the farmer's queued and staked balances.
/// Returns the unstaked coins merged per denom, and the rewards that were
/// settled on the way. Queued coins are used first since they have not
/// started earning yet.
pub fn unstake(
    storage: &mut dyn Storage,
    farmer: &Addr,
    coins: &[Coin],
) -> Result<(Vec<Coin>, Vec<Coin>), ContractError> {
    if coins.is_empty() {
        return Err(ContractError::InvalidAmount {
            reason: "no coins to unstake".to_string(),
        });
    }
    // repeated denoms are merged so each is checked against its full request
    let mut requested = Coins::default();
    for coin in coins {
        if coin.amount.is_zero() {
            return Err(ContractError::InvalidAmount {
                reason: format!("unstake amount of {} must be positive", coin.denom),
            });
        }
        requested.add(coin.clone())?;
    }
    let coins = requested.into_vec();

    for coin in &coins {
        let available = staked_amount(storage, &coin.denom, farmer)?
            .checked_add(queued_amount(storage, &coin.denom, farmer)?)?;
        if available < coin.amount {
            return Err(ContractError::InsufficientStake {
                denom: coin.denom.clone(),
                requested: coin.amount,
                available,
            });
        }
    }

    let mut rewards = Coins::default();
    for coin in &coins {
        let denom = coin.denom.as_str();
        for reward in rewards::withdraw_rewards(storage, farmer, denom)? {
            rewards.add(reward)?;
        }

        let queued = queued_amount(storage, denom, farmer)?;
        let from_queue = queued.min(coin.amount);
        let from_staking = coin.amount - from_queue;
        save_queued_staking(storage, denom, farmer, queued - from_queue)?;

        if !from_staking.is_zero() {
            let mut staking = STAKINGS.load(storage, (denom, farmer))?;
            staking.amount = staking.amount.checked_sub(from_staking)?;
            staking.starting_epoch = rewards::current_epoch(storage, denom)?;
            save_staking(storage, denom, farmer, &staking)?;
            decrease_total_stakings(storage, denom, from_staking)?;
        }
    }
    bank::withdraw(storage, Account::StakingReserve, &coins)?;

    Ok((coins, rewards.into_vec()))
}

/// Settles pending rewards for each denom. Every denom must have a staking
/// entry; nothing is paid if any of them is missing.
pub fn harvest(
    storage: &mut dyn Storage,
    farmer: &Addr,
    denoms: &[String],
) -> Result<Vec<Coin>, ContractError> {
    if denoms.is_empty() {
        return Err(ContractError::EmptyHarvest);
    }
    for denom in denoms {
        if !STAKINGS.has(storage, (denom.as_str(), farmer)) {
            return Err(ContractError::NoStaking {
                farmer: farmer.to_string(),
                denom: denom.clone(),
            });
        }
    }

    let mut rewards = Coins::default();
    for denom in denoms {
        for reward in rewards::withdraw_rewards(storage, farmer, denom)? {
            rewards.add(reward)?;
        }
    }
    Ok(rewards.into_vec())
}

/// Moves every queued staking into the staked set, starting at the denom's
/// current epoch. A farmer that already had staking in the denom has its
/// pending rewards paid first so the merged amount can restart cleanly.
pub fn promote_queued(storage: &mut dyn Storage) -> Result<Vec<PromotionPayout>, ContractError> {
    let queued: Vec<((String, Addr), QueuedStaking)> = QUEUED_STAKINGS
        .range(storage, None, None, Order::Ascending)
        .collect::<StdResult<_>>()?;

    let mut payouts = vec![];
    for ((denom, farmer), queued_staking) in queued {
        let current = rewards::initialize_denom(storage, &denom)?;

        let amount = match STAKINGS.may_load(storage, (denom.as_str(), &farmer))? {
            Some(existing) => {
                let paid = rewards::withdraw_rewards(storage, &farmer, &denom)?;
                if !paid.is_empty() {
                    payouts.push(PromotionPayout {
                        farmer: farmer.clone(),
                        rewards: paid,
                    });
                }
                existing.amount.checked_add(queued_staking.amount)?
            }
            None => queued_staking.amount,
        };

        save_staking(
            storage,
            &denom,
            &farmer,
            &Staking {
                amount,
                starting_epoch: current,
            },
        )?;
        save_queued_staking(storage, &denom, &farmer, Uint128::zero())?;
        increase_total_stakings(storage, &denom, queued_staking.amount)?;
    }

    Ok(payouts)
}
