use std::collections::BTreeMap;

use cosmwasm_std::{Addr, Coin, Coins, Decimal256, StdResult, Storage, Timestamp, Uint128};
use farming_common::DecCoins;

use crate::bank::{self, Account};
use crate::error::ContractError;
use crate::plan::{self, Refund};
use crate::rewards;
use crate::staking::{self, PromotionPayout};
use crate::state::{CONFIG, CURRENT_EPOCH_DAYS, LAST_EPOCH_TIME, PLANS};

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Epochs are counted in whole days of block time, so an epoch that started
/// late in a day still ends at a day boundary.
pub fn is_epoch_due(last_epoch_time: Timestamp, epoch_days: u32, now: Timestamp) -> bool {
    let last_day = last_epoch_time.seconds() / SECONDS_PER_DAY;
    now.seconds() / SECONDS_PER_DAY >= last_day + u64::from(epoch_days)
}

pub fn epoch_due(storage: &dyn Storage, now: Timestamp) -> StdResult<bool> {
    let last_epoch_time = LAST_EPOCH_TIME.load(storage)?;
    let epoch_days = CURRENT_EPOCH_DAYS.load(storage)?;
    Ok(is_epoch_due(last_epoch_time, epoch_days, now))
}

/// Coins a plan moves out of its farming pool this epoch.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanAllocation {
    pub plan_id: u64,
    pub farming_pool: Addr,
    pub coins: Vec<Coin>,
}

/// Everything one epoch would distribute. Computed without touching storage
/// so a failure leaves nothing half-written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Allocations {
    pub plans: Vec<PlanAllocation>,
    /// staking coin denom -> (reward coins, total staked at allocation)
    pub denoms: BTreeMap<String, (Vec<Coin>, Uint128)>,
}

/// Rewards recorded for one staking coin denom.
#[derive(Clone, Debug, PartialEq)]
pub struct DenomAllocation {
    pub staking_coin_denom: String,
    pub epoch: u64,
    pub coins: Vec<Coin>,
    pub total_staked: Uint128,
}

pub struct EpochOutcome {
    pub plans: Vec<PlanAllocation>,
    pub allocations: Vec<DenomAllocation>,
    pub payouts: Vec<PromotionPayout>,
    pub terminated: Vec<(u64, Option<Refund>)>,
}

pub fn compute_allocations(
    storage: &dyn Storage,
    now: Timestamp,
) -> Result<Allocations, ContractError> {
    let mut pools: BTreeMap<Addr, Vec<Coin>> = BTreeMap::new();
    let mut denoms: BTreeMap<String, (Coins, Uint128)> = BTreeMap::new();
    let mut plans = vec![];

    for plan in plan::active_plans(storage, now)? {
        if !pools.contains_key(&plan.farming_pool_address) {
            let balance =
                bank::balances(storage, Account::FarmingPool(&plan.farming_pool_address))?;
            pools.insert(plan.farming_pool_address.clone(), balance);
        }
        let remaining = pools
            .get(&plan.farming_pool_address)
            .cloned()
            .unwrap_or_default();

        let emission = plan::epoch_emission(&plan, &remaining)?;
        if emission.is_empty() {
            continue;
        }
        let emission = DecCoins::from_coins(&emission);

        let mut debit = Coins::default();
        for weight in plan.staking_coin_weights.iter() {
            let total_staked = staking::total_stakings(storage, &weight.denom)?;
            // nobody to pay: the share stays in the pool
            if total_staked.is_zero() {
                continue;
            }
            let fraction = weight_fraction(&plan.staking_coin_weights, &weight.denom)?;
            let (share, _) = emission.mul_dec_truncate(fraction)?.truncate_decimal()?;
            if share.is_empty() {
                continue;
            }

            let entry = denoms
                .entry(weight.denom.clone())
                .or_insert_with(|| (Coins::default(), total_staked));
            for coin in share {
                entry.0.add(coin.clone())?;
                debit.add(coin)?;
            }
        }

        if debit.is_empty() {
            continue;
        }
        let debit = debit.into_vec();
        pools.insert(
            plan.farming_pool_address.clone(),
            subtract_coins(&remaining, &debit)?,
        );
        plans.push(PlanAllocation {
            plan_id: plan.id,
            farming_pool: plan.farming_pool_address.clone(),
            coins: debit,
        });
    }

    Ok(Allocations {
        plans,
        denoms: denoms
            .into_iter()
            .map(|(denom, (coins, total))| (denom, (coins.into_vec(), total)))
            .collect(),
    })
}

fn to_coins(coins: &[Coin]) -> StdResult<Coins> {
    let mut set = Coins::default();
    for coin in coins {
        set.add(coin.clone())?;
    }
    Ok(set)
}

fn subtract_coins(balance: &[Coin], coins: &[Coin]) -> StdResult<Vec<Coin>> {
    let mut left = to_coins(balance)?;
    for coin in coins {
        left.sub(coin.clone())?;
    }
    Ok(left.into_vec())
}

/// Moves the computed rewards into the rewards reserve and records them in
/// the historical rewards of each denom.
pub fn apply_allocations(
    storage: &mut dyn Storage,
    allocations: &Allocations,
    now: Timestamp,
) -> Result<Vec<DenomAllocation>, ContractError> {
    for alloc in &allocations.plans {
        bank::transfer(
            storage,
            Account::FarmingPool(&alloc.farming_pool),
            Account::RewardsReserve,
            &alloc.coins,
        )?;

        let mut plan = plan::load_plan(storage, alloc.plan_id)?;
        let mut distributed = to_coins(&plan.distributed_coins)?;
        for coin in &alloc.coins {
            distributed.add(coin.clone())?;
        }
        plan.distributed_coins = distributed.into_vec();
        plan.last_distribution_time = Some(now);
        PLANS.save(storage, plan.id, &plan)?;
    }

    let mut recorded = vec![];
    for (denom, (coins, total_staked)) in &allocations.denoms {
        let epoch = rewards::record_allocation(storage, denom, coins, *total_staked)?;
        recorded.push(DenomAllocation {
            staking_coin_denom: denom.clone(),
            epoch,
            coins: coins.clone(),
            total_staked: *total_staked,
        });
    }
    Ok(recorded)
}

/// Runs one full epoch tick: allocate, promote queued stakings, move the
/// clock and terminate plans that have ended.
pub fn advance_epoch(
    storage: &mut dyn Storage,
    now: Timestamp,
) -> Result<EpochOutcome, ContractError> {
    let computed = compute_allocations(storage, now)?;
    let allocations = apply_allocations(storage, &computed, now)?;

    let payouts = staking::promote_queued(storage)?;

    let config = CONFIG.load(storage)?;
    LAST_EPOCH_TIME.save(storage, &now)?;
    CURRENT_EPOCH_DAYS.save(storage, &config.params.next_epoch_days)?;

    let terminated = plan::terminate_ended_plans(storage, now)?;

    Ok(EpochOutcome {
        plans: computed.plans,
        allocations,
        payouts,
        terminated,
    })
}

/// Weight fraction of `denom` in a weight table. Zero when absent.
pub fn weight_fraction(weights: &DecCoins, denom: &str) -> Result<Decimal256, ContractError> {
    let total = weights.total_amount()?;
    if total.is_zero() {
        return Ok(Decimal256::zero());
    }
    weights
        .amount_of(denom)
        .checked_div(total)
        .map_err(|e| ContractError::ArithmeticOverflow {
            reason: e.to_string(),
        })
}
