use cosmwasm_std::{to_json_binary, Binary, Coin, Coins, Deps, Order, StdError, StdResult};
use cw_storage_plus::Bound;
use farming_common::PlanType;

use crate::bank::{self, Account};
use crate::genesis;
use crate::msg::{
    CurrentEpochResponse, EpochClockResponse, FarmingPoolResponse, HistoricalRewardsResponse,
    OutstandingRewardsResponse, RewardsResponse, StakingsResponse, TotalStakingsResponse,
};
use crate::rewards;
use crate::staking;
use crate::state::{Plan, CONFIG, CURRENT_EPOCH_DAYS, HISTORICAL_REWARDS, LAST_EPOCH_TIME, PLANS};

pub fn query_config(deps: Deps) -> StdResult<Binary> {
    let config = CONFIG.load(deps.storage)?;
    to_json_binary(&config)
}

pub fn query_plans(
    deps: Deps,
    plan_type: Option<PlanType>,
    farming_pool_address: Option<String>,
    termination_address: Option<String>,
    terminated: Option<bool>,
    start_after: Option<u64>,
    limit: Option<u32>,
) -> StdResult<Binary> {
    let farming_pool = farming_pool_address
        .map(|a| deps.api.addr_validate(&a))
        .transpose()?;
    let termination = termination_address
        .map(|a| deps.api.addr_validate(&a))
        .transpose()?;
    let limit = limit.unwrap_or(20).min(100) as usize;
    let start = start_after.map(Bound::exclusive);

    let plans = PLANS
        .range(deps.storage, start, None, Order::Ascending)
        .filter(|item| match item {
            Ok((_, plan)) => {
                plan_type.as_ref().map_or(true, |t| &plan.plan_type == t)
                    && farming_pool
                        .as_ref()
                        .map_or(true, |a| &plan.farming_pool_address == a)
                    && termination
                        .as_ref()
                        .map_or(true, |a| &plan.termination_address == a)
                    && terminated.map_or(true, |t| plan.terminated == t)
            }
            Err(_) => true,
        })
        .take(limit)
        .map(|item| item.map(|(_, plan)| plan))
        .collect::<StdResult<Vec<Plan>>>()?;

    to_json_binary(&plans)
}

pub fn query_plan(deps: Deps, plan_id: u64) -> StdResult<Binary> {
    let plan = PLANS
        .may_load(deps.storage, plan_id)?
        .ok_or_else(|| StdError::not_found(format!("plan {}", plan_id)))?;
    to_json_binary(&plan)
}

pub fn query_stakings(
    deps: Deps,
    farmer: String,
    staking_coin_denom: Option<String>,
) -> StdResult<Binary> {
    let farmer = deps.api.addr_validate(&farmer)?;
    let (staked, queued) = match staking_coin_denom {
        Some(denom) => (vec![denom.clone()], vec![denom]),
        None => (
            staking::staked_denoms(deps.storage, &farmer)?,
            staking::queued_denoms(deps.storage, &farmer)?,
        ),
    };

    let mut staked_coins = vec![];
    for denom in staked {
        let amount = staking::staked_amount(deps.storage, &denom, &farmer)?;
        if !amount.is_zero() {
            staked_coins.push(Coin { denom, amount });
        }
    }
    let mut queued_coins = vec![];
    for denom in queued {
        let amount = staking::queued_amount(deps.storage, &denom, &farmer)?;
        if !amount.is_zero() {
            queued_coins.push(Coin { denom, amount });
        }
    }

    to_json_binary(&StakingsResponse {
        staked_coins,
        queued_coins,
    })
}

pub fn query_total_stakings(deps: Deps, staking_coin_denom: String) -> StdResult<Binary> {
    let amount = staking::total_stakings(deps.storage, &staking_coin_denom)?;
    to_json_binary(&TotalStakingsResponse { amount })
}

/// Withdrawable rewards of a farmer, for one denom or summed over every
/// denom they have staked.
pub fn query_rewards(
    deps: Deps,
    farmer: String,
    staking_coin_denom: Option<String>,
) -> StdResult<Binary> {
    let farmer = deps.api.addr_validate(&farmer)?;
    let denoms = match staking_coin_denom {
        Some(denom) => vec![denom],
        None => staking::staked_denoms(deps.storage, &farmer)?,
    };

    let mut total = Coins::default();
    for denom in denoms {
        let coins = rewards::entitlement(deps.storage, &farmer, &denom)
            .map_err(|e| StdError::generic_err(e.to_string()))?;
        for coin in coins {
            total.add(coin)?;
        }
    }

    to_json_binary(&RewardsResponse {
        rewards: total.into_vec(),
    })
}

pub fn query_historical_rewards(
    deps: Deps,
    staking_coin_denom: String,
    epoch: u64,
) -> StdResult<Binary> {
    let historical = HISTORICAL_REWARDS
        .may_load(deps.storage, (staking_coin_denom.as_str(), epoch))?
        .ok_or_else(|| {
            StdError::not_found(format!(
                "historical rewards of {} at epoch {}",
                staking_coin_denom, epoch
            ))
        })?;
    to_json_binary(&HistoricalRewardsResponse {
        cumulative_unit_rewards: historical.cumulative_unit_rewards,
    })
}

pub fn query_outstanding_rewards(deps: Deps, staking_coin_denom: String) -> StdResult<Binary> {
    let outstanding = rewards::outstanding_rewards(deps.storage, &staking_coin_denom)?;
    to_json_binary(&OutstandingRewardsResponse {
        rewards: outstanding.rewards,
    })
}

pub fn query_current_epoch(deps: Deps, staking_coin_denom: String) -> StdResult<Binary> {
    let current_epoch = rewards::current_epoch(deps.storage, &staking_coin_denom)?;
    to_json_binary(&CurrentEpochResponse { current_epoch })
}

pub fn query_epoch_clock(deps: Deps) -> StdResult<Binary> {
    let config = CONFIG.load(deps.storage)?;
    to_json_binary(&EpochClockResponse {
        last_epoch_time: LAST_EPOCH_TIME.load(deps.storage)?,
        current_epoch_days: CURRENT_EPOCH_DAYS.load(deps.storage)?,
        next_epoch_days: config.params.next_epoch_days,
    })
}

pub fn query_farming_pool(deps: Deps, address: String) -> StdResult<Binary> {
    let addr = deps.api.addr_validate(&address)?;
    let balances = bank::balances(deps.storage, Account::FarmingPool(&addr))?;
    to_json_binary(&FarmingPoolResponse { address, balances })
}

pub fn query_export_genesis(deps: Deps) -> StdResult<Binary> {
    let state = genesis::export_genesis(deps.storage)?;
    to_json_binary(&state)
}
