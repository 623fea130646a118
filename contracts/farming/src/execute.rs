use cosmwasm_std::{
    Coin, Coins, DecCoin, Decimal, DepsMut, Env, Event, MessageInfo, Response, StdResult,
    Timestamp,
};
use farming_common::{validate_coins, PlanType};

use crate::bank::{self, Account};
use crate::epoch;
use crate::error::ContractError;
use crate::msg::{AddPlanRequest, DeletePlanRequest, UpdatePlanRequest};
use crate::plan;
use crate::staking;
use crate::state::{DistributionMethod, Plan, CONFIG};

pub(crate) fn coins_to_string(coins: &[Coin]) -> String {
    coins
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn same_coins(a: &[Coin], b: &[Coin]) -> StdResult<bool> {
    let mut left = Coins::default();
    for coin in a {
        left.add(coin.clone())?;
    }
    let mut right = Coins::default();
    for coin in b {
        right.add(coin.clone())?;
    }
    Ok(left == right)
}

/// Queue the sent coins for staking.
pub fn stake(deps: DepsMut, _env: Env, info: MessageInfo) -> Result<Response, ContractError> {
    if info.funds.is_empty() {
        return Err(ContractError::InvalidFunds {
            reason: "send the coins to stake".to_string(),
        });
    }
    staking::stake(deps.storage, &info.sender, &info.funds)?;

    let amount = coins_to_string(&info.funds);
    Ok(Response::new()
        .add_attribute("action", "stake")
        .add_attribute("farmer", info.sender.to_string())
        .add_attribute("amount", amount.clone())
        .add_event(
            Event::new("farming_stake")
                .add_attribute("farmer", info.sender.to_string())
                .add_attribute("amount", amount),
        ))
}

/// Unstake coins and pay out the rewards settled along the way.
pub fn unstake(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    amount: Vec<Coin>,
) -> Result<Response, ContractError> {
    if !info.funds.is_empty() {
        return Err(ContractError::InvalidFunds {
            reason: "unstake does not accept funds".to_string(),
        });
    }
    let (amount, rewards) = staking::unstake(deps.storage, &info.sender, &amount)?;

    let unstaked = coins_to_string(&amount);
    let rewards_str = coins_to_string(&rewards);
    Ok(Response::new()
        .add_messages(bank::send_msg(&info.sender, amount))
        .add_messages(bank::send_msg(&info.sender, rewards))
        .add_attribute("action", "unstake")
        .add_attribute("farmer", info.sender.to_string())
        .add_attribute("amount", unstaked.clone())
        .add_event(
            Event::new("farming_unstake")
                .add_attribute("farmer", info.sender.to_string())
                .add_attribute("amount", unstaked)
                .add_attribute("rewards", rewards_str),
        ))
}

/// Withdraw accrued rewards for the given staking coin denoms.
pub fn harvest(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    staking_coin_denoms: Vec<String>,
) -> Result<Response, ContractError> {
    let rewards = staking::harvest(deps.storage, &info.sender, &staking_coin_denoms)?;

    let rewards_str = coins_to_string(&rewards);
    Ok(Response::new()
        .add_messages(bank::send_msg(&info.sender, rewards))
        .add_attribute("action", "harvest")
        .add_attribute("farmer", info.sender.to_string())
        .add_attribute("rewards", rewards_str.clone())
        .add_event(
            Event::new("farming_harvest")
                .add_attribute("farmer", info.sender.to_string())
                .add_attribute("staking_coin_denoms", staking_coin_denoms.join(","))
                .add_attribute("rewards", rewards_str),
        ))
}

/// Run the epoch tick. Anyone can call it once the epoch is due; the admin can
/// force it early when early advances are enabled.
pub fn advance_epoch(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let now = env.block.time;
    if !epoch::epoch_due(deps.storage, now)? {
        let config = CONFIG.load(deps.storage)?;
        if !config.enable_advance_epoch || info.sender != config.admin {
            return Err(ContractError::EpochNotReady);
        }
    }

    let outcome = epoch::advance_epoch(deps.storage, now)?;

    let mut response = Response::new()
        .add_attribute("action", "advance_epoch")
        .add_attribute("sender", info.sender.to_string());

    for alloc in &outcome.plans {
        response = response.add_event(
            Event::new("farming_plan_distributed")
                .add_attribute("plan_id", alloc.plan_id.to_string())
                .add_attribute("farming_pool_address", alloc.farming_pool.to_string())
                .add_attribute("amount", coins_to_string(&alloc.coins)),
        );
    }
    for alloc in &outcome.allocations {
        response = response.add_event(
            Event::new("farming_rewards_allocated")
                .add_attribute("staking_coin_denom", alloc.staking_coin_denom.clone())
                .add_attribute("epoch", alloc.epoch.to_string())
                .add_attribute("amount", coins_to_string(&alloc.coins))
                .add_attribute("total_staked", alloc.total_staked.to_string()),
        );
    }
    for payout in outcome.payouts {
        response = response.add_messages(bank::send_msg(&payout.farmer, payout.rewards));
    }
    for (plan_id, refund) in outcome.terminated {
        let mut event =
            Event::new("farming_plan_terminated").add_attribute("plan_id", plan_id.to_string());
        if let Some(refund) = refund {
            event = event
                .add_attribute("termination_address", refund.to.to_string())
                .add_attribute("refund", coins_to_string(&refund.coins));
            response = response.add_messages(bank::send_msg(&refund.to, refund.coins));
        }
        response = response.add_event(event);
    }

    Ok(response.add_event(
        Event::new("farming_epoch_advanced")
            .add_attribute("last_epoch_time", now.seconds().to_string())
            .add_attribute("allocated_denoms", outcome.allocations.len().to_string()),
    ))
}

fn create_private_plan(
    deps: DepsMut,
    info: MessageInfo,
    name: String,
    staking_coin_weights: Vec<DecCoin>,
    start_time: Timestamp,
    end_time: Timestamp,
    distribution: DistributionMethod,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let fee = config.params.private_plan_creation_fee;
    if !same_coins(&info.funds, &fee)? {
        return Err(ContractError::InvalidFunds {
            reason: format!(
                "private plan creation fee of {} must be sent exactly",
                coins_to_string(&fee)
            ),
        });
    }

    let id = plan::next_plan_id(deps.storage)?;
    let farming_pool_address = plan::derive_farming_pool_address(deps.api, id, &name)?;
    let new_plan = Plan {
        id,
        name,
        plan_type: PlanType::Private,
        farming_pool_address,
        termination_address: info.sender.clone(),
        staking_coin_weights: plan::parse_weights(staking_coin_weights)?,
        start_time,
        end_time,
        distribution,
        terminated: false,
        last_distribution_time: None,
        distributed_coins: vec![],
    };
    plan::create_plan(deps.storage, &new_plan)?;

    Ok(Response::new()
        .add_messages(bank::send_msg(&config.params.farming_fee_collector, fee))
        .add_attribute("action", "create_private_plan")
        .add_attribute("plan_id", id.to_string())
        .add_attribute("creator", info.sender.to_string())
        .add_event(plan_event("farming_plan_created", &new_plan)))
}

fn plan_event(ty: &str, plan: &Plan) -> Event {
    Event::new(ty)
        .add_attribute("plan_id", plan.id.to_string())
        .add_attribute("plan_type", plan.plan_type.as_str())
        .add_attribute("farming_pool_address", plan.farming_pool_address.to_string())
        .add_attribute("termination_address", plan.termination_address.to_string())
        .add_attribute("staking_coin_weights", plan.staking_coin_weights.to_string())
}

#[allow(clippy::too_many_arguments)]
pub fn create_fixed_amount_plan(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    name: String,
    staking_coin_weights: Vec<DecCoin>,
    start_time: Timestamp,
    end_time: Timestamp,
    epoch_amount: Vec<Coin>,
) -> Result<Response, ContractError> {
    create_private_plan(
        deps,
        info,
        name,
        staking_coin_weights,
        start_time,
        end_time,
        DistributionMethod::FixedAmount { epoch_amount },
    )
}

#[allow(clippy::too_many_arguments)]
pub fn create_ratio_plan(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    name: String,
    staking_coin_weights: Vec<DecCoin>,
    start_time: Timestamp,
    end_time: Timestamp,
    epoch_ratio: Decimal,
) -> Result<Response, ContractError> {
    create_private_plan(
        deps,
        info,
        name,
        staking_coin_weights,
        start_time,
        end_time,
        DistributionMethod::Ratio { epoch_ratio },
    )
}

/// Apply a public plan proposal that passed governance. Admin only.
pub fn public_plan_proposal(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    add: Vec<AddPlanRequest>,
    update: Vec<UpdatePlanRequest>,
    delete: Vec<DeletePlanRequest>,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized {
            reason: "only admin can apply public plan proposals".to_string(),
        });
    }
    if add.is_empty() && update.is_empty() && delete.is_empty() {
        return Err(ContractError::InvalidPlan {
            reason: "proposal must contain at least one request".to_string(),
        });
    }

    let mut response = Response::new().add_attribute("action", "public_plan_proposal");

    for req in add {
        let id = plan::next_plan_id(deps.storage)?;
        let new_plan = plan::public_plan_from_request(deps.api, id, req)?;
        plan::create_plan(deps.storage, &new_plan)?;
        response = response.add_event(plan_event("farming_plan_created", &new_plan));
    }
    for req in update {
        let updated = plan::update_public_plan(deps.storage, deps.api, req)?;
        response = response.add_event(plan_event("farming_plan_updated", &updated));
    }
    for req in delete {
        let deleted = plan::delete_public_plan(deps.storage, req.plan_id)?;
        response = response.add_event(
            Event::new("farming_plan_deleted").add_attribute("plan_id", deleted.id.to_string()),
        );
    }

    Ok(response)
}

/// Deposit the sent coins into a farming pool.
pub fn fund_farming_pool(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    farming_pool_address: String,
) -> Result<Response, ContractError> {
    let pool = deps.api.addr_validate(&farming_pool_address)?;
    if info.funds.is_empty() {
        return Err(ContractError::InvalidFunds {
            reason: "send the coins to fund the farming pool with".to_string(),
        });
    }
    validate_coins(&info.funds)?;
    if plan::is_closed_pool(deps.storage, &pool)? {
        return Err(ContractError::FarmingPoolClosed {
            address: pool.to_string(),
        });
    }
    bank::deposit(deps.storage, Account::FarmingPool(&pool), &info.funds)?;

    let amount = coins_to_string(&info.funds);
    Ok(Response::new()
        .add_attribute("action", "fund_farming_pool")
        .add_attribute("farming_pool_address", pool.to_string())
        .add_attribute("amount", amount.clone())
        .add_event(
            Event::new("farming_pool_funded")
                .add_attribute("farming_pool_address", pool.to_string())
                .add_attribute("sender", info.sender.to_string())
                .add_attribute("amount", amount),
        ))
}

/// Withdraw coins from the sender's own farming pool.
pub fn withdraw_farming_pool(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    amount: Vec<Coin>,
) -> Result<Response, ContractError> {
    if amount.is_empty() {
        return Err(ContractError::InvalidAmount {
            reason: "no coins to withdraw".to_string(),
        });
    }
    validate_coins(&amount)?;
    bank::withdraw(deps.storage, Account::FarmingPool(&info.sender), &amount)?;

    let amount_str = coins_to_string(&amount);
    Ok(Response::new()
        .add_messages(bank::send_msg(&info.sender, amount))
        .add_attribute("action", "withdraw_farming_pool")
        .add_attribute("farming_pool_address", info.sender.to_string())
        .add_attribute("amount", amount_str.clone())
        .add_event(
            Event::new("farming_pool_withdrawn")
                .add_attribute("farming_pool_address", info.sender.to_string())
                .add_attribute("amount", amount_str),
        ))
}

/// Update params. Admin only. A new epoch length applies after the next
/// epoch advance.
pub fn update_params(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    private_plan_creation_fee: Option<Vec<Coin>>,
    next_epoch_days: Option<u32>,
    farming_fee_collector: Option<String>,
) -> Result<Response, ContractError> {
    let mut config = CONFIG.load(deps.storage)?;
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized {
            reason: "only admin can update params".to_string(),
        });
    }

    if let Some(fee) = private_plan_creation_fee {
        validate_coins(&fee).map_err(|e| ContractError::InvalidParams {
            reason: format!("invalid private plan creation fee: {}", e),
        })?;
        config.params.private_plan_creation_fee = fee;
    }
    if let Some(days) = next_epoch_days {
        if days == 0 {
            return Err(ContractError::InvalidParams {
                reason: "next epoch days must be positive: 0".to_string(),
            });
        }
        config.params.next_epoch_days = days;
    }
    if let Some(collector) = farming_fee_collector {
        config.params.farming_fee_collector = deps.api.addr_validate(&collector)?;
    }

    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("action", "update_params")
        .add_attribute(
            "private_plan_creation_fee",
            coins_to_string(&config.params.private_plan_creation_fee),
        )
        .add_attribute("next_epoch_days", config.params.next_epoch_days.to_string())
        .add_attribute(
            "farming_fee_collector",
            config.params.farming_fee_collector.to_string(),
        ))
}
