use cosmwasm_std::{
    Addr, Api, CanonicalAddr, Coin, Decimal, DecCoin, Order, StdResult, Storage, Timestamp,
};
use farming_common::{validate_coins, DecCoins, PlanType};
use sha2::{Digest, Sha256};

use crate::bank::{self, Account};
use crate::error::ContractError;
use crate::msg::{AddPlanRequest, UpdatePlanRequest};
use crate::state::{DistributionMethod, Plan, GLOBAL_PLAN_ID, PLANS};

pub const MAX_NAME_LENGTH: usize = 140;

/// Farming pool coins handed back when a private plan terminates.
pub struct Refund {
    pub to: Addr,
    pub coins: Vec<Coin>,
}

pub fn next_plan_id(storage: &dyn Storage) -> StdResult<u64> {
    Ok(GLOBAL_PLAN_ID.may_load(storage)?.unwrap_or_default() + 1)
}

/// Validates and stores a new plan under the next plan id.
pub fn create_plan(storage: &mut dyn Storage, plan: &Plan) -> Result<(), ContractError> {
    let expected = next_plan_id(storage)?;
    if plan.id != expected {
        return Err(ContractError::InvalidPlan {
            reason: format!("plan id {} does not match next plan id {}", plan.id, expected),
        });
    }
    validate_plan(plan)?;
    validate_total_epoch_ratio(storage, plan)?;

    PLANS.save(storage, plan.id, plan)?;
    GLOBAL_PLAN_ID.save(storage, &plan.id)?;
    Ok(())
}

pub fn load_plan(storage: &dyn Storage, plan_id: u64) -> Result<Plan, ContractError> {
    PLANS
        .may_load(storage, plan_id)?
        .ok_or(ContractError::PlanNotFound { plan_id })
}

pub fn parse_weights(weights: Vec<DecCoin>) -> Result<DecCoins, ContractError> {
    DecCoins::try_from_vec(weights).map_err(|e| ContractError::InvalidPlan {
        reason: format!("invalid staking coin weights: {}", e),
    })
}

/// Exactly one of the two distribution fields must be set.
pub fn distribution_method(
    epoch_amount: Option<Vec<Coin>>,
    epoch_ratio: Option<Decimal>,
) -> Result<DistributionMethod, ContractError> {
    match (epoch_amount, epoch_ratio) {
        (Some(epoch_amount), None) => Ok(DistributionMethod::FixedAmount { epoch_amount }),
        (None, Some(epoch_ratio)) => Ok(DistributionMethod::Ratio { epoch_ratio }),
        _ => Err(ContractError::InvalidPlan {
            reason: "exactly one of epoch amount and epoch ratio must be set".to_string(),
        }),
    }
}

pub fn validate_plan(plan: &Plan) -> Result<(), ContractError> {
    let invalid = |reason: String| Err(ContractError::InvalidPlan { reason });

    if plan.name.trim().is_empty() {
        return invalid("plan name must not be empty".to_string());
    }
    if plan.name.chars().count() > MAX_NAME_LENGTH {
        return invalid(format!(
            "plan name must not be longer than {}",
            MAX_NAME_LENGTH
        ));
    }
    if plan.staking_coin_weights.is_empty() {
        return invalid("staking coin weights must not be empty".to_string());
    }
    if plan.start_time >= plan.end_time {
        return invalid("end time must be after start time".to_string());
    }

    match &plan.distribution {
        DistributionMethod::FixedAmount { epoch_amount } => {
            if epoch_amount.is_empty() {
                return invalid("epoch amount must not be empty".to_string());
            }
            if let Err(e) = validate_coins(epoch_amount) {
                return invalid(format!("invalid epoch amount: {}", e));
            }
        }
        DistributionMethod::Ratio { epoch_ratio } => {
            if epoch_ratio.is_zero() || *epoch_ratio > Decimal::one() {
                return invalid(format!(
                    "epoch ratio must be in (0, 1], got {}",
                    epoch_ratio
                ));
            }
        }
    }
    Ok(())
}

/// The ratios of all live ratio plans drawing from one farming pool must not
/// add up to more than 1. `plan` replaces any stored plan with the same id.
pub fn validate_total_epoch_ratio(storage: &dyn Storage, plan: &Plan) -> Result<(), ContractError> {
    let DistributionMethod::Ratio { epoch_ratio } = plan.distribution else {
        return Ok(());
    };

    let mut total = epoch_ratio;
    for item in PLANS.range(storage, None, None, Order::Ascending) {
        let (id, other) = item?;
        if id == plan.id
            || other.terminated
            || other.farming_pool_address != plan.farming_pool_address
        {
            continue;
        }
        if let DistributionMethod::Ratio { epoch_ratio } = other.distribution {
            total = total.checked_add(epoch_ratio)?;
        }
    }

    if total > Decimal::one() {
        return Err(ContractError::EpochRatioExceeded {
            farming_pool: plan.farming_pool_address.to_string(),
            total,
        });
    }
    Ok(())
}

/// Plans emitting at `now`, in id order.
pub fn active_plans(storage: &dyn Storage, now: Timestamp) -> StdResult<Vec<Plan>> {
    PLANS
        .range(storage, None, None, Order::Ascending)
        .filter_map(|item| match item {
            Ok((_, plan)) if !plan.is_active_at(now) => None,
            Ok((_, plan)) => Some(Ok(plan)),
            Err(e) => Some(Err(e)),
        })
        .collect()
}

/// True when every plan using `pool` is a terminated private plan. Such a
/// pool has no key holder and its termination refund has already been paid.
pub fn is_closed_pool(storage: &dyn Storage, pool: &Addr) -> StdResult<bool> {
    let mut found = false;
    for item in PLANS.range(storage, None, None, Order::Ascending) {
        let (_, plan) = item?;
        if &plan.farming_pool_address != pool {
            continue;
        }
        if !plan.terminated || plan.plan_type != PlanType::Private {
            return Ok(false);
        }
        found = true;
    }
    Ok(found)
}

/// Coins a plan emits this epoch given what is left in its farming pool.
/// Never returns more of a denom than `pool_balance` holds.
pub fn epoch_emission(plan: &Plan, pool_balance: &[Coin]) -> Result<Vec<Coin>, ContractError> {
    let available = |denom: &str| {
        pool_balance
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount)
            .unwrap_or_default()
    };

    let emission = match &plan.distribution {
        DistributionMethod::FixedAmount { epoch_amount } => epoch_amount
            .iter()
            .map(|c| Coin {
                denom: c.denom.clone(),
                amount: c.amount.min(available(&c.denom)),
            })
            .collect::<Vec<_>>(),
        DistributionMethod::Ratio { epoch_ratio } => pool_balance
            .iter()
            .map(|c| {
                let amount = c.amount.checked_mul_floor(*epoch_ratio).map_err(|e| {
                    ContractError::ArithmeticOverflow {
                        reason: e.to_string(),
                    }
                })?;
                Ok(Coin {
                    denom: c.denom.clone(),
                    amount,
                })
            })
            .collect::<Result<Vec<_>, ContractError>>()?,
    };

    Ok(emission
        .into_iter()
        .filter(|c| !c.amount.is_zero())
        .collect())
}

/// Farming pool of a private plan: a fresh account nobody holds a key for.
pub fn derive_farming_pool_address(api: &dyn Api, plan_id: u64, name: &str) -> StdResult<Addr> {
    let hash = Sha256::new()
        .chain_update(b"farmingpool")
        .chain_update(plan_id.to_be_bytes())
        .chain_update(name.as_bytes())
        .finalize();
    api.addr_humanize(&CanonicalAddr::from(hash.as_slice()))
}

/// Marks a plan terminated. A private plan's remaining farming pool balance
/// goes back to its termination address.
pub fn terminate_plan(
    storage: &mut dyn Storage,
    plan: &mut Plan,
) -> Result<Option<Refund>, ContractError> {
    if plan.terminated {
        return Err(ContractError::PlanTerminated { plan_id: plan.id });
    }
    plan.terminated = true;
    PLANS.save(storage, plan.id, plan)?;

    if plan.plan_type != PlanType::Private {
        return Ok(None);
    }
    let pool = Account::FarmingPool(&plan.farming_pool_address);
    let coins = bank::balances(storage, pool)?;
    if coins.is_empty() {
        return Ok(None);
    }
    bank::withdraw(storage, pool, &coins)?;
    Ok(Some(Refund {
        to: plan.termination_address.clone(),
        coins,
    }))
}

/// Terminates every live plan whose end time has passed.
pub fn terminate_ended_plans(
    storage: &mut dyn Storage,
    now: Timestamp,
) -> Result<Vec<(u64, Option<Refund>)>, ContractError> {
    let ended: Vec<Plan> = PLANS
        .range(storage, None, None, Order::Ascending)
        .filter_map(|item| match item {
            Ok((_, plan)) if plan.terminated || plan.end_time > now => None,
            Ok((_, plan)) => Some(Ok(plan)),
            Err(e) => Some(Err(e)),
        })
        .collect::<StdResult<_>>()?;

    let mut terminated = vec![];
    for mut plan in ended {
        let refund = terminate_plan(storage, &mut plan)?;
        terminated.push((plan.id, refund));
    }
    Ok(terminated)
}

/// Builds the plan for a governance add request.
pub fn public_plan_from_request(
    api: &dyn Api,
    id: u64,
    req: AddPlanRequest,
) -> Result<Plan, ContractError> {
    Ok(Plan {
        id,
        name: req.name,
        plan_type: PlanType::Public,
        farming_pool_address: api.addr_validate(&req.farming_pool_address)?,
        termination_address: api.addr_validate(&req.termination_address)?,
        staking_coin_weights: parse_weights(req.staking_coin_weights)?,
        start_time: req.start_time,
        end_time: req.end_time,
        distribution: distribution_method(req.epoch_amount, req.epoch_ratio)?,
        terminated: false,
        last_distribution_time: None,
        distributed_coins: vec![],
    })
}

/// Applies a governance update request to a stored public plan.
pub fn update_public_plan(
    storage: &mut dyn Storage,
    api: &dyn Api,
    req: UpdatePlanRequest,
) -> Result<Plan, ContractError> {
    let mut plan = load_plan(storage, req.plan_id)?;
    if plan.plan_type != PlanType::Public {
        return Err(ContractError::InvalidPlan {
            reason: format!("plan {} is not a public plan", plan.id),
        });
    }
    if plan.terminated {
        return Err(ContractError::PlanTerminated { plan_id: plan.id });
    }

    if let Some(name) = req.name {
        plan.name = name;
    }
    if let Some(addr) = req.farming_pool_address {
        plan.farming_pool_address = api.addr_validate(&addr)?;
    }
    if let Some(addr) = req.termination_address {
        plan.termination_address = api.addr_validate(&addr)?;
    }
    if let Some(weights) = req.staking_coin_weights {
        plan.staking_coin_weights = parse_weights(weights)?;
    }
    if let Some(start_time) = req.start_time {
        plan.start_time = start_time;
    }
    if let Some(end_time) = req.end_time {
        plan.end_time = end_time;
    }
    if req.epoch_amount.is_some() || req.epoch_ratio.is_some() {
        plan.distribution = distribution_method(req.epoch_amount, req.epoch_ratio)?;
    }

    validate_plan(&plan)?;
    validate_total_epoch_ratio(storage, &plan)?;
    PLANS.save(storage, plan.id, &plan)?;
    Ok(plan)
}

/// Terminates and removes a public plan.
pub fn delete_public_plan(storage: &mut dyn Storage, plan_id: u64) -> Result<Plan, ContractError> {
    let mut plan = load_plan(storage, plan_id)?;
    if plan.plan_type != PlanType::Public {
        return Err(ContractError::InvalidPlan {
            reason: format!("plan {} is not a public plan", plan.id),
        });
    }
    if !plan.terminated {
        terminate_plan(storage, &mut plan)?;
    }
    PLANS.remove(storage, plan_id);
    Ok(plan)
}
