use cosmwasm_std::{entry_point, Binary, Deps, DepsMut, Env, MessageInfo, Response, StdResult};
use cw2::{get_contract_version, set_contract_version};
use farming_common::validate_coins;

use crate::error::ContractError;
use crate::execute;
use crate::genesis;
use crate::msg::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg};
use crate::query;
use crate::state::{Config, Params, CONFIG, CURRENT_EPOCH_DAYS, LAST_EPOCH_TIME};

const CONTRACT_NAME: &str = "crates.io:farming";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[entry_point]
pub fn instantiate(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    if msg.params.next_epoch_days == 0 {
        return Err(ContractError::InvalidParams {
            reason: "next epoch days must be positive: 0".to_string(),
        });
    }
    validate_coins(&msg.params.private_plan_creation_fee).map_err(|e| {
        ContractError::InvalidParams {
            reason: format!("invalid private plan creation fee: {}", e),
        }
    })?;

    let admin = match msg.admin {
        Some(admin) => deps.api.addr_validate(&admin)?,
        None => info.sender.clone(),
    };
    let config = Config {
        admin: admin.clone(),
        params: Params {
            private_plan_creation_fee: msg.params.private_plan_creation_fee,
            next_epoch_days: msg.params.next_epoch_days,
            farming_fee_collector: deps.api.addr_validate(&msg.params.farming_fee_collector)?,
        },
        enable_advance_epoch: msg.enable_advance_epoch,
    };
    CONFIG.save(deps.storage, &config)?;

    match msg.genesis {
        Some(state) => genesis::import_genesis(deps.storage, deps.api, state, env.block.time)?,
        None => {
            LAST_EPOCH_TIME.save(deps.storage, &env.block.time)?;
            CURRENT_EPOCH_DAYS.save(deps.storage, &config.params.next_epoch_days)?;
        }
    }

    Ok(Response::new()
        .add_attribute("action", "instantiate")
        .add_attribute("contract", "farming")
        .add_attribute("admin", admin.to_string())
        .add_attribute(
            "enable_advance_epoch",
            config.enable_advance_epoch.to_string(),
        ))
}

#[entry_point]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::Stake {} => execute::stake(deps, env, info),
        ExecuteMsg::Unstake { amount } => execute::unstake(deps, env, info, amount),
        ExecuteMsg::Harvest {
            staking_coin_denoms,
        } => execute::harvest(deps, env, info, staking_coin_denoms),
        ExecuteMsg::AdvanceEpoch {} => execute::advance_epoch(deps, env, info),
        ExecuteMsg::CreateFixedAmountPlan {
            name,
            staking_coin_weights,
            start_time,
            end_time,
            epoch_amount,
        } => execute::create_fixed_amount_plan(
            deps,
            env,
            info,
            name,
            staking_coin_weights,
            start_time,
            end_time,
            epoch_amount,
        ),
        ExecuteMsg::CreateRatioPlan {
            name,
            staking_coin_weights,
            start_time,
            end_time,
            epoch_ratio,
        } => execute::create_ratio_plan(
            deps,
            env,
            info,
            name,
            staking_coin_weights,
            start_time,
            end_time,
            epoch_ratio,
        ),
        ExecuteMsg::PublicPlanProposal {
            add,
            update,
            delete,
        } => execute::public_plan_proposal(deps, env, info, add, update, delete),
        ExecuteMsg::FundFarmingPool {
            farming_pool_address,
        } => execute::fund_farming_pool(deps, env, info, farming_pool_address),
        ExecuteMsg::WithdrawFarmingPool { amount } => {
            execute::withdraw_farming_pool(deps, env, info, amount)
        }
        ExecuteMsg::UpdateParams {
            private_plan_creation_fee,
            next_epoch_days,
            farming_fee_collector,
        } => execute::update_params(
            deps,
            env,
            info,
            private_plan_creation_fee,
            next_epoch_days,
            farming_fee_collector,
        ),
    }
}

#[entry_point]
pub fn query(deps: Deps, _env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => query::query_config(deps),
        QueryMsg::Plans {
            plan_type,
            farming_pool_address,
            termination_address,
            terminated,
            start_after,
            limit,
        } => query::query_plans(
            deps,
            plan_type,
            farming_pool_address,
            termination_address,
            terminated,
            start_after,
            limit,
        ),
        QueryMsg::Plan { plan_id } => query::query_plan(deps, plan_id),
        QueryMsg::Stakings {
            farmer,
            staking_coin_denom,
        } => query::query_stakings(deps, farmer, staking_coin_denom),
        QueryMsg::TotalStakings { staking_coin_denom } => {
            query::query_total_stakings(deps, staking_coin_denom)
        }
        QueryMsg::Rewards {
            farmer,
            staking_coin_denom,
        } => query::query_rewards(deps, farmer, staking_coin_denom),
        QueryMsg::HistoricalRewards {
            staking_coin_denom,
            epoch,
        } => query::query_historical_rewards(deps, staking_coin_denom, epoch),
        QueryMsg::OutstandingRewards { staking_coin_denom } => {
            query::query_outstanding_rewards(deps, staking_coin_denom)
        }
        QueryMsg::CurrentEpoch { staking_coin_denom } => {
            query::query_current_epoch(deps, staking_coin_denom)
        }
        QueryMsg::EpochClock {} => query::query_epoch_clock(deps),
        QueryMsg::FarmingPool { address } => query::query_farming_pool(deps, address),
        QueryMsg::ExportGenesis {} => query::query_export_genesis(deps),
    }
}

#[entry_point]
pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, ContractError> {
    let stored = get_contract_version(deps.storage)?;
    if stored.contract != CONTRACT_NAME {
        return Err(ContractError::Unauthorized {
            reason: "Cannot migrate from different contract type".to_string(),
        });
    }

    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    Ok(Response::new()
        .add_attribute("action", "migrate")
        .add_attribute("from_version", stored.version)
        .add_attribute("to_version", CONTRACT_VERSION))
}
