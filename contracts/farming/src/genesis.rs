//! Whole-state import and export, used to restore a farming ledger on a new
//! contract and to compare two ledgers byte for byte.

use std::collections::{BTreeMap, BTreeSet};

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Api, Coin, Decimal, Order, StdResult, Storage, Timestamp, Uint128};
use farming_common::{validate_coins, validate_denom, DecCoins};

use crate::bank::{self, Account};
use crate::error::ContractError;
use crate::plan;
use crate::state::{
    DistributionMethod, HistoricalRewards, OutstandingRewards, Plan, QueuedStaking, Staking,
    CURRENT_EPOCHS, CURRENT_EPOCH_DAYS, FARMING_POOL_BALANCES, GLOBAL_PLAN_ID,
    HISTORICAL_REWARDS, LAST_EPOCH_TIME, OUTSTANDING_REWARDS, PLANS, QUEUED_STAKINGS,
    QUEUED_STAKINGS_BY_FARMER, STAKINGS, STAKINGS_BY_FARMER, TOTAL_STAKINGS,
};

#[cw_serde]
pub struct GenesisState {
    /// Highest plan id ever assigned, including deleted plans
    pub last_plan_id: u64,
    pub plan_records: Vec<Plan>,
    pub staking_records: Vec<StakingRecord>,
    pub queued_staking_records: Vec<QueuedStakingRecord>,
    pub historical_rewards_records: Vec<HistoricalRewardsRecord>,
    pub outstanding_rewards_records: Vec<OutstandingRewardsRecord>,
    pub current_epoch_records: Vec<CurrentEpochRecord>,
    pub farming_pool_records: Vec<FarmingPoolRecord>,
    pub staking_reserve_coins: Vec<Coin>,
    pub rewards_reserve_coins: Vec<Coin>,
    /// Block time of instantiation when not set
    pub last_epoch_time: Option<Timestamp>,
    pub current_epoch_days: u32,
}

#[cw_serde]
pub struct StakingRecord {
    pub staking_coin_denom: String,
    pub farmer: String,
    pub staking: Staking,
}

#[cw_serde]
pub struct QueuedStakingRecord {
    pub staking_coin_denom: String,
    pub farmer: String,
    pub queued_staking: QueuedStaking,
}

#[cw_serde]
pub struct HistoricalRewardsRecord {
    pub staking_coin_denom: String,
    pub epoch: u64,
    pub historical_rewards: HistoricalRewards,
}

#[cw_serde]
pub struct OutstandingRewardsRecord {
    pub staking_coin_denom: String,
    pub outstanding_rewards: OutstandingRewards,
}

#[cw_serde]
pub struct CurrentEpochRecord {
    pub staking_coin_denom: String,
    pub current_epoch: u64,
}

#[cw_serde]
pub struct FarmingPoolRecord {
    pub address: String,
    pub coins: Vec<Coin>,
}

fn invalid(reason: impl ToString) -> ContractError {
    ContractError::InvalidGenesis {
        reason: reason.to_string(),
    }
}

fn check_denom(denom: &str) -> Result<(), ContractError> {
    validate_denom(denom).map_err(invalid)
}

fn check_dec_coins(coins: &DecCoins) -> Result<DecCoins, ContractError> {
    DecCoins::try_from_vec(coins.clone().into_vec()).map_err(invalid)
}

fn has_historical<'a>(
    epochs: &BTreeSet<(&'a str, u64)>,
    denom: &'a str,
    epoch: u64,
) -> Result<(), ContractError> {
    if epochs.contains(&(denom, epoch)) {
        return Ok(());
    }
    Err(invalid(format!(
        "historical rewards of {} at epoch {} not found",
        denom, epoch
    )))
}

pub fn validate_genesis(api: &dyn Api, genesis: &GenesisState) -> Result<(), ContractError> {
    if genesis.current_epoch_days == 0 {
        return Err(invalid("current epoch days must be positive: 0"));
    }

    let mut last_id = 0u64;
    let mut ratio_sums: BTreeMap<&Addr, Decimal> = BTreeMap::new();
    for plan in &genesis.plan_records {
        if plan.id <= last_id {
            return Err(invalid("plan records must be sorted by id"));
        }
        last_id = plan.id;

        api.addr_validate(plan.farming_pool_address.as_str())?;
        api.addr_validate(plan.termination_address.as_str())?;
        check_dec_coins(&plan.staking_coin_weights)?;
        plan::validate_plan(plan).map_err(|e| invalid(format!("plan {}: {}", plan.id, e)))?;
        validate_coins(&plan.distributed_coins)
            .map_err(|e| invalid(format!("plan {} distributed coins: {}", plan.id, e)))?;

        if let DistributionMethod::Ratio { epoch_ratio } = plan.distribution {
            if !plan.terminated {
                let sum = ratio_sums.entry(&plan.farming_pool_address).or_default();
                *sum = sum.checked_add(epoch_ratio)?;
                if *sum > Decimal::one() {
                    return Err(invalid(format!(
                        "total epoch ratio of farming pool {} must be lower than 1",
                        plan.farming_pool_address
                    )));
                }
            }
        }
    }
    if genesis.last_plan_id < last_id {
        return Err(invalid(format!(
            "last plan id must not be lower than the largest plan id {}: {}",
            last_id, genesis.last_plan_id
        )));
    }

    for record in &genesis.staking_records {
        check_denom(&record.staking_coin_denom)?;
        api.addr_validate(&record.farmer)?;
        if record.staking.amount.is_zero() {
            return Err(invalid("staking amount must be positive: 0"));
        }
    }

    for record in &genesis.queued_staking_records {
        check_denom(&record.staking_coin_denom)?;
        api.addr_validate(&record.farmer)?;
        if record.queued_staking.amount.is_zero() {
            return Err(invalid("queued staking amount must be positive: 0"));
        }
    }

    for record in &genesis.historical_rewards_records {
        check_denom(&record.staking_coin_denom)?;
        check_dec_coins(&record.historical_rewards.cumulative_unit_rewards)?;
    }

    for record in &genesis.outstanding_rewards_records {
        check_denom(&record.staking_coin_denom)?;
        check_dec_coins(&record.outstanding_rewards.rewards)?;
    }

    let historical_epochs: BTreeSet<(&str, u64)> = genesis
        .historical_rewards_records
        .iter()
        .map(|r| (r.staking_coin_denom.as_str(), r.epoch))
        .collect();

    let mut current_epochs: BTreeMap<&str, u64> = BTreeMap::new();
    for record in &genesis.current_epoch_records {
        let denom = record.staking_coin_denom.as_str();
        check_denom(denom)?;
        if record.current_epoch == 0 {
            return Err(invalid(format!(
                "current epoch of {} must be positive: 0",
                denom
            )));
        }
        has_historical(&historical_epochs, denom, record.current_epoch - 1)?;
        current_epochs.insert(denom, record.current_epoch);
    }

    for record in &genesis.staking_records {
        let denom = record.staking_coin_denom.as_str();
        let current = *current_epochs
            .get(denom)
            .ok_or_else(|| invalid(format!("current epoch of {} not found", denom)))?;
        let starting = record.staking.starting_epoch;
        if starting == 0 || starting > current {
            return Err(invalid(format!(
                "starting epoch of {} staking must be between 1 and {}: {}",
                denom, current, starting
            )));
        }
        has_historical(&historical_epochs, denom, starting - 1)?;
    }

    for record in &genesis.farming_pool_records {
        api.addr_validate(&record.address)?;
        validate_coins(&record.coins).map_err(invalid)?;
    }

    validate_coins(&genesis.staking_reserve_coins)
        .map_err(|e| invalid(format!("invalid staking reserve coins: {}", e)))?;
    validate_coins(&genesis.rewards_reserve_coins)
        .map_err(|e| invalid(format!("invalid rewards reserve coins: {}", e)))?;

    Ok(())
}

/// Writes a validated genesis into empty storage. Total stakings are derived
/// from the staking records.
pub fn import_genesis(
    storage: &mut dyn Storage,
    api: &dyn Api,
    genesis: GenesisState,
    now: Timestamp,
) -> Result<(), ContractError> {
    validate_genesis(api, &genesis)?;

    for mut plan in genesis.plan_records {
        plan.staking_coin_weights = check_dec_coins(&plan.staking_coin_weights)?;
        PLANS.save(storage, plan.id, &plan)?;
    }
    GLOBAL_PLAN_ID.save(storage, &genesis.last_plan_id)?;

    let mut totals: BTreeMap<String, Uint128> = BTreeMap::new();
    for record in genesis.staking_records {
        let farmer = api.addr_validate(&record.farmer)?;
        let denom = record.staking_coin_denom.as_str();
        STAKINGS.save(storage, (denom, &farmer), &record.staking)?;
        STAKINGS_BY_FARMER.save(storage, (&farmer, denom), &())?;
        let total = totals.entry(record.staking_coin_denom.clone()).or_default();
        *total = total.checked_add(record.staking.amount)?;
    }
    for (denom, total) in totals {
        TOTAL_STAKINGS.save(storage, &denom, &total)?;
    }

    for record in genesis.queued_staking_records {
        let farmer = api.addr_validate(&record.farmer)?;
        let denom = record.staking_coin_denom.as_str();
        QUEUED_STAKINGS.save(storage, (denom, &farmer), &record.queued_staking)?;
        QUEUED_STAKINGS_BY_FARMER.save(storage, (&farmer, denom), &())?;
    }

    for record in genesis.historical_rewards_records {
        let historical_rewards = HistoricalRewards {
            cumulative_unit_rewards: check_dec_coins(
                &record.historical_rewards.cumulative_unit_rewards,
            )?,
        };
        HISTORICAL_REWARDS.save(
            storage,
            (record.staking_coin_denom.as_str(), record.epoch),
            &historical_rewards,
        )?;
    }

    for record in genesis.outstanding_rewards_records {
        let rewards = check_dec_coins(&record.outstanding_rewards.rewards)?;
        if !rewards.is_zero() {
            OUTSTANDING_REWARDS.save(
                storage,
                &record.staking_coin_denom,
                &OutstandingRewards { rewards },
            )?;
        }
    }

    for record in genesis.current_epoch_records {
        CURRENT_EPOCHS.save(storage, &record.staking_coin_denom, &record.current_epoch)?;
    }

    for record in genesis.farming_pool_records {
        let address = api.addr_validate(&record.address)?;
        bank::deposit(storage, Account::FarmingPool(&address), &record.coins)?;
    }
    bank::deposit(storage, Account::StakingReserve, &genesis.staking_reserve_coins)?;
    bank::deposit(storage, Account::RewardsReserve, &genesis.rewards_reserve_coins)?;

    LAST_EPOCH_TIME.save(storage, &genesis.last_epoch_time.unwrap_or(now))?;
    CURRENT_EPOCH_DAYS.save(storage, &genesis.current_epoch_days)?;

    Ok(())
}

/// Dumps the full ledger in storage key order.
pub fn export_genesis(storage: &dyn Storage) -> StdResult<GenesisState> {
    let plan_records = PLANS
        .range(storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, plan)| plan))
        .collect::<StdResult<Vec<_>>>()?;

    let staking_records = STAKINGS
        .range(storage, None, None, Order::Ascending)
        .map(|item| {
            item.map(|((staking_coin_denom, farmer), staking)| StakingRecord {
                staking_coin_denom,
                farmer: farmer.to_string(),
                staking,
            })
        })
        .collect::<StdResult<Vec<_>>>()?;

    let queued_staking_records = QUEUED_STAKINGS
        .range(storage, None, None, Order::Ascending)
        .map(|item| {
            item.map(
                |((staking_coin_denom, farmer), queued_staking)| QueuedStakingRecord {
                    staking_coin_denom,
                    farmer: farmer.to_string(),
                    queued_staking,
                },
            )
        })
        .collect::<StdResult<Vec<_>>>()?;

    let historical_rewards_records = HISTORICAL_REWARDS
        .range(storage, None, None, Order::Ascending)
        .map(|item| {
            item.map(
                |((staking_coin_denom, epoch), historical_rewards)| HistoricalRewardsRecord {
                    staking_coin_denom,
                    epoch,
                    historical_rewards,
                },
            )
        })
        .collect::<StdResult<Vec<_>>>()?;

    let outstanding_rewards_records = OUTSTANDING_REWARDS
        .range(storage, None, None, Order::Ascending)
        .map(|item| {
            item.map(
                |(staking_coin_denom, outstanding_rewards)| OutstandingRewardsRecord {
                    staking_coin_denom,
                    outstanding_rewards,
                },
            )
        })
        .collect::<StdResult<Vec<_>>>()?;

    let current_epoch_records = CURRENT_EPOCHS
        .range(storage, None, None, Order::Ascending)
        .map(|item| {
            item.map(|(staking_coin_denom, current_epoch)| CurrentEpochRecord {
                staking_coin_denom,
                current_epoch,
            })
        })
        .collect::<StdResult<Vec<_>>>()?;

    let mut farming_pool_records: Vec<FarmingPoolRecord> = vec![];
    for item in FARMING_POOL_BALANCES.range(storage, None, None, Order::Ascending) {
        let ((address, denom), amount) = item?;
        let coin = Coin { denom, amount };
        match farming_pool_records.last_mut() {
            Some(record) if record.address == address.as_str() => record.coins.push(coin),
            _ => farming_pool_records.push(FarmingPoolRecord {
                address: address.to_string(),
                coins: vec![coin],
            }),
        }
    }

    Ok(GenesisState {
        last_plan_id: GLOBAL_PLAN_ID.may_load(storage)?.unwrap_or_default(),
        plan_records,
        staking_records,
        queued_staking_records,
        historical_rewards_records,
        outstanding_rewards_records,
        current_epoch_records,
        farming_pool_records,
        staking_reserve_coins: bank::balances(storage, Account::StakingReserve)?,
        rewards_reserve_coins: bank::balances(storage, Account::RewardsReserve)?,
        last_epoch_time: LAST_EPOCH_TIME.may_load(storage)?,
        current_epoch_days: CURRENT_EPOCH_DAYS.may_load(storage)?.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmwasm_std::coin;
    use cosmwasm_std::testing::{mock_dependencies, MockApi};

    fn empty_genesis() -> GenesisState {
        GenesisState {
            last_plan_id: 0,
            plan_records: vec![],
            staking_records: vec![],
            queued_staking_records: vec![],
            historical_rewards_records: vec![],
            outstanding_rewards_records: vec![],
            current_epoch_records: vec![],
            farming_pool_records: vec![],
            staking_reserve_coins: vec![],
            rewards_reserve_coins: vec![],
            last_epoch_time: Some(Timestamp::from_seconds(1_000)),
            current_epoch_days: 1,
        }
    }

    #[test]
    fn test_validate_genesis_rejects_bad_records() {
        let api = MockApi::default();
        validate_genesis(&api, &empty_genesis()).unwrap();

        let mut genesis = empty_genesis();
        genesis.current_epoch_days = 0;
        assert!(matches!(
            validate_genesis(&api, &genesis).unwrap_err(),
            ContractError::InvalidGenesis { .. }
        ));

        let mut genesis = empty_genesis();
        genesis.staking_records.push(StakingRecord {
            staking_coin_denom: "!".to_string(),
            farmer: api.addr_make("farmer").to_string(),
            staking: Staking {
                amount: Uint128::new(1),
                starting_epoch: 1,
            },
        });
        assert!(validate_genesis(&api, &genesis).is_err());

        let mut genesis = empty_genesis();
        genesis.queued_staking_records.push(QueuedStakingRecord {
            staking_coin_denom: "stake".to_string(),
            farmer: api.addr_make("farmer").to_string(),
            queued_staking: QueuedStaking {
                amount: Uint128::zero(),
            },
        });
        let err = validate_genesis(&api, &genesis).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid genesis: queued staking amount must be positive: 0"
        );

        let mut genesis = empty_genesis();
        genesis.rewards_reserve_coins = vec![coin(0, "uatom")];
        assert!(validate_genesis(&api, &genesis).is_err());
    }

    #[test]
    fn test_import_derives_totals() {
        let mut deps = mock_dependencies();
        let api = MockApi::default();
        let farmer1 = api.addr_make("farmer1");
        let farmer2 = api.addr_make("farmer2");

        let mut genesis = empty_genesis();
        for (farmer, amount) in [(&farmer1, 300u128), (&farmer2, 700)] {
            genesis.staking_records.push(StakingRecord {
                staking_coin_denom: "stake".to_string(),
                farmer: farmer.to_string(),
                staking: Staking {
                    amount: Uint128::new(amount),
                    starting_epoch: 1,
                },
            });
        }
        genesis.current_epoch_records.push(CurrentEpochRecord {
            staking_coin_denom: "stake".to_string(),
            current_epoch: 1,
        });
        genesis.historical_rewards_records.push(HistoricalRewardsRecord {
            staking_coin_denom: "stake".to_string(),
            epoch: 0,
            historical_rewards: HistoricalRewards::default(),
        });
        genesis.staking_reserve_coins = vec![coin(1000, "stake")];
        genesis.last_plan_id = 4;

        import_genesis(
            deps.as_mut().storage,
            &api,
            genesis.clone(),
            Timestamp::from_seconds(5),
        )
        .unwrap();

        assert_eq!(
            TOTAL_STAKINGS.load(deps.as_ref().storage, "stake").unwrap(),
            Uint128::new(1000)
        );
        let exported = export_genesis(deps.as_ref().storage).unwrap();
        assert_eq!(exported.staking_records.len(), 2);
        assert_eq!(exported.staking_reserve_coins, vec![coin(1000, "stake")]);
        assert_eq!(exported.last_epoch_time, Some(Timestamp::from_seconds(1_000)));
        assert_eq!(exported.last_plan_id, 4);
        assert_eq!(plan::next_plan_id(deps.as_ref().storage).unwrap(), 5);
    }

    fn staked_genesis(current_epoch: u64, starting_epoch: u64) -> GenesisState {
        let api = MockApi::default();
        let mut genesis = empty_genesis();
        genesis.staking_records.push(StakingRecord {
            staking_coin_denom: "stake".to_string(),
            farmer: api.addr_make("farmer").to_string(),
            staking: Staking {
                amount: Uint128::new(10),
                starting_epoch,
            },
        });
        genesis.current_epoch_records.push(CurrentEpochRecord {
            staking_coin_denom: "stake".to_string(),
            current_epoch,
        });
        for epoch in 0..current_epoch {
            genesis.historical_rewards_records.push(HistoricalRewardsRecord {
                staking_coin_denom: "stake".to_string(),
                epoch,
                historical_rewards: HistoricalRewards::default(),
            });
        }
        genesis
    }

    #[test]
    fn test_validate_genesis_checks_epochs() {
        let api = MockApi::default();
        validate_genesis(&api, &staked_genesis(2, 1)).unwrap();
        validate_genesis(&api, &staked_genesis(2, 2)).unwrap();

        let err = validate_genesis(&api, &staked_genesis(0, 1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid genesis: current epoch of stake must be positive: 0"
        );
        assert!(validate_genesis(&api, &staked_genesis(2, 0)).is_err());
        assert!(validate_genesis(&api, &staked_genesis(2, 3)).is_err());

        let mut genesis = staked_genesis(2, 1);
        genesis.historical_rewards_records.remove(1);
        let err = validate_genesis(&api, &genesis).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid genesis: historical rewards of stake at epoch 1 not found"
        );

        let mut genesis = staked_genesis(2, 1);
        genesis.current_epoch_records.clear();
        assert!(matches!(
            validate_genesis(&api, &genesis).unwrap_err(),
            ContractError::InvalidGenesis { .. }
        ));
    }
}
