use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Coin, Decimal, Timestamp, Uint128};
use cw_storage_plus::{Item, Map};
use farming_common::{DecCoins, PlanType};

pub const CONFIG: Item<Config> = Item::new("config");

pub const GLOBAL_PLAN_ID: Item<u64> = Item::new("global_plan_id");
pub const PLANS: Map<u64, Plan> = Map::new("plans");

pub const LAST_EPOCH_TIME: Item<Timestamp> = Item::new("last_epoch_time");
/// Epoch length in force until the next advance; `Params::next_epoch_days`
/// replaces it only once an epoch has completed.
pub const CURRENT_EPOCH_DAYS: Item<u32> = Item::new("current_epoch_days");

pub const STAKINGS: Map<(&str, &Addr), Staking> = Map::new("stakings");
pub const STAKINGS_BY_FARMER: Map<(&Addr, &str), ()> = Map::new("stakings_by_farmer");
pub const QUEUED_STAKINGS: Map<(&str, &Addr), QueuedStaking> = Map::new("queued_stakings");
pub const QUEUED_STAKINGS_BY_FARMER: Map<(&Addr, &str), ()> =
    Map::new("queued_stakings_by_farmer");
/// Sum of promoted staking per denom, so allocation never iterates farmers.
pub const TOTAL_STAKINGS: Map<&str, Uint128> = Map::new("total_stakings");

/// Append-only: (staking coin denom, epoch) -> cumulative unit rewards.
pub const HISTORICAL_REWARDS: Map<(&str, u64), HistoricalRewards> =
    Map::new("historical_rewards");
pub const OUTSTANDING_REWARDS: Map<&str, OutstandingRewards> = Map::new("outstanding_rewards");
pub const CURRENT_EPOCHS: Map<&str, u64> = Map::new("current_epochs");

/// Internal accounts. The contract holds the underlying bank balance.
pub const FARMING_POOL_BALANCES: Map<(&Addr, &str), Uint128> = Map::new("farming_pools");
pub const STAKING_RESERVE: Map<&str, Uint128> = Map::new("staking_reserve");
pub const REWARDS_RESERVE: Map<&str, Uint128> = Map::new("rewards_reserve");

#[cw_serde]
pub struct Config {
    /// Stands in for the governance module: submits public plan proposals
    /// and parameter changes.
    pub admin: Addr,
    pub params: Params,
    /// Allows the admin to advance an epoch before it is due. Meant for
    /// test networks only.
    pub enable_advance_epoch: bool,
}

#[cw_serde]
pub struct Params {
    /// Fee charged to create a private plan
    pub private_plan_creation_fee: Vec<Coin>,
    /// Epoch length in days applied after the next epoch advance
    pub next_epoch_days: u32,
    pub farming_fee_collector: Addr,
}

#[cw_serde]
pub enum DistributionMethod {
    /// Emit a fixed set of coins every epoch.
    FixedAmount { epoch_amount: Vec<Coin> },
    /// Emit a fraction of the farming pool balance every epoch.
    Ratio { epoch_ratio: Decimal },
}

#[cw_serde]
pub struct Plan {
    pub id: u64,
    pub name: String,
    pub plan_type: PlanType,
    pub farming_pool_address: Addr,
    pub termination_address: Addr,
    pub staking_coin_weights: DecCoins,
    /// Inclusive
    pub start_time: Timestamp,
    /// Exclusive
    pub end_time: Timestamp,
    pub distribution: DistributionMethod,
    pub terminated: bool,
    pub last_distribution_time: Option<Timestamp>,
    pub distributed_coins: Vec<Coin>,
}

impl Plan {
    pub fn is_active_at(&self, time: Timestamp) -> bool {
        !self.terminated && self.start_time <= time && time < self.end_time
    }
}

#[cw_serde]
pub struct Staking {
    pub amount: Uint128,
    /// First epoch whose allocation this amount is entitled to
    pub starting_epoch: u64,
}

#[cw_serde]
pub struct QueuedStaking {
    pub amount: Uint128,
}

#[cw_serde]
#[derive(Default)]
pub struct HistoricalRewards {
    pub cumulative_unit_rewards: DecCoins,
}

#[cw_serde]
#[derive(Default)]
pub struct OutstandingRewards {
    pub rewards: DecCoins,
}
