use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Coin, DecCoin, Decimal, Timestamp, Uint128};
use farming_common::{DecCoins, PlanType};

use crate::genesis::GenesisState;
use crate::state::{Config, Plan};

#[cw_serde]
pub struct InstantiateMsg {
    /// Governance stand-in. Defaults to the instantiator.
    pub admin: Option<String>,
    pub params: ParamsMsg,
    /// Lets the admin advance an epoch before it is due. Test networks only.
    pub enable_advance_epoch: bool,
    /// State to restore, e.g. from another chain's export.
    pub genesis: Option<GenesisState>,
}

#[cw_serde]
pub struct ParamsMsg {
    pub private_plan_creation_fee: Vec<Coin>,
    pub next_epoch_days: u32,
    pub farming_fee_collector: String,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Stake the coins sent in info.funds. They are queued until the next
    /// epoch advance.
    Stake {},
    /// Unstake coins, drawing queued coins down first. Pending rewards of
    /// the affected denoms are paid out.
    Unstake { amount: Vec<Coin> },
    /// Withdraw accrued rewards for the given staking coin denoms.
    Harvest { staking_coin_denoms: Vec<String> },
    /// Allocate rewards and promote queued stakings once the epoch is due.
    /// Anyone may call this; the admin can force it when enabled.
    AdvanceEpoch {},
    /// Create a private plan emitting a fixed amount every epoch. The
    /// private plan creation fee must be sent in info.funds.
    CreateFixedAmountPlan {
        name: String,
        staking_coin_weights: Vec<DecCoin>,
        start_time: Timestamp,
        end_time: Timestamp,
        epoch_amount: Vec<Coin>,
    },
    /// Create a private plan emitting a ratio of its farming pool every epoch.
    CreateRatioPlan {
        name: String,
        staking_coin_weights: Vec<DecCoin>,
        start_time: Timestamp,
        end_time: Timestamp,
        epoch_ratio: Decimal,
    },
    /// Apply a passed public plan proposal. Admin only.
    PublicPlanProposal {
        add: Vec<AddPlanRequest>,
        update: Vec<UpdatePlanRequest>,
        delete: Vec<DeletePlanRequest>,
    },
    /// Deposit info.funds into a farming pool.
    FundFarmingPool { farming_pool_address: String },
    /// Withdraw from the farming pool owned by the sender.
    WithdrawFarmingPool { amount: Vec<Coin> },
    /// Update module params. Admin only.
    UpdateParams {
        private_plan_creation_fee: Option<Vec<Coin>>,
        next_epoch_days: Option<u32>,
        farming_fee_collector: Option<String>,
    },
}

#[cw_serde]
pub struct AddPlanRequest {
    pub name: String,
    pub farming_pool_address: String,
    pub termination_address: String,
    pub staking_coin_weights: Vec<DecCoin>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub epoch_amount: Option<Vec<Coin>>,
    pub epoch_ratio: Option<Decimal>,
}

/// Fields left as `None` keep their current value.
#[cw_serde]
pub struct UpdatePlanRequest {
    pub plan_id: u64,
    pub name: Option<String>,
    pub farming_pool_address: Option<String>,
    pub termination_address: Option<String>,
    pub staking_coin_weights: Option<Vec<DecCoin>>,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub epoch_amount: Option<Vec<Coin>>,
    pub epoch_ratio: Option<Decimal>,
}

#[cw_serde]
pub struct DeletePlanRequest {
    pub plan_id: u64,
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(Config)]
    Config {},
    #[returns(Vec<Plan>)]
    Plans {
        plan_type: Option<PlanType>,
        farming_pool_address: Option<String>,
        termination_address: Option<String>,
        terminated: Option<bool>,
        start_after: Option<u64>,
        limit: Option<u32>,
    },
    #[returns(Plan)]
    Plan { plan_id: u64 },
    #[returns(StakingsResponse)]
    Stakings {
        farmer: String,
        staking_coin_denom: Option<String>,
    },
    #[returns(TotalStakingsResponse)]
    TotalStakings { staking_coin_denom: String },
    #[returns(RewardsResponse)]
    Rewards {
        farmer: String,
        staking_coin_denom: Option<String>,
    },
    #[returns(HistoricalRewardsResponse)]
    HistoricalRewards {
        staking_coin_denom: String,
        epoch: u64,
    },
    #[returns(OutstandingRewardsResponse)]
    OutstandingRewards { staking_coin_denom: String },
    #[returns(CurrentEpochResponse)]
    CurrentEpoch { staking_coin_denom: String },
    #[returns(EpochClockResponse)]
    EpochClock {},
    #[returns(FarmingPoolResponse)]
    FarmingPool { address: String },
    #[returns(GenesisState)]
    ExportGenesis {},
}

#[cw_serde]
pub struct StakingsResponse {
    pub staked_coins: Vec<Coin>,
    pub queued_coins: Vec<Coin>,
}

#[cw_serde]
pub struct TotalStakingsResponse {
    pub amount: Uint128,
}

#[cw_serde]
pub struct RewardsResponse {
    pub rewards: Vec<Coin>,
}

#[cw_serde]
pub struct HistoricalRewardsResponse {
    pub cumulative_unit_rewards: DecCoins,
}

#[cw_serde]
pub struct OutstandingRewardsResponse {
    pub rewards: DecCoins,
}

#[cw_serde]
pub struct CurrentEpochResponse {
    pub current_epoch: u64,
}

#[cw_serde]
pub struct EpochClockResponse {
    pub last_epoch_time: Timestamp,
    pub current_epoch_days: u32,
    pub next_epoch_days: u32,
}

#[cw_serde]
pub struct FarmingPoolResponse {
    pub address: String,
    pub balances: Vec<Coin>,
}

#[cw_serde]
pub struct MigrateMsg {}
