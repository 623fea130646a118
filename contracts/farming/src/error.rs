use cosmwasm_std::{Decimal, OverflowError, StdError, Uint128};
use farming_common::DecCoinsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("invalid plan: {reason}")]
    InvalidPlan { reason: String },

    #[error("plan {plan_id} not found")]
    PlanNotFound { plan_id: u64 },

    #[error("plan {plan_id} is already terminated")]
    PlanTerminated { plan_id: u64 },

    #[error("farming pool {address} only serves terminated private plans")]
    FarmingPoolClosed { address: String },

    #[error("total epoch ratio {total} of farming pool {farming_pool} must not exceed 1")]
    EpochRatioExceeded {
        farming_pool: String,
        total: Decimal,
    },

    #[error("invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("invalid denom: {denom}")]
    InvalidDenom { denom: String },

    #[error("invalid funds: {reason}")]
    InvalidFunds { reason: String },

    #[error("insufficient stake of {denom}: requested {requested}, available {available}")]
    InsufficientStake {
        denom: String,
        requested: Uint128,
        available: Uint128,
    },

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: String, available: String },

    #[error("{farmer} has no staking of {denom}")]
    NoStaking { farmer: String, denom: String },

    #[error("no staking coin denoms given to harvest")]
    EmptyHarvest,

    #[error("no staked {denom} to allocate rewards to")]
    NoTotalStakings { denom: String },

    #[error("arithmetic overflow: {reason}")]
    ArithmeticOverflow { reason: String },

    #[error("epoch not ready to advance (current epoch started too recently)")]
    EpochNotReady,

    #[error("invalid params: {reason}")]
    InvalidParams { reason: String },

    #[error("invalid genesis: {reason}")]
    InvalidGenesis { reason: String },
}

impl From<OverflowError> for ContractError {
    fn from(e: OverflowError) -> Self {
        ContractError::ArithmeticOverflow {
            reason: e.to_string(),
        }
    }
}

impl From<DecCoinsError> for ContractError {
    fn from(e: DecCoinsError) -> Self {
        match e {
            DecCoinsError::Overflow { .. } | DecCoinsError::Negative { .. } => {
                ContractError::ArithmeticOverflow {
                    reason: e.to_string(),
                }
            }
            DecCoinsError::InvalidDenom { denom } => ContractError::InvalidDenom { denom },
            DecCoinsError::NotPositive { .. } | DecCoinsError::DuplicateDenom { .. } => {
                ContractError::InvalidAmount {
                    reason: e.to_string(),
                }
            }
        }
    }
}
