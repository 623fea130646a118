pub mod bank;
pub mod contract;
pub mod epoch;
pub mod error;
pub mod execute;
pub mod genesis;
pub mod msg;
pub mod plan;
pub mod query;
pub mod rewards;
pub mod staking;
pub mod state;

pub use crate::error::ContractError;
