pub mod dec_coins;
pub mod types;

pub use dec_coins::{validate_coins, validate_denom, DecCoins, DecCoinsError};
pub use types::PlanType;
