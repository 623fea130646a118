use cosmwasm_std::{Addr, BankMsg, Coin, Order, StdResult, Storage, Uint128};

use crate::error::ContractError;
use crate::state::{FARMING_POOL_BALANCES, REWARDS_RESERVE, STAKING_RESERVE};

/// An account whose balance the contract tracks on behalf of someone else.
/// Coins only leave the contract through [`send_msg`].
#[derive(Clone, Copy, Debug)]
pub enum Account<'a> {
    FarmingPool(&'a Addr),
    StakingReserve,
    RewardsReserve,
}

impl Account<'_> {
    fn label(&self) -> String {
        match self {
            Account::FarmingPool(addr) => format!("farming pool {}", addr),
            Account::StakingReserve => "staking reserve".to_string(),
            Account::RewardsReserve => "rewards reserve".to_string(),
        }
    }
}

pub fn balance_of(storage: &dyn Storage, account: Account, denom: &str) -> StdResult<Uint128> {
    let balance = match account {
        Account::FarmingPool(addr) => FARMING_POOL_BALANCES.may_load(storage, (addr, denom))?,
        Account::StakingReserve => STAKING_RESERVE.may_load(storage, denom)?,
        Account::RewardsReserve => REWARDS_RESERVE.may_load(storage, denom)?,
    };
    Ok(balance.unwrap_or_default())
}

fn set_balance(
    storage: &mut dyn Storage,
    account: Account,
    denom: &str,
    amount: Uint128,
) -> StdResult<()> {
    match (account, amount.is_zero()) {
        (Account::FarmingPool(addr), true) => FARMING_POOL_BALANCES.remove(storage, (addr, denom)),
        (Account::FarmingPool(addr), false) => {
            FARMING_POOL_BALANCES.save(storage, (addr, denom), &amount)?
        }
        (Account::StakingReserve, true) => STAKING_RESERVE.remove(storage, denom),
        (Account::StakingReserve, false) => STAKING_RESERVE.save(storage, denom, &amount)?,
        (Account::RewardsReserve, true) => REWARDS_RESERVE.remove(storage, denom),
        (Account::RewardsReserve, false) => REWARDS_RESERVE.save(storage, denom, &amount)?,
    }
    Ok(())
}

/// All non-zero balances of an account, sorted by denom.
pub fn balances(storage: &dyn Storage, account: Account) -> StdResult<Vec<Coin>> {
    let entries: StdResult<Vec<(String, Uint128)>> = match account {
        Account::FarmingPool(addr) => FARMING_POOL_BALANCES
            .prefix(addr)
            .range(storage, None, None, Order::Ascending)
            .collect(),
        Account::StakingReserve => STAKING_RESERVE
            .range(storage, None, None, Order::Ascending)
            .collect(),
        Account::RewardsReserve => REWARDS_RESERVE
            .range(storage, None, None, Order::Ascending)
            .collect(),
    };
    Ok(entries?
        .into_iter()
        .map(|(denom, amount)| Coin { denom, amount })
        .collect())
}

pub fn deposit(
    storage: &mut dyn Storage,
    account: Account,
    coins: &[Coin],
) -> Result<(), ContractError> {
    for coin in coins {
        let balance = balance_of(storage, account, &coin.denom)?.checked_add(coin.amount)?;
        set_balance(storage, account, &coin.denom, balance)?;
    }
    Ok(())
}

pub fn withdraw(
    storage: &mut dyn Storage,
    account: Account,
    coins: &[Coin],
) -> Result<(), ContractError> {
    for coin in coins {
        let balance = balance_of(storage, account, &coin.denom)?;
        let left = balance
            .checked_sub(coin.amount)
            .map_err(|_| ContractError::InsufficientBalance {
                needed: format!("{}{} from {}", coin.amount, coin.denom, account.label()),
                available: format!("{}{}", balance, coin.denom),
            })?;
        set_balance(storage, account, &coin.denom, left)?;
    }
    Ok(())
}

/// Moves coins between two internal accounts.
pub fn transfer(
    storage: &mut dyn Storage,
    from: Account,
    to: Account,
    coins: &[Coin],
) -> Result<(), ContractError> {
    withdraw(storage, from, coins)?;
    deposit(storage, to, coins)
}

/// Pays coins out of the contract. Returns `None` when there is nothing to send.
pub fn send_msg(to: &Addr, coins: Vec<Coin>) -> Option<BankMsg> {
    let amount: Vec<Coin> = coins.into_iter().filter(|c| !c.amount.is_zero()).collect();
    if amount.is_empty() {
        return None;
    }
    Some(BankMsg::Send {
        to_address: to.to_string(),
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmwasm_std::coin;
    use cosmwasm_std::testing::{mock_dependencies, MockApi};

    #[test]
    fn test_transfer_between_accounts() {
        let mut deps = mock_dependencies();
        let pool = MockApi::default().addr_make("pool");

        deposit(
            deps.as_mut().storage,
            Account::FarmingPool(&pool),
            &[coin(100, "uatom"), coin(7, "stake")],
        )
        .unwrap();
        transfer(
            deps.as_mut().storage,
            Account::FarmingPool(&pool),
            Account::RewardsReserve,
            &[coin(100, "uatom")],
        )
        .unwrap();

        let pool_balances = balances(deps.as_ref().storage, Account::FarmingPool(&pool)).unwrap();
        assert_eq!(pool_balances, vec![coin(7, "stake")]);
        let reserve = balances(deps.as_ref().storage, Account::RewardsReserve).unwrap();
        assert_eq!(reserve, vec![coin(100, "uatom")]);
    }

    #[test]
    fn test_withdraw_insufficient() {
        let mut deps = mock_dependencies();
        deposit(
            deps.as_mut().storage,
            Account::StakingReserve,
            &[coin(10, "stake")],
        )
        .unwrap();
        let err = withdraw(
            deps.as_mut().storage,
            Account::StakingReserve,
            &[coin(11, "stake")],
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::InsufficientBalance { .. }));
        // Nothing was taken
        assert_eq!(
            balance_of(deps.as_ref().storage, Account::StakingReserve, "stake").unwrap(),
            Uint128::new(10)
        );
    }

    #[test]
    fn test_send_msg_skips_empty() {
        let addr = MockApi::default().addr_make("farmer");
        assert!(send_msg(&addr, vec![]).is_none());
        assert!(send_msg(&addr, vec![coin(0, "uatom")]).is_none());
        assert!(send_msg(&addr, vec![coin(1, "uatom")]).is_some());
    }
}
