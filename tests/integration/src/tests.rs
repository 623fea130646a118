//! Integration tests for the farming contract.
//!
//! These tests drive the contract entry points directly using
//! `cosmwasm_std::testing` mocks, one epoch advance per simulated day, and
//! check the reward accounting across many operations.
//!
//! Run:
//! ```bash
//! cargo test -p farming-integration-tests
//! ```

use cosmwasm_std::testing::{message_info, mock_dependencies, mock_env, MockApi, MockQuerier};
use cosmwasm_std::{
    coins, from_json, Addr, BankMsg, Binary, Coin, CosmosMsg, DecCoin, Decimal, Decimal256, Env,
    MemoryStorage, OwnedDeps, Response, Uint128,
};
use farming::contract::{execute, instantiate, query};
use farming::genesis::GenesisState;
use farming::msg::{
    AddPlanRequest, DeletePlanRequest, ExecuteMsg, FarmingPoolResponse, InstantiateMsg,
    OutstandingRewardsResponse, ParamsMsg, QueryMsg, RewardsResponse, StakingsResponse,
};
use farming::state::Plan;
use farming::ContractError;
use farming_common::PlanType;
use std::str::FromStr;

// ─── Helpers ───

struct Suite {
    deps: OwnedDeps<MemoryStorage, MockApi, MockQuerier>,
    day: u64,
}

fn addr(name: &str) -> Addr {
    MockApi::default().addr_make(name)
}

fn instantiate_msg(genesis: Option<GenesisState>) -> InstantiateMsg {
    InstantiateMsg {
        admin: None,
        params: ParamsMsg {
            private_plan_creation_fee: vec![],
            next_epoch_days: 1,
            farming_fee_collector: addr("collector").to_string(),
        },
        enable_advance_epoch: false,
        genesis,
    }
}

fn weights(entries: &[(&str, &str)]) -> Vec<DecCoin> {
    entries
        .iter()
        .map(|(denom, w)| DecCoin::new(Decimal256::from_str(w).unwrap(), *denom))
        .collect()
}

fn sends_to(res: &Response, to: &Addr) -> Vec<Coin> {
    res.messages
        .iter()
        .filter_map(|m| match &m.msg {
            CosmosMsg::Bank(BankMsg::Send { to_address, amount }) if to_address == to.as_str() => {
                Some(amount.clone())
            }
            _ => None,
        })
        .flatten()
        .collect()
}

impl Suite {
    fn new() -> Self {
        Self::with_genesis(None, 0)
    }

    fn with_genesis(genesis: Option<GenesisState>, day: u64) -> Self {
        let mut suite = Suite {
            deps: mock_dependencies(),
            day,
        };
        let env = suite.env();
        instantiate(
            suite.deps.as_mut(),
            env,
            message_info(&addr("admin"), &[]),
            instantiate_msg(genesis),
        )
        .unwrap();
        suite
    }

    fn env(&self) -> Env {
        let mut env = mock_env();
        env.block.time = env.block.time.plus_days(self.day);
        env
    }

    fn exec(
        &mut self,
        sender: &str,
        funds: &[Coin],
        msg: ExecuteMsg,
    ) -> Result<Response, ContractError> {
        let env = self.env();
        execute(self.deps.as_mut(), env, message_info(&addr(sender), funds), msg)
    }

    fn query<T: serde::de::DeserializeOwned>(&self, msg: QueryMsg) -> T {
        from_json(query(self.deps.as_ref(), self.env(), msg).unwrap()).unwrap()
    }

    fn add_public_plan(
        &mut self,
        weights: Vec<DecCoin>,
        epoch_amount: Option<Vec<Coin>>,
        epoch_ratio: Option<Decimal>,
    ) {
        let start_time = mock_env().block.time;
        self.exec(
            "admin",
            &[],
            ExecuteMsg::PublicPlanProposal {
                add: vec![AddPlanRequest {
                    name: "public plan".to_string(),
                    farming_pool_address: addr("pool").to_string(),
                    termination_address: addr("pool").to_string(),
                    staking_coin_weights: weights,
                    start_time,
                    end_time: start_time.plus_days(365),
                    epoch_amount,
                    epoch_ratio,
                }],
                update: vec![],
                delete: vec![],
            },
        )
        .unwrap();
    }

    fn delete_public_plan(&mut self, plan_id: u64) {
        self.exec(
            "admin",
            &[],
            ExecuteMsg::PublicPlanProposal {
                add: vec![],
                update: vec![],
                delete: vec![DeletePlanRequest { plan_id }],
            },
        )
        .unwrap();
    }

    fn plans(&self) -> Vec<Plan> {
        self.query(QueryMsg::Plans {
            plan_type: None,
            farming_pool_address: None,
            termination_address: None,
            terminated: None,
            start_after: None,
            limit: None,
        })
    }

    fn fund_pool(&mut self, amount: u128, denom: &str) {
        self.exec(
            "funder",
            &coins(amount, denom),
            ExecuteMsg::FundFarmingPool {
                farming_pool_address: addr("pool").to_string(),
            },
        )
        .unwrap();
    }

    fn stake(&mut self, farmer: &str, amount: u128, denom: &str) {
        self.exec(farmer, &coins(amount, denom), ExecuteMsg::Stake {})
            .unwrap();
    }

    fn unstake(&mut self, farmer: &str, amount: u128, denom: &str) -> Response {
        self.exec(
            farmer,
            &[],
            ExecuteMsg::Unstake {
                amount: coins(amount, denom),
            },
        )
        .unwrap()
    }

    fn harvest(&mut self, farmer: &str, denom: &str) -> Response {
        self.exec(
            farmer,
            &[],
            ExecuteMsg::Harvest {
                staking_coin_denoms: vec![denom.to_string()],
            },
        )
        .unwrap()
    }

    /// Moves one day forward and advances the epoch.
    fn tick(&mut self) -> Response {
        self.day += 1;
        self.exec("keeper", &[], ExecuteMsg::AdvanceEpoch {})
            .unwrap()
    }

    fn rewards(&self, farmer: &str, denom: &str) -> Vec<Coin> {
        let res: RewardsResponse = self.query(QueryMsg::Rewards {
            farmer: addr(farmer).to_string(),
            staking_coin_denom: Some(denom.to_string()),
        });
        res.rewards
    }

    fn reward_amount(&self, farmer: &str, denom: &str, reward_denom: &str) -> Uint128 {
        self.rewards(farmer, denom)
            .into_iter()
            .find(|c| c.denom == reward_denom)
            .map(|c| c.amount)
            .unwrap_or_default()
    }

    fn stakings(&self, farmer: &str) -> StakingsResponse {
        self.query(QueryMsg::Stakings {
            farmer: addr(farmer).to_string(),
            staking_coin_denom: None,
        })
    }

    fn outstanding(&self, denom: &str, reward_denom: &str) -> Decimal256 {
        let res: OutstandingRewardsResponse = self.query(QueryMsg::OutstandingRewards {
            staking_coin_denom: denom.to_string(),
        });
        res.rewards.amount_of(reward_denom)
    }

    fn export(&self) -> Binary {
        query(self.deps.as_ref(), self.env(), QueryMsg::ExportGenesis {}).unwrap()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_single_farmer_fixed_amount() {
    let mut suite = Suite::new();
    suite.add_public_plan(weights(&[("stakeA", "1")]), Some(coins(100, "coinX")), None);
    suite.fund_pool(10_000, "coinX");
    suite.stake("farmer1", 1_000, "stakeA");

    suite.tick();
    assert_eq!(suite.stakings("farmer1").staked_coins, coins(1_000, "stakeA"));
    assert!(suite.rewards("farmer1", "stakeA").is_empty());

    suite.tick();
    assert_eq!(suite.rewards("farmer1", "stakeA"), coins(100, "coinX"));
}

#[test]
fn test_equal_stakes_split_evenly_in_any_order() {
    for order in [["farmer1", "farmer2"], ["farmer2", "farmer1"]] {
        let mut suite = Suite::new();
        suite.add_public_plan(weights(&[("stakeA", "1")]), Some(coins(100, "coinX")), None);
        suite.fund_pool(10_000, "coinX");
        for farmer in order {
            suite.stake(farmer, 500, "stakeA");
        }

        suite.tick();
        suite.tick();
        assert_eq!(suite.rewards("farmer1", "stakeA"), coins(50, "coinX"));
        assert_eq!(suite.rewards("farmer2", "stakeA"), coins(50, "coinX"));
    }
}

#[test]
fn test_queued_stake_earns_from_following_epoch() {
    let mut suite = Suite::new();
    suite.add_public_plan(weights(&[("stakeA", "1")]), Some(coins(100, "coinX")), None);
    suite.fund_pool(10_000, "coinX");

    suite.stake("farmer1", 1_000, "stakeA");
    suite.tick();
    suite.stake("farmer2", 1_000, "stakeA");

    // farmer2 is still queued during this allocation
    suite.tick();
    assert_eq!(suite.reward_amount("farmer1", "stakeA", "coinX"), Uint128::new(100));
    assert_eq!(suite.reward_amount("farmer2", "stakeA", "coinX"), Uint128::zero());

    suite.tick();
    assert_eq!(suite.reward_amount("farmer1", "stakeA", "coinX"), Uint128::new(150));
    assert_eq!(suite.reward_amount("farmer2", "stakeA", "coinX"), Uint128::new(50));
}

#[test]
fn test_partial_unstake_keeps_earning_stake() {
    let mut suite = Suite::new();
    suite.add_public_plan(weights(&[("stakeA", "1")]), Some(coins(100, "coinX")), None);
    suite.fund_pool(10_000, "coinX");

    suite.stake("farmer1", 1_000, "stakeA");
    suite.tick();
    suite.stake("farmer1", 500, "stakeA");

    let res = suite.unstake("farmer1", 300, "stakeA");
    assert_eq!(sends_to(&res, &addr("farmer1")), coins(300, "stakeA"));

    let stakings = suite.stakings("farmer1");
    assert_eq!(stakings.staked_coins, coins(1_000, "stakeA"));
    assert_eq!(stakings.queued_coins, coins(200, "stakeA"));

    // the full allocation lands on the untouched 1000 and is paid out when
    // the queued 200 merges into it
    let res = suite.tick();
    assert_eq!(sends_to(&res, &addr("farmer1")), coins(100, "coinX"));
    assert_eq!(suite.stakings("farmer1").staked_coins, coins(1_200, "stakeA"));
}

#[test]
fn test_outstanding_covers_entitlements() {
    let mut suite = Suite::new();
    suite.add_public_plan(weights(&[("stakeA", "1")]), Some(coins(100, "coinX")), None);
    suite.fund_pool(10_000, "coinX");

    let farmers = ["farmer1", "farmer2", "farmer3"];
    suite.stake("farmer1", 7, "stakeA");
    suite.stake("farmer2", 11, "stakeA");
    suite.stake("farmer3", 13, "stakeA");

    let check = |suite: &Suite| {
        let entitled: u128 = farmers
            .iter()
            .map(|f| suite.reward_amount(f, "stakeA", "coinX").u128())
            .sum();
        let outstanding = suite.outstanding("stakeA", "coinX");
        let entitled = Decimal256::from_ratio(entitled, 1u128);
        assert!(outstanding >= entitled);
        assert!(outstanding - entitled < Decimal256::from_ratio(10u128, 1u128));
    };

    suite.tick();
    check(&suite);
    suite.tick();
    check(&suite);

    suite.unstake("farmer2", 5, "stakeA");
    check(&suite);
    suite.stake("farmer1", 3, "stakeA");
    suite.tick();
    check(&suite);

    suite.harvest("farmer3", "stakeA");
    check(&suite);
    suite.tick();
    check(&suite);
    suite.unstake("farmer1", 10, "stakeA");
    check(&suite);
}

#[test]
fn test_harvest_twice_pays_once() {
    let mut suite = Suite::new();
    suite.add_public_plan(weights(&[("stakeA", "1")]), Some(coins(100, "coinX")), None);
    suite.fund_pool(10_000, "coinX");
    suite.stake("farmer1", 3, "stakeA");
    suite.tick();
    suite.tick();

    let res = suite.harvest("farmer1", "stakeA");
    assert_eq!(sends_to(&res, &addr("farmer1")), coins(99, "coinX"));
    let res = suite.harvest("farmer1", "stakeA");
    assert!(res.messages.is_empty());

    // one coin of dust stays owed in aggregate
    assert_eq!(suite.outstanding("stakeA", "coinX"), Decimal256::one());
}

#[test]
fn test_ratio_plan_draws_from_remaining_pool() {
    let mut suite = Suite::new();
    suite.add_public_plan(weights(&[("stakeA", "1")]), None, Some(Decimal::percent(10)));
    suite.fund_pool(1_000, "coinX");
    suite.stake("farmer1", 10, "stakeA");

    suite.tick();
    suite.tick();
    suite.tick();

    assert_eq!(suite.reward_amount("farmer1", "stakeA", "coinX"), Uint128::new(190));
    let pool: FarmingPoolResponse = suite.query(QueryMsg::FarmingPool {
        address: addr("pool").to_string(),
    });
    assert_eq!(pool.balances, coins(810, "coinX"));
}

#[test]
fn test_weights_split_between_denoms() {
    let mut suite = Suite::new();
    suite.add_public_plan(
        weights(&[("stakeA", "0.25"), ("stakeB", "0.75")]),
        Some(coins(1_000, "coinX")),
        None,
    );
    suite.fund_pool(10_000, "coinX");
    suite.stake("farmer1", 100, "stakeA");
    suite.stake("farmer2", 100, "stakeB");

    suite.tick();
    suite.tick();
    assert_eq!(suite.rewards("farmer1", "stakeA"), coins(250, "coinX"));
    assert_eq!(suite.rewards("farmer2", "stakeB"), coins(750, "coinX"));
}

fn run_operation_log() -> Binary {
    let mut suite = Suite::new();
    suite.add_public_plan(
        weights(&[("stakeA", "1"), ("stakeB", "2")]),
        Some(coins(333, "coinX")),
        None,
    );
    suite.fund_pool(100_000, "coinX");
    suite.stake("farmer1", 17, "stakeA");
    suite.stake("farmer2", 29, "stakeB");
    suite.tick();
    suite.stake("farmer3", 5, "stakeA");
    suite.tick();
    suite.unstake("farmer1", 4, "stakeA");
    suite.harvest("farmer2", "stakeB");
    suite.tick();
    suite.export()
}

#[test]
fn test_replay_is_deterministic() {
    assert_eq!(run_operation_log(), run_operation_log());
}

#[test]
fn test_genesis_round_trip() {
    let mut original = Suite::new();
    original.add_public_plan(weights(&[("stakeA", "1")]), Some(coins(100, "coinX")), None);
    original.add_public_plan(weights(&[("stakeB", "1")]), Some(coins(50, "coinX")), None);
    original.delete_public_plan(2);
    original.fund_pool(10_000, "coinX");
    original.stake("farmer1", 300, "stakeA");
    original.stake("farmer2", 700, "stakeA");
    original.tick();
    original.tick();
    original.stake("farmer3", 100, "stakeA");

    let genesis: GenesisState = serde_json::from_slice(original.export().as_slice()).unwrap();
    assert_eq!(genesis.plan_records.len(), 1);
    assert_eq!(genesis.last_plan_id, 2);
    assert_eq!(genesis.queued_staking_records.len(), 1);

    let mut restored = Suite::with_genesis(Some(genesis), original.day);
    assert_eq!(restored.export(), original.export());
    for farmer in ["farmer1", "farmer2"] {
        assert_eq!(
            restored.rewards(farmer, "stakeA"),
            original.rewards(farmer, "stakeA")
        );
    }

    original.tick();
    restored.tick();
    assert_eq!(restored.export(), original.export());

    // deleted ids are never handed out again
    for suite in [&mut original, &mut restored] {
        suite.add_public_plan(weights(&[("stakeA", "1")]), Some(coins(10, "coinX")), None);
        let ids: Vec<u64> = suite.plans().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}

#[test]
fn test_plans_query_filters_and_pages() {
    let mut suite = Suite::new();
    suite.add_public_plan(weights(&[("stakeA", "1")]), Some(coins(100, "coinX")), None);
    let start_time = mock_env().block.time;
    suite
        .exec(
            "creator",
            &[],
            ExecuteMsg::CreateRatioPlan {
                name: "private plan".to_string(),
                staking_coin_weights: weights(&[("stakeA", "1")]),
                start_time,
                end_time: start_time.plus_days(10),
                epoch_ratio: Decimal::percent(5),
            },
        )
        .unwrap();

    let private: Vec<Plan> = suite.query(QueryMsg::Plans {
        plan_type: Some(PlanType::Private),
        farming_pool_address: None,
        termination_address: None,
        terminated: None,
        start_after: None,
        limit: None,
    });
    assert_eq!(private.len(), 1);
    assert_eq!(private[0].termination_address, addr("creator"));

    let page: Vec<Plan> = suite.query(QueryMsg::Plans {
        plan_type: None,
        farming_pool_address: None,
        termination_address: None,
        terminated: Some(false),
        start_after: Some(1),
        limit: Some(1),
    });
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, 2);
}
