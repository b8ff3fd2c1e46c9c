//! The environment facade: the single entry point a driver calls once
//! per tick. Thin orchestration only -- argument validation, monotonic
//! ID assignment, and handing off to the ledger/engine/economy/storage;
//! no matching or settlement logic lives here.
//!
//! Every public method either mutates state and returns a view, or
//! returns `None`/is a silent no-op on invalid input -- never a
//! `Result`, per spec.md §7: domain outcomes are not errors.

use crate::book::OrderBook;
use crate::config::{EconomyScenario, EnvironmentConfig, SimulationConfig};
use crate::economy::EconomyProcess;
use crate::engine::CdaEngine;
use crate::events::{EventLog, SimEvent};
use crate::models::order::{OrderEndReason, OrderLifecycle, OrderType, Side};
use crate::models::Order;
use crate::settlement::SettlementLedger;
use crate::storage::{AccountRow, OrderRow, StorageError, StorageSink};
use crate::time::HybridTime;
use crate::views::{self, AccountView, DepositView, EconomyInsightView, MarketDataView, OrderView};

/// Composes the order book, settlement ledger, CDA engine, economy
/// process, storage sink, and hybrid-time counter into the single
/// surface an outer simulation loop drives.
pub struct Environment {
    config: EnvironmentConfig,
    time: HybridTime,
    ledger: SettlementLedger,
    engine: CdaEngine,
    economy: EconomyProcess,
    storage: Box<dyn StorageSink>,
    events: EventLog,

    next_order_id: u64,
}

impl Environment {
    pub fn new(config: EnvironmentConfig, sim_config: SimulationConfig, storage: Box<dyn StorageSink>) -> Self {
        let time = HybridTime::new(
            sim_config.init_macro_tick,
            sim_config.init_micro_tick,
            sim_config.simulation_macro_tick,
            sim_config.simulation_micro_tick,
        );
        let economy = EconomyProcess::new(config.economy_scenario.clone());
        let ledger = SettlementLedger::new(config.fee_rate_ppm, config.price_scale);
        let engine = CdaEngine::new(config.fee_rate_ppm);
        Self {
            config,
            time,
            ledger,
            engine,
            economy,
            storage,
            events: EventLog::new(),
            next_order_id: 0,
        }
    }

    pub fn time(&self) -> HybridTime {
        self.time
    }

    pub fn book(&self) -> &OrderBook {
        self.engine.book()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn economy_scenario(&self) -> &EconomyScenario {
        &self.config.economy_scenario
    }

    /// Read-only snapshot of a registered agent's account. `None` if
    /// the agent was never registered.
    pub fn account(&self, agent_id: u64) -> Option<AccountView> {
        self.ledger.account(agent_id).map(|a| views::account_view(a, self.config.price_scale))
    }

    /// Advance hybrid time by one micro tick. Returns `false` once past
    /// the simulation horizon, matching `HybridTime::step`.
    pub fn step_time(&mut self) -> bool {
        self.time.step()
    }

    /// Register a new agent's account. `initial_cash` is in human
    /// units. Returns `None` on a duplicate agent or a negative amount,
    /// without mutating any state.
    pub fn register_agent(&mut self, agent_id: u64, initial_cash: f64, initial_shares: i64) -> Option<AccountView> {
        if self.ledger.is_account_exist(agent_id) {
            self.reject(agent_id, "duplicate agent");
            return None;
        }
        if initial_cash < 0.0 || initial_shares < 0 {
            self.reject(agent_id, "negative initial balance");
            return None;
        }

        let account = self.ledger.register_account(agent_id, initial_cash, initial_shares);
        let view = views::account_view(account, self.config.price_scale);
        self.storage.add_account(AccountRow::from_account(account, self.time.macro_tick()));
        Some(view)
    }

    /// Submit a new order. Returns `None` on unknown agent, a
    /// non-positive quantity, a LIMIT order with no positive price, or
    /// a MARKET order carrying a price -- before any state mutation.
    pub fn create_order(
        &mut self,
        agent_id: u64,
        order_type: OrderType,
        side: Side,
        quantity: i64,
        price: Option<f64>,
    ) -> Option<OrderView> {
        if !self.ledger.is_account_exist(agent_id) {
            self.reject(agent_id, "unknown agent");
            return None;
        }
        if quantity <= 0 {
            self.reject(agent_id, "non-positive quantity");
            return None;
        }
        let fx_price = match (order_type, price) {
            (OrderType::Limit, Some(p)) if p > 0.0 => Some(crate::money::to_fx(p, self.config.price_scale)),
            (OrderType::Limit, _) => {
                self.reject(agent_id, "limit order requires a positive price");
                return None;
            }
            (OrderType::Market, None) => None,
            (OrderType::Market, Some(_)) => {
                self.reject(agent_id, "market order must not carry a price");
                return None;
            }
        };

        let order_id = self.next_order_id;
        self.next_order_id += 1;

        let order = Order::new(
            order_id,
            agent_id,
            order_id as f64,
            self.time.as_tuple(),
            order_type,
            side,
            quantity,
            fx_price,
        );

        let outcome = self
            .engine
            .process_new_order(order, &mut self.ledger, self.time.macro_tick(), self.time.micro_tick());

        for trade in &outcome.trades {
            self.storage.add_trade(*trade);
        }
        for maker in &outcome.filled_makers {
            self.record_terminated_order(maker);
        }
        if outcome.order.lifecycle() == OrderLifecycle::Done {
            self.record_terminated_order(&outcome.order);
        } else {
            self.storage.add_order(OrderRow::from_order(&outcome.order));
        }

        Some(views::order_view(&outcome.order, self.config.price_scale))
    }

    /// Cancel a working order. Silent no-op if unknown, foreign, or
    /// already terminal.
    pub fn cancel_order(&mut self, agent_id: u64, order_id: u64) -> Option<OrderView> {
        let cancelled = self.engine.cancel_order(order_id, agent_id, &mut self.ledger)?;
        self.record_terminated_order(&cancelled);
        Some(views::order_view(&cancelled, self.config.price_scale))
    }

    /// Drain the book: release every reservation and terminate every
    /// resident order as `EXPIRED`.
    pub fn expire_session(&mut self) -> Vec<OrderView> {
        let terminated = self.engine.expire_session(&mut self.ledger);
        let macro_tick = self.time.macro_tick();
        let micro_tick = self.time.micro_tick();
        let (mut bids, mut asks) = (0usize, 0usize);
        for order in &terminated {
            match order.side() {
                Side::Buy => bids += 1,
                Side::Sell => asks += 1,
            }
            self.record_terminated_order(order);
        }
        self.events.record(SimEvent::SessionExpired {
            macro_tick,
            micro_tick,
            bids_released: bids,
            asks_released: asks,
        });
        terminated.iter().map(|o| views::order_view(o, self.config.price_scale)).collect()
    }

    /// Create a term deposit. `cash` is in human units. Returns `None`
    /// on an unconfigured `term`, a maturity beyond the simulation
    /// horizon, a non-positive `cash`, or insufficient free cash.
    pub fn create_deposit(&mut self, agent_id: u64, term: usize, cash: f64) -> Option<DepositView> {
        if !self.config.economy_scenario.deposit_terms.contains(&term) {
            self.reject(agent_id, "unconfigured deposit term");
            return None;
        }
        let current_macro = self.time.macro_tick();
        if current_macro + term > self.time.simulation_macro_tick() {
            self.reject(agent_id, "deposit maturity beyond simulation horizon");
            return None;
        }
        if cash <= 0.0 {
            self.reject(agent_id, "non-positive deposit amount");
            return None;
        }
        if !self.ledger.is_account_exist(agent_id) {
            self.reject(agent_id, "unknown agent");
            return None;
        }

        let rate = *self.economy.deposit_rates(current_macro).get(&term)?;
        let deposit = self.ledger.create_deposit(agent_id, term, cash, current_macro, rate)?;
        self.storage.add_deposit(deposit);
        Some(views::deposit_view(&deposit, self.config.price_scale))
    }

    /// Pop and credit every deposit maturing at or before the current
    /// macro tick.
    pub fn check_matured_deposits(&mut self) -> Vec<DepositView> {
        let current_macro = self.time.macro_tick();
        let matured = self.ledger.check_matured_deposits(current_macro);
        for deposit in &matured {
            self.events.record(SimEvent::DepositMatured {
                macro_tick: current_macro,
                deposit_id: deposit.deposit_id,
                agent_id: deposit.agent_id,
                principal: deposit.principal,
                matured_cash: deposit.matured_cash,
            });
        }
        matured.iter().map(|d| views::deposit_view(d, self.config.price_scale)).collect()
    }

    /// The current macro tick's economy insight, recorded to storage.
    pub fn get_economy_insight(&mut self) -> EconomyInsightView {
        let insight = self.economy.insight(self.time.macro_tick(), self.config.price_scale);
        self.storage.add_insight(insight.clone());
        views::economy_insight_view(&insight, self.config.price_scale)
    }

    /// The current `(macro, micro)` market data snapshot, recorded to
    /// storage.
    pub fn get_market_data(&mut self) -> MarketDataView {
        let data = self.engine.get_market_data(
            self.time.macro_tick(),
            self.time.micro_tick(),
            self.next_order_id as f64,
            self.config.insight_l2_depth,
        );
        self.storage.add_market_data(data.clone());
        views::market_data_view(&data, self.config.price_scale)
    }

    /// Flush the storage sink for the current macro tick.
    pub fn flush_storage(&mut self) -> Result<bool, StorageError> {
        self.storage.flush(self.time.macro_tick())
    }

    fn record_terminated_order(&mut self, order: &Order) {
        assert_eq!(order.lifecycle(), OrderLifecycle::Done, "only terminal orders are recorded here");
        assert_ne!(order.end_reason(), OrderEndReason::None);
        let (macro_tick, micro_tick) = self.time.as_tuple();
        self.events.record(SimEvent::OrderTerminated {
            macro_tick,
            micro_tick,
            order_id: order.order_id(),
            agent_id: order.agent_id(),
            end_reason: order.end_reason(),
        });
        self.storage.add_order(OrderRow::from_order(order));
    }

    fn reject(&mut self, agent_id: u64, reason: &'static str) {
        let (macro_tick, micro_tick) = self.time.as_tuple();
        self.events.record(SimEvent::ValidationRejected { macro_tick, micro_tick, agent_id, reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorageSink;

    fn scenario() -> EconomyScenario {
        EconomyScenario::new(
            42, 100.0, 100.0, 0.0, 0.1, 1.0, 0.02, 0.02, 0.1, 0.001, 2.0, 0.5, 0.0, 0.0,
            vec![1, 3, 6],
        )
    }

    fn env() -> Environment {
        let env_config = EnvironmentConfig::new(100, 5, 0, scenario());
        let sim_config = SimulationConfig::new(10, 4, 0, 0);
        Environment::new(env_config, sim_config, Box::new(InMemoryStorageSink::new()))
    }

    #[test]
    fn register_agent_rejects_duplicate() {
        let mut e = env();
        assert!(e.register_agent(1, 1_000.0, 0).is_some());
        assert!(e.register_agent(1, 1_000.0, 0).is_none());
    }

    #[test]
    fn create_order_rejects_unknown_agent() {
        let mut e = env();
        assert!(e.create_order(99, OrderType::Limit, Side::Buy, 1, Some(10.0)).is_none());
    }

    #[test]
    fn clean_cross_scenario() {
        let mut e = env();
        e.register_agent(1, 10_000.0, 0);
        e.register_agent(2, 0.0, 50);

        e.create_order(2, OrderType::Limit, Side::Sell, 10, Some(100.0));
        let buy = e.create_order(1, OrderType::Limit, Side::Buy, 10, Some(101.0)).unwrap();

        assert_eq!(buy.end_reason, OrderEndReason::Filled);
        assert_eq!(buy.trades.len(), 1);
        assert_eq!(buy.trades[0].price, 100.0);
    }

    #[test]
    fn deposit_rejects_unconfigured_term() {
        let mut e = env();
        e.register_agent(1, 1_000.0, 0);
        assert!(e.create_deposit(1, 2, 100.0).is_none());
    }

    #[test]
    fn deposit_rejects_maturity_beyond_horizon() {
        let env_config = EnvironmentConfig::new(100, 5, 0, scenario());
        let sim_config = SimulationConfig::new(5, 4, 0, 0);
        let mut e = Environment::new(env_config, sim_config, Box::new(InMemoryStorageSink::new()));
        e.register_agent(1, 1_000.0, 0);
        // term=6 would mature at macro tick 6, past the 5-tick horizon.
        assert!(e.create_deposit(1, 6, 100.0).is_none());
    }

    #[test]
    fn market_data_reflects_empty_book_as_none() {
        let mut e = env();
        let data = e.get_market_data();
        assert!(data.l1_bids.is_none());
        assert!(data.spread.is_none());
    }
}
