//! The settlement ledger: accounts, cash/share reservation, trade
//! settlement, and the term-deposit calendar.
//!
//! Two failure modes, per the crate's error-handling split: a rejected
//! reservation (insufficient funds/shares) is a `bool`/`Option` domain
//! outcome, never an `Err`; a precondition violation (settling a trade
//! whose agent IDs disagree with its orders, releasing a reservation
//! that was never made) is an `assert!` -- a programmer error that has
//! no recovery path, mirroring `settlement::rtgs::try_settle`'s
//! atomic-assert shape in spirit, generalized from `Result` to `assert!`
//! because this module's failures are genuinely unrecoverable rather
//! than retryable liquidity waits.

use std::collections::{BTreeMap, HashMap};

use crate::models::order::{OrderType, Side};
use crate::models::{Account, Deposit, Order, Trade};
use crate::money::{fee_ppm, per_unit_fee_ppm, to_fx};

pub struct SettlementLedger {
    accounts: HashMap<u64, Account>,
    /// maturity_tick -> deposits maturing that tick
    open_deposits: BTreeMap<usize, Vec<Deposit>>,

    fee_rate_ppm: i64,
    price_scale: i64,

    next_account_id: u64,
    next_deposit_id: u64,
}

impl SettlementLedger {
    pub fn new(fee_rate_ppm: i64, price_scale: i64) -> Self {
        Self {
            accounts: HashMap::new(),
            open_deposits: BTreeMap::new(),
            fee_rate_ppm,
            price_scale,
            next_account_id: 0,
            next_deposit_id: 0,
        }
    }

    pub fn is_account_exist(&self, agent_id: u64) -> bool {
        self.accounts.contains_key(&agent_id)
    }

    pub fn account(&self, agent_id: u64) -> Option<&Account> {
        self.accounts.get(&agent_id)
    }

    /// Register a new account. `initial_cash` is in human units.
    ///
    /// # Panics
    /// Panics if the agent is already registered, or if either initial
    /// balance is negative -- both are expected to be checked by the
    /// facade before this is called.
    pub fn register_account(&mut self, agent_id: u64, initial_cash: f64, initial_shares: i64) -> &Account {
        assert!(!self.accounts.contains_key(&agent_id), "agent already registered");
        assert!(initial_cash >= 0.0, "initial_cash must be non-negative");
        assert!(initial_shares >= 0, "initial_shares must be non-negative");

        let account_id = self.next_account_id;
        self.next_account_id += 1;

        let account = Account::new(account_id, agent_id, to_fx(initial_cash, self.price_scale), initial_shares);
        self.accounts.insert(agent_id, account);
        self.accounts.get(&agent_id).expect("just inserted")
    }

    /// Attempt to reserve funds/shares for a new LIMIT order.
    ///
    /// # Panics
    /// Panics if `order` is not a fresh, unreserved LIMIT order, or if
    /// its agent has no account.
    pub fn limit_check_and_reserve_funds(&mut self, order: &Order) -> bool {
        assert_eq!(order.order_type(), OrderType::Limit);
        assert_eq!(order.remaining_quantity(), order.quantity());
        assert!(order.trades().is_empty());
        let price = order.price().expect("LIMIT order has a price");
        assert!(price > 0);

        let account = self
            .accounts
            .get_mut(&order.agent_id())
            .expect("order.agent_id must have a registered account");

        match order.side() {
            Side::Buy => {
                let trade_cost = order.quantity() * price;
                let fee = fee_ppm(price, order.quantity(), self.fee_rate_ppm);
                let required_cash = trade_cost + fee;
                if account.cash() < required_cash {
                    return false;
                }
                account.debit_cash(required_cash);
                account.reserve_cash_for_order(order.order_id(), order.quantity(), price);
                true
            }
            Side::Sell => {
                let required_shares = order.quantity();
                if account.shares() < required_shares {
                    return false;
                }
                account.debit_shares(required_shares);
                account.reserve_shares_for_order(order.order_id(), order.quantity());
                true
            }
        }
    }

    /// How many units of `order` can actually be filled at `trade_price`
    /// (BUY) or at all (SELL), given the agent's current balance.
    ///
    /// # Panics
    /// Panics if `order` is not a working MARKET order, or BUY is
    /// called without a `trade_price`.
    pub fn market_possible_quantity(&self, order: &Order, trade_price: Option<i64>) -> i64 {
        assert_eq!(order.order_type(), OrderType::Market);
        assert!(order.price().is_none());
        assert!(order.remaining_quantity() > 0 && order.remaining_quantity() <= order.quantity());

        let account = self
            .accounts
            .get(&order.agent_id())
            .expect("order.agent_id must have a registered account");

        match order.side() {
            Side::Buy => {
                let trade_price = trade_price.expect("BUY market orders require a trade_price");
                let per_unit_fee = per_unit_fee_ppm(trade_price, self.fee_rate_ppm);
                let affordable = account.cash() / (trade_price + per_unit_fee);
                affordable.min(order.remaining_quantity()).max(0)
            }
            Side::Sell => order.remaining_quantity().min(account.shares()),
        }
    }

    /// Release (part of) a BUY limit order's cash reservation, crediting
    /// back the reservation-basis cash plus fee. `traded_quantity` of
    /// `None` releases the entire remaining reservation (cancel/expire/
    /// wash-kill path); `Some(qty)` releases only the filled portion.
    ///
    /// # Panics
    /// Panics if the order has no open cash reservation, or if
    /// `traded_quantity` exceeds what remains reserved.
    pub fn release_cash(&mut self, order: &Order, traded_quantity: Option<i64>) {
        let account = self
            .accounts
            .get_mut(&order.agent_id())
            .expect("order.agent_id must have a registered account");
        assert!(account.has_cash_reservation(order.order_id()), "no open cash reservation");

        let (reserved_quantity, reserved_price) =
            account.cash_reservation(order.order_id()).expect("checked above");
        let released_quantity = traded_quantity.unwrap_or(reserved_quantity);
        assert!(released_quantity <= reserved_quantity, "released more than reserved");

        let price = account.reduce_cash_reservation(order.order_id(), released_quantity);
        assert_eq!(price, reserved_price);

        let released_cost = released_quantity * reserved_price;
        let released_fee = fee_ppm(reserved_price, released_quantity, self.fee_rate_ppm);
        account.credit_cash(released_cost + released_fee);
    }

    /// Symmetric to [`release_cash`](Self::release_cash), for SELL
    /// limit orders' share reservations.
    pub fn release_shares(&mut self, order: &Order, traded_quantity: Option<i64>) {
        let account = self
            .accounts
            .get_mut(&order.agent_id())
            .expect("order.agent_id must have a registered account");
        assert!(account.has_share_reservation(order.order_id()), "no open share reservation");

        let reserved_quantity = account.share_reservation(order.order_id()).expect("checked above");
        let released_quantity = traded_quantity.unwrap_or(reserved_quantity);
        assert!(released_quantity <= reserved_quantity, "released more than reserved");

        account.reduce_share_reservation(order.order_id(), released_quantity);
        account.credit_shares(released_quantity);
    }

    /// Settle one trade between a buyer and seller order: release any
    /// LIMIT-side reservation proportionally, transfer cash/shares,
    /// apply fees, and decrement both orders' remaining quantity.
    ///
    /// # Panics
    /// Panics on any of the precondition violations spec.md enumerates:
    /// mismatched sides, insufficient remaining quantity, a limit price
    /// that would not actually cross at the trade price, mismatched
    /// trade/order identifiers, or a non-positive trade price/quantity.
    pub fn settle_trade(&mut self, buyer_order: &mut Order, seller_order: &mut Order, trade: &Trade) {
        assert_eq!(buyer_order.side(), Side::Buy);
        assert_eq!(seller_order.side(), Side::Sell);
        assert!(buyer_order.remaining_quantity() >= trade.quantity);
        assert!(seller_order.remaining_quantity() >= trade.quantity);
        if let Some(p) = buyer_order.price() {
            assert!(p >= trade.price);
        }
        if let Some(p) = seller_order.price() {
            assert!(p <= trade.price);
        }
        assert_eq!(trade.buyer_agent_id, buyer_order.agent_id());
        assert_eq!(trade.seller_agent_id, seller_order.agent_id());
        assert_eq!(trade.buy_order_id, buyer_order.order_id());
        assert_eq!(trade.sell_order_id, seller_order.order_id());
        assert!(trade.price > 0);
        assert!(trade.quantity > 0);

        if buyer_order.order_type() == OrderType::Limit {
            self.release_cash(buyer_order, Some(trade.quantity));
        }
        if seller_order.order_type() == OrderType::Limit {
            self.release_shares(seller_order, Some(trade.quantity));
        }

        let trade_cost = trade.quantity * trade.price;

        let buyer_account = self.accounts.get_mut(&buyer_order.agent_id()).expect("checked above");
        buyer_account.debit_cash(trade_cost);
        buyer_account.credit_shares(trade.quantity);
        buyer_account.debit_cash(trade.fee);

        let seller_account = self.accounts.get_mut(&seller_order.agent_id()).expect("checked above");
        seller_account.credit_cash(trade_cost);
        seller_account.debit_shares(trade.quantity);
        seller_account.debit_cash(trade.fee);

        buyer_order.reduce_remaining(trade.quantity);
        seller_order.reduce_remaining(trade.quantity);
        buyer_order.attach_trade(*trade);
        seller_order.attach_trade(*trade);
    }

    /// Create a term deposit. `deposit_cash` is in human units.
    ///
    /// Returns `None` if the account has insufficient free cash; the
    /// caller (facade) is responsible for validating `term` membership
    /// and the maturity horizon before calling this.
    pub fn create_deposit(
        &mut self,
        agent_id: u64,
        term: usize,
        deposit_cash: f64,
        current_macro_tick: usize,
        interest_rate: f64,
    ) -> Option<Deposit> {
        assert!(self.is_account_exist(agent_id));
        assert!(deposit_cash > 0.0);

        let principal = to_fx(deposit_cash, self.price_scale);
        let deposit_id = self.next_deposit_id;

        let account = self.accounts.get_mut(&agent_id).expect("checked above");
        if account.cash() < principal {
            return None;
        }
        account.debit_cash(principal);
        account.lock_deposit(deposit_id, principal);
        self.next_deposit_id += 1;

        let deposit = Deposit::new(
            deposit_id,
            agent_id,
            current_macro_tick,
            current_macro_tick + term,
            principal,
            interest_rate,
        );
        self.open_deposits.entry(deposit.maturity_tick).or_default().push(deposit);
        Some(deposit)
    }

    /// Pop and credit all deposits maturing at or before
    /// `current_macro_tick`. Returns the matured deposits for the
    /// caller to log/persist.
    pub fn check_matured_deposits(&mut self, current_macro_tick: usize) -> Vec<Deposit> {
        let mut matured = Vec::new();
        let due_ticks: Vec<usize> = self
            .open_deposits
            .range(..=current_macro_tick)
            .map(|(tick, _)| *tick)
            .collect();

        for tick in due_ticks {
            let deposits = self.open_deposits.remove(&tick).expect("collected from range above");
            for deposit in deposits {
                let account = self.accounts.get_mut(&deposit.agent_id).expect("deposit agent must exist");
                let principal = account.release_deposit(deposit.deposit_id);
                assert_eq!(principal, deposit.principal);
                account.credit_cash(deposit.matured_cash);
                matured.push(deposit);
            }
        }
        matured
    }

    /// Sum of every account's free cash, reserved cash, and deposited
    /// cash -- used by conservation property tests.
    pub fn total_cash(&self) -> i64 {
        self.accounts
            .values()
            .map(|a| a.cash() + a.total_reserved_cash() + a.total_deposited_cash())
            .sum()
    }

    pub fn total_shares(&self) -> i64 {
        self.accounts.values().map(|a| a.shares() + a.total_reserved_shares()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::OrderType;

    fn limit(order_id: u64, agent_id: u64, side: Side, qty: i64, price: i64) -> Order {
        let mut o = Order::new(order_id, agent_id, 0.0, (0, 0), OrderType::Limit, side, qty, Some(price));
        o.start_working();
        o
    }

    #[test]
    fn reserve_exactly_at_cash_accepted_one_over_rejected() {
        let mut ledger = SettlementLedger::new(0, 100);
        ledger.register_account(1, 101.00, 0);
        let exact = limit(1, 1, Side::Buy, 1, 101_00);
        assert!(ledger.limit_check_and_reserve_funds(&exact));

        let mut ledger2 = SettlementLedger::new(0, 100);
        ledger2.register_account(2, 100.99, 0);
        let over = limit(2, 2, Side::Buy, 1, 101_00);
        assert!(!ledger2.limit_check_and_reserve_funds(&over));
    }

    #[test]
    fn cancel_restores_cash_exactly() {
        let mut ledger = SettlementLedger::new(0, 100);
        ledger.register_account(1, 1000.0, 0);
        let before = ledger.account(1).unwrap().cash();
        let order = limit(1, 1, Side::Buy, 10, 100_00);
        ledger.limit_check_and_reserve_funds(&order);
        ledger.release_cash(&order, None);
        assert_eq!(ledger.account(1).unwrap().cash(), before);
    }

    #[test]
    fn settle_trade_conserves_cash_and_shares() {
        let mut ledger = SettlementLedger::new(0, 100);
        ledger.register_account(1, 10_000.0, 0); // buyer
        ledger.register_account(2, 0.0, 50); // seller

        let mut buy = limit(1, 1, Side::Buy, 10, 101_00);
        let mut sell = limit(2, 2, Side::Sell, 10, 100_00);
        ledger.limit_check_and_reserve_funds(&buy);
        ledger.limit_check_and_reserve_funds(&sell);

        let total_before = ledger.total_cash();
        let trade = Trade::new(0, 0, 0, 1, 1, 2, 2, 100_00, 10, 0);
        ledger.settle_trade(&mut buy, &mut sell, &trade);

        assert_eq!(ledger.total_cash(), total_before);
        assert_eq!(ledger.account(1).unwrap().cash(), 9_000_00);
        assert_eq!(ledger.account(1).unwrap().shares(), 10);
        assert_eq!(ledger.account(2).unwrap().cash(), 1_000_00);
        assert_eq!(ledger.account(2).unwrap().shares(), 40);
    }

    #[test]
    fn deposit_matures_with_floored_interest() {
        let mut ledger = SettlementLedger::new(0, 100);
        ledger.register_account(1, 1_000.0, 0);
        ledger.create_deposit(1, 3, 500.0, 0, 0.03);
        assert!(ledger.check_matured_deposits(2).is_empty());
        let matured = ledger.check_matured_deposits(3);
        assert_eq!(matured.len(), 1);
        assert_eq!(ledger.account(1).unwrap().cash(), 101_500);
    }
}
