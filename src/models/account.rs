//! Accounts: cash/share balances and reservations, owned exclusively by
//! the settlement ledger.
//!
//! Reservation maps double as the working-order index: the key set of
//! `reserved_cash` is exactly the set of this agent's open BUY limit
//! orders (invariant A3), and symmetrically for `reserved_shares` and
//! SELL limits. All mutation happens through `pub(crate)` methods so
//! invariants A1/A2 can be asserted at every exit point rather than
//! trusted to callers outside the settlement module.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A ledger account: one per registered agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    account_id: u64,
    agent_id: u64,

    cash: i64,
    shares: i64,

    /// order_id -> (remaining_qty, limit_price)
    reserved_cash: BTreeMap<u64, (i64, i64)>,
    /// order_id -> remaining_qty
    reserved_shares: BTreeMap<u64, i64>,
    /// deposit_id -> principal
    deposited_cash: BTreeMap<u64, i64>,
}

impl Account {
    pub(crate) fn new(account_id: u64, agent_id: u64, cash: i64, shares: i64) -> Self {
        assert!(cash >= 0, "initial cash must be non-negative");
        assert!(shares >= 0, "initial shares must be non-negative");
        Self {
            account_id,
            agent_id,
            cash,
            shares,
            reserved_cash: BTreeMap::new(),
            reserved_shares: BTreeMap::new(),
            deposited_cash: BTreeMap::new(),
        }
    }

    pub fn account_id(&self) -> u64 {
        self.account_id
    }

    pub fn agent_id(&self) -> u64 {
        self.agent_id
    }

    pub fn cash(&self) -> i64 {
        self.cash
    }

    pub fn shares(&self) -> i64 {
        self.shares
    }

    pub fn reserved_cash(&self) -> &BTreeMap<u64, (i64, i64)> {
        &self.reserved_cash
    }

    pub fn reserved_shares(&self) -> &BTreeMap<u64, i64> {
        &self.reserved_shares
    }

    pub fn deposited_cash(&self) -> &BTreeMap<u64, i64> {
        &self.deposited_cash
    }

    pub fn total_reserved_cash(&self) -> i64 {
        self.reserved_cash.values().map(|(qty, price)| qty * price).sum()
    }

    pub fn total_reserved_shares(&self) -> i64 {
        self.reserved_shares.values().sum()
    }

    pub fn total_deposited_cash(&self) -> i64 {
        self.deposited_cash.values().sum()
    }

    pub(crate) fn debit_cash(&mut self, amount: i64) {
        assert!(amount >= 0, "debit amount must be non-negative");
        self.cash -= amount;
        assert!(self.cash >= 0, "cash went negative on debit");
    }

    pub(crate) fn credit_cash(&mut self, amount: i64) {
        assert!(amount >= 0, "credit amount must be non-negative");
        self.cash += amount;
    }

    pub(crate) fn debit_shares(&mut self, amount: i64) {
        assert!(amount >= 0, "debit amount must be non-negative");
        self.shares -= amount;
        assert!(self.shares >= 0, "shares went negative on debit");
    }

    pub(crate) fn credit_shares(&mut self, amount: i64) {
        assert!(amount >= 0, "credit amount must be non-negative");
        self.shares += amount;
    }

    pub(crate) fn reserve_cash_for_order(&mut self, order_id: u64, quantity: i64, price: i64) {
        self.reserved_cash.insert(order_id, (quantity, price));
    }

    pub(crate) fn reserve_shares_for_order(&mut self, order_id: u64, quantity: i64) {
        self.reserved_shares.insert(order_id, quantity);
    }

    /// Reduce (or fully drop) the cash reservation for `order_id`.
    /// Returns the released quantity's `(cost, price)` so the caller can
    /// compute the cash + fee to credit back.
    pub(crate) fn reduce_cash_reservation(&mut self, order_id: u64, released_quantity: i64) -> i64 {
        let (reserved_quantity, price) = *self
            .reserved_cash
            .get(&order_id)
            .expect("order_id must have an open cash reservation");
        assert!(released_quantity <= reserved_quantity, "released more than reserved");
        let remaining = reserved_quantity - released_quantity;
        if remaining == 0 {
            self.reserved_cash.remove(&order_id);
        } else {
            self.reserved_cash.insert(order_id, (remaining, price));
        }
        price
    }

    pub(crate) fn reduce_share_reservation(&mut self, order_id: u64, released_quantity: i64) {
        let reserved_quantity = *self
            .reserved_shares
            .get(&order_id)
            .expect("order_id must have an open share reservation");
        assert!(released_quantity <= reserved_quantity, "released more than reserved");
        let remaining = reserved_quantity - released_quantity;
        if remaining == 0 {
            self.reserved_shares.remove(&order_id);
        } else {
            self.reserved_shares.insert(order_id, remaining);
        }
    }

    pub(crate) fn has_cash_reservation(&self, order_id: u64) -> bool {
        self.reserved_cash.contains_key(&order_id)
    }

    pub(crate) fn has_share_reservation(&self, order_id: u64) -> bool {
        self.reserved_shares.contains_key(&order_id)
    }

    pub(crate) fn cash_reservation(&self, order_id: u64) -> Option<(i64, i64)> {
        self.reserved_cash.get(&order_id).copied()
    }

    pub(crate) fn share_reservation(&self, order_id: u64) -> Option<i64> {
        self.reserved_shares.get(&order_id).copied()
    }

    pub(crate) fn lock_deposit(&mut self, deposit_id: u64, principal: i64) {
        self.deposited_cash.insert(deposit_id, principal);
    }

    pub(crate) fn release_deposit(&mut self, deposit_id: u64) -> i64 {
        self.deposited_cash
            .remove(&deposit_id)
            .expect("deposit_id must have a locked principal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_reflect_reservations() {
        let mut acct = Account::new(0, 1, 10_000, 0);
        acct.debit_cash(1_010);
        acct.reserve_cash_for_order(5, 10, 101);
        assert_eq!(acct.total_reserved_cash(), 1_010);
        assert_eq!(acct.cash(), 10_000 - 1_010);
    }

    #[test]
    #[should_panic(expected = "cash went negative on debit")]
    fn debit_below_zero_panics() {
        let mut acct = Account::new(0, 1, 100, 0);
        acct.debit_cash(200);
    }

    #[test]
    fn reservation_drops_entry_at_zero() {
        let mut acct = Account::new(0, 1, 10_000, 0);
        acct.reserve_shares_for_order(9, 5);
        acct.reduce_share_reservation(9, 5);
        assert!(!acct.has_share_reservation(9));
    }
}
