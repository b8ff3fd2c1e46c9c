//! Term deposits: immutable once created, released in full at maturity.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub deposit_id: u64,
    pub agent_id: u64,
    pub creation_tick: usize,
    pub maturity_tick: usize,
    pub principal: i64,
    pub interest_rate: f64,
    pub matured_cash: i64,
}

impl Deposit {
    pub fn new(
        deposit_id: u64,
        agent_id: u64,
        creation_tick: usize,
        maturity_tick: usize,
        principal: i64,
        interest_rate: f64,
    ) -> Self {
        assert!(principal > 0, "deposit principal must be positive");
        assert!(interest_rate >= 0.0, "interest rate must be non-negative");
        assert!(maturity_tick > creation_tick, "maturity must be after creation");
        let matured_cash = (principal as f64 * (1.0 + interest_rate)).floor() as i64;
        Self {
            deposit_id,
            agent_id,
            creation_tick,
            maturity_tick,
            principal,
            interest_rate,
            matured_cash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matured_cash_truncates() {
        let d = Deposit::new(0, 1, 0, 3, 500_00, 0.03);
        // 50000 * 1.03 = 51500.0 exactly
        assert_eq!(d.matured_cash, 515_00);
    }

    #[test]
    #[should_panic(expected = "deposit principal must be positive")]
    fn rejects_non_positive_principal() {
        Deposit::new(0, 1, 0, 3, 0, 0.03);
    }
}
