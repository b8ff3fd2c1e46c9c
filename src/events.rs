//! Event logging for simulation replay and auditing.
//!
//! This is the teacher's substitute for a `tracing`/`log` dependency: a
//! typed, in-memory log of significant state transitions, independent of
//! the storage sink (which persists domain rows, not a narrative log).

use serde::Serialize;

use crate::models::order::OrderEndReason;

/// A significant state transition worth recording for replay/debugging.
///
/// `Serialize`-only: `ValidationRejected.reason` is a `&'static str`, and
/// deriving `Deserialize` for a struct/enum holding a non-generic
/// `&'static str` field does not compile (serde only implements
/// `Deserialize<'de>` for `&'de str`, not for an arbitrary `'static`
/// borrow) -- this log is write-only within the process anyway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimEvent {
    /// An order reached a terminal end reason.
    OrderTerminated {
        macro_tick: usize,
        micro_tick: usize,
        order_id: u64,
        agent_id: u64,
        end_reason: OrderEndReason,
    },
    /// A deposit matured and was credited back to its owning account.
    DepositMatured {
        macro_tick: usize,
        deposit_id: u64,
        agent_id: u64,
        principal: i64,
        matured_cash: i64,
    },
    /// The order book was drained by session expiry.
    SessionExpired {
        macro_tick: usize,
        micro_tick: usize,
        bids_released: usize,
        asks_released: usize,
    },
    /// A facade call was rejected by argument validation before any
    /// state mutation occurred.
    ValidationRejected {
        macro_tick: usize,
        micro_tick: usize,
        agent_id: u64,
        reason: &'static str,
    },
}

/// An append-only, in-memory record of [`SimEvent`]s.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventLog {
    events: Vec<SimEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn record(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_events_in_order() {
        let mut log = EventLog::new();
        log.record(SimEvent::SessionExpired {
            macro_tick: 1,
            micro_tick: 0,
            bids_released: 2,
            asks_released: 1,
        });
        log.record(SimEvent::ValidationRejected {
            macro_tick: 1,
            micro_tick: 0,
            agent_id: 7,
            reason: "unknown agent",
        });
        assert_eq!(log.len(), 2);
        assert!(matches!(log.events()[0], SimEvent::SessionExpired { .. }));
    }
}
