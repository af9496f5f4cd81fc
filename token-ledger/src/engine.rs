//! Ledger engine: the state machine behind mint, transfer and burn
//!
//! [`LedgerState`] owns the balance store, the total supply and the history
//! log. Every mutation validates first and applies second, so a failed call
//! leaves all three untouched and a successful one updates all three.
//!
//! # Invariants
//!
//! - Supply conservation: `total_supply == Σ balances`
//! - Transfers never change the total supply
//! - Exactly one history entry per successful mutation

use crate::{
    arith,
    balances::BalanceStore,
    clock::{Clock, SystemClock},
    history::{HistoryLog, RetentionPolicy},
    metrics::MemMetrics,
    types::{Operation, Page, Principal, Transaction},
    Error, Result,
};
use std::sync::Arc;

/// Owned ledger state
#[derive(Debug)]
pub struct LedgerState {
    balances: BalanceStore,
    total_supply: u64,
    history: HistoryLog,
    clock: Arc<dyn Clock>,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerState {
    /// Empty ledger on the system clock, keeping all history
    pub fn new() -> Self {
        Self::with_parts(RetentionPolicy::Unbounded, Arc::new(SystemClock::new()))
    }

    /// Empty ledger with explicit retention policy and clock
    pub fn with_parts(retention: RetentionPolicy, clock: Arc<dyn Clock>) -> Self {
        Self::with_history(HistoryLog::with_retention(retention), clock)
    }

    /// Ledger over a prepared (normally empty) history log
    pub fn with_history(history: HistoryLog, clock: Arc<dyn Clock>) -> Self {
        Self {
            balances: BalanceStore::new(),
            total_supply: 0,
            history,
            clock,
        }
    }

    /// Create `qty` new tokens credited to `to`
    ///
    /// Returns the history position of the mint.
    pub fn mint(&mut self, to: Principal, qty: u64) -> Result<u64> {
        let supply = arith::add(self.total_supply, qty)?;
        // Every balance is bounded by the supply, but check the account anyway
        arith::add(self.balances.get(&to), qty)?;
        let tx = self.prepare(Operation::Mint { to: to.clone() }, qty)?;

        self.balances.credit(&to, qty)?;
        self.total_supply = supply;

        self.record(tx)
    }

    /// Move `qty` from `caller` to `to`
    ///
    /// A self-transfer leaves balances as they are but is still recorded, as
    /// is a transfer of zero.
    pub fn transfer(&mut self, caller: Principal, to: Principal, qty: u64) -> Result<u64> {
        let have = self.balances.get(&caller);
        if qty > have {
            return Err(Error::InsufficientBalance { have, need: qty });
        }
        if caller != to {
            arith::add(self.balances.get(&to), qty)?;
        }
        let tx = self.prepare(
            Operation::Transfer {
                from: caller.clone(),
                to: to.clone(),
            },
            qty,
        )?;

        self.balances.debit(&caller, qty)?;
        self.balances.credit(&to, qty)?;

        self.record(tx)
    }

    /// Destroy `qty` tokens held by `caller`
    pub fn burn(&mut self, caller: Principal, qty: u64) -> Result<u64> {
        let have = self.balances.get(&caller);
        if qty > have {
            return Err(Error::InsufficientBalance { have, need: qty });
        }
        let supply = arith::sub(self.total_supply, qty)?;
        let tx = self.prepare(Operation::Burn { from: caller.clone() }, qty)?;

        self.balances.debit(&caller, qty)?;
        self.total_supply = supply;

        self.record(tx)
    }

    /// Balance of `account`, 0 if it never held tokens
    pub fn balance_of(&self, account: &Principal) -> u64 {
        self.balances.get(account)
    }

    /// Current total supply
    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// Page of history entries at `[offset, offset + limit)`
    pub fn get_history(&self, offset: u64, limit: u64) -> Page {
        self.history.page(offset, limit)
    }

    /// Memory-size estimates for the balance store and history log
    pub fn mem_metrics(&self) -> MemMetrics {
        MemMetrics::collect(&self.balances, &self.history)
    }

    /// Balance store (read-only)
    pub fn balances(&self) -> &BalanceStore {
        &self.balances
    }

    /// History log (read-only)
    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Verify that the balances add up to the total supply
    pub fn check_supply_conservation(&self) -> Result<()> {
        let sum = self.balances.sum().map_err(|_| {
            Error::InvariantViolation("sum of balances exceeds u64::MAX".to_string())
        })?;

        if sum != self.total_supply {
            return Err(Error::InvariantViolation(format!(
                "sum of balances {} != total supply {}",
                sum, self.total_supply
            )));
        }

        Ok(())
    }

    /// Build the entry for a mutation and make sure the log can take it
    fn prepare(&self, op: Operation, qty: u64) -> Result<Transaction> {
        let tx = Transaction {
            op,
            qty,
            timestamp: self.clock.now(),
        };
        self.history.check_append(&tx)?;
        Ok(tx)
    }

    fn record(&mut self, tx: Transaction) -> Result<u64> {
        let kind = tx.op.kind();
        let qty = tx.qty;
        let position = self.history.append(tx)?;

        tracing::debug!(
            %kind,
            qty,
            position,
            total_supply = self.total_supply,
            "Applied ledger mutation"
        );

        Ok(position)
    }
}
