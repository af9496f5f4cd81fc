//! Metrics collection for observability
//!
//! [`MemMetrics`] is the in-process memory report returned by `mem_metrics`.
//! [`Metrics`] exports the same figures, plus operation counters, to
//! Prometheus.
//!
//! # Metrics
//!
//! - `token_ledger_operations_total{kind}` - Applied mutations by kind
//! - `token_ledger_rejected_total{kind}` - Rejected mutations by kind
//! - `token_ledger_total_supply` - Current total supply
//! - `token_ledger_accounts` - Accounts holding a non-zero balance
//! - `token_ledger_history_entries` - Entries ever appended to the history log
//! - `token_ledger_memory_bytes{component}` - Memory estimates (`history_free`
//!   only when the history log has a memory budget)

use crate::{
    balances::BalanceStore, engine::LedgerState, history::HistoryLog, types::EntryKind,
};
use prometheus::{IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem;

/// Memory-size estimates, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemMetrics {
    /// Balance store
    pub balances: u64,

    /// History log
    pub history: u64,

    /// Balance store, history log and fixed engine overhead
    pub total: u64,
}

impl MemMetrics {
    /// Compute estimates from the current structure sizes
    pub fn collect(balances: &BalanceStore, history: &HistoryLog) -> Self {
        let balances = balances.size_estimate();
        let history = history.size_estimate();
        let total = balances
            .saturating_add(history)
            .saturating_add(mem::size_of::<LedgerState>() as u64);

        Self {
            balances,
            history,
            total,
        }
    }
}

/// Prometheus collector
#[derive(Clone)]
pub struct Metrics {
    /// Applied mutations by kind
    pub operations_total: IntCounterVec,

    /// Rejected mutations by kind
    pub rejected_total: IntCounterVec,

    /// Current total supply (saturates at i64::MAX)
    pub total_supply: IntGauge,

    /// Accounts with a non-zero balance
    pub accounts: IntGauge,

    /// Entries ever appended to the history log
    pub history_entries: IntGauge,

    /// Memory estimates by component
    pub memory_bytes: IntGaugeVec,

    registry: Registry,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let operations_total = IntCounterVec::new(
            Opts::new("token_ledger_operations_total", "Applied ledger mutations"),
            &["kind"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let rejected_total = IntCounterVec::new(
            Opts::new("token_ledger_rejected_total", "Rejected ledger mutations"),
            &["kind"],
        )?;
        registry.register(Box::new(rejected_total.clone()))?;

        let total_supply = IntGauge::new("token_ledger_total_supply", "Current total supply")?;
        registry.register(Box::new(total_supply.clone()))?;

        let accounts = IntGauge::new(
            "token_ledger_accounts",
            "Accounts holding a non-zero balance",
        )?;
        registry.register(Box::new(accounts.clone()))?;

        let history_entries = IntGauge::new(
            "token_ledger_history_entries",
            "Entries ever appended to the history log",
        )?;
        registry.register(Box::new(history_entries.clone()))?;

        let memory_bytes = IntGaugeVec::new(
            Opts::new("token_ledger_memory_bytes", "Memory estimates by component"),
            &["component"],
        )?;
        registry.register(Box::new(memory_bytes.clone()))?;

        Ok(Self {
            operations_total,
            rejected_total,
            total_supply,
            accounts,
            history_entries,
            memory_bytes,
            registry,
        })
    }

    /// Record an applied mutation
    pub fn record_applied(&self, kind: EntryKind) {
        self.operations_total.with_label_values(&[kind.as_str()]).inc();
    }

    /// Record a rejected mutation
    pub fn record_rejected(&self, kind: EntryKind) {
        self.rejected_total.with_label_values(&[kind.as_str()]).inc();
    }

    /// Refresh gauges from the ledger state
    pub fn observe_state(&self, state: &LedgerState) {
        self.total_supply.set(saturating_i64(state.total_supply()));
        self.accounts.set(saturating_i64(state.balances().len() as u64));
        self.history_entries.set(saturating_i64(state.history().len()));

        let mem = state.mem_metrics();
        self.memory_bytes
            .with_label_values(&["balances"])
            .set(saturating_i64(mem.balances));
        self.memory_bytes
            .with_label_values(&["history"])
            .set(saturating_i64(mem.history));
        self.memory_bytes
            .with_label_values(&["total"])
            .set(saturating_i64(mem.total));
        if let Some(free) = state.history().free_bytes() {
            self.memory_bytes
                .with_label_values(&["history_free"])
                .set(saturating_i64(free));
        }
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("total_supply", &self.total_supply.get())
            .field("accounts", &self.accounts.get())
            .field("history_entries", &self.history_entries.get())
            .finish_non_exhaustive()
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
