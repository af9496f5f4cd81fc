//! Main ledger orchestration layer
//!
//! This module ties together the engine, the writer actor and metrics into
//! the caller-facing token API.
//!
//! # Example
//!
//! ```no_run
//! use token_ledger::{Config, Ledger, Principal};
//!
//! #[tokio::main]
//! async fn main() -> token_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default()).await?;
//!
//!     let alice = Principal::new("alice");
//!     let bob = Principal::new("bob");
//!     ledger.mint(alice.clone(), 100).await?;
//!     ledger.transfer(alice, bob.clone(), 40).await?;
//!     assert_eq!(ledger.balance_of(&bob), 40);
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    clock::{Clock, SystemClock},
    engine::LedgerState,
    history::HistoryLog,
    metrics::{MemMetrics, Metrics},
    types::{Page, Principal},
    Config, Result,
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Main ledger interface
///
/// Mutations are queued to the single writer; reads are served directly from
/// the shared state and run concurrently with each other.
#[derive(Debug)]
pub struct Ledger {
    /// Actor handle for mutations
    handle: LedgerHandle,

    /// Shared state (for reads)
    state: Arc<RwLock<LedgerState>>,

    /// Prometheus collector (if enabled)
    metrics: Option<Metrics>,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open an empty ledger on the system clock
    pub async fn open(config: Config) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock::new())).await
    }

    /// Open an empty ledger with an explicit timestamp source
    pub async fn open_with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let mut history = HistoryLog::with_retention(config.history.retention);
        if let Some(budget) = config.history.memory_budget() {
            history = history.with_budget(budget);
        }
        let state = Arc::new(RwLock::new(LedgerState::with_history(history, clock)));

        let metrics = if config.metrics.enabled {
            let metrics = Metrics::new()?;
            metrics.observe_state(&state.read());
            Some(metrics)
        } else {
            None
        };

        let handle = spawn_ledger_actor(state.clone(), config.mailbox_capacity, metrics.clone());

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            retention = %config.history.retention,
            "Token ledger opened"
        );

        Ok(Self {
            handle,
            state,
            metrics,
            config,
        })
    }

    /// Create `qty` new tokens for `to`
    ///
    /// Whether the caller may mint is decided before this call.
    pub async fn mint(&self, to: Principal, qty: u64) -> Result<()> {
        self.handle.mint(to, qty).await.map(|_| ())
    }

    /// Move `qty` from `caller` to `to`
    pub async fn transfer(&self, caller: Principal, to: Principal, qty: u64) -> Result<()> {
        self.handle.transfer(caller, to, qty).await.map(|_| ())
    }

    /// Destroy `qty` tokens held by `caller`
    pub async fn burn(&self, caller: Principal, qty: u64) -> Result<()> {
        self.handle.burn(caller, qty).await.map(|_| ())
    }

    /// Balance of `account`
    pub fn balance_of(&self, account: &Principal) -> u64 {
        self.state.read().balance_of(account)
    }

    /// Current total supply
    pub fn total_supply(&self) -> u64 {
        self.state.read().total_supply()
    }

    /// Page of history starting at `offset`
    ///
    /// When `history.max_page_limit` is set, `limit` is capped at it and
    /// callers continue from [`Page::next_offset`].
    pub fn get_history(&self, offset: u64, limit: u64) -> Page {
        let limit = match self.config.history.max_page_limit {
            Some(cap) => limit.min(cap),
            None => limit,
        };
        self.state.read().get_history(offset, limit)
    }

    /// Memory-size estimates (balances, history, total)
    pub fn mem_metrics(&self) -> MemMetrics {
        self.state.read().mem_metrics()
    }

    /// Verify that the balances add up to the total supply
    pub fn check_supply_conservation(&self) -> Result<()> {
        self.state.read().check_supply_conservation()
    }

    /// Prometheus collector, if metrics are enabled
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown ledger after applying already queued mutations
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await?;
        tracing::info!(service = %self.config.service_name, "Token ledger shut down");
        Ok(())
    }
}
