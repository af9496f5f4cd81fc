//! Token Ledger
//!
//! Authoritative accounting for a single fungible token: mint, transfer,
//! burn, balance and supply lookups, paginated history and memory reporting.
//!
//! # Architecture
//!
//! - **Checked Arithmetic**: Every quantity update can fail with overflow or underflow
//! - **Single Writer**: One actor task applies all mutations, in arrival order
//! - **Validate, then Apply**: A failed mutation leaves no trace
//! - **Stable History**: Dense positions that are never renumbered
//!
//! # Invariants
//!
//! - Supply conservation: Σ(balances) == total_supply after every call
//! - Non-negativity: balances are unsigned; debits past zero are rejected
//! - Append-only: History entries are never modified
//! - Linearizable: Total ordering of all mutations

#![forbid(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms, clippy::all)]

pub mod arith;
pub mod types;
pub mod balances;
pub mod history;
pub mod clock;
pub mod engine;
pub mod error;
pub mod actor;
pub mod config;
pub mod metrics;
pub mod ledger;
pub mod telemetry;

// Re-exports
pub use error::{Error, Result};
pub use types::{EntryKind, HistoryEntry, Operation, Page, Principal, Transaction};
pub use history::{MemoryBudget, RetentionPolicy};
pub use engine::LedgerState;
pub use metrics::MemMetrics;
pub use ledger::Ledger;
pub use config::Config;
