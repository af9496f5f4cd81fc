//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One task applies every mutation, in mailbox order
//! - Each mutation runs under one write lock, so readers never see a
//!   balance update without its history entry
//! - Bounded mailbox gives callers backpressure
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends mutations to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   write lock → mint / transfer / burn → unlock        │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │        Arc<RwLock<LedgerState>> (shared)              │
//! │     Readers take the read lock concurrently           │
//! └──────────────────────────────────────────────────────┘
//! ```

use crate::engine::LedgerState;
use crate::metrics::Metrics;
use crate::types::{EntryKind, Principal};
use crate::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Create new supply
    Mint {
        to: Principal,
        qty: u64,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Move quantity from the caller to `to`
    Transfer {
        caller: Principal,
        to: Principal,
        qty: u64,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Destroy quantity held by the caller
    Burn {
        caller: Principal,
        qty: u64,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Apply queued mutations, then stop
    Shutdown { response: oneshot::Sender<()> },
}

/// Actor that applies ledger mutations
#[derive(Debug)]
pub struct LedgerActor {
    /// Ledger state shared with readers
    state: Arc<RwLock<LedgerState>>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Prometheus collector (if enabled)
    metrics: Option<Metrics>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        state: Arc<RwLock<LedgerState>>,
        mailbox: mpsc::Receiver<LedgerMessage>,
        metrics: Option<Metrics>,
    ) -> Self {
        Self {
            state,
            mailbox,
            metrics,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown { response } => {
                    self.drain();
                    let _ = response.send(());
                    tracing::info!("Ledger actor stopped");
                    return;
                }
                other => self.handle_message(other),
            }
        }

        tracing::debug!("Ledger mailbox closed, actor exiting");
    }

    /// Close the mailbox and apply everything already queued
    fn drain(&mut self) {
        self.mailbox.close();

        let mut drained = 0usize;
        while let Ok(msg) = self.mailbox.try_recv() {
            match msg {
                LedgerMessage::Shutdown { response } => {
                    let _ = response.send(());
                }
                _ => {
                    self.handle_message(msg);
                    drained += 1;
                }
            }
        }

        if drained > 0 {
            tracing::debug!("Applied {} queued mutations during shutdown", drained);
        }
    }

    /// Handle a single mutation
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::Mint { to, qty, response } => {
                let result = self.apply(EntryKind::Mint, |state| state.mint(to, qty));
                let _ = response.send(result);
            }

            LedgerMessage::Transfer {
                caller,
                to,
                qty,
                response,
            } => {
                let result =
                    self.apply(EntryKind::Transfer, |state| state.transfer(caller, to, qty));
                let _ = response.send(result);
            }

            LedgerMessage::Burn {
                caller,
                qty,
                response,
            } => {
                let result = self.apply(EntryKind::Burn, |state| state.burn(caller, qty));
                let _ = response.send(result);
            }

            LedgerMessage::Shutdown { response } => {
                // Handled in main loop
                let _ = response.send(());
            }
        }
    }

    /// Run one mutation inside the write lock
    fn apply<F>(&self, kind: EntryKind, op: F) -> Result<u64>
    where
        F: FnOnce(&mut LedgerState) -> Result<u64>,
    {
        let mut state = self.state.write();
        let result = op(&mut *state);

        match &result {
            Ok(_) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_applied(kind);
                    metrics.observe_state(&*state);
                }
            }
            Err(e) if e.is_rejection() => {
                tracing::warn!(%kind, error = %e, "Rejected ledger mutation");
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejected(kind);
                }
            }
            Err(e) => {
                tracing::error!(%kind, error = %e, "Ledger mutation failed");
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejected(kind);
                }
            }
        }

        result
    }
}

/// Handle for sending mutations to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Mint `qty` to `to`
    pub async fn mint(&self, to: Principal, qty: u64) -> Result<u64> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::Mint {
            to,
            qty,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Transfer `qty` from `caller` to `to`
    pub async fn transfer(&self, caller: Principal, to: Principal, qty: u64) -> Result<u64> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::Transfer {
            caller,
            to,
            qty,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Burn `qty` held by `caller`
    pub async fn burn(&self, caller: Principal, qty: u64) -> Result<u64> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::Burn {
            caller,
            qty,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor, waiting until queued mutations are applied
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::Shutdown { response: tx }).await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    async fn send(&self, msg: LedgerMessage) -> Result<()> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    state: Arc<RwLock<LedgerState>>,
    mailbox_capacity: usize,
    metrics: Option<Metrics>,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(state, rx, metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_state() -> Arc<RwLock<LedgerState>> {
        Arc::new(RwLock::new(LedgerState::new()))
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let handle = spawn_ledger_actor(shared_state(), 16, None);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_applies_mutations() {
        let state = shared_state();
        let handle = spawn_ledger_actor(state.clone(), 16, None);
        let alice = Principal::new("alice");
        let bob = Principal::new("bob");

        assert_eq!(handle.mint(alice.clone(), 100).await.unwrap(), 0);
        assert_eq!(handle.transfer(alice.clone(), bob.clone(), 40).await.unwrap(), 1);
        assert_eq!(handle.burn(bob.clone(), 10).await.unwrap(), 2);

        {
            let state = state.read();
            assert_eq!(state.balance_of(&alice), 60);
            assert_eq!(state.balance_of(&bob), 30);
            assert_eq!(state.total_supply(), 90);
        }

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_reports_rejections() {
        let metrics = Metrics::new().unwrap();
        let handle = spawn_ledger_actor(shared_state(), 16, Some(metrics.clone()));

        let err = handle.burn(Principal::new("alice"), 1).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { have: 0, need: 1 }));
        assert_eq!(metrics.rejected_total.with_label_values(&["burn"]).get(), 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_after_shutdown_fails() {
        let handle = spawn_ledger_actor(shared_state(), 16, None);
        handle.shutdown().await.unwrap();

        let err = handle.mint(Principal::new("alice"), 1).await.unwrap_err();
        assert!(matches!(err, Error::Concurrency(_)));
    }

    #[tokio::test]
    async fn test_concurrent_callers_are_serialized() {
        let state = shared_state();
        let handle = spawn_ledger_actor(state.clone(), 4, None);

        let mut tasks = Vec::new();
        for i in 0..32u64 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle.mint(Principal::new(format!("acct-{}", i % 4)), i).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let state = state.read();
        assert_eq!(state.total_supply(), (0..32).sum::<u64>());
        assert_eq!(state.history().len(), 32);
        state.check_supply_conservation().unwrap();
    }
}
