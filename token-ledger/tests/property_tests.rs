//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Supply conservation: Σ(balances) == total_supply after every call
//! - Failed mutations leave no trace
//! - History positions are dense and never renumbered
//! - Pagination reproduces the full log without gaps or duplicates

use proptest::prelude::*;
use std::sync::Arc;
use token_ledger::{
    clock::ManualClock, Config, EntryKind, HistoryEntry, Ledger, LedgerState, Principal,
    RetentionPolicy,
};

const ACCOUNTS: [&str; 4] = ["alice", "bob", "carol", "dave"];

/// Ledger call issued by a test
#[derive(Debug, Clone)]
enum Call {
    Mint { to: usize, qty: u64 },
    Transfer { caller: usize, to: usize, qty: u64 },
    Burn { caller: usize, qty: u64 },
}

/// Strategy for quantities: mostly small, sometimes near the top of the range
fn qty_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        4 => 0u64..1_000,
        1 => (u64::MAX - 1_000)..=u64::MAX,
    ]
}

/// Strategy for account indices
fn account_strategy() -> impl Strategy<Value = usize> {
    0..ACCOUNTS.len()
}

/// Strategy for ledger calls
fn call_strategy() -> impl Strategy<Value = Call> {
    prop_oneof![
        (account_strategy(), qty_strategy()).prop_map(|(to, qty)| Call::Mint { to, qty }),
        (account_strategy(), account_strategy(), qty_strategy())
            .prop_map(|(caller, to, qty)| Call::Transfer { caller, to, qty }),
        (account_strategy(), qty_strategy()).prop_map(|(caller, qty)| Call::Burn { caller, qty }),
    ]
}

fn account(i: usize) -> Principal {
    Principal::new(ACCOUNTS[i])
}

fn apply(state: &mut LedgerState, call: &Call) -> token_ledger::Result<u64> {
    match *call {
        Call::Mint { to, qty } => state.mint(account(to), qty),
        Call::Transfer { caller, to, qty } => state.transfer(account(caller), account(to), qty),
        Call::Burn { caller, qty } => state.burn(account(caller), qty),
    }
}

fn snapshot(state: &LedgerState) -> (Vec<u64>, u64, u64) {
    let balances = (0..ACCOUNTS.len())
        .map(|i| state.balance_of(&account(i)))
        .collect();
    (balances, state.total_supply(), state.history().len())
}

fn test_state() -> LedgerState {
    LedgerState::with_parts(RetentionPolicy::Unbounded, Arc::new(ManualClock::new(0)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: total supply equals the sum of balances after every call
    #[test]
    fn prop_supply_conservation(calls in prop::collection::vec(call_strategy(), 1..60)) {
        let mut state = test_state();

        for call in &calls {
            let _ = apply(&mut state, call);

            let sum: u128 = (0..ACCOUNTS.len())
                .map(|i| state.balance_of(&account(i)) as u128)
                .sum();
            prop_assert_eq!(sum, state.total_supply() as u128);
            prop_assert!(state.check_supply_conservation().is_ok());
        }
    }

    /// Property: a failed call changes neither balances, supply nor history
    #[test]
    fn prop_failed_calls_leave_no_trace(calls in prop::collection::vec(call_strategy(), 1..60)) {
        let mut state = test_state();

        for call in &calls {
            let before = snapshot(&state);
            match apply(&mut state, call) {
                Ok(position) => {
                    prop_assert_eq!(position, before.2);
                    prop_assert_eq!(state.history().len(), before.2 + 1);
                }
                Err(e) => {
                    prop_assert!(e.is_rejection());
                    prop_assert_eq!(snapshot(&state), before);
                }
            }
        }
    }

    /// Property: history entries mirror the calls that succeeded
    #[test]
    fn prop_history_matches_successful_calls(calls in prop::collection::vec(call_strategy(), 1..40)) {
        let mut state = test_state();
        let mut expected = Vec::new();

        for call in &calls {
            if apply(&mut state, call).is_ok() {
                expected.push(call.clone());
            }
        }

        let page = state.get_history(0, u64::MAX);
        prop_assert_eq!(page.total_count, expected.len() as u64);

        for (entry, call) in page.entries.iter().zip(&expected) {
            match *call {
                Call::Mint { to, qty } => {
                    prop_assert_eq!(entry.kind(), Some(EntryKind::Mint));
                    prop_assert_eq!(entry.to.clone(), Some(account(to)));
                    prop_assert_eq!(entry.qty, qty);
                }
                Call::Transfer { caller, to, qty } => {
                    prop_assert_eq!(entry.kind(), Some(EntryKind::Transfer));
                    prop_assert_eq!(entry.from.clone(), Some(account(caller)));
                    prop_assert_eq!(entry.to.clone(), Some(account(to)));
                    prop_assert_eq!(entry.qty, qty);
                }
                Call::Burn { caller, qty } => {
                    prop_assert_eq!(entry.kind(), Some(EntryKind::Burn));
                    prop_assert_eq!(entry.from.clone(), Some(account(caller)));
                    prop_assert_eq!(entry.qty, qty);
                }
            }
        }
    }

    /// Property: paging with any page size reproduces the full log in order
    #[test]
    fn prop_pagination_complete(
        calls in prop::collection::vec(call_strategy(), 0..60),
        page_size in 1u64..10,
    ) {
        let mut state = test_state();
        for call in &calls {
            let _ = apply(&mut state, call);
        }

        let full = state.get_history(0, u64::MAX);
        let mut collected: Vec<HistoryEntry> = Vec::new();
        let mut offset = 0;
        loop {
            let page = state.get_history(offset, page_size);
            prop_assert_eq!(page.total_count, full.total_count);
            if page.entries.is_empty() {
                break;
            }
            prop_assert_eq!(page.start, offset);
            offset = page.next_offset();
            collected.extend(page.entries);
        }

        prop_assert_eq!(offset, full.total_count);
        prop_assert_eq!(collected, full.entries);
    }

    /// Property: reads without intervening mutations are identical
    #[test]
    fn prop_reads_idempotent(
        calls in prop::collection::vec(call_strategy(), 0..30),
        offset in 0u64..40,
        limit in 0u64..40,
    ) {
        let mut state = test_state();
        for call in &calls {
            let _ = apply(&mut state, call);
        }

        prop_assert_eq!(state.get_history(offset, limit), state.get_history(offset, limit));
        prop_assert_eq!(state.total_supply(), state.total_supply());
        prop_assert_eq!(snapshot(&state), snapshot(&state));
        prop_assert_eq!(state.mem_metrics(), state.mem_metrics());
    }

    /// Property: retention never renumbers positions
    #[test]
    fn prop_retention_keeps_positions(
        count in 1u64..80,
        keep in 1usize..20,
    ) {
        let mut state = LedgerState::with_parts(
            RetentionPolicy::KeepLast(keep),
            Arc::new(ManualClock::new(0)),
        );

        for qty in 0..count {
            prop_assert_eq!(state.mint(account(0), qty).unwrap(), qty);
        }

        let page = state.get_history(0, u64::MAX);
        prop_assert_eq!(page.total_count, count);
        prop_assert_eq!(page.start, count.saturating_sub(keep as u64));
        // Quantities equal positions, so each retained entry must sit at its original position
        for (i, entry) in page.entries.iter().enumerate() {
            prop_assert_eq!(entry.qty, page.start + i as u64);
        }
    }

    /// Property: the async ledger agrees with the bare engine
    #[test]
    fn prop_ledger_matches_engine(calls in prop::collection::vec(call_strategy(), 1..30)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let mut config = Config::default();
            config.metrics.enabled = false;
            let ledger = Ledger::open_with_clock(config, Arc::new(ManualClock::new(0)))
                .await
                .unwrap();
            let mut engine = test_state();

            for call in &calls {
                let expected = apply(&mut engine, call).is_ok();
                let actual = match *call {
                    Call::Mint { to, qty } => ledger.mint(account(to), qty).await,
                    Call::Transfer { caller, to, qty } => {
                        ledger.transfer(account(caller), account(to), qty).await
                    }
                    Call::Burn { caller, qty } => ledger.burn(account(caller), qty).await,
                };
                prop_assert_eq!(actual.is_ok(), expected);
            }

            for i in 0..ACCOUNTS.len() {
                prop_assert_eq!(ledger.balance_of(&account(i)), engine.balance_of(&account(i)));
            }
            prop_assert_eq!(ledger.total_supply(), engine.total_supply());
            // Both sides read the same frozen clock, so whole entries must agree
            let page = ledger.get_history(0, u64::MAX);
            let expected = engine.get_history(0, u64::MAX);
            prop_assert_eq!(page.total_count, expected.total_count);
            prop_assert_eq!(page.start, expected.start);
            prop_assert_eq!(page.entries, expected.entries);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use token_ledger::Error;

    async fn create_test_ledger() -> Ledger {
        let clock = ManualClock::new(1_000);
        Ledger::open_with_clock(Config::default(), Arc::new(clock))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_full_token_lifecycle() {
        let ledger = create_test_ledger().await;
        let a = Principal::new("A");
        let b = Principal::new("B");
        let c = Principal::new("C");

        // 1. Mint
        ledger.mint(a.clone(), 100).await.unwrap();
        assert_eq!(ledger.balance_of(&a), 100);
        assert_eq!(ledger.total_supply(), 100);
        let page = ledger.get_history(0, 10);
        assert_eq!(page.total_count, 1);
        assert_eq!(page.entries[0].from, None);
        assert_eq!(page.entries[0].to, Some(a.clone()));

        // 2. Transfer
        ledger.transfer(a.clone(), b.clone(), 40).await.unwrap();
        assert_eq!(ledger.balance_of(&a), 60);
        assert_eq!(ledger.balance_of(&b), 40);
        assert_eq!(ledger.total_supply(), 100);

        // 3. Overdrawn burn
        let err = ledger.burn(a.clone(), 1000).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { have: 60, need: 1000 }));
        assert_eq!(ledger.balance_of(&a), 60);
        assert_eq!(ledger.get_history(0, 10).total_count, 2);

        // 4. Overflowing mint
        let mut config = Config::default();
        config.metrics.enabled = false;
        let fresh = Ledger::open(config).await.unwrap();
        fresh.mint(c.clone(), u64::MAX).await.unwrap();
        assert!(matches!(fresh.mint(c.clone(), 1).await, Err(Error::Overflow)));
        assert_eq!(fresh.balance_of(&c), u64::MAX);
        fresh.shutdown().await.unwrap();

        // 5. Page past the end
        let page = ledger.get_history(5, 10);
        assert!(page.entries.is_empty());
        assert_eq!(page.total_count, 2);

        // Burn the rest
        ledger.burn(a.clone(), 60).await.unwrap();
        ledger.burn(b.clone(), 40).await.unwrap();
        assert_eq!(ledger.total_supply(), 0);
        assert_eq!(ledger.get_history(0, 10).total_count, 4);
        ledger.check_supply_conservation().unwrap();

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_readers_see_consistent_state() {
        let ledger = Arc::new(create_test_ledger().await);
        let a = Principal::new("A");
        ledger.mint(a.clone(), 1_000).await.unwrap();

        let writer = {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                for i in 0..200u64 {
                    let to = Principal::new(format!("R{}", i % 8));
                    ledger.transfer(Principal::new("A"), to, 1).await.unwrap();
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let ledger = ledger.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    ledger.check_supply_conservation().unwrap();
                    let page = ledger.get_history(0, 1000);
                    assert_eq!(page.entries.len() as u64, page.total_count);
                    tokio::task::yield_now().await;
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }

        assert_eq!(ledger.balance_of(&a), 800);
        assert_eq!(ledger.total_supply(), 1_000);
        assert_eq!(ledger.get_history(0, 1000).total_count, 201);
    }
}
