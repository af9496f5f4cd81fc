//! Balance store
//!
//! Maps principals to quantities. Absence from the map reads as zero; an
//! account debited down to zero is removed again, so the map only ever holds
//! non-zero balances.

use crate::{arith, types::Principal, Error, Result};
use std::collections::HashMap;
use std::mem;

/// Per-entry bookkeeping overhead of the underlying hash map (control byte + padding)
const ENTRY_OVERHEAD_BYTES: u64 = 8;

/// Account balances
#[derive(Debug, Default, Clone)]
pub struct BalanceStore {
    balances: HashMap<Principal, u64>,

    /// Heap bytes held by principal strings currently stored as keys
    key_bytes: u64,
}

impl BalanceStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance, 0 for unknown accounts
    pub fn get(&self, account: &Principal) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Add `amount` to `account`, returning the new balance
    ///
    /// The store is unchanged when the addition overflows.
    pub fn credit(&mut self, account: &Principal, amount: u64) -> Result<u64> {
        let current = self.get(account);
        let updated = arith::add(current, amount)?;
        self.set(account, updated);
        Ok(updated)
    }

    /// Remove `amount` from `account`, returning the new balance
    ///
    /// The store is unchanged when `amount` exceeds the balance.
    pub fn debit(&mut self, account: &Principal, amount: u64) -> Result<u64> {
        let current = self.get(account);
        let updated = arith::sub(current, amount).map_err(|_| Error::InsufficientBalance {
            have: current,
            need: amount,
        })?;
        self.set(account, updated);
        Ok(updated)
    }

    /// Number of accounts holding a non-zero balance
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// Whether no account holds a balance
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Iterate over non-zero balances (arbitrary order)
    pub fn iter(&self) -> impl Iterator<Item = (&Principal, u64)> {
        self.balances.iter().map(|(account, qty)| (account, *qty))
    }

    /// Checked sum of all balances
    pub fn sum(&self) -> Result<u64> {
        self.balances
            .values()
            .try_fold(0u64, |acc, qty| arith::add(acc, *qty))
    }

    /// Estimated memory held by the store, in bytes
    pub fn size_estimate(&self) -> u64 {
        let slot = (mem::size_of::<Principal>() + mem::size_of::<u64>()) as u64
            + ENTRY_OVERHEAD_BYTES;
        self.balances.capacity() as u64 * slot + self.key_bytes
    }

    fn set(&mut self, account: &Principal, qty: u64) {
        if qty == 0 {
            if self.balances.remove(account).is_some() {
                self.key_bytes -= account.as_str().len() as u64;
            }
            return;
        }

        match self.balances.get_mut(account) {
            Some(slot) => *slot = qty,
            None => {
                self.key_bytes += account.as_str().len() as u64;
                self.balances.insert(account.clone(), qty);
            }
        }
    }
}
