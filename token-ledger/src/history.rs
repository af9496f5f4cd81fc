//! Append-only history log
//!
//! Positions are 0-based, dense and assigned in append order. They are the
//! pagination key and are never reused or renumbered, including when a
//! [`RetentionPolicy`] drops old entries from the front of the log.
//!
//! An optional [`MemoryBudget`] bounds the encoded size of retained entries.
//! Running out of budget or positions is fatal for the ledger.

use crate::{
    types::{Page, Transaction},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::str::FromStr;

/// How much history the log keeps in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep every entry
    #[default]
    Unbounded,
    /// Keep only the newest `n` entries
    KeepLast(usize),
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetentionPolicy::Unbounded => f.write_str("unbounded"),
            RetentionPolicy::KeepLast(n) => write!(f, "keep_last:{}", n),
        }
    }
}

impl FromStr for RetentionPolicy {
    type Err = Error;

    /// Parses `unbounded` or `keep_last:<n>`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unbounded") {
            return Ok(RetentionPolicy::Unbounded);
        }

        match s.split_once(':') {
            Some((mode, n)) if mode.eq_ignore_ascii_case("keep_last") => n
                .trim()
                .parse()
                .map(RetentionPolicy::KeepLast)
                .map_err(|e| Error::Config(format!("Invalid retention count '{}': {}", n, e))),
            _ => Err(Error::Config(format!("Unknown retention policy '{}'", s))),
        }
    }
}

/// Append-only transaction history
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    /// Retained entries; `entries[i]` sits at position `first_position + i`
    entries: VecDeque<Transaction>,

    /// Position of the oldest retained entry
    first_position: u64,

    /// Encoded size of the retained entries, in bytes
    entry_bytes: u64,

    retention: RetentionPolicy,

    /// Upper bound on `entry_bytes`, if any
    budget: Option<MemoryBudget>,

    /// Set once usage crosses the low-memory threshold, cleared when it drops back
    low_memory: bool,
}

/// Memory budget for retained history entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBudget {
    /// Largest encoded size the retained entries may occupy, in bytes
    pub max_bytes: u64,

    /// Usage (percent of `max_bytes`) at which the log reports low memory
    pub low_threshold_percent: u8,
}

impl MemoryBudget {
    /// Budget of `max_bytes` with the low-memory mark at `low_threshold_percent`
    pub fn new(max_bytes: u64, low_threshold_percent: u8) -> Self {
        Self {
            max_bytes,
            low_threshold_percent: low_threshold_percent.min(100),
        }
    }

    fn low_mark(&self) -> u64 {
        (self.max_bytes as u128 * self.low_threshold_percent as u128 / 100) as u64
    }
}

impl HistoryLog {
    /// Create empty log that keeps every entry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty log with the given retention policy
    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self {
            retention,
            ..Self::default()
        }
    }

    /// Total number of entries ever appended
    pub fn len(&self) -> u64 {
        self.first_position + self.entries.len() as u64
    }

    /// Whether nothing has been appended yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the oldest entry still held in memory
    pub fn first_position(&self) -> u64 {
        self.first_position
    }

    /// Number of entries held in memory
    pub fn retained(&self) -> usize {
        self.entries.len()
    }

    /// Empty log whose next position is `position`
    #[cfg(test)]
    pub(crate) fn starting_at(position: u64) -> Self {
        Self {
            first_position: position,
            ..Self::default()
        }
    }

    /// Limit retained entries to `budget`
    pub fn with_budget(mut self, budget: MemoryBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Active retention policy
    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Active memory budget
    pub fn budget(&self) -> Option<MemoryBudget> {
        self.budget
    }

    /// Encoded size of the retained entries, in bytes
    pub fn used_bytes(&self) -> u64 {
        self.entry_bytes
    }

    /// Bytes left before the budget is exhausted, `None` without a budget
    pub fn free_bytes(&self) -> Option<u64> {
        self.budget
            .map(|budget| budget.max_bytes.saturating_sub(self.entry_bytes))
    }

    /// Whether usage has crossed the low-memory threshold
    pub fn is_low_on_memory(&self) -> bool {
        self.low_memory
    }

    /// Position the next appended entry will receive
    ///
    /// Fails with [`Error::Fatal`] once the position space is exhausted, so
    /// callers can check before mutating anything else.
    pub fn next_position(&self) -> Result<u64> {
        let position = self.len();
        if position == u64::MAX {
            return Err(Error::Fatal("history position space exhausted".to_string()));
        }
        Ok(position)
    }

    /// Check that `tx` can be appended, returning the position it would get
    ///
    /// Fails with [`Error::Fatal`] when the position space is exhausted or
    /// the entry does not fit in the memory budget, taking into account the
    /// entry the retention policy would prune to make room.
    pub fn check_append(&self, tx: &Transaction) -> Result<u64> {
        let position = self.next_position()?;

        if let Some(budget) = self.budget {
            let after = self
                .entry_bytes
                .saturating_sub(self.bytes_pruned_by_next_append())
                .saturating_add(encoded_size(tx));

            if after > budget.max_bytes {
                return Err(Error::Fatal(format!(
                    "history memory budget exhausted: {} of {} bytes used, entry needs {}",
                    self.entry_bytes,
                    budget.max_bytes,
                    encoded_size(tx)
                )));
            }
        }

        Ok(position)
    }

    /// Append an entry and return its position
    pub fn append(&mut self, tx: Transaction) -> Result<u64> {
        let position = self.check_append(&tx)?;

        self.entry_bytes += encoded_size(&tx);
        self.entries.push_back(tx);
        self.enforce_retention();
        self.update_low_memory();

        Ok(position)
    }

    /// Entry at `position`, if it exists and is still retained
    pub fn get(&self, position: u64) -> Option<&Transaction> {
        let index = position.checked_sub(self.first_position)?;
        self.entries.get(usize::try_from(index).ok()?)
    }

    /// Entries at positions `[offset, offset + limit)`, clipped to the log
    ///
    /// Out-of-range offsets and a zero limit yield an empty page, never an
    /// error. Positions already pruned by the retention policy are skipped.
    pub fn page(&self, offset: u64, limit: u64) -> Page {
        let total = self.len();
        let start = offset.max(self.first_position).min(total);
        let end = offset.saturating_add(limit).min(total);

        if start >= end {
            return Page::empty(start, total);
        }

        // Both bounds lie inside the retained window, which is indexable by usize
        let from = (start - self.first_position) as usize;
        let to = (end - self.first_position) as usize;

        Page {
            entries: self.entries.range(from..to).map(Transaction::to_entry).collect(),
            start,
            total_count: total,
        }
    }

    /// Iterate retained entries with their positions
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Transaction)> {
        (self.first_position..).zip(self.entries.iter())
    }

    /// Estimated memory held by the log, in bytes
    pub fn size_estimate(&self) -> u64 {
        let slots = self.entries.capacity() as u64 * mem::size_of::<Transaction>() as u64;
        slots.max(self.entry_bytes)
    }

    fn bytes_pruned_by_next_append(&self) -> u64 {
        match (self.retention, self.entries.front()) {
            (RetentionPolicy::KeepLast(keep), Some(front)) if self.entries.len() >= keep => {
                encoded_size(front)
            }
            _ => 0,
        }
    }

    fn update_low_memory(&mut self) {
        let Some(budget) = self.budget else {
            return;
        };

        let low = self.entry_bytes >= budget.low_mark();
        if low && !self.low_memory {
            tracing::warn!(
                used_bytes = self.entry_bytes,
                max_bytes = budget.max_bytes,
                threshold_percent = budget.low_threshold_percent,
                "History log is low on memory"
            );
        }
        self.low_memory = low;
    }

    fn enforce_retention(&mut self) {
        let RetentionPolicy::KeepLast(keep) = self.retention else {
            return;
        };

        while self.entries.len() > keep {
            if let Some(pruned) = self.entries.pop_front() {
                self.entry_bytes = self.entry_bytes.saturating_sub(encoded_size(&pruned));
                self.first_position += 1;
            }
        }
    }
}

fn encoded_size(tx: &Transaction) -> u64 {
    bincode::serialized_size(tx).unwrap_or(mem::size_of::<Transaction>() as u64)
}
