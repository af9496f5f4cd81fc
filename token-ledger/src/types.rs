//! Core types for the token ledger
//!
//! Inside the engine a mutation is an [`Operation`] variant, which cannot
//! express an entry with neither side present. The optional-pair
//! [`HistoryEntry`] is the wire shape handed to callers; it is produced from a
//! [`Transaction`] only when history is read.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account identifier (opaque principal resolved by the caller-identity layer)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Create new principal
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Principal {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Ledger mutation, tagged by kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// New supply credited to `to`
    Mint {
        /// Recipient
        to: Principal,
    },
    /// Quantity moved between two accounts
    Transfer {
        /// Sender (the caller)
        from: Principal,
        /// Recipient
        to: Principal,
    },
    /// Supply destroyed from `from`
    Burn {
        /// Payer (the caller)
        from: Principal,
    },
}

impl Operation {
    /// Kind of this operation
    pub fn kind(&self) -> EntryKind {
        match self {
            Operation::Mint { .. } => EntryKind::Mint,
            Operation::Transfer { .. } => EntryKind::Transfer,
            Operation::Burn { .. } => EntryKind::Burn,
        }
    }
}

/// Kind of a history entry, derived from which side is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// `from` absent
    Mint,
    /// Both sides present
    Transfer,
    /// `to` absent
    Burn,
}

impl EntryKind {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Mint => "mint",
            EntryKind::Transfer => "transfer",
            EntryKind::Burn => "burn",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one applied mutation, as stored in the history log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// What happened
    pub op: Operation,

    /// Quantity moved, minted or burned
    pub qty: u64,

    /// Clock reading when the mutation was applied (nanoseconds since Unix epoch)
    pub timestamp: u64,
}

impl Transaction {
    /// Wire representation
    pub fn to_entry(&self) -> HistoryEntry {
        let (from, to) = match &self.op {
            Operation::Mint { to } => (None, Some(to.clone())),
            Operation::Transfer { from, to } => (Some(from.clone()), Some(to.clone())),
            Operation::Burn { from } => (Some(from.clone()), None),
        };

        HistoryEntry {
            from,
            to,
            qty: self.qty,
            timestamp: self.timestamp,
        }
    }
}

/// History entry wire shape
///
/// There is no kind tag: a mint has no `from`, a burn has no `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Debited account (absent for mints)
    pub from: Option<Principal>,

    /// Credited account (absent for burns)
    pub to: Option<Principal>,

    /// Quantity
    pub qty: u64,

    /// Nanoseconds since Unix epoch
    pub timestamp: u64,
}

impl HistoryEntry {
    /// Derive the entry kind, `None` if both sides are absent
    pub fn kind(&self) -> Option<EntryKind> {
        match (&self.from, &self.to) {
            (None, Some(_)) => Some(EntryKind::Mint),
            (Some(_), Some(_)) => Some(EntryKind::Transfer),
            (Some(_), None) => Some(EntryKind::Burn),
            (None, None) => None,
        }
    }
}

impl From<&Transaction> for HistoryEntry {
    fn from(tx: &Transaction) -> Self {
        tx.to_entry()
    }
}

impl TryFrom<HistoryEntry> for Transaction {
    type Error = crate::Error;

    fn try_from(entry: HistoryEntry) -> crate::Result<Self> {
        let op = match (entry.from, entry.to) {
            (None, Some(to)) => Operation::Mint { to },
            (Some(from), Some(to)) => Operation::Transfer { from, to },
            (Some(from), None) => Operation::Burn { from },
            (None, None) => {
                return Err(crate::Error::InvalidEntry(
                    "both from and to are absent".to_string(),
                ))
            }
        };

        Ok(Transaction {
            op,
            qty: entry.qty,
            timestamp: entry.timestamp,
        })
    }
}

/// One page of history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Entries in position order
    pub entries: Vec<HistoryEntry>,

    /// Position of the first returned entry
    pub start: u64,

    /// Log length at the time of the call
    pub total_count: u64,
}

impl Page {
    /// Page with no entries
    pub fn empty(start: u64, total_count: u64) -> Self {
        Self {
            entries: Vec::new(),
            start,
            total_count,
        }
    }

    /// Whether the page carries no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offset of the page following this one
    pub fn next_offset(&self) -> u64 {
        self.start.saturating_add(self.entries.len() as u64)
    }
}
