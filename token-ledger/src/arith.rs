//! Checked quantity arithmetic
//!
//! Every balance and supply update goes through [`add`] and [`sub`];
//! nothing else in the crate does raw arithmetic on quantities.

use crate::{Error, Result};

/// Checked addition, fails with [`Error::Overflow`]
#[inline]
pub fn add(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b).ok_or(Error::Overflow)
}

/// Checked subtraction, fails with [`Error::Underflow`]
#[inline]
pub fn sub(a: u64, b: u64) -> Result<u64> {
    a.checked_sub(b).ok_or(Error::Underflow)
}
