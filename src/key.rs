//! Key hashing.
//!
//! Keys are viewed as ordered character sequences. The primary hash picks
//! the start slot and the secondary hash, derived from the first character
//! only, picks the probe step.

use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;

/// Multiplier growth factor of the primary hash.
pub const HASH_BASE: u128 = 31;
/// Initial multiplier of the primary hash.
pub const HASH_SEED: u128 = 31415;

/// Anything a `StepTable` can hash: a key that can be read as a string.
pub trait StepKey {
    fn as_key_str(&self) -> &str;
}

impl StepKey for str {
    fn as_key_str(&self) -> &str {
        self
    }
}

impl StepKey for String {
    fn as_key_str(&self) -> &str {
        self.as_str()
    }
}

impl StepKey for Box<str> {
    fn as_key_str(&self) -> &str {
        self
    }
}

impl StepKey for Rc<str> {
    fn as_key_str(&self) -> &str {
        self
    }
}

impl StepKey for Arc<str> {
    fn as_key_str(&self) -> &str {
        self
    }
}

impl StepKey for Cow<'_, str> {
    fn as_key_str(&self) -> &str {
        self
    }
}

impl<T: StepKey + ?Sized> StepKey for &T {
    fn as_key_str(&self) -> &str {
        (**self).as_key_str()
    }
}

/// Start position of `key` in a table of `table_size` slots.
///
/// The multiplier evolves modulo `table_size - 1`; `table_size` must be at
/// least 2.
pub fn primary_hash(key: &str, table_size: usize) -> usize {
    debug_assert!(table_size >= 2);
    let size = table_size as u128;
    let mut value: u128 = 0;
    let mut a = HASH_SEED;
    for c in key.chars() {
        value = (u128::from(u32::from(c)) + a * value) % size;
        a = a * HASH_BASE % (size - 1);
    }
    value as usize
}

/// Probe step for `key`, always in `[1, table_size - 1]`.
///
/// Returns `None` for an empty key.
pub fn step_hash(key: &str, table_size: usize) -> Option<usize> {
    debug_assert!(table_size >= 2);
    let first = key.chars().next()?;
    let offset = i64::from(u32::from(first)) - i64::from(u32::from('A'));
    let step = offset.rem_euclid(table_size as i64 - 1) + 1;
    Some(step as usize)
}
