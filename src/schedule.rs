//! Size schedule: the ascending list of capacities a `StepTable` grows
//! through.
//!
//! Every capacity must be prime. The probe step of a key lies in
//! `[1, size - 1]`, and only a prime size is coprime with every such step,
//! which is what lets a probe visit each slot exactly once per cycle.

use crate::error::ScheduleError;
use std::borrow::Cow;

/// Default capacities, all prime, roughly doubling. Sized for up to about a
/// million entries.
pub const DEFAULT_TABLE_SIZES: &[usize] = &[
    5, 13, 29, 53, 97, 193, 389, 769, 1543, 3079, 6151, 12289, 24593, 49157, 98317, 196613,
    393241, 786433, 1572869,
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SizeSchedule {
    sizes: Cow<'static, [usize]>,
}

impl SizeSchedule {
    /// Validate and wrap a custom schedule.
    pub fn new(sizes: impl Into<Vec<usize>>) -> Result<Self, ScheduleError> {
        let sizes = sizes.into();
        validate(&sizes)?;
        Ok(Self {
            sizes: Cow::Owned(sizes),
        })
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Always false for a validated schedule.
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Capacity at `index`, or `None` once the schedule is exhausted.
    pub fn get(&self, index: usize) -> Option<usize> {
        self.sizes.get(index).copied()
    }

    /// Largest capacity the table can reach.
    pub fn max_capacity(&self) -> usize {
        self.sizes.last().copied().unwrap_or(0)
    }
}

impl Default for SizeSchedule {
    fn default() -> Self {
        Self {
            sizes: Cow::Borrowed(DEFAULT_TABLE_SIZES),
        }
    }
}

fn validate(sizes: &[usize]) -> Result<(), ScheduleError> {
    if sizes.is_empty() {
        return Err(ScheduleError::Empty);
    }
    for (index, &size) in sizes.iter().enumerate() {
        if index > 0 && size <= sizes[index - 1] {
            return Err(ScheduleError::NotAscending { index });
        }
        if !is_prime(size) {
            return Err(ScheduleError::NotPrime { size });
        }
    }
    Ok(())
}

pub(crate) fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let n = n as u64;
    let mut d = 3u64;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}
