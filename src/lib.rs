//! step-table: a single-threaded, string-keyed hash table using open
//! addressing with double hashing over a prime size schedule.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a map whose every entry lives directly in one slot array, with
//!   collisions resolved by probing rather than chaining.
//! - Pieces:
//!   - `StepTable<K, V>`: the map. Owns the slot array, a cursor into the
//!     size schedule, and the live-entry count.
//!   - `Slot<K, V>`: `Empty | Tombstone | Occupied { key, value }`.
//!   - `StepKey`: keys viewed as character sequences, feeding the primary
//!     hash (start slot) and the secondary hash (probe step).
//!   - `SizeSchedule`: ascending prime capacities the table grows through.
//!
//! Probing
//! - Start at `primary_hash(key)`, advance by `step_hash(key)` modulo the
//!   table size, for at most `table_size` steps.
//! - The step lies in `[1, size - 1]` and every size is prime, so a probe
//!   visits each slot exactly once per cycle.
//! - Tombstones are walked past on lookup. An insert of a new key reuses the
//!   first tombstone on its path, after the whole chain has been checked
//!   for the key.
//!
//! Growth
//! - Capacity moves forward through the schedule as soon as more than two
//!   thirds of the slots would be occupied; every live entry is rehashed
//!   into the new array and tombstones are dropped.
//! - When the schedule has no larger size, the table keeps filling past the
//!   2/3 load. Once every slot is occupied, inserting a new key fails with
//!   `StepTableError::CapacityExhausted` and leaves the table unchanged.
//!
//! Constraints
//! - Single-threaded: mutation requires `&mut self`; no interior mutability.
//! - Keys must be non-empty; `insert` rejects `""` with `EmptyKey`.
//! - Enumeration order is storage order, not insertion order.
//!
//! Logging
//! - Resizes are reported at `debug` and schedule exhaustion once at `warn`
//!   through the `log` facade.

mod error;
pub mod key;
pub mod schedule;
mod slot;
pub mod step_table;
mod step_table_proptest;

// Public surface
pub use error::{ScheduleError, StepTableError};
pub use key::StepKey;
pub use schedule::{SizeSchedule, DEFAULT_TABLE_SIZES};
pub use step_table::StepTable;
