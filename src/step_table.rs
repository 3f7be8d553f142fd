//! StepTable: open addressing with double hashing over a prime size schedule.

use crate::error::StepTableError;
use crate::key::{self, StepKey};
use crate::schedule::SizeSchedule;
use crate::slot::Slot;
use core::borrow::Borrow;
use core::fmt;
use core::mem;
use core::ops::Index;
use log::{debug, warn};

/// Outcome of walking a key's probe sequence.
enum Probe {
    /// Slot holding an equal key.
    Found(usize),
    /// Key is absent; first reusable slot on its path.
    Vacant(usize),
    /// Key is absent and every slot on its cycle is occupied.
    Full,
}

/// Walk the probe sequence of `key` over `slots`.
///
/// The whole chain is checked for a match before a tombstone is offered for
/// reuse, so a key is never stored twice.
fn probe<K, V, F>(slots: &[Slot<K, V>], key: &str, mut matches: F) -> Probe
where
    F: FnMut(&K) -> bool,
{
    let size = slots.len();
    let Some(step) = key::step_hash(key, size) else {
        return Probe::Full;
    };
    let mut position = key::primary_hash(key, size);
    let mut tombstone = None;
    for _ in 0..size {
        match &slots[position] {
            Slot::Empty => return Probe::Vacant(tombstone.unwrap_or(position)),
            Slot::Occupied { key, .. } if matches(key) => return Probe::Found(position),
            Slot::Occupied { .. } => {}
            Slot::Tombstone => {
                tombstone.get_or_insert(position);
            }
        }
        position = (position + step) % size;
    }
    match tombstone {
        Some(p) => Probe::Vacant(p),
        None => Probe::Full,
    }
}

fn empty_slots<K, V>(size: usize) -> Vec<Slot<K, V>> {
    (0..size).map(|_| Slot::Empty).collect()
}

/// A string-keyed map storing every entry directly in one slot array.
///
/// Capacity only moves forward through the `SizeSchedule`. Growth happens
/// once more than two thirds of the slots are occupied. When the schedule
/// has no larger size the table keeps filling until every slot is taken,
/// after which inserts of new keys fail with `CapacityExhausted`.
#[derive(Clone)]
pub struct StepTable<K, V> {
    slots: Vec<Slot<K, V>>,
    schedule: SizeSchedule,
    size_index: usize,
    count: usize,
    warned_exhausted: bool,
}

impl<K, V> StepTable<K, V> {
    /// Empty table on the default schedule, starting at capacity 5.
    pub fn new() -> Self {
        Self::with_schedule(SizeSchedule::default())
    }

    pub fn with_schedule(schedule: SizeSchedule) -> Self {
        let first = schedule.get(0).unwrap_or(0);
        Self {
            slots: empty_slots(first),
            schedule,
            size_index: 0,
            count: 0,
            warned_exhausted: false,
        }
    }

    /// Validate `sizes` and build a table on them.
    pub fn with_sizes(sizes: impl Into<Vec<usize>>) -> Result<Self, StepTableError> {
        Ok(Self::with_schedule(SizeSchedule::new(sizes)?))
    }

    /// Number of live entries; tombstones are not counted.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// True when every slot of the current capacity holds an entry.
    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    /// Current number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn schedule(&self) -> &SizeSchedule {
        &self.schedule
    }

    /// Drop all entries and tombstones, keeping the current capacity.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = Slot::Empty);
        self.count = 0;
    }

    /// Entries in storage order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.slots.iter(),
            remaining: self.count,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.slots.iter_mut(),
            remaining: self.count,
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    fn over_threshold(&self, count: usize) -> bool {
        count * 3 > self.slots.len() * 2
    }
}

impl<K, V> Default for StepTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> StepTable<K, V>
where
    K: StepKey + Eq,
{
    fn find_index<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + StepKey + Eq,
    {
        let s = q.as_key_str();
        if s.is_empty() {
            return None;
        }
        match probe(&self.slots, s, |k| <K as Borrow<Q>>::borrow(k) == q) {
            Probe::Found(i) => Some(i),
            Probe::Vacant(_) | Probe::Full => None,
        }
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + StepKey + Eq,
    {
        let i = self.find_index(q)?;
        self.slots[i].entry().map(|(_, v)| v)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + StepKey + Eq,
    {
        let i = self.find_index(q)?;
        self.slots[i].entry_mut().map(|(_, v)| v)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + StepKey + Eq,
    {
        let i = self.find_index(q)?;
        self.slots[i].entry()
    }

    /// Like `get`, with a miss reported as `StepTableError::KeyNotFound`.
    pub fn try_get<Q>(&self, q: &Q) -> Result<&V, StepTableError>
    where
        K: Borrow<Q>,
        Q: ?Sized + StepKey + Eq,
    {
        self.get(q).ok_or(StepTableError::KeyNotFound)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + StepKey + Eq,
    {
        self.find_index(q).is_some()
    }

    /// Insert or overwrite. Returns the previous value for an existing key.
    ///
    /// Fails with `EmptyKey` for a zero-length key, and with
    /// `CapacityExhausted` when the key is new, the schedule has no larger
    /// size and no slot is free. The table is unchanged on failure.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, StepTableError> {
        if key.as_key_str().is_empty() {
            return Err(StepTableError::EmptyKey);
        }
        match probe(&self.slots, key.as_key_str(), |k| *k == key) {
            Probe::Found(i) => Ok(self.slots[i]
                .entry_mut()
                .map(|(_, v)| mem::replace(v, value))),
            Probe::Vacant(i) => {
                self.insert_vacant(i, key, value);
                Ok(None)
            }
            Probe::Full => Err(StepTableError::CapacityExhausted {
                capacity: self.capacity(),
            }),
        }
    }

    /// Value for `key`, inserting `default()` first when it is absent.
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> Result<&mut V, StepTableError>
    where
        F: FnOnce() -> V,
    {
        if key.as_key_str().is_empty() {
            return Err(StepTableError::EmptyKey);
        }
        let index = match probe(&self.slots, key.as_key_str(), |k| *k == key) {
            Probe::Found(i) => i,
            Probe::Vacant(i) => self.insert_vacant(i, key, default()),
            Probe::Full => {
                return Err(StepTableError::CapacityExhausted {
                    capacity: self.capacity(),
                })
            }
        };
        self.slots[index]
            .entry_mut()
            .map(|(_, v)| v)
            .ok_or(StepTableError::KeyNotFound)
    }

    /// Delete `key`, leaving a tombstone in its slot.
    pub fn remove<Q>(&mut self, q: &Q) -> Result<V, StepTableError>
    where
        K: Borrow<Q>,
        Q: ?Sized + StepKey + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Result<(K, V), StepTableError>
    where
        K: Borrow<Q>,
        Q: ?Sized + StepKey + Eq,
    {
        let i = self.find_index(q).ok_or(StepTableError::KeyNotFound)?;
        let slot = mem::replace(&mut self.slots[i], Slot::Tombstone);
        self.count -= 1;
        slot.into_entry().ok_or(StepTableError::KeyNotFound)
    }

    // Store a new key at `index`, a vacancy found by `probe`. Growth that
    // this entry would trigger happens first, so the returned index stays
    // valid.
    fn insert_vacant(&mut self, mut index: usize, key: K, value: V) -> usize {
        if self.over_threshold(self.count + 1) && self.grow(self.count + 1) {
            index = self.vacancy_for(&key);
        }
        self.slots[index] = Slot::Occupied { key, value };
        self.count += 1;
        index
    }

    // Advance through the schedule until `count` entries fit under the load
    // threshold. Returns whether the capacity changed.
    fn grow(&mut self, count: usize) -> bool {
        let mut grew = false;
        while self.over_threshold(count) {
            let Some(next) = self.schedule.get(self.size_index + 1) else {
                if !self.warned_exhausted {
                    warn!(
                        "size schedule exhausted at capacity {}; load factor will exceed 2/3",
                        self.capacity()
                    );
                    self.warned_exhausted = true;
                }
                break;
            };
            self.rehash(next);
            grew = true;
        }
        grew
    }

    fn rehash(&mut self, new_size: usize) {
        debug!(
            "resizing step table from {} to {} slots ({} entries)",
            self.capacity(),
            new_size,
            self.count
        );
        self.size_index += 1;
        let old = mem::replace(&mut self.slots, empty_slots(new_size));
        self.count = 0;
        for (key, value) in old.into_iter().filter_map(Slot::into_entry) {
            let i = self.vacancy_for(&key);
            self.slots[i] = Slot::Occupied { key, value };
            self.count += 1;
        }
    }

    // Insertion point for a key known to be absent from a table with room.
    fn vacancy_for(&self, key: &K) -> usize {
        match probe(&self.slots, key.as_key_str(), |_| false) {
            Probe::Vacant(i) => i,
            Probe::Found(_) | Probe::Full => {
                unreachable!("table below its load threshold has a free slot on every cycle")
            }
        }
    }
}

impl<K, V, Q> Index<&Q> for StepTable<K, V>
where
    K: StepKey + Eq + Borrow<Q>,
    Q: ?Sized + StepKey + Eq,
{
    type Output = V;

    /// Panics if the key is not present.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found in StepTable")
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for StepTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// One `(key,value)` line per entry, in storage order.
impl<K: fmt::Display, V: fmt::Display> fmt::Display for StepTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self.iter() {
            writeln!(f, "({},{})", k, v)?;
        }
        Ok(())
    }
}

/// Iterator over immutable entries in `StepTable`.
pub struct Iter<'a, K, V> {
    it: core::slice::Iter<'a, Slot<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let e = self.it.by_ref().find_map(Slot::entry)?;
        self.remaining -= 1;
        Some(e)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator over mutable entries in `StepTable`.
pub struct IterMut<'a, K, V> {
    it: core::slice::IterMut<'a, Slot<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let e = self.it.by_ref().find_map(Slot::entry_mut)?;
        self.remaining -= 1;
        Some(e)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Owning iterator, in storage order.
pub struct IntoIter<K, V> {
    it: std::vec::IntoIter<Slot<K, V>>,
    remaining: usize,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);
    fn next(&mut self) -> Option<Self::Item> {
        let e = self.it.by_ref().find_map(Slot::into_entry)?;
        self.remaining -= 1;
        Some(e)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V> IntoIterator for StepTable<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;
    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            remaining: self.count,
            it: self.slots.into_iter(),
        }
    }
}

impl<'a, K, V> IntoIterator for &'a StepTable<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut StepTable<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_key(t: &StepTable<String, i32>, i: usize) -> Option<&str> {
        t.slots[i].entry().map(|(k, _)| k.as_str())
    }

    /// Invariant: a fresh table sits at the first schedule entry with no entries.
    #[test]
    fn new_table_starts_at_first_size() {
        let t: StepTable<String, i32> = StepTable::new();
        assert_eq!(t.capacity(), 5);
        assert_eq!(t.len(), 0);
        assert!(t.is_empty());
        assert!(!t.is_full());
        assert!(t.slots.iter().all(|s| *s == Slot::Empty));
    }

    /// Invariant: overwrite keeps one logical entry and returns the old value.
    #[test]
    fn overwrite_keeps_len() {
        let mut t = StepTable::new();
        assert_eq!(t.insert("k".to_string(), 1).unwrap(), None);
        assert_eq!(t.insert("k".to_string(), 2).unwrap(), Some(1));
        assert_eq!(t.len(), 1);
        assert_eq!(t.get("k"), Some(&2));
    }

    /// Invariant: delete leaves a tombstone, not an empty slot, and drops the count.
    #[test]
    fn delete_leaves_tombstone() {
        let mut t = StepTable::new();
        t.insert("A".to_string(), 1).unwrap();
        assert_eq!(slot_key(&t, 0), Some("A"));
        assert_eq!(t.remove("A"), Ok(1));
        assert_eq!(t.slots[0], Slot::Tombstone);
        assert_eq!(t.len(), 0);
        assert_eq!(t.remove("A"), Err(StepTableError::KeyNotFound));
    }

    /// Invariant: a key probing through a tombstone stays reachable.
    /// At size 5, "A" and "F" both start at slot 0; "F" steps by 2.
    #[test]
    fn lookup_walks_past_tombstone() {
        let mut t = StepTable::new();
        t.insert("A".to_string(), 1).unwrap();
        t.insert("F".to_string(), 6).unwrap();
        assert_eq!(slot_key(&t, 2), Some("F"));

        t.remove("A").unwrap();
        assert_eq!(t.get("F"), Some(&6));
        assert!(!t.contains_key("A"));
        assert_eq!(t.remove("F"), Ok(6));
        assert!(t.is_empty());
    }

    /// Invariant: re-setting a key that sits behind a tombstone updates it in place
    /// instead of creating a second copy in the tombstone.
    #[test]
    fn overwrite_behind_tombstone_does_not_duplicate() {
        let mut t = StepTable::new();
        t.insert("A".to_string(), 1).unwrap();
        t.insert("F".to_string(), 6).unwrap();
        t.remove("A").unwrap();

        assert_eq!(t.insert("F".to_string(), 60).unwrap(), Some(6));
        assert_eq!(t.len(), 1);
        assert_eq!(t.slots[0], Slot::Tombstone);
        assert_eq!(slot_key(&t, 2), Some("F"));
    }

    /// Invariant: a new key reuses the first tombstone on its probe path.
    #[test]
    fn new_key_reuses_tombstone() {
        let mut t = StepTable::new();
        t.insert("A".to_string(), 1).unwrap();
        t.remove("A").unwrap();
        // "K" also starts at slot 0.
        t.insert("K".to_string(), 11).unwrap();
        assert_eq!(slot_key(&t, 0), Some("K"));
        assert_eq!(t.len(), 1);
    }

    /// Invariant: insert/delete churn never exhausts the slots with tombstones.
    #[test]
    fn churn_does_not_fill_with_tombstones() {
        let mut t = StepTable::new();
        for i in 0..200 {
            let k = format!("k{i}");
            t.insert(k.clone(), i).unwrap();
            assert_eq!(t.remove(&k), Ok(i));
        }
        assert_eq!(t.capacity(), 5);
        assert!(t.is_empty());
        assert!(!t.contains_key("k0"));
    }

    /// Invariant: growth drops tombstones and recomputes every position.
    #[test]
    fn resize_drops_tombstones() {
        let mut t = StepTable::new();
        for k in ["A", "B", "C"] {
            t.insert(k.to_string(), 0).unwrap();
        }
        t.remove("B").unwrap();
        t.insert("D".to_string(), 0).unwrap();
        t.insert("E".to_string(), 0).unwrap();
        assert_eq!(t.capacity(), 13);
        assert!(!t.slots.iter().any(|s| *s == Slot::Tombstone));
        for k in ["A", "C", "D", "E"] {
            let i = key::primary_hash(k, 13);
            assert_eq!(slot_key(&t, i), Some(k));
        }
    }

    /// Invariant: capacity after n inserts is the smallest schedule size holding
    /// n entries at two-thirds load.
    #[test]
    fn capacity_tracks_schedule() {
        let mut t = StepTable::new();
        for n in 1..=800usize {
            t.insert(format!("key{n}"), n).unwrap();
            let expected = crate::schedule::DEFAULT_TABLE_SIZES
                .iter()
                .copied()
                .find(|&s| n * 3 <= s * 2)
                .unwrap();
            assert_eq!(t.capacity(), expected, "after {n} inserts");
        }
        assert_eq!(t.size_index, 8);
        assert_eq!(t.len(), 800);
    }

    /// Invariant: zero-length keys are rejected on insert and absent on lookup.
    #[test]
    fn empty_key_rejected() {
        let mut t: StepTable<String, i32> = StepTable::new();
        assert_eq!(t.insert(String::new(), 1), Err(StepTableError::EmptyKey));
        assert_eq!(
            t.get_or_insert_with(String::new(), || 1).err(),
            Some(StepTableError::EmptyKey)
        );
        assert!(t.is_empty());
        assert_eq!(t.get(""), None);
        assert_eq!(t.remove(""), Err(StepTableError::KeyNotFound));
    }

    /// Invariant: `get_or_insert_with` runs the initialiser only on a miss and
    /// returns a reference valid after any growth it caused.
    #[test]
    fn get_or_insert_with_is_lazy() {
        let mut t: StepTable<String, i32> = StepTable::new();
        let mut calls = 0;
        for k in ["A", "B", "C", "D", "A", "B"] {
            *t.get_or_insert_with(k.to_string(), || {
                calls += 1;
                0
            })
            .unwrap() += 1;
        }
        assert_eq!(calls, 4);
        assert_eq!(t.capacity(), 13);
        assert_eq!(t.get("A"), Some(&2));
        assert_eq!(t.get("B"), Some(&2));
        assert_eq!(t.get("D"), Some(&1));
    }

    /// Invariant: the exhaustion warning is recorded once and growth stops there.
    #[test]
    fn exhausted_schedule_stops_growing() {
        let mut t = StepTable::with_sizes(vec![5]).unwrap();
        for (i, k) in ["A", "B", "C", "D"].iter().enumerate() {
            t.insert(k.to_string(), i as i32).unwrap();
        }
        assert!(t.warned_exhausted);
        assert_eq!(t.capacity(), 5);
        assert_eq!(t.size_index, 0);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut t = StepTable::new();
        for k in ["A", "B", "C", "D"] {
            t.insert(k.to_string(), 1).unwrap();
        }
        t.remove("A").unwrap();
        t.clear();
        assert_eq!(t.capacity(), 13);
        assert!(t.is_empty());
        assert!(t.slots.iter().all(|s| *s == Slot::Empty));
    }

    /// Invariant: iterators report exact lengths and skip tombstones.
    #[test]
    fn iterators_skip_tombstones() {
        let mut t = StepTable::new();
        for (i, k) in ["A", "B", "C"].iter().enumerate() {
            t.insert(k.to_string(), i as i32).unwrap();
        }
        t.remove("B").unwrap();
        let it = t.iter();
        assert_eq!(it.len(), 2);
        let keys: Vec<&str> = t.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["A", "C"]);
        for v in t.values_mut() {
            *v *= 10;
        }
        let values: Vec<i32> = t.values().copied().collect();
        assert_eq!(values, vec![0, 20]);
        let owned: Vec<(String, i32)> = t.into_iter().collect();
        assert_eq!(owned, vec![("A".to_string(), 0), ("C".to_string(), 20)]);
    }
}
