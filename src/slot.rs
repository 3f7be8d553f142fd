/// One cell of the table array.
///
/// `Tombstone` keeps probe chains walkable after a delete: a lookup treats
/// it like an occupied slot holding some other key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Slot<K, V> {
    Empty,
    Tombstone,
    Occupied { key: K, value: V },
}

impl<K, V> Slot<K, V> {
    pub(crate) fn entry(&self) -> Option<(&K, &V)> {
        match self {
            Slot::Occupied { key, value } => Some((key, value)),
            _ => None,
        }
    }

    pub(crate) fn entry_mut(&mut self) -> Option<(&K, &mut V)> {
        match self {
            Slot::Occupied { key, value } => Some((&*key, value)),
            _ => None,
        }
    }

    pub(crate) fn into_entry(self) -> Option<(K, V)> {
        match self {
            Slot::Occupied { key, value } => Some((key, value)),
            _ => None,
        }
    }
}
