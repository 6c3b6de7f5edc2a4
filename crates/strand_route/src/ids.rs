//! Opaque ID newtypes for router entities.
//!
//! [`NetId`], [`ConnectionId`], [`UnitId`], and [`EntryId`] are thin `u32`
//! wrappers used as arena indices. They are `Copy`, `Ord`, `Hash`, and
//! `Serialize`/`Deserialize`.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a routed net.
    NetId
);

define_id!(
    /// Opaque, copyable ID for a driver-to-sink connection.
    ConnectionId
);

define_id!(
    /// Opaque, copyable ID for a routing unit in the resource graph arena.
    UnitId
);

define_id!(
    /// Opaque, copyable ID for a shared entry sub-node.
    EntryId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn id_roundtrip() {
        let id = UnitId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
        assert_eq!(UnitId::from_index(42), id);
    }

    #[test]
    fn ids_order_by_index() {
        let set: BTreeSet<_> = [3, 1, 2].into_iter().map(ConnectionId::from_raw).collect();
        let raw: Vec<u32> = set.into_iter().map(ConnectionId::as_raw).collect();
        assert_eq!(raw, vec![1, 2, 3]);
    }

    #[test]
    fn id_display() {
        assert_eq!(format!("{}", NetId::from_raw(7)), "7");
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = EntryId::from_raw(55);
        let json = serde_json::to_string(&id).unwrap();
        let restored: EntryId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }
}
