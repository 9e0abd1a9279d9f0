//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  The inner integer is `pub` to allow
//! direct indexing into dense `Vec`s via `id.0 as usize`, but callers should
//! prefer the `.index()` helpers for clarity.
//!
//! External GTFS/OSM string identifiers are interned into these dense indices
//! at load time; the interning tables own the reverse mapping.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[derive(serde::Serialize, serde::Deserialize)]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID" — equivalent to the type's MAX.
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Index of a transit stop in the dense stop table `[0..S)`.
    pub struct StopId(u32);
}

typed_id! {
    /// Index of a trip template in the dense trip table `[0..T)`.
    ///
    /// A trip expanded from frequency spans yields several concrete vehicles
    /// that all carry the same `TripId` — riders board the first vehicle of
    /// the trip to reach their stop.
    pub struct TripId(u32);
}

typed_id! {
    /// Index of an agent in the simulated population.
    pub struct AgentId(u32);
}

typed_id! {
    /// Index of a road-network node.
    pub struct NodeId(u32);
}

typed_id! {
    /// Index of a directed road-network edge.  Parallel edges between the
    /// same endpoints have distinct `EdgeId`s (and distinct keys).
    pub struct EdgeId(u32);
}

typed_id! {
    /// Index of a concrete vehicle spawned for one operating day.
    pub struct VehicleId(u32);
}
