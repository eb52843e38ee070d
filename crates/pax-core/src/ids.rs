//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  The inner integer is `pub` to allow
//! direct indexing into SoA `Vec`s via `id.0 as usize`, but callers should
//! prefer the `.index()` helpers for clarity.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID" — equivalent to the inner max.
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
    /// Index of a stop in the timetable.  Stops are also the first
    /// `|stops|` vertices of the transfer graph.
    pub struct StopId(u32);
}

typed_id! {
    /// Index of a trip.  Trips are opaque to the engine; connections of the
    /// same trip form one vehicle's itinerary.
    pub struct TripId(u32);
}

typed_id! {
    /// Index of a connection in the timetable's departure-time-sorted array.
    pub struct ConnectionId(u32);
}

typed_id! {
    /// Index of a transfer-graph vertex.  Vertices `0..|stops|` are stops;
    /// the rest are non-stop origins/destinations (zones, addresses).
    pub struct VertexId(u32);
}

typed_id! {
    /// Index of a passenger group in an `AssignmentData` group store.
    /// Only meaningful relative to the store that issued it.
    pub struct GroupId(u32);
}

impl From<StopId> for VertexId {
    /// Every stop is a vertex with the same index.
    #[inline(always)]
    fn from(stop: StopId) -> VertexId {
        VertexId(stop.0)
    }
}
