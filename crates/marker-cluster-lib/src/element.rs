//! Caller-owned elements placed on the map

use crate::GeoPoint;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Something with a position that should be shown as (part of) a marker
///
/// The engine never owns domain data; it keeps elements behind an `Arc` and refers to
/// them by [`ElementKey`].
pub trait MapElement: Send + Sync + 'static {
    /// Stable identifier, used for pinned markers and marker titles
    fn id(&self) -> Option<&str> {
        None
    }

    /// Position of the element. `(0, 0)` means "no location".
    fn location(&self) -> GeoPoint;

    /// Human readable ordering property (e.g. a date), used as marker description
    fn sort_key(&self) -> Option<&str> {
        None
    }
}

impl MapElement for GeoPoint {
    fn location(&self) -> GeoPoint {
        *self
    }
}

/// Position of an element in the list it was registered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementKey(pub usize);

impl ElementKey {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ElementKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
