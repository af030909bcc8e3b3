//! Opaque cell versions.
//!
//! Backend contract (spec §9 Open Question (c)): versions need only be
//! *distinguishable*, not ordered. A backend is free to generate them from a
//! monotonic counter, a content hash, or anything else, so `Version`
//! deliberately does not implement `Ord` — code outside `syncell-backend`
//! must never compare versions for anything but equality.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A backend-assigned identifier for one generation of a cell's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// Construct a version from a raw backend-internal counter value.
    ///
    /// Only backend implementations should call this; engine code receives
    /// versions from `Backend::read`/`write`/`try_write` and otherwise
    /// treats them as opaque.
    pub fn from_raw(raw: u64) -> Self {
        Version(raw)
    }

    /// The raw counter value, for backends that need to persist it.
    pub fn into_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_value() {
        assert_eq!(Version::from_raw(3), Version::from_raw(3));
        assert_ne!(Version::from_raw(3), Version::from_raw(4));
    }
}
