use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_IDENTIFIER: AtomicU64 = AtomicU64::new(1);

/// Wire identity for an interface or method descriptor.
///
/// Allocated exactly once, when a descriptor is first constructed. Repeated
/// introspection of the same source interface answers from the cache and so
/// returns the same `Identifier`, which makes identity equality over the
/// canonical set a plain integer comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(u64);

impl Identifier {
    /// Allocate a fresh process-unique identifier.
    pub fn next() -> Self {
        Self(NEXT_IDENTIFIER.fetch_add(1, Ordering::Relaxed))
    }

    /// Reconstruct an identifier received over the wire.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    /// Compact 8-byte wire form.
    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

/// Identity for an interface descriptor slot in the descriptor arena.
///
/// Assigned at publish time, before the descriptor is resolved, so that
/// self- and mutually-referential signatures can mention an interface whose
/// resolution is still in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceHandle(u32);

impl InterfaceHandle {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Identity for an interned parameter descriptor.
///
/// Structurally equal parameter descriptors intern to the same `ParamId`,
/// so descriptor equality is handle equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId(u32);

impl ParamId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_unique() {
        let a = Identifier::next();
        let b = Identifier::next();
        assert_ne!(a, b);
    }

    #[test]
    fn identifier_byte_round_trip() {
        let id = Identifier::next();
        assert_eq!(Identifier::from_bytes(id.to_bytes()), id);
    }

    #[test]
    fn handles_are_copy() {
        let h = InterfaceHandle::new(7);
        let h2 = h;
        assert_eq!(h, h2);
        assert_eq!(h.index(), 7);
    }
}
