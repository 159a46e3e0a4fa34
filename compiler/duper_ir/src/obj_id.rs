//! Stable identity handles for heap-backed values.

use std::fmt;

/// Opaque identity of a heap-backed value: its allocation address, not its
/// content. Inline scalars have no `ObjId`.
///
/// An `ObjId` is only meaningful while the value it came from is alive; the
/// namespace and memo tables that key on it always hold the value too.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct ObjId(usize);

impl ObjId {
    #[inline]
    pub(crate) const fn new(addr: usize) -> Self {
        ObjId(addr)
    }

    /// Raw address value, mostly for debug output.
    #[inline]
    pub const fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjId({:#x})", self.0)
    }
}
