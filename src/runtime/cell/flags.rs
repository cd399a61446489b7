use std::ops::{BitAnd, BitOr, Not};

use super::kind::Kind;

/// Header bits of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellFlags(u16);

impl CellFlags {
    pub const NONE: CellFlags = CellFlags(0);

    /// Owned by a heap series and visible to the collector.
    pub const MANAGED: CellFlags = CellFlags(1 << 0);
    /// Held alive explicitly by the root set.
    pub const ROOT: CellFlags = CellFlags(1 << 1);
    /// Slot of a frame that is still running.
    pub const STACK: CellFlags = CellFlags(1 << 2);
    pub const TRANSIENT: CellFlags = CellFlags(1 << 3);
    /// Slot rejects writes.
    pub const PROTECTED: CellFlags = CellFlags(1 << 4);
    pub const ENFIXED: CellFlags = CellFlags(1 << 5);
    pub const UNEVALUATED: CellFlags = CellFlags(1 << 6);
    pub const EVAL_FLIP: CellFlags = CellFlags(1 << 7);
    /// Frame slot filled ahead of time by a specialization.
    pub const MARKED: CellFlags = CellFlags(1 << 8);
    pub const NEWLINE_BEFORE: CellFlags = CellFlags(1 << 9);
    pub const CONST: CellFlags = CellFlags(1 << 10);

    /// Bits that belong to the slot rather than to the value in it.
    pub const PERSIST: CellFlags = CellFlags(
        Self::MANAGED.0 | Self::ROOT.0 | Self::STACK.0 | Self::TRANSIENT.0 | Self::PROTECTED.0,
    );

    /// Bits a value copy never carries over from the source.
    pub const NO_COPY: CellFlags = CellFlags(
        Self::PERSIST.0
            | Self::ENFIXED.0
            | Self::UNEVALUATED.0
            | Self::EVAL_FLIP.0
            | Self::MARKED.0,
    );

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: CellFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn intersects(self, other: CellFlags) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn insert(&mut self, other: CellFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: CellFlags) {
        self.0 &= !other.0;
    }
}

impl BitOr for CellFlags {
    type Output = CellFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        CellFlags(self.0 | rhs.0)
    }
}

impl BitAnd for CellFlags {
    type Output = CellFlags;

    fn bitand(self, rhs: Self) -> Self::Output {
        CellFlags(self.0 & rhs.0)
    }
}

impl Not for CellFlags {
    type Output = CellFlags;

    fn not(self) -> Self::Output {
        CellFlags(!self.0)
    }
}

/// Largest quoting depth kept in the header without an indirection cell.
pub const MAX_INLINE_DEPTH: u32 = 3;

/// First word of a cell: tag, inline quote depth, flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub(crate) kind: Kind,
    pub(crate) lit: u8,
    pub(crate) flags: CellFlags,
}

impl Header {
    #[inline]
    pub(crate) const fn new(kind: Kind) -> Self {
        Header {
            kind,
            lit: 0,
            flags: CellFlags::NONE,
        }
    }
}
