/// A unique identifier for an interned spelling.
///
/// Symbols are created by the `Interner` and should not be constructed manually.
/// Two symbols compare equal only when their spellings match exactly; use
/// [`Interner::canon`](super::interner::Interner::canon) for case-insensitive
/// identity.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Spelling of the reserved slot-0 key of every keylist.
    pub const ROOT: Symbol = Symbol(u32::MAX);

    /// Creates a new symbol from a raw index.
    ///
    /// This is intended for internal use by the `Interner` only.
    #[inline]
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this symbol.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}
