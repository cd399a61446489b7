use super::symbol::Symbol;

/// Byte range of an interned spelling plus its case-folded canon.
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    pub(super) start: usize,
    pub(super) end: usize,
    pub(super) canon: Symbol,
}

impl Entry {
    #[inline]
    pub(super) fn new(start: usize, end: usize, canon: Symbol) -> Self {
        Self { start, end, canon }
    }

    /// Returns the length in bytes of the spelling.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the canonical (lowercased) symbol for this spelling.
    #[inline]
    pub fn canon(&self) -> Symbol {
        self.canon
    }
}
