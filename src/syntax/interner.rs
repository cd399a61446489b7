use std::{
    collections::HashMap,
    hash::{BuildHasher, Hash, Hasher, RandomState},
};

use crate::syntax::{entry::Entry, symbol::Symbol};

/// A spelling interner that hands out case-preserving symbols and tracks a
/// case-folded canon for each of them.
///
/// Every spelling keeps its own symbol so that rendering reproduces what was
/// written, while lookups that must ignore case compare canons. A spelling
/// that is already lowercase is its own canon.
///
/// # Example
///
/// ```
/// use cellcore::syntax::interner::Interner;
///
/// let mut interner = Interner::new();
/// let upper = interner.intern("Foo");
/// let lower = interner.intern("foo");
///
/// assert_ne!(upper, lower);
/// assert_eq!(interner.canon(upper), lower);
/// assert!(interner.same_canon(upper, lower));
/// assert_eq!(interner.resolve(upper), "Foo");
/// ```
#[derive(Debug, Clone)]
pub struct Interner {
    hasher: RandomState,
    buckets: HashMap<u64, Vec<Symbol>>,
    entries: Vec<Entry>,
    storage: String,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    pub fn new() -> Self {
        Self {
            hasher: RandomState::new(),
            buckets: HashMap::default(),
            entries: Vec::new(),
            storage: String::new(),
        }
    }

    /// Interns a spelling and returns its symbol.
    ///
    /// Interning a mixed-case spelling also interns its lowercase form so the
    /// canon is always a live symbol.
    ///
    /// # Panics
    ///
    /// Panics if the number of unique spellings reaches `u32::MAX`, which is
    /// reserved for [`Symbol::ROOT`].
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(existing) = self.lookup(s) {
            return existing;
        }

        let folded = s.to_lowercase();
        let canon = if folded == s {
            None
        } else {
            Some(self.intern(&folded))
        };

        let index = self.entries.len();
        assert!(
            index < u32::MAX as usize,
            "symbol table overflow: cannot intern more than {} unique spellings",
            u32::MAX - 1
        );
        let sym = Symbol::new(index as u32);

        let start = self.storage.len();
        self.storage.push_str(s);
        let end = self.storage.len();

        self.entries.push(Entry::new(start, end, canon.unwrap_or(sym)));
        let hash = self.hash_str(s);
        self.buckets.entry(hash).or_default().push(sym);
        sym
    }

    /// Returns the symbol for `s` if it was interned before.
    pub fn lookup(&self, s: &str) -> Option<Symbol> {
        let hash = self.hash_str(s);
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|candidate| self.try_resolve(*candidate) == Some(s))
    }

    /// Resolves a symbol to its spelling.
    ///
    /// # Panics
    ///
    /// Panics if the symbol was not created by this interner.
    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.try_resolve(sym)
            .unwrap_or_else(|| panic!("invalid symbol: {:?}", sym))
    }

    /// Attempts to resolve a symbol to its spelling.
    ///
    /// The root sentinel resolves to the empty string.
    pub fn try_resolve(&self, sym: Symbol) -> Option<&str> {
        if sym.is_root() {
            return Some("");
        }
        let entry = self.entries.get(sym.as_u32() as usize)?;
        self.storage.get(entry.start..entry.end)
    }

    /// Returns the case-folded canon of `sym`.
    #[inline]
    pub fn canon(&self, sym: Symbol) -> Symbol {
        self.entries
            .get(sym.as_u32() as usize)
            .map_or(sym, |entry| entry.canon())
    }

    #[inline]
    pub fn same_canon(&self, a: Symbol, b: Symbol) -> bool {
        a == b || self.canon(a) == self.canon(b)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn hash_str(&self, s: &str) -> u64 {
        let mut h = self.hasher.build_hasher();
        s.hash(&mut h);
        h.finish()
    }
}
