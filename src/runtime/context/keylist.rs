use crate::{runtime::cell::Typeset, syntax::symbol::Symbol};

/// How a parameter takes its argument. Keys of plain objects are `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamClass {
    Normal,
    /// `'name`: argument is taken literally.
    HardQuote,
    /// `:name`: literal unless it is a group or get-word.
    SoftQuote,
    /// `/name`: on/off switch; following normal params are its arguments.
    Refinement,
    Local,
    Return,
}

impl ParamClass {
    /// Whether the slot is filled from the call site.
    #[inline]
    pub fn takes_argument(self) -> bool {
        matches!(
            self,
            ParamClass::Normal | ParamClass::HardQuote | ParamClass::SoftQuote
        )
    }

    #[inline]
    pub fn is_quoting(self) -> bool {
        matches!(self, ParamClass::HardQuote | ParamClass::SoftQuote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyFlags(u8);

impl KeyFlags {
    pub const NONE: KeyFlags = KeyFlags(0);
    /// Not enumerated and not compared, still addressable by name.
    pub const HIDDEN: KeyFlags = KeyFlags(1 << 0);
    /// Argument may be skipped when the next value does not type check.
    pub const SKIPPABLE: KeyFlags = KeyFlags(1 << 1);
    /// Argument may be missing at the end of input.
    pub const ENDABLE: KeyFlags = KeyFlags(1 << 2);
    /// Return value gets the quote levels of the quoted argument back.
    pub const REQUOTE: KeyFlags = KeyFlags(1 << 3);

    #[inline]
    pub const fn contains(self, other: KeyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: KeyFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: KeyFlags) {
        self.0 &= !other.0;
    }
}

/// Descriptor for one slot of a context or parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub spelling: Symbol,
    pub canon: Symbol,
    pub class: ParamClass,
    pub types: Typeset,
    pub flags: KeyFlags,
}

impl Key {
    /// Key for a plain object field.
    pub fn field(spelling: Symbol, canon: Symbol) -> Self {
        Key {
            spelling,
            canon,
            class: ParamClass::Normal,
            types: Typeset::ANY_VALUE,
            flags: KeyFlags::NONE,
        }
    }

    pub fn param(spelling: Symbol, canon: Symbol, class: ParamClass) -> Self {
        Key {
            class,
            ..Key::field(spelling, canon)
        }
    }

    /// Slot 0 of every keylist.
    pub fn root() -> Self {
        Key::field(Symbol::ROOT, Symbol::ROOT)
    }

    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.flags.contains(KeyFlags::HIDDEN)
    }
}

/// Ordered key descriptors; `keys[0]` is the root key.
///
/// Contexts hold a keylist through an `Rc`. Any structural change goes
/// through `Rc::make_mut`, so a context sharing its keylist gets a private
/// copy at that moment and the other sharers keep the old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keylist {
    keys: Vec<Key>,
}

impl Default for Keylist {
    fn default() -> Self {
        Self::new()
    }
}

impl Keylist {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut keys = Vec::with_capacity(capacity + 1);
        keys.push(Key::root());
        Keylist { keys }
    }

    /// Number of slots including the root.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.len() <= 1
    }

    #[inline]
    pub fn key(&self, index: usize) -> Option<&Key> {
        self.keys.get(index)
    }

    pub(crate) fn key_mut(&mut self, index: usize) -> Option<&mut Key> {
        if index == 0 {
            return None;
        }
        self.keys.get_mut(index)
    }

    pub fn push(&mut self, key: Key) -> usize {
        self.keys.push(key);
        self.keys.len() - 1
    }

    /// `(index, key)` pairs from slot 1 on.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &Key)> {
        self.keys.iter().enumerate().skip(1)
    }

    pub fn visible(&self) -> impl Iterator<Item = (usize, &Key)> {
        self.entries().filter(|(_, key)| !key.is_hidden())
    }

    /// Slot whose canon matches; exact spelling when `case_sensitive`.
    /// Hidden keys are found too.
    pub fn find(&self, spelling: Symbol, canon: Symbol, case_sensitive: bool) -> Option<usize> {
        self.entries()
            .find(|(_, key)| {
                if case_sensitive {
                    key.spelling == spelling
                } else {
                    key.canon == canon
                }
            })
            .map(|(index, _)| index)
    }
}
