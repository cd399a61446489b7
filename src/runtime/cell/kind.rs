use std::fmt;

/// Type tag stored in a cell header.
///
/// `Quoted` is the tag of a cell whose quoting depth no longer fits inline;
/// cells quoted fewer levels keep their own tag and report `Quoted` only
/// through [`Cell::kind`](super::Cell::kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Kind {
    Nulled = 0,
    Void,
    Blank,
    Logic,
    Integer,
    Decimal,
    Char,
    Text,
    Tag,
    Word,
    SetWord,
    GetWord,
    Refinement,
    Block,
    Group,
    Datatype,
    Typeset,
    Action,
    Object,
    Module,
    Error,
    Frame,
    Quoted,
}

impl Kind {
    pub const COUNT: usize = Kind::Quoted as usize + 1;

    pub const ALL: [Kind; Kind::COUNT] = [
        Kind::Nulled,
        Kind::Void,
        Kind::Blank,
        Kind::Logic,
        Kind::Integer,
        Kind::Decimal,
        Kind::Char,
        Kind::Text,
        Kind::Tag,
        Kind::Word,
        Kind::SetWord,
        Kind::GetWord,
        Kind::Refinement,
        Kind::Block,
        Kind::Group,
        Kind::Datatype,
        Kind::Typeset,
        Kind::Action,
        Kind::Object,
        Kind::Module,
        Kind::Error,
        Kind::Frame,
        Kind::Quoted,
    ];

    /// Datatype name as written in source, e.g. `integer!`.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Nulled => "null",
            Kind::Void => "void!",
            Kind::Blank => "blank!",
            Kind::Logic => "logic!",
            Kind::Integer => "integer!",
            Kind::Decimal => "decimal!",
            Kind::Char => "char!",
            Kind::Text => "text!",
            Kind::Tag => "tag!",
            Kind::Word => "word!",
            Kind::SetWord => "set-word!",
            Kind::GetWord => "get-word!",
            Kind::Refinement => "refinement!",
            Kind::Block => "block!",
            Kind::Group => "group!",
            Kind::Datatype => "datatype!",
            Kind::Typeset => "typeset!",
            Kind::Action => "action!",
            Kind::Object => "object!",
            Kind::Module => "module!",
            Kind::Error => "error!",
            Kind::Frame => "frame!",
            Kind::Quoted => "quoted!",
        }
    }

    pub fn from_name(name: &str) -> Option<Kind> {
        Kind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    #[inline]
    pub fn is_any_word(self) -> bool {
        matches!(
            self,
            Kind::Word | Kind::SetWord | Kind::GetWord | Kind::Refinement
        )
    }

    #[inline]
    pub fn is_any_array(self) -> bool {
        matches!(self, Kind::Block | Kind::Group)
    }

    #[inline]
    pub fn is_any_context(self) -> bool {
        matches!(self, Kind::Object | Kind::Module | Kind::Error | Kind::Frame)
    }

    #[inline]
    pub fn is_any_string(self) -> bool {
        matches!(self, Kind::Text | Kind::Tag)
    }

    /// Kinds whose binding field carries meaning.
    ///
    /// Refinements are inert names and never bind.
    #[inline]
    pub fn is_bindable(self) -> bool {
        matches!(
            self,
            Kind::Word | Kind::SetWord | Kind::GetWord | Kind::Block | Kind::Group
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bitset over [`Kind`], used for parameter type checks and deep-copy masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Typeset(u64);

impl Typeset {
    pub const EMPTY: Typeset = Typeset(0);

    /// Everything except null and void.
    pub const ANY_VALUE: Typeset = Typeset(
        ((1u64 << Kind::COUNT) - 1) & !(1 << Kind::Nulled as u64) & !(1 << Kind::Void as u64),
    );

    pub const ANY_ARRAY: Typeset = Typeset((1 << Kind::Block as u64) | (1 << Kind::Group as u64));

    pub const ANY_CONTEXT: Typeset = Typeset(
        (1 << Kind::Object as u64)
            | (1 << Kind::Module as u64)
            | (1 << Kind::Error as u64)
            | (1 << Kind::Frame as u64),
    );

    pub const ANY_STRING: Typeset = Typeset((1 << Kind::Text as u64) | (1 << Kind::Tag as u64));

    /// Kinds cloned by a deep copy.
    pub const ANY_SERIES: Typeset =
        Typeset(Self::ANY_ARRAY.0 | Self::ANY_CONTEXT.0 | Self::ANY_STRING.0);

    pub fn of(kinds: &[Kind]) -> Self {
        kinds.iter().fold(Typeset::EMPTY, |set, kind| set.with(*kind))
    }

    #[inline]
    pub const fn with(self, kind: Kind) -> Self {
        Typeset(self.0 | (1 << kind as u64))
    }

    #[inline]
    pub const fn contains(self, kind: Kind) -> bool {
        self.0 & (1 << kind as u64) != 0
    }

    #[inline]
    pub const fn union(self, other: Typeset) -> Self {
        Typeset(self.0 | other.0)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn kinds(self) -> impl Iterator<Item = Kind> {
        Kind::ALL.into_iter().filter(move |kind| self.contains(*kind))
    }
}
