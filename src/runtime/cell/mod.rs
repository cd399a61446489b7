//! The uniform value record.
//!
//! A [`Cell`] is four machine words: a header (tag, inline quote depth,
//! flags), an "extra" word holding the binding, and a two-word payload.
//! The mode parameter separates cells that may carry a binding relative to
//! an action (stored inside shared bodies) from cells whose binding is
//! always specific. A [`RelCell`] becomes a [`Cell`] only through
//! [`Core::derelativize`](crate::runtime::core::Core::derelativize).

use std::{fmt, marker::PhantomData};

use crate::{
    runtime::{
        error::{CoreError, CoreResult},
        gc::{ActionId, ArrayId, ContextId, GcHandle, SingularId, TextId},
    },
    syntax::symbol::Symbol,
};

mod flags;
mod kind;

pub use flags::{CellFlags, Header, MAX_INLINE_DEPTH};
pub use kind::{Kind, Typeset};

/// Marker trait for the two binding modes a cell can be stored in.
pub trait Mode: Copy + fmt::Debug + 'static {
    const RELATIVE: bool;
}

/// Cells whose binding never depends on a running frame.
#[derive(Debug, Clone, Copy)]
pub struct Specific;

/// Cells inside shared bodies; their binding may name an action.
#[derive(Debug, Clone, Copy)]
pub struct Relative;

impl Mode for Specific {
    const RELATIVE: bool = false;
}

impl Mode for Relative {
    const RELATIVE: bool = true;
}

pub type RelCell = Cell<Relative>;

/// Resolution target carried in a cell's extra word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binding {
    #[default]
    Unbound,
    Specific(ContextId),
    /// Meaningful only together with a frame of this action.
    Relative(ActionId),
}

/// Two-word value body, shaped by the cell's kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    None,
    Logic(bool),
    Integer(i64),
    Decimal(f64),
    Char(char),
    Series { text: TextId, index: u32 },
    /// `index` is the slot in the bound context or paramlist, 0 if unbound.
    Word { spelling: Symbol, index: u32 },
    Array { array: ArrayId, index: u32 },
    Datatype(Kind),
    Typeset(Typeset),
    Action(ActionId),
    Context(ContextId),
    /// Deep quoting: the unquoted value lives in `cell`.
    Quoted { cell: SingularId, depth: u32 },
}

impl Payload {
    /// Whether this payload shape is the one `kind` stores.
    pub fn fits(&self, kind: Kind) -> bool {
        match self {
            Payload::None => matches!(kind, Kind::Nulled | Kind::Void | Kind::Blank),
            Payload::Logic(_) => kind == Kind::Logic,
            Payload::Integer(_) => kind == Kind::Integer,
            Payload::Decimal(_) => kind == Kind::Decimal,
            Payload::Char(_) => kind == Kind::Char,
            Payload::Series { .. } => kind.is_any_string(),
            Payload::Word { .. } => kind.is_any_word(),
            Payload::Array { .. } => kind.is_any_array(),
            Payload::Datatype(_) => kind == Kind::Datatype,
            Payload::Typeset(_) => kind == Kind::Typeset,
            Payload::Action(_) => kind == Kind::Action,
            Payload::Context(_) => kind.is_any_context(),
            Payload::Quoted { .. } => kind == Kind::Quoted,
        }
    }
}

#[repr(C, align(8))]
pub struct Cell<M: Mode = Specific> {
    pub(crate) header: Header,
    pub(crate) extra: Binding,
    pub(crate) payload: Payload,
    mode: PhantomData<M>,
}

/// Size every cell must have: four 64-bit words.
pub const CELL_SIZE: usize = 4 * std::mem::size_of::<u64>();

/// Checks the fixed cell footprint; [`Core`](crate::runtime::core::Core)
/// refuses to start when this fails.
pub fn verify_cell_layout() -> bool {
    std::mem::size_of::<Cell>() == CELL_SIZE
        && std::mem::size_of::<RelCell>() == CELL_SIZE
        && std::mem::align_of::<Cell>() == 8
}

impl<M: Mode> Cell<M> {
    #[inline]
    pub(crate) const fn raw(kind: Kind, payload: Payload) -> Self {
        Cell {
            header: Header::new(kind),
            extra: Binding::Unbound,
            payload,
            mode: PhantomData,
        }
    }
}

impl Cell<Specific> {
    /// Initializes a cell of `kind` with `payload`; all flags cleared.
    pub fn init(kind: Kind, payload: Payload) -> CoreResult<Self> {
        if kind == Kind::Quoted || !payload.fits(kind) {
            return Err(CoreError::bad_construction(format!(
                "{} cannot hold {:?}",
                kind, payload
            )));
        }
        Ok(Self::raw(kind, payload))
    }

    pub const fn nulled() -> Self {
        Self::raw(Kind::Nulled, Payload::None)
    }

    pub const fn void() -> Self {
        Self::raw(Kind::Void, Payload::None)
    }

    pub const fn blank() -> Self {
        Self::raw(Kind::Blank, Payload::None)
    }

    pub const fn logic(value: bool) -> Self {
        Self::raw(Kind::Logic, Payload::Logic(value))
    }

    pub const fn integer(value: i64) -> Self {
        Self::raw(Kind::Integer, Payload::Integer(value))
    }

    pub const fn decimal(value: f64) -> Self {
        Self::raw(Kind::Decimal, Payload::Decimal(value))
    }

    pub const fn char(value: char) -> Self {
        Self::raw(Kind::Char, Payload::Char(value))
    }

    pub const fn datatype(kind: Kind) -> Self {
        Self::raw(Kind::Datatype, Payload::Datatype(kind))
    }

    pub const fn typeset(types: Typeset) -> Self {
        Self::raw(Kind::Typeset, Payload::Typeset(types))
    }

    pub const fn text(text: TextId) -> Self {
        Self::raw(Kind::Text, Payload::Series { text, index: 0 })
    }

    pub const fn tag(text: TextId) -> Self {
        Self::raw(Kind::Tag, Payload::Series { text, index: 0 })
    }

    /// An unbound word-class cell; `kind` must be one of the word kinds.
    pub fn any_word(kind: Kind, spelling: Symbol) -> CoreResult<Self> {
        Self::init(kind, Payload::Word { spelling, index: 0 })
    }

    pub const fn word(spelling: Symbol) -> Self {
        Self::raw(Kind::Word, Payload::Word { spelling, index: 0 })
    }

    pub const fn set_word(spelling: Symbol) -> Self {
        Self::raw(Kind::SetWord, Payload::Word { spelling, index: 0 })
    }

    pub const fn get_word(spelling: Symbol) -> Self {
        Self::raw(Kind::GetWord, Payload::Word { spelling, index: 0 })
    }

    pub const fn refinement(spelling: Symbol) -> Self {
        Self::raw(Kind::Refinement, Payload::Word { spelling, index: 0 })
    }

    pub const fn block(array: ArrayId) -> Self {
        Self::raw(Kind::Block, Payload::Array { array, index: 0 })
    }

    pub const fn group(array: ArrayId) -> Self {
        Self::raw(Kind::Group, Payload::Array { array, index: 0 })
    }

    pub const fn action(action: ActionId) -> Self {
        Self::raw(Kind::Action, Payload::Action(action))
    }

    /// A context value; `kind` must be object, module, error or frame.
    pub fn context(kind: Kind, varlist: ContextId) -> CoreResult<Self> {
        Self::init(kind, Payload::Context(varlist))
    }
}

impl<M: Mode> Cell<M> {
    /// Kind as seen by the language: `Quoted` whenever any quote level is
    /// present.
    #[inline]
    pub fn kind(&self) -> Kind {
        if self.header.lit > 0 {
            Kind::Quoted
        } else {
            self.header.kind
        }
    }

    /// Quoting depth, inline or deep. Never touches the heap.
    #[inline]
    pub fn quote_depth(&self) -> u32 {
        match self.payload {
            Payload::Quoted { depth, .. } if self.header.kind == Kind::Quoted => depth,
            _ => u32::from(self.header.lit),
        }
    }

    /// Tag stored in the header, ignoring inline quote levels.
    #[inline]
    pub fn heart(&self) -> Kind {
        self.header.kind
    }

    #[inline]
    pub fn flags(&self) -> CellFlags {
        self.header.flags
    }

    #[inline]
    pub fn set_flag(&mut self, flag: CellFlags) {
        self.header.flags.insert(flag);
    }

    #[inline]
    pub fn clear_flag(&mut self, flag: CellFlags) {
        self.header.flags.remove(flag);
    }

    #[inline]
    pub fn has_flag(&self, flag: CellFlags) -> bool {
        self.header.flags.contains(flag)
    }

    #[inline]
    pub fn is_protected(&self) -> bool {
        self.has_flag(CellFlags::PROTECTED)
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    #[inline]
    pub fn binding(&self) -> Binding {
        self.extra
    }

    #[inline]
    pub fn is_nulled(&self) -> bool {
        self.kind() == Kind::Nulled
    }

    /// Reads the payload after checking the tag.
    pub fn payload_as(&self, expected: Kind) -> CoreResult<&Payload> {
        self.expect_kind(expected)?;
        Ok(&self.payload)
    }

    fn expect_kind(&self, expected: Kind) -> CoreResult<()> {
        let found = self.kind();
        if found == expected {
            Ok(())
        } else {
            Err(CoreError::TypeMismatch { expected, found })
        }
    }

    fn mismatch<T>(&self, expected: Kind) -> CoreResult<T> {
        Err(CoreError::TypeMismatch {
            expected,
            found: self.kind(),
        })
    }

    pub fn as_logic(&self) -> CoreResult<bool> {
        match (self.kind(), self.payload) {
            (Kind::Logic, Payload::Logic(value)) => Ok(value),
            _ => self.mismatch(Kind::Logic),
        }
    }

    pub fn as_integer(&self) -> CoreResult<i64> {
        match (self.kind(), self.payload) {
            (Kind::Integer, Payload::Integer(value)) => Ok(value),
            _ => self.mismatch(Kind::Integer),
        }
    }

    pub fn as_decimal(&self) -> CoreResult<f64> {
        match (self.kind(), self.payload) {
            (Kind::Decimal, Payload::Decimal(value)) => Ok(value),
            _ => self.mismatch(Kind::Decimal),
        }
    }

    pub fn as_char(&self) -> CoreResult<char> {
        match (self.kind(), self.payload) {
            (Kind::Char, Payload::Char(value)) => Ok(value),
            _ => self.mismatch(Kind::Char),
        }
    }

    pub fn as_datatype(&self) -> CoreResult<Kind> {
        match (self.kind(), self.payload) {
            (Kind::Datatype, Payload::Datatype(kind)) => Ok(kind),
            _ => self.mismatch(Kind::Datatype),
        }
    }

    pub fn as_typeset(&self) -> CoreResult<Typeset> {
        match (self.kind(), self.payload) {
            (Kind::Typeset, Payload::Typeset(types)) => Ok(types),
            _ => self.mismatch(Kind::Typeset),
        }
    }

    /// String storage of a text or tag.
    pub fn as_text(&self) -> CoreResult<TextId> {
        match (self.kind(), self.payload) {
            (kind, Payload::Series { text, .. }) if kind.is_any_string() => Ok(text),
            _ => self.mismatch(Kind::Text),
        }
    }

    /// Spelling of any word kind.
    pub fn as_word(&self) -> CoreResult<Symbol> {
        match (self.kind(), self.payload) {
            (kind, Payload::Word { spelling, .. }) if kind.is_any_word() => Ok(spelling),
            _ => self.mismatch(Kind::Word),
        }
    }

    /// Slot index recorded in a bound word.
    pub fn word_index(&self) -> CoreResult<u32> {
        match self.payload {
            Payload::Word { index, .. } if self.heart().is_any_word() => Ok(index),
            _ => self.mismatch(Kind::Word),
        }
    }

    /// Array of a block or group.
    pub fn as_array(&self) -> CoreResult<ArrayId> {
        match (self.kind(), self.payload) {
            (kind, Payload::Array { array, .. }) if kind.is_any_array() => Ok(array),
            _ => self.mismatch(Kind::Block),
        }
    }

    pub fn as_action(&self) -> CoreResult<ActionId> {
        match (self.kind(), self.payload) {
            (Kind::Action, Payload::Action(action)) => Ok(action),
            _ => self.mismatch(Kind::Action),
        }
    }

    /// Varlist of any context kind.
    pub fn as_context(&self) -> CoreResult<ContextId> {
        match (self.kind(), self.payload) {
            (kind, Payload::Context(varlist)) if kind.is_any_context() => Ok(varlist),
            _ => self.mismatch(Kind::Object),
        }
    }

    /// Copy that leaves slot-owned and transient bits behind.
    #[inline]
    fn filtered(&self) -> Self {
        Cell {
            header: Header {
                kind: self.header.kind,
                lit: self.header.lit,
                flags: self.header.flags & !CellFlags::NO_COPY,
            },
            extra: self.extra,
            payload: self.payload,
            mode: PhantomData,
        }
    }

    /// Reinterprets the cell in another mode without checking the binding.
    #[inline]
    pub(crate) fn recast<N: Mode>(&self) -> Cell<N> {
        Cell {
            header: self.header,
            extra: self.extra,
            payload: self.payload,
            mode: PhantomData,
        }
    }

    /// Same kind, depth and payload bits; flags and binding are ignored.
    pub fn same_bits(&self, other: &Cell<M>) -> bool {
        self.header.kind == other.header.kind
            && self.header.lit == other.header.lit
            && self.payload == other.payload
    }

    /// Moves a frame slot to the managed lifetime class.
    pub fn promote(&mut self) {
        if self.has_flag(CellFlags::STACK) {
            self.header.flags.remove(CellFlags::STACK);
            self.header.flags.insert(CellFlags::MANAGED);
        }
    }

    /// Heap objects this cell keeps alive.
    pub(crate) fn push_referents(&self, out: &mut Vec<GcHandle>) {
        match self.payload {
            Payload::Series { text, .. } => out.push(text.0),
            Payload::Array { array, .. } => out.push(array.0),
            Payload::Action(action) => out.push(action.0),
            Payload::Context(varlist) => out.push(varlist.0),
            Payload::Quoted { cell, .. } => out.push(cell.0),
            _ => {}
        }
        match self.extra {
            Binding::Specific(context) => out.push(context.0),
            Binding::Relative(action) => out.push(action.0),
            Binding::Unbound => {}
        }
    }
}

impl Cell<Specific> {
    /// Stores this value where relative cells are allowed. Always valid.
    #[inline]
    pub fn into_relative(self) -> RelCell {
        self.recast()
    }

    /// The context this cell is bound to, if any.
    pub fn specific_binding(&self) -> Option<ContextId> {
        match self.extra {
            Binding::Specific(context) => Some(context),
            _ => None,
        }
    }

    pub(crate) fn bind_specific(&mut self, context: ContextId, index: u32) {
        self.extra = Binding::Specific(context);
        if let Payload::Word { index: slot, .. } = &mut self.payload {
            *slot = index;
        }
    }
}

impl Cell<Relative> {
    #[inline]
    pub fn is_relative(&self) -> bool {
        matches!(self.extra, Binding::Relative(_))
    }

    /// The value as a specific cell, when it does not need a specifier.
    pub fn specified(&self) -> Option<Cell> {
        if self.is_relative() {
            None
        } else {
            Some(self.filtered().recast())
        }
    }
}

impl<M: Mode> Clone for Cell<M> {
    /// Filtered copy: ownership, lifetime and evaluator bits are dropped.
    fn clone(&self) -> Self {
        self.filtered()
    }
}

impl<M: Mode> fmt::Debug for Cell<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(if M::RELATIVE { "RelCell" } else { "Cell" });
        out.field("kind", &self.header.kind);
        if self.header.lit > 0 {
            out.field("lit", &self.header.lit);
        }
        if self.header.flags != CellFlags::NONE {
            out.field("flags", &self.header.flags);
        }
        if self.extra != Binding::Unbound {
            out.field("binding", &self.extra);
        }
        out.field("payload", &self.payload).finish()
    }
}

/// Writes `src` into `dest`, keeping the destination slot's persistent bits
/// and taking only the copyable bits of the source.
pub fn move_value<M: Mode>(dest: &mut Cell<M>, src: &Cell<M>) {
    copy_masked(dest, src, CellFlags::NO_COPY);
}

/// Like [`move_value`] but with an explicit mask of source bits to drop.
/// Persistent bits of the destination always survive.
pub fn copy_masked<M: Mode>(dest: &mut Cell<M>, src: &Cell<M>, mask: CellFlags) {
    let kept = dest.header.flags & CellFlags::PERSIST;
    dest.header = Header {
        kind: src.header.kind,
        lit: src.header.lit,
        flags: kept | (src.header.flags & !(mask | CellFlags::PERSIST)),
    };
    dest.extra = src.extra;
    dest.payload = src.payload;
}

/// Variable move between contexts: like [`move_value`] but the enfix marker
/// travels with the value.
pub fn move_var(dest: &mut Cell, src: &Cell) {
    move_value(dest, src);
    if src.has_flag(CellFlags::ENFIXED) {
        dest.set_flag(CellFlags::ENFIXED);
    }
}

/// An empty slot carrying `flags` as its persistent bits.
pub fn slot<M: Mode>(flags: CellFlags) -> Cell<M> {
    let mut cell = Cell::<M>::raw(Kind::Nulled, Payload::None);
    cell.header.flags = flags & CellFlags::PERSIST;
    cell
}
