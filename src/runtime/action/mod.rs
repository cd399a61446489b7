//! Static identity of callables.

use std::{fmt, rc::Rc};

use crate::runtime::{
    cell::{Cell, Typeset},
    context::Keylist,
    core::Core,
    error::CoreResult,
    gc::{ArrayId, ContextId, WeakAction, WeakContext},
};

pub mod generic;

pub use generic::{GenericHandler, GenericTable, Verb};

/// Native dispatcher: reads its arguments from the frame.
pub type NativeFn = fn(&mut Core, ContextId) -> CoreResult<Cell>;

/// Flags cached on an action at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ActionFlags(u16);

impl ActionFlags {
    pub const NONE: ActionFlags = ActionFlags(0);
    /// Return type is empty: the action leaves no result.
    pub const IS_INVISIBLE: ActionFlags = ActionFlags(1 << 0);
    pub const QUOTES_FIRST: ActionFlags = ActionFlags(1 << 1);
    pub const SKIPPABLE_FIRST: ActionFlags = ActionFlags(1 << 2);
    pub const RETURN_REQUOTES: ActionFlags = ActionFlags(1 << 3);
    pub const DEFERS_LOOKBACK: ActionFlags = ActionFlags(1 << 4);
    pub const POSTPONES_ENTIRELY: ActionFlags = ActionFlags(1 << 5);
    pub const HAS_RETURN: ActionFlags = ActionFlags(1 << 6);
    pub const IS_NATIVE: ActionFlags = ActionFlags(1 << 7);

    /// Flags derived from the parameter list; always recomputed.
    pub const CACHED: ActionFlags = ActionFlags(
        Self::IS_INVISIBLE.0
            | Self::QUOTES_FIRST.0
            | Self::SKIPPABLE_FIRST.0
            | Self::RETURN_REQUOTES.0
            | Self::HAS_RETURN.0,
    );

    /// Evaluator-timing flags a specialization carries over from its base.
    pub const INHERIT: ActionFlags =
        ActionFlags(Self::DEFERS_LOOKBACK.0 | Self::POSTPONES_ENTIRELY.0);

    #[inline]
    pub const fn contains(self, other: ActionFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: ActionFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub const fn union(self, other: ActionFlags) -> ActionFlags {
        ActionFlags(self.0 | other.0)
    }

    #[inline]
    pub const fn intersect(self, other: ActionFlags) -> ActionFlags {
        ActionFlags(self.0 & other.0)
    }

    #[inline]
    pub const fn without(self, other: ActionFlags) -> ActionFlags {
        ActionFlags(self.0 & !other.0)
    }
}

/// Dispatcher-specific data of an action.
#[derive(Clone)]
pub enum Details {
    /// Relativized body run by the evaluator.
    Interpreted { body: ArrayId },
    /// Frame of pre-filled arguments; its phase is the underlying action.
    Specialized { exemplar: ContextId },
    Generic(Verb),
    Native(NativeFn),
    /// Answers whether its argument is one of these kinds.
    Typechecker(Typeset),
}

impl Details {
    pub fn dispatcher_name(&self) -> &'static str {
        match self {
            Details::Interpreted { .. } => "interpreted",
            Details::Specialized { .. } => "specializer",
            Details::Generic(_) => "generic",
            Details::Native(_) => "native",
            Details::Typechecker(_) => "typechecker",
        }
    }
}

impl fmt::Debug for Details {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Details::Interpreted { body } => f.debug_struct("Interpreted").field("body", body).finish(),
            Details::Specialized { exemplar } => f
                .debug_struct("Specialized")
                .field("exemplar", exemplar)
                .finish(),
            Details::Generic(verb) => f.debug_tuple("Generic").field(verb).finish(),
            Details::Native(_) => f.write_str("Native"),
            Details::Typechecker(types) => f.debug_tuple("Typechecker").field(types).finish(),
        }
    }
}

/// A callable's static identity.
#[derive(Debug)]
pub struct ActionData {
    /// Action cell naming this identity.
    pub(crate) archetype: Cell,
    pub(crate) paramlist: Rc<Keylist>,
    pub(crate) details: Details,
    pub(crate) flags: ActionFlags,
    pub(crate) meta: WeakContext,
    /// Action whose paramlist frames of this one are built on.
    pub(crate) underlying: WeakAction,
}

impl ActionData {
    pub fn paramlist(&self) -> &Rc<Keylist> {
        &self.paramlist
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn flags(&self) -> ActionFlags {
        self.flags
    }

    pub fn archetype(&self) -> &Cell {
        &self.archetype
    }
}

/// The evaluator's side of an invocation: runs interpreted bodies.
pub trait Evaluator {
    /// Evaluates `body` with `frame` as the specifier for its relative
    /// words and arrays.
    fn eval_body(&mut self, core: &mut Core, body: ArrayId, frame: ContextId) -> CoreResult<Cell>;
}
