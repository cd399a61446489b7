use std::rc::Rc;

use crate::{
    runtime::{
        cell::{Cell, Kind},
        context::keylist::{Key, Keylist},
        gc::{ActionId, WeakAction, WeakContext},
    },
    syntax::symbol::Symbol,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Object,
    Module,
    Error,
    Frame,
}

impl ContextKind {
    pub fn kind(self) -> Kind {
        match self {
            ContextKind::Object => Kind::Object,
            ContextKind::Module => Kind::Module,
            ContextKind::Error => Kind::Error,
            ContextKind::Frame => Kind::Frame,
        }
    }

    pub fn from_kind(kind: Kind) -> Option<Self> {
        match kind {
            Kind::Object => Some(ContextKind::Object),
            Kind::Module => Some(ContextKind::Module),
            Kind::Error => Some(ContextKind::Error),
            Kind::Frame => Some(ContextKind::Frame),
            _ => None,
        }
    }
}

/// Execution state of a frame context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLink {
    /// Not a running frame: plain contexts, exemplars, frames being filled.
    Detached,
    /// Running at this depth of the frame stack.
    Active { depth: usize },
    /// The invocation completed.
    Expired,
}

/// Values of a context, co-indexed with its keylist.
///
/// `vars[0]` is the archetype: a context cell pointing back at this varlist.
#[derive(Debug)]
pub struct Varlist {
    pub(crate) kind: ContextKind,
    pub(crate) keylist: Rc<Keylist>,
    pub(crate) vars: Vec<Cell>,
    pub(crate) meta: WeakContext,
    pub(crate) link: FrameLink,
    /// Action whose dispatcher currently runs in this frame.
    pub(crate) phase: Option<ActionId>,
    /// Action whose paramlist the keylist is.
    pub(crate) underlying: WeakAction,
    pub(crate) label: Option<Symbol>,
}

impl Varlist {
    pub(crate) fn new(kind: ContextKind, keylist: Rc<Keylist>, vars: Vec<Cell>) -> Self {
        debug_assert_eq!(keylist.len(), vars.len());
        Varlist {
            kind,
            keylist,
            vars,
            meta: WeakContext::NONE,
            link: FrameLink::Detached,
            phase: None,
            underlying: WeakAction::NONE,
            label: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    /// Slot count including the archetype.
    #[inline]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vars.len() <= 1
    }

    pub fn keylist(&self) -> &Rc<Keylist> {
        &self.keylist
    }

    pub fn key(&self, index: usize) -> Option<&Key> {
        self.keylist.key(index)
    }

    pub fn var(&self, index: usize) -> Option<&Cell> {
        self.vars.get(index)
    }

    pub fn archetype(&self) -> &Cell {
        &self.vars[0]
    }

    pub fn link(&self) -> FrameLink {
        self.link
    }

    pub fn phase(&self) -> Option<ActionId> {
        self.phase
    }

    /// Whether the keylist is shared with another context.
    pub fn shares_keylist(&self) -> bool {
        Rc::strong_count(&self.keylist) > 1
    }

    /// Private keylist for a structural change; copies when shared.
    pub(crate) fn keylist_mut(&mut self) -> &mut Keylist {
        if self.shares_keylist() {
            tracing::debug!(
                slots = self.keylist.len(),
                "copying shared keylist before expansion"
            );
        }
        Rc::make_mut(&mut self.keylist)
    }
}
