use std::fmt;

use crate::runtime::{
    cell::{Cell, Kind},
    context::ParamClass,
    core::Core,
    error::CoreResult,
    gc::ContextId,
};

/// Operations that dispatch on the kind of their first argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Append,
    Copy,
    Select,
    Find,
    Length,
    Reflect,
}

impl Verb {
    pub const ALL: [Verb; 6] = [
        Verb::Append,
        Verb::Copy,
        Verb::Select,
        Verb::Find,
        Verb::Length,
        Verb::Reflect,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Verb::Append => "append",
            Verb::Copy => "copy",
            Verb::Select => "select",
            Verb::Find => "find",
            Verb::Length => "length",
            Verb::Reflect => "reflect",
        }
    }

    /// Parameter list of the generic action for this verb.
    pub fn params(self) -> &'static [(&'static str, ParamClass)] {
        match self {
            Verb::Append => &[("series", ParamClass::Normal), ("value", ParamClass::Normal)],
            Verb::Copy => &[("value", ParamClass::Normal), ("deep", ParamClass::Refinement)],
            Verb::Select | Verb::Find => {
                &[("series", ParamClass::Normal), ("value", ParamClass::Normal)]
            }
            Verb::Length => &[("series", ParamClass::Normal)],
            Verb::Reflect => &[("value", ParamClass::Normal), ("property", ParamClass::HardQuote)],
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-kind implementation of the generic verbs. Arguments are read from
/// the frame in parameter order.
pub type GenericHandler = fn(&mut Core, Verb, ContextId) -> CoreResult<Cell>;

/// Dispatch table keyed by the kind of the first argument.
#[derive(Clone)]
pub struct GenericTable {
    handlers: [Option<GenericHandler>; Kind::COUNT],
}

impl Default for GenericTable {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericTable {
    pub fn new() -> Self {
        GenericTable {
            handlers: [None; Kind::COUNT],
        }
    }

    pub fn register(&mut self, kind: Kind, handler: GenericHandler) {
        self.handlers[kind as usize] = Some(handler);
    }

    pub fn lookup(&self, kind: Kind) -> Option<GenericHandler> {
        self.handlers[kind as usize]
    }

    pub fn handles(&self, kind: Kind) -> bool {
        self.lookup(kind).is_some()
    }
}

impl fmt::Debug for GenericTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(Kind::ALL.iter().filter(|kind| self.handles(**kind)))
            .finish()
    }
}
