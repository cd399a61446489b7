//! Context storage: keylists and varlists.
//!
//! The operations over contexts live on
//! [`Core`](crate::runtime::core::Core) because they need the heap and the
//! symbol table together.

pub mod keylist;
pub mod varlist;

pub use keylist::{Key, KeyFlags, Keylist, ParamClass};
pub use varlist::{ContextKind, FrameLink, Varlist};

/// Location of one variable: a context and a slot index in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarRef {
    pub context: crate::runtime::gc::ContextId,
    pub index: usize,
}
