use crate::runtime::{
    action::{ActionData, Details},
    cell::RelCell,
    context::Varlist,
    gc::{GcHandle, WeakAction},
};

/// Cells of a block or group.
#[derive(Debug, Clone, Default)]
pub struct ArraySeries {
    pub(crate) cells: Vec<RelCell>,
    /// Action whose parameters this array was relativized against.
    pub(crate) owner: WeakAction,
}

impl ArraySeries {
    pub fn new(cells: Vec<RelCell>) -> Self {
        Self {
            cells,
            owner: WeakAction::NONE,
        }
    }

    pub fn cells(&self) -> &[RelCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Objects that live on the GC-managed heap.
#[derive(Debug)]
pub enum HeapObject {
    Array(ArraySeries),
    Text(String),
    /// Indirection cell holding the unquoted form of a deeply quoted value.
    Singular(RelCell),
    Varlist(Varlist),
    Action(ActionData),
}

impl HeapObject {
    /// Pushes every owning edge. Weak links (meta, underlying, frame and
    /// relativization owners) are not edges.
    pub(crate) fn push_children(&self, out: &mut Vec<GcHandle>) {
        match self {
            HeapObject::Array(array) => {
                for cell in &array.cells {
                    cell.push_referents(out);
                }
            }
            HeapObject::Text(_) => {}
            HeapObject::Singular(cell) => cell.push_referents(out),
            HeapObject::Varlist(varlist) => {
                for var in &varlist.vars {
                    var.push_referents(out);
                }
                if let Some(phase) = varlist.phase {
                    out.push(phase.0);
                }
            }
            HeapObject::Action(action) => {
                action.archetype.push_referents(out);
                match &action.details {
                    Details::Interpreted { body } => out.push(body.0),
                    Details::Specialized { exemplar } => out.push(exemplar.0),
                    Details::Generic(_) | Details::Native(_) | Details::Typechecker(_) => {}
                }
            }
        }
    }

    /// Estimates the shallow byte size of this object including inline Vec capacity.
    pub fn shallow_size_bytes(&self) -> usize {
        let base = std::mem::size_of::<Self>();
        match self {
            HeapObject::Array(array) => {
                base + array.cells.capacity() * std::mem::size_of::<RelCell>()
            }
            HeapObject::Text(text) => base + text.capacity(),
            HeapObject::Singular(_) => base,
            HeapObject::Varlist(varlist) => {
                base + varlist.vars.capacity() * std::mem::size_of::<crate::runtime::cell::Cell>()
            }
            HeapObject::Action(_) => base,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            HeapObject::Array(_) => "array",
            HeapObject::Text(_) => "text",
            HeapObject::Singular(_) => "singular",
            HeapObject::Varlist(_) => "context",
            HeapObject::Action(_) => "action",
        }
    }
}
