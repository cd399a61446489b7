use std::rc::Rc;

use crate::runtime::{
    cell::{Cell, CellFlags, Mode, Payload, Typeset, move_value, move_var, slot},
    context::FrameLink,
    core::Core,
    error::CoreResult,
    gc::{ArrayId, ArraySeries, ContextId, HeapObject},
};

/// Contexts already copied during one deep copy, so shared and cyclic
/// references keep their shape in the result.
type CopyMap = Vec<(ContextId, ContextId)>;

impl Core {
    /// Copies a context into a new varlist that shares the source keylist.
    ///
    /// Values whose kind is in `deep` are cloned recursively; everything
    /// else is shared. The copy has no meta and is never a running frame.
    pub fn copy_context(&mut self, source: ContextId, deep: Typeset) -> CoreResult<ContextId> {
        let mut copied = CopyMap::new();
        self.copy_context_inner(source, deep, &mut copied)
    }

    fn copy_context_inner(
        &mut self,
        source: ContextId,
        deep: Typeset,
        copied: &mut CopyMap,
    ) -> CoreResult<ContextId> {
        if let Some((_, done)) = copied.iter().find(|(from, _)| *from == source) {
            return Ok(*done);
        }

        let varlist = self.heap.varlist(source)?;
        let kind = varlist.kind;
        let keylist = Rc::clone(&varlist.keylist);
        let (phase, underlying) = (varlist.phase, varlist.underlying);
        let mut vars = Vec::with_capacity(varlist.vars.len());
        vars.push(Cell::blank());
        for var in varlist.vars.iter().skip(1) {
            let mut copy = slot(CellFlags::MANAGED);
            move_var(&mut copy, var);
            vars.push(copy);
        }

        let copy = self.alloc_context(kind, keylist, vars)?;
        {
            let target = self.heap.varlist_mut(copy)?;
            target.phase = phase;
            target.underlying = underlying;
            target.link = FrameLink::Detached;
        }
        copied.push((source, copy));

        if deep.is_empty() {
            return Ok(copy);
        }

        let len = self.heap.varlist(copy)?.vars.len();
        for index in 1..len {
            let value = self.heap.varlist(copy)?.vars[index].clone();
            if !deep.contains(value.kind()) {
                continue;
            }
            let cloned = self.clonify(&value, deep, copied)?;
            let var = &mut self.heap.varlist_mut(copy)?.vars[index];
            let enfixed = var.has_flag(CellFlags::ENFIXED);
            move_value(var, &cloned);
            if enfixed {
                var.set_flag(CellFlags::ENFIXED);
            }
        }
        Ok(copy)
    }

    /// Copies an array and, for kinds in `deep`, what its cells reference.
    pub fn copy_array(&mut self, source: ArrayId, deep: Typeset) -> CoreResult<ArrayId> {
        let mut copied = CopyMap::new();
        self.copy_array_inner(source, deep, &mut copied)
    }

    fn copy_array_inner(
        &mut self,
        source: ArrayId,
        deep: Typeset,
        copied: &mut CopyMap,
    ) -> CoreResult<ArrayId> {
        let series = self.heap.array(source)?;
        let owner = series.owner;
        let cells = series.cells.clone();

        let mut out = Vec::with_capacity(cells.len());
        for cell in &cells {
            if deep.contains(cell.kind()) {
                out.push(self.clonify(cell, deep, copied)?);
            } else {
                out.push(cell.clone());
            }
        }
        let handle = self.heap.alloc(HeapObject::Array(ArraySeries { cells: out, owner }));
        Ok(ArrayId(handle))
    }

    fn clonify<M: Mode>(
        &mut self,
        value: &Cell<M>,
        deep: Typeset,
        copied: &mut CopyMap,
    ) -> CoreResult<Cell<M>> {
        let mut out = value.clone();
        match (value.kind(), value.payload) {
            (kind, Payload::Array { array, index }) if kind.is_any_array() => {
                let array = self.copy_array_inner(array, deep, copied)?;
                out.payload = Payload::Array { array, index };
            }
            (kind, Payload::Series { text, index }) if kind.is_any_string() => {
                let content = self.heap.text(text)?.to_string();
                let text = self.heap.alloc_text(content);
                out.payload = Payload::Series { text, index };
            }
            (kind, Payload::Context(varlist)) if kind.is_any_context() => {
                let varlist = self.copy_context_inner(varlist, deep, copied)?;
                out.payload = Payload::Context(varlist);
            }
            _ => {}
        }
        Ok(out)
    }
}
