//! Word and array binding.
//!
//! A body is relativized once, when its action is made: words naming a
//! parameter, and every nested array, get a binding to the action instead
//! of to a context. Which frame such a cell refers to is only known at the
//! point of use, from the specifier handed in with it.

use tracing::trace;

use crate::runtime::{
    cell::{Binding, Cell, Payload, RelCell},
    context::{ContextKind, FrameLink, VarRef},
    core::Core,
    error::{CoreError, CoreResult},
    gc::{ActionId, ArrayId, ContextId, WeakAction},
};

/// Binding changes for one array, gathered before the array is borrowed
/// mutably.
struct Edit {
    slot: usize,
    binding: Binding,
    index: Option<u32>,
}

impl Core {
    /// Binds the parameter words of `body`, and of every array nested in
    /// it, relative to `action`.
    ///
    /// Relativizing the same body for the same action twice is a no-op; a
    /// body already relative to another action is refused.
    pub fn relativize(&mut self, body: ArrayId, action: ActionId) -> CoreResult<()> {
        match self.heap.array(body)?.owner.raw() {
            Some(owner) if owner == action => return Ok(()),
            Some(_) => {
                return Err(CoreError::BindingMismatch {
                    name: "body".to_string(),
                });
            }
            None => {}
        }

        let paramlist = std::rc::Rc::clone(&self.heap.action(action)?.paramlist);
        let mut pending = vec![body];
        let mut seen: Vec<ArrayId> = Vec::new();

        while let Some(array) = pending.pop() {
            if seen.contains(&array) {
                continue;
            }
            seen.push(array);

            let mut edits = Vec::new();
            for (slot, cell) in self.heap.array(array)?.cells().iter().enumerate() {
                let depth = cell.quote_depth();
                let heart = if depth > 0 {
                    self.unquoted_kind(cell)?
                } else {
                    cell.heart()
                };

                if heart.is_any_word() {
                    let spelling = match cell.payload() {
                        Payload::Word { spelling, .. } => *spelling,
                        _ => self.unescaped(cell)?.as_word()?,
                    };
                    let canon = self.interner.canon(spelling);
                    if let Some(index) = paramlist.find(spelling, canon, false) {
                        let inline = matches!(cell.payload(), Payload::Word { .. });
                        edits.push(Edit {
                            slot,
                            binding: Binding::Relative(action),
                            index: inline.then_some(index as u32),
                        });
                    }
                } else if depth == 0 && heart.is_any_array() {
                    edits.push(Edit {
                        slot,
                        binding: Binding::Relative(action),
                        index: None,
                    });
                    pending.push(cell.as_array()?);
                }
            }

            let series = self.heap.array_mut(array)?;
            series.owner = WeakAction::new(action);
            for edit in edits {
                let cell = &mut series.cells[edit.slot];
                cell.extra = edit.binding;
                if let (Some(index), Payload::Word { index: slot, .. }) =
                    (edit.index, &mut cell.payload)
                {
                    *slot = index;
                }
            }
        }
        Ok(())
    }

    /// Frame a relative cell of `owner` resolves against.
    fn frame_for(&self, owner: ActionId, specifier: Option<ContextId>) -> CoreResult<ContextId> {
        let frame = specifier.ok_or_else(|| self.relative_mismatch(owner))?;
        let varlist = self.heap.varlist(frame)?;
        if varlist.kind != ContextKind::Frame {
            return Err(self.relative_mismatch(owner));
        }
        match varlist.link {
            FrameLink::Active { .. } => {}
            FrameLink::Expired | FrameLink::Detached => return Err(CoreError::FrameExpired),
        }
        if varlist.underlying.raw() != Some(owner) {
            return Err(self.relative_mismatch(owner));
        }
        Ok(frame)
    }

    fn relative_mismatch(&self, owner: ActionId) -> CoreError {
        CoreError::BindingMismatch {
            name: format!("action #{}", owner.handle().index()),
        }
    }

    /// Finds the variable a word refers to. Relative words need the frame
    /// of a running invocation of their action as `specifier`.
    pub fn resolve(&self, word: &RelCell, specifier: Option<ContextId>) -> CoreResult<VarRef> {
        let (spelling, index) = match word.payload() {
            Payload::Word { spelling, index } => (*spelling, *index as usize),
            _ => {
                let inner = self.unescaped(word)?;
                (inner.as_word()?, 0)
            }
        };

        let context = match word.binding() {
            Binding::Unbound => return Err(self.not_found(spelling)),
            Binding::Specific(context) => context,
            Binding::Relative(owner) => self.frame_for(owner, specifier)?,
        };

        let keylist = &self.heap.varlist(context)?.keylist;
        let canon = self.interner.canon(spelling);
        let index = match keylist.key(index) {
            Some(key) if index > 0 && key.canon == canon => index,
            _ => keylist
                .find(spelling, canon, false)
                .ok_or_else(|| self.not_found(spelling))?,
        };
        trace!(word = self.spelling(spelling), index, "resolved");
        Ok(VarRef { context, index })
    }

    /// A copy of `cell` that no longer needs a specifier.
    pub fn derelativize(&self, cell: &RelCell, specifier: Option<ContextId>) -> CoreResult<Cell> {
        match cell.binding() {
            Binding::Relative(owner) => {
                let frame = self.frame_for(owner, specifier)?;
                let mut out: Cell = cell.clone().recast();
                out.extra = Binding::Specific(frame);
                Ok(out)
            }
            _ => Ok(cell.clone().recast()),
        }
    }

    pub fn get_var(&self, var: VarRef) -> CoreResult<Cell> {
        self.var_at(var.context, var.index)
    }

    /// Writes through a resolved reference; protected slots refuse.
    pub fn set_var(&mut self, var: VarRef, value: &Cell) -> CoreResult<()> {
        self.poke_index(var.context, var.index, value)
    }

    /// Value of a word, resolved against `specifier` if it is relative.
    pub fn word_value(&self, word: &RelCell, specifier: Option<ContextId>) -> CoreResult<Cell> {
        let var = self.resolve(word, specifier)?;
        self.get_var(var)
    }

    /// Binds every word in `array`, nested arrays included, whose name is a
    /// key of `context`. Quoted words are bound through their quote levels;
    /// quoted arrays are not entered. Other words keep their binding.
    /// Returns how many words were bound.
    pub fn bind_deep(&mut self, array: ArrayId, context: ContextId) -> CoreResult<usize> {
        let keylist = std::rc::Rc::clone(&self.heap.varlist(context)?.keylist);
        let mut pending = vec![array];
        let mut seen: Vec<ArrayId> = Vec::new();
        let mut bound = 0;

        while let Some(array) = pending.pop() {
            if seen.contains(&array) {
                continue;
            }
            seen.push(array);

            let mut edits = Vec::new();
            for (slot, cell) in self.heap.array(array)?.cells().iter().enumerate() {
                let depth = cell.quote_depth();
                let heart = if depth > 0 {
                    self.unquoted_kind(cell)?
                } else {
                    cell.heart()
                };

                if heart.is_any_word() {
                    let spelling = match cell.payload() {
                        Payload::Word { spelling, .. } => *spelling,
                        _ => self.unescaped(cell)?.as_word()?,
                    };
                    let canon = self.interner.canon(spelling);
                    if let Some(index) = keylist.find(spelling, canon, false) {
                        edits.push((slot, index as u32));
                    }
                } else if depth == 0 && heart.is_any_array() {
                    pending.push(cell.as_array()?);
                }
            }

            let series = self.heap.array_mut(array)?;
            bound += edits.len();
            for (slot, index) in edits {
                let cell = &mut series.cells[slot];
                cell.extra = Binding::Specific(context);
                if let Payload::Word { index: word_index, .. } = &mut cell.payload {
                    *word_index = index;
                }
            }
        }
        Ok(bound)
    }
}
