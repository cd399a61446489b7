//! Building, running and reflecting on frames.

use std::rc::Rc;

use tracing::debug;

use crate::{
    runtime::{
        action::{Details, Evaluator},
        cell::{Cell, CellFlags, Kind, Payload, copy_masked, move_value, slot},
        context::{ContextKind, FrameLink, KeyFlags, Keylist, ParamClass},
        core::Core,
        error::{CoreError, CoreResult},
        gc::{ActionId, ContextId, WeakAction},
    },
    syntax::symbol::Symbol,
};

/// Incremental construction of an invocation frame.
///
/// Positional arguments go, in order, to the parameters that are neither
/// specialized nor refinement arguments, then to the arguments of
/// refinements left pending by a specialization, then to those of
/// refinements named with [`FrameBuilder::use_refinement`].
#[derive(Debug)]
pub struct FrameBuilder {
    action: ActionId,
    frame: ContextId,
    paramlist: Rc<Keylist>,
    order: Vec<usize>,
    filled: Vec<bool>,
    next: usize,
}

/// What [`Core::reflect_frame`] can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameProperty {
    Action,
    Parent,
    Label,
    Args,
}

/// Slots of the arguments a refinement at `index` introduces.
fn refinement_args(paramlist: &Keylist, index: usize) -> Vec<usize> {
    paramlist
        .entries()
        .skip_while(|(i, _)| *i <= index)
        .take_while(|(_, key)| key.class.takes_argument())
        .map(|(i, _)| i)
        .collect()
}

impl FrameBuilder {
    pub fn new(core: &mut Core, action: ActionId) -> CoreResult<Self> {
        let (_, exemplar) = core.specialization_base(action)?;
        let underlying = core.underlying_of(action)?;
        let (paramlist, mut vars) = match exemplar {
            Some(exemplar) => {
                let varlist = core.heap.varlist(exemplar)?;
                let mut vars = Vec::with_capacity(varlist.vars.len());
                vars.push(Cell::blank());
                for var in varlist.vars.iter().skip(1) {
                    let mut copy = slot(CellFlags::MANAGED);
                    copy_masked(&mut copy, var, CellFlags::ENFIXED);
                    vars.push(copy);
                }
                (Rc::clone(&varlist.keylist), vars)
            }
            None => {
                let paramlist = Rc::clone(&core.heap.action(action)?.paramlist);
                let vars: Vec<Cell> = (0..paramlist.len())
                    .map(|_| slot(CellFlags::MANAGED))
                    .collect();
                (paramlist, vars)
            }
        };

        let filled: Vec<bool> = vars
            .iter()
            .map(|var| var.has_flag(CellFlags::MARKED))
            .collect();

        let mut order: Vec<usize> = paramlist
            .entries()
            .take_while(|(_, key)| key.class != ParamClass::Refinement)
            .filter(|(index, key)| key.class.takes_argument() && !filled[*index])
            .map(|(index, _)| index)
            .collect();

        let mut pending: Vec<(i64, usize)> = paramlist
            .entries()
            .filter(|(index, key)| key.class == ParamClass::Refinement && !filled[*index])
            .filter_map(|(index, _)| match vars[index].payload {
                Payload::Integer(marker) => Some((marker, index)),
                _ => None,
            })
            .collect();
        pending.sort_unstable();
        for (_, index) in pending {
            let logic = Cell::logic(true);
            move_value(&mut vars[index], &logic);
            order.extend(
                refinement_args(&paramlist, index)
                    .into_iter()
                    .filter(|slot| !filled[*slot]),
            );
        }

        let frame = core.alloc_context(ContextKind::Frame, Rc::clone(&paramlist), vars)?;
        {
            let varlist = core.heap.varlist_mut(frame)?;
            varlist.phase = Some(action);
            varlist.underlying = WeakAction::new(underlying);
        }

        Ok(FrameBuilder {
            action,
            frame,
            paramlist,
            order,
            filled,
            next: 0,
        })
    }

    pub fn action(&self) -> ActionId {
        self.action
    }

    pub fn frame(&self) -> ContextId {
        self.frame
    }

    /// Fills the next open positional slot.
    pub fn push_arg(&mut self, core: &mut Core, value: &Cell) -> CoreResult<()> {
        while self.next < self.order.len() && self.filled[self.order[self.next]] {
            self.next += 1;
        }
        let Some(&index) = self.order.get(self.next) else {
            return Err(CoreError::TooManyArguments {
                expected: self.order.len(),
            });
        };
        self.write(core, index, value)?;
        self.next += 1;
        Ok(())
    }

    /// Switches a refinement on; its arguments follow the ones already
    /// expected.
    pub fn use_refinement(&mut self, core: &mut Core, name: Symbol) -> CoreResult<()> {
        let index = self.index_of(core, name)?;
        let is_refinement = self
            .paramlist
            .key(index)
            .is_some_and(|key| key.class == ParamClass::Refinement);
        if !is_refinement || self.filled[index] {
            return Err(CoreError::bad_construction(format!(
                "/{} is not an available refinement",
                core.spelling(name)
            )));
        }
        self.write(core, index, &Cell::logic(true))?;
        let args = refinement_args(&self.paramlist, index);
        self.order.extend(args.into_iter().filter(|slot| !self.filled[*slot]));
        Ok(())
    }

    /// Sets a parameter by name, specialized ones included.
    pub fn set(&mut self, core: &mut Core, name: Symbol, value: &Cell) -> CoreResult<()> {
        let index = self.index_of(core, name)?;
        self.write(core, index, value)
    }

    pub fn label(&mut self, core: &mut Core, label: Symbol) -> CoreResult<()> {
        core.heap.varlist_mut(self.frame)?.label = Some(label);
        Ok(())
    }

    /// Checks that every expected argument arrived and settles the slots
    /// that no argument fills.
    pub fn finish(&mut self, core: &mut Core) -> CoreResult<ContextId> {
        for &index in &self.order {
            if self.filled[index] {
                continue;
            }
            let Some(key) = self.paramlist.key(index) else {
                continue;
            };
            if !key.flags.contains(KeyFlags::ENDABLE) {
                return Err(CoreError::MissingArgument {
                    param: core.name(key.spelling),
                });
            }
        }

        let varlist = core.heap.varlist_mut(self.frame)?;
        for (index, key) in self.paramlist.entries() {
            if self.filled[index] {
                continue;
            }
            let var = &mut varlist.vars[index];
            match key.class {
                ParamClass::Refinement => {
                    if !matches!(var.payload, Payload::Logic(_)) {
                        move_value(var, &Cell::logic(false));
                    }
                }
                ParamClass::Local | ParamClass::Return => move_value(var, &Cell::nulled()),
                _ => {}
            }
        }
        Ok(self.frame)
    }

    fn index_of(&self, core: &Core, name: Symbol) -> CoreResult<usize> {
        let canon = core.canon(name);
        self.paramlist
            .find(name, canon, false)
            .ok_or_else(|| core.not_found(name))
    }

    fn write(&mut self, core: &mut Core, index: usize, value: &Cell) -> CoreResult<()> {
        let Some(key) = self.paramlist.key(index) else {
            return Err(core.not_found(Symbol::ROOT));
        };
        let accepted = match key.class {
            ParamClass::Refinement => value.kind() == Kind::Logic,
            _ => key.types.contains(value.kind()),
        };
        if !accepted {
            return Err(CoreError::ArgumentType {
                param: core.name(key.spelling),
                found: value.kind(),
            });
        }
        let var = &mut core.heap.varlist_mut(self.frame)?.vars[index];
        move_value(var, value);
        self.filled[index] = true;
        Ok(())
    }
}

impl Core {
    /// Calls `action` with positional arguments.
    pub fn invoke(
        &mut self,
        action: ActionId,
        args: &[Cell],
        eval: &mut dyn Evaluator,
    ) -> CoreResult<Cell> {
        let mut builder = FrameBuilder::new(self, action)?;
        for arg in args {
            builder.push_arg(self, arg)?;
        }
        self.invoke_frame(builder, eval)
    }

    /// Runs a frame built with [`FrameBuilder`]. The frame is expired on
    /// the way out whether or not the action succeeded.
    pub fn invoke_frame(
        &mut self,
        mut builder: FrameBuilder,
        eval: &mut dyn Evaluator,
    ) -> CoreResult<Cell> {
        let frame = builder.finish(self)?;
        let action = builder.action();

        self.push_frame(frame)?;
        let result = self.run_phases(action, frame, eval);
        self.drop_frame(frame)?;

        let value = result?;
        if self.is_invisible(action)? {
            Ok(Cell::void())
        } else {
            Ok(value)
        }
    }

    fn push_frame(&mut self, frame: ContextId) -> CoreResult<()> {
        let depth = self.frames.len();
        let varlist = self.heap.varlist_mut(frame)?;
        varlist.link = FrameLink::Active { depth };
        for var in varlist.vars.iter_mut().skip(1) {
            var.clear_flag(CellFlags::MANAGED);
            var.set_flag(CellFlags::STACK);
        }
        self.frames.push(frame);
        debug!(depth, "frame pushed");
        Ok(())
    }

    fn drop_frame(&mut self, frame: ContextId) -> CoreResult<()> {
        if let Some(position) = self.frames.iter().rposition(|f| *f == frame) {
            self.frames.truncate(position);
        }
        let varlist = self.heap.varlist_mut(frame)?;
        varlist.link = FrameLink::Expired;
        for var in varlist.vars.iter_mut().skip(1) {
            var.promote();
        }
        debug!(depth = self.frames.len(), "frame dropped");
        Ok(())
    }

    fn run_phases(
        &mut self,
        action: ActionId,
        frame: ContextId,
        eval: &mut dyn Evaluator,
    ) -> CoreResult<Cell> {
        let mut phase = action;
        loop {
            self.heap.varlist_mut(frame)?.phase = Some(phase);
            let details = self.heap.action(phase)?.details.clone();
            match details {
                Details::Specialized { exemplar } => {
                    phase = self.heap.varlist(exemplar)?.phase.ok_or_else(|| {
                        CoreError::bad_construction("specialization exemplar has no phase")
                    })?;
                }
                Details::Interpreted { body } => return eval.eval_body(self, body, frame),
                Details::Native(native) => return native(self, frame),
                Details::Generic(verb) => return self.dispatch_generic(verb, frame),
                Details::Typechecker(types) => {
                    let arg = self.var_at(frame, 1)?;
                    return Ok(Cell::logic(types.contains(arg.kind())));
                }
            }
        }
    }

    /// Answers a question about a frame. Only the action survives the
    /// frame's expiry; everything else is `None` afterwards.
    pub fn reflect_frame(
        &mut self,
        frame: ContextId,
        property: FrameProperty,
    ) -> CoreResult<Option<Cell>> {
        let varlist = self.heap.varlist(frame)?;
        if varlist.kind != ContextKind::Frame {
            return Err(CoreError::IllegalAction {
                verb: "reflect",
                kind: varlist.kind.kind(),
            });
        }
        if property == FrameProperty::Action {
            return Ok(varlist.phase.map(Cell::action));
        }

        let link = varlist.link;
        if link == FrameLink::Expired {
            return Ok(None);
        }
        match property {
            FrameProperty::Label => Ok(varlist.label.map(Cell::word)),
            FrameProperty::Parent => match link {
                FrameLink::Active { depth } if depth > 0 => match self.frames.get(depth - 1) {
                    Some(parent) => Ok(Some(self.context_value(*parent)?)),
                    None => Ok(None),
                },
                _ => Ok(None),
            },
            FrameProperty::Args => {
                let values: Vec<Cell> = varlist
                    .keylist
                    .entries()
                    .filter(|(_, key)| key.class.takes_argument())
                    .filter_map(|(index, _)| varlist.var(index).cloned())
                    .collect();
                Ok(Some(self.block(values)))
            }
            FrameProperty::Action => Ok(None),
        }
    }

    pub fn frame_action(&mut self, frame: ContextId) -> CoreResult<Option<ActionId>> {
        self.reflect_frame(frame, FrameProperty::Action)?
            .map(|cell| cell.as_action())
            .transpose()
    }

    pub fn frame_label(&mut self, frame: ContextId) -> CoreResult<Option<Symbol>> {
        self.reflect_frame(frame, FrameProperty::Label)?
            .map(|cell| cell.as_word())
            .transpose()
    }

    pub fn frame_parent(&mut self, frame: ContextId) -> CoreResult<Option<ContextId>> {
        self.reflect_frame(frame, FrameProperty::Parent)?
            .map(|cell| cell.as_context())
            .transpose()
    }
}
