use std::rc::Rc;

use tracing::debug;

use crate::{
    runtime::{
        action::{ActionFlags, Details},
        cell::{Cell, CellFlags, Kind, Payload, copy_masked, slot},
        context::{ContextKind, KeyFlags, Keylist, ParamClass},
        core::Core,
        error::{CoreError, CoreResult},
        gc::{ActionId, ContextId, WeakAction},
    },
    syntax::symbol::Symbol,
};

/// Source bits dropped when an exemplar slot is carried into a new one.
/// MARKED must survive, so it is left out.
const EXEMPLAR_MASK: CellFlags = CellFlags::ENFIXED;

impl Core {
    /// The action a specialization chain bottoms out in, and the exemplar
    /// of `action` if it is itself a specialization.
    pub(crate) fn specialization_base(
        &self,
        action: ActionId,
    ) -> CoreResult<(ActionId, Option<ContextId>)> {
        match self.heap.action(action)?.details {
            Details::Specialized { exemplar } => {
                let base = self.heap.varlist(exemplar)?.phase.ok_or_else(|| {
                    CoreError::bad_construction("specialization exemplar has no phase")
                })?;
                Ok((base, Some(exemplar)))
            }
            _ => Ok((action, None)),
        }
    }

    /// New action with some arguments of `action` fixed.
    ///
    /// `fills` sets parameters (a refinement takes a logic); those keys are
    /// hidden from the new action's callers. Each refinement in `partials`
    /// is switched on without its arguments, which then come from the
    /// caller after the normal arguments, in the order given here.
    /// Specializing a specialization folds into one exemplar over the same
    /// base action.
    pub fn specialize(
        &mut self,
        action: ActionId,
        fills: &[(Symbol, Cell)],
        partials: &[Symbol],
    ) -> CoreResult<ActionId> {
        let (base, prior) = self.specialization_base(action)?;
        let underlying = self.underlying_of(base)?;
        let base_params = Rc::clone(&self.heap.action(base)?.paramlist);
        let mut visible = (*self.heap.action(action)?.paramlist).clone();

        let mut vars = Vec::with_capacity(base_params.len());
        vars.push(Cell::blank());
        match prior {
            Some(exemplar) => {
                for var in self.heap.varlist(exemplar)?.vars.iter().skip(1) {
                    let mut copy = slot(CellFlags::MANAGED);
                    copy_masked(&mut copy, var, EXEMPLAR_MASK);
                    vars.push(copy);
                }
            }
            None => vars.extend((1..base_params.len()).map(|_| slot(CellFlags::MANAGED))),
        }

        for (name, value) in fills {
            let index = self.specializable(&base_params, *name, &vars)?;
            let key = base_params.key(index).ok_or_else(|| self.not_found(*name))?;
            let accepted = match key.class {
                ParamClass::Refinement => value.kind() == Kind::Logic,
                _ => key.types.contains(value.kind()),
            };
            if !accepted {
                return Err(CoreError::ArgumentType {
                    param: self.name(key.spelling),
                    found: value.kind(),
                });
            }
            copy_masked(&mut vars[index], value, CellFlags::NO_COPY);
            vars[index].set_flag(CellFlags::MARKED);
            if let Some(key) = visible.key_mut(index) {
                key.flags.insert(KeyFlags::HIDDEN);
            }
        }

        let mut order = vars
            .iter()
            .filter(|var| !var.has_flag(CellFlags::MARKED))
            .filter(|var| matches!(var.payload, Payload::Integer(_)))
            .count() as i64;
        for name in partials {
            let index = self.specializable(&base_params, *name, &vars)?;
            let is_refinement = base_params
                .key(index)
                .is_some_and(|key| key.class == ParamClass::Refinement);
            if !is_refinement || matches!(vars[index].payload, Payload::Integer(_)) {
                return Err(CoreError::bad_construction(format!(
                    "/{} is not an unused refinement",
                    self.spelling(*name)
                )));
            }
            order += 1;
            copy_masked(&mut vars[index], &Cell::integer(order), CellFlags::NO_COPY);
            if let Some(key) = visible.key_mut(index) {
                key.flags.insert(KeyFlags::HIDDEN);
            }
        }

        let exemplar = self.alloc_context(ContextKind::Frame, base_params, vars)?;
        {
            let frame = self.heap.varlist_mut(exemplar)?;
            frame.phase = Some(base);
            frame.underlying = WeakAction::new(underlying);
        }

        let inherited = self.action_flags(action)?.intersect(ActionFlags::INHERIT);
        let specialized =
            self.make_action(visible, Details::Specialized { exemplar }, inherited)?;
        self.heap.action_mut(specialized)?.underlying = WeakAction::new(underlying);
        debug!(
            filled = fills.len(),
            partial = partials.len(),
            "specialized action"
        );
        Ok(specialized)
    }

    /// Slot of a parameter that may still be specialized.
    fn specializable(
        &self,
        params: &Keylist,
        name: Symbol,
        vars: &[Cell],
    ) -> CoreResult<usize> {
        let canon = self.interner.canon(name);
        let index = params.find(name, canon, false).ok_or_else(|| {
            CoreError::bad_construction(format!("no parameter `{}`", self.spelling(name)))
        })?;
        let class = params.key(index).map(|key| key.class);
        if matches!(class, Some(ParamClass::Local | ParamClass::Return)) {
            return Err(CoreError::bad_construction(format!(
                "`{}` cannot be specialized",
                self.spelling(name)
            )));
        }
        if vars.get(index).is_some_and(|var| var.has_flag(CellFlags::MARKED)) {
            return Err(CoreError::bad_construction(format!(
                "`{}` is already specialized",
                self.spelling(name)
            )));
        }
        Ok(index)
    }
}
