use std::rc::Rc;

use tracing::debug;

use crate::{
    runtime::{
        action::{ActionData, ActionFlags, Details, NativeFn, Verb},
        cell::{Cell, CellFlags, Kind, Payload, RelCell, Typeset},
        context::{Key, KeyFlags, Keylist, ParamClass},
        core::Core,
        error::{CoreError, CoreResult},
        gc::{ActionId, ArrayId, ContextId, WeakAction, WeakContext},
    },
    syntax::symbol::Symbol,
};

/// One parameter as declared, before it becomes a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: Symbol,
    pub class: ParamClass,
    pub types: Typeset,
    pub flags: KeyFlags,
}

impl ParamSpec {
    /// Accepts any value; refinements accept a logic.
    pub fn new(name: Symbol, class: ParamClass) -> Self {
        let types = match class {
            ParamClass::Refinement => Typeset::EMPTY.with(Kind::Logic),
            _ => Typeset::ANY_VALUE,
        };
        ParamSpec {
            name,
            class,
            types,
            flags: KeyFlags::NONE,
        }
    }

    pub fn typed(mut self, types: Typeset) -> Self {
        self.types = types;
        self
    }

    pub fn flagged(mut self, flags: KeyFlags) -> Self {
        self.flags.insert(flags);
        self
    }
}

/// Cached flags as implied by a parameter list.
///
/// Only the first argument-taking parameter ahead of any refinement counts
/// for the "first argument" flags.
pub(crate) fn compute_flags(paramlist: &Keylist) -> ActionFlags {
    let mut flags = ActionFlags::NONE;
    let mut first_seen = false;
    for (_, key) in paramlist.visible() {
        match key.class {
            ParamClass::Return => {
                flags.insert(ActionFlags::HAS_RETURN);
                if key.types.is_empty() {
                    flags.insert(ActionFlags::IS_INVISIBLE);
                }
                if key.flags.contains(KeyFlags::REQUOTE) {
                    flags.insert(ActionFlags::RETURN_REQUOTES);
                }
            }
            ParamClass::Refinement => first_seen = true,
            ParamClass::Local => {}
            class if !first_seen => {
                first_seen = true;
                if class.is_quoting() {
                    flags.insert(ActionFlags::QUOTES_FIRST);
                }
                if key.flags.contains(KeyFlags::SKIPPABLE) {
                    flags.insert(ActionFlags::SKIPPABLE_FIRST);
                }
            }
            _ => {}
        }
    }
    flags
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SpecMode {
    Params,
    Locals,
}

impl Core {
    /// Turns declared parameters into a keylist. Names must be unique
    /// ignoring case.
    pub fn make_paramlist(&self, params: &[ParamSpec]) -> CoreResult<Keylist> {
        let mut keylist = Keylist::with_capacity(params.len());
        for param in params {
            let canon = self.interner.canon(param.name);
            if keylist.find(param.name, canon, false).is_some() {
                return Err(CoreError::bad_construction(format!(
                    "duplicate parameter `{}`",
                    self.spelling(param.name)
                )));
            }
            keylist.push(Key {
                spelling: param.name,
                canon,
                class: param.class,
                types: param.types,
                flags: param.flags,
            });
        }
        Ok(keylist)
    }

    /// Allocates an action. Cached flags are recomputed from the paramlist;
    /// `extra` may only add the flags that are not derived from it.
    pub fn make_action(
        &mut self,
        paramlist: Keylist,
        details: Details,
        extra: ActionFlags,
    ) -> CoreResult<ActionId> {
        self.make_action_shared(Rc::new(paramlist), details, extra)
    }

    pub(crate) fn make_action_shared(
        &mut self,
        paramlist: Rc<Keylist>,
        details: Details,
        extra: ActionFlags,
    ) -> CoreResult<ActionId> {
        let mut flags = extra.without(ActionFlags::CACHED).union(compute_flags(&paramlist));
        if matches!(details, Details::Native(_)) {
            flags.insert(ActionFlags::IS_NATIVE);
        }

        let id = self.heap.alloc_action(ActionData {
            archetype: Cell::blank(),
            paramlist,
            details,
            flags,
            meta: WeakContext::NONE,
            underlying: WeakAction::NONE,
        });
        let data = self.heap.action_mut(id)?;
        let mut archetype = Cell::action(id);
        archetype.set_flag(CellFlags::MANAGED);
        data.archetype = archetype;
        data.underlying = WeakAction::new(id);
        Ok(id)
    }

    pub fn make_native(&mut self, params: &[ParamSpec], native: NativeFn) -> CoreResult<ActionId> {
        let paramlist = self.make_paramlist(params)?;
        self.make_action(paramlist, Details::Native(native), ActionFlags::NONE)
    }

    /// Action that dispatches `verb` on the kind of its first argument.
    pub fn make_generic(&mut self, verb: Verb) -> CoreResult<ActionId> {
        let params: Vec<ParamSpec> = verb
            .params()
            .iter()
            .map(|(name, class)| ParamSpec::new(self.interner.intern(name), *class))
            .collect();
        let paramlist = self.make_paramlist(&params)?;
        self.make_action(paramlist, Details::Generic(verb), ActionFlags::NONE)
    }

    /// One-argument action answering whether its argument is in `types`.
    pub fn make_typechecker(&mut self, types: Typeset) -> CoreResult<ActionId> {
        let value = self.interner.intern("value");
        let paramlist = self.make_paramlist(&[ParamSpec::new(value, ParamClass::Normal)
            .typed(Typeset::ANY_VALUE.with(Kind::Nulled))])?;
        self.make_action(paramlist, Details::Typechecker(types), ActionFlags::NONE)
    }

    /// Makes an action from a spec block and body, or a fresh identity for
    /// an existing action.
    ///
    /// A body is deep-copied and relativized to the new action before it is
    /// returned; the caller's block is left as it was.
    pub fn make_action_from(&mut self, source: &Cell, body: Option<&Cell>) -> CoreResult<ActionId> {
        match source.kind() {
            Kind::Action => {
                let original = self.heap.action(source.as_action()?)?;
                let paramlist = Rc::clone(&original.paramlist);
                let details = original.details.clone();
                let extra = original.flags;
                let underlying = original.underlying;
                let id = self.make_action_shared(paramlist, details, extra)?;
                self.heap.action_mut(id)?.underlying = underlying;
                Ok(id)
            }
            Kind::Block => {
                let params = self.parse_spec(source.as_array()?)?;
                let body = match body {
                    Some(body) if body.kind() == Kind::Block => body.as_array()?,
                    _ => {
                        return Err(CoreError::bad_construction(
                            "an action made from a spec block needs a body block",
                        ));
                    }
                };
                let paramlist = self.make_paramlist(&params)?;
                let copy = self.copy_array(body, Typeset::ANY_ARRAY)?;
                let id = self.make_action(
                    paramlist,
                    Details::Interpreted { body: copy },
                    ActionFlags::NONE,
                )?;
                self.relativize(copy, id)?;
                debug!(params = params.len(), "made interpreted action");
                Ok(id)
            }
            kind => Err(CoreError::bad_construction(format!(
                "cannot make an action from {kind}"
            ))),
        }
    }

    /// Reads a parameter spec block.
    ///
    /// Words are normal parameters, `'word` hard quotes, `:word` soft
    /// quotes, `/word` a refinement and `return:` the return slot. After
    /// `<local>` words are locals. A block right after a parameter lists the
    /// kinds it accepts and may hold `<opt>`, `<skip>`, `<end>` and
    /// `<requote>`. Text is documentation.
    pub fn parse_spec(&self, spec: ArrayId) -> CoreResult<Vec<ParamSpec>> {
        let cells = self.heap.array(spec)?.cells();
        let mut params: Vec<ParamSpec> = Vec::new();
        let mut mode = SpecMode::Params;

        for cell in cells {
            let depth = cell.quote_depth();
            if depth > 0 {
                let inner = self.unescaped(cell)?;
                if depth != 1 || inner.kind() != Kind::Word || mode == SpecMode::Locals {
                    return Err(self.bad_spec_item(cell)?);
                }
                params.push(ParamSpec::new(inner.as_word()?, ParamClass::HardQuote));
                continue;
            }

            match cell.kind() {
                Kind::Text => {}
                Kind::Tag => match self.heap.text(cell.as_text()?)? {
                    "local" => mode = SpecMode::Locals,
                    _ => return Err(self.bad_spec_item(cell)?),
                },
                Kind::Word => {
                    let class = match mode {
                        SpecMode::Params => ParamClass::Normal,
                        SpecMode::Locals => ParamClass::Local,
                    };
                    params.push(ParamSpec::new(cell.as_word()?, class));
                }
                Kind::GetWord if mode == SpecMode::Params => {
                    params.push(ParamSpec::new(cell.as_word()?, ParamClass::SoftQuote));
                }
                Kind::Refinement => {
                    mode = SpecMode::Params;
                    params.push(ParamSpec::new(cell.as_word()?, ParamClass::Refinement));
                }
                Kind::SetWord
                    if cell
                        .as_word()
                        .is_ok_and(|name| self.spelling(name).eq_ignore_ascii_case("return")) =>
                {
                    params.push(ParamSpec::new(cell.as_word()?, ParamClass::Return));
                }
                Kind::Block => {
                    let Some(last) = params.last_mut() else {
                        return Err(CoreError::bad_construction(
                            "type block before any parameter",
                        ));
                    };
                    let (types, flags) = self.parse_type_block(cell.as_array()?)?;
                    last.types = types;
                    last.flags.insert(flags);
                }
                _ => return Err(self.bad_spec_item(cell)?),
            }
        }
        Ok(params)
    }

    fn parse_type_block(&self, block: ArrayId) -> CoreResult<(Typeset, KeyFlags)> {
        let mut types = Typeset::EMPTY;
        let mut flags = KeyFlags::NONE;
        for cell in self.heap.array(block)?.cells() {
            match (cell.kind(), cell.payload()) {
                (Kind::Datatype, Payload::Datatype(kind)) => types = types.with(*kind),
                (Kind::Word, Payload::Word { spelling, .. }) => {
                    let kind = Kind::from_name(self.spelling(*spelling))
                        .ok_or_else(|| CoreError::bad_construction(format!(
                            "`{}` is not a datatype",
                            self.spelling(*spelling)
                        )))?;
                    types = types.with(kind);
                }
                (Kind::Tag, Payload::Series { text, .. }) => match self.heap.text(*text)? {
                    "opt" => types = types.with(Kind::Nulled),
                    "skip" => flags.insert(KeyFlags::SKIPPABLE),
                    "end" => flags.insert(KeyFlags::ENDABLE),
                    "requote" => flags.insert(KeyFlags::REQUOTE),
                    other => {
                        return Err(CoreError::bad_construction(format!(
                            "unknown parameter tag <{other}>"
                        )));
                    }
                },
                (Kind::Text, _) => {}
                _ => return Err(self.bad_spec_item(cell)?),
            }
        }
        Ok((types, flags))
    }

    fn bad_spec_item(&self, cell: &RelCell) -> CoreResult<CoreError> {
        Ok(CoreError::bad_construction(format!(
            "unexpected {} in parameter spec",
            self.mold(cell)?
        )))
    }

    pub fn action_flags(&self, action: ActionId) -> CoreResult<ActionFlags> {
        Ok(self.heap.action(action)?.flags)
    }

    pub fn is_invisible(&self, action: ActionId) -> CoreResult<bool> {
        Ok(self.action_flags(action)?.contains(ActionFlags::IS_INVISIBLE))
    }

    pub fn quotes_first(&self, action: ActionId) -> CoreResult<bool> {
        Ok(self.action_flags(action)?.contains(ActionFlags::QUOTES_FIRST))
    }

    pub fn skippable_first(&self, action: ActionId) -> CoreResult<bool> {
        Ok(self.action_flags(action)?.contains(ActionFlags::SKIPPABLE_FIRST))
    }

    pub fn requotes_return(&self, action: ActionId) -> CoreResult<bool> {
        Ok(self.action_flags(action)?.contains(ActionFlags::RETURN_REQUOTES))
    }

    pub fn defers_lookback(&self, action: ActionId) -> CoreResult<bool> {
        Ok(self.action_flags(action)?.contains(ActionFlags::DEFERS_LOOKBACK))
    }

    /// Parameters callers can see, in declaration order.
    pub fn params_of(&self, action: ActionId) -> CoreResult<Vec<Key>> {
        Ok(self
            .heap
            .action(action)?
            .paramlist
            .visible()
            .map(|(_, key)| key.clone())
            .collect())
    }

    pub fn action_archetype(&self, action: ActionId) -> CoreResult<Cell> {
        Ok(self.heap.action(action)?.archetype.clone())
    }

    pub fn action_meta(&self, action: ActionId) -> CoreResult<Option<ContextId>> {
        Ok(self.heap.action(action)?.meta.upgrade(&self.heap))
    }

    pub fn set_action_meta(&mut self, action: ActionId, meta: Option<ContextId>) -> CoreResult<()> {
        self.heap.action_mut(action)?.meta = meta.map_or(WeakContext::NONE, WeakContext::new);
        Ok(())
    }

    /// Action whose paramlist frames of `action` are built on.
    pub fn underlying_of(&self, action: ActionId) -> CoreResult<ActionId> {
        let data = self.heap.action(action)?;
        Ok(data.underlying.raw().unwrap_or(action))
    }
}
