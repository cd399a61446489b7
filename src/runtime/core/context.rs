use std::rc::Rc;

use crate::{
    runtime::{
        cell::{Cell, CellFlags, Kind, Payload, move_value, slot},
        context::{ContextKind, Key, KeyFlags, Keylist, Varlist},
        core::Core,
        error::{CoreError, CoreResult},
        gc::{ArrayId, ContextId, WeakContext},
    },
    syntax::symbol::Symbol,
};

/// A heap slot holding a copy of `value`.
pub(crate) fn managed(value: &Cell) -> Cell {
    let mut var = slot(CellFlags::MANAGED);
    move_value(&mut var, value);
    var
}

impl Core {
    /// Allocates a varlist and points its archetype at it. `vars[0]` is
    /// overwritten.
    pub(crate) fn alloc_context(
        &mut self,
        kind: ContextKind,
        keylist: Rc<Keylist>,
        vars: Vec<Cell>,
    ) -> CoreResult<ContextId> {
        let id = self.heap.alloc_varlist(Varlist::new(kind, keylist, vars));
        let varlist = self.heap.varlist_mut(id)?;
        let mut archetype: Cell = Cell::raw(kind.kind(), Payload::Context(id));
        archetype.set_flag(CellFlags::MANAGED);
        match varlist.vars.first_mut() {
            Some(first) => *first = archetype,
            None => varlist.vars.push(archetype),
        }
        Ok(id)
    }

    /// Builds a context from `(name, value)` pairs.
    ///
    /// Keys are collected before any slot is written, so the keylist and
    /// varlist are sized once. A repeated name keeps its first position and
    /// takes its last value.
    pub fn make_context(
        &mut self,
        kind: ContextKind,
        pairs: &[(Symbol, Cell)],
    ) -> CoreResult<ContextId> {
        let mut keylist = Keylist::with_capacity(pairs.len());
        let mut vars = Vec::with_capacity(pairs.len() + 1);
        vars.push(Cell::blank());

        for (name, value) in pairs {
            let canon = self.interner.canon(*name);
            match keylist.find(*name, canon, false) {
                Some(index) => move_value(&mut vars[index], value),
                None => {
                    keylist.push(Key::field(*name, canon));
                    vars.push(managed(value));
                }
            }
        }

        self.alloc_context(kind, Rc::new(keylist), vars)
    }

    /// Convenience form of [`Core::make_context`] taking spellings.
    pub fn object_from(&mut self, pairs: &[(&str, Cell)]) -> CoreResult<ContextId> {
        let pairs: Vec<(Symbol, Cell)> = pairs
            .iter()
            .map(|(name, value)| (self.intern(name), value.clone()))
            .collect();
        self.make_context(ContextKind::Object, &pairs)
    }

    /// Empty context with room for `capacity` keys.
    pub fn make_context_sized(
        &mut self,
        kind: ContextKind,
        capacity: usize,
    ) -> CoreResult<ContextId> {
        let mut vars = Vec::with_capacity(capacity + 1);
        vars.push(Cell::blank());
        self.alloc_context(kind, Rc::new(Keylist::with_capacity(capacity)), vars)
    }

    /// Builds a context from a block of `name: value` pairs.
    ///
    /// Consecutive set-words share the value that follows them; a set-word
    /// at the end of the block gets blank. Anything else in key position is
    /// a bad construction.
    pub fn construct(&mut self, kind: ContextKind, spec: ArrayId) -> CoreResult<ContextId> {
        let pairs = self.scan_pairs(spec)?;
        self.make_context(kind, &pairs)
    }

    /// Builds a context that starts out sharing `parent`'s keylist, then
    /// applies `overrides`. New names in the overrides give the child a
    /// private keylist; the parent is never touched.
    pub fn construct_with_parent(
        &mut self,
        parent: ContextId,
        overrides: ArrayId,
    ) -> CoreResult<ContextId> {
        let pairs = self.scan_pairs(overrides)?;

        let source = self.heap.varlist(parent)?;
        if source.kind == ContextKind::Frame {
            return Err(CoreError::bad_construction(
                "a frame cannot be the parent of a new context",
            ));
        }
        let kind = source.kind;
        let keylist = Rc::clone(&source.keylist);
        let mut vars = Vec::with_capacity(source.vars.len());
        vars.push(Cell::blank());
        for var in source.vars.iter().skip(1) {
            let mut copy = slot(CellFlags::MANAGED);
            crate::runtime::cell::move_var(&mut copy, var);
            vars.push(copy);
        }

        let child = self.alloc_context(kind, keylist, vars)?;
        for (name, value) in &pairs {
            self.append(child, *name, value)?;
        }
        Ok(child)
    }

    fn scan_pairs(&self, spec: ArrayId) -> CoreResult<Vec<(Symbol, Cell)>> {
        let cells = self.heap.array(spec)?.cells();
        let mut pending: Vec<Symbol> = Vec::new();
        let mut pairs = Vec::with_capacity(cells.len() / 2);

        for cell in cells {
            if cell.kind() == Kind::SetWord {
                pending.push(cell.as_word()?);
                continue;
            }
            if pending.is_empty() {
                return Err(CoreError::bad_construction(format!(
                    "expected set-word! in key position, found {}",
                    cell.kind()
                )));
            }
            let value = cell.specified().ok_or_else(|| {
                CoreError::bad_construction("construction spec holds a relative value")
            })?;
            for name in pending.drain(..) {
                pairs.push((name, value.clone()));
            }
        }
        for name in pending {
            pairs.push((name, Cell::blank()));
        }
        Ok(pairs)
    }

    pub fn context_kind(&self, context: ContextId) -> CoreResult<ContextKind> {
        Ok(self.heap.varlist(context)?.kind)
    }

    /// The context as a value.
    pub fn context_value(&self, context: ContextId) -> CoreResult<Cell> {
        Ok(self.heap.varlist(context)?.archetype().clone())
    }

    /// Slot index of `name`, hidden keys included. Not finding the name is
    /// not an error.
    pub fn find(
        &self,
        context: ContextId,
        name: Symbol,
        case_sensitive: bool,
    ) -> CoreResult<Option<usize>> {
        let canon = self.interner.canon(name);
        Ok(self
            .heap
            .varlist(context)?
            .keylist
            .find(name, canon, case_sensitive))
    }

    /// Sets a visible existing key, or grows the context by one slot.
    ///
    /// Growing goes through copy-on-write, so contexts that shared the
    /// keylist keep seeing the old key set.
    pub fn append(&mut self, context: ContextId, name: Symbol, value: &Cell) -> CoreResult<usize> {
        let canon = self.interner.canon(name);
        let interner = &self.interner;
        let varlist = self.heap.varlist_mut(context)?;
        if varlist.kind == ContextKind::Frame {
            return Err(CoreError::IllegalAction {
                verb: "append",
                kind: Kind::Frame,
            });
        }

        if let Some(index) = varlist.keylist.find(name, canon, false) {
            if varlist.keylist.key(index).is_some_and(Key::is_hidden) {
                return Err(CoreError::HiddenField {
                    name: interner.try_resolve(name).unwrap_or("?").to_string(),
                });
            }
            let var = &mut varlist.vars[index];
            if var.is_protected() {
                return Err(CoreError::ProtectedField {
                    name: interner.try_resolve(name).unwrap_or("?").to_string(),
                });
            }
            move_value(var, value);
            return Ok(index);
        }

        let index = varlist.keylist_mut().push(Key::field(name, canon));
        varlist.vars.push(managed(value));
        Ok(index)
    }

    /// Writes `name`'s slot, hidden or not. Protected slots refuse.
    pub fn poke(&mut self, context: ContextId, name: Symbol, value: &Cell) -> CoreResult<usize> {
        let index = self
            .find(context, name, false)?
            .ok_or_else(|| self.not_found(name))?;
        self.poke_index(context, index, value)?;
        Ok(index)
    }

    pub fn poke_index(&mut self, context: ContextId, index: usize, value: &Cell) -> CoreResult<()> {
        let interner = &self.interner;
        let varlist = self.heap.varlist_mut(context)?;
        let spelling = varlist.keylist.key(index).map(|key| key.spelling);
        let var = match varlist.vars.get_mut(index) {
            Some(var) if index > 0 => var,
            _ => {
                return Err(CoreError::bad_construction(format!(
                    "slot {index} is out of range"
                )));
            }
        };
        if var.is_protected() {
            return Err(CoreError::ProtectedField {
                name: spelling
                    .and_then(|sym| interner.try_resolve(sym))
                    .unwrap_or("?")
                    .to_string(),
            });
        }
        move_value(var, value);
        Ok(())
    }

    pub fn select(&self, context: ContextId, name: Symbol) -> CoreResult<Option<Cell>> {
        let Some(index) = self.find(context, name, false)? else {
            return Ok(None);
        };
        Ok(self.heap.varlist(context)?.var(index).cloned())
    }

    pub fn var_at(&self, context: ContextId, index: usize) -> CoreResult<Cell> {
        self.heap
            .varlist(context)?
            .var(index)
            .filter(|_| index > 0)
            .cloned()
            .ok_or_else(|| CoreError::bad_construction(format!("slot {index} is out of range")))
    }

    /// Slot count excluding the archetype, hidden keys included.
    pub fn context_len(&self, context: ContextId) -> CoreResult<usize> {
        Ok(self.heap.varlist(context)?.len() - 1)
    }

    pub fn visible_keys(&self, context: ContextId) -> CoreResult<Vec<Symbol>> {
        Ok(self
            .heap
            .varlist(context)?
            .keylist
            .visible()
            .map(|(_, key)| key.spelling)
            .collect())
    }

    pub fn protect(&mut self, context: ContextId, name: Symbol) -> CoreResult<()> {
        self.set_var_flag(context, name, true)
    }

    pub fn unprotect(&mut self, context: ContextId, name: Symbol) -> CoreResult<()> {
        self.set_var_flag(context, name, false)
    }

    fn set_var_flag(&mut self, context: ContextId, name: Symbol, on: bool) -> CoreResult<()> {
        let index = self
            .find(context, name, false)?
            .ok_or_else(|| self.not_found(name))?;
        let var = &mut self.heap.varlist_mut(context)?.vars[index];
        if on {
            var.set_flag(CellFlags::PROTECTED);
        } else {
            var.clear_flag(CellFlags::PROTECTED);
        }
        Ok(())
    }

    /// Hides a key. The keylist is copied first if it is shared.
    pub fn hide(&mut self, context: ContextId, name: Symbol) -> CoreResult<()> {
        let index = self
            .find(context, name, false)?
            .ok_or_else(|| self.not_found(name))?;
        let varlist = self.heap.varlist_mut(context)?;
        if let Some(key) = varlist.keylist_mut().key_mut(index) {
            key.flags.insert(KeyFlags::HIDDEN);
        }
        Ok(())
    }

    pub fn shares_keylist(&self, a: ContextId, b: ContextId) -> CoreResult<bool> {
        Ok(Rc::ptr_eq(
            &self.heap.varlist(a)?.keylist,
            &self.heap.varlist(b)?.keylist,
        ))
    }

    /// Meta context, if set and still alive.
    pub fn meta_of(&self, context: ContextId) -> CoreResult<Option<ContextId>> {
        Ok(self.heap.varlist(context)?.meta.upgrade(&self.heap))
    }

    pub fn set_meta(&mut self, context: ContextId, meta: Option<ContextId>) -> CoreResult<()> {
        self.heap.varlist_mut(context)?.meta = meta.map_or(WeakContext::NONE, WeakContext::new);
        Ok(())
    }

    /// Block of the visible keys as words bound to `context`.
    pub fn words_of(&mut self, context: ContextId) -> CoreResult<ArrayId> {
        let words: Vec<Cell> = self
            .heap
            .varlist(context)?
            .keylist
            .visible()
            .map(|(index, key)| {
                let mut word = Cell::word(key.spelling);
                word.bind_specific(context, index as u32);
                word
            })
            .collect();
        Ok(self.new_array(words))
    }

    pub fn values_of(&mut self, context: ContextId) -> CoreResult<ArrayId> {
        let varlist = self.heap.varlist(context)?;
        let values: Vec<Cell> = varlist
            .keylist
            .visible()
            .filter_map(|(index, _)| varlist.var(index).cloned())
            .collect();
        Ok(self.new_array(values))
    }

    /// Block of `name: value` pairs that [`Core::construct`] accepts back.
    pub fn body_of(&mut self, context: ContextId) -> CoreResult<ArrayId> {
        let varlist = self.heap.varlist(context)?;
        let mut body = Vec::with_capacity(varlist.len() * 2);
        for (index, key) in varlist.keylist.visible() {
            body.push(Cell::set_word(key.spelling));
            if let Some(value) = varlist.var(index) {
                body.push(value.clone());
            }
        }
        Ok(self.new_array(body))
    }
}
