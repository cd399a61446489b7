use crate::runtime::{
    action::Verb,
    cell::{Cell, Kind, Typeset},
    context::ContextKind,
    core::{Core, FrameProperty},
    error::{CoreError, CoreResult},
    gc::{ArrayId, ContextId},
};
use crate::syntax::symbol::Symbol;

impl Core {
    /// Runs `verb` through the handler registered for the kind of the
    /// frame's first argument.
    pub fn dispatch_generic(&mut self, verb: Verb, frame: ContextId) -> CoreResult<Cell> {
        let kind = self.var_at(frame, 1)?.kind();
        let handler = self
            .generics
            .lookup(kind)
            .ok_or(CoreError::IllegalAction {
                verb: verb.name(),
                kind,
            })?;
        handler(self, verb, frame)
    }
}

/// Alternating key/value cells of an `append` block. Keys may be words or
/// set-words; a key left without a value gets blank.
fn append_pairs(core: &Core, block: ArrayId) -> CoreResult<Vec<(Symbol, Cell)>> {
    let cells = core.array_cells(block)?;
    let mut pairs = Vec::with_capacity(cells.len().div_ceil(2));
    for pair in cells.chunks(2) {
        let key = &pair[0];
        if !matches!(key.kind(), Kind::Word | Kind::SetWord) {
            return Err(CoreError::bad_construction(format!(
                "expected word! or set-word! in key position, found {}",
                key.kind()
            )));
        }
        let value = match pair.get(1) {
            Some(value) => value.specified().ok_or_else(|| {
                CoreError::bad_construction("append block holds a relative value")
            })?,
            None => Cell::blank(),
        };
        pairs.push((key.as_word()?, value));
    }
    Ok(pairs)
}

/// Generic verbs on objects, modules, errors and frames.
pub(crate) fn context_generic(core: &mut Core, verb: Verb, frame: ContextId) -> CoreResult<Cell> {
    let target = core.var_at(frame, 1)?;
    let context = target.as_context()?;
    let case_sensitive = core.config().case_sensitive_lookup;

    match verb {
        Verb::Append => {
            let value = core.var_at(frame, 2)?;
            match value.kind() {
                Kind::Block => {
                    let pairs = append_pairs(core, value.as_array()?)?;
                    for (name, value) in &pairs {
                        core.append(context, *name, value)?;
                    }
                }
                // A bare word only adds the key; an existing field is untouched.
                kind if kind.is_any_word() => {
                    let name = value.as_word()?;
                    if core.find(context, name, false)?.is_none() {
                        core.append(context, name, &Cell::blank())?;
                    }
                }
                kind => {
                    return Err(CoreError::ArgumentType {
                        param: "value".to_string(),
                        found: kind,
                    });
                }
            }
            Ok(target)
        }
        Verb::Copy => {
            let deep = core.var_at(frame, 2)?.as_logic().unwrap_or(false);
            let types = if deep {
                Typeset::ANY_SERIES
            } else {
                Typeset::EMPTY
            };
            let copy = core.copy_context(context, types)?;
            core.context_value(copy)
        }
        Verb::Select | Verb::Find => {
            let name = core.var_at(frame, 2)?.as_word()?;
            let found = core.find(context, name, case_sensitive)?;
            match (verb, found) {
                (_, None) => Ok(Cell::nulled()),
                (Verb::Find, Some(_)) => Ok(Cell::logic(true)),
                (_, Some(index)) => core.var_at(context, index),
            }
        }
        Verb::Length => {
            let count = core.visible_keys(context)?.len();
            Ok(Cell::integer(count as i64))
        }
        Verb::Reflect => {
            let property = core.var_at(frame, 2)?.as_word()?;
            let property = core.spelling(property).to_ascii_lowercase();
            let is_frame = core.context_kind(context)? == ContextKind::Frame;
            let answer = match property.as_str() {
                "words" => Some(Cell::block(core.words_of(context)?)),
                "values" => Some(Cell::block(core.values_of(context)?)),
                "body" => Some(Cell::block(core.body_of(context)?)),
                "action" if is_frame => core.reflect_frame(context, FrameProperty::Action)?,
                "parent" if is_frame => core.reflect_frame(context, FrameProperty::Parent)?,
                "label" if is_frame => core.reflect_frame(context, FrameProperty::Label)?,
                _ => {
                    return Err(CoreError::IllegalAction {
                        verb: "reflect",
                        kind: target.kind(),
                    });
                }
            };
            Ok(answer.unwrap_or_else(Cell::nulled))
        }
    }
}
