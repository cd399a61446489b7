//! Source-like text for values.
//!
//! Mold output reads back as the same value where the value has a literal
//! form; form output is for display and drops the decoration.

use std::fmt::Write;

use crate::runtime::{
    cell::{Cell, Kind, Mode, Payload},
    context::{ContextKind, ParamClass},
    core::Core,
    error::CoreResult,
    gc::{ActionId, ArrayId, ContextId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Loadable representation.
    Mold,
    /// Display representation.
    Form,
}

/// Series already being rendered further up; meeting one again is a cycle.
#[derive(Default)]
struct Visited {
    contexts: Vec<ContextId>,
    arrays: Vec<ArrayId>,
}

impl Core {
    pub fn render<M: Mode>(&self, cell: &Cell<M>, mode: RenderMode) -> CoreResult<String> {
        let mut out = String::new();
        self.render_into(&mut out, cell, mode, &mut Visited::default(), 0)?;
        Ok(out)
    }

    pub fn mold<M: Mode>(&self, cell: &Cell<M>) -> CoreResult<String> {
        self.render(cell, RenderMode::Mold)
    }

    pub fn form<M: Mode>(&self, cell: &Cell<M>) -> CoreResult<String> {
        self.render(cell, RenderMode::Form)
    }

    pub fn render_context(&self, context: ContextId, mode: RenderMode) -> CoreResult<String> {
        let mut out = String::new();
        self.context_into(&mut out, context, mode, &mut Visited::default(), 0)?;
        Ok(out)
    }

    fn render_into<M: Mode>(
        &self,
        out: &mut String,
        cell: &Cell<M>,
        mode: RenderMode,
        visited: &mut Visited,
        indent: usize,
    ) -> CoreResult<()> {
        let depth = cell.quote_depth();
        if depth > 0 {
            for _ in 0..depth {
                out.push('\'');
            }
            let inner = self.unescaped(cell)?;
            return self.render_into(out, &inner, mode, visited, indent);
        }

        let mold = mode == RenderMode::Mold;
        match (cell.kind(), cell.payload()) {
            (Kind::Nulled, _) => {
                if mold {
                    out.push_str("~null~");
                }
            }
            (Kind::Void, _) => {
                if mold {
                    out.push_str("~void~");
                }
            }
            (Kind::Blank, _) => out.push('_'),
            (_, Payload::Logic(value)) => out.push_str(if *value { "true" } else { "false" }),
            (_, Payload::Integer(value)) => {
                let _ = write!(out, "{value}");
            }
            (_, Payload::Decimal(value)) => {
                if value.is_finite() && value.fract() == 0.0 {
                    let _ = write!(out, "{value:.1}");
                } else {
                    let _ = write!(out, "{value}");
                }
            }
            (_, Payload::Char(value)) => {
                if mold {
                    out.push_str("#\"");
                    escape_into(out, *value);
                    out.push('"');
                } else {
                    out.push(*value);
                }
            }
            (Kind::Tag, Payload::Series { text, .. }) => {
                let _ = write!(out, "<{}>", self.heap.text(*text)?);
            }
            (_, Payload::Series { text, .. }) => {
                let content = self.heap.text(*text)?;
                if mold {
                    out.push('"');
                    for ch in content.chars() {
                        escape_into(out, ch);
                    }
                    out.push('"');
                } else {
                    out.push_str(content);
                }
            }
            (kind, Payload::Word { spelling, .. }) => {
                let name = self.spelling(*spelling);
                match kind {
                    Kind::SetWord => {
                        let _ = write!(out, "{name}:");
                    }
                    Kind::GetWord => {
                        let _ = write!(out, ":{name}");
                    }
                    Kind::Refinement => {
                        let _ = write!(out, "/{name}");
                    }
                    _ => out.push_str(name),
                }
            }
            (kind, Payload::Array { array, .. }) => {
                let (open, close) = match (kind, mold) {
                    (Kind::Group, _) => ("(", ")"),
                    (_, true) => ("[", "]"),
                    (_, false) => ("", ""),
                };
                out.push_str(open);
                if visited.arrays.contains(array) {
                    out.push_str("...");
                } else {
                    visited.arrays.push(*array);
                    let result = self.array_items_into(out, *array, mode, visited, indent);
                    visited.arrays.pop();
                    result?;
                }
                out.push_str(close);
            }
            (_, Payload::Datatype(kind)) => out.push_str(kind.name()),
            (_, Payload::Typeset(types)) => {
                out.push_str("make typeset! [");
                let names: Vec<&str> = types.kinds().map(Kind::name).collect();
                out.push_str(&names.join(" "));
                out.push(']');
            }
            (_, Payload::Action(action)) => self.action_into(out, *action)?,
            (_, Payload::Context(context)) => {
                self.context_into(out, *context, mode, visited, indent)?
            }
            (kind, payload) => {
                let _ = write!(out, "#[{} {:?}]", kind, payload);
            }
        }
        Ok(())
    }

    fn array_items_into(
        &self,
        out: &mut String,
        array: ArrayId,
        mode: RenderMode,
        visited: &mut Visited,
        indent: usize,
    ) -> CoreResult<()> {
        for (i, item) in self.heap.array(array)?.cells().iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.render_into(out, item, mode, visited, indent)?;
        }
        Ok(())
    }

    fn action_into(&self, out: &mut String, action: ActionId) -> CoreResult<()> {
        let paramlist = &self.heap.action(action)?.paramlist;
        out.push_str("#[action! [");
        let mut first = true;
        for (_, key) in paramlist.visible() {
            if key.class == ParamClass::Local {
                continue;
            }
            if !first {
                out.push(' ');
            }
            first = false;
            let name = self.spelling(key.spelling);
            let _ = match key.class {
                ParamClass::HardQuote => write!(out, "'{name}"),
                ParamClass::SoftQuote => write!(out, ":{name}"),
                ParamClass::Refinement => write!(out, "/{name}"),
                ParamClass::Return => write!(out, "{name}:"),
                _ => write!(out, "{name}"),
            };
        }
        out.push_str("]]");
        Ok(())
    }

    fn context_into(
        &self,
        out: &mut String,
        context: ContextId,
        mode: RenderMode,
        visited: &mut Visited,
        indent: usize,
    ) -> CoreResult<()> {
        let mold = mode == RenderMode::Mold;
        let varlist = self.heap.varlist(context)?;
        let header = match varlist.kind {
            ContextKind::Object => "make object! [",
            ContextKind::Module => "make module! [",
            ContextKind::Error => "make error! [",
            ContextKind::Frame => "make frame! [",
        };

        if visited.contexts.contains(&context) {
            if mold {
                let _ = write!(out, "{header}...]");
            } else {
                out.push_str("...");
            }
            return Ok(());
        }

        if mold {
            out.push_str(header);
            if varlist.keylist.visible().next().is_none() {
                out.push(']');
                return Ok(());
            }
            out.push('\n');
        }

        let step = self.config().render_indent;
        let inner = if mold { indent + step } else { indent };
        visited.contexts.push(context);
        let mut result = Ok(());
        for (n, (index, key)) in varlist.keylist.visible().enumerate() {
            if !mold && n > 0 {
                out.push('\n');
            }
            if mold {
                out.extend(std::iter::repeat_n(' ', inner));
            }
            let _ = write!(out, "{}: ", self.spelling(key.spelling));
            if let Some(value) = varlist.var(index) {
                result = self.render_into(out, value, mode, visited, inner);
                if result.is_err() {
                    break;
                }
            }
            if mold {
                out.push('\n');
            }
        }
        visited.contexts.pop();
        result?;

        if mold {
            out.extend(std::iter::repeat_n(' ', indent));
            out.push(']');
        }
        Ok(())
    }
}

/// Escapes one character of a molded string or char literal.
fn escape_into(out: &mut String, ch: char) {
    match ch {
        '"' => out.push_str("^\""),
        '^' => out.push_str("^^"),
        '\n' => out.push_str("^/"),
        '\t' => out.push_str("^-"),
        _ => out.push(ch),
    }
}
