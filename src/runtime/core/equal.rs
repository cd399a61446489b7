use crate::runtime::{
    cell::{Cell, Mode, Payload},
    core::Core,
    error::CoreResult,
    gc::{ContextId, GcHandle},
};

/// Series positions being compared further up the stack; meeting one again
/// means the structures recurse the same way at this point. Contexts sit at
/// position 0.
type Active = Vec<((GcHandle, u32), (GcHandle, u32))>;

impl Core {
    /// Structural equality of two contexts.
    ///
    /// Keys are walked in declaration order, skipping hidden ones on either
    /// side; names and values compare case-insensitively. Two contexts with
    /// the same fields declared in a different order are not equal.
    pub fn equal_contexts(&self, a: ContextId, b: ContextId) -> CoreResult<bool> {
        self.equal_contexts_inner(a, b, false, &mut Active::new())
    }

    /// Value equality; `case_sensitive` applies to spellings, text and chars.
    pub fn values_equal<M: Mode, N: Mode>(
        &self,
        a: &Cell<M>,
        b: &Cell<N>,
        case_sensitive: bool,
    ) -> CoreResult<bool> {
        self.values_equal_inner(a, b, case_sensitive, &mut Active::new())
    }

    fn equal_contexts_inner(
        &self,
        a: ContextId,
        b: ContextId,
        case_sensitive: bool,
        active: &mut Active,
    ) -> CoreResult<bool> {
        let pair = ((a.handle(), 0), (b.handle(), 0));
        if a == b || active.contains(&pair) {
            return Ok(true);
        }
        let left = self.heap.varlist(a)?;
        let right = self.heap.varlist(b)?;
        if left.kind != right.kind {
            return Ok(false);
        }

        active.push(pair);
        let (keys_a, keys_b) = (&left.keylist, &right.keylist);
        let (mut i, mut j) = (1, 1);
        let mut equal = true;
        loop {
            while keys_a.key(i).is_some_and(|key| key.is_hidden()) {
                i += 1;
            }
            while keys_b.key(j).is_some_and(|key| key.is_hidden()) {
                j += 1;
            }
            let (Some(key_a), Some(key_b)) = (keys_a.key(i), keys_b.key(j)) else {
                break;
            };

            let same_name = if case_sensitive {
                key_a.spelling == key_b.spelling
            } else {
                key_a.canon == key_b.canon
            };
            if !same_name {
                equal = false;
                break;
            }
            let same_value = match (left.var(i), right.var(j)) {
                (Some(x), Some(y)) => self.values_equal_inner(x, y, case_sensitive, active),
                _ => Ok(false),
            };
            match same_value {
                Ok(true) => {}
                Ok(false) => {
                    equal = false;
                    break;
                }
                Err(err) => {
                    active.pop();
                    return Err(err);
                }
            }
            i += 1;
            j += 1;
        }
        active.pop();

        // Whatever is left on the longer side must be hidden, and the skip
        // loops above already stepped over hidden keys.
        Ok(equal && i >= keys_a.len() && j >= keys_b.len())
    }

    fn values_equal_inner<M: Mode, N: Mode>(
        &self,
        a: &Cell<M>,
        b: &Cell<N>,
        case_sensitive: bool,
        active: &mut Active,
    ) -> CoreResult<bool> {
        if a.quote_depth() != b.quote_depth() {
            return Ok(false);
        }
        if a.quote_depth() > 0 {
            let a = self.unescaped(a)?;
            let b = self.unescaped(b)?;
            return self.values_equal_inner(&a, &b, case_sensitive, active);
        }
        if a.kind() != b.kind() {
            return Ok(false);
        }

        match (a.payload(), b.payload()) {
            (Payload::None, Payload::None) => Ok(true),
            (Payload::Logic(x), Payload::Logic(y)) => Ok(x == y),
            (Payload::Integer(x), Payload::Integer(y)) => Ok(x == y),
            (Payload::Decimal(x), Payload::Decimal(y)) => Ok(x == y),
            (Payload::Char(x), Payload::Char(y)) => Ok(if case_sensitive {
                x == y
            } else {
                x.to_lowercase().eq(y.to_lowercase())
            }),
            (
                Payload::Series { text: x, index: ix },
                Payload::Series { text: y, index: iy },
            ) => {
                if x == y && ix == iy {
                    return Ok(true);
                }
                let x = self.heap.text(*x)?.chars().skip(*ix as usize);
                let y = self.heap.text(*y)?.chars().skip(*iy as usize);
                Ok(if case_sensitive {
                    x.eq(y)
                } else {
                    x.flat_map(char::to_lowercase)
                        .eq(y.flat_map(char::to_lowercase))
                })
            }
            (Payload::Word { spelling: x, .. }, Payload::Word { spelling: y, .. }) => {
                Ok(if case_sensitive {
                    x == y
                } else {
                    self.interner.same_canon(*x, *y)
                })
            }
            (
                Payload::Array { array: x, index: ix },
                Payload::Array { array: y, index: iy },
            ) => {
                let pair = ((x.handle(), *ix), (y.handle(), *iy));
                if (x == y && ix == iy) || active.contains(&pair) {
                    return Ok(true);
                }
                // A position past the tail reads as an empty series.
                let left = self.heap.array(*x)?.cells();
                let right = self.heap.array(*y)?.cells();
                let left = left.get(*ix as usize..).unwrap_or(&[]);
                let right = right.get(*iy as usize..).unwrap_or(&[]);
                if left.len() != right.len() {
                    return Ok(false);
                }
                active.push(pair);
                let mut result = Ok(true);
                for (p, q) in left.iter().zip(right) {
                    match self.values_equal_inner(p, q, case_sensitive, active) {
                        Ok(true) => continue,
                        other => {
                            result = other;
                            break;
                        }
                    }
                }
                active.pop();
                result
            }
            (Payload::Datatype(x), Payload::Datatype(y)) => Ok(x == y),
            (Payload::Typeset(x), Payload::Typeset(y)) => Ok(x == y),
            (Payload::Action(x), Payload::Action(y)) => Ok(x == y),
            (Payload::Context(x), Payload::Context(y)) => {
                self.equal_contexts_inner(*x, *y, case_sensitive, active)
            }
            _ => Ok(false),
        }
    }
}
