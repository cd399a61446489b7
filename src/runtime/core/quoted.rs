//! Quote levels on top of any cell.
//!
//! Up to [`MAX_INLINE_DEPTH`] levels are a counter in the header. Past that
//! the cell's tag becomes `Quoted` and its payload points at one
//! indirection cell holding the unquoted value, next to the full depth.
//! Depth changes above the limit only touch that counter. The indirection
//! is never written after creation; once a cell drops back to inline form
//! it no longer references it and the collector reclaims it.
//!
//! The outer cell's binding is authoritative. For bindable values it is the
//! binding of the wrapped value; otherwise it is always `Unbound`.

use tracing::debug;

use crate::runtime::{
    cell::{Binding, Cell, CellFlags, Kind, MAX_INLINE_DEPTH, Mode, Payload, RelCell},
    core::Core,
    error::{CoreError, CoreResult},
};

impl Core {
    /// Adds `depth` quote levels to `cell`.
    pub fn quotify<M: Mode>(&mut self, cell: &mut Cell<M>, depth: u32) -> CoreResult<()> {
        if depth == 0 {
            return Ok(());
        }

        if cell.header.kind == Kind::Quoted {
            if let Payload::Quoted { depth: stored, .. } = &mut cell.payload {
                let current = *stored;
                *stored = current.checked_add(depth).ok_or_else(|| quote_overflow(current))?;
                return Ok(());
            }
        }

        let lit = u32::from(cell.header.lit);
        let total = lit.checked_add(depth).ok_or_else(|| quote_overflow(lit))?;
        if total <= MAX_INLINE_DEPTH {
            cell.header.lit = total as u8;
            return Ok(());
        }

        let mut inner: RelCell = cell.recast();
        inner.header.lit = 0;
        inner.header.flags = CellFlags::MANAGED | CellFlags::PROTECTED;
        let bindable = inner.heart().is_bindable();
        let singular = self.heap.alloc_singular(inner);
        debug!(depth = total, "quote depth exceeds header; allocated indirection");

        cell.header.kind = Kind::Quoted;
        cell.header.lit = 0;
        cell.payload = Payload::Quoted {
            cell: singular,
            depth: total,
        };
        if !bindable {
            cell.extra = Binding::Unbound;
        }
        Ok(())
    }

    /// Removes `depth` quote levels from `cell`.
    pub fn unquotify<M: Mode>(&self, cell: &mut Cell<M>, depth: u32) -> CoreResult<()> {
        if depth == 0 {
            return Ok(());
        }

        if let (Kind::Quoted, Payload::Quoted { cell: singular, depth: stored }) =
            (cell.header.kind, cell.payload)
        {
            if depth > stored {
                return Err(CoreError::QuoteUnderflow {
                    depth: stored,
                    requested: depth,
                });
            }
            let remaining = stored - depth;
            if remaining > MAX_INLINE_DEPTH {
                cell.payload = Payload::Quoted {
                    cell: singular,
                    depth: remaining,
                };
                return Ok(());
            }

            let inner = self.heap.singular(singular)?;
            cell.header.kind = inner.header.kind;
            cell.header.lit = remaining as u8;
            cell.payload = inner.payload;
            if !cell.header.kind.is_bindable() {
                cell.extra = Binding::Unbound;
            }
            return self.restore_word_index(cell);
        }

        let lit = u32::from(cell.header.lit);
        if depth > lit {
            return Err(CoreError::QuoteUnderflow {
                depth: lit,
                requested: depth,
            });
        }
        cell.header.lit = (lit - depth) as u8;
        Ok(())
    }

    /// Strips every quote level and returns how many there were.
    pub fn dequotify<M: Mode>(&self, cell: &mut Cell<M>) -> CoreResult<u32> {
        let depth = cell.quote_depth();
        self.unquotify(cell, depth)?;
        Ok(depth)
    }

    pub fn quoted_depth<M: Mode>(&self, cell: &Cell<M>) -> u32 {
        cell.quote_depth()
    }

    /// The value with all quote levels removed, bound as the outer cell is.
    pub fn unescaped<M: Mode>(&self, cell: &Cell<M>) -> CoreResult<Cell<M>> {
        let mut copy = cell.clone();
        self.dequotify(&mut copy)?;
        Ok(copy)
    }

    /// Kind of the value under all quote levels.
    pub fn unquoted_kind<M: Mode>(&self, cell: &Cell<M>) -> CoreResult<Kind> {
        match (cell.header.kind, cell.payload) {
            (Kind::Quoted, Payload::Quoted { cell: singular, .. }) => {
                Ok(self.heap.singular(singular)?.header.kind)
            }
            (kind, _) => Ok(kind),
        }
    }

    /// The indirection holds the word as it was when first quoted deep, so
    /// its slot index is looked up again against the outer binding.
    fn restore_word_index<M: Mode>(&self, cell: &mut Cell<M>) -> CoreResult<()> {
        let binding = cell.extra;
        let Payload::Word { spelling, index } = &mut cell.payload else {
            return Ok(());
        };
        let canon = self.interner.canon(*spelling);
        let found = match binding {
            Binding::Specific(context) => {
                self.heap
                    .varlist(context)?
                    .keylist
                    .find(*spelling, canon, false)
            }
            Binding::Relative(action) => {
                self.heap
                    .action(action)?
                    .paramlist
                    .find(*spelling, canon, false)
            }
            Binding::Unbound => None,
        };
        *index = found.unwrap_or(0) as u32;
        Ok(())
    }
}

fn quote_overflow(depth: u32) -> CoreError {
    CoreError::bad_construction(format!("cannot quote past depth {depth}"))
}
