use crate::{
    runtime::{
        action::GenericTable,
        cell::{Cell, Kind, RelCell, verify_cell_layout},
        config::CoreConfig,
        error::{CoreError, CoreResult},
        gc::{ArrayId, ContextId, GcHandle, GcHeap},
    },
    syntax::{interner::Interner, symbol::Symbol},
};

mod action;
mod binding;
mod context;
mod copy;
mod equal;
mod frame;
mod generic;
mod quoted;
mod render;
mod specialize;

pub use action::ParamSpec;
pub use frame::{FrameBuilder, FrameProperty};
pub use render::RenderMode;

/// Key returned by [`Core::root`]; hand it back to [`Core::unroot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootKey(usize);

/// Owner of the heap, the symbol table and the frame stack.
///
/// Every operation of the value core is a method here. Nothing is collected
/// until [`Core::collect_garbage`] or [`Core::maybe_collect`] is called, so
/// values built between two collection points need no rooting.
pub struct Core {
    pub(crate) heap: GcHeap,
    pub(crate) interner: Interner,
    /// Varlists of running frames, innermost last.
    pub(crate) frames: Vec<ContextId>,
    roots: Vec<Option<Cell>>,
    pub(crate) generics: GenericTable,
    config: CoreConfig,
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

impl Core {
    pub fn new() -> Self {
        Self::with_config(CoreConfig::default())
    }

    /// # Panics
    ///
    /// Panics if cells are not four machine words on this target.
    pub fn with_config(config: CoreConfig) -> Self {
        assert!(
            verify_cell_layout(),
            "cell layout check failed: size {} bytes",
            std::mem::size_of::<Cell>()
        );

        let mut heap = GcHeap::with_threshold(config.effective_gc_threshold());
        heap.set_enabled(config.gc_enabled);

        let mut generics = GenericTable::new();
        for kind in [Kind::Object, Kind::Module, Kind::Error, Kind::Frame] {
            generics.register(kind, generic::context_generic);
        }

        Self {
            heap,
            interner: Interner::new(),
            frames: Vec::new(),
            roots: Vec::new(),
            generics,
            config,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn heap(&self) -> &GcHeap {
        &self.heap
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn generics_mut(&mut self) -> &mut GenericTable {
        &mut self.generics
    }

    pub fn intern(&mut self, spelling: &str) -> Symbol {
        self.interner.intern(spelling)
    }

    pub fn spelling(&self, sym: Symbol) -> &str {
        self.interner.try_resolve(sym).unwrap_or("?")
    }

    pub(crate) fn name(&self, sym: Symbol) -> String {
        self.spelling(sym).to_string()
    }

    pub fn canon(&self, sym: Symbol) -> Symbol {
        self.interner.canon(sym)
    }

    pub fn text(&mut self, content: &str) -> Cell {
        Cell::text(self.heap.alloc_text(content))
    }

    pub fn tag(&mut self, content: &str) -> Cell {
        Cell::tag(self.heap.alloc_text(content))
    }

    pub fn word(&mut self, spelling: &str) -> Cell {
        Cell::word(self.intern(spelling))
    }

    pub fn set_word(&mut self, spelling: &str) -> Cell {
        Cell::set_word(self.intern(spelling))
    }

    pub fn get_word(&mut self, spelling: &str) -> Cell {
        Cell::get_word(self.intern(spelling))
    }

    pub fn refinement(&mut self, spelling: &str) -> Cell {
        Cell::refinement(self.intern(spelling))
    }

    pub fn new_array(&mut self, cells: Vec<Cell>) -> ArrayId {
        self.heap
            .alloc_array(cells.into_iter().map(Cell::into_relative).collect())
    }

    pub fn block(&mut self, cells: Vec<Cell>) -> Cell {
        Cell::block(self.new_array(cells))
    }

    pub fn group(&mut self, cells: Vec<Cell>) -> Cell {
        Cell::group(self.new_array(cells))
    }

    pub fn array_cells(&self, array: ArrayId) -> CoreResult<&[RelCell]> {
        Ok(self.heap.array(array)?.cells())
    }

    /// Content of a text or tag cell.
    pub fn text_of(&self, cell: &Cell) -> CoreResult<&str> {
        self.heap.text(cell.as_text()?)
    }

    /// Keeps `cell` and everything it references alive across collections.
    pub fn root(&mut self, cell: &Cell) -> RootKey {
        let mut rooted = cell.clone();
        rooted.set_flag(crate::runtime::cell::CellFlags::ROOT);
        if let Some(free) = self.roots.iter().position(Option::is_none) {
            self.roots[free] = Some(rooted);
            RootKey(free)
        } else {
            self.roots.push(Some(rooted));
            RootKey(self.roots.len() - 1)
        }
    }

    pub fn unroot(&mut self, key: RootKey) -> Option<Cell> {
        self.roots.get_mut(key.0)?.take()
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    fn root_handles(&self) -> Vec<GcHandle> {
        let mut handles = Vec::new();
        for root in self.roots.iter().flatten() {
            root.push_referents(&mut handles);
        }
        handles.extend(self.frames.iter().map(|frame| frame.handle()));
        handles
    }

    /// Full collection. Roots are the explicit root set and every running
    /// frame.
    pub fn collect_garbage(&mut self) {
        let roots = self.root_handles();
        self.heap.collect(&roots);
    }

    /// Collects only when the allocation threshold was reached.
    pub fn maybe_collect(&mut self) -> bool {
        if self.heap.should_collect() {
            self.collect_garbage();
            true
        } else {
            false
        }
    }

    pub(crate) fn not_found(&self, sym: Symbol) -> CoreError {
        CoreError::NotBound {
            name: self.name(sym),
        }
    }
}

#[cfg(test)]
mod action_test;
#[cfg(test)]
mod binding_test;
#[cfg(test)]
mod context_test;
#[cfg(test)]
mod quoted_test;
