use tracing::debug;

use crate::runtime::{
    action::ActionData,
    cell::RelCell,
    config::{DEFAULT_GC_THRESHOLD, MIN_GC_THRESHOLD},
    context::Varlist,
    error::{CoreError, CoreResult},
    gc::{
        ActionId, ArrayId, ContextId, GcHandle, SingularId, TextId,
        heap_entry::HeapEntry,
        heap_object::{ArraySeries, HeapObject},
        telemetry::{GcTelemetry, ObjectKind},
    },
};

/// Stop-the-world mark-and-sweep heap for arrays, strings, indirection
/// cells, varlists and actions.
///
/// Collection never happens on its own: the owner decides when a cooperative
/// point has been reached and passes the root set to [`GcHeap::collect`].
pub struct GcHeap {
    entries: Vec<Option<HeapEntry>>,
    generations: Vec<u32>,
    free_list: Vec<u32>,
    allocation_count: usize,
    gc_threshold: usize,
    gc_enabled: bool,
    total_collections: usize,
    total_allocations: usize,
    telemetry: GcTelemetry,
}

impl Default for GcHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl GcHeap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            allocation_count: 0,
            gc_threshold: DEFAULT_GC_THRESHOLD,
            gc_enabled: true,
            total_collections: 0,
            total_allocations: 0,
            telemetry: GcTelemetry::new(),
        }
    }

    /// Creates a heap with a custom threshold.
    ///
    /// Unlike [`Self::set_threshold`], this does not clamp to `MIN_GC_THRESHOLD`.
    pub fn with_threshold(threshold: usize) -> Self {
        let mut heap = Self::new();
        heap.gc_threshold = threshold;
        heap
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.gc_enabled = enabled
    }

    /// Values below `MIN_GC_THRESHOLD` are clamped upward.
    pub fn set_threshold(&mut self, threshold: usize) {
        self.gc_threshold = threshold.max(MIN_GC_THRESHOLD)
    }

    pub fn threshold(&self) -> usize {
        self.gc_threshold
    }

    /// Returns `true` when GC is enabled and the threshold was reached.
    pub fn should_collect(&self) -> bool {
        self.gc_enabled && self.allocation_count >= self.gc_threshold
    }

    /// Allocates a new heap object and returns a handle to it.
    ///
    /// Freed slots are reused through the free-list; the reused slot's
    /// generation differs from any handle issued for its previous occupant.
    pub fn alloc(&mut self, object: HeapObject) -> GcHandle {
        self.allocation_count += 1;
        self.total_allocations += 1;
        self.telemetry
            .record_alloc(ObjectKind::of(&object), object.shallow_size_bytes());

        let entry = HeapEntry::new(object);
        if let Some(index) = self.free_list.pop() {
            self.entries[index as usize] = Some(entry);
            GcHandle {
                index,
                generation: self.generations[index as usize],
            }
        } else {
            let index = self.entries.len() as u32;
            self.entries.push(Some(entry));
            self.generations.push(0);
            GcHandle {
                index,
                generation: 0,
            }
        }
    }

    pub fn alloc_array(&mut self, cells: Vec<RelCell>) -> ArrayId {
        ArrayId(self.alloc(HeapObject::Array(ArraySeries::new(cells))))
    }

    pub fn alloc_text(&mut self, text: impl Into<String>) -> TextId {
        TextId(self.alloc(HeapObject::Text(text.into())))
    }

    pub fn alloc_singular(&mut self, cell: RelCell) -> SingularId {
        SingularId(self.alloc(HeapObject::Singular(cell)))
    }

    pub fn alloc_varlist(&mut self, varlist: Varlist) -> ContextId {
        ContextId(self.alloc(HeapObject::Varlist(varlist)))
    }

    pub fn alloc_action(&mut self, action: ActionData) -> ActionId {
        ActionId(self.alloc(HeapObject::Action(action)))
    }

    /// Whether `handle` still names the object it was issued for.
    pub fn is_live(&self, handle: GcHandle) -> bool {
        let index = handle.index as usize;
        self.generations.get(index) == Some(&handle.generation)
            && matches!(self.entries.get(index), Some(Some(_)))
    }

    /// Returns a live object by handle, or `Inaccessible` for a stale one.
    pub fn get(&self, handle: GcHandle) -> CoreResult<&HeapObject> {
        if !self.is_live(handle) {
            return Err(stale("object", handle));
        }
        match &self.entries[handle.index as usize] {
            Some(entry) => Ok(&entry.object),
            None => Err(stale("object", handle)),
        }
    }

    pub fn get_mut(&mut self, handle: GcHandle) -> CoreResult<&mut HeapObject> {
        if !self.is_live(handle) {
            return Err(stale("object", handle));
        }
        match &mut self.entries[handle.index as usize] {
            Some(entry) => Ok(&mut entry.object),
            None => Err(stale("object", handle)),
        }
    }

    pub fn array(&self, id: ArrayId) -> CoreResult<&ArraySeries> {
        match self.get(id.0) {
            Ok(HeapObject::Array(array)) => Ok(array),
            _ => Err(stale("array", id.0)),
        }
    }

    pub fn array_mut(&mut self, id: ArrayId) -> CoreResult<&mut ArraySeries> {
        match self.get_mut(id.0) {
            Ok(HeapObject::Array(array)) => Ok(array),
            _ => Err(stale("array", id.0)),
        }
    }

    pub fn text(&self, id: TextId) -> CoreResult<&str> {
        match self.get(id.0) {
            Ok(HeapObject::Text(text)) => Ok(text),
            _ => Err(stale("text", id.0)),
        }
    }

    pub fn text_mut(&mut self, id: TextId) -> CoreResult<&mut String> {
        match self.get_mut(id.0) {
            Ok(HeapObject::Text(text)) => Ok(text),
            _ => Err(stale("text", id.0)),
        }
    }

    pub fn singular(&self, id: SingularId) -> CoreResult<&RelCell> {
        match self.get(id.0) {
            Ok(HeapObject::Singular(cell)) => Ok(cell),
            _ => Err(stale("indirection cell", id.0)),
        }
    }

    pub fn varlist(&self, id: ContextId) -> CoreResult<&Varlist> {
        match self.get(id.0) {
            Ok(HeapObject::Varlist(varlist)) => Ok(varlist),
            _ => Err(stale("context", id.0)),
        }
    }

    pub fn varlist_mut(&mut self, id: ContextId) -> CoreResult<&mut Varlist> {
        match self.get_mut(id.0) {
            Ok(HeapObject::Varlist(varlist)) => Ok(varlist),
            _ => Err(stale("context", id.0)),
        }
    }

    pub fn action(&self, id: ActionId) -> CoreResult<&ActionData> {
        match self.get(id.0) {
            Ok(HeapObject::Action(action)) => Ok(action),
            _ => Err(stale("action", id.0)),
        }
    }

    pub fn action_mut(&mut self, id: ActionId) -> CoreResult<&mut ActionData> {
        match self.get_mut(id.0) {
            Ok(HeapObject::Action(action)) => Ok(action),
            _ => Err(stale("action", id.0)),
        }
    }

    /// Returns the number of currently live heap entries.
    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    pub fn total_allocations(&self) -> usize {
        self.total_allocations
    }

    pub fn total_collections(&self) -> usize {
        self.total_collections
    }

    pub fn telemetry(&self) -> &GcTelemetry {
        &self.telemetry
    }

    /// Runs a full mark-and-sweep collection from `roots`.
    ///
    /// Only owning edges are traced (see [`HeapObject::push_children`]), so
    /// an object reachable solely through meta or underlying links is
    /// reclaimed and those links start answering `None`.
    pub fn collect(&mut self, roots: &[GcHandle]) {
        self.telemetry.begin_cycle(roots.len());

        let mut worklist: Vec<GcHandle> = Vec::with_capacity(roots.len().max(16));
        worklist.extend_from_slice(roots);
        while let Some(handle) = worklist.pop() {
            self.mark_handle(handle, &mut worklist);
            self.telemetry.note_worklist(worklist.len());
        }

        let live_before = self.live_count();
        self.sweep();
        let live_after = self.live_count();
        let collected = live_before.saturating_sub(live_after);

        self.total_collections += 1;
        self.allocation_count = 0;
        self.adapt_threshold(collected, live_before);
        self.telemetry
            .end_cycle(live_before, live_after, self.gc_threshold);

        debug!(
            live_before,
            live_after,
            collected,
            threshold = self.gc_threshold,
            "gc cycle finished"
        );
    }

    fn mark_handle(&mut self, handle: GcHandle, worklist: &mut Vec<GcHandle>) {
        if !self.is_live(handle) {
            return;
        }

        // Mark first so shared and cyclic structures are visited once.
        match self.entries[handle.index as usize].as_mut() {
            Some(entry) => {
                if entry.marked {
                    return;
                }
                entry.marked = true;
            }
            None => return,
        }

        if let Some(entry) = self.entries[handle.index as usize].as_ref() {
            entry.object.push_children(worklist);
        }
    }

    fn sweep(&mut self) {
        for index in 0..self.entries.len() {
            let Some(entry) = &mut self.entries[index] else {
                continue;
            };
            if entry.marked {
                entry.marked = false;
                self.telemetry
                    .record_survival(ObjectKind::of(&entry.object));
            } else {
                self.entries[index] = None;
                self.generations[index] = self.generations[index].wrapping_add(1);
                self.free_list.push(index as u32);
            }
        }
    }

    fn adapt_threshold(&mut self, collected: usize, total_before: usize) {
        if total_before == 0 {
            return;
        }

        let ratio = collected as f64 / total_before as f64;
        if ratio < 0.25 {
            self.gc_threshold = (self.gc_threshold * 2).min(1_000_000);
        } else if ratio > 0.75 {
            self.gc_threshold = (self.gc_threshold / 2).max(MIN_GC_THRESHOLD)
        }
    }
}

fn stale(what: &'static str, handle: GcHandle) -> CoreError {
    CoreError::Inaccessible {
        what,
        index: handle.index,
    }
}
