//! Allocation and collection counters for the cell heap.
//!
//! Singular allocations are the quoting indirections, so the per-kind
//! counters double as the check that deep quoting allocates once per
//! crossing of the inline limit. They are always compiled in.

use std::time::{Duration, Instant};

use super::heap_object::HeapObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Array,
    Text,
    Singular,
    Varlist,
    Action,
}

impl ObjectKind {
    const COUNT: usize = 5;

    pub fn of(object: &HeapObject) -> Self {
        match object {
            HeapObject::Array(_) => ObjectKind::Array,
            HeapObject::Text(_) => ObjectKind::Text,
            HeapObject::Singular(_) => ObjectKind::Singular,
            HeapObject::Varlist(_) => ObjectKind::Varlist,
            HeapObject::Action(_) => ObjectKind::Action,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Running totals for one object kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    pub allocated: usize,
    pub bytes: usize,
    /// Times an object of this kind was found marked by a sweep.
    pub survived: usize,
}

/// One finished mark-and-sweep pass.
#[derive(Debug, Clone)]
pub struct Cycle {
    pub elapsed: Duration,
    pub roots: usize,
    pub live_before: usize,
    pub reclaimed: usize,
    pub deepest_worklist: usize,
    pub next_threshold: usize,
}

#[derive(Debug, Default)]
pub struct GcTelemetry {
    kinds: [KindStats; ObjectKind::COUNT],
    cycles: Vec<Cycle>,
    started: Option<(Instant, usize)>,
    deepest_worklist: usize,
}

impl GcTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_alloc(&mut self, kind: ObjectKind, bytes: usize) {
        let stats = &mut self.kinds[kind.slot()];
        stats.allocated += 1;
        stats.bytes += bytes;
    }

    #[inline]
    pub fn record_survival(&mut self, kind: ObjectKind) {
        self.kinds[kind.slot()].survived += 1;
    }

    pub fn begin_cycle(&mut self, roots: usize) {
        self.started = Some((Instant::now(), roots));
        self.deepest_worklist = 0;
    }

    #[inline]
    pub fn note_worklist(&mut self, depth: usize) {
        self.deepest_worklist = self.deepest_worklist.max(depth);
    }

    pub fn end_cycle(&mut self, live_before: usize, live_after: usize, next_threshold: usize) {
        let (elapsed, roots) = match self.started.take() {
            Some((start, roots)) => (start.elapsed(), roots),
            None => (Duration::ZERO, 0),
        };
        self.cycles.push(Cycle {
            elapsed,
            roots,
            live_before,
            reclaimed: live_before.saturating_sub(live_after),
            deepest_worklist: self.deepest_worklist,
            next_threshold,
        });
    }

    pub fn kind(&self, kind: ObjectKind) -> KindStats {
        self.kinds[kind.slot()]
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn last_cycle(&self) -> Option<&Cycle> {
        self.cycles.last()
    }

    /// Number of quoting indirections ever allocated.
    pub fn indirections(&self) -> usize {
        self.kind(ObjectKind::Singular).allocated
    }

    pub fn total_bytes(&self) -> usize {
        self.kinds.iter().map(|stats| stats.bytes).sum()
    }
}
