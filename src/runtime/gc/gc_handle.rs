use crate::runtime::gc::GcHeap;

/// Handle into the GC heap.
///
/// A `GcHandle` is a copyable slot index plus the generation the slot had
/// when the object was allocated. Once the slot is swept and reused the
/// generation moves on, so a handle that outlived its object is detected
/// instead of aliasing the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GcHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl GcHandle {
    /// Returns the raw heap slot index backing this handle.
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    #[cfg(test)]
    pub fn new_for_test(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Owning handle to a block or group array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayId(pub(crate) GcHandle);

/// Owning handle to string storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextId(pub(crate) GcHandle);

/// Owning handle to a one-cell indirection series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SingularId(pub(crate) GcHandle);

/// Owning handle to a context's varlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub(crate) GcHandle);

/// Owning handle to an action's static identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(pub(crate) GcHandle);

impl ArrayId {
    pub fn handle(self) -> GcHandle {
        self.0
    }
}

impl TextId {
    pub fn handle(self) -> GcHandle {
        self.0
    }
}

impl SingularId {
    pub fn handle(self) -> GcHandle {
        self.0
    }
}

impl ContextId {
    pub fn handle(self) -> GcHandle {
        self.0
    }
}

impl ActionId {
    pub fn handle(self) -> GcHandle {
        self.0
    }
}

/// Non-owning link to a context, skipped by the mark phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeakContext(Option<ContextId>);

impl WeakContext {
    pub const NONE: WeakContext = WeakContext(None);

    pub fn new(target: ContextId) -> Self {
        WeakContext(Some(target))
    }

    /// Returns the target if it has not been reclaimed.
    pub fn upgrade(self, heap: &GcHeap) -> Option<ContextId> {
        self.0.filter(|id| heap.is_live(id.0))
    }

    /// The recorded target, live or not.
    pub fn raw(self) -> Option<ContextId> {
        self.0
    }
}

/// Non-owning link to an action, skipped by the mark phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeakAction(Option<ActionId>);

impl WeakAction {
    pub const NONE: WeakAction = WeakAction(None);

    pub fn new(target: ActionId) -> Self {
        WeakAction(Some(target))
    }

    pub fn upgrade(self, heap: &GcHeap) -> Option<ActionId> {
        self.0.filter(|id| heap.is_live(id.0))
    }

    pub fn raw(self) -> Option<ActionId> {
        self.0
    }
}
