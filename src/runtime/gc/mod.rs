pub mod gc_handle;
pub mod gc_heap;
pub mod heap_entry;
pub mod heap_object;
pub mod telemetry;

pub use gc_handle::{
    ActionId, ArrayId, ContextId, GcHandle, SingularId, TextId, WeakAction, WeakContext,
};
pub use gc_heap::GcHeap;
pub use heap_object::{ArraySeries, HeapObject};
