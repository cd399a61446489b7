use crate::runtime::gc::heap_object::HeapObject;

pub struct HeapEntry {
    pub(crate) object: HeapObject,
    pub(crate) marked: bool,
}

impl HeapEntry {
    pub(crate) fn new(object: HeapObject) -> Self {
        Self {
            object,
            marked: false,
        }
    }
}
