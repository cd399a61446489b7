pub mod entry;
pub mod interner;
pub mod symbol;
