pub mod runtime;
pub mod syntax;
