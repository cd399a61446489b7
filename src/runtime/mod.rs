//! Value core: cells, quoting, contexts, actions and binding.
//!
//! # Ownership
//! Every series (arrays, strings, indirection cells, varlists, actions) lives
//! in the collected heap owned by [`core::Core`] and is named by a copyable
//! handle. Handles carry a generation, so using one after its object was
//! reclaimed is an `Inaccessible` error, never an alias.
//!
//! Links that must not keep their target alive (meta contexts, the action
//! a frame was built for, the owner of a relativized body) use the weak
//! handle types and are skipped by the mark phase. Cycles between series
//! are allowed; the collector traces, it does not count.

pub mod action;
pub mod cell;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod gc;
