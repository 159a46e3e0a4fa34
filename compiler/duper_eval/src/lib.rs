//! Duper Eval - plan building, code generation and execution.
//!
//! This crate turns values into compiled duplication procedures:
//! - `builder`: lowers a value graph into the plan IR
//! - `compile`: compiles a plan into a reusable [`Procedure`]
//! - `classify`: fast paths that skip the plan pipeline entirely
//! - `reconstruct`: applies reduction state to constructed values
//! - `shallow`: one-level duplication
//! - `fallback`: the recursive one-shot duplicator (cycle-tolerant)
//! - `api`: the public entry points (`deep_dups`, `deep_dupe`, `dups`,
//!   `dupe`) and their failure policy

pub mod api;
pub mod builder;
pub mod classify;
pub mod compile;
pub mod fallback;
pub mod reconstruct;
pub mod shallow;

#[cfg(test)]
mod tests;

pub use api::{
    deep_dupe, deep_dupe_with, deep_dups, deep_dups_with, dupe, dupe_with, dups, dups_with,
    plan_factory, FactoryFn, FailureHandler, OnFailure, Options,
};
pub use builder::{build_plan, BuiltPlan};
pub use classify::{classify, Classified};
pub use compile::{CodeBuilder, Frame, Procedure, Thunk};
pub use fallback::deep_clone;
pub use reconstruct::reconstruct_state;
pub use shallow::{shallow_clone, shallow_factory};

// Re-export the IR surface so most callers need only this crate.
pub use duper_ir::{DupError, DupResult, Memo, ObjId, Value};
