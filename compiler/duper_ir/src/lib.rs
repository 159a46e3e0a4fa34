//! Duper IR - core types for the duper copy-plan compiler.
//!
//! This crate holds everything a compilation works over:
//! - `Value`: the dynamic value model the compiler duplicates
//! - `ObjId` / `Memo`: value identity and the alias table
//! - the decomposition protocol (`decompose`, `Decomposed`, `Reduction`)
//! - the global reducer dispatch table (`registry`)
//! - the plan IR arena (`Plan`, `Node`, `NodeId`)
//! - the per-compilation symbol table (`Namespace`)
//!
//! The plan builder and the code-generation backend live in `duper_eval`.

pub mod decompose;
mod errors;
mod memo;
pub mod namespace;
mod obj_id;
pub mod plan;
pub mod registry;
pub mod value;

pub use decompose::{decompose, Ctor, Decomposed, Reduction, PROTOCOL_VERSION};
pub use errors::{
    append_not_supported, ctor_args, hook_error, not_callable, not_duplicable,
    set_item_not_supported, state_not_applicable, unsupported_cycle, unsupported_shape, DupError,
    DupResult,
};
pub use memo::Memo;
pub use namespace::{Namespace, Status};
pub use obj_id::ObjId;
pub use plan::{CaptureId, Node, NodeId, Plan, PlanCtor, SlotId};
pub use registry::{register_reducer, registered_reducer, unregister_reducer};
pub use value::{
    call_callable, natives, AttrMap, BoundMethod, ClassBuilder, ClassDef, ClassId, ClassRef,
    DictValue, Heap, Instance, Kind, ModuleDef, MutHeap, NativeKind, NativeValue, SetValue, Value,
};
