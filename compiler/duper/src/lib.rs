//! Duper - a copy-plan compiler.
//!
//! Instead of re-walking a value graph on every duplication, duper compiles
//! the graph once into a reusable zero-argument procedure that replays its
//! construction:
//!
//! ```
//! use duper::{deep_dups, Value};
//!
//! let config = Value::dict(vec![
//!     (Value::string("retries"), Value::Int(3)),
//!     (Value::string("tags"), Value::list(vec![Value::string("a")])),
//! ]);
//!
//! let make_copy = deep_dups(&config)?;
//! let a = make_copy.call()?;
//! let b = make_copy.call()?;
//! assert_eq!(a, b);
//! assert!(!a.is_identical(&b));
//! # Ok::<(), duper::DupError>(())
//! ```
//!
//! The facade re-exports the full public surface of the underlying crates:
//! the value model and decomposition protocol from `duper_ir`, and plan
//! building, compilation and the entry points from `duper_eval`.

pub use duper_eval::{
    classify, deep_clone, deep_dupe, deep_dupe_with, deep_dups, deep_dups_with, dupe, dupe_with,
    dups, dups_with, plan_factory, shallow_clone, shallow_factory, Classified, FactoryFn,
    FailureHandler, OnFailure, Options, Procedure,
};
pub use duper_ir::{
    decompose, register_reducer, registered_reducer, unregister_reducer, AttrMap, ClassBuilder,
    ClassDef, ClassId, ClassRef, Ctor, Decomposed, DictValue, DupError, DupResult, Instance, Kind,
    Memo, NativeValue, ObjId, Reduction, SetValue, Value, PROTOCOL_VERSION,
};

/// Lower-level building blocks for callers composing their own pipeline.
pub mod pipeline {
    pub use duper_eval::{build_plan, reconstruct_state, BuiltPlan, CodeBuilder, Frame, Thunk};
    pub use duper_ir::namespace::{Namespace, Status};
    pub use duper_ir::plan::{CaptureId, Node, NodeId, Plan, PlanCtor, SlotId};
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_facade_round_trip() {
        let source = Value::list(vec![Value::dict(vec![(
            Value::string("k"),
            Value::list(vec![Value::Int(1)]),
        )])]);
        let procedure = deep_dups(&source).unwrap();
        let copy = procedure.call().unwrap();
        assert_eq!(copy, source);
        assert!(!copy.is_identical(&source));
    }
}
