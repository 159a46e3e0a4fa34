//! Shallow duplication: one-level copies whose members are shared.

use duper_ir::decompose::{decompose, Ctor, Decomposed, Reduction};
use duper_ir::value::call_callable;
use duper_ir::{DupResult, Value};

use crate::classify::passthrough;
use crate::compile::Procedure;
use crate::reconstruct::reconstruct_state;

/// Build a reusable shallow duplicator for a value.
pub fn shallow_factory(value: &Value) -> DupResult<Procedure> {
    if value.is_shallow_immutable() {
        return Ok(passthrough(value));
    }
    match value {
        Value::List(cell) => {
            let snapshot = cell.read().clone();
            Ok(Procedure::from_fn("copies_list", move || {
                Ok(Value::list(snapshot.clone()))
            }))
        }
        Value::Set(cell) => {
            let snapshot = cell.read().clone();
            Ok(Procedure::from_fn("copies_set", move || {
                Ok(Value::set_value(snapshot.clone()))
            }))
        }
        Value::Dict(cell) => {
            let snapshot = cell.read().clone();
            Ok(Procedure::from_fn("copies_dict", move || {
                Ok(Value::dict_value(snapshot.clone()))
            }))
        }
        Value::Instance(cell) => {
            let class = cell.read().class().clone();
            // A copy hook owns shallow duplication. It runs once up front to
            // take the snapshot, then re-copies the snapshot per call so
            // later mutation of the source is not observed.
            if let Some(hook) = class.copy_hook() {
                let hook = hook.clone();
                let snapshot = (hook.as_ref())(value)?;
                let name = format!("copy_hook_{}", class.name());
                return Ok(Procedure::from_fn(name, move || {
                    (hook.as_ref())(&snapshot)
                }));
            }
            match decompose(value)? {
                Decomposed::Global => Ok(passthrough(value)),
                Decomposed::Reduction(reduction) => {
                    let name = format!("rebuilds_{}", class.name());
                    Ok(Procedure::from_fn(name, move || {
                        replay_reduction(&reduction)
                    }))
                }
            }
        }
        // Every remaining kind is shallow-immutable and returned above.
        other => Ok(passthrough(other)),
    }
}

/// One-shot shallow duplicate.
pub fn shallow_clone(value: &Value) -> DupResult<Value> {
    if value.is_shallow_immutable() {
        return Ok(value.clone());
    }
    match value {
        Value::List(cell) => Ok(Value::list(cell.read().clone())),
        Value::Set(cell) => Ok(Value::set_value(cell.read().clone())),
        Value::Dict(cell) => Ok(Value::dict_value(cell.read().clone())),
        Value::Instance(cell) => {
            let class = cell.read().class().clone();
            if let Some(hook) = class.copy_hook() {
                return (hook.as_ref())(value);
            }
            match decompose(value)? {
                Decomposed::Global => Ok(value.clone()),
                Decomposed::Reduction(reduction) => replay_reduction(&reduction),
            }
        }
        other => Ok(other.clone()),
    }
}

/// Rebuild from a reduction, sharing the captured components each time.
fn replay_reduction(reduction: &Reduction) -> DupResult<Value> {
    let object = match &reduction.ctor {
        Ctor::Callable(callee) => call_callable(callee, &reduction.args)?,
        Ctor::RawAlloc(class) => class.raw_alloc(&reduction.args, &reduction.kwargs)?,
    };
    reconstruct_state(
        &object,
        reduction.state.as_ref(),
        reduction.seq_items.as_deref(),
        reduction.map_items.as_deref(),
    )?;
    Ok(object)
}
