//! One-shot recursive deep duplication.
//!
//! Unlike the compiled pipeline, the recursive duplicator supports values
//! that reference themselves: each container is registered in the alias
//! table before its members are duplicated, so a member that loops back
//! resolves to the partially built copy. This is the substitute procedure
//! installed when plan compilation fails and the failure policy allows it.

use duper_ir::decompose::{decompose, Ctor, Decomposed};
use duper_ir::value::SetValue;
use duper_ir::{not_duplicable, DupResult, Memo, Value};

use crate::reconstruct::reconstruct_state;

/// Deep-duplicate a value, threading an alias table.
pub fn deep_clone(value: &Value, memo: &mut Memo) -> DupResult<Value> {
    if value.is_atomic_immutable() || matches!(value, Value::Module(_)) {
        return Ok(value.clone());
    }
    let Some(oid) = value.obj_id() else {
        return Ok(value.clone());
    };
    if let Some(existing) = memo.get(oid) {
        return Ok(existing.clone());
    }

    match value {
        Value::List(cell) => {
            let copy = Value::list(Vec::new());
            memo.insert(oid, copy.clone());
            let snapshot = cell.read().clone();
            for item in &snapshot {
                let dup = deep_clone(item, memo)?;
                if let Value::List(out) = &copy {
                    out.write().push(dup);
                }
            }
            Ok(copy)
        }
        Value::Set(cell) => {
            let copy = Value::set(Vec::new());
            memo.insert(oid, copy.clone());
            let snapshot = cell.read().clone();
            for item in snapshot.iter() {
                let dup = deep_clone(item, memo)?;
                if let Value::Set(out) = &copy {
                    out.write().insert(dup);
                }
            }
            Ok(copy)
        }
        Value::Dict(cell) => {
            let copy = Value::dict(Vec::new());
            memo.insert(oid, copy.clone());
            let snapshot = cell.read().clone();
            for (key, val) in snapshot.iter() {
                let key_dup = deep_clone(key, memo)?;
                let val_dup = deep_clone(val, memo)?;
                if let Value::Dict(out) = &copy {
                    out.write().insert(key_dup, val_dup);
                }
            }
            Ok(copy)
        }
        Value::Tuple(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                out.push(deep_clone(item, memo)?);
            }
            let copy = Value::tuple(out);
            memo.insert(oid, copy.clone());
            Ok(copy)
        }
        Value::FrozenSet(set) => {
            let mut out = SetValue::new();
            for item in set.iter() {
                out.insert(deep_clone(item, memo)?);
            }
            let copy = Value::frozenset_value(out);
            memo.insert(oid, copy.clone());
            Ok(copy)
        }
        Value::Method(method) => {
            let func = deep_clone(&method.func, memo)?;
            let receiver = deep_clone(&method.receiver, memo)?;
            let copy = Value::method(func, receiver);
            memo.insert(oid, copy.clone());
            Ok(copy)
        }
        Value::Instance(cell) => {
            let class = cell.read().class().clone();
            if let Some(hook) = class.deep_hook() {
                let hook = hook.clone();
                let copy = (hook.as_ref())(value, memo)?;
                memo.insert(oid, copy.clone());
                return Ok(copy);
            }
            match decompose(value)? {
                Decomposed::Global => Ok(value.clone()),
                Decomposed::Reduction(reduction) => {
                    let mut args = Vec::with_capacity(reduction.args.len());
                    for arg in &reduction.args {
                        args.push(deep_clone(arg, memo)?);
                    }
                    let mut kwargs = Vec::with_capacity(reduction.kwargs.len());
                    for (name, arg) in &reduction.kwargs {
                        kwargs.push((name.clone(), deep_clone(arg, memo)?));
                    }
                    let copy = match &reduction.ctor {
                        Ctor::Callable(callee) => {
                            duper_ir::value::call_callable(callee, &args)?
                        }
                        Ctor::RawAlloc(class) => class.raw_alloc(&args, &kwargs)?,
                    };
                    // Registered before state so self-references resolve.
                    memo.insert(oid, copy.clone());

                    let state = match &reduction.state {
                        Some(state) => Some(deep_clone(state, memo)?),
                        None => None,
                    };
                    let seq = match &reduction.seq_items {
                        Some(items) => {
                            let mut out = Vec::with_capacity(items.len());
                            for item in items {
                                out.push(deep_clone(item, memo)?);
                            }
                            Some(out)
                        }
                        None => None,
                    };
                    let map = match &reduction.map_items {
                        Some(pairs) => {
                            let mut out = Vec::with_capacity(pairs.len());
                            for (key, val) in pairs {
                                out.push((deep_clone(key, memo)?, deep_clone(val, memo)?));
                            }
                            Some(out)
                        }
                        None => None,
                    };
                    reconstruct_state(&copy, state.as_ref(), seq.as_deref(), map.as_deref())?;
                    Ok(copy)
                }
            }
        }
        other => Err(not_duplicable(&other.type_name())),
    }
}
