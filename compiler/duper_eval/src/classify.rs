//! Fast-path classification, consulted before any plan is built.
//!
//! Most values fall into a handful of shapes whose duplicator is trivial,
//! and compiling a plan for them would be pure overhead. Classification is a
//! closed dispatch over value kinds; anything it cannot settle goes to the
//! plan pipeline.

use duper_ir::{DupResult, Memo, Value};

use crate::compile::Procedure;

/// Classification outcome.
#[derive(Debug)]
pub enum Classified {
    /// A trivial duplicator; no plan needed.
    Fast(Procedure),
    /// The value needs the full plan pipeline.
    NeedsPlan,
}

/// Try to settle a value with a fast-path procedure.
pub fn classify(value: &Value) -> DupResult<Classified> {
    // Immutables have no duplicable state; the duplicate is the value.
    if value.is_atomic_immutable() || matches!(value, Value::Module(_)) {
        return Ok(Classified::Fast(passthrough(value)));
    }

    if value.collection_is_empty() == Some(true) {
        return Ok(Classified::Fast(empty_collection(value)));
    }

    match value {
        Value::Tuple(items) if items.iter().all(Value::is_atomic_immutable) => {
            return Ok(Classified::Fast(passthrough(value)));
        }
        Value::FrozenSet(set) if set.iter().all(Value::is_atomic_immutable) => {
            return Ok(Classified::Fast(passthrough(value)));
        }
        // Flat mutable collections duplicate by cloning a snapshot.
        Value::List(cell) => {
            let snapshot = cell.read().clone();
            if snapshot.iter().all(Value::is_atomic_immutable) {
                return Ok(Classified::Fast(Procedure::from_fn("copies_list", move || {
                    Ok(Value::list(snapshot.clone()))
                })));
            }
        }
        Value::Set(cell) => {
            let snapshot = cell.read().clone();
            if snapshot.iter().all(Value::is_atomic_immutable) {
                return Ok(Classified::Fast(Procedure::from_fn("copies_set", move || {
                    Ok(Value::set_value(snapshot.clone()))
                })));
            }
        }
        Value::Dict(cell) => {
            let snapshot = cell.read().clone();
            let flat = snapshot
                .iter()
                .all(|(k, v)| k.is_atomic_immutable() && v.is_atomic_immutable());
            if flat {
                return Ok(Classified::Fast(Procedure::from_fn("copies_dict", move || {
                    Ok(Value::dict_value(snapshot.clone()))
                })));
            }
        }
        // A deep hook owns duplication entirely; the procedure just invokes
        // it. Every call gets a fresh, empty alias table because a compiled
        // procedure runs with no surrounding duplication in flight.
        Value::Instance(cell) => {
            let class = cell.read().class().clone();
            if let Some(hook) = class.deep_hook() {
                let hook = hook.clone();
                let source = value.clone();
                let name = format!("deep_hook_{}", class.name());
                return Ok(Classified::Fast(Procedure::from_fn(name, move || {
                    (hook.as_ref())(&source, &mut Memo::new())
                })));
            }
        }
        _ => {}
    }

    Ok(Classified::NeedsPlan)
}

/// The value stands for its own duplicate.
pub(crate) fn passthrough(value: &Value) -> Procedure {
    let name = format!("returns_{}", value.kind().name());
    let value = value.clone();
    Procedure::from_fn(name, move || Ok(value.clone()))
}

/// Fresh empties for mutable collections; immutable empties pass through.
fn empty_collection(value: &Value) -> Procedure {
    match value {
        Value::List(_) => Procedure::from_fn("new_list", || Ok(Value::list(Vec::new()))),
        Value::Set(_) => Procedure::from_fn("new_set", || Ok(Value::set(Vec::new()))),
        Value::Dict(_) => Procedure::from_fn("new_dict", || Ok(Value::dict(Vec::new()))),
        other => passthrough(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_values_pass_through() {
        let source = Value::string("hello");
        let Classified::Fast(proc_) = classify(&source).unwrap() else {
            panic!("expected a fast path");
        };
        assert_eq!(proc_.name(), "returns_str");
        assert!(proc_.call().unwrap().is_identical(&source));
    }

    #[test]
    fn test_empty_list_gets_fresh_empties() {
        let source = Value::list(vec![]);
        let Classified::Fast(proc_) = classify(&source).unwrap() else {
            panic!("expected a fast path");
        };
        let a = proc_.call().unwrap();
        let b = proc_.call().unwrap();
        assert!(!a.is_identical(&source));
        assert!(!a.is_identical(&b));
        assert_eq!(a.collection_is_empty(), Some(true));
    }

    #[test]
    fn test_flat_list_copies_are_independent() {
        let source = Value::list(vec![Value::Int(1), Value::string("x")]);
        let Classified::Fast(proc_) = classify(&source).unwrap() else {
            panic!("expected a fast path");
        };
        let copy = proc_.call().unwrap();
        assert_eq!(copy, source);
        assert!(!copy.is_identical(&source));
    }

    #[test]
    fn test_nested_list_needs_a_plan() {
        let source = Value::list(vec![Value::list(vec![])]);
        assert!(matches!(classify(&source).unwrap(), Classified::NeedsPlan));
    }

    #[test]
    fn test_tuple_of_atoms_passes_through() {
        let source = Value::tuple(vec![Value::Int(1), Value::Bool(true)]);
        let Classified::Fast(proc_) = classify(&source).unwrap() else {
            panic!("expected a fast path");
        };
        assert!(proc_.call().unwrap().is_identical(&source));
    }
}
