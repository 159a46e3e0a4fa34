//! The decomposition protocol: turning an instance into constructor-plus-state
//! components that a copy plan can replay.
//!
//! Resolution order for an instance of class `C`:
//!
//! 1. a reducer registered for `C` in the global dispatch table
//! 2. `C`'s extended reduce hook, invoked with [`PROTOCOL_VERSION`]
//! 3. `C`'s basic reduce hook
//! 4. the default reduction: raw-allocate `C`, then apply the instance's
//!    attributes as state (skipped when `C` is opaque, which is an error)
//!
//! A hook may return either a global name (a string, meaning "the duplicate
//! is the value itself") or a reduction tuple of two to five components:
//! `(ctor, args, state?, seq_items?, map_items?)`. Anything longer is
//! rejected outright. Wrapper constructors produced by the well-known
//! `new_obj` / `new_obj_kw` natives are unwrapped into direct raw-allocate
//! constructors during parsing, so downstream stages never see them.

use crate::errors::{hook_error, not_duplicable, unsupported_shape, DupResult};
use crate::registry::registered_reducer;
use crate::value::{ClassRef, DictValue, NativeKind, Value};

/// Version passed to extended reduce hooks.
pub const PROTOCOL_VERSION: u8 = 4;

/// Constructor component of a reduction, after unwrapping.
#[derive(Clone, Debug)]
pub enum Ctor {
    /// An arbitrary callable, invoked with the reduction's arguments.
    Callable(Value),
    /// Raw allocation of a class, bypassing its call constructor.
    RawAlloc(ClassRef),
}

/// A parsed reduction: how to rebuild one instance.
#[derive(Clone, Debug)]
pub struct Reduction {
    pub ctor: Ctor,
    pub args: Vec<Value>,
    pub kwargs: Vec<(String, Value)>,
    pub state: Option<Value>,
    pub seq_items: Option<Vec<Value>>,
    pub map_items: Option<Vec<(Value, Value)>>,
}

impl Reduction {
    /// True when reconstruction work remains after the constructor call.
    pub fn has_trailing(&self) -> bool {
        self.state.is_some() || self.seq_items.is_some() || self.map_items.is_some()
    }
}

/// Outcome of decomposing a value.
#[derive(Clone, Debug)]
pub enum Decomposed {
    /// The value stands for itself; the duplicate is the original.
    Global,
    Reduction(Reduction),
}

/// Decompose an instance into reconstruction components.
///
/// Only instances decompose; builtin collections and immutables are handled
/// structurally by the plan builder and never reach this function.
pub fn decompose(value: &Value) -> DupResult<Decomposed> {
    let Value::Instance(cell) = value else {
        return Err(not_duplicable(&value.type_name()));
    };
    let class = cell.read().class().clone();

    if let Some(reducer) = registered_reducer(class.id()) {
        let raw = (reducer.as_ref())(value)?;
        return parse_reduce(raw);
    }
    if let Some(reduce_ex) = class.reduce_ex() {
        let raw = (reduce_ex.as_ref())(value, PROTOCOL_VERSION)?;
        return parse_reduce(raw);
    }
    if let Some(reduce) = class.reduce() {
        let raw = (reduce.as_ref())(value)?;
        return parse_reduce(raw);
    }
    if class.is_opaque() {
        return Err(not_duplicable(class.name()));
    }
    Ok(Decomposed::Reduction(default_reduction(&class, cell)))
}

/// Default reduction for hookless classes: raw-allocate, then restore the
/// attribute map as state.
fn default_reduction(
    class: &ClassRef,
    cell: &crate::value::MutHeap<crate::value::Instance>,
) -> Reduction {
    let attrs = cell.read().attrs().clone();
    let state = if attrs.is_empty() {
        None
    } else {
        let pairs = attrs
            .iter()
            .map(|(name, value)| (Value::string(name.clone()), value.clone()))
            .collect();
        Some(Value::dict(pairs))
    };
    Reduction {
        ctor: Ctor::RawAlloc(class.clone()),
        args: Vec::new(),
        kwargs: Vec::new(),
        state,
        seq_items: None,
        map_items: None,
    }
}

/// Parse the raw value a reduce hook returned.
pub fn parse_reduce(raw: Value) -> DupResult<Decomposed> {
    if matches!(raw, Value::Str(_)) {
        return Ok(Decomposed::Global);
    }
    let Value::Tuple(components) = &raw else {
        return Err(hook_error(
            "reduce hook must return a string or a reduction tuple",
        ));
    };
    if !(2..=5).contains(&components.len()) {
        return Err(unsupported_shape(components.len()));
    }

    let callee = components[0].clone();
    let args = match &components[1] {
        Value::Tuple(items) => items.to_vec(),
        _ => return Err(hook_error("reduction arguments must be a tuple")),
    };
    let state = components.get(2).and_then(non_unit);
    let seq_items = match components.get(3).and_then(non_unit) {
        Some(Value::List(cell)) => Some(cell.read().clone()),
        Some(Value::Tuple(items)) => Some(items.to_vec()),
        Some(_) => return Err(hook_error("reduction sequence items must be iterable")),
        None => None,
    };
    let map_items = match components.get(4).and_then(non_unit) {
        Some(value) => Some(pairs_from(&value)?),
        None => None,
    };

    let (ctor, args, kwargs) = debunk(callee, args)?;
    Ok(Decomposed::Reduction(Reduction {
        ctor,
        args,
        kwargs,
        state,
        seq_items,
        map_items,
    }))
}

/// Unwrap the well-known wrapper constructors into direct raw allocation.
fn debunk(callee: Value, args: Vec<Value>) -> DupResult<(Ctor, Vec<Value>, Vec<(String, Value)>)> {
    let kind = match &callee {
        Value::Native(native) => native.kind(),
        _ => NativeKind::Plain,
    };
    match kind {
        NativeKind::Plain => Ok((Ctor::Callable(callee), args, Vec::new())),
        NativeKind::NewObj => match args.split_first() {
            Some((Value::Class(class), rest)) => {
                Ok((Ctor::RawAlloc(class.clone()), rest.to_vec(), Vec::new()))
            }
            _ => Err(hook_error("new_obj expects a class as its first argument")),
        },
        NativeKind::NewObjKw => {
            let (class, positional, kwargs) = crate::value::natives::split_new_obj_kw(&args)?;
            Ok((Ctor::RawAlloc(class), positional, kwargs))
        }
    }
}

fn non_unit(value: &Value) -> Option<Value> {
    match value {
        Value::Unit => None,
        other => Some(other.clone()),
    }
}

/// Key/value pairs from a dict or a list of two-element tuples.
fn pairs_from(value: &Value) -> DupResult<Vec<(Value, Value)>> {
    match value {
        Value::Dict(cell) => Ok(cell.read().iter().cloned().collect()),
        Value::List(cell) => cell
            .read()
            .iter()
            .map(|item| match item {
                Value::Tuple(pair) if pair.len() == 2 => Ok((pair[0].clone(), pair[1].clone())),
                _ => Err(hook_error("reduction mapping items must be key/value pairs")),
            })
            .collect(),
        _ => Err(hook_error("reduction mapping items must be iterable")),
    }
}

/// String keys from a keyword-arguments dict.
pub(crate) fn kwargs_from_dict(dict: &DictValue) -> DupResult<Vec<(String, Value)>> {
    dict.iter()
        .map(|(key, value)| match key {
            Value::Str(name) => Ok((name.to_string(), value.clone())),
            _ => Err(hook_error("keyword argument names must be strings")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::errors::DupError;
    use crate::value::{natives, ClassDef};

    #[test]
    fn test_default_reduction_restores_attrs_as_state() {
        let class = ClassDef::builder("Point").build();
        let value = Value::instance(class.clone());
        if let Value::Instance(cell) = &value {
            cell.write().attrs_mut().insert("x", Value::Int(3));
        }

        let Decomposed::Reduction(reduction) = decompose(&value).unwrap() else {
            panic!("expected a reduction");
        };
        assert!(matches!(&reduction.ctor, Ctor::RawAlloc(c) if *c == class));
        assert!(reduction.args.is_empty());
        let state = reduction.state.expect("attrs should become state");
        assert_eq!(
            state,
            Value::dict(vec![(Value::string("x"), Value::Int(3))])
        );
    }

    #[test]
    fn test_default_reduction_without_attrs_has_no_state() {
        let class = ClassDef::builder("Empty").build();
        let Decomposed::Reduction(reduction) = decompose(&Value::instance(class)).unwrap() else {
            panic!("expected a reduction");
        };
        assert!(!reduction.has_trailing());
    }

    #[test]
    fn test_opaque_class_is_not_duplicable() {
        let class = ClassDef::builder("Handle").opaque().build();
        let err = decompose(&Value::instance(class)).unwrap_err();
        assert!(matches!(err, DupError::NotDuplicable { .. }));
    }

    #[test]
    fn test_string_reduce_means_global() {
        let class = ClassDef::builder("Singleton")
            .with_reduce(|_| Ok(Value::string("SINGLETON")))
            .build();
        let decomposed = decompose(&Value::instance(class)).unwrap();
        assert!(matches!(decomposed, Decomposed::Global));
    }

    #[test]
    fn test_reduce_ex_takes_priority_over_reduce() {
        let class = ClassDef::builder("Both")
            .with_reduce_ex(|_, version| {
                assert_eq!(version, PROTOCOL_VERSION);
                Ok(Value::string("EX"))
            })
            .with_reduce(|_| panic!("basic reduce must not run"))
            .build();
        let decomposed = decompose(&Value::instance(class)).unwrap();
        assert!(matches!(decomposed, Decomposed::Global));
    }

    #[test]
    fn test_oversized_tuple_is_rejected() {
        let raw = Value::tuple(vec![
            Value::Unit,
            Value::tuple(vec![]),
            Value::Unit,
            Value::Unit,
            Value::Unit,
            Value::Unit,
        ]);
        let err = parse_reduce(raw).unwrap_err();
        assert!(matches!(err, DupError::UnsupportedShape { len: 6 }));
    }

    #[test]
    fn test_new_obj_is_debunked_to_raw_alloc() {
        let class = ClassDef::builder("Boxed").build();
        let raw = Value::tuple(vec![
            natives::new_obj(),
            Value::tuple(vec![Value::Class(class.clone()), Value::Int(9)]),
        ]);
        let Decomposed::Reduction(reduction) = parse_reduce(raw).unwrap() else {
            panic!("expected a reduction");
        };
        assert!(matches!(&reduction.ctor, Ctor::RawAlloc(c) if *c == class));
        assert_eq!(reduction.args, vec![Value::Int(9)]);
    }

    #[test]
    fn test_new_obj_kw_splits_keyword_arguments() {
        let class = ClassDef::builder("Config").build();
        let raw = Value::tuple(vec![
            natives::new_obj_kw(),
            Value::tuple(vec![
                Value::Class(class.clone()),
                Value::tuple(vec![Value::Int(1)]),
                Value::dict(vec![(Value::string("debug"), Value::Bool(true))]),
            ]),
        ]);
        let Decomposed::Reduction(reduction) = parse_reduce(raw).unwrap() else {
            panic!("expected a reduction");
        };
        assert!(matches!(&reduction.ctor, Ctor::RawAlloc(c) if *c == class));
        assert_eq!(reduction.args, vec![Value::Int(1)]);
        assert_eq!(
            reduction.kwargs,
            vec![("debug".to_string(), Value::Bool(true))]
        );
    }

    #[test]
    fn test_trailing_items_are_parsed() {
        let ident = Value::Native(crate::value::NativeValue::new("ident", |args| {
            Ok(args.first().cloned().unwrap_or(Value::Unit))
        }));
        let raw = Value::tuple(vec![
            ident,
            Value::tuple(vec![]),
            Value::Unit,
            Value::list(vec![Value::Int(1), Value::Int(2)]),
            Value::dict(vec![(Value::string("k"), Value::Int(3))]),
        ]);
        let Decomposed::Reduction(reduction) = parse_reduce(raw).unwrap() else {
            panic!("expected a reduction");
        };
        assert!(reduction.state.is_none());
        assert_eq!(
            reduction.seq_items,
            Some(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(
            reduction.map_items,
            Some(vec![(Value::string("k"), Value::Int(3))])
        );
    }
}
