//! Well-known native callables used by reductions.

use crate::decompose::kwargs_from_dict;
use crate::errors::hook_error;
use crate::value::{NativeKind, NativeValue, Value};

/// Wrapper constructor forwarding to a class's raw allocator with positional
/// arguments: `new_obj(class, *args)`. Decomposition unwraps it into a
/// direct raw-allocate call.
pub fn new_obj() -> Value {
    Value::Native(NativeValue::with_kind("new_obj", NativeKind::NewObj, |args| {
        let Some(Value::Class(class)) = args.first() else {
            return Err(hook_error("new_obj expects a class as its first argument"));
        };
        class.raw_alloc(&args[1..], &[])
    }))
}

/// Wrapper constructor forwarding to a class's raw allocator with keyword
/// arguments: `new_obj_kw(class, args_tuple, kwargs_dict)`.
pub fn new_obj_kw() -> Value {
    Value::Native(NativeValue::with_kind(
        "new_obj_kw",
        NativeKind::NewObjKw,
        |args| {
            let (class, positional, kwargs) = split_new_obj_kw(args)?;
            class.raw_alloc(&positional, &kwargs)
        },
    ))
}

/// Rebuilds a bound method from `(function, receiver)`.
pub fn method_new() -> Value {
    Value::Native(NativeValue::new("method_new", |args| match args {
        [func, receiver] => Ok(Value::method(func.clone(), receiver.clone())),
        _ => Err(hook_error("method_new expects (function, receiver)")),
    }))
}

pub(crate) fn split_new_obj_kw(
    args: &[Value],
) -> crate::errors::DupResult<(crate::value::ClassRef, Vec<Value>, Vec<(String, Value)>)> {
    let [Value::Class(class), args_tuple, kwargs_dict] = args else {
        return Err(hook_error(
            "new_obj_kw expects (class, args_tuple, kwargs_dict)",
        ));
    };
    let positional = match args_tuple {
        Value::Tuple(items) => items.to_vec(),
        _ => return Err(hook_error("new_obj_kw arguments must be a tuple")),
    };
    let kwargs = match kwargs_dict {
        Value::Dict(cell) => kwargs_from_dict(&cell.read())?,
        Value::Unit => Vec::new(),
        _ => return Err(hook_error("new_obj_kw keyword arguments must be a dict")),
    };
    Ok((class.clone(), positional, kwargs))
}
