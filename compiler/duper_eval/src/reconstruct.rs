//! Applying reconstruction state and trailing items to a constructed value.
//!
//! Reconstruction runs after a reduction's constructor call, in a fixed
//! order: state first, then appended sequence items, then keyed mapping
//! items. This is shared by the compiled `Finalize` node, the shallow
//! duplicator and the one-shot fallback.

use duper_ir::value::DictValue;
use duper_ir::{
    append_not_supported, hook_error, set_item_not_supported, state_not_applicable, DupResult,
    Value,
};

/// Apply state, sequence items and mapping items to `target`, in that order.
pub fn reconstruct_state(
    target: &Value,
    state: Option<&Value>,
    seq_items: Option<&[Value]>,
    map_items: Option<&[(Value, Value)]>,
) -> DupResult<()> {
    if let Some(state) = state {
        apply_state(target, state)?;
    }
    if let Some(items) = seq_items {
        for item in items {
            append_item(target, item.clone())?;
        }
    }
    if let Some(pairs) = map_items {
        for (key, value) in pairs {
            set_item(target, key.clone(), value.clone())?;
        }
    }
    Ok(())
}

/// Apply a state component to the constructed value.
///
/// A class's `set_state` hook owns the whole job when present. Otherwise the
/// state must be a dict of attributes, or a two-element tuple of optional
/// attribute dicts (the split attribute/slot form some reducers emit; both
/// halves land in the same attribute store here).
fn apply_state(target: &Value, state: &Value) -> DupResult<()> {
    if let Value::Instance(cell) = target {
        let hook = cell.read().class().set_state().cloned();
        if let Some(hook) = hook {
            return (hook.as_ref())(target, state);
        }
    }
    match state {
        Value::Unit => Ok(()),
        Value::Dict(dict) => merge_attrs(target, &dict.read()),
        Value::Tuple(parts) if parts.len() == 2 => {
            for part in parts.iter() {
                match part {
                    Value::Unit => {}
                    Value::Dict(dict) => merge_attrs(target, &dict.read())?,
                    _ => return Err(hook_error("state tuple halves must be dicts or unit")),
                }
            }
            Ok(())
        }
        _ => Err(hook_error("unsupported state shape")),
    }
}

fn merge_attrs(target: &Value, state: &DictValue) -> DupResult<()> {
    let Value::Instance(cell) = target else {
        return Err(state_not_applicable(&target.type_name()));
    };
    let mut instance = cell.write();
    for (key, value) in state.iter() {
        let Value::Str(name) = key else {
            return Err(hook_error("state attribute names must be strings"));
        };
        instance.attrs_mut().insert(name.to_string(), value.clone());
    }
    Ok(())
}

fn append_item(target: &Value, item: Value) -> DupResult<()> {
    match target {
        Value::List(cell) => {
            cell.write().push(item);
            Ok(())
        }
        Value::Instance(cell) => {
            let hook = cell.read().class().append().cloned();
            match hook {
                Some(hook) => (hook.as_ref())(target, item),
                None => Err(append_not_supported(&target.type_name())),
            }
        }
        other => Err(append_not_supported(&other.type_name())),
    }
}

fn set_item(target: &Value, key: Value, value: Value) -> DupResult<()> {
    match target {
        Value::Dict(cell) => {
            cell.write().insert(key, value);
            Ok(())
        }
        Value::Instance(cell) => {
            let hook = cell.read().class().set_item().cloned();
            match hook {
                Some(hook) => (hook.as_ref())(target, key, value),
                None => Err(set_item_not_supported(&target.type_name())),
            }
        }
        other => Err(set_item_not_supported(&other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use duper_ir::value::ClassDef;
    use duper_ir::DupError;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_dict_state_merges_into_attrs() {
        let class = ClassDef::builder("Point").build();
        let target = Value::instance(class);
        let state = Value::dict(vec![(Value::string("x"), Value::Int(1))]);

        reconstruct_state(&target, Some(&state), None, None).unwrap();
        if let Value::Instance(cell) = &target {
            assert_eq!(cell.read().attrs().get("x"), Some(&Value::Int(1)));
        }
    }

    #[test]
    fn test_split_state_tuple_lands_in_one_store() {
        let class = ClassDef::builder("Mixed").build();
        let target = Value::instance(class);
        let state = Value::tuple(vec![
            Value::dict(vec![(Value::string("a"), Value::Int(1))]),
            Value::dict(vec![(Value::string("b"), Value::Int(2))]),
        ]);

        reconstruct_state(&target, Some(&state), None, None).unwrap();
        if let Value::Instance(cell) = &target {
            assert_eq!(cell.read().attrs().get("a"), Some(&Value::Int(1)));
            assert_eq!(cell.read().attrs().get("b"), Some(&Value::Int(2)));
        }
    }

    #[test]
    fn test_set_state_hook_owns_the_state() {
        let class = ClassDef::builder("Custom")
            .with_set_state(|target, state| {
                let Value::Instance(cell) = target else {
                    unreachable!();
                };
                cell.write().attrs_mut().insert("wrapped", state.clone());
                Ok(())
            })
            .build();
        let target = Value::instance(class);

        reconstruct_state(&target, Some(&Value::Int(42)), None, None).unwrap();
        if let Value::Instance(cell) = &target {
            assert_eq!(cell.read().attrs().get("wrapped"), Some(&Value::Int(42)));
        }
    }

    #[test]
    fn test_seq_items_append_to_list() {
        let target = Value::list(vec![]);
        reconstruct_state(&target, None, Some(&[Value::Int(1), Value::Int(2)]), None).unwrap();
        assert_eq!(target, Value::list(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_map_items_assign_into_dict() {
        let target = Value::dict(vec![]);
        reconstruct_state(
            &target,
            None,
            None,
            Some(&[(Value::string("k"), Value::Int(3))]),
        )
        .unwrap();
        assert_eq!(
            target,
            Value::dict(vec![(Value::string("k"), Value::Int(3))])
        );
    }

    #[test]
    fn test_append_without_support_is_an_error() {
        let err = reconstruct_state(&Value::dict(vec![]), None, Some(&[Value::Int(1)]), None)
            .unwrap_err();
        assert!(matches!(err, DupError::AppendNotSupported { .. }));
    }

    #[test]
    fn test_state_on_plain_value_is_an_error() {
        let state = Value::dict(vec![(Value::string("x"), Value::Int(1))]);
        let err = reconstruct_state(&Value::list(vec![]), Some(&state), None, None).unwrap_err();
        assert!(matches!(err, DupError::StateNotApplicable { .. }));
    }
}
