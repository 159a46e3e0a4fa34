//! Shallow duplication tests through the public entry points.

use duper_ir::value::ClassDef;
use duper_ir::Value;
use pretty_assertions::assert_eq;

use crate::api::{dupe, dups};

#[test]
fn test_shallow_copy_shares_members() {
    let inner = Value::list(vec![Value::Int(1), Value::Int(2)]);
    let source = Value::list(vec![inner.clone(), Value::Int(3)]);

    let copy = dupe(&source).unwrap();
    assert_eq!(copy, source);
    assert!(!copy.is_identical(&source));

    let Value::List(cell) = &copy else {
        panic!("expected a list");
    };
    assert!(cell.read()[0].is_identical(&inner));
}

#[test]
fn test_shallow_immutables_pass_through() {
    let source = Value::tuple(vec![Value::Int(1), Value::list(vec![])]);
    let copy = dupe(&source).unwrap();
    assert!(copy.is_identical(&source));
}

#[test]
fn test_shallow_procedure_uses_its_snapshot() {
    let source = Value::list(vec![Value::Int(1)]);
    let procedure = dups(&source).unwrap();

    if let Value::List(cell) = &source {
        cell.write().push(Value::Int(2));
    }

    let copy = procedure.call().unwrap();
    assert_eq!(copy, Value::list(vec![Value::Int(1)]));
}

#[test]
fn test_shallow_dict_copies_are_independent() {
    let source = Value::dict(vec![(Value::string("k"), Value::Int(1))]);
    let procedure = dups(&source).unwrap();

    let a = procedure.call().unwrap();
    let b = procedure.call().unwrap();
    assert_eq!(a, b);
    assert!(!a.is_identical(&b));

    if let Value::Dict(cell) = &a {
        cell.write().insert(Value::string("extra"), Value::Int(2));
    }
    assert_ne!(a, b);
}

#[test]
fn test_copy_hook_owns_shallow_duplication() {
    let class = ClassDef::builder("Hooked")
        .with_copy_hook(|source| {
            let Value::Instance(cell) = source else {
                unreachable!();
            };
            let class = cell.read().class().clone();
            let copy = Value::instance(class);
            if let Value::Instance(copy_cell) = &copy {
                let mut guard = copy_cell.write();
                for (name, value) in cell.read().attrs().iter() {
                    guard.attrs_mut().insert(name.clone(), value.clone());
                }
                guard.attrs_mut().insert("copied", Value::Bool(true));
            }
            Ok(copy)
        })
        .build();

    let source = Value::instance(class);
    if let Value::Instance(cell) = &source {
        cell.write().attrs_mut().insert("x", Value::Int(1));
    }

    let copy = dupe(&source).unwrap();
    let Value::Instance(cell) = &copy else {
        panic!("expected an instance");
    };
    assert_eq!(cell.read().attrs().get("x"), Some(&Value::Int(1)));
    assert_eq!(cell.read().attrs().get("copied"), Some(&Value::Bool(true)));
    assert!(!copy.is_identical(&source));
}

#[test]
fn test_shallow_reduction_shares_attribute_values() {
    let class = ClassDef::builder("Bag").build();
    let source = Value::instance(class);
    let inner = Value::list(vec![Value::Int(1)]);
    if let Value::Instance(cell) = &source {
        cell.write().attrs_mut().insert("items", inner.clone());
    }

    let copy = dupe(&source).unwrap();
    assert!(!copy.is_identical(&source));
    let Value::Instance(cell) = &copy else {
        panic!("expected an instance");
    };
    // One level deep only: the attribute value is shared with the source.
    let copied_inner = cell.read().attrs().get("items").cloned().unwrap();
    assert!(copied_inner.is_identical(&inner));
}

#[test]
fn test_empty_list_shallow_copy_is_fresh() {
    let source = Value::list(vec![]);
    let procedure = dups(&source).unwrap();
    let copy = procedure.call().unwrap();
    assert!(!copy.is_identical(&source));
    assert_eq!(copy.collection_is_empty(), Some(true));
}
