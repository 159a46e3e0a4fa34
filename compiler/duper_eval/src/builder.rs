//! Plan construction: walking a value graph into the plan IR.
//!
//! The builder recursively lowers a source value into arena nodes, using the
//! namespace to detect sharing and cycles. Sharing is handled by promoting
//! the first occurrence's node into a slot binding in place, so every parent
//! that already referenced it observes the store; later occurrences compile
//! to slot loads. Revisiting an identity that is still being built means the
//! value references itself before its construction can finish, which the
//! plan model cannot express.

use duper_ir::decompose::{decompose, Ctor, Decomposed, Reduction};
use duper_ir::namespace::{Namespace, Status};
use duper_ir::plan::{Node, NodeId, Plan, PlanCtor};
use duper_ir::value::{natives, NativeValue};
use duper_ir::{not_duplicable, unsupported_cycle, DupResult, Memo, ObjId, Value};
use smallvec::SmallVec;

/// A fully built plan, ready for code generation.
#[derive(Debug)]
pub struct BuiltPlan {
    pub plan: Plan,
    pub namespace: Namespace,
    pub root: NodeId,
}

/// Build a copy plan for a value.
pub fn build_plan(value: &Value) -> DupResult<BuiltPlan> {
    let mut plan = Plan::new();
    let mut namespace = Namespace::new();
    let root = build_node(value, &mut plan, &mut namespace)?;
    Ok(BuiltPlan {
        plan,
        namespace,
        root,
    })
}

fn build_node(value: &Value, plan: &mut Plan, ns: &mut Namespace) -> DupResult<NodeId> {
    // Atoms are cloned by value; clones share the same immutable heap cell.
    if value.is_atom() {
        return Ok(plan.alloc(Node::Const(value.clone())));
    }
    // Callables, classes and modules are shared with the source, not copied.
    if matches!(value, Value::Native(_) | Value::Class(_) | Value::Module(_)) {
        let capture = ns.capture(value);
        return Ok(plan.alloc(Node::Capture(capture)));
    }

    // Everything past this point has heap identity and gets duplicated.
    let oid = match value.obj_id() {
        Some(oid) => oid,
        None => return Ok(plan.alloc(Node::Const(value.clone()))),
    };
    match ns.status(oid) {
        Some(Status::Finished(node)) => return resolve_back_reference(node, value, plan, ns),
        Some(Status::InProgress) => return Err(unsupported_cycle(&value.type_name())),
        None => ns.mark_in_progress(oid),
    }

    let node = match value {
        Value::List(cell) => {
            let snapshot = cell.read().clone();
            let mut children = Vec::with_capacity(snapshot.len());
            for item in &snapshot {
                children.push(build_node(item, plan, ns)?);
            }
            plan.alloc(Node::ListLit(children))
        }
        Value::Set(cell) => {
            let snapshot = cell.read().clone();
            let mut children = Vec::with_capacity(snapshot.len());
            for item in snapshot.iter() {
                children.push(build_node(item, plan, ns)?);
            }
            plan.alloc(Node::SetLit(children))
        }
        Value::Dict(cell) => {
            let snapshot = cell.read().clone();
            let mut pairs = Vec::with_capacity(snapshot.len());
            for (key, val) in snapshot.iter() {
                let key_node = build_node(key, plan, ns)?;
                let val_node = build_node(val, plan, ns)?;
                pairs.push((key_node, val_node));
            }
            plan.alloc(Node::DictLit(pairs))
        }
        Value::Tuple(items) => {
            let mut children = Vec::with_capacity(items.len());
            for item in items.iter() {
                children.push(build_node(item, plan, ns)?);
            }
            // A tuple whose members all came out literal is wholly immutable;
            // the duplicate is the tuple itself.
            if children.iter().all(|&c| plan.is_literal(c)) {
                plan.alloc(Node::Const(value.clone()))
            } else {
                plan.alloc(Node::TupleLit(children))
            }
        }
        Value::FrozenSet(set) => {
            let mut children = Vec::with_capacity(set.len());
            for item in set.iter() {
                children.push(build_node(item, plan, ns)?);
            }
            if children.iter().all(|&c| plan.is_literal(c)) {
                plan.alloc(Node::Const(value.clone()))
            } else {
                plan.alloc(Node::FrozenSetLit(children))
            }
        }
        Value::Method(method) => {
            let func = build_node(&method.func, plan, ns)?;
            let receiver = build_node(&method.receiver, plan, ns)?;
            let ctor = ns.capture(&natives::method_new());
            plan.alloc(Node::Call {
                ctor: PlanCtor::Callable(ctor),
                args: SmallVec::from_iter([func, receiver]),
                kwargs: Vec::new(),
            })
        }
        Value::Instance(_) => return build_instance(value, oid, plan, ns),
        // Atoms, natives, classes and modules returned above.
        _ => return Err(not_duplicable(&value.type_name())),
    };
    ns.finish(oid, node);
    Ok(node)
}

/// Lower an instance: custom deep hook, or its decomposition.
fn build_instance(
    value: &Value,
    oid: ObjId,
    plan: &mut Plan,
    ns: &mut Namespace,
) -> DupResult<NodeId> {
    let Value::Instance(cell) = value else {
        return Err(not_duplicable(&value.type_name()));
    };
    let class = cell.read().class().clone();

    // A deep hook owns duplication of its instance entirely. Each invocation
    // gets a fresh, empty alias table: the compiled procedure has no
    // surrounding duplication in flight, so there is nothing to share with.
    if let Some(hook) = class.deep_hook() {
        let hook = hook.clone();
        let source = value.clone();
        let thunk = NativeValue::new("deep_hook", move |_args| {
            (hook.as_ref())(&source, &mut Memo::new())
        });
        let ctor = ns.capture(&Value::Native(thunk));
        let node = plan.alloc(Node::Call {
            ctor: PlanCtor::Callable(ctor),
            args: SmallVec::new(),
            kwargs: Vec::new(),
        });
        ns.finish(oid, node);
        return Ok(node);
    }

    match decompose(value)? {
        Decomposed::Global => {
            let capture = ns.capture(value);
            let node = plan.alloc(Node::Capture(capture));
            ns.finish(oid, node);
            Ok(node)
        }
        Decomposed::Reduction(reduction) => lower_reduction(value, oid, &reduction, plan, ns),
    }
}

fn lower_reduction(
    value: &Value,
    oid: ObjId,
    reduction: &Reduction,
    plan: &mut Plan,
    ns: &mut Namespace,
) -> DupResult<NodeId> {
    let ctor = match &reduction.ctor {
        Ctor::Callable(callee) => PlanCtor::Callable(ns.capture(callee)),
        Ctor::RawAlloc(class) => PlanCtor::RawAlloc(ns.capture(&Value::Class(class.clone()))),
    };

    // Constructor arguments may not reference the instance being built; the
    // in-progress status turns any such reference into a cycle error.
    let mut args = SmallVec::with_capacity(reduction.args.len());
    for arg in &reduction.args {
        args.push(build_node(arg, plan, ns)?);
    }
    let mut kwargs = Vec::with_capacity(reduction.kwargs.len());
    for (name, arg) in &reduction.kwargs {
        kwargs.push((name.clone(), build_node(arg, plan, ns)?));
    }

    let call = plan.alloc(Node::Call { ctor, args, kwargs });
    if !reduction.has_trailing() {
        ns.finish(oid, call);
        return Ok(call);
    }

    // Trailing components may reference the instance itself, so the bare
    // constructed object is bound to a slot and marked finished before any
    // of them are lowered; self-references load the slot.
    let slot = ns.slot_for(&value.type_name());
    let bind = plan.alloc(Node::Bind { slot, inner: call });
    ns.finish(oid, bind);

    let state = match &reduction.state {
        Some(state) => Some(build_node(state, plan, ns)?),
        None => None,
    };
    let seq_items = match &reduction.seq_items {
        Some(items) => {
            let mut nodes = Vec::with_capacity(items.len());
            for item in items {
                nodes.push(build_node(item, plan, ns)?);
            }
            Some(nodes)
        }
        None => None,
    };
    let map_items = match &reduction.map_items {
        Some(pairs) => {
            let mut nodes = Vec::with_capacity(pairs.len());
            for (key, val) in pairs {
                let key_node = build_node(key, plan, ns)?;
                let val_node = build_node(val, plan, ns)?;
                nodes.push((key_node, val_node));
            }
            Some(nodes)
        }
        None => None,
    };

    Ok(plan.alloc(Node::Finalize {
        target: bind,
        state,
        seq_items,
        map_items,
    }))
}

/// Second and later occurrences of a finished identity.
///
/// Literal nodes are cheap and identity-preserving to re-reference directly.
/// Anything else must evaluate exactly once, so the node is promoted into a
/// slot binding in place and this occurrence becomes a load.
fn resolve_back_reference(
    node: NodeId,
    value: &Value,
    plan: &mut Plan,
    ns: &mut Namespace,
) -> DupResult<NodeId> {
    if plan.is_literal(node) {
        return Ok(node);
    }
    if let Node::Bind { slot, .. } = plan.node(node) {
        let slot = *slot;
        return Ok(plan.alloc(Node::Load(slot)));
    }
    let slot = ns.slot_for(&value.type_name());
    plan.promote_to_bind(node, slot);
    Ok(plan.alloc(Node::Load(slot)))
}
