//! Code generation: compiling a plan into a reusable procedure.
//!
//! Each node compiles to a boxed closure over a `Frame` of per-invocation
//! slots. The closures nest the same way the nodes do, so evaluation order
//! matches construction order in the plan. A `CodeBuilder` is created per
//! compilation and consumed by it; nothing is shared between compilations
//! except the immutable captures baked into the closures.

use std::fmt;
use std::sync::Arc;

use duper_ir::hook_error;
use duper_ir::namespace::Namespace;
use duper_ir::plan::{Node, NodeId, Plan, PlanCtor, SlotId};
use duper_ir::value::call_callable;
use duper_ir::{not_callable, DupResult, Value};

use crate::reconstruct::reconstruct_state;

/// Compiled evaluator for one plan node.
pub type Thunk = Box<dyn Fn(&mut Frame) -> DupResult<Value> + Send + Sync>;

/// Per-invocation slot storage.
///
/// A fresh frame is allocated for every procedure call, which is what makes
/// one compiled procedure safe to invoke concurrently.
pub struct Frame {
    slots: Vec<Value>,
}

impl Frame {
    fn new(slot_count: usize) -> Self {
        Frame {
            slots: vec![Value::Unit; slot_count],
        }
    }

    pub fn load(&self, slot: SlotId) -> Value {
        self.slots[slot.index()].clone()
    }

    pub fn store(&mut self, slot: SlotId, value: Value) {
        self.slots[slot.index()] = value;
    }
}

/// A reusable zero-argument duplication procedure.
///
/// Cloning is cheap (the compiled body is shared) and calls are independent:
/// each invocation runs against a fresh frame and produces a fresh result.
#[derive(Clone)]
pub struct Procedure {
    name: String,
    slot_count: usize,
    body: Arc<dyn Fn(&mut Frame) -> DupResult<Value> + Send + Sync>,
}

impl Procedure {
    pub(crate) fn new(name: String, slot_count: usize, body: Thunk) -> Self {
        Procedure {
            name,
            slot_count,
            body: Arc::from(body),
        }
    }

    /// Wrap a slotless closure as a procedure.
    pub fn from_fn(
        name: impl Into<String>,
        f: impl Fn() -> DupResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Procedure {
            name: name.into(),
            slot_count: 0,
            body: Arc::new(move |_frame| f()),
        }
    }

    /// Produce one duplicate.
    pub fn call(&self) -> DupResult<Value> {
        let mut frame = Frame::new(self.slot_count);
        (self.body.as_ref())(&mut frame)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("name", &self.name)
            .field("slots", &self.slot_count)
            .finish()
    }
}

/// Compiles plan nodes into thunks. One builder per compilation.
pub struct CodeBuilder<'p> {
    plan: &'p Plan,
    namespace: &'p Namespace,
}

impl<'p> CodeBuilder<'p> {
    pub fn new(plan: &'p Plan, namespace: &'p Namespace) -> Self {
        CodeBuilder { plan, namespace }
    }

    /// Compile from the root node into a finished procedure.
    pub fn finish(&self, root: NodeId, name: impl Into<String>) -> DupResult<Procedure> {
        let body = self.compile_node(root)?;
        Ok(Procedure::new(
            name.into(),
            self.namespace.slot_count(),
            body,
        ))
    }

    fn compile_node(&self, id: NodeId) -> DupResult<Thunk> {
        Ok(match self.plan.node(id) {
            Node::Const(value) => {
                let value = value.clone();
                Box::new(move |_frame| Ok(value.clone()))
            }
            Node::Capture(capture) => {
                let value = self.namespace.captured(*capture).clone();
                Box::new(move |_frame| Ok(value.clone()))
            }
            Node::Load(slot) => {
                let slot = *slot;
                Box::new(move |frame| Ok(frame.load(slot)))
            }
            Node::Bind { slot, inner } => {
                let slot = *slot;
                let inner = self.compile_node(*inner)?;
                Box::new(move |frame| {
                    let value = inner(frame)?;
                    frame.store(slot, value.clone());
                    Ok(value)
                })
            }
            Node::ListLit(items) => {
                let items = self.compile_all(items)?;
                Box::new(move |frame| {
                    let mut out = Vec::with_capacity(items.len());
                    for item in &items {
                        out.push(item(frame)?);
                    }
                    Ok(Value::list(out))
                })
            }
            Node::SetLit(items) => {
                let items = self.compile_all(items)?;
                Box::new(move |frame| {
                    let mut out = Vec::with_capacity(items.len());
                    for item in &items {
                        out.push(item(frame)?);
                    }
                    Ok(Value::set(out))
                })
            }
            Node::TupleLit(items) => {
                let items = self.compile_all(items)?;
                Box::new(move |frame| {
                    let mut out = Vec::with_capacity(items.len());
                    for item in &items {
                        out.push(item(frame)?);
                    }
                    Ok(Value::tuple(out))
                })
            }
            Node::FrozenSetLit(items) => {
                let items = self.compile_all(items)?;
                Box::new(move |frame| {
                    let mut out = Vec::with_capacity(items.len());
                    for item in &items {
                        out.push(item(frame)?);
                    }
                    Ok(Value::frozenset(out))
                })
            }
            Node::DictLit(pairs) => {
                let pairs = self.compile_pairs(pairs)?;
                Box::new(move |frame| {
                    let mut out = Vec::with_capacity(pairs.len());
                    for (key, value) in &pairs {
                        out.push((key(frame)?, value(frame)?));
                    }
                    Ok(Value::dict(out))
                })
            }
            Node::Call { ctor, args, kwargs } => self.compile_call(ctor, args, kwargs)?,
            Node::Finalize {
                target,
                state,
                seq_items,
                map_items,
            } => {
                let target = self.compile_node(*target)?;
                let state = match state {
                    Some(node) => Some(self.compile_node(*node)?),
                    None => None,
                };
                let seq_items = match seq_items {
                    Some(items) => Some(self.compile_all(items)?),
                    None => None,
                };
                let map_items = match map_items {
                    Some(pairs) => Some(self.compile_pairs(pairs)?),
                    None => None,
                };
                Box::new(move |frame| {
                    let object = target(frame)?;
                    let state = match &state {
                        Some(thunk) => Some(thunk(frame)?),
                        None => None,
                    };
                    let seq = match &seq_items {
                        Some(items) => {
                            let mut out = Vec::with_capacity(items.len());
                            for item in items {
                                out.push(item(frame)?);
                            }
                            Some(out)
                        }
                        None => None,
                    };
                    let map = match &map_items {
                        Some(pairs) => {
                            let mut out = Vec::with_capacity(pairs.len());
                            for (key, value) in pairs {
                                out.push((key(frame)?, value(frame)?));
                            }
                            Some(out)
                        }
                        None => None,
                    };
                    reconstruct_state(&object, state.as_ref(), seq.as_deref(), map.as_deref())?;
                    Ok(object)
                })
            }
        })
    }

    fn compile_call(
        &self,
        ctor: &PlanCtor,
        args: &[NodeId],
        kwargs: &[(String, NodeId)],
    ) -> DupResult<Thunk> {
        let arg_thunks = self.compile_all(args)?;
        let mut kwarg_thunks = Vec::with_capacity(kwargs.len());
        for (name, node) in kwargs {
            kwarg_thunks.push((name.clone(), self.compile_node(*node)?));
        }

        match ctor {
            PlanCtor::Callable(capture) => {
                // Keyword arguments only survive parsing attached to a raw
                // allocation; a plain callable never carries them.
                if !kwarg_thunks.is_empty() {
                    return Err(hook_error(
                        "keyword arguments require a raw-allocating constructor",
                    ));
                }
                let callee = self.namespace.captured(*capture).clone();
                Ok(Box::new(move |frame| {
                    let mut args = Vec::with_capacity(arg_thunks.len());
                    for arg in &arg_thunks {
                        args.push(arg(frame)?);
                    }
                    call_callable(&callee, &args)
                }))
            }
            PlanCtor::RawAlloc(capture) => {
                let Value::Class(class) = self.namespace.captured(*capture).clone() else {
                    return Err(not_callable(
                        &self.namespace.captured(*capture).type_name(),
                    ));
                };
                Ok(Box::new(move |frame| {
                    let mut args = Vec::with_capacity(arg_thunks.len());
                    for arg in &arg_thunks {
                        args.push(arg(frame)?);
                    }
                    let mut kwargs = Vec::with_capacity(kwarg_thunks.len());
                    for (name, thunk) in &kwarg_thunks {
                        kwargs.push((name.clone(), thunk(frame)?));
                    }
                    class.raw_alloc(&args, &kwargs)
                }))
            }
        }
    }

    fn compile_all(&self, nodes: &[NodeId]) -> DupResult<Vec<Thunk>> {
        nodes.iter().map(|&node| self.compile_node(node)).collect()
    }

    fn compile_pairs(&self, pairs: &[(NodeId, NodeId)]) -> DupResult<Vec<(Thunk, Thunk)>> {
        pairs
            .iter()
            .map(|&(key, value)| Ok((self.compile_node(key)?, self.compile_node(value)?)))
            .collect()
    }
}
