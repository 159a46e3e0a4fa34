//! The plan IR: an arena of construction nodes.
//!
//! A plan is an append-only `Vec` of nodes indexed by `NodeId`. Nodes refer
//! to each other by id, never by reference, so back-references to values that
//! appear more than once are plain indices. When the builder discovers that
//! an already-built node is shared, it promotes the node in place into a
//! `Bind` that stores its result into a procedure slot; later occurrences
//! load from that slot.

use std::fmt;

use smallvec::SmallVec;

use crate::value::Value;

/// Index of a node in the plan arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn new(index: usize) -> Self {
        NodeId(u32::try_from(index).expect("plan arena exceeds u32 indexing"))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Index of a per-invocation procedure slot.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct SlotId(u32);

impl SlotId {
    #[inline]
    pub fn new(index: usize) -> Self {
        SlotId(u32::try_from(index).expect("slot table exceeds u32 indexing"))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Index into the compilation's capture table (values shared with the
/// source, never duplicated).
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct CaptureId(u32);

impl CaptureId {
    #[inline]
    pub fn new(index: usize) -> Self {
        CaptureId(u32::try_from(index).expect("capture table exceeds u32 indexing"))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Constructor reference inside a `Call` node.
#[derive(Clone, Debug)]
pub enum PlanCtor {
    /// Call a captured callable.
    Callable(CaptureId),
    /// Raw-allocate a captured class.
    RawAlloc(CaptureId),
}

/// One construction step.
#[derive(Clone, Debug)]
pub enum Node {
    /// Clone a pre-built immutable value.
    Const(Value),
    /// Share a captured value with the source, identically.
    Capture(CaptureId),
    /// Load a previously bound result.
    Load(SlotId),
    /// Evaluate `inner` and store the result in `slot` before yielding it.
    Bind { slot: SlotId, inner: NodeId },
    /// Fresh list from element nodes.
    ListLit(Vec<NodeId>),
    /// Fresh set from element nodes.
    SetLit(Vec<NodeId>),
    /// Fresh tuple from element nodes.
    TupleLit(Vec<NodeId>),
    /// Fresh frozen set from element nodes.
    FrozenSetLit(Vec<NodeId>),
    /// Fresh dict from key/value node pairs.
    DictLit(Vec<(NodeId, NodeId)>),
    /// Invoke a constructor with argument nodes.
    Call {
        ctor: PlanCtor,
        args: SmallVec<[NodeId; 4]>,
        kwargs: Vec<(String, NodeId)>,
    },
    /// Apply reconstruction state and trailing items to `target`, then yield
    /// the populated target.
    Finalize {
        target: NodeId,
        state: Option<NodeId>,
        seq_items: Option<Vec<NodeId>>,
        map_items: Option<Vec<(NodeId, NodeId)>>,
    },
}

/// Arena of construction nodes for one compilation.
#[derive(Debug, Default)]
pub struct Plan {
    nodes: Vec<Node>,
}

impl Plan {
    pub fn new() -> Self {
        Plan::default()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Cheap to re-evaluate: no allocation, no identity of its own.
    pub fn is_literal(&self, id: NodeId) -> bool {
        matches!(self.node(id), Node::Const(_) | Node::Capture(_))
    }

    /// Promote an existing node into a slot binding, in place.
    ///
    /// The node's current body moves to a fresh arena entry and the original
    /// id becomes `Bind { slot, inner }`, so every existing reference to the
    /// id now observes the store. Returns the id of the moved body.
    pub fn promote_to_bind(&mut self, id: NodeId, slot: SlotId) -> NodeId {
        let body = std::mem::replace(&mut self.nodes[id.index()], Node::Const(Value::Unit));
        let inner = self.alloc(body);
        self.nodes[id.index()] = Node::Bind { slot, inner };
        inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promote_to_bind_rewrites_in_place() {
        let mut plan = Plan::new();
        let a = plan.alloc(Node::Const(Value::Int(1)));
        let list = plan.alloc(Node::ListLit(vec![a]));

        let slot = SlotId::new(0);
        let inner = plan.promote_to_bind(list, slot);

        match plan.node(list) {
            Node::Bind { slot: s, inner: i } => {
                assert_eq!(*s, slot);
                assert_eq!(*i, inner);
            }
            other => panic!("expected Bind, got {other:?}"),
        }
        assert!(matches!(plan.node(inner), Node::ListLit(items) if items == &[a]));
    }

    #[test]
    fn test_literal_nodes() {
        let mut plan = Plan::new();
        let c = plan.alloc(Node::Const(Value::Int(1)));
        let cap = plan.alloc(Node::Capture(CaptureId::new(0)));
        let list = plan.alloc(Node::ListLit(vec![c]));
        assert!(plan.is_literal(c));
        assert!(plan.is_literal(cap));
        assert!(!plan.is_literal(list));
    }
}
