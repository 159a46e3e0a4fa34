//! Runtime values the copy-plan compiler operates on.
//!
//! # Heap Enforcement
//!
//! All heap allocation goes through factory methods on `Value`; the `Heap`
//! and `MutHeap` wrappers have crate-private constructors, so external code
//! cannot create heap values directly:
//!
//! ```text
//! let s = Value::string("hello");       // OK
//! let list = Value::list(vec![]);       // OK
//! let bad = Value::Str(Heap::new(..));  // ERROR: Heap::new is pub(crate)
//! ```
//!
//! # Identity vs. equality
//!
//! `==` is deep value equality (dict/set equality is order-insensitive, like
//! the containers themselves). `is_identical` compares heap identity and is
//! the test duplication invariants are stated in: two positions sharing one
//! identity in a source must share one identity in every produced copy.

mod class;
mod composite;
mod heap;
pub mod natives;

use std::fmt;

use crate::obj_id::ObjId;

pub use class::{
    call_callable, AppendFn, ClassBuilder, ClassDef, ClassId, ClassRef, ConstructFn, CopyHookFn,
    DeepHookFn, Instance, NativeImpl, NativeKind, NativeValue, ReduceExFn, ReduceFn, SetItemFn,
    SetStateFn,
};
pub use composite::{AttrMap, BoundMethod, DictValue, ModuleDef, SetValue};
pub use heap::{Heap, MutHeap};

/// A value in the dynamic object model.
#[derive(Clone)]
pub enum Value {
    // Atoms (inline or immutable heap; never duplicated by identity)
    /// Null-like sentinel singleton.
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Heap<String>),
    Bytes(Heap<Vec<u8>>),

    // Non-literal immutables (captured by reference, never duplicated)
    /// Host-implemented callable.
    Native(NativeValue),
    /// A class object itself.
    Class(ClassRef),
    /// Opaque module-like singleton.
    Module(Heap<ModuleDef>),

    // Builtin collections
    List(MutHeap<Vec<Value>>),
    Set(MutHeap<SetValue>),
    Dict(MutHeap<DictValue>),
    Tuple(Heap<Vec<Value>>),
    FrozenSet(Heap<SetValue>),

    // Objects
    /// A function bound to a receiver.
    Method(Heap<BoundMethod>),
    /// Instance of a user-defined class.
    Instance(MutHeap<Instance>),
}

/// Closed type tag for dispatch over value shapes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Kind {
    Unit,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    Native,
    Class,
    Module,
    List,
    Set,
    Dict,
    Tuple,
    FrozenSet,
    Method,
    Instance,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Unit => "unit",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Str => "str",
            Kind::Bytes => "bytes",
            Kind::Native => "native",
            Kind::Class => "class",
            Kind::Module => "module",
            Kind::List => "list",
            Kind::Set => "set",
            Kind::Dict => "dict",
            Kind::Tuple => "tuple",
            Kind::FrozenSet => "frozenset",
            Kind::Method => "method",
            Kind::Instance => "instance",
        }
    }
}

// Factory methods (the only way to construct heap values)

impl Value {
    #[inline]
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Heap::new(s.into()))
    }

    #[inline]
    pub fn bytes(bytes: Vec<u8>) -> Self {
        Value::Bytes(Heap::new(bytes))
    }

    #[inline]
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(MutHeap::new(items))
    }

    /// Create a set value, deduplicating the given items.
    #[inline]
    pub fn set(items: Vec<Value>) -> Self {
        Value::Set(MutHeap::new(SetValue::from_items(items)))
    }

    #[inline]
    pub fn set_value(set: SetValue) -> Self {
        Value::Set(MutHeap::new(set))
    }

    /// Create a dict value from key/value pairs, keeping insertion order.
    #[inline]
    pub fn dict(pairs: Vec<(Value, Value)>) -> Self {
        Value::Dict(MutHeap::new(DictValue::from_pairs(pairs)))
    }

    #[inline]
    pub fn dict_value(dict: DictValue) -> Self {
        Value::Dict(MutHeap::new(dict))
    }

    #[inline]
    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Heap::new(items))
    }

    #[inline]
    pub fn frozenset(items: Vec<Value>) -> Self {
        Value::FrozenSet(Heap::new(SetValue::from_items(items)))
    }

    #[inline]
    pub fn frozenset_value(set: SetValue) -> Self {
        Value::FrozenSet(Heap::new(set))
    }

    #[inline]
    pub fn module(name: impl Into<String>) -> Self {
        Value::Module(Heap::new(ModuleDef::new(name)))
    }

    #[inline]
    pub fn method(func: Value, receiver: Value) -> Self {
        Value::Method(Heap::new(BoundMethod { func, receiver }))
    }

    /// Fresh instance with empty attribute storage.
    #[inline]
    pub fn instance(class: ClassRef) -> Self {
        Value::Instance(MutHeap::new(Instance::new(class, AttrMap::new())))
    }

    #[inline]
    pub fn instance_with_attrs(class: ClassRef, attrs: AttrMap) -> Self {
        Value::Instance(MutHeap::new(Instance::new(class, attrs)))
    }
}

// Classification predicates and identity

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Unit => Kind::Unit,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Str(_) => Kind::Str,
            Value::Bytes(_) => Kind::Bytes,
            Value::Native(_) => Kind::Native,
            Value::Class(_) => Kind::Class,
            Value::Module(_) => Kind::Module,
            Value::List(_) => Kind::List,
            Value::Set(_) => Kind::Set,
            Value::Dict(_) => Kind::Dict,
            Value::Tuple(_) => Kind::Tuple,
            Value::FrozenSet(_) => Kind::FrozenSet,
            Value::Method(_) => Kind::Method,
            Value::Instance(_) => Kind::Instance,
        }
    }

    /// Type name for diagnostics; instances report their class name.
    pub fn type_name(&self) -> String {
        match self {
            Value::Instance(cell) => cell.read().class().name().to_string(),
            other => other.kind().name().to_string(),
        }
    }

    /// Literal atoms: scalars plus immutable text and bytes.
    pub fn is_atom(&self) -> bool {
        matches!(
            self,
            Value::Unit
                | Value::Bool(_)
                | Value::Int(_)
                | Value::Float(_)
                | Value::Str(_)
                | Value::Bytes(_)
        )
    }

    /// Atomic immutable values are never duplicated: a "copy" is the value
    /// itself. Covers atoms plus functions and classes.
    pub fn is_atomic_immutable(&self) -> bool {
        self.is_atom() || matches!(self, Value::Native(_) | Value::Class(_))
    }

    /// Immutable for the purposes of shallow duplication.
    pub fn is_shallow_immutable(&self) -> bool {
        self.is_atomic_immutable()
            || matches!(
                self,
                Value::Tuple(_) | Value::FrozenSet(_) | Value::Method(_) | Value::Module(_)
            )
    }

    pub fn is_builtin_collection(&self) -> bool {
        matches!(
            self,
            Value::List(_) | Value::Set(_) | Value::Dict(_) | Value::Tuple(_) | Value::FrozenSet(_)
        )
    }

    /// `Some(is_empty)` for builtin collections, `None` otherwise.
    pub fn collection_is_empty(&self) -> Option<bool> {
        match self {
            Value::List(cell) => Some(cell.read().is_empty()),
            Value::Set(cell) => Some(cell.read().is_empty()),
            Value::Dict(cell) => Some(cell.read().is_empty()),
            Value::Tuple(items) => Some(items.is_empty()),
            Value::FrozenSet(set) => Some(set.is_empty()),
            _ => None,
        }
    }

    /// Identity of a heap-backed value; inline scalars have none.
    pub fn obj_id(&self) -> Option<ObjId> {
        let addr = match self {
            Value::Unit | Value::Bool(_) | Value::Int(_) | Value::Float(_) => return None,
            Value::Str(h) => h.ptr_id(),
            Value::Bytes(h) => h.ptr_id(),
            Value::Native(n) => n.ptr_id(),
            Value::Class(c) => c.ptr_id(),
            Value::Module(h) => h.ptr_id(),
            Value::List(h) => h.ptr_id(),
            Value::Set(h) => h.ptr_id(),
            Value::Dict(h) => h.ptr_id(),
            Value::Tuple(h) => h.ptr_id(),
            Value::FrozenSet(h) => h.ptr_id(),
            Value::Method(h) => h.ptr_id(),
            Value::Instance(h) => h.ptr_id(),
        };
        Some(ObjId::new(addr))
    }

    /// The `is` test: same identity, or equal inline scalar.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self.obj_id(), other.obj_id()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self == other,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Heap::ptr_eq(a, b) || **a == **b,
            (Value::Bytes(a), Value::Bytes(b)) => Heap::ptr_eq(a, b) || **a == **b,
            (Value::Native(a), Value::Native(b)) => a.ptr_id() == b.ptr_id(),
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => Heap::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => MutHeap::ptr_eq(a, b) || *a.read() == *b.read(),
            (Value::Set(a), Value::Set(b)) => MutHeap::ptr_eq(a, b) || *a.read() == *b.read(),
            (Value::Dict(a), Value::Dict(b)) => MutHeap::ptr_eq(a, b) || *a.read() == *b.read(),
            (Value::Tuple(a), Value::Tuple(b)) => Heap::ptr_eq(a, b) || **a == **b,
            (Value::FrozenSet(a), Value::FrozenSet(b)) => Heap::ptr_eq(a, b) || **a == **b,
            (Value::Method(a), Value::Method(b)) => {
                Heap::ptr_eq(a, b) || (a.func == b.func && a.receiver == b.receiver)
            }
            (Value::Instance(a), Value::Instance(b)) => {
                MutHeap::ptr_eq(a, b) || {
                    let (a, b) = (a.read(), b.read());
                    a.class() == b.class() && a.attrs() == b.attrs()
                }
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    /// Shallow debug representation; container contents are summarized so
    /// cyclic graphs produced by the fallback duplicator never recurse.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "Unit"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({:?})", &**s),
            Value::Bytes(b) => write!(f, "Bytes(len={})", b.len()),
            Value::Native(n) => write!(f, "Native({})", n.name()),
            Value::Class(c) => write!(f, "Class({})", c.name()),
            Value::Module(m) => write!(f, "Module({})", m.name()),
            Value::List(cell) => write!(f, "List(len={})", cell.read().len()),
            Value::Set(cell) => write!(f, "Set(len={})", cell.read().len()),
            Value::Dict(cell) => write!(f, "Dict(len={})", cell.read().len()),
            Value::Tuple(items) => write!(f, "Tuple(len={})", items.len()),
            Value::FrozenSet(set) => write!(f, "FrozenSet(len={})", set.len()),
            Value::Method(_) => write!(f, "Method"),
            Value::Instance(cell) => write!(f, "Instance({})", cell.read().class().name()),
        }
    }
}
