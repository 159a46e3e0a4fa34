//! Classes, instances and native callables.
//!
//! A `ClassDef` carries the full capability set of the decomposition
//! protocol as optional hooks, resolved once when the class is built. The
//! plan builder and the state reconstructor dispatch on these capabilities
//! directly; there is no per-value probing.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::errors::{ctor_args, not_callable, DupResult};
use crate::memo::Memo;
use crate::value::{AttrMap, Value};

/// Deep-duplication hook: `(source, alias table) -> duplicate`.
pub type DeepHookFn = Arc<dyn Fn(&Value, &mut Memo) -> DupResult<Value> + Send + Sync>;
/// Shallow-duplication hook: `(source) -> one-level duplicate`.
pub type CopyHookFn = Arc<dyn Fn(&Value) -> DupResult<Value> + Send + Sync>;
/// Extended decomposition hook, invoked with the protocol version.
pub type ReduceExFn = Arc<dyn Fn(&Value, u8) -> DupResult<Value> + Send + Sync>;
/// Basic decomposition hook.
pub type ReduceFn = Arc<dyn Fn(&Value) -> DupResult<Value> + Send + Sync>;
/// Custom state-setting hook: `(instance, state)`.
pub type SetStateFn = Arc<dyn Fn(&Value, &Value) -> DupResult<()> + Send + Sync>;
/// Append-based population hook: `(instance, item)`.
pub type AppendFn = Arc<dyn Fn(&Value, Value) -> DupResult<()> + Send + Sync>;
/// Subscript-based population hook: `(instance, key, value)`.
pub type SetItemFn = Arc<dyn Fn(&Value, Value, Value) -> DupResult<()> + Send + Sync>;
/// Constructor hook: `(class, args, kwargs) -> instance`.
pub type ConstructFn = Arc<dyn Fn(&ClassRef, &[Value], &[(String, Value)]) -> DupResult<Value> + Send + Sync>;

/// Process-unique class identity; keys the global reducer dispatch table.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct ClassId(u64);

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(0);

/// A user-defined type in the value model.
pub struct ClassDef {
    id: ClassId,
    name: String,
    opaque: bool,
    deep_hook: Option<DeepHookFn>,
    copy_hook: Option<CopyHookFn>,
    reduce_ex: Option<ReduceExFn>,
    reduce: Option<ReduceFn>,
    set_state: Option<SetStateFn>,
    append: Option<AppendFn>,
    set_item: Option<SetItemFn>,
    construct: Option<ConstructFn>,
    raw_new: Option<ConstructFn>,
}

impl ClassDef {
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            opaque: false,
            deep_hook: None,
            copy_hook: None,
            reduce_ex: None,
            reduce: None,
            set_state: None,
            append: None,
            set_item: None,
            construct: None,
            raw_new: None,
        }
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassDef({})", self.name)
    }
}

/// Shared handle to a class definition. Compared by class identity.
#[derive(Clone)]
pub struct ClassRef(Arc<ClassDef>);

impl ClassRef {
    pub fn id(&self) -> ClassId {
        self.0.id
    }

    /// Allocation address of the definition, used as value identity.
    pub fn ptr_id(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Marked as having no usable decomposition.
    pub fn is_opaque(&self) -> bool {
        self.0.opaque
    }

    pub fn deep_hook(&self) -> Option<&DeepHookFn> {
        self.0.deep_hook.as_ref()
    }

    pub fn copy_hook(&self) -> Option<&CopyHookFn> {
        self.0.copy_hook.as_ref()
    }

    pub fn reduce_ex(&self) -> Option<&ReduceExFn> {
        self.0.reduce_ex.as_ref()
    }

    pub fn reduce(&self) -> Option<&ReduceFn> {
        self.0.reduce.as_ref()
    }

    pub fn set_state(&self) -> Option<&SetStateFn> {
        self.0.set_state.as_ref()
    }

    pub fn append(&self) -> Option<&AppendFn> {
        self.0.append.as_ref()
    }

    pub fn set_item(&self) -> Option<&SetItemFn> {
        self.0.set_item.as_ref()
    }

    /// Class call: the `construct` hook, or a fresh empty instance when the
    /// class takes no constructor arguments.
    pub fn call(&self, args: &[Value]) -> DupResult<Value> {
        if let Some(construct) = &self.0.construct {
            return (construct.as_ref())(self, args, &[]);
        }
        if args.is_empty() {
            return Ok(Value::instance(self.clone()));
        }
        Err(ctor_args(self.name(), args.len()))
    }

    /// Raw allocation, bypassing the class-call constructor.
    ///
    /// Without a `raw_new` hook, positional arguments are ignored and
    /// keyword arguments become initial attributes.
    pub fn raw_alloc(&self, args: &[Value], kwargs: &[(String, Value)]) -> DupResult<Value> {
        if let Some(raw_new) = &self.0.raw_new {
            return (raw_new.as_ref())(self, args, kwargs);
        }
        let mut attrs = AttrMap::new();
        for (name, value) in kwargs {
            attrs.insert(name.clone(), value.clone());
        }
        Ok(Value::instance_with_attrs(self.clone(), attrs))
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ClassRef {}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({})", self.name())
    }
}

/// Builder for class definitions.
pub struct ClassBuilder {
    name: String,
    opaque: bool,
    deep_hook: Option<DeepHookFn>,
    copy_hook: Option<CopyHookFn>,
    reduce_ex: Option<ReduceExFn>,
    reduce: Option<ReduceFn>,
    set_state: Option<SetStateFn>,
    append: Option<AppendFn>,
    set_item: Option<SetItemFn>,
    construct: Option<ConstructFn>,
    raw_new: Option<ConstructFn>,
}

impl ClassBuilder {
    /// Mark the class as having no usable decomposition at all.
    pub fn opaque(mut self) -> Self {
        self.opaque = true;
        self
    }

    pub fn with_deep_hook(
        mut self,
        hook: impl Fn(&Value, &mut Memo) -> DupResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.deep_hook = Some(Arc::new(hook));
        self
    }

    pub fn with_copy_hook(
        mut self,
        hook: impl Fn(&Value) -> DupResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.copy_hook = Some(Arc::new(hook));
        self
    }

    pub fn with_reduce_ex(
        mut self,
        hook: impl Fn(&Value, u8) -> DupResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.reduce_ex = Some(Arc::new(hook));
        self
    }

    pub fn with_reduce(
        mut self,
        hook: impl Fn(&Value) -> DupResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.reduce = Some(Arc::new(hook));
        self
    }

    pub fn with_set_state(
        mut self,
        hook: impl Fn(&Value, &Value) -> DupResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.set_state = Some(Arc::new(hook));
        self
    }

    pub fn with_append(
        mut self,
        hook: impl Fn(&Value, Value) -> DupResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.append = Some(Arc::new(hook));
        self
    }

    pub fn with_set_item(
        mut self,
        hook: impl Fn(&Value, Value, Value) -> DupResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.set_item = Some(Arc::new(hook));
        self
    }

    pub fn with_construct(
        mut self,
        hook: impl Fn(&ClassRef, &[Value], &[(String, Value)]) -> DupResult<Value>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.construct = Some(Arc::new(hook));
        self
    }

    pub fn with_raw_new(
        mut self,
        hook: impl Fn(&ClassRef, &[Value], &[(String, Value)]) -> DupResult<Value>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.raw_new = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> ClassRef {
        ClassRef(Arc::new(ClassDef {
            id: ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed)),
            name: self.name,
            opaque: self.opaque,
            deep_hook: self.deep_hook,
            copy_hook: self.copy_hook,
            reduce_ex: self.reduce_ex,
            reduce: self.reduce,
            set_state: self.set_state,
            append: self.append,
            set_item: self.set_item,
            construct: self.construct,
            raw_new: self.raw_new,
        }))
    }
}

/// An instance of a user-defined class.
#[derive(Clone, Debug)]
pub struct Instance {
    class: ClassRef,
    attrs: AttrMap,
}

impl Instance {
    pub(crate) fn new(class: ClassRef, attrs: AttrMap) -> Self {
        Instance { class, attrs }
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn attrs(&self) -> &AttrMap {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut AttrMap {
        &mut self.attrs
    }
}

/// Tag distinguishing the two well-known wrapper constructors from plain
/// natives, so debunking is a closed-enum dispatch rather than name probing.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum NativeKind {
    Plain,
    NewObj,
    NewObjKw,
}

/// Shared implementation of a native callable.
pub type NativeImpl = Arc<dyn Fn(&[Value]) -> DupResult<Value> + Send + Sync>;

/// A callable implemented by the host, not by the value model.
#[derive(Clone)]
pub struct NativeValue {
    name: &'static str,
    kind: NativeKind,
    f: NativeImpl,
}

impl NativeValue {
    pub fn new(
        name: &'static str,
        f: impl Fn(&[Value]) -> DupResult<Value> + Send + Sync + 'static,
    ) -> Self {
        NativeValue {
            name,
            kind: NativeKind::Plain,
            f: Arc::new(f),
        }
    }

    pub(crate) fn with_kind(
        name: &'static str,
        kind: NativeKind,
        f: impl Fn(&[Value]) -> DupResult<Value> + Send + Sync + 'static,
    ) -> Self {
        NativeValue {
            name,
            kind,
            f: Arc::new(f),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> NativeKind {
        self.kind
    }

    pub fn call(&self, args: &[Value]) -> DupResult<Value> {
        (self.f.as_ref())(args)
    }

    /// Identity of the underlying implementation.
    pub fn ptr_id(&self) -> usize {
        Arc::as_ptr(&self.f).cast::<()>() as usize
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeValue({})", self.name)
    }
}

/// Call a callable value with positional arguments.
pub fn call_callable(callee: &Value, args: &[Value]) -> DupResult<Value> {
    match callee {
        Value::Native(native) => native.call(args),
        Value::Class(class) => class.call(args),
        other => Err(not_callable(&other.type_name())),
    }
}
