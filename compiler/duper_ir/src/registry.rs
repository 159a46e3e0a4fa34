//! Global reducer dispatch table.
//!
//! Reducers registered here take priority over a class's own reduce hooks,
//! which lets callers override decomposition for types they do not control.
//! The table is process-wide and keyed by class identity.

use std::sync::LazyLock;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::DupResult;
use crate::value::{ClassId, ClassRef, ReduceFn, Value};

static DISPATCH_TABLE: LazyLock<RwLock<FxHashMap<ClassId, ReduceFn>>> =
    LazyLock::new(|| RwLock::new(FxHashMap::default()));

/// Register a reducer for a class, replacing any previous registration.
pub fn register_reducer(
    class: &ClassRef,
    reducer: impl Fn(&Value) -> DupResult<Value> + Send + Sync + 'static,
) {
    DISPATCH_TABLE
        .write()
        .insert(class.id(), std::sync::Arc::new(reducer));
}

/// Remove a class's registered reducer. Returns true if one was present.
pub fn unregister_reducer(class: &ClassRef) -> bool {
    DISPATCH_TABLE.write().remove(&class.id()).is_some()
}

/// Look up the registered reducer for a class identity.
pub fn registered_reducer(class_id: ClassId) -> Option<ReduceFn> {
    DISPATCH_TABLE.read().get(&class_id).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompose::{decompose, Decomposed};
    use crate::errors::DupError;
    use crate::value::ClassDef;

    #[test]
    fn test_registered_reducer_takes_priority() {
        let class = ClassDef::builder("Wrapped")
            .with_reduce(|_| Ok(Value::string("CLASS_HOOK")))
            .build();
        register_reducer(&class, |_| {
            Ok(Value::tuple(vec![
                crate::value::natives::new_obj(),
                Value::tuple(vec![]),
            ]))
        });

        // The registered reduction is malformed (new_obj without a class
        // argument); its parse error surfacing instead of the class hook's
        // global answer proves the table was consulted first.
        let err = decompose(&Value::instance(class.clone())).unwrap_err();
        assert!(matches!(err, DupError::Hook(_)));

        assert!(unregister_reducer(&class));
        let decomposed = decompose(&Value::instance(class.clone())).unwrap();
        assert!(matches!(decomposed, Decomposed::Global));
        assert!(!unregister_reducer(&class));
    }
}
