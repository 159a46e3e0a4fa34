//! Alias table threaded through a single duplication operation.

use rustc_hash::FxHashMap;

use crate::obj_id::ObjId;
use crate::value::Value;

/// Maps source identities to their already-produced duplicates so one source
/// object is never duplicated twice within the same operation.
///
/// Used by deep-duplication hooks and by the generic fallback duplicator.
/// The plan compiler does not thread a memo; its namespace plays that role
/// at compile time instead.
#[derive(Clone, Debug, Default)]
pub struct Memo {
    entries: FxHashMap<ObjId, Value>,
}

impl Memo {
    pub fn new() -> Self {
        Memo::default()
    }

    pub fn get(&self, id: ObjId) -> Option<&Value> {
        self.entries.get(&id)
    }

    pub fn insert(&mut self, id: ObjId, duplicate: Value) {
        self.entries.insert(id, duplicate);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
