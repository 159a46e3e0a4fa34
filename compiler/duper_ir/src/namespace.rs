//! Per-compilation symbol table.
//!
//! The namespace tracks three things while a plan is built:
//!
//! - the build status of every heap identity encountered, which is how
//!   sharing is detected (revisiting a finished identity) and how cycles are
//!   detected (revisiting an in-progress identity)
//! - the capture table of values shared with the source rather than
//!   duplicated, deduplicated by identity
//! - the slot table for results that must be stored and re-loaded, with
//!   readable names derived from type-name hints

use rustc_hash::{FxHashMap, FxHashSet};

use crate::obj_id::ObjId;
use crate::plan::{CaptureId, NodeId, SlotId};
use crate::value::Value;

/// Build status of one heap identity.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Status {
    /// The identity's node is being built; seeing it again is a cycle.
    InProgress,
    /// The identity's node is complete.
    Finished(NodeId),
}

/// Symbol table for one compilation.
#[derive(Debug, Default)]
pub struct Namespace {
    statuses: FxHashMap<ObjId, Status>,
    captures: Vec<Value>,
    capture_index: FxHashMap<ObjId, CaptureId>,
    slot_names: Vec<String>,
    used_names: FxHashSet<String>,
}

impl Namespace {
    pub fn new() -> Self {
        Namespace::default()
    }

    pub fn status(&self, id: ObjId) -> Option<Status> {
        self.statuses.get(&id).copied()
    }

    pub fn mark_in_progress(&mut self, id: ObjId) {
        self.statuses.insert(id, Status::InProgress);
    }

    pub fn finish(&mut self, id: ObjId, node: NodeId) {
        self.statuses.insert(id, Status::Finished(node));
    }

    /// Intern a value into the capture table, deduplicating by identity.
    /// Scalars without identity are never interned here; the builder emits
    /// them as constants.
    pub fn capture(&mut self, value: &Value) -> CaptureId {
        if let Some(id) = value.obj_id() {
            if let Some(&existing) = self.capture_index.get(&id) {
                return existing;
            }
            let capture = CaptureId::new(self.captures.len());
            self.captures.push(value.clone());
            self.capture_index.insert(id, capture);
            return capture;
        }
        let capture = CaptureId::new(self.captures.len());
        self.captures.push(value.clone());
        capture
    }

    pub fn captured(&self, id: CaptureId) -> &Value {
        &self.captures[id.index()]
    }

    pub fn captures(&self) -> &[Value] {
        &self.captures
    }

    /// Allocate a slot, deriving a readable unique name from the hint.
    pub fn slot_for(&mut self, hint: &str) -> SlotId {
        let base: String = hint
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        let base = if base.is_empty() {
            "value".to_string()
        } else {
            base
        };

        let mut name = base.clone();
        let mut suffix = 1u32;
        while self.used_names.contains(&name) {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }

        let slot = SlotId::new(self.slot_names.len());
        self.used_names.insert(name.clone());
        self.slot_names.push(name);
        slot
    }

    pub fn slot_count(&self) -> usize {
        self.slot_names.len()
    }

    pub fn slot_name(&self, slot: SlotId) -> &str {
        &self.slot_names[slot.index()]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_capture_dedupes_by_identity() {
        let mut ns = Namespace::new();
        let list = Value::list(vec![Value::Int(1)]);
        let alias = list.clone();
        let other = Value::list(vec![Value::Int(1)]);

        let a = ns.capture(&list);
        let b = ns.capture(&alias);
        let c = ns.capture(&other);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(ns.captures().len(), 2);
    }

    #[test]
    fn test_slot_name_collisions_get_suffixes() {
        let mut ns = Namespace::new();
        let a = ns.slot_for("Point");
        let b = ns.slot_for("Point");
        let c = ns.slot_for("Point");
        assert_eq!(ns.slot_name(a), "point");
        assert_eq!(ns.slot_name(b), "point_1");
        assert_eq!(ns.slot_name(c), "point_2");
        assert_eq!(ns.slot_count(), 3);
    }

    #[test]
    fn test_slot_name_sanitizes_hint() {
        let mut ns = Namespace::new();
        let a = ns.slot_for("my.Class Name");
        assert_eq!(ns.slot_name(a), "my_class_name");
        let b = ns.slot_for("");
        assert_eq!(ns.slot_name(b), "value");
    }

    #[test]
    fn test_status_transitions() {
        let mut ns = Namespace::new();
        let list = Value::list(vec![]);
        let id = list.obj_id().unwrap();

        assert_eq!(ns.status(id), None);
        ns.mark_in_progress(id);
        assert_eq!(ns.status(id), Some(Status::InProgress));
        let node = NodeId::new(0);
        ns.finish(id, node);
        assert_eq!(ns.status(id), Some(Status::Finished(node)));
    }
}
