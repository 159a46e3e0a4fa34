//! Composite containers used by the value model.
//!
//! Dict, set and attribute storage are insertion-ordered and Vec-backed:
//! `Value` deliberately does not implement `Hash` (mutable members), so
//! lookup is linear deep-equality scan. Copy plans walk graphs small enough
//! that this is a non-issue, and it keeps mutable values usable as set
//! members without a frozen wrapper.

use crate::value::Value;

/// Insertion-ordered mapping with `Value` keys.
///
/// Iteration preserves insertion order; equality is order-insensitive.
#[derive(Clone, Debug, Default)]
pub struct DictValue {
    entries: Vec<(Value, Value)>,
}

impl DictValue {
    pub fn new() -> Self {
        DictValue::default()
    }

    pub fn from_pairs(pairs: Vec<(Value, Value)>) -> Self {
        let mut dict = DictValue::new();
        for (key, value) in pairs {
            dict.insert(key, value);
        }
        dict
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert or replace, preserving the insertion position of existing keys.
    pub fn insert(&mut self, key: Value, value: Value) {
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.iter()
    }
}

impl PartialEq for DictValue {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}

/// Insertion-ordered set of values.
#[derive(Clone, Debug, Default)]
pub struct SetValue {
    items: Vec<Value>,
}

impl SetValue {
    pub fn new() -> Self {
        SetValue::default()
    }

    pub fn from_items(items: Vec<Value>) -> Self {
        let mut set = SetValue::new();
        for item in items {
            set.insert(item);
        }
        set
    }

    /// Returns true if the item was newly inserted.
    pub fn insert(&mut self, item: Value) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn contains(&self, item: &Value) -> bool {
        self.items.iter().any(|i| i == item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }
}

impl PartialEq for SetValue {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.items.iter().all(|i| other.contains(i))
    }
}

/// Generic attribute storage for instances.
#[derive(Clone, Debug, Default)]
pub struct AttrMap {
    entries: Vec<(String, Value)>,
}

impl AttrMap {
    pub fn new() -> Self {
        AttrMap::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entries.iter().position(|(k, _)| *k == name) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.entries.iter()
    }
}

impl PartialEq for AttrMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}

/// A function bound to a receiver, rebuilt from its parts when duplicated.
#[derive(Clone, Debug)]
pub struct BoundMethod {
    pub func: Value,
    pub receiver: Value,
}

/// Opaque module-like singleton; never duplicated, always captured as-is.
#[derive(Clone, Debug)]
pub struct ModuleDef {
    name: String,
}

impl ModuleDef {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        ModuleDef { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
