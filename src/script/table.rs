//! Insertion-ordered key/value table.
//!
//! Script-visible tables (the memory map, the global namespace) are small and
//! their iteration order is observable, so entries live in a `Vec` in
//! insertion order and lookups scan linearly. Iteration is restartable and
//! reflects every mutation made before it starts.

use std::{fmt, rc::Rc};

use crate::script::value::Value;

/// Key of a [`Table`] entry. Only hashable scalar values can key a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableKey {
    /// Signed integer key.
    Int(i64),
    /// Boolean key.
    Bool(bool),
    /// String key.
    String(Rc<str>),
}

impl TableKey {
    /// Builds a string key.
    pub fn str(key: &str) -> Self {
        Self::String(key.into())
    }

    /// Converts a value into a table key if the value is a keyable scalar.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::S8(v) => Some(Self::Int(i64::from(*v))),
            Value::U8(v) => Some(Self::Int(i64::from(*v))),
            Value::S16(v) => Some(Self::Int(i64::from(*v))),
            Value::U16(v) => Some(Self::Int(i64::from(*v))),
            Value::S32(v) => Some(Self::Int(i64::from(*v))),
            Value::U32(v) => Some(Self::Int(i64::from(*v))),
            Value::S64(v) => Some(Self::Int(*v)),
            Value::U64(v) => i64::try_from(*v).ok().map(Self::Int),
            Value::Bool(v) => Some(Self::Bool(*v)),
            Value::String(v) => Some(Self::String(v.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "\"{}\"", v),
        }
    }
}

/// Ordered key/value container of heterogeneous [`Value`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    entries: Vec<(TableKey, Value)>,
}

impl Table {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `key`.
    ///
    /// Replacing keeps the entry's original position; new keys append.
    pub fn insert(&mut self, key: TableKey, value: Value) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Looks up the value for `key`.
    pub fn get(&self, key: &TableKey) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Removes the entry for `key`, returning its value. Later entries keep
    /// their relative order.
    pub fn remove(&mut self, key: &TableKey) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order. Each call starts a fresh
    /// iteration over the table as it is at that moment.
    pub fn iter(&self) -> impl Iterator<Item = (&TableKey, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &TableKey> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self
            .entries
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        write!(f, "{{{}}}", items.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order() {
        let mut table = Table::new();
        table.insert(TableKey::str("b"), Value::S32(1));
        table.insert(TableKey::str("a"), Value::S32(2));
        table.insert(TableKey::str("c"), Value::S32(3));
        let keys: Vec<String> = table.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["\"b\"", "\"a\"", "\"c\""]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut table = Table::new();
        table.insert(TableKey::str("a"), Value::S32(1));
        table.insert(TableKey::str("b"), Value::S32(2));
        table.insert(TableKey::str("a"), Value::S32(10));
        assert_eq!(table.len(), 2);
        assert_eq!(table.iter().next().unwrap().1, &Value::S32(10));
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut table = Table::new();
        table.insert(TableKey::Int(1), Value::Bool(true));
        table.insert(TableKey::Int(2), Value::Bool(false));
        table.insert(TableKey::Int(3), Value::Bool(true));
        assert_eq!(table.remove(&TableKey::Int(2)), Some(Value::Bool(false)));
        let keys: Vec<&TableKey> = table.keys().collect();
        assert_eq!(keys, vec![&TableKey::Int(1), &TableKey::Int(3)]);
        assert_eq!(table.remove(&TableKey::Int(2)), None);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let mut table = Table::new();
        table.insert(TableKey::str("x"), Value::S32(1));
        table.insert(TableKey::str("y"), Value::S32(2));
        let first: Vec<_> = table.iter().map(|(k, _)| k.clone()).collect();
        let second: Vec<_> = table.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_key_from_value() {
        assert_eq!(
            TableKey::from_value(&Value::U8(7)),
            Some(TableKey::Int(7))
        );
        assert_eq!(
            TableKey::from_value(&Value::String("rom".into())),
            Some(TableKey::str("rom"))
        );
        assert_eq!(TableKey::from_value(&Value::F64(1.0)), None);
        assert_eq!(TableKey::from_value(&Value::U64(u64::MAX)), None);
    }
}
