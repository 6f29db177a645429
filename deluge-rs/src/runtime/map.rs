//! Insertion-ordered string-keyed map.

use indexmap::IndexMap;

use super::list::List;
use super::value::Value;

/// Deluge `Map`: unique string keys, iteration in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Map {
    entries: IndexMap<String, Value>,
}

impl Map {
    pub fn new() -> Self {
        Map::default()
    }

    /// Insert or update.  Updating an existing key keeps its position.
    /// Returns the previous value, if any.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Copy every entry of `other`, in `other`'s order, overwriting collisions.
    pub fn put_all(&mut self, other: &Map) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    /// Value for `key`, or `Null` when absent.
    pub fn get(&self, key: &str) -> Value {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    pub fn contain_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn contain_value(&self, value: &Value) -> bool {
        self.entries.values().any(|v| v == value)
    }

    /// Remove `key`, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Value {
        self.entries.shift_remove(key).unwrap_or_default()
    }

    pub fn keys(&self) -> List {
        self.entries.keys().map(|k| Value::from(k.as_str())).collect()
    }

    pub fn values(&self) -> List {
        self.entries.values().cloned().collect()
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

impl FromIterator<(String, Value)> for Map {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Map {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get() {
        let mut m = Map::new();
        m.put("key", "value");
        assert_eq!(m.get("key"), Value::from("value"));
        assert_eq!(m.get("missing"), Value::Null);
        assert_eq!(m.size(), 1);
    }

    #[test]
    fn keys_keep_insertion_order() {
        let mut m = Map::new();
        m.put("b", 1);
        m.put("a", 2);
        m.put("c", 3);
        let keys: Vec<String> = m.keys().iter().map(|v| v.to_string()).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn re_put_updates_in_place() {
        let mut m = Map::new();
        m.put("a", 1);
        m.put("b", 2);
        assert_eq!(m.put("a", 9), Some(Value::Int(1)));
        assert_eq!(m.size(), 2);
        assert_eq!(m.keys().get(0), Value::from("a"));
        assert_eq!(m.get("a"), Value::Int(9));
    }

    #[test]
    fn put_all_copies_in_order() {
        let mut a = Map::new();
        a.put("x", 1);
        let mut b = Map::new();
        b.put("y", 2);
        b.put("x", 3);
        a.put_all(&b);
        assert_eq!(a.size(), 2);
        assert_eq!(a.get("x"), Value::Int(3));
        assert_eq!(a.keys().get(1), Value::from("y"));
    }

    #[test]
    fn contain_key_and_value() {
        let mut m = Map::new();
        m.put("k", "v");
        assert!(m.contain_key("k"));
        assert!(!m.contain_key("v"));
        assert!(m.contain_value(&Value::from("v")));
        assert!(!m.contain_value(&Value::from("k")));
    }

    #[test]
    fn remove_preserves_order() {
        let mut m = Map::new();
        m.put("a", 1);
        m.put("b", 2);
        m.put("c", 3);
        assert_eq!(m.remove("a"), Value::Int(1));
        assert_eq!(m.remove("a"), Value::Null);
        assert_eq!(m.keys().get(0), Value::from("b"));
        assert_eq!(m.keys().get(1), Value::from("c"));
    }

    #[test]
    fn clear_empties() {
        let mut m = Map::new();
        m.put("a", 1);
        assert!(!m.is_empty());
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.size(), 0);
    }
}
