//! Ordered list with bounds-safe access and non-mutating derived views.

use std::cmp::Ordering;

use crate::error::{RuntimeError, RuntimeResult};
use super::value::Value;

/// Deluge `List`: 0-indexed, duplicates allowed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct List {
    items: Vec<Value>,
}

impl List {
    pub fn new() -> Self {
        List::default()
    }

    pub fn add(&mut self, value: impl Into<Value>) {
        self.items.push(value.into());
    }

    pub fn add_all(&mut self, other: &List) {
        self.items.extend(other.items.iter().cloned());
    }

    /// Element at `index`, or `Null` when out of range (negative included).
    pub fn get(&self, index: i64) -> Value {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.items.get(i))
            .cloned()
            .unwrap_or_default()
    }

    /// Remove and return the element at `index`; `Null` when out of range.
    pub fn remove(&mut self, index: i64) -> Value {
        match usize::try_from(index) {
            Ok(i) if i < self.items.len() => self.items.remove(i),
            _ => Value::Null,
        }
    }

    /// Remove the first element equal to `value`.  Returns whether one was found.
    pub fn remove_element(&mut self, value: &Value) -> bool {
        match self.items.iter().position(|v| v == value) {
            Some(i) => {
                self.items.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.items.iter().any(|v| v == value)
    }

    pub fn index_of(&self, value: &Value) -> i64 {
        self.items
            .iter()
            .position(|v| v == value)
            .map_or(-1, |i| i as i64)
    }

    pub fn last_index_of(&self, value: &Value) -> i64 {
        self.items
            .iter()
            .rposition(|v| v == value)
            .map_or(-1, |i| i as i64)
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Stable in-place sort.  Every element must be comparable with every
    /// other one; mixed kinds are a type mismatch and leave the list untouched.
    pub fn sort(&mut self, ascending: bool) -> RuntimeResult<()> {
        if let Some(first) = self.items.first() {
            if let Some(bad) = self.items.iter().find(|v| first.compare(v).is_none()) {
                return Err(RuntimeError::mismatch(format!(
                    "cannot sort {} together with {}",
                    first.type_name(),
                    bad.type_name()
                )));
            }
        }
        let order = |a: &Value, b: &Value| a.compare(b).unwrap_or(Ordering::Equal);
        if ascending {
            self.items.sort_by(order);
        } else {
            self.items.sort_by(|a, b| order(b, a));
        }
        Ok(())
    }

    /// Copy without duplicates, keeping first occurrences in order.
    pub fn distinct(&self) -> List {
        let mut out = List::new();
        for v in &self.items {
            if !out.contains(v) {
                out.items.push(v.clone());
            }
        }
        out
    }

    /// Elements present in both lists, in receiver order, without duplicates.
    pub fn intersect(&self, other: &List) -> List {
        let mut out = List::new();
        for v in &self.items {
            if other.contains(v) && !out.contains(v) {
                out.items.push(v.clone());
            }
        }
        out
    }

    /// Copy of `[start, end)`; bounds are clamped, `end` defaults to the length.
    pub fn sublist(&self, start: i64, end: Option<i64>) -> List {
        let len = self.items.len() as i64;
        let start = start.clamp(0, len);
        let end = end.unwrap_or(len).clamp(start, len);
        List {
            items: self.items[start as usize..end as usize].to_vec(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }
}

impl From<Vec<Value>> for List {
    fn from(items: Vec<Value>) -> Self {
        List { items }
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        List {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for List {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(v: &[i64]) -> List {
        v.iter().map(|&n| Value::Int(n)).collect()
    }

    #[test]
    fn get_out_of_range_is_null() {
        let l = ints(&[1, 2, 3]);
        assert_eq!(l.get(0), Value::Int(1));
        assert_eq!(l.get(10), Value::Null);
        assert_eq!(l.get(-1), Value::Null);
    }

    #[test]
    fn remove_by_index() {
        let mut l = ints(&[1, 2, 3]);
        assert_eq!(l.remove(1), Value::Int(2));
        assert_eq!(l, ints(&[1, 3]));
        assert_eq!(l.remove(5), Value::Null);
        assert_eq!(l.remove(-1), Value::Null);
        assert_eq!(l.size(), 2);
    }

    #[test]
    fn remove_element_first_only() {
        let mut l = ints(&[1, 2, 1, 3]);
        assert!(l.remove_element(&Value::Int(1)));
        assert_eq!(l, ints(&[2, 1, 3]));
        assert!(!l.remove_element(&Value::Int(9)));
    }

    #[test]
    fn sort_is_stable_both_ways() {
        let mut l = ints(&[3, 1, 2]);
        l.sort(true).unwrap();
        assert_eq!(l, ints(&[1, 2, 3]));
        l.sort(false).unwrap();
        assert_eq!(l, ints(&[3, 2, 1]));

        // 1 and 1.0 compare equal; their relative order must survive.
        let mut mixed: List = vec![Value::Float(1.0), Value::Int(0), Value::Int(1)].into();
        mixed.sort(true).unwrap();
        assert!(matches!(mixed.get(1), Value::Float(_)));
        assert!(matches!(mixed.get(2), Value::Int(1)));
    }

    #[test]
    fn sort_strings() {
        let mut l: List = vec![Value::from("pear"), Value::from("apple")].into();
        l.sort(true).unwrap();
        assert_eq!(l.get(0), Value::from("apple"));
    }

    #[test]
    fn sort_rejects_mixed_kinds() {
        let mut l: List = vec![Value::Int(1), Value::from("a")].into();
        let err = l.sort(true).unwrap_err();
        assert!(matches!(err, RuntimeError::TypeMismatch { .. }));
        assert_eq!(l.get(0), Value::Int(1));
    }

    #[test]
    fn distinct_keeps_first_occurrence() {
        let l = ints(&[1, 2, 1, 3, 2]);
        assert_eq!(l.distinct(), ints(&[1, 2, 3]));
        assert_eq!(l.size(), 5);
    }

    #[test]
    fn intersect_set_semantics() {
        let a = ints(&[1, 2, 2, 3]);
        let b = ints(&[3, 2, 4]);
        assert_eq!(a.intersect(&b), ints(&[2, 3]));
    }

    #[test]
    fn sublist_clamps() {
        let l = ints(&[1, 2, 3, 4, 5]);
        assert_eq!(l.sublist(1, Some(3)), ints(&[2, 3]));
        assert_eq!(l.sublist(2, None).size(), 3);
        assert_eq!(l.sublist(-4, Some(2)), ints(&[1, 2]));
        assert_eq!(l.sublist(4, Some(1)).size(), 0);
        assert_eq!(l.sublist(9, Some(20)).size(), 0);
    }

    #[test]
    fn index_of_both_ends() {
        let l = ints(&[1, 2, 1]);
        assert_eq!(l.index_of(&Value::Int(1)), 0);
        assert_eq!(l.last_index_of(&Value::Int(1)), 2);
        assert_eq!(l.index_of(&Value::Int(7)), -1);
    }

    #[test]
    fn add_all_appends() {
        let mut a = ints(&[1]);
        a.add_all(&ints(&[2, 3]));
        assert_eq!(a, ints(&[1, 2, 3]));
        a.clear();
        assert!(a.is_empty());
    }
}
