use std::hash::Hash;
use std::iter::FromIterator;

use fnv::FnvHashMap;

/// A hash map that iterates in insertion order. Re-inserting an existing key
/// replaces its value but keeps its position.
#[derive(Clone, Debug)]
pub struct OrderedHashMap<K, V> {
    keys: FnvHashMap<K, usize>,
    entries: Vec<(K, V)>,
}

pub struct Iter<'a, K: 'a, V: 'a> {
    inner: std::slice::Iter<'a, (K, V)>,
}

impl<K, V> Default for OrderedHashMap<K, V>
where
    K: Clone + Hash + Eq,
{
    fn default() -> Self {
        OrderedHashMap::new()
    }
}

impl<K, V> OrderedHashMap<K, V>
where
    K: Clone + Hash + Eq,
{
    pub fn new() -> OrderedHashMap<K, V> {
        OrderedHashMap {
            keys: FnvHashMap::default(),
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, k: &K) -> bool {
        self.keys.contains_key(k)
    }

    pub fn get(&self, k: &K) -> Option<&V> {
        self.keys.get(k).map(|idx| &self.entries[*idx].1)
    }

    pub fn get_mut(&mut self, k: &K) -> Option<&mut V> {
        match self.keys.get(k) {
            Some(idx) => Some(&mut self.entries[*idx].1),
            None => None,
        }
    }

    pub fn insert(&mut self, k: K, v: V) -> Option<V> {
        if let Some(idx) = self.keys.get(&k) {
            return Some(std::mem::replace(&mut self.entries[*idx].1, v));
        }

        let idx = self.entries.len();
        self.keys.insert(k.clone(), idx);
        self.entries.push((k, v));
        None
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }
}

impl<'a, K, V> IntoIterator for &'a OrderedHashMap<K, V>
where
    K: Clone + Hash + Eq,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for OrderedHashMap<K, V>
where
    K: Clone + Hash + Eq,
{
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut m = OrderedHashMap::new();
        for (k, v) in iter {
            m.insert(k, v);
        }
        m
    }
}
