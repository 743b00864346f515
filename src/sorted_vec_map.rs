//! A map that keeps entries in sorted key order, backed by a `SmallVec`.
//!
//! Scopes rarely have more than a handful of applications/substances per
//! run, so a sorted vector beats a hash map on both cache locality and
//! deterministic iteration order — useful here because result emission
//! must be globally sorted.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct SortedVecMap<K, V, const N: usize = 8> {
    inner: SmallVec<[(K, V); N]>,
}

impl<K: Ord, V, const N: usize> SortedVecMap<K, V, N> {
    pub fn new() -> Self {
        Self {
            inner: SmallVec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    fn search(&self, key: &K) -> Result<usize, usize> {
        self.inner.binary_search_by(|(k, _)| k.cmp(key))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.search(key).is_ok()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.search(key).ok().map(|i| &self.inner[i].1)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self.search(key) {
            Ok(i) => Some(&mut self.inner[i].1),
            Err(_) => None,
        }
    }

    /// Inserts a key-value pair, returning the prior value if the key was
    /// already present (last write wins).
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.search(&key) {
            Ok(i) => Some(std::mem::replace(&mut self.inner[i].1, value)),
            Err(i) => {
                self.inner.insert(i, (key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        match self.search(key) {
            Ok(i) => Some(self.inner.remove(i).1),
            Err(_) => None,
        }
    }

    /// Returns the existing entry for `key`, inserting `default()`'s result
    /// first if absent.
    pub fn get_or_insert_with(&mut self, key: K, default: impl FnOnce() -> V) -> &mut V {
        match self.search(&key) {
            Ok(i) => &mut self.inner[i].1,
            Err(i) => {
                self.inner.insert(i, (key, default()));
                &mut self.inner[i].1
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.inner.iter_mut().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter().map(|(k, v)| (k, v))
    }
}

impl<K: Ord, V, const N: usize> FromIterator<(K, V)> for SortedVecMap<K, V, N> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
