//! Trie-backed cache of property test results.
//!
//! Within one level a configuration is fully determined by its retained
//! items, so results are keyed by the retained sequence. Nodes live in an
//! arena and refer to their children by index.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::trace;

use shrink_core::{DdItem, PropertyTestResult, PropertyTester, PropertyTesterError};

#[derive(Debug, Clone)]
struct TrieNode<K, V> {
    children: BTreeMap<K, usize>,
    value: Option<V>,
}

impl<K, V> Default for TrieNode<K, V> {
    fn default() -> Self {
        Self {
            children: BTreeMap::new(),
            value: None,
        }
    }
}

/// A map from item sequences to values, sharing common prefixes.
#[derive(Debug, Clone)]
pub struct TrieCache<K, V> {
    nodes: Vec<TrieNode<K, V>>,
    len: usize,
}

impl<K: Ord + Clone, V> Default for TrieCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V> TrieCache<K, V> {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            len: 0,
        }
    }

    /// Look up the value stored for exactly `key`.
    pub fn get(&self, key: &[K]) -> Option<&V> {
        let mut node = 0;
        for part in key {
            node = *self.nodes[node].children.get(part)?;
        }
        self.nodes[node].value.as_ref()
    }

    /// Store `value` under `key`, returning the previous value if any.
    pub fn insert(&mut self, key: &[K], value: V) -> Option<V> {
        let mut node = 0;
        for part in key {
            node = match self.nodes[node].children.get(part) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(part.clone(), child);
                    child
                }
            };
        }
        let previous = self.nodes[node].value.replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0] = TrieNode::default();
        self.len = 0;
    }
}

/// Remembers decided results so a configuration is never tested twice.
///
/// `UnknownProperty` is not cached: an undecided oracle may decide on retry.
/// The cache is cleared on every empty level and should be wrapped around a
/// tester whose items do not repeat across levels.
pub struct CachingTester<P, T> {
    inner: P,
    cache: TrieCache<T, PropertyTestResult>,
    hits: usize,
}

impl<P, T: DdItem> CachingTester<P, T> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: TrieCache::new(),
            hits: 0,
        }
    }

    /// Number of trials answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

#[async_trait]
impl<E, T, P> PropertyTester<E, T> for CachingTester<P, T>
where
    E: Send,
    T: DdItem,
    P: PropertyTester<E, T>,
{
    async fn test(&mut self, env: &mut E, retained: &[T], deleted: &[T]) -> PropertyTestResult {
        if let Some(cached) = self.cache.get(retained) {
            self.hits += 1;
            trace!(retained = retained.len(), "Property test answered from cache");
            return *cached;
        }

        let result = self.inner.test(env, retained, deleted).await;
        if result != Err(PropertyTesterError::UnknownProperty) {
            self.cache.insert(retained, result);
        }
        result
    }

    async fn on_empty_level(&mut self, env: &mut E) {
        self.cache.clear();
        self.inner.on_empty_level(env).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shrink_core::PredicateTester;

    #[test]
    fn test_trie_insert_and_get() {
        let mut trie = TrieCache::new();
        assert!(trie.is_empty());

        assert_eq!(trie.insert(&[1, 2, 3], "abc"), None);
        assert_eq!(trie.insert(&[1, 2], "ab"), None);
        assert_eq!(trie.insert(&[], "root"), None);

        assert_eq!(trie.get(&[1, 2, 3]), Some(&"abc"));
        assert_eq!(trie.get(&[1, 2]), Some(&"ab"));
        assert_eq!(trie.get(&[]), Some(&"root"));
        assert_eq!(trie.get(&[1]), None);
        assert_eq!(trie.get(&[1, 2, 3, 4]), None);
        assert_eq!(trie.len(), 3);

        assert_eq!(trie.insert(&[1, 2], "AB"), Some("ab"));
        assert_eq!(trie.len(), 3);

        trie.clear();
        assert!(trie.get(&[1, 2]).is_none());
        assert!(trie.is_empty());
    }

    #[tokio::test]
    async fn test_caching_tester_skips_repeated_trials() {
        let mut calls = 0;
        {
            let inner = PredicateTester::new(|retained: &[u8], _: &[u8]| {
                calls += 1;
                if retained.contains(&1) {
                    Ok(())
                } else {
                    Err(PropertyTesterError::NoProperty)
                }
            });
            let mut tester = CachingTester::<_, u8>::new(inner);

            assert!(tester.test(&mut (), &[1, 2], &[3]).await.is_ok());
            assert!(tester.test(&mut (), &[1, 2], &[3]).await.is_ok());
            assert!(tester.test(&mut (), &[2], &[1, 3]).await.is_err());
            assert!(tester.test(&mut (), &[2], &[1, 3]).await.is_err());
            assert_eq!(tester.hits(), 2);
        }
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_unknown_results_are_retried() {
        let mut calls = 0;
        {
            let inner = PredicateTester::new(|_: &[u8], _: &[u8]| {
                calls += 1;
                Err(PropertyTesterError::UnknownProperty)
            });
            let mut tester = CachingTester::<_, u8>::new(inner);
            let _ = tester.test(&mut (), &[1], &[]).await;
            let _ = tester.test(&mut (), &[1], &[]).await;
            assert_eq!(tester.hits(), 0);
        }
        assert_eq!(calls, 2);
    }
}
