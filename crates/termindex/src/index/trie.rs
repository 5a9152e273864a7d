//! Ordered trie over fixed-length keys, shared by the feature vector and
//! fingerprint indices. Values live at the leaves only.

use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub(crate) struct TrieNode<K, V> {
    pub(crate) children: BTreeMap<K, TrieNode<K, V>>,
    pub(crate) values: Vec<V>,
}

impl<K: Ord + Clone, V> Default for TrieNode<K, V> {
    fn default() -> Self {
        TrieNode {
            children: BTreeMap::new(),
            values: Vec::new(),
        }
    }
}

impl<K: Ord + Clone, V> TrieNode<K, V> {
    pub(crate) fn insert(&mut self, key: &[K], value: V) {
        let mut node = self;
        for k in key {
            node = node.children.entry(k.clone()).or_default();
        }
        node.values.push(value);
    }

    /// Remove the values under `key` selected by `pred` and prune the branch
    /// if the leaf ends up empty. Returns the number of values removed.
    pub(crate) fn remove<F>(&mut self, key: &[K], mut pred: F) -> usize
    where
        F: FnMut(&V) -> bool,
    {
        // Deepest node on the path that must survive the pruning
        let mut cut = 0;
        let mut node: &TrieNode<K, V> = self;
        for (depth, k) in key.iter().enumerate() {
            if node.children.len() > 1 || !node.values.is_empty() {
                cut = depth;
            }
            match node.children.get(k) {
                Some(child) => node = child,
                None => return 0,
            }
        }

        let mut leaf: &mut TrieNode<K, V> = self;
        for k in key {
            match leaf.children.get_mut(k) {
                Some(child) => leaf = child,
                None => return 0,
            }
        }
        let before = leaf.values.len();
        leaf.values.retain(|v| !pred(v));
        let removed = before - leaf.values.len();
        if key.is_empty() || !leaf.values.is_empty() || !leaf.children.is_empty() {
            return removed;
        }

        let mut anchor: &mut TrieNode<K, V> = self;
        for k in &key[..cut] {
            match anchor.children.get_mut(k) {
                Some(child) => anchor = child,
                None => return removed,
            }
        }
        anchor.children.remove(&key[cut]);
        removed
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.children.is_empty() && self.values.is_empty()
    }

    /// Number of nodes below and including this one
    pub(crate) fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.values());
        }
        count
    }
}
