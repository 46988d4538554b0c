//! A classical in-memory B-tree keyed by `IndexKey`, storing the set of
//! document ids associated with each key (§4.5). Unlike the donor's
//! `index.rs` B+ Tree, which persists nodes as fixed-size pages on disk via
//! offsets, this tree lives entirely in memory: the spec treats indexes as
//! derived data, rebuilt from the document store whenever a collection is
//! opened, so there is no page format to maintain here. The key ordering
//! (`IndexKey`/`OrderedFloat`, null sorts lowest) is carried over from the
//! donor unchanged.

use std::cmp::Ordering;

const DEFAULT_MIN_DEGREE: usize = 32;

struct Node<K, V> {
    keys: Vec<K>,
    values: Vec<Vec<V>>,
    children: Vec<Box<Node<K, V>>>,
    leaf: bool,
}

impl<K, V> Node<K, V> {
    fn new_leaf() -> Self {
        Node {
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
            leaf: true,
        }
    }
}

fn lower_bound<K: Ord>(keys: &[K], key: &K) -> usize {
    let mut lo = 0;
    let mut hi = keys.len();
    while lo < hi {
        let mid = (lo + hi) / 2;
        if keys[mid].cmp(key) == Ordering::Less {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// `t`: minimum degree. Every non-root node holds between `t-1` and `2t-1`
/// keys; every internal node has between `t` and `2t` children.
pub struct BTree<K, V> {
    root: Box<Node<K, V>>,
    t: usize,
    len: usize,
}

impl<K: Ord + Clone, V: Clone + PartialEq> BTree<K, V> {
    pub fn new(min_degree: usize) -> Self {
        BTree {
            root: Box::new(Node::new_leaf()),
            t: min_degree.max(2),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, key: &K) -> Option<&Vec<V>> {
        Self::search_node(&self.root, key)
    }

    fn search_node<'a>(node: &'a Node<K, V>, key: &K) -> Option<&'a Vec<V>> {
        let i = lower_bound(&node.keys, key);
        if i < node.keys.len() && &node.keys[i] == key {
            return Some(&node.values[i]);
        }
        if node.leaf {
            None
        } else {
            Self::search_node(&node.children[i], key)
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        if self.root.keys.len() == 2 * self.t - 1 {
            let mut new_root = Node::new_leaf();
            new_root.leaf = false;
            let old_root = std::mem::replace(&mut self.root, Box::new(new_root));
            self.root.children.push(old_root);
            Self::split_child(&mut self.root, 0, self.t);
        }
        let t = self.t;
        if Self::insert_non_full(&mut self.root, key, value, t) {
            self.len += 1;
        }
    }

    fn insert_non_full(node: &mut Node<K, V>, key: K, value: V, t: usize) -> bool {
        let i = lower_bound(&node.keys, &key);
        if i < node.keys.len() && node.keys[i] == key {
            if !node.values[i].contains(&value) {
                node.values[i].push(value);
            }
            return false;
        }
        if node.leaf {
            node.keys.insert(i, key);
            node.values.insert(i, vec![value]);
            return true;
        }
        let mut child_idx = i;
        if node.children[child_idx].keys.len() == 2 * t - 1 {
            Self::split_child(node, child_idx, t);
            match key.cmp(&node.keys[child_idx]) {
                Ordering::Greater => child_idx += 1,
                Ordering::Equal => {
                    if !node.values[child_idx].contains(&value) {
                        node.values[child_idx].push(value);
                    }
                    return false;
                }
                Ordering::Less => {}
            }
        }
        Self::insert_non_full(&mut node.children[child_idx], key, value, t)
    }

    fn split_child(parent: &mut Node<K, V>, i: usize, t: usize) {
        let mid = t - 1;
        let (median_key, median_val, right_node) = {
            let child = &mut parent.children[i];
            let median_key = child.keys[mid].clone();
            let median_val = child.values[mid].clone();
            let right_keys = child.keys.split_off(mid + 1);
            let right_values = child.values.split_off(mid + 1);
            child.keys.pop();
            child.values.pop();
            let right_children = if child.leaf {
                Vec::new()
            } else {
                child.children.split_off(mid + 1)
            };
            let right_node = Box::new(Node {
                keys: right_keys,
                values: right_values,
                children: right_children,
                leaf: child.leaf,
            });
            (median_key, median_val, right_node)
        };
        parent.children.insert(i + 1, right_node);
        parent.keys.insert(i, median_key);
        parent.values.insert(i, median_val);
    }

    /// Remove a single document id from `key`'s value set. Returns `true` if
    /// it was present. Once a key's value set empties, the key itself is
    /// removed from the tree via the standard top-down borrow/merge
    /// deletion algorithm.
    pub fn remove(&mut self, key: &K, value: &V) -> bool {
        let became_empty = match Self::find_mut(&mut self.root, key) {
            Some(values) => {
                let before = values.len();
                values.retain(|v| v != value);
                if values.len() == before {
                    return false;
                }
                values.is_empty()
            }
            None => return false,
        };
        self.len -= 1;
        if became_empty {
            let t = self.t;
            Self::delete_key(&mut self.root, key, t);
            if self.root.keys.is_empty() && !self.root.leaf {
                let only_child = self.root.children.remove(0);
                self.root = only_child;
            }
        }
        true
    }

    fn find_mut<'a>(node: &'a mut Node<K, V>, key: &K) -> Option<&'a mut Vec<V>> {
        let i = lower_bound(&node.keys, key);
        if i < node.keys.len() && &node.keys[i] == key {
            return Some(&mut node.values[i]);
        }
        if node.leaf {
            None
        } else {
            Self::find_mut(&mut node.children[i], key)
        }
    }

    fn get_predecessor(node: &Node<K, V>) -> (K, Vec<V>) {
        let mut cur = node;
        while !cur.leaf {
            cur = cur.children.last().unwrap();
        }
        let idx = cur.keys.len() - 1;
        (cur.keys[idx].clone(), cur.values[idx].clone())
    }

    fn get_successor(node: &Node<K, V>) -> (K, Vec<V>) {
        let mut cur = node;
        while !cur.leaf {
            cur = cur.children.first().unwrap();
        }
        (cur.keys[0].clone(), cur.values[0].clone())
    }

    fn delete_key(node: &mut Node<K, V>, key: &K, t: usize) -> bool {
        let i = lower_bound(&node.keys, key);
        if i < node.keys.len() && &node.keys[i] == key {
            if node.leaf {
                node.keys.remove(i);
                node.values.remove(i);
                return true;
            }
            if node.children[i].keys.len() >= t {
                let (pred_key, pred_val) = Self::get_predecessor(&node.children[i]);
                node.keys[i] = pred_key.clone();
                node.values[i] = pred_val;
                Self::delete_key(&mut node.children[i], &pred_key, t);
            } else if node.children[i + 1].keys.len() >= t {
                let (succ_key, succ_val) = Self::get_successor(&node.children[i + 1]);
                node.keys[i] = succ_key.clone();
                node.values[i] = succ_val;
                Self::delete_key(&mut node.children[i + 1], &succ_key, t);
            } else {
                Self::merge_children(node, i);
                Self::delete_key(&mut node.children[i], key, t);
            }
            true
        } else {
            if node.leaf {
                return false;
            }
            Self::ensure_child_has_min_keys(node, i, t);
            let i2 = lower_bound(&node.keys, key).min(node.children.len() - 1);
            Self::delete_key(&mut node.children[i2], key, t)
        }
    }

    fn ensure_child_has_min_keys(node: &mut Node<K, V>, idx: usize, t: usize) {
        if node.children[idx].keys.len() >= t {
            return;
        }
        let has_left = idx > 0 && node.children[idx - 1].keys.len() >= t;
        let has_right = idx + 1 < node.children.len() && node.children[idx + 1].keys.len() >= t;

        if has_left {
            let (left_key, left_val, left_child) = {
                let left = &mut node.children[idx - 1];
                let k = left.keys.pop().unwrap();
                let v = left.values.pop().unwrap();
                let c = if left.leaf {
                    None
                } else {
                    Some(left.children.pop().unwrap())
                };
                (k, v, c)
            };
            let sep_key = std::mem::replace(&mut node.keys[idx - 1], left_key);
            let sep_val = std::mem::replace(&mut node.values[idx - 1], left_val);
            let child = &mut node.children[idx];
            child.keys.insert(0, sep_key);
            child.values.insert(0, sep_val);
            if let Some(c) = left_child {
                child.children.insert(0, c);
            }
        } else if has_right {
            let (right_key, right_val, right_child) = {
                let right = &mut node.children[idx + 1];
                let k = right.keys.remove(0);
                let v = right.values.remove(0);
                let c = if right.leaf {
                    None
                } else {
                    Some(right.children.remove(0))
                };
                (k, v, c)
            };
            let sep_key = std::mem::replace(&mut node.keys[idx], right_key);
            let sep_val = std::mem::replace(&mut node.values[idx], right_val);
            let child = &mut node.children[idx];
            child.keys.push(sep_key);
            child.values.push(sep_val);
            if let Some(c) = right_child {
                child.children.push(c);
            }
        } else if idx + 1 < node.children.len() {
            Self::merge_children(node, idx);
        } else {
            Self::merge_children(node, idx - 1);
        }
    }

    fn merge_children(node: &mut Node<K, V>, idx: usize) {
        let sep_key = node.keys.remove(idx);
        let sep_val = node.values.remove(idx);
        let right = node.children.remove(idx + 1);
        let left = &mut node.children[idx];
        left.keys.push(sep_key);
        left.values.push(sep_val);
        left.keys.extend(right.keys);
        left.values.extend(right.values);
        left.children.extend(right.children);
    }

    /// In-order scan of `(key, values)` pairs with `key` in `[lo, hi]`
    /// (either bound `None` means unbounded on that side).
    pub fn range<'a>(&'a self, lo: Option<&K>, hi: Option<&K>) -> Vec<(&'a K, &'a Vec<V>)> {
        let mut out = Vec::new();
        Self::collect_range(&self.root, lo, hi, &mut out);
        out
    }

    fn collect_range<'a>(
        node: &'a Node<K, V>,
        lo: Option<&K>,
        hi: Option<&K>,
        out: &mut Vec<(&'a K, &'a Vec<V>)>,
    ) {
        for i in 0..node.keys.len() {
            if !node.leaf {
                Self::collect_range(&node.children[i], lo, hi, out);
            }
            let key = &node.keys[i];
            let above_lo = lo.map_or(true, |l| key >= l);
            let below_hi = hi.map_or(true, |h| key <= h);
            if above_lo && below_hi {
                out.push((key, &node.values[i]));
            }
        }
        if !node.leaf {
            Self::collect_range(&node.children[node.keys.len()], lo, hi, out);
        }
    }

    pub fn iter(&self) -> Vec<(&K, &Vec<V>)> {
        self.range(None, None)
    }
}

impl<K: Ord + Clone, V: Clone + PartialEq> Default for BTree<K, V> {
    fn default() -> Self {
        BTree::new(DEFAULT_MIN_DEGREE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut tree: BTree<i64, String> = BTree::new(2);
        for i in 0..50 {
            tree.insert(i, format!("doc{i}"));
        }
        assert_eq!(tree.len(), 50);
        assert_eq!(tree.get(&25), Some(&vec!["doc25".to_string()]));
        assert_eq!(tree.get(&999), None);
    }

    #[test]
    fn duplicate_keys_accumulate_values() {
        let mut tree: BTree<i64, String> = BTree::new(2);
        tree.insert(1, "a".to_string());
        tree.insert(1, "b".to_string());
        assert_eq!(tree.get(&1).unwrap().len(), 2);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn range_scan_is_sorted_and_bounded() {
        let mut tree: BTree<i64, String> = BTree::new(2);
        for i in (0..30).rev() {
            tree.insert(i, format!("doc{i}"));
        }
        let results = tree.range(Some(&10), Some(&15));
        let keys: Vec<i64> = results.iter().map(|(k, _)| **k).collect();
        assert_eq!(keys, vec![10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn remove_shrinks_tree_and_preserves_order() {
        let mut tree: BTree<i64, String> = BTree::new(2);
        for i in 0..100 {
            tree.insert(i, format!("doc{i}"));
        }
        for i in 0..100 {
            if i % 3 == 0 {
                assert!(tree.remove(&i, &format!("doc{i}")));
            }
        }
        assert_eq!(tree.len(), 100 - (0..100).filter(|i| i % 3 == 0).count());
        let all: Vec<i64> = tree.iter().into_iter().map(|(k, _)| *k).collect();
        let mut sorted = all.clone();
        sorted.sort_unstable();
        assert_eq!(all, sorted);
        for k in &all {
            assert_ne!(k % 3, 0);
        }
    }

    #[test]
    fn removing_last_value_removes_key() {
        let mut tree: BTree<i64, String> = BTree::new(2);
        tree.insert(5, "only".to_string());
        assert!(tree.remove(&5, &"only".to_string()));
        assert!(tree.get(&5).is_none());
        assert!(tree.is_empty());
    }
}
