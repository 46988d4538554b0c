//! B-tree and compound-key ordering property tests (§4.5, §8).

use proptest::prelude::*;
use vellumdb_core::index::btree::BTree;
use vellumdb_core::index::key::{IndexKey, OrderedFloat};

fn arb_index_key() -> impl Strategy<Value = IndexKey> {
    prop_oneof![
        Just(IndexKey::Null),
        any::<bool>().prop_map(IndexKey::Bool),
        any::<i64>().prop_map(IndexKey::Int),
        (-1_000_000.0..1_000_000.0f64).prop_map(|f| IndexKey::Float(OrderedFloat(f))),
        "[a-z]{0,8}".prop_map(IndexKey::String),
    ]
}

proptest! {
    /// In-order iteration of the tree always comes out sorted, regardless
    /// of insertion order.
    #[test]
    fn iteration_is_always_sorted(mut keys in prop::collection::vec(arb_index_key(), 0..200)) {
        let mut tree = BTree::<IndexKey, usize>::default();
        for (i, key) in keys.drain(..).enumerate() {
            tree.insert(key, i);
        }
        let out = tree.iter();
        for pair in out.windows(2) {
            prop_assert!(pair[0].0 <= pair[1].0);
        }
    }

    /// Every inserted `(key, value)` pair is retrievable afterward.
    #[test]
    fn every_inserted_value_is_found(pairs in prop::collection::vec((arb_index_key(), 0usize..1000), 0..200)) {
        let mut tree = BTree::<IndexKey, usize>::default();
        for (key, value) in &pairs {
            tree.insert(key.clone(), *value);
        }
        for (key, value) in &pairs {
            let values = tree.get(key).expect("key inserted must be found");
            prop_assert!(values.contains(value));
        }
        prop_assert_eq!(tree.len(), pairs.len());
    }

    /// A compound key built from two parts compares the same way as
    /// comparing those parts lexicographically, component first.
    #[test]
    fn compound_key_ordering_is_lexicographic(a0 in any::<i64>(), a1 in any::<i64>(), b0 in any::<i64>(), b1 in any::<i64>()) {
        let a = IndexKey::Compound(vec![IndexKey::Int(a0), IndexKey::Int(a1)]);
        let b = IndexKey::Compound(vec![IndexKey::Int(b0), IndexKey::Int(b1)]);
        let expected = a0.cmp(&b0).then(a1.cmp(&b1));
        prop_assert_eq!(a.cmp(&b), expected);
    }

    /// Null always sorts strictly below any non-null key of any kind.
    #[test]
    fn null_is_always_the_minimum(key in arb_index_key()) {
        prop_assume!(!matches!(key, IndexKey::Null));
        prop_assert!(IndexKey::Null < key);
    }

    /// Removing a value that was inserted shrinks the tree by exactly one
    /// and leaves the key absent if it was the value's sole occupant.
    #[test]
    fn remove_after_insert_restores_empty(key in arb_index_key(), value in 0usize..1000) {
        let mut tree = BTree::<IndexKey, usize>::default();
        tree.insert(key.clone(), value);
        prop_assert_eq!(tree.len(), 1);
        prop_assert!(tree.remove(&key, &value));
        prop_assert_eq!(tree.len(), 0);
        prop_assert!(tree.get(&key).map_or(true, |v| v.is_empty()));
    }
}
