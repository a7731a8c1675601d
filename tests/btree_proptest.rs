//! Property tests: random insert sequences keep the tree well formed.

use std::collections::BTreeMap;

use blobindex::index::btree::BTree;
use blobindex::{DuplicatePolicy, IndexConfig, ValueDescriptor};
use proptest::prelude::*;
use tempfile::tempdir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    // A small alphabet so that sequences repeat keys.
    prop::collection::vec(prop::sample::select(b"abcdef".to_vec()), 0..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn overwrite_keeps_last_descriptor(
        order in 3usize..8,
        keys in prop::collection::vec(key_strategy(), 0..160),
    ) {
        init_tracing();
        let dir = tempdir().unwrap();
        let config = IndexConfig::default()
            .with_order(order)
            .with_key_max_len(8)
            .with_pool_size(6);
        let mut tree = BTree::create(dir.path().join("prop.idx"), config).unwrap();
        let mut model = BTreeMap::new();

        for (i, key) in keys.iter().enumerate() {
            let value = ValueDescriptor::new(key.len() as u64, i as u64);
            tree.insert(key, value).unwrap();
            model.insert(key.clone(), value);
        }

        let report = tree.verify().unwrap();
        prop_assert_eq!(report.keys, model.len() as u64);
        prop_assert_eq!(report.nodes, tree.head().generation);

        for (key, value) in &model {
            prop_assert_eq!(tree.search(key).unwrap().value(), Some(*value));
        }
        prop_assert!(!tree.search(b"zzz").unwrap().found);
    }

    #[test]
    fn append_keeps_every_insert(
        order in 3usize..7,
        keys in prop::collection::vec(key_strategy(), 0..120),
    ) {
        init_tracing();
        let dir = tempdir().unwrap();
        let config = IndexConfig::default()
            .with_order(order)
            .with_key_max_len(8)
            .with_duplicate_policy(DuplicatePolicy::Append);
        let mut tree = BTree::create(dir.path().join("prop.idx"), config).unwrap();

        for (i, key) in keys.iter().enumerate() {
            tree.insert(key, ValueDescriptor::new(1, i as u64)).unwrap();
        }

        let report = tree.verify().unwrap();
        prop_assert_eq!(report.keys, keys.len() as u64);
        for key in &keys {
            prop_assert!(tree.search(key).unwrap().found);
        }
    }
}
