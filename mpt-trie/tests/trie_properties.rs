use std::collections::BTreeMap;

use alloy_primitives::b256;
use mpt_trie::{index_key, verify, NodeKind, Proof, Trie, TrieError, EMPTY_ROOT};
use proptest::prelude::*;

fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(64);
    ProptestConfig {
        cases,
        ..ProptestConfig::default()
    }
}

fn rlp_string(s: &str) -> Vec<u8> {
    alloy_rlp::encode(s)
}

#[test]
fn empty_trie_hash_is_constant() {
    assert_eq!(Trie::new().hash(), EMPTY_ROOT);
    assert_eq!(
        EMPTY_ROOT,
        b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421")
    );
}

#[test]
fn index_keyed_trie_matches_fixture() {
    let mut trie = Trie::new();
    trie.put(&index_key(0), b"a".to_vec());
    trie.put(&index_key(1), b"b".to_vec());
    trie.put(&index_key(2), b"c".to_vec());

    assert_eq!(
        trie.hash(),
        b256!("1156fedce89fc940f90d82bd4baa43747209e85d14ee5f533460cbc44530aeea")
    );

    let (proof, found) = trie.prove(&index_key(1));
    assert!(found);
    assert_eq!(
        verify(trie.hash(), &index_key(1), &proof).unwrap(),
        Some(b"b".to_vec())
    );
}

#[test]
fn yellow_paper_example() {
    let entries = [
        ("a711355", "45.0 ETH"),
        ("a77d4337", "1.00 WEI"),
        ("a779365", "1.1 ETH"),
        ("a77d397", "0.12 ETH"),
    ];
    let mut trie = Trie::new();
    for (key, value) in entries {
        trie.put(&rlp_string(key), value.as_bytes().to_vec());
    }

    assert_eq!(
        trie.hash(),
        b256!("823c753be9219cb6f69b41b296b6f96afee647e85946ac1319bfd55394b33908")
    );

    for (key, value) in entries {
        let key = rlp_string(key);
        let (proof, found) = trie.prove(&key);
        assert!(found);
        assert_eq!(
            verify(trie.hash(), &key, &proof).unwrap(),
            Some(value.as_bytes().to_vec())
        );
    }
}

#[test]
fn shared_prefix_forms_one_extension() {
    let mut trie = Trie::new();
    let keys: Vec<[u8; 3]> = (0u8..4).map(|i| [0xab, 0xcd, i * 0x11 + 1]).collect();
    for (i, key) in keys.iter().enumerate() {
        trie.put(key, format!("v{i}").into_bytes());
    }

    assert_eq!(
        trie.hash(),
        b256!("e8fd93cbd5befa8767aa67de446650fdd25e1587ca0a62d3f9aca63d4b26b9f1")
    );

    let kinds: Vec<NodeKind> = trie.walk().map(|entry| entry.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::Extension,
            NodeKind::Branch,
            NodeKind::Leaf,
            NodeKind::Leaf,
            NodeKind::Leaf,
            NodeKind::Leaf,
        ]
    );

    let root = trie.walk().next().unwrap();
    assert_eq!(root.depth, 0);
    assert_eq!(root.node.kind(), NodeKind::Extension);

    for (i, key) in keys.iter().enumerate() {
        let (proof, found) = trie.prove(key);
        assert!(found);
        assert_eq!(
            verify(trie.hash(), key, &proof).unwrap(),
            Some(format!("v{i}").into_bytes())
        );
    }
}

#[test]
fn absent_key_verifies_as_none() {
    let mut trie = Trie::new();
    trie.put(b"do", b"verb".to_vec());
    trie.put(b"dog", b"puppy".to_vec());
    trie.put(b"doge", b"coin".to_vec());
    trie.put(b"horse", b"stallion".to_vec());
    let root = trie.hash();

    let (proof, found) = trie.prove(b"dot");
    assert!(!found);
    assert_eq!(verify(root, b"dot", &proof).unwrap(), None);

    // a proof built for a neighbour covers the diverging path too
    let (dog_proof, found) = trie.prove(b"dog");
    assert!(found);
    assert_eq!(verify(root, b"dot", &dog_proof).unwrap(), None);
}

#[test]
fn tampered_proof_is_rejected() {
    let mut trie = Trie::new();
    for i in 0u8..16 {
        // long values keep every node hash-referenced
        trie.put(&[i, 0x42, i], vec![i; 40]);
    }
    let root = trie.hash();

    for key in [[0u8, 0x42, 0], [7, 0x42, 7], [15, 0x42, 15]] {
        let (proof, found) = trie.prove(&key);
        assert!(found);
        let entries: Vec<(String, Vec<u8>)> = proof.into_iter().collect();

        for target in 0..entries.len() {
            for byte in 0..entries[target].1.len() {
                let mut tampered = entries.clone();
                tampered[target].1[byte] ^= 0x01;
                let tampered: Proof = tampered.into_iter().collect();

                match verify(root, &key, &tampered) {
                    Err(TrieError::ProofIncomplete { .. }) | Err(TrieError::DecodeFailure(_)) => {}
                    other => panic!("tampered proof accepted: {other:?}"),
                }
            }
        }
    }
}

#[test]
fn proof_from_other_root_is_incomplete() {
    let mut trie = Trie::new();
    trie.put(b"key", b"value".to_vec());
    let (proof, _) = trie.prove(b"key");

    let err = verify(EMPTY_ROOT, b"key", &proof).unwrap_err();
    assert_eq!(
        err,
        TrieError::ProofIncomplete {
            hash: hex::encode(EMPTY_ROOT)
        }
    );
}

prop_compose! {
    fn arb_entries()(entries in prop::collection::btree_map(
        prop::collection::vec(any::<u8>(), 0..6),
        prop::collection::vec(any::<u8>(), 1..48),
        1..24,
    )) -> BTreeMap<Vec<u8>, Vec<u8>> {
        entries
    }
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn root_is_insertion_order_independent(
        entries in arb_entries(),
        weights in prop::collection::vec(any::<u32>(), 24),
    ) {
        let mut forward = Trie::new();
        for (key, value) in &entries {
            forward.put(key, value.clone());
        }

        let mut shuffled: Vec<_> = entries.iter().zip(weights.iter()).collect();
        shuffled.sort_by_key(|(_, weight)| **weight);
        let mut permuted = Trie::new();
        for ((key, value), _) in shuffled {
            permuted.put(key, value.clone());
        }

        prop_assert_eq!(forward.hash(), permuted.hash());
    }

    #[test]
    fn every_inserted_key_round_trips(entries in arb_entries()) {
        let mut trie = Trie::new();
        for (key, value) in &entries {
            trie.put(key, value.clone());
        }
        let root = trie.hash();

        for (key, value) in &entries {
            let (proof, found) = trie.prove(key);
            prop_assert!(found);
            prop_assert_eq!(trie.get(key), Some(value.as_slice()));
            prop_assert_eq!(verify(root, key, &proof).unwrap(), Some(value.clone()));
        }
    }

    #[test]
    fn missing_keys_prove_absent(
        entries in arb_entries(),
        probe in prop::collection::vec(any::<u8>(), 0..6),
    ) {
        prop_assume!(!entries.contains_key(&probe));

        let mut trie = Trie::new();
        for (key, value) in &entries {
            trie.put(key, value.clone());
        }

        let (proof, found) = trie.prove(&probe);
        prop_assert!(!found);
        prop_assert_eq!(verify(trie.hash(), &probe, &proof).unwrap(), None);
    }
}
