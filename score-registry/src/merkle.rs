//! Merkle tree for score inclusion proofs
//!
//! # Design
//!
//! - Binary Merkle tree with SHA-256 hashing
//! - Leaves are double-hashed so a leaf can never be mistaken for a node
//! - Interior nodes hash the sorted pair, so a proof is just the sibling list
//! - Odd levels duplicate their last node

use credit_primitives::{Address, ProtocolTag};
use sha2::{Digest, Sha256};

/// Hash of a (account, protocol, score) leaf
pub fn leaf_hash(account: &Address, protocol: &ProtocolTag, score: u128) -> [u8; 32] {
    let mut score_bytes = [0u8; 32];
    score_bytes[16..].copy_from_slice(&score.to_be_bytes());

    let mut hasher = Sha256::new();
    hasher.update(account.as_bytes());
    hasher.update(protocol.as_bytes());
    hasher.update(score_bytes);
    let inner: [u8; 32] = hasher.finalize().into();

    Sha256::digest(inner).into()
}

/// Hash a pair of nodes in sorted order
pub fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Sha256::new();
    hasher.update(low);
    hasher.update(high);
    hasher.finalize().into()
}

/// Check that `leaf` folds up to `root` through `proof`
pub fn verify_proof(root: &[u8; 32], leaf: &[u8; 32], proof: &[[u8; 32]]) -> bool {
    let computed = proof
        .iter()
        .fold(*leaf, |current, sibling| hash_pair(&current, sibling));
    &computed == root
}

/// Merkle tree builder (publisher side)
#[derive(Debug, Clone, Default)]
pub struct MerkleTree {
    /// Leaf hashes (indexed by position)
    leaves: Vec<[u8; 32]>,
    /// Cached root hash
    cached_root: Option<[u8; 32]>,
}

impl MerkleTree {
    /// Create empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Create tree from existing leaves
    pub fn from_leaves(leaves: Vec<[u8; 32]>) -> Self {
        Self {
            leaves,
            cached_root: None,
        }
    }

    /// Append a new leaf
    pub fn append(&mut self, leaf: [u8; 32]) {
        self.leaves.push(leaf);
        self.cached_root = None;
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Compute Merkle root (zero for an empty tree)
    pub fn root(&mut self) -> [u8; 32] {
        if let Some(root) = self.cached_root {
            return root;
        }

        let root = match self.leaves.len() {
            0 => [0u8; 32],
            1 => self.leaves[0],
            _ => {
                let mut level = self.leaves.clone();
                while level.len() > 1 {
                    level = next_level(&level);
                }
                level[0]
            }
        };

        self.cached_root = Some(root);
        root
    }

    /// Sibling path for the leaf at `index`
    pub fn proof(&self, index: usize) -> Option<Vec<[u8; 32]>> {
        if index >= self.leaves.len() {
            return None;
        }

        let mut siblings = Vec::new();
        let mut level = self.leaves.clone();
        let mut position = index;

        while level.len() > 1 {
            let sibling = if position % 2 == 0 {
                // Last node of an odd level pairs with itself
                level.get(position + 1).copied().unwrap_or(level[position])
            } else {
                level[position - 1]
            };
            siblings.push(sibling);

            level = next_level(&level);
            position /= 2;
        }

        Some(siblings)
    }
}

fn next_level(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            hash_pair(left, right)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaves(n: usize) -> Vec<[u8; 32]> {
        let protocol = ProtocolTag::from_label("arcx.credit");
        (0..n)
            .map(|i| {
                let account = Address::from_label(&format!("account-{i}"));
                leaf_hash(&account, &protocol, 100 * i as u128)
            })
            .collect()
    }

    #[test]
    fn test_empty_tree() {
        let mut tree = MerkleTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), [0u8; 32]);
        assert!(tree.proof(0).is_none());
    }

    #[test]
    fn test_single_leaf() {
        let leaf = leaves(1)[0];
        let mut tree = MerkleTree::from_leaves(vec![leaf]);
        assert_eq!(tree.root(), leaf);
        let proof = tree.proof(0).unwrap();
        assert!(proof.is_empty());
        assert!(verify_proof(&tree.root(), &leaf, &proof));
    }

    #[test]
    fn test_pair_hash_is_order_independent() {
        let l = leaves(2);
        assert_eq!(hash_pair(&l[0], &l[1]), hash_pair(&l[1], &l[0]));
    }

    #[test]
    fn test_every_leaf_proves_for_odd_and_even_sizes() {
        for size in [2usize, 3, 5, 8, 13] {
            let l = leaves(size);
            let mut tree = MerkleTree::from_leaves(l.clone());
            let root = tree.root();
            for (i, leaf) in l.iter().enumerate() {
                let proof = tree.proof(i).unwrap();
                assert!(verify_proof(&root, leaf, &proof), "size {size} leaf {i}");
            }
        }
    }

    #[test]
    fn test_wrong_leaf_rejected() {
        let l = leaves(4);
        let mut tree = MerkleTree::from_leaves(l.clone());
        let root = tree.root();
        let proof = tree.proof(1).unwrap();
        assert!(!verify_proof(&root, &l[2], &proof));
    }

    #[test]
    fn test_leaf_hash_binds_every_field() {
        let alice = Address::from_label("alice");
        let credit = ProtocolTag::from_label("arcx.credit");
        let limit = ProtocolTag::from_label("arcx.limit");
        let base = leaf_hash(&alice, &credit, 500);
        assert_ne!(base, leaf_hash(&alice, &credit, 501));
        assert_ne!(base, leaf_hash(&alice, &limit, 500));
        assert_ne!(base, leaf_hash(&Address::from_label("bob"), &credit, 500));
    }

    #[test]
    fn test_append_invalidates_cache() {
        let l = leaves(3);
        let mut tree = MerkleTree::from_leaves(l[..2].to_vec());
        let before = tree.root();
        tree.append(l[2]);
        assert_ne!(before, tree.root());
        assert_eq!(tree.len(), 3);
    }

    proptest! {
        #[test]
        fn prop_every_leaf_verifies(size in 1usize..40, pick in 0usize..40) {
            let l = leaves(size);
            let index = pick % size;
            let mut tree = MerkleTree::from_leaves(l.clone());
            let proof = tree.proof(index).unwrap();
            prop_assert!(verify_proof(&tree.root(), &l[index], &proof));
        }
    }
}
