//! Binary hash tree over the entry digests of one transaction.
//!
//! Leaves are `sha256(0x00 || digest)`, inner nodes `sha256(0x01 || l || r)`.
//! Levels are reduced pairwise; an unpaired last node is carried up to the
//! next level unchanged. This yields the same shape as splitting at the
//! largest power of two below the width, which is what the server builds.
//!
//! All levels live in one contiguous buffer. Level `l` starts at
//! `level_offsets[l]` and has room for `ceil(max_width / 2^l)` nodes.

use serde::{Deserialize, Serialize};

use crate::crypto::{leaf_hash, node_hash, Sha256Hash};
use crate::error::{Error, Result};

/// Proof that a leaf belongs to a tree of a given width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// Index of the proven leaf.
    pub leaf: usize,
    /// Width of the tree the proof was extracted from.
    pub width: usize,
    /// Sibling roots, from the leaf level upwards.
    pub terms: Vec<Sha256Hash>,
}

/// A hash tree with a fixed maximum width.
#[derive(Debug, Clone)]
pub struct HTree {
    nodes: Vec<Sha256Hash>,
    level_offsets: Vec<usize>,
    max_width: usize,
    width: usize,
    root: Sha256Hash,
}

impl HTree {
    /// Allocate a tree able to hold up to `max_width` leaves.
    pub fn new(max_width: usize) -> Result<Self> {
        if max_width < 1 {
            return Err(Error::IllegalArguments("max width must be at least 1".into()));
        }

        let mut level_offsets = Vec::with_capacity(bits_len(max_width - 1) + 1);
        let mut total = 0;
        let mut level_width = max_width;
        loop {
            level_offsets.push(total);
            total += level_width;
            if level_width == 1 {
                break;
            }
            level_width = (level_width + 1) / 2;
        }

        Ok(Self {
            nodes: vec![Sha256Hash::ZERO; total],
            level_offsets,
            max_width,
            width: 0,
            root: Sha256Hash::ZERO,
        })
    }

    /// Allocate a tree sized exactly to `digests` and build it.
    pub fn build(digests: &[Sha256Hash]) -> Result<Self> {
        if digests.is_empty() {
            return Err(Error::IllegalArguments("no digests to build a tree from".into()));
        }
        let mut tree = Self::new(digests.len())?;
        tree.build_with(digests)?;
        Ok(tree)
    }

    /// Rebuild the tree over `digests`, replacing any previous content.
    pub fn build_with(&mut self, digests: &[Sha256Hash]) -> Result<()> {
        if digests.is_empty() {
            return Err(Error::IllegalArguments("no digests to build a tree from".into()));
        }
        if digests.len() > self.max_width {
            return Err(Error::MaxWidthExceeded {
                width: digests.len(),
                max_width: self.max_width,
            });
        }

        for (i, digest) in digests.iter().enumerate() {
            self.nodes[i] = leaf_hash(digest);
        }

        let mut level = 0;
        let mut w = digests.len();
        while w > 1 {
            let src = self.level_offsets[level];
            let dst = self.level_offsets[level + 1];

            let mut wn = 0;
            let mut i = 0;
            while i + 1 < w {
                self.nodes[dst + wn] = node_hash(&self.nodes[src + i], &self.nodes[src + i + 1]);
                wn += 1;
                i += 2;
            }
            if w % 2 == 1 {
                // Carried, not rehashed
                self.nodes[dst + wn] = self.nodes[src + w - 1];
                wn += 1;
            }

            level += 1;
            w = wn;
        }

        self.width = digests.len();
        self.root = self.nodes[self.level_offsets[level]];
        Ok(())
    }

    /// Number of leaves in the built tree, 0 if never built.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn max_width(&self) -> usize {
        self.max_width
    }

    /// Root of the built tree.
    pub fn root(&self) -> Result<Sha256Hash> {
        if self.width == 0 {
            return Err(Error::TreeNotBuilt);
        }
        Ok(self.root)
    }

    /// Extract the inclusion proof for leaf `i`.
    ///
    /// Descends the implicit tree by repeatedly splitting the current subtree
    /// at the largest power of two below its size, collecting the root of the
    /// sibling subtree at each step.
    pub fn inclusion_proof(&self, i: usize) -> Result<InclusionProof> {
        if self.width == 0 {
            return Err(Error::TreeNotBuilt);
        }
        if i >= self.width {
            return Err(Error::IllegalArguments(format!(
                "leaf {i} out of range for width {}",
                self.width
            )));
        }

        let mut proof = InclusionProof {
            leaf: i,
            width: self.width,
            terms: Vec::new(),
        };
        if self.width == 1 {
            return Ok(proof);
        }

        let mut m = i;
        let mut n = self.width;
        let mut offset = 0;

        loop {
            let k = 1 << (bits_len(n - 1) - 1);

            let (l, r) = if m < k {
                let sibling = (offset + k, offset + n - 1);
                n = k;
                sibling
            } else {
                let sibling = (offset, offset + k - 1);
                m -= k;
                n -= k;
                offset += k;
                sibling
            };

            let layer = bits_len(r - l);
            let index = l >> layer;
            proof.terms.push(self.node(layer, index));

            if n == 1 && m == 0 {
                break;
            }
        }

        // Collected root-first; verification walks leaf-first
        proof.terms.reverse();
        Ok(proof)
    }

    fn node(&self, layer: usize, index: usize) -> Sha256Hash {
        self.nodes[self.level_offsets[layer] + index]
    }
}

/// Verify that `digest` is the leaf at `proof.leaf` of a tree with root `root`.
pub fn verify_inclusion(proof: &InclusionProof, digest: &Sha256Hash, root: &Sha256Hash) -> bool {
    if proof.width == 0 || proof.leaf >= proof.width {
        return false;
    }

    let mut calc = leaf_hash(digest);
    let mut i = proof.leaf;
    let mut r = proof.width - 1;

    for term in &proof.terms {
        calc = if i % 2 == 0 && i != r {
            node_hash(&calc, term)
        } else {
            node_hash(term, &calc)
        };
        i /= 2;
        r /= 2;
    }

    i == r && calc == *root
}

/// Number of bits needed to represent `x`.
pub(crate) fn bits_len(x: usize) -> usize {
    (usize::BITS - x.leading_zeros()) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digests(n: usize) -> Vec<Sha256Hash> {
        (0..n).map(|i| Sha256Hash::hash(&(i as u64).to_be_bytes())).collect()
    }

    /// Largest-power-of-two split, computed recursively.
    fn reference_root(leaves: &[Sha256Hash]) -> Sha256Hash {
        if leaves.len() == 1 {
            return leaves[0];
        }
        let k = 1 << (bits_len(leaves.len() - 1) - 1);
        node_hash(&reference_root(&leaves[..k]), &reference_root(&leaves[k..]))
    }

    #[test]
    fn test_empty_and_oversized_rejected() {
        assert!(HTree::new(0).is_err());
        assert!(HTree::build(&[]).is_err());

        let mut tree = HTree::new(2).unwrap();
        let result = tree.build_with(&digests(3));
        assert!(matches!(
            result,
            Err(Error::MaxWidthExceeded { width: 3, max_width: 2 })
        ));
    }

    #[test]
    fn test_root_before_build_fails() {
        let tree = HTree::new(4).unwrap();
        assert_eq!(tree.root(), Err(Error::TreeNotBuilt));
        assert!(tree.inclusion_proof(0).is_err());
    }

    #[test]
    fn test_single_leaf() {
        let ds = digests(1);
        let tree = HTree::build(&ds).unwrap();
        assert_eq!(tree.root().unwrap(), leaf_hash(&ds[0]));

        let proof = tree.inclusion_proof(0).unwrap();
        assert!(proof.terms.is_empty());
        assert!(verify_inclusion(&proof, &ds[0], &tree.root().unwrap()));
    }

    #[test]
    fn test_carry_rule_matches_power_of_two_split() {
        for n in 1..=40 {
            let ds = digests(n);
            let leaves: Vec<_> = ds.iter().map(leaf_hash).collect();
            let tree = HTree::build(&ds).unwrap();
            assert_eq!(tree.root().unwrap(), reference_root(&leaves), "width {n}");
        }
    }

    #[test]
    fn test_three_leaves_shape() {
        let ds = digests(3);
        let tree = HTree::build(&ds).unwrap();
        let l: Vec<_> = ds.iter().map(leaf_hash).collect();
        let expected = node_hash(&node_hash(&l[0], &l[1]), &l[2]);
        assert_eq!(tree.root().unwrap(), expected);
    }

    #[test]
    fn test_every_leaf_proves_for_every_width() {
        for n in 1..=33 {
            let ds = digests(n);
            let tree = HTree::build(&ds).unwrap();
            let root = tree.root().unwrap();
            for (i, d) in ds.iter().enumerate() {
                let proof = tree.inclusion_proof(i).unwrap();
                assert_eq!(proof.leaf, i);
                assert_eq!(proof.width, n);
                assert!(verify_inclusion(&proof, d, &root), "width {n} leaf {i}");
            }
        }
    }

    #[test]
    fn test_rebuild_with_fewer_leaves() {
        let mut tree = HTree::new(8).unwrap();
        tree.build_with(&digests(8)).unwrap();

        let ds = digests(5);
        tree.build_with(&ds).unwrap();
        assert_eq!(tree.width(), 5);
        assert_eq!(tree.root().unwrap(), HTree::build(&ds).unwrap().root().unwrap());
        let proof = tree.inclusion_proof(4).unwrap();
        assert!(verify_inclusion(&proof, &ds[4], &tree.root().unwrap()));
    }

    #[test]
    fn test_five_letters_tamper() {
        let ds: Vec<_> = [b"a", b"b", b"c", b"d", b"e"]
            .iter()
            .map(|s| Sha256Hash::hash(&s[..]))
            .collect();
        let tree = HTree::build(&ds).unwrap();
        let root = tree.root().unwrap();

        let proof = tree.inclusion_proof(2).unwrap();
        assert!(verify_inclusion(&proof, &ds[2], &root));

        for bit in 0..8 {
            let mut tampered = proof.clone();
            tampered.terms[0].0[0] ^= 1 << bit;
            assert!(!verify_inclusion(&tampered, &ds[2], &root));
        }

        let mut bad_root = root;
        bad_root.0[31] ^= 1;
        assert!(!verify_inclusion(&proof, &ds[2], &bad_root));
        assert!(!verify_inclusion(&proof, &ds[3], &root));
    }

    #[test]
    fn test_out_of_range_proof() {
        let tree = HTree::build(&digests(4)).unwrap();
        assert!(tree.inclusion_proof(4).is_err());

        let bogus = InclusionProof {
            leaf: 4,
            width: 4,
            terms: vec![],
        };
        assert!(!verify_inclusion(&bogus, &Sha256Hash::ZERO, &tree.root().unwrap()));
    }

    proptest::proptest! {
        #[test]
        fn prop_tampered_term_fails(n in 2usize..200, seed in 0usize..1000, byte in 0usize..32) {
            let ds = digests(n);
            let tree = HTree::build(&ds).unwrap();
            let root = tree.root().unwrap();
            let i = seed % n;

            let mut proof = tree.inclusion_proof(i).unwrap();
            proptest::prop_assert!(verify_inclusion(&proof, &ds[i], &root));

            let t = seed % proof.terms.len();
            proof.terms[t].0[byte] ^= 0x80;
            proptest::prop_assert!(!verify_inclusion(&proof, &ds[i], &root));
        }
    }
}
