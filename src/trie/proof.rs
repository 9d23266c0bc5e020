use super::node::{Hash256, Node, NodeRef, keccak256};
use super::path::Nibbles;
use super::trie::Trie;
use crate::error::{ProofError, TrieError};
use crate::kv::NodeStore;

impl<D: NodeStore> Trie<D> {
    /// Merkle proof for `key` against the current root: the canonical
    /// encodings of every hashed node on the lookup path, root first.
    /// Inline children ride inside their parent's encoding, so they add no
    /// elements of their own.
    ///
    /// Works for absent keys too. The walk stops where a lookup would (a
    /// mismatched leaf, a diverging extension, an empty branch slot), and the
    /// elements collected up to that point prove the absence.
    pub fn prove(&self, key: &[u8]) -> Result<Vec<Vec<u8>>, TrieError> {
        let path = Nibbles::from_bytes(key);
        let mut proof = Vec::new();

        let root_bytes = self.root_bytes()?;
        let mut node = Node::decode(&root_bytes)?;
        proof.push(root_bytes);

        let mut offset = 0;
        loop {
            match node {
                Node::Empty | Node::Leaf(_) => break,
                Node::Extension(ext) => {
                    let n = ext.path.len();
                    let rest = &path.nibbles[offset..];
                    if rest.len() >= n && ext.path.nibbles == rest[..n] {
                        offset += n;
                        node = self.step(&ext.child, &mut proof)?;
                    } else {
                        break;
                    }
                }
                Node::Branch(branch) => {
                    if offset == path.len() {
                        break;
                    }
                    let child = &branch.children[path.nibbles[offset] as usize];
                    if child.is_empty() {
                        break;
                    }
                    offset += 1;
                    node = self.step(child, &mut proof)?;
                }
            }
        }

        Ok(proof)
    }

    /// Follow a child ref while proving, recording hashed nodes.
    fn step(&self, child: &NodeRef, proof: &mut Vec<Vec<u8>>) -> Result<Node, TrieError> {
        match child {
            NodeRef::Empty => Ok(Node::Empty),
            NodeRef::Inline(bytes) => Ok(Node::decode(bytes)?),
            NodeRef::Hash(h) => {
                let bytes = self.fetch(h)?;
                let node = Node::decode(&bytes)?;
                proof.push(bytes);
                Ok(node)
            }
        }
    }

    fn fetch(&self, h: &Hash256) -> Result<Vec<u8>, TrieError> {
        self.db().get(h)?.ok_or(TrieError::MissingNode(*h))
    }
}

/// Check a proof against a trusted root digest without any node store.
///
/// Returns the value bound to `key` under `root` (`None` proves absence).
/// When `expected` is given, the proved outcome must match it exactly:
/// a different value fails with [`ProofError::ValueMismatch`] and a proved
/// absence fails with [`ProofError::KeyNotProved`].
///
/// Every element must be consumed by the walk and every transition between
/// elements is digest-checked, so any byte flip, omission, or extra element
/// is rejected.
pub fn verify_proof(
    root: &Hash256,
    key: &[u8],
    proof: &[Vec<u8>],
    expected: Option<&[u8]>,
) -> Result<Option<Vec<u8>>, ProofError> {
    let first = proof.first().ok_or(ProofError::EmptyProof)?;
    if keccak256(first) != *root {
        return Err(ProofError::RootMismatch);
    }

    let path = Nibbles::from_bytes(key);
    let mut idx = 0;
    let mut node = decode_element(proof, 0)?;
    let mut offset = 0;

    let found = loop {
        match node {
            Node::Empty => break None,
            Node::Leaf(leaf) => {
                if leaf.path.nibbles == path.nibbles[offset..] {
                    break Some(leaf.value);
                }
                break None;
            }
            Node::Extension(ext) => {
                let n = ext.path.len();
                let rest = &path.nibbles[offset..];
                if rest.len() >= n && ext.path.nibbles == rest[..n] {
                    offset += n;
                    node = follow(&ext.child, proof, &mut idx)?;
                } else {
                    break None;
                }
            }
            Node::Branch(branch) => {
                if offset == path.len() {
                    break branch.value;
                }
                let child = branch.children[path.nibbles[offset] as usize].clone();
                if child.is_empty() {
                    break None;
                }
                offset += 1;
                node = follow(&child, proof, &mut idx)?;
            }
        }
    };

    // an honest proof has no elements beyond the walk's end
    if idx + 1 != proof.len() {
        return Err(ProofError::BrokenChain(idx + 1));
    }

    match (expected, found) {
        (None, found) => Ok(found),
        (Some(exp), Some(v)) if v == exp => Ok(Some(v)),
        (Some(_), Some(_)) => Err(ProofError::ValueMismatch),
        (Some(_), None) => Err(ProofError::KeyNotProved),
    }
}

fn decode_element(proof: &[Vec<u8>], index: usize) -> Result<Node, ProofError> {
    Node::decode(&proof[index]).map_err(|source| ProofError::Malformed { index, source })
}

/// Follow a child ref while verifying. Hashed children consume the next
/// proof element, which must hash to the reference.
fn follow(child: &NodeRef, proof: &[Vec<u8>], idx: &mut usize) -> Result<Node, ProofError> {
    match child {
        NodeRef::Empty => Ok(Node::Empty),
        NodeRef::Inline(bytes) => {
            let index = *idx;
            Node::decode(bytes).map_err(|source| ProofError::Malformed { index, source })
        }
        NodeRef::Hash(h) => {
            *idx += 1;
            let bytes = proof.get(*idx).ok_or(ProofError::BrokenChain(*idx))?;
            if keccak256(bytes) != *h {
                return Err(ProofError::BrokenChain(*idx));
            }
            decode_element(proof, *idx)
        }
    }
}
