//! Merkle Patricia Trie: an authenticated key-value store whose root digest
//! commits to the entire contents.
//!
//! Arbitrary byte keys map to byte values through a radix-16 trie with path
//! compression. Every node is content-addressed by the keccak-256 digest of
//! its canonical encoding, so equal key/value sets always produce equal
//! roots, regardless of insertion or deletion order.
//!
//! Merkle proofs extracted with [`Trie::prove`] verify against a bare root
//! digest via [`verify_proof`], with no access to the node store. Proofs of
//! absence work the same way as proofs of membership.
//!
//! ```
//! use merkle_proof_trie::{MemoryDb, Trie, verify_proof};
//!
//! let mut trie = Trie::new(MemoryDb::new());
//! trie.insert(b"doge", b"coin")?;
//! let root = trie.root();
//!
//! let proof = trie.prove(b"doge")?;
//! assert_eq!(verify_proof(&root, b"doge", &proof, None)?, Some(b"coin".to_vec()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod kv;
pub mod trie;
pub mod utils;

pub use error::{NodeError, ProofError, RlpError, StoreError, TrieError};
pub use kv::{MemoryDb, NodeStore, SledDb};
pub use trie::{EMPTY_ROOT, Hash256, Nibbles, Node, NodeRef, Trie, keccak256, verify_proof};
