pub mod node;
pub mod path;
pub mod proof;
pub mod rlp;
pub mod trie;

pub use node::{
    BranchNode, EMPTY_ROOT, ExtensionNode, Hash256, LeafNode, Node, NodeRef, keccak256,
};
pub use path::Nibbles;
pub use proof::verify_proof;
pub use trie::Trie;
