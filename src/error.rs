//! Error types for the trie engine, node codec and proof verifier.

use thiserror::Error;

/// Errors raised while decoding the canonical RLP byte format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RlpError {
    #[error("empty input")]
    EmptyInput,

    #[error("input truncated, {needed} more bytes required")]
    Truncated { needed: usize },

    #[error("{0} trailing bytes after the top-level item")]
    TrailingBytes(usize),

    #[error("long-form length is not minimally encoded")]
    NonMinimalLength,
}

/// Errors raised while decoding node encodings into the four node variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("invalid rlp: {0}")]
    Rlp(#[from] RlpError),

    #[error("node encoding is neither a list nor the empty string")]
    NotANode,

    #[error("node list must have 2 or 17 items, got {0}")]
    BadArity(usize),

    #[error("invalid hex-prefix flag nibble: {0:#x}")]
    BadFlag(u8),

    #[error("hex-prefix path is empty")]
    EmptyPath,

    #[error("expected a byte string field")]
    NonStringField,

    #[error("nonzero padding nibble {0:#x} in even-length hex-prefix path")]
    BadPadding(u8),

    #[error("child reference of {0} bytes is neither inline nor a digest")]
    BadChildRef(usize),
}

/// Failure of the content-addressed node store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Backend(Box::new(e))
    }
}

/// Errors surfaced by trie operations. An absent key is not an error:
/// `get` returns `Ok(None)` and `remove` returns `Ok(false)`.
#[derive(Error, Debug)]
pub enum TrieError {
    #[error("malformed node: {0}")]
    MalformedNode(#[from] NodeError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("node {} referenced but missing from store", hex::encode(.0))]
    MissingNode([u8; 32]),

    #[error("empty values cannot be stored; the canonical encoding cannot tell them from absence")]
    EmptyValue,
}

/// Tagged proof verification failures. Verification never panics; every
/// rejection carries its reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("proof contains no nodes")]
    EmptyProof,

    #[error("first proof node does not hash to the claimed root")]
    RootMismatch,

    #[error("proof chain broken at element {0}")]
    BrokenChain(usize),

    #[error("proved value does not match the expected value")]
    ValueMismatch,

    #[error("key not proved present")]
    KeyNotProved,

    #[error("malformed proof node at element {index}: {source}")]
    Malformed { index: usize, source: NodeError },
}
