use super::path::Nibbles;
use super::rlp::{RlpData, decode_rlp, encode_rlp};
use crate::error::NodeError;
use sha3::{Digest, Keccak256};
use std::array;

/// Content address of a node encoding.
pub type Hash256 = [u8; 32];

/// Encodings shorter than this stay inline inside their parent; everything
/// else is referenced by digest. The root is always hashed regardless.
pub const INLINE_LIMIT: usize = 32;

/// Root of the empty trie: keccak256 of the canonical empty encoding (0x80).
pub const EMPTY_ROOT: Hash256 = [
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8,
    0x6e, 0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63,
    0xb4, 0x21,
];

pub fn keccak256(data: &[u8]) -> Hash256 {
    Keccak256::digest(data).into()
}

/// Reference to a child node. A node's identity is its digest; small nodes
/// ride inline as their full canonical encoding instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeRef {
    Empty,
    Hash(Hash256),
    Inline(Vec<u8>),
}

impl NodeRef {
    pub fn is_empty(&self) -> bool {
        matches!(self, NodeRef::Empty)
    }

    /// Parse a child slot out of a decoded node: empty string means no child,
    /// fewer than 32 bytes is an inline encoding, exactly 32 is a digest.
    pub fn from_field(bytes: &[u8]) -> Result<NodeRef, NodeError> {
        match bytes.len() {
            0 => Ok(NodeRef::Empty),
            1..32 => Ok(NodeRef::Inline(bytes.to_vec())),
            32 => {
                let mut h = [0u8; 32];
                h.copy_from_slice(bytes);
                Ok(NodeRef::Hash(h))
            }
            n => Err(NodeError::BadChildRef(n)),
        }
    }

    fn as_field(&self) -> RlpData {
        match self {
            NodeRef::Empty => RlpData::String(vec![]),
            NodeRef::Hash(h) => RlpData::String(h.to_vec()),
            NodeRef::Inline(bytes) => RlpData::String(bytes.clone()),
        }
    }
}

//--- Node Kinds ---
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchNode {
    pub children: [NodeRef; 16], // 0-15 nibbles
    pub value: Option<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionNode {
    pub path: Nibbles,
    pub child: NodeRef,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafNode {
    pub path: Nibbles,
    pub value: Vec<u8>,
}

//--- Merkle Patricia Node ---
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Empty,
    Branch(BranchNode),
    Extension(ExtensionNode),
    Leaf(LeafNode),
}

impl BranchNode {
    pub fn new() -> Self {
        Self {
            children: array::from_fn(|_| NodeRef::Empty),
            value: None,
        }
    }

    /// Number of occupied child slots.
    pub fn child_count(&self) -> usize {
        self.children.iter().filter(|c| !c.is_empty()).count()
    }

    /// The (nibble, ref) of the single occupied slot, if exactly one.
    pub fn sole_child(&self) -> Option<(u8, &NodeRef)> {
        let mut found = None;
        for (i, child) in self.children.iter().enumerate() {
            if !child.is_empty() {
                if found.is_some() {
                    return None;
                }
                found = Some((i as u8, child));
            }
        }
        found
    }
}

impl Default for BranchNode {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionNode {
    pub fn new(path: Nibbles, child: NodeRef) -> Self {
        Self { path, child }
    }
}

impl LeafNode {
    pub fn new(path: Nibbles, value: Vec<u8>) -> Self {
        Self { path, value }
    }
}

impl Node {
    pub fn new_leaf(path: Nibbles, value: Vec<u8>) -> Self {
        Node::Leaf(LeafNode::new(path, value))
    }

    /// Canonical byte encoding:
    /// - Leaf/Extension: 2-item list [hex-prefix path, value or child ref]
    /// - Branch: 17-item list, 16 child slots plus the value slot
    /// - Empty: the empty string
    pub fn encode(&self) -> Vec<u8> {
        let rlp = match self {
            Node::Empty => RlpData::String(vec![]),
            Node::Leaf(leaf) => RlpData::List(vec![
                RlpData::String(leaf.path.hex_prefix(true)),
                RlpData::String(leaf.value.clone()),
            ]),
            Node::Extension(ext) => RlpData::List(vec![
                RlpData::String(ext.path.hex_prefix(false)),
                ext.child.as_field(),
            ]),
            Node::Branch(branch) => {
                let mut items: Vec<RlpData> = Vec::with_capacity(17);
                for child in &branch.children {
                    items.push(child.as_field());
                }
                items.push(match &branch.value {
                    Some(v) => RlpData::String(v.clone()),
                    None => RlpData::String(vec![]),
                });
                RlpData::List(items)
            }
        };
        encode_rlp(&rlp)
    }

    /// Digest of the canonical encoding.
    pub fn hash(&self) -> Hash256 {
        keccak256(&self.encode())
    }

    /// Inverse of [`encode`](Node::encode). Shallow: children stay as
    /// [`NodeRef`]s so proof verification can decode nodes without any store.
    pub fn decode(bytes: &[u8]) -> Result<Node, NodeError> {
        let rlp = decode_rlp(bytes)?;

        let items = match rlp {
            RlpData::String(s) if s.is_empty() => return Ok(Node::Empty),
            RlpData::String(_) => return Err(NodeError::NotANode),
            RlpData::List(items) => items,
        };

        match items.len() {
            2 => {
                let path_bytes = string_field(&items[0])?;
                let (path, is_leaf) = Nibbles::from_hex_prefix(path_bytes)?;

                if is_leaf {
                    let value = string_field(&items[1])?.to_vec();
                    Ok(Node::Leaf(LeafNode::new(path, value)))
                } else {
                    let child = NodeRef::from_field(string_field(&items[1])?)?;
                    if child.is_empty() {
                        return Err(NodeError::BadChildRef(0));
                    }
                    Ok(Node::Extension(ExtensionNode::new(path, child)))
                }
            }
            17 => {
                let mut branch = BranchNode::new();
                for (i, item) in items.iter().take(16).enumerate() {
                    branch.children[i] = NodeRef::from_field(string_field(item)?)?;
                }
                let value = string_field(&items[16])?;
                branch.value = if value.is_empty() {
                    None
                } else {
                    Some(value.to_vec())
                };
                Ok(Node::Branch(branch))
            }
            n => Err(NodeError::BadArity(n)),
        }
    }
}

fn string_field(item: &RlpData) -> Result<&[u8], NodeError> {
    match item {
        RlpData::String(bytes) => Ok(bytes),
        RlpData::List(_) => Err(NodeError::NonStringField),
    }
}
