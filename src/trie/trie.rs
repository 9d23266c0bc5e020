use super::node::{
    BranchNode, EMPTY_ROOT, ExtensionNode, Hash256, INLINE_LIMIT, LeafNode, Node, NodeRef,
    keccak256,
};
use super::path::Nibbles;
use crate::error::TrieError;
use crate::kv::NodeStore;
use log::debug;

/// Merkle Patricia Trie over a content-addressed node store.
///
/// The store is append-only: mutations commit fresh nodes and re-point the
/// root, leaving every node reachable from a previously returned root intact.
/// Holding an old root therefore keeps a consistent snapshot readable for as
/// long as the store retains its nodes.
pub struct Trie<D: NodeStore> {
    db: D,
    root: Hash256, // EMPTY_ROOT when the trie holds no entries
}

/// Outcome of a recursive delete (teacher for the restructuring cases:
/// a removed leaf bubbles up as a replacement node for each ancestor).
enum Removed {
    NotFound,
    Replaced(Node),
}

/// Resolve a child reference to a node, fetching hashed nodes from the store.
pub(crate) fn resolve_ref<D: NodeStore>(db: &D, r: &NodeRef) -> Result<Node, TrieError> {
    match r {
        NodeRef::Empty => Ok(Node::Empty),
        NodeRef::Inline(bytes) => Ok(Node::decode(bytes)?),
        NodeRef::Hash(h) if *h == EMPTY_ROOT => Ok(Node::Empty),
        NodeRef::Hash(h) => {
            let bytes = db.get(h)?.ok_or(TrieError::MissingNode(*h))?;
            Ok(Node::decode(&bytes)?)
        }
    }
}

impl<D: NodeStore> Trie<D> {
    /// Empty trie backed by `db`.
    pub fn new(db: D) -> Self {
        Trie {
            db,
            root: EMPTY_ROOT,
        }
    }

    /// Reopen a trie at a known root digest.
    pub fn from_root(db: D, root: Hash256) -> Self {
        Trie { db, root }
    }

    /// Digest committing to the entire current key/value set.
    pub fn root(&self) -> Hash256 {
        self.root
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    pub fn flush(&self) -> Result<(), TrieError> {
        Ok(self.db.flush()?)
    }

    pub(crate) fn resolve(&self, r: &NodeRef) -> Result<Node, TrieError> {
        resolve_ref(&self.db, r)
    }

    /// Canonical encoding of the current root node.
    pub(crate) fn root_bytes(&self) -> Result<Vec<u8>, TrieError> {
        if self.root == EMPTY_ROOT {
            return Ok(Node::Empty.encode());
        }
        self.db
            .get(&self.root)?
            .ok_or(TrieError::MissingNode(self.root))
    }

    /// Store a node and hand back the reference its parent embeds: the raw
    /// encoding when shorter than [`INLINE_LIMIT`], the digest otherwise.
    fn commit(&mut self, node: Node) -> Result<NodeRef, TrieError> {
        if let Node::Empty = node {
            return Ok(NodeRef::Empty);
        }
        let bytes = node.encode();
        if bytes.len() < INLINE_LIMIT {
            Ok(NodeRef::Inline(bytes))
        } else {
            let h = keccak256(&bytes);
            self.db.put(h, bytes)?;
            Ok(NodeRef::Hash(h))
        }
    }

    /// The root is always hashed and stored, never inlined.
    fn commit_root(&mut self, node: &Node) -> Result<Hash256, TrieError> {
        if let Node::Empty = node {
            return Ok(EMPTY_ROOT);
        }
        let bytes = node.encode();
        let h = keccak256(&bytes);
        self.db.put(h, bytes)?;
        Ok(h)
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TrieError> {
        let path = Nibbles::from_bytes(key);
        let root = self.resolve(&NodeRef::Hash(self.root))?;
        self.get_at(&root, &path.nibbles)
    }

    fn get_at(&self, node: &Node, path: &[u8]) -> Result<Option<Vec<u8>>, TrieError> {
        match node {
            Node::Empty => Ok(None),
            Node::Leaf(leaf) => {
                if leaf.path.nibbles == path {
                    Ok(Some(leaf.value.clone()))
                } else {
                    Ok(None)
                }
            }
            Node::Extension(ext) => {
                let n = ext.path.len();
                if path.len() >= n && ext.path.nibbles == path[..n] {
                    let child = self.resolve(&ext.child)?;
                    self.get_at(&child, &path[n..])
                } else {
                    Ok(None)
                }
            }
            Node::Branch(branch) => {
                if path.is_empty() {
                    return Ok(branch.value.clone());
                }
                let child_ref = &branch.children[path[0] as usize];
                if child_ref.is_empty() {
                    return Ok(None);
                }
                let child = self.resolve(child_ref)?;
                self.get_at(&child, &path[1..])
            }
        }
    }

    /// Insert or overwrite a key, committing the rebuilt spine bottom-up and
    /// returning the new root. Re-inserting an identical (key, value) pair
    /// yields the identical root. The current root is only re-pointed once
    /// the whole spine committed, so a mid-walk failure leaves it unchanged.
    ///
    /// Empty values are rejected with [`TrieError::EmptyValue`]: the
    /// canonical branch encoding represents a missing value and an empty one
    /// identically, so an empty value would silently read back as absent once
    /// its key ends at a branch. Callers needing "present but empty" must
    /// encode it non-empty at a higher layer.
    pub fn insert(&mut self, key: &[u8], value: impl AsRef<[u8]>) -> Result<Hash256, TrieError> {
        if value.as_ref().is_empty() {
            return Err(TrieError::EmptyValue);
        }
        let path = Nibbles::from_bytes(key);
        let root = self.resolve(&NodeRef::Hash(self.root))?;
        let new_root = self.insert_at(root, path, value.as_ref().to_vec())?;
        self.root = self.commit_root(&new_root)?;
        debug!("insert: root now {}", hex::encode(self.root));
        Ok(self.root)
    }

    fn insert_at(&mut self, node: Node, path: Nibbles, value: Vec<u8>) -> Result<Node, TrieError> {
        match node {
            Node::Empty => Ok(Node::new_leaf(path, value)),
            Node::Leaf(leaf) => self.diverge_leaf(leaf, path, value),
            Node::Extension(ext) => self.merge_extension(ext, path, value),
            Node::Branch(mut branch) => {
                if path.is_empty() {
                    // key terminates exactly here
                    branch.value = Some(value);
                    return Ok(Node::Branch(branch));
                }
                let slot = path.nibbles[0] as usize;
                let child = self.resolve(&branch.children[slot])?;
                let rem = Nibbles::new(path.nibbles[1..].to_vec());
                let new_child = self.insert_at(child, rem, value)?;
                branch.children[slot] = self.commit(new_child)?;
                Ok(Node::Branch(branch))
            }
        }
    }

    /// Split a leaf whose path diverges from the new key: a branch at the
    /// divergence point, wrapped in an extension when a prefix is shared.
    fn diverge_leaf(
        &mut self,
        leaf: LeafNode,
        path: Nibbles,
        value: Vec<u8>,
    ) -> Result<Node, TrieError> {
        let LeafNode {
            path: leaf_path,
            value: leaf_value,
        } = leaf;

        let k = leaf_path.lcp_len(&path.nibbles);
        let a = &leaf_path.nibbles;
        let b = &path.nibbles;

        if k == a.len() && k == b.len() {
            // identical keys, overwrite the value
            return Ok(Node::new_leaf(path, value));
        }

        let mut branch = BranchNode::new();

        let old_rem = &a[k..];
        if old_rem.is_empty() {
            branch.value = Some(leaf_value);
        } else {
            let child = Node::new_leaf(Nibbles::new(old_rem[1..].to_vec()), leaf_value);
            branch.children[old_rem[0] as usize] = self.commit(child)?;
        }

        let new_rem = &b[k..];
        if new_rem.is_empty() {
            branch.value = Some(value);
        } else {
            let child = Node::new_leaf(Nibbles::new(new_rem[1..].to_vec()), value);
            branch.children[new_rem[0] as usize] = self.commit(child)?;
        }

        self.wrap_prefix(&a[..k], branch)
    }

    /// Insert through an extension: descend when the shared segment fully
    /// matches, otherwise split the segment around a new branch.
    fn merge_extension(
        &mut self,
        ext: ExtensionNode,
        path: Nibbles,
        value: Vec<u8>,
    ) -> Result<Node, TrieError> {
        let ExtensionNode {
            path: ext_path,
            child,
        } = ext;

        let k = ext_path.lcp_len(&path.nibbles);

        if k == ext_path.len() {
            let child_node = self.resolve(&child)?;
            let rem = Nibbles::new(path.nibbles[k..].to_vec());
            let new_child = self.insert_at(child_node, rem, value)?;
            let child_ref = self.commit(new_child)?;
            return Ok(Node::Extension(ExtensionNode::new(ext_path, child_ref)));
        }

        let mut branch = BranchNode::new();

        // k < ext_path.len(), so the extension keeps at least one nibble
        let ext_rem = &ext_path.nibbles[k..];
        if ext_rem.len() == 1 {
            // child slots directly under the branch, reuse its ref unchanged
            branch.children[ext_rem[0] as usize] = child;
        } else {
            let sub = Node::Extension(ExtensionNode::new(
                Nibbles::new(ext_rem[1..].to_vec()),
                child,
            ));
            branch.children[ext_rem[0] as usize] = self.commit(sub)?;
        }

        let new_rem = &path.nibbles[k..];
        if new_rem.is_empty() {
            branch.value = Some(value);
        } else {
            let leaf = Node::new_leaf(Nibbles::new(new_rem[1..].to_vec()), value);
            branch.children[new_rem[0] as usize] = self.commit(leaf)?;
        }

        self.wrap_prefix(&ext_path.nibbles[..k], branch)
    }

    fn wrap_prefix(&mut self, prefix: &[u8], branch: BranchNode) -> Result<Node, TrieError> {
        if prefix.is_empty() {
            Ok(Node::Branch(branch))
        } else {
            let child = self.commit(Node::Branch(branch))?;
            Ok(Node::Extension(ExtensionNode::new(
                Nibbles::new(prefix.to_vec()),
                child,
            )))
        }
    }

    /// Remove a key. `Ok(false)` when the key is absent, so callers can tell
    /// "removed" from "was never there". Collapses single-child valueless
    /// branches and re-merges extension chains to keep compression maximal.
    pub fn remove(&mut self, key: &[u8]) -> Result<bool, TrieError> {
        let path = Nibbles::from_bytes(key);
        let root = self.resolve(&NodeRef::Hash(self.root))?;
        match self.remove_at(root, &path.nibbles)? {
            Removed::NotFound => Ok(false),
            Removed::Replaced(node) => {
                self.root = self.commit_root(&node)?;
                debug!("remove: root now {}", hex::encode(self.root));
                Ok(true)
            }
        }
    }

    fn remove_at(&mut self, node: Node, path: &[u8]) -> Result<Removed, TrieError> {
        match node {
            Node::Empty => Ok(Removed::NotFound),
            Node::Leaf(leaf) => {
                if leaf.path.nibbles == path {
                    Ok(Removed::Replaced(Node::Empty))
                } else {
                    Ok(Removed::NotFound)
                }
            }
            Node::Extension(ext) => {
                let n = ext.path.len();
                if path.len() < n || ext.path.nibbles != path[..n] {
                    return Ok(Removed::NotFound);
                }
                let child = self.resolve(&ext.child)?;
                match self.remove_at(child, &path[n..])? {
                    Removed::NotFound => Ok(Removed::NotFound),
                    Removed::Replaced(new_child) => {
                        Ok(Removed::Replaced(self.reattach_extension(ext, new_child)?))
                    }
                }
            }
            Node::Branch(mut branch) => {
                if path.is_empty() {
                    if branch.value.is_none() {
                        return Ok(Removed::NotFound);
                    }
                    branch.value = None;
                    return Ok(Removed::Replaced(self.collapse_branch(branch)?));
                }
                let slot = path[0] as usize;
                if branch.children[slot].is_empty() {
                    return Ok(Removed::NotFound);
                }
                let child = self.resolve(&branch.children[slot])?;
                match self.remove_at(child, &path[1..])? {
                    Removed::NotFound => Ok(Removed::NotFound),
                    Removed::Replaced(Node::Empty) => {
                        branch.children[slot] = NodeRef::Empty;
                        Ok(Removed::Replaced(self.collapse_branch(branch)?))
                    }
                    Removed::Replaced(new_child) => {
                        branch.children[slot] = self.commit(new_child)?;
                        Ok(Removed::Replaced(Node::Branch(branch)))
                    }
                }
            }
        }
    }

    /// Re-hang a rebuilt child under an extension, merging paths when the
    /// child shrank to a leaf or another extension (no extension may have an
    /// extension child).
    fn reattach_extension(
        &mut self,
        ext: ExtensionNode,
        new_child: Node,
    ) -> Result<Node, TrieError> {
        match new_child {
            Node::Empty => Ok(Node::Empty),
            Node::Leaf(leaf) => Ok(Node::Leaf(LeafNode::new(
                ext.path.merge(&leaf.path),
                leaf.value,
            ))),
            Node::Extension(child_ext) => Ok(Node::Extension(ExtensionNode::new(
                ext.path.merge(&child_ext.path),
                child_ext.child,
            ))),
            Node::Branch(branch) => {
                let child_ref = self.commit(Node::Branch(branch))?;
                Ok(Node::Extension(ExtensionNode::new(ext.path, child_ref)))
            }
        }
    }

    /// A branch left with a single child and no value must fold into that
    /// child; one with no children and a value becomes a leaf.
    fn collapse_branch(&mut self, branch: BranchNode) -> Result<Node, TrieError> {
        match branch.child_count() {
            0 => match branch.value {
                Some(v) => Ok(Node::new_leaf(Nibbles::new(vec![]), v)),
                None => Ok(Node::Empty),
            },
            1 if branch.value.is_none() => {
                if let Some((nibble, child_ref)) = branch.sole_child() {
                    let child_ref = child_ref.clone();
                    match self.resolve(&child_ref)? {
                        Node::Empty => Ok(Node::Empty),
                        Node::Leaf(leaf) => Ok(Node::Leaf(LeafNode::new(
                            Nibbles::prepend(nibble, &leaf.path.nibbles),
                            leaf.value,
                        ))),
                        Node::Extension(child_ext) => Ok(Node::Extension(ExtensionNode::new(
                            Nibbles::prepend(nibble, &child_ext.path.nibbles),
                            child_ext.child,
                        ))),
                        Node::Branch(_) => Ok(Node::Extension(ExtensionNode::new(
                            Nibbles::new(vec![nibble]),
                            child_ref,
                        ))),
                    }
                } else {
                    Ok(Node::Branch(branch))
                }
            }
            _ => Ok(Node::Branch(branch)),
        }
    }

    /// Render the trie shape for debugging.
    pub fn format_tree(&self) -> Result<String, TrieError> {
        crate::utils::display::format_tree(&self.db, self.root)
    }

    pub fn print_tree(&self) {
        match self.format_tree() {
            Ok(rendered) => print!("{}", rendered),
            Err(e) => println!("<unrenderable trie: {}>", e),
        }
    }
}
