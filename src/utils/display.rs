use crate::error::TrieError;
use crate::kv::NodeStore;
use crate::trie::node::{Hash256, Node, NodeRef};
use crate::trie::trie::resolve_ref;
use std::fmt::Write;

/// ASCII rendering of the trie rooted at `root`, one node per line with
/// box-drawing connectors. Debug aid only; the output format is not stable.
pub fn format_tree<D: NodeStore>(db: &D, root: Hash256) -> Result<String, TrieError> {
    let mut out = String::new();
    let _ = writeln!(out, "root {}", short_hex(&root));

    let node = resolve_ref(db, &NodeRef::Hash(root))?;
    render(db, &node, "", &mut out)?;
    Ok(out)
}

fn render<D: NodeStore>(
    db: &D,
    node: &Node,
    prefix: &str,
    out: &mut String,
) -> Result<(), TrieError> {
    match node {
        Node::Empty => {
            let _ = writeln!(out, "{}└── (empty)", prefix);
        }
        Node::Leaf(leaf) => {
            let _ = writeln!(
                out,
                "{}└── leaf {} = {}",
                prefix,
                nibble_str(&leaf.path.nibbles),
                printable(&leaf.value)
            );
        }
        Node::Extension(ext) => {
            let _ = writeln!(
                out,
                "{}└── ext {} {}",
                prefix,
                nibble_str(&ext.path.nibbles),
                ref_str(&ext.child)
            );
            let child = resolve_ref(db, &ext.child)?;
            render(db, &child, &format!("{}    ", prefix), out)?;
        }
        Node::Branch(branch) => {
            let _ = writeln!(out, "{}└── branch{}", prefix, value_str(&branch.value));

            let occupied: Vec<usize> = (0..16)
                .filter(|&i| !branch.children[i].is_empty())
                .collect();

            for (pos, &i) in occupied.iter().enumerate() {
                let last = pos == occupied.len() - 1;
                let connector = if last { "└──" } else { "├──" };
                let child_prefix = if last {
                    format!("{}        ", prefix)
                } else {
                    format!("{}    │   ", prefix)
                };

                let _ = writeln!(
                    out,
                    "{}    {} [{:x}] {}",
                    prefix,
                    connector,
                    i,
                    ref_str(&branch.children[i])
                );
                let child = resolve_ref(db, &branch.children[i])?;
                render(db, &child, &child_prefix, out)?;
            }
        }
    }
    Ok(())
}

fn short_hex(h: &Hash256) -> String {
    format!("{}..", &hex::encode(h)[..8])
}

fn ref_str(r: &NodeRef) -> String {
    match r {
        NodeRef::Empty => "-".to_string(),
        NodeRef::Hash(h) => short_hex(h),
        NodeRef::Inline(bytes) => format!("(inline {}B)", bytes.len()),
    }
}

fn value_str(value: &Option<Vec<u8>>) -> String {
    match value {
        Some(v) => format!(" = {}", printable(v)),
        None => String::new(),
    }
}

fn nibble_str(nibbles: &[u8]) -> String {
    if nibbles.is_empty() {
        return "(empty path)".to_string();
    }
    nibbles.iter().map(|n| format!("{:x}", n)).collect()
}

fn printable(value: &[u8]) -> String {
    match std::str::from_utf8(value) {
        Ok(s) if s.chars().all(|c| !c.is_control()) => format!("{:?}", s),
        _ => format!("0x{}", hex::encode(value)),
    }
}

#[cfg(test)]
mod unit_tests {
    use crate::kv::MemoryDb;
    use crate::trie::Trie;

    #[test]
    fn renders_every_key() {
        let mut t = Trie::new(MemoryDb::new());
        t.insert(b"do", b"verb").unwrap();
        t.insert(b"dog", b"puppy").unwrap();
        t.insert(b"doge", b"coin").unwrap();

        let rendered = t.format_tree().unwrap();
        assert!(rendered.contains("root"));
        assert!(rendered.contains("\"verb\""));
        assert!(rendered.contains("\"puppy\""));
        assert!(rendered.contains("\"coin\""));
    }

    #[test]
    fn renders_empty_trie() {
        let t: Trie<MemoryDb> = Trie::new(MemoryDb::new());
        let rendered = t.format_tree().unwrap();
        assert!(rendered.contains("(empty)"));
    }
}
