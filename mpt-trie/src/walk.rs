//! # Trie walk
//!
//! Depth-first traversal of the live node graph. [`Walk`] only yields
//! nodes; [`render`] turns them into a human-readable dump for debugging.

use crate::nibbles::Nibbles;
use crate::node::{Node, NodeArena, NodeId, NodeKind};
use crate::trie::Trie;

/// One visited node.
#[derive(Debug, Clone)]
pub struct WalkEntry<'a> {
    pub id: NodeId,
    /// Number of edges from the root.
    pub depth: usize,
    /// Nibbles consumed to reach this node.
    pub path: Nibbles,
    pub node: &'a Node,
}

impl WalkEntry<'_> {
    pub fn kind(&self) -> NodeKind {
        self.node.kind()
    }
}

/// Depth-first iterator over a trie, branch slots in nibble order.
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    arena: &'a NodeArena,
    stack: Vec<(NodeId, usize, Nibbles)>,
}

impl<'a> Walk<'a> {
    pub fn new(arena: &'a NodeArena, root: NodeId) -> Self {
        Walk {
            arena,
            stack: vec![(root, 0, Nibbles::new())],
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = WalkEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, depth, path) = self.stack.pop()?;
        let node = self.arena.get(id);

        match node {
            Node::Branch { children, .. } => {
                for (nibble, child) in children.iter().enumerate().rev() {
                    if child.is_empty() {
                        continue;
                    }
                    let mut child_path = path.clone();
                    child_path.push(nibble as u8);
                    self.stack.push((*child, depth + 1, child_path));
                }
            }
            Node::Extension { shared, next } => {
                let mut child_path = path.clone();
                child_path.extend(shared);
                self.stack.push((*next, depth + 1, child_path));
            }
            Node::Empty | Node::Leaf { .. } => {}
        }

        Some(WalkEntry {
            id,
            depth,
            path,
            node,
        })
    }
}

impl Trie {
    /// Walk every reachable node, starting at the root.
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(self.arena(), self.root())
    }
}

/// Dump the trie structure, stopping once `max_leaves` leaves are printed.
pub fn render(trie: &Trie, max_leaves: usize) -> String {
    let mut lines = Vec::new();
    let mut leaves = 0;

    for entry in trie.walk() {
        if leaves >= max_leaves {
            break;
        }
        let indent = "  ".repeat(entry.depth);

        let line = match entry.node {
            Node::Empty => "Empty Node".to_string(),

            Node::Leaf { rest, value } => {
                leaves += 1;
                format!(
                    "{indent}Leaf [{}] rest={} --> {}",
                    entry.path,
                    rest,
                    preview(value)
                )
            }

            Node::Extension { shared, .. } => {
                format!("{indent}Extension [{}] shared={}", entry.path, shared)
            }

            Node::Branch { children, value } => {
                let slots = children
                    .iter()
                    .enumerate()
                    .map(|(nibble, child)| {
                        let kind = if child.is_empty() {
                            "-".to_string()
                        } else {
                            trie.arena().get(*child).kind().to_string()
                        };
                        format!("{nibble:x}: {kind}")
                    })
                    .collect::<Vec<_>>()
                    .join(" | ");
                let value = value
                    .as_deref()
                    .map(|v| format!(" value={}", preview(v)))
                    .unwrap_or_default();
                format!("{indent}Branch [{}] [{slots}]{value}", entry.path)
            }
        };
        lines.push(line);
    }

    lines.join("\n")
}

/// Hex of the first four bytes of a value.
fn preview(value: &[u8]) -> String {
    match value.get(..4) {
        Some(head) if value.len() > 4 => format!("{}..", hex::encode(head)),
        _ => hex::encode(value),
    }
}
