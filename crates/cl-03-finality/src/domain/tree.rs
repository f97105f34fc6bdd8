//! # Checkpoint Tree
//!
//! Arena of checkpoint nodes rooted at the last finalized checkpoint. Nodes
//! are addressed by [`NodeId`] and own the ids of their children; two hash
//! indexes resolve a node from a checkpoint hash or from any block applied
//! into it.

use std::collections::HashMap;

use shared_types::Hash;

use super::checkpoint::{Checkpoint, CheckpointStatus};

pub type NodeId = u64;

#[derive(Debug, Clone)]
pub struct CheckpointNode {
    pub checkpoint: Checkpoint,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug)]
pub struct CheckpointTree {
    nodes: HashMap<NodeId, CheckpointNode>,
    /// Current checkpoint hash -> node. Growing nodes are re-keyed as their
    /// epoch extends.
    by_hash: HashMap<Hash, NodeId>,
    /// Every block applied into a node -> that node.
    block_index: HashMap<Hash, NodeId>,
    root: NodeId,
    next_id: NodeId,
}

impl CheckpointTree {
    pub fn new(root: Checkpoint) -> Self {
        let mut tree = Self {
            nodes: HashMap::new(),
            by_hash: HashMap::new(),
            block_index: HashMap::new(),
            root: 0,
            next_id: 1,
        };
        tree.by_hash.insert(root.hash, 0);
        tree.block_index.insert(root.hash, 0);
        tree.nodes.insert(
            0,
            CheckpointNode {
                checkpoint: root,
                parent: None,
                children: Vec::new(),
            },
        );
        tree
    }

    /// Build from a root and its persisted successors. Successors whose
    /// parent is unknown are returned unattached.
    pub fn from_checkpoints(root: Checkpoint, mut rest: Vec<Checkpoint>) -> (Self, Vec<Checkpoint>) {
        let mut tree = Self::new(root);
        rest.sort_by_key(|c| c.height);
        let mut orphaned = Vec::new();
        for checkpoint in rest {
            match tree.node_by_hash(&checkpoint.parent_hash) {
                Some(parent) => {
                    tree.add_child(parent, checkpoint);
                }
                None => orphaned.push(checkpoint),
            }
        }
        (tree, orphaned)
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> &Checkpoint {
        // The root is never removed from the arena.
        &self.nodes[&self.root].checkpoint
    }

    pub fn node(&self, id: NodeId) -> Option<&CheckpointNode> {
        self.nodes.get(&id)
    }

    pub fn checkpoint(&self, id: NodeId) -> Option<&Checkpoint> {
        self.nodes.get(&id).map(|n| &n.checkpoint)
    }

    pub fn checkpoint_mut(&mut self, id: NodeId) -> Option<&mut Checkpoint> {
        self.nodes.get_mut(&id).map(|n| &mut n.checkpoint)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn node_by_hash(&self, hash: &Hash) -> Option<NodeId> {
        self.by_hash.get(hash).copied()
    }

    pub fn checkpoint_by_hash(&self, hash: &Hash) -> Option<&Checkpoint> {
        self.node_by_hash(hash).and_then(|id| self.checkpoint(id))
    }

    /// Whether `block_hash` was applied into any live node.
    pub fn contains_block(&self, block_hash: &Hash) -> bool {
        self.block_index.contains_key(block_hash) || self.by_hash.contains_key(block_hash)
    }

    /// Attach `checkpoint` under `parent`. A child opened with
    /// [`Checkpoint::child`] still carries its parent's hash; that key keeps
    /// resolving to the parent until the child advances past it.
    pub fn add_child(&mut self, parent: NodeId, checkpoint: Checkpoint) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.by_hash.entry(checkpoint.hash).or_insert(id);
        self.block_index.entry(checkpoint.hash).or_insert(id);
        self.nodes.insert(
            id,
            CheckpointNode {
                checkpoint,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        id
    }

    /// Move a growing node's tip to `block_hash`.
    pub fn advance(&mut self, id: NodeId, block_hash: Hash, height: u64, timestamp: u64) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if self.by_hash.get(&node.checkpoint.hash) == Some(&id) {
            self.by_hash.remove(&node.checkpoint.hash);
        }
        node.checkpoint.hash = block_hash;
        node.checkpoint.height = height;
        node.checkpoint.timestamp = timestamp;
        self.by_hash.insert(block_hash, id);
        self.block_index.insert(block_hash, id);
    }

    /// Nodes in arena order, root included.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Checkpoint)> {
        self.nodes.iter().map(|(id, n)| (*id, &n.checkpoint))
    }

    /// Highest justified (or finalized) checkpoint in the tree.
    pub fn last_justified(&self) -> &Checkpoint {
        self.nodes
            .values()
            .map(|n| &n.checkpoint)
            .filter(|c| c.is_justified())
            .max_by_key(|c| (c.height, c.hash))
            .unwrap_or_else(|| self.root())
    }

    /// Nearest strictly-justified ancestor of `id`. Reaching a finalized
    /// checkpoint first means the branch has nothing left to vote from.
    pub fn last_justified_on_branch(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(pid) = current {
            match self.checkpoint(pid)?.status {
                CheckpointStatus::Justified => return Some(pid),
                CheckpointStatus::Finalized => return None,
                _ => current = self.parent(pid),
            }
        }
        None
    }

    /// Fork choice: maximise (justified ancestor height, height, hash).
    pub fn best_node(&self) -> NodeId {
        let root_justified = self.root().height;
        let mut best = (root_justified, self.root().height, self.root().hash, self.root);
        let mut stack = vec![(self.root, root_justified)];

        while let Some((id, inherited)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let justified = if node.checkpoint.is_justified() {
                node.checkpoint.height
            } else {
                inherited
            };
            let candidate = (justified, node.checkpoint.height, node.checkpoint.hash, id);
            if candidate > best {
                best = candidate;
            }
            stack.extend(node.children.iter().map(|child| (*child, justified)));
        }
        best.3
    }

    /// Re-root at `new_root`, dropping every node outside its subtree.
    pub fn prune_to(&mut self, new_root: NodeId) {
        if !self.nodes.contains_key(&new_root) {
            return;
        }
        let mut keep = Vec::new();
        let mut stack = vec![new_root];
        while let Some(id) = stack.pop() {
            keep.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().copied());
            }
        }

        let mut kept = HashMap::with_capacity(keep.len());
        for id in keep {
            if let Some(node) = self.nodes.remove(&id) {
                kept.insert(id, node);
            }
        }
        self.nodes = kept;
        if let Some(root) = self.nodes.get_mut(&new_root) {
            root.parent = None;
        }
        self.root = new_root;

        let nodes = &self.nodes;
        self.by_hash.retain(|_, id| nodes.contains_key(id));
        self.block_index.retain(|_, id| nodes.contains_key(id));
    }
}
