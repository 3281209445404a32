//! Dominator tree (Lengauer-Tarjan) and reverse post-order numbering.

use crate::entity::EntityRef;

use super::cfg::ControlFlowGraph;
use super::node::NodeId;

const NONE: usize = usize::MAX;

/// Iterative path compression for the Lengauer-Tarjan union-find forest.
///
/// Updates `label` entries so each vertex records the vertex with minimum
/// `semi` value on its path to the forest root. `NONE` in `ancestor` marks
/// a root.
fn lt_compress(v: usize, ancestor: &mut [usize], label: &mut [usize], semi: &[usize]) {
    let mut path = Vec::new();
    let mut u = v;
    while ancestor[u] != NONE && ancestor[ancestor[u]] != NONE {
        path.push(u);
        u = ancestor[u];
    }
    for &w in path.iter().rev() {
        let a = ancestor[w];
        if semi[label[a]] < semi[label[w]] {
            label[w] = label[a];
        }
        ancestor[w] = ancestor[a];
    }
}

fn lt_eval(v: usize, ancestor: &mut [usize], label: &mut [usize], semi: &[usize]) -> usize {
    if ancestor[v] == NONE {
        return v;
    }
    lt_compress(v, ancestor, label, semi);
    label[v]
}

/// Depth-first walk from the entry.
///
/// Successors are explored last-first, so the resulting reverse post-order
/// lists a node's earlier successors before its later ones.
struct DepthFirst {
    /// Vertices in preorder.
    preorder: Vec<NodeId>,
    /// Preorder number of each vertex's DFS tree parent.
    parent: Vec<usize>,
    postorder: Vec<NodeId>,
    /// Preorder number per node, `NONE` when unreachable.
    dfnum: Vec<usize>,
}

fn depth_first<G: ControlFlowGraph + ?Sized>(graph: &G) -> DepthFirst {
    let count = graph.node_count();
    let mut walk = DepthFirst {
        preorder: Vec::with_capacity(count),
        parent: Vec::with_capacity(count),
        postorder: Vec::with_capacity(count),
        dfnum: vec![NONE; count],
    };
    if count == 0 {
        return walk;
    }

    let entry = graph.entry();
    walk.dfnum[entry.index() as usize] = 0;
    walk.preorder.push(entry);
    walk.parent.push(NONE);

    // Frames hold a node and its not-yet-explored successors.
    let mut stack: Vec<(NodeId, Vec<NodeId>)> = vec![(entry, graph.successors(entry))];
    while let Some((node, pending)) = stack.last_mut() {
        let node = *node;
        match pending.pop() {
            Some(succ) => {
                let idx = succ.index() as usize;
                assert!(idx < count, "{node} has out-of-range successor {succ}");
                if walk.dfnum[idx] == NONE {
                    walk.dfnum[idx] = walk.preorder.len();
                    walk.parent.push(walk.dfnum[node.index() as usize]);
                    walk.preorder.push(succ);
                    stack.push((succ, graph.successors(succ)));
                }
            }
            None => {
                walk.postorder.push(node);
                stack.pop();
            }
        }
    }
    walk
}

/// Immediate dominators, the dominance graph and reverse post-order for
/// the reachable part of a CFG.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    idom: Vec<Option<NodeId>>,
    /// Dominance children of each node, in reverse post-order.
    children: Vec<Vec<NodeId>>,
    rpo: Vec<NodeId>,
    rpo_index: Vec<usize>,
    /// Entry/exit times of a preorder walk over the dominator tree.
    tree_in: Vec<usize>,
    tree_out: Vec<usize>,
}

impl DominatorTree {
    pub fn compute<G: ControlFlowGraph + ?Sized>(graph: &G) -> Self {
        let count = graph.node_count();
        let walk = depth_first(graph);
        let n = walk.preorder.len();

        // Semidominators and immediate dominators, in preorder numbers.
        let mut semi: Vec<usize> = (0..n).collect();
        let mut idom_idx: Vec<usize> = vec![0; n];
        let mut ancestor: Vec<usize> = vec![NONE; n];
        let mut label: Vec<usize> = (0..n).collect();
        let mut bucket: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, &node) in walk.preorder.iter().enumerate() {
            for succ in graph.successors(node) {
                let s = walk.dfnum[succ.index() as usize];
                if s != NONE {
                    preds[s].push(i);
                }
            }
        }

        for i in (1..n).rev() {
            let p = walk.parent[i];
            for &v in &preds[i] {
                let u = lt_eval(v, &mut ancestor, &mut label, &semi);
                if semi[u] < semi[i] {
                    semi[i] = semi[u];
                }
            }
            bucket[semi[i]].push(i);
            ancestor[i] = p;

            for v in std::mem::take(&mut bucket[p]) {
                let u = lt_eval(v, &mut ancestor, &mut label, &semi);
                idom_idx[v] = if semi[u] < semi[v] { u } else { p };
            }
        }
        for i in 1..n {
            if idom_idx[i] != semi[i] {
                idom_idx[i] = idom_idx[idom_idx[i]];
            }
        }

        let mut idom = vec![None; count];
        for i in 1..n {
            idom[walk.preorder[i].index() as usize] = Some(walk.preorder[idom_idx[i]]);
        }

        let rpo: Vec<NodeId> = walk.postorder.iter().rev().copied().collect();
        let mut rpo_index = vec![NONE; count];
        for (i, node) in rpo.iter().enumerate() {
            rpo_index[node.index() as usize] = i;
        }

        let mut children = vec![Vec::new(); count];
        for &node in &rpo {
            if let Some(parent) = idom[node.index() as usize] {
                children[parent.index() as usize].push(node);
            }
        }

        let mut tree_in = vec![NONE; count];
        let mut tree_out = vec![NONE; count];
        if n > 0 {
            let mut clock = 0;
            let mut stack = vec![(graph.entry(), false)];
            while let Some((node, done)) = stack.pop() {
                let idx = node.index() as usize;
                if done {
                    tree_out[idx] = clock;
                    clock += 1;
                    continue;
                }
                tree_in[idx] = clock;
                clock += 1;
                stack.push((node, true));
                for &child in children[idx].iter().rev() {
                    stack.push((child, false));
                }
            }
        }

        DominatorTree {
            idom,
            children,
            rpo,
            rpo_index,
            tree_in,
            tree_out,
        }
    }

    /// Number of nodes in the underlying graph, reachable or not.
    pub fn node_count(&self) -> usize {
        self.idom.len()
    }

    /// Immediate dominator; `None` for the entry and unreachable nodes.
    pub fn idom(&self, node: NodeId) -> Option<NodeId> {
        self.idom[node.index() as usize]
    }

    /// Nodes immediately dominated by `node`, in reverse post-order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.children[node.index() as usize]
    }

    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.rpo_index[node.index() as usize] != NONE
    }

    /// Whether `a` dominates `b` (reflexive). False if either is unreachable.
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        let (a, b) = (a.index() as usize, b.index() as usize);
        if self.tree_in[a] == NONE || self.tree_in[b] == NONE {
            return false;
        }
        self.tree_in[a] <= self.tree_in[b] && self.tree_out[b] <= self.tree_out[a]
    }

    /// Reachable nodes in reverse post-order, entry first.
    pub fn reverse_postorder(&self) -> &[NodeId] {
        &self.rpo
    }

    /// Position of `node` in reverse post-order.
    ///
    /// # Panics
    /// Panics if `node` is unreachable.
    pub fn rpo_index(&self, node: NodeId) -> usize {
        let idx = self.rpo_index[node.index() as usize];
        assert!(idx != NONE, "{node} is unreachable");
        idx
    }
}
