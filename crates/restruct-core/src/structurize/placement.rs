//! Where each node's code goes in the output tree.
//!
//! Every reachable node other than the entry is placed relative to its
//! immediate dominator `d`:
//!
//! - **loop follow**: some loop contains `d` but not the node. The node is
//!   emitted right after the outermost such loop and reached with `break`.
//! - **merge follow**: the node has two or more forward predecessors. It is
//!   emitted after a wrapper block opened inside `d`, just before `d`'s
//!   terminator, and reached with `break`.
//! - **owned**: otherwise. Its single forward predecessor is `d`, which
//!   emits it in place when lowering its terminator.
//!
//! Follows of one node are kept in reverse post-order, except that the
//! heaviest exit of a loop moves to the front: it is the one placed right
//! after the loop, so its code is reached by breaking out of the loop itself
//! and needs no wrapper block. An exit's weight is the number of
//! instructions reachable from it; ties go to the earliest exit.

use crate::entity::EntityRef;
use crate::ir::cfg::{predecessors, ControlFlowGraph};
use crate::ir::{DominatorTree, LoopForest, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    Entry,
    Unreachable,
    Owned,
    MergeFollow,
    LoopFollow,
}

#[derive(Debug)]
pub(crate) struct Placements {
    kind: Vec<Placement>,
    merge_follows: Vec<Vec<NodeId>>,
    loop_follows: Vec<Vec<NodeId>>,
}

impl Placements {
    pub fn compute<G: ControlFlowGraph + ?Sized>(
        graph: &G,
        dom: &DominatorTree,
        loops: &LoopForest,
    ) -> Self {
        let count = graph.node_count();
        let preds = predecessors(graph);
        let mut placements = Placements {
            kind: vec![Placement::Unreachable; count],
            merge_follows: vec![Vec::new(); count],
            loop_follows: vec![Vec::new(); count],
        };

        // Reverse post-order keeps each follow list sorted as it grows.
        for &node in dom.reverse_postorder() {
            let idx = node.index() as usize;
            let Some(d) = dom.idom(node) else {
                placements.kind[idx] = Placement::Entry;
                continue;
            };

            let mut exited = None;
            let mut cur = loops.loop_of(d);
            while let Some(lp) = cur {
                if loops.contains(lp, node) {
                    break;
                }
                exited = Some(lp);
                cur = loops.parent(lp);
            }

            if let Some(lp) = exited {
                placements.kind[idx] = Placement::LoopFollow;
                placements.loop_follows[loops.head(lp).index() as usize].push(node);
                continue;
            }

            let forward = preds[idx]
                .iter()
                .filter(|&&p| dom.is_reachable(p) && !dom.dominates(node, p))
                .count();
            if forward >= 2 {
                placements.kind[idx] = Placement::MergeFollow;
                placements.merge_follows[d.index() as usize].push(node);
            } else {
                placements.kind[idx] = Placement::Owned;
            }
        }

        for follows in &mut placements.loop_follows {
            if follows.len() < 2 {
                continue;
            }
            let mut best = 0;
            let mut best_weight = reachable_weight(graph, follows[0]);
            for (i, &follow) in follows.iter().enumerate().skip(1) {
                let weight = reachable_weight(graph, follow);
                if weight > best_weight {
                    best = i;
                    best_weight = weight;
                }
            }
            follows[..=best].rotate_right(1);
        }
        placements
    }

    pub fn kind(&self, node: NodeId) -> Placement {
        self.kind[node.index() as usize]
    }

    /// Nodes placed after wrapper blocks inside `node`, in reverse post-order.
    pub fn merge_follows(&self, node: NodeId) -> &[NodeId] {
        &self.merge_follows[node.index() as usize]
    }

    /// Nodes placed after the loop headed by `node`, in reverse post-order.
    pub fn loop_follows(&self, node: NodeId) -> &[NodeId] {
        &self.loop_follows[node.index() as usize]
    }
}

/// Instructions in all nodes reachable from `start`, itself included.
///
/// An exit that can reach another exit weighs at least as much, so the
/// heaviest earliest exit is never entered from a sibling exit.
fn reachable_weight<G: ControlFlowGraph + ?Sized>(graph: &G, start: NodeId) -> usize {
    let mut seen = vec![false; graph.node_count()];
    let mut stack = vec![start];
    seen[start.index() as usize] = true;
    let mut weight = 0;
    while let Some(node) = stack.pop() {
        weight += graph.instructions(node).len();
        for succ in graph.successors(node) {
            let idx = succ.index() as usize;
            if !seen[idx] {
                seen[idx] = true;
                stack.push(succ);
            }
        }
    }
    weight
}
