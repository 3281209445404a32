//! Natural loop detection and the loop-nesting forest.

use crate::define_entity;
use crate::entity::{EntityRef, PrimaryMap};

use super::cfg::{predecessors, ControlFlowGraph};
use super::dominance::DominatorTree;
use super::node::NodeId;

define_entity!(LoopId, "loop");

#[derive(Debug, Clone)]
struct LoopData {
    head: NodeId,
    parent: Option<LoopId>,
}

/// Loop-nesting forest.
///
/// All back edges into the same head form one loop. Loops are numbered in
/// reverse post-order of their heads, so a parent always precedes its
/// children.
#[derive(Debug, Clone)]
pub struct LoopForest {
    loops: PrimaryMap<LoopId, LoopData>,
    /// Innermost loop containing each node.
    innermost: Vec<Option<LoopId>>,
}

impl LoopForest {
    /// Detect natural loops via back edges (u -> h where h dominates u).
    pub fn compute<G: ControlFlowGraph + ?Sized>(graph: &G, dom: &DominatorTree) -> Self {
        let preds = predecessors(graph);
        let mut forest = LoopForest {
            loops: PrimaryMap::new(),
            innermost: vec![None; graph.node_count()],
        };

        for &head in dom.reverse_postorder() {
            let latches: Vec<NodeId> = preds[head.index() as usize]
                .iter()
                .copied()
                .filter(|&p| dom.dominates(head, p))
                .collect();
            if latches.is_empty() {
                continue;
            }

            let parent = forest.innermost[head.index() as usize];
            let id = forest.loops.push(LoopData { head, parent });

            // Walk backward from the latches; everything reached without
            // passing the head is in the body. Heads are visited outermost
            // first, so overwriting `innermost` leaves the deepest loop.
            let mut in_body = vec![false; graph.node_count()];
            in_body[head.index() as usize] = true;
            forest.innermost[head.index() as usize] = Some(id);
            let mut work = latches;
            while let Some(node) = work.pop() {
                let idx = node.index() as usize;
                if in_body[idx] {
                    continue;
                }
                in_body[idx] = true;
                forest.innermost[idx] = Some(id);
                for &pred in &preds[idx] {
                    if dom.is_reachable(pred) && !in_body[pred.index() as usize] {
                        work.push(pred);
                    }
                }
            }
        }
        forest
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Innermost loop containing `node`.
    pub fn loop_of(&self, node: NodeId) -> Option<LoopId> {
        self.innermost[node.index() as usize]
    }

    pub fn head(&self, lp: LoopId) -> NodeId {
        self.loops[lp].head
    }

    pub fn parent(&self, lp: LoopId) -> Option<LoopId> {
        self.loops[lp].parent
    }

    /// Whether `node` is the head of its innermost loop.
    pub fn is_head(&self, node: NodeId) -> bool {
        self.loop_of(node).is_some_and(|lp| self.head(lp) == node)
    }

    /// Whether `node` lies in `lp` or one of its nested loops.
    pub fn contains(&self, lp: LoopId, node: NodeId) -> bool {
        let mut cur = self.loop_of(node);
        while let Some(l) = cur {
            if l == lp {
                return true;
            }
            cur = self.parent(l);
        }
        false
    }
}
