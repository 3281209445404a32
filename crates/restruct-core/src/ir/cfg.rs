//! Read-only view of a control flow graph.
//!
//! The structurizer only ever sees a graph through [`ControlFlowGraph`], so
//! any IR whose blocks end in a [`Terminator`] can be structured without
//! converting it to a [`Function`] first.

use crate::entity::EntityRef;

use super::func::Function;
use super::inst::Inst;
use super::node::{NodeId, Terminator};

pub trait ControlFlowGraph {
    /// Number of nodes; valid ids are `0..node_count()`.
    fn node_count(&self) -> usize;

    /// Non-terminator instructions of `node`, in execution order.
    fn instructions(&self, node: NodeId) -> &[Inst];

    fn terminator(&self, node: NodeId) -> &Terminator;

    /// Distinct CFG successors of `node`.
    ///
    /// Must agree with the targets of [`ControlFlowGraph::terminator`].
    fn successors(&self, node: NodeId) -> Vec<NodeId> {
        self.terminator(node).successors()
    }

    fn entry(&self) -> NodeId {
        NodeId::new(0)
    }

    fn nodes(&self) -> impl Iterator<Item = NodeId> {
        (0..self.node_count() as u32).map(NodeId::new)
    }
}

impl ControlFlowGraph for Function {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn instructions(&self, node: NodeId) -> &[Inst] {
        &self.nodes[node].insts
    }

    fn terminator(&self, node: NodeId) -> &Terminator {
        &self.nodes[node].terminator
    }
}

/// Predecessor lists indexed by node, each in ascending source order.
///
/// Edges whose target is out of range are ignored.
pub fn predecessors<G: ControlFlowGraph + ?Sized>(graph: &G) -> Vec<Vec<NodeId>> {
    let count = graph.node_count();
    let mut preds = vec![Vec::new(); count];
    for node in graph.nodes() {
        for succ in graph.successors(node) {
            if let Some(list) = preds.get_mut(succ.index() as usize) {
                list.push(node);
            }
        }
    }
    preds
}
