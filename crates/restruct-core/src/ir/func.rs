use serde::{Deserialize, Serialize};

use crate::entity::{EntityRef, PrimaryMap};

use super::inst::Inst;
use super::node::{Node, NodeId, Terminator};

/// A function body as a control flow graph. Node 0 is the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub nodes: PrimaryMap<NodeId, Node>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: PrimaryMap::new(),
        }
    }

    pub fn entry(&self) -> NodeId {
        NodeId::new(0)
    }

    pub fn insts(&self, id: NodeId) -> &[Inst] {
        &self.nodes[id].insts
    }

    pub fn terminator(&self, id: NodeId) -> &Terminator {
        &self.nodes[id].terminator
    }
}
