use serde::{Deserialize, Serialize};

use crate::define_entity;

use super::inst::{CmpKind, Inst, ValueId};

define_entity!(NodeId, "n");

/// One entry of a switch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub value: i64,
    pub target: NodeId,
}

/// The control transfer that ends a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminator {
    Jump(NodeId),
    /// Go to `consequent` when `cond` is non-zero, else `alternative`.
    Branch {
        cond: ValueId,
        consequent: NodeId,
        alternative: NodeId,
    },
    /// Go to `consequent` when `lhs <cmp> rhs` holds, else `alternative`.
    BinaryBranch {
        cmp: CmpKind,
        lhs: ValueId,
        rhs: ValueId,
        consequent: NodeId,
        alternative: NodeId,
    },
    /// Multi-way branch. Cases are tried in table order.
    Switch {
        value: ValueId,
        cases: Vec<SwitchCase>,
        default: NodeId,
    },
    Return(Option<ValueId>),
    Throw(ValueId),
}

impl Terminator {
    /// Every target named by the terminator, in declaration order,
    /// duplicates included.
    pub fn targets(&self) -> Vec<NodeId> {
        match self {
            Terminator::Jump(target) => vec![*target],
            Terminator::Branch {
                consequent,
                alternative,
                ..
            }
            | Terminator::BinaryBranch {
                consequent,
                alternative,
                ..
            } => vec![*consequent, *alternative],
            Terminator::Switch { cases, default, .. } => cases
                .iter()
                .map(|case| case.target)
                .chain(std::iter::once(*default))
                .collect(),
            Terminator::Return(_) | Terminator::Throw(_) => vec![],
        }
    }

    /// Distinct targets in first-occurrence order.
    pub fn successors(&self) -> Vec<NodeId> {
        let mut succs: Vec<NodeId> = Vec::new();
        for target in self.targets() {
            if !succs.contains(&target) {
                succs.push(target);
            }
        }
        succs
    }
}

/// A basic block: straight-line instructions ending in one terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub insts: Vec<Inst>,
    pub terminator: Terminator,
}
