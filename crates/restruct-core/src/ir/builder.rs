use crate::entity::{EntityRef, PrimaryMap};

use super::func::Function;
use super::inst::{BinOp, CmpKind, Inst, Op, ValueId};
use super::node::{Node, NodeId, SwitchCase, Terminator};

/// Builder for constructing a single [`Function`].
///
/// Tracks a "current node" cursor; instructions and the terminator are
/// appended to it. The entry node exists from the start.
pub struct FunctionBuilder {
    name: String,
    nodes: PrimaryMap<NodeId, (Vec<Inst>, Option<Terminator>)>,
    current: NodeId,
    next_value: u32,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let mut nodes = PrimaryMap::new();
        let entry = nodes.push((Vec::new(), None));
        Self {
            name: name.into(),
            nodes,
            current: entry,
            next_value: 0,
        }
    }

    /// Create a new, empty node. Returns its `NodeId`.
    pub fn create_node(&mut self) -> NodeId {
        self.nodes.push((Vec::new(), None))
    }

    /// Switch the cursor to the given node.
    pub fn switch_to_node(&mut self, node: NodeId) {
        self.current = node;
    }

    pub fn current_node(&self) -> NodeId {
        self.current
    }

    pub fn entry_node(&self) -> NodeId {
        NodeId::new(0)
    }

    fn fresh_value(&mut self) -> ValueId {
        let v = ValueId::new(self.next_value);
        self.next_value += 1;
        v
    }

    fn emit(&mut self, op: Op) -> ValueId {
        let result = self.fresh_value();
        self.nodes[self.current].0.push(Inst {
            result: Some(result),
            op,
        });
        result
    }

    pub fn const_int(&mut self, value: i64) -> ValueId {
        self.emit(Op::Const(value))
    }

    pub fn not(&mut self, value: ValueId) -> ValueId {
        self.emit(Op::Not(value))
    }

    pub fn binary(&mut self, op: BinOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.emit(Op::Binary { op, lhs, rhs })
    }

    pub fn cmp(&mut self, kind: CmpKind, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.emit(Op::Cmp { kind, lhs, rhs })
    }

    /// Call `func` and keep its result.
    pub fn call(&mut self, func: impl Into<String>, args: &[ValueId]) -> ValueId {
        self.emit(Op::Call {
            func: func.into(),
            args: args.to_vec(),
        })
    }

    /// Call `func` for its side effect only.
    pub fn call_void(&mut self, func: impl Into<String>, args: &[ValueId]) {
        self.nodes[self.current].0.push(Inst {
            result: None,
            op: Op::Call {
                func: func.into(),
                args: args.to_vec(),
            },
        });
    }

    fn terminate(&mut self, term: Terminator) {
        let slot = &mut self.nodes[self.current].1;
        assert!(slot.is_none(), "{} already has a terminator", self.current);
        *slot = Some(term);
    }

    pub fn jump(&mut self, target: NodeId) {
        self.terminate(Terminator::Jump(target));
    }

    pub fn branch(&mut self, cond: ValueId, consequent: NodeId, alternative: NodeId) {
        self.terminate(Terminator::Branch {
            cond,
            consequent,
            alternative,
        });
    }

    pub fn branch_cmp(
        &mut self,
        cmp: CmpKind,
        lhs: ValueId,
        rhs: ValueId,
        consequent: NodeId,
        alternative: NodeId,
    ) {
        self.terminate(Terminator::BinaryBranch {
            cmp,
            lhs,
            rhs,
            consequent,
            alternative,
        });
    }

    pub fn switch(&mut self, value: ValueId, cases: &[(i64, NodeId)], default: NodeId) {
        self.terminate(Terminator::Switch {
            value,
            cases: cases
                .iter()
                .map(|&(value, target)| SwitchCase { value, target })
                .collect(),
            default,
        });
    }

    pub fn ret(&mut self, value: Option<ValueId>) {
        self.terminate(Terminator::Return(value));
    }

    pub fn throw(&mut self, value: ValueId) {
        self.terminate(Terminator::Throw(value));
    }

    /// Finish the function.
    ///
    /// # Panics
    /// Panics if any created node was left without a terminator.
    pub fn build(self) -> Function {
        let mut func = Function::new(self.name);
        for (id, (insts, terminator)) in self.nodes.iter() {
            let Some(terminator) = terminator.clone() else {
                panic!("{id} of `{}` has no terminator", func.name);
            };
            func.nodes.push(Node {
                insts: insts.clone(),
                terminator,
            });
        }
        func
    }
}
