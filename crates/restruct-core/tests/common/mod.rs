//! Reference interpreter shared by the integration tests.
//!
//! Runs a CFG and a structured tree against the same script of call
//! results and records every call made, so the two can be compared.

#![allow(dead_code)]

use std::collections::HashMap;

use restruct_core::ir::{Condition, Expr, Function, Inst, LabelId, Op, Stmt, Terminator, ValueId};
use restruct_core::entity::EntityRef;
use restruct_core::ir::cfg::ControlFlowGraph;

/// How an execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Returned(Option<i64>),
    Threw(i64),
    /// The call budget ran out, most likely in an infinite loop.
    OutOfFuel,
}

/// Observable behavior of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub calls: Vec<String>,
    pub outcome: Outcome,
}

struct Machine<'a> {
    script: &'a [i64],
    next: usize,
    fuel: usize,
    values: HashMap<ValueId, i64>,
    calls: Vec<String>,
}

struct OutOfFuel;

impl<'a> Machine<'a> {
    fn new(script: &'a [i64], fuel: usize) -> Self {
        assert!(!script.is_empty());
        Self {
            script,
            next: 0,
            fuel,
            values: HashMap::new(),
            calls: Vec::new(),
        }
    }

    fn get(&self, v: ValueId) -> i64 {
        self.values.get(&v).copied().unwrap_or(0)
    }

    /// Every call is logged with its arguments and answered from the script.
    fn call(&mut self, func: &str, args: Vec<i64>) -> Result<i64, OutOfFuel> {
        if self.calls.len() >= self.fuel {
            return Err(OutOfFuel);
        }
        self.calls.push(format!("{func}{args:?}"));
        let result = self.script[self.next % self.script.len()];
        self.next += 1;
        Ok(result)
    }

    fn inst(&mut self, inst: &Inst) -> Result<(), OutOfFuel> {
        let value = match &inst.op {
            Op::Const(n) => *n,
            Op::Copy(v) => self.get(*v),
            Op::Not(v) => i64::from(self.get(*v) == 0),
            Op::Binary { op, lhs, rhs } => op.eval(self.get(*lhs), self.get(*rhs)),
            Op::Cmp { kind, lhs, rhs } => i64::from(kind.holds(self.get(*lhs), self.get(*rhs))),
            Op::Call { func, args } => {
                let args = args.iter().map(|a| self.get(*a)).collect();
                self.call(func, args)?
            }
        };
        if let Some(dest) = inst.result {
            self.values.insert(dest, value);
        }
        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> Result<i64, OutOfFuel> {
        Ok(match expr {
            Expr::Int(n) => *n,
            Expr::Var(v) => self.get(*v),
            Expr::Not(e) => i64::from(self.expr(e)? == 0),
            Expr::Binary { op, lhs, rhs } => {
                let l = self.expr(lhs)?;
                op.eval(l, self.expr(rhs)?)
            }
            Expr::Cmp { kind, lhs, rhs } => {
                let l = self.expr(lhs)?;
                i64::from(kind.holds(l, self.expr(rhs)?))
            }
            Expr::Call { func, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.expr(arg)?);
                }
                self.call(func, values)?
            }
            Expr::Assign { dest, value } => {
                let value = self.expr(value)?;
                self.values.insert(*dest, value);
                value
            }
        })
    }

    fn condition(&self, cond: &Condition) -> bool {
        match *cond {
            Condition::Truthy(v) => self.get(v) != 0,
            Condition::Falsy(v) => self.get(v) == 0,
            Condition::Compare { kind, lhs, rhs } => kind.holds(self.get(lhs), self.get(rhs)),
        }
    }

    fn finish(self, outcome: Outcome) -> Run {
        Run {
            calls: self.calls,
            outcome,
        }
    }
}

/// Execute `func` directly on its CFG.
pub fn run_cfg(func: &Function, script: &[i64], fuel: usize) -> Run {
    let mut m = Machine::new(script, fuel);
    let mut node = func.entry();
    // Bounds node visits too, for loops that make no calls.
    let mut steps = 0usize;
    loop {
        steps += 1;
        if steps > fuel * 16 {
            return m.finish(Outcome::OutOfFuel);
        }
        for inst in func.insts(node) {
            if m.inst(inst).is_err() {
                return m.finish(Outcome::OutOfFuel);
            }
        }
        node = match func.terminator(node) {
            Terminator::Jump(target) => *target,
            Terminator::Branch {
                cond,
                consequent,
                alternative,
            } => {
                if m.get(*cond) != 0 {
                    *consequent
                } else {
                    *alternative
                }
            }
            Terminator::BinaryBranch {
                cmp,
                lhs,
                rhs,
                consequent,
                alternative,
            } => {
                if cmp.holds(m.get(*lhs), m.get(*rhs)) {
                    *consequent
                } else {
                    *alternative
                }
            }
            Terminator::Switch {
                value,
                cases,
                default,
            } => {
                let v = m.get(*value);
                cases
                    .iter()
                    .find(|case| case.value == v)
                    .map_or(*default, |case| case.target)
            }
            Terminator::Return(value) => {
                let value = value.map(|v| m.get(v));
                return m.finish(Outcome::Returned(value));
            }
            Terminator::Throw(value) => {
                let value = m.get(*value);
                return m.finish(Outcome::Threw(value));
            }
        };
    }
}

enum Flow {
    Normal,
    Break(LabelId),
    Continue(LabelId),
    Returned(Option<i64>),
    Threw(i64),
    OutOfFuel,
}

struct TreeRunner<'a> {
    m: Machine<'a>,
    iterations: usize,
    max_iterations: usize,
}

impl TreeRunner<'_> {
    fn body(&mut self, body: &[Stmt<Expr>]) -> Flow {
        for stmt in body {
            match self.stmt(stmt) {
                Flow::Normal => {}
                other => return other,
            }
        }
        Flow::Normal
    }

    fn stmt(&mut self, stmt: &Stmt<Expr>) -> Flow {
        match stmt {
            Stmt::Expr(e) => match self.m.expr(e) {
                Ok(_) => Flow::Normal,
                Err(OutOfFuel) => Flow::OutOfFuel,
            },
            Stmt::Block { label, body } => match self.body(body) {
                Flow::Break(target) if target == *label => Flow::Normal,
                other => other,
            },
            Stmt::Loop { label, body } => loop {
                self.iterations += 1;
                if self.iterations > self.max_iterations {
                    return Flow::OutOfFuel;
                }
                match self.body(body) {
                    Flow::Continue(target) if target == *label => continue,
                    Flow::Break(target) if target == *label => return Flow::Normal,
                    other => return other,
                }
            },
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                if self.m.condition(cond) {
                    self.body(then_body)
                } else {
                    self.body(else_body)
                }
            }
            Stmt::Switch {
                value,
                arms,
                default,
            } => {
                let v = self.m.get(*value);
                match arms.iter().find(|arm| arm.values.contains(&v)) {
                    Some(arm) => self.body(&arm.body),
                    None => self.body(default),
                }
            }
            Stmt::Break(label) => Flow::Break(*label),
            Stmt::Continue(label) => Flow::Continue(*label),
            Stmt::Return(value) => Flow::Returned(value.map(|v| self.m.get(v))),
            Stmt::Throw(value) => Flow::Threw(self.m.get(*value)),
        }
    }
}

/// Execute a structured tree.
pub fn run_tree(body: &[Stmt<Expr>], script: &[i64], fuel: usize) -> Run {
    let mut runner = TreeRunner {
        m: Machine::new(script, fuel),
        iterations: 0,
        max_iterations: fuel * 16,
    };
    let outcome = match runner.body(body) {
        Flow::Returned(value) => Outcome::Returned(value),
        Flow::Threw(value) => Outcome::Threw(value),
        Flow::OutOfFuel => Outcome::OutOfFuel,
        Flow::Normal => panic!("structured body fell off its end"),
        Flow::Break(label) | Flow::Continue(label) => {
            panic!("{label} escaped the function body")
        }
    };
    runner.m.finish(outcome)
}

/// Nodes of `func` reachable from its entry.
pub fn reachable_nodes(func: &Function) -> usize {
    let mut seen = vec![false; func.node_count()];
    let mut stack = vec![func.entry()];
    let mut count = 0;
    while let Some(node) = stack.pop() {
        if std::mem::replace(&mut seen[node.index() as usize], true) {
            continue;
        }
        count += 1;
        stack.extend(func.successors(node));
    }
    count
}
