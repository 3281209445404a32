//! Per-instruction lowering.
//!
//! The structurizer calls [`Lower::lower`] exactly once for every
//! non-terminator instruction it places, in placement order.

use serde::{Deserialize, Serialize};

use super::inst::{BinOp, CmpKind, Inst, Op, ValueId};

pub trait Lower {
    type Expr;

    fn lower(&mut self, inst: &Inst) -> Self::Expr;
}

/// Target expression tree produced by [`ExprLowering`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Int(i64),
    Var(ValueId),
    Not(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Cmp {
        kind: CmpKind,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: String,
        args: Vec<Expr>,
    },
    Assign {
        dest: ValueId,
        value: Box<Expr>,
    },
}

/// Default lowering: one assignment per instruction with a result, a bare
/// expression statement otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExprLowering;

impl Lower for ExprLowering {
    type Expr = Expr;

    fn lower(&mut self, inst: &Inst) -> Expr {
        let var = |v: &ValueId| Box::new(Expr::Var(*v));
        let value = match &inst.op {
            Op::Const(n) => Expr::Int(*n),
            Op::Copy(v) => Expr::Var(*v),
            Op::Not(v) => Expr::Not(var(v)),
            Op::Binary { op, lhs, rhs } => Expr::Binary {
                op: *op,
                lhs: var(lhs),
                rhs: var(rhs),
            },
            Op::Cmp { kind, lhs, rhs } => Expr::Cmp {
                kind: *kind,
                lhs: var(lhs),
                rhs: var(rhs),
            },
            Op::Call { func, args } => Expr::Call {
                func: func.clone(),
                args: args.iter().map(|a| Expr::Var(*a)).collect(),
            },
        };
        match inst.result {
            Some(dest) => Expr::Assign {
                dest,
                value: Box::new(value),
            },
            None => value,
        }
    }
}
