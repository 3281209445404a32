use serde::{Deserialize, Serialize};

use crate::define_entity;

define_entity!(ValueId, "v");

/// Arithmetic and bitwise binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Xor => "^",
        }
    }

    /// Evaluate on 64-bit integers with wrapping semantics.
    ///
    /// Division and remainder by zero yield zero.
    pub fn eval(self, lhs: i64, rhs: i64) -> i64 {
        match self {
            BinOp::Add => lhs.wrapping_add(rhs),
            BinOp::Sub => lhs.wrapping_sub(rhs),
            BinOp::Mul => lhs.wrapping_mul(rhs),
            BinOp::Div => lhs.checked_div(rhs).unwrap_or(0),
            BinOp::Rem => lhs.checked_rem(rhs).unwrap_or(0),
            BinOp::And => lhs & rhs,
            BinOp::Or => lhs | rhs,
            BinOp::Xor => lhs ^ rhs,
        }
    }
}

/// Comparison kind for relational operations and binary branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpKind {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpKind {
    /// Return the inverse comparison (e.g. Lt <-> Ge, Eq <-> Ne).
    pub fn inverse(self) -> Self {
        match self {
            CmpKind::Eq => CmpKind::Ne,
            CmpKind::Ne => CmpKind::Eq,
            CmpKind::Lt => CmpKind::Ge,
            CmpKind::Ge => CmpKind::Lt,
            CmpKind::Gt => CmpKind::Le,
            CmpKind::Le => CmpKind::Gt,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpKind::Eq => "==",
            CmpKind::Ne => "!=",
            CmpKind::Lt => "<",
            CmpKind::Le => "<=",
            CmpKind::Gt => ">",
            CmpKind::Ge => ">=",
        }
    }

    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            CmpKind::Eq => lhs == rhs,
            CmpKind::Ne => lhs != rhs,
            CmpKind::Lt => lhs < rhs,
            CmpKind::Le => lhs <= rhs,
            CmpKind::Gt => lhs > rhs,
            CmpKind::Ge => lhs >= rhs,
        }
    }
}

/// A non-terminator operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Const(i64),
    Copy(ValueId),
    Not(ValueId),
    Binary {
        op: BinOp,
        lhs: ValueId,
        rhs: ValueId,
    },
    Cmp {
        kind: CmpKind,
        lhs: ValueId,
        rhs: ValueId,
    },
    /// Call an opaque external function by name.
    Call {
        func: String,
        #[serde(default)]
        args: Vec<ValueId>,
    },
}

/// An instruction: an operation with an optional result value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inst {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ValueId>,
    pub op: Op,
}
