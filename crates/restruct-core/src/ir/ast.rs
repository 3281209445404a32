//! Structured output tree.
//!
//! `Stmt` is generic over the leaf expression type produced by a
//! [`Lower`](super::lower::Lower) implementation.

use serde::{Deserialize, Serialize};

use crate::define_entity;

use super::inst::{CmpKind, ValueId};
use super::lower::Expr;

define_entity!(LabelId, "L");

/// Branch condition of an `if`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// `value != 0`
    Truthy(ValueId),
    /// `value == 0`
    Falsy(ValueId),
    Compare {
        kind: CmpKind,
        lhs: ValueId,
        rhs: ValueId,
    },
}

impl Condition {
    pub fn negate(self) -> Self {
        match self {
            Condition::Truthy(v) => Condition::Falsy(v),
            Condition::Falsy(v) => Condition::Truthy(v),
            Condition::Compare { kind, lhs, rhs } => Condition::Compare {
                kind: kind.inverse(),
                lhs,
                rhs,
            },
        }
    }
}

/// One arm of a `switch`: the case values that select it and its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchArm<E> {
    pub values: Vec<i64>,
    pub body: Vec<Stmt<E>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt<E> {
    Expr(E),
    /// Wrapper block. `break label` continues after it.
    Block { label: LabelId, body: Vec<Stmt<E>> },
    /// `continue label` restarts the body, `break label` leaves the loop.
    /// Running off the end of the body also leaves it.
    Loop { label: LabelId, body: Vec<Stmt<E>> },
    If {
        cond: Condition,
        then_body: Vec<Stmt<E>>,
        else_body: Vec<Stmt<E>>,
    },
    /// Arms do not fall through into each other.
    Switch {
        value: ValueId,
        arms: Vec<SwitchArm<E>>,
        default: Vec<Stmt<E>>,
    },
    Break(LabelId),
    Continue(LabelId),
    Return(Option<ValueId>),
    Throw(ValueId),
}

impl<E> Stmt<E> {
    /// Nested statement lists, in source order.
    pub fn bodies(&self) -> Vec<&Vec<Stmt<E>>> {
        match self {
            Stmt::Block { body, .. } | Stmt::Loop { body, .. } => vec![body],
            Stmt::If {
                then_body,
                else_body,
                ..
            } => vec![then_body, else_body],
            Stmt::Switch { arms, default, .. } => arms
                .iter()
                .map(|arm| &arm.body)
                .chain(std::iter::once(default))
                .collect(),
            _ => vec![],
        }
    }

    pub fn bodies_mut(&mut self) -> Vec<&mut Vec<Stmt<E>>> {
        match self {
            Stmt::Block { body, .. } | Stmt::Loop { body, .. } => vec![body],
            Stmt::If {
                then_body,
                else_body,
                ..
            } => vec![then_body, else_body],
            Stmt::Switch { arms, default, .. } => arms
                .iter_mut()
                .map(|arm| &mut arm.body)
                .chain(std::iter::once(default))
                .collect(),
            _ => vec![],
        }
    }

    /// Whether control never reaches the statement that follows this one.
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Return(_) | Stmt::Throw(_)
        )
    }
}

/// Visit every statement in `body` in pre-order.
pub fn walk<E>(body: &[Stmt<E>], f: &mut impl FnMut(&Stmt<E>)) {
    let mut stack = vec![body.iter()];
    while let Some(iter) = stack.last_mut() {
        match iter.next() {
            Some(stmt) => {
                f(stmt);
                for nested in stmt.bodies().into_iter().rev() {
                    stack.push(nested.iter());
                }
            }
            None => {
                stack.pop();
            }
        }
    }
}

/// Number of statement lists on the longest nesting path; `body` itself
/// counts as one.
pub fn nesting_depth<E>(body: &[Stmt<E>]) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(body, 1)];
    while let Some((list, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        for stmt in list {
            for nested in stmt.bodies() {
                stack.push((nested.as_slice(), depth + 1));
            }
        }
    }
    deepest
}

/// Drop `body` without recursing, for trees too deep for the derived
/// destructor.
pub fn dismantle<E>(body: Vec<Stmt<E>>) {
    let mut pending = vec![body];
    while let Some(mut list) = pending.pop() {
        for stmt in &mut list {
            for nested in stmt.bodies_mut() {
                pending.push(std::mem::take(nested));
            }
        }
    }
}

/// A function after control flow reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredFunction<E = Expr> {
    pub name: String,
    pub body: Vec<Stmt<E>>,
}
