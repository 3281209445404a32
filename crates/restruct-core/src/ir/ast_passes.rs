//! Tree-to-tree cleanup passes.
//!
//! The synthesizer always spells out every jump and every wrapper block.
//! These passes remove the ones that are implied by fall-through. Each
//! returns `true` when it changed something.

use std::collections::HashSet;

use super::ast::{walk, LabelId, Stmt};

// ---------------------------------------------------------------------------
// Early exits
// ---------------------------------------------------------------------------

/// Move the code after `if c { T; break L } else { E }` inside block `L`
/// into the other arm, giving `if c { T } else { E; rest }`.
///
/// Falling off the end of the block and `break L` reach the same place, so
/// the rest of the block only runs on the arm that did not break. The
/// mirrored form with the break in the else arm is folded too. Arms ending
/// in another jump are left alone. Lists in tail position of the block are
/// folded as well, so a chain of early exits becomes nested `if`s.
pub fn fold_if_breaks<E>(body: &mut Vec<Stmt<E>>) -> bool {
    let mut changed = false;
    for stmt in body.iter_mut() {
        if let Stmt::Block { label, body } = stmt {
            changed |= fold_into_arm(body, *label);
        }
        for nested in stmt.bodies_mut() {
            changed |= fold_if_breaks(nested);
        }
    }
    changed
}

fn breaks_to<E>(list: &[Stmt<E>], label: LabelId) -> bool {
    matches!(list.last(), Some(Stmt::Break(target)) if *target == label)
}

fn falls_through<E>(list: &[Stmt<E>]) -> bool {
    !list.last().is_some_and(Stmt::is_jump)
}

fn foldable<E>(stmt: &Stmt<E>, label: LabelId) -> bool {
    match stmt {
        Stmt::If {
            then_body,
            else_body,
            ..
        } => {
            (breaks_to(then_body, label) && falls_through(else_body))
                || (breaks_to(else_body, label) && falls_through(then_body))
        }
        _ => false,
    }
}

fn fold_into_arm<E>(list: &mut Vec<Stmt<E>>, label: LabelId) -> bool {
    let last = list.len().saturating_sub(1);
    let found = list[..last].iter().position(|stmt| foldable(stmt, label));
    if let Some(at) = found {
        let rest: Vec<_> = list.drain(at + 1..).collect();
        fold_at(&mut list[at], label, rest);
    }
    let mut changed = found.is_some();
    if let Some(tail) = list.last_mut() {
        if !matches!(tail, Stmt::Loop { .. }) {
            for nested in tail.bodies_mut() {
                changed |= fold_into_arm(nested, label);
            }
        }
    }
    changed
}

fn fold_at<E>(stmt: &mut Stmt<E>, label: LabelId, rest: Vec<Stmt<E>>) {
    if let Stmt::If {
        then_body,
        else_body,
        ..
    } = stmt
    {
        let (exit, other) = if breaks_to(then_body, label) && falls_through(else_body) {
            (then_body, else_body)
        } else {
            (else_body, then_body)
        };
        exit.pop();
        other.extend(rest);
    }
}

// ---------------------------------------------------------------------------
// Trailing breaks
// ---------------------------------------------------------------------------

/// Remove `break L` in tail position of block `L`.
///
/// Tail position reaches through the last statement of the block into `if`
/// arms, `switch` arms and nested blocks, since falling off any of those
/// also ends the enclosing block. Loops are left alone: falling off a loop
/// body would leave the loop, but an explicit jump there reads better.
pub fn elide_trailing_breaks<E>(body: &mut Vec<Stmt<E>>) -> bool {
    let mut changed = false;
    for stmt in body.iter_mut() {
        for nested in stmt.bodies_mut() {
            changed |= elide_trailing_breaks(nested);
        }
        if let Stmt::Block { label, body } = stmt {
            changed |= strip_tail_break(body, *label);
        }
    }
    changed
}

fn strip_tail_break<E>(list: &mut Vec<Stmt<E>>, label: LabelId) -> bool {
    match list.last_mut() {
        Some(Stmt::Break(target)) if *target == label => {
            list.pop();
            true
        }
        Some(Stmt::If {
            then_body,
            else_body,
            ..
        }) => strip_tail_break(then_body, label) | strip_tail_break(else_body, label),
        Some(Stmt::Switch { arms, default, .. }) => {
            let mut changed = strip_tail_break(default, label);
            for arm in arms {
                changed |= strip_tail_break(&mut arm.body, label);
            }
            changed
        }
        Some(Stmt::Block { body, .. }) => strip_tail_break(body, label),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Unused wrapper blocks
// ---------------------------------------------------------------------------

/// Labels referenced by any `break` or `continue` in `body`.
pub fn used_labels<E>(body: &[Stmt<E>]) -> HashSet<LabelId> {
    let mut used = HashSet::new();
    walk(body, &mut |stmt| match stmt {
        Stmt::Break(label) | Stmt::Continue(label) => {
            used.insert(*label);
        }
        _ => {}
    });
    used
}

/// Splice blocks whose label is never targeted into their parent list.
pub fn flatten_unused_blocks<E>(body: &mut Vec<Stmt<E>>) -> bool {
    let used = used_labels(body);
    flatten_with(body, &used)
}

fn flatten_with<E>(body: &mut Vec<Stmt<E>>, used: &HashSet<LabelId>) -> bool {
    let mut changed = false;
    let mut out = Vec::with_capacity(body.len());
    for mut stmt in std::mem::take(body) {
        for nested in stmt.bodies_mut() {
            changed |= flatten_with(nested, used);
        }
        match stmt {
            Stmt::Block { label, body: inner } if !used.contains(&label) => {
                out.extend(inner);
                changed = true;
            }
            other => out.push(other),
        }
    }
    *body = out;
    changed
}

// ---------------------------------------------------------------------------
// Conditionals
// ---------------------------------------------------------------------------

/// Rewrite `if c {} else { S }` to `if !c { S }` and drop `if`s with two
/// empty arms. Conditions are plain value reads, so dropping one is safe.
pub fn simplify_ifs<E>(body: &mut Vec<Stmt<E>>) -> bool {
    let mut changed = false;
    for stmt in body.iter_mut() {
        for nested in stmt.bodies_mut() {
            changed |= simplify_ifs(nested);
        }
        if let Stmt::If {
            cond,
            then_body,
            else_body,
        } = stmt
        {
            if then_body.is_empty() && !else_body.is_empty() {
                *cond = cond.negate();
                std::mem::swap(then_body, else_body);
                changed = true;
            }
        }
    }
    let before = body.len();
    body.retain(|stmt| {
        !matches!(
            stmt,
            Stmt::If { then_body, else_body, .. } if then_body.is_empty() && else_body.is_empty()
        )
    });
    changed || body.len() != before
}
