//! Input validation and output label checking.

use std::collections::HashSet;

use log::warn;

use crate::error::CoreError;

use super::ast::{LabelId, Stmt};
use super::cfg::ControlFlowGraph;
use super::dominance::DominatorTree;
use super::func::Function;

/// Check that `func` can be structured: it has nodes, every target exists,
/// and the reachable part is reducible. Unreachable nodes are allowed and
/// logged.
///
/// Returns the dominator tree computed along the way.
pub fn validate_function(func: &Function) -> Result<DominatorTree, CoreError> {
    if func.nodes.is_empty() {
        return Err(CoreError::EmptyFunction {
            func: func.name.clone(),
        });
    }

    for (node, data) in func.nodes.iter() {
        if let Some(&target) = data
            .terminator
            .targets()
            .iter()
            .find(|t| !func.nodes.is_valid(**t))
        {
            return Err(CoreError::InvalidTarget {
                func: func.name.clone(),
                node,
                target,
            });
        }
    }

    let dom = DominatorTree::compute(func);

    // A retreating edge (one that does not go forward in reverse
    // post-order) must be a back edge, i.e. its target dominates its source.
    for &node in dom.reverse_postorder() {
        for succ in func.successors(node) {
            if dom.rpo_index(succ) <= dom.rpo_index(node) && !dom.dominates(succ, node) {
                return Err(CoreError::Irreducible {
                    func: func.name.clone(),
                    from: node,
                    to: succ,
                });
            }
        }
    }

    let unreachable = func.nodes().filter(|&n| !dom.is_reachable(n)).count();
    if unreachable > 0 {
        warn!(
            "`{}`: skipping {unreachable} unreachable node(s)",
            func.name
        );
    }
    Ok(dom)
}

/// Check that every `break`/`continue` in `body` names an enclosing
/// construct (`continue` only a loop) and that no label is defined twice.
pub fn check_labels<E>(func: &str, body: &[Stmt<E>]) -> Result<(), CoreError> {
    let mut scope: Vec<(LabelId, bool)> = Vec::new();
    let mut defined: HashSet<LabelId> = HashSet::new();
    check_body(func, body, &mut scope, &mut defined)
}

fn check_body<E>(
    func: &str,
    body: &[Stmt<E>],
    scope: &mut Vec<(LabelId, bool)>,
    defined: &mut HashSet<LabelId>,
) -> Result<(), CoreError> {
    for stmt in body {
        match stmt {
            Stmt::Block { label, body } | Stmt::Loop { label, body } => {
                if !defined.insert(*label) {
                    return Err(CoreError::DuplicateLabel {
                        func: func.to_string(),
                        label: *label,
                    });
                }
                scope.push((*label, matches!(stmt, Stmt::Loop { .. })));
                let result = check_body(func, body, scope, defined);
                scope.pop();
                result?;
            }
            Stmt::Break(label) => {
                if !scope.iter().any(|(l, _)| l == label) {
                    return Err(CoreError::UnresolvedLabel {
                        func: func.to_string(),
                        label: *label,
                    });
                }
            }
            Stmt::Continue(label) => {
                if !scope.iter().any(|(l, is_loop)| l == label && *is_loop) {
                    return Err(CoreError::UnresolvedLabel {
                        func: func.to_string(),
                        label: *label,
                    });
                }
            }
            other => {
                for nested in other.bodies() {
                    check_body(func, nested, scope, defined)?;
                }
            }
        }
    }
    Ok(())
}

/// Number of reachable nodes, for summaries.
pub fn reachable_count(dom: &DominatorTree) -> usize {
    dom.reverse_postorder().len()
}
