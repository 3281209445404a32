//! Scoped mapping from CFG nodes to the jump that reaches them.

use crate::entity::SecondaryMap;
use crate::ir::{LabelId, NodeId, Stmt};

/// How a node is reached from code nested inside the construct that
/// registered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    /// Leave the labelled block or loop; the node's code follows it.
    Break(LabelId),
    /// Restart the labelled loop; the node is its head.
    Continue(LabelId),
}

impl Jump {
    pub fn to_stmt<E>(self) -> Stmt<E> {
        match self {
            Jump::Break(label) => Stmt::Break(label),
            Jump::Continue(label) => Stmt::Continue(label),
        }
    }
}

/// Token for an open scope. Must be handed back to
/// [`LabelRegistry::close`]; scopes close in reverse opening order.
#[must_use = "an open scope must be closed"]
#[derive(Debug)]
pub struct Scope {
    depth: usize,
    mark: usize,
}

/// Node-keyed label bindings with an undo log.
///
/// Every binding made inside a scope is reverted when that scope closes,
/// so sibling constructs never see each other's labels and an outer
/// binding for the same node reappears afterwards.
#[derive(Debug, Default)]
pub struct LabelRegistry {
    bindings: SecondaryMap<NodeId, Jump>,
    undo: Vec<(NodeId, Option<Jump>)>,
    marks: Vec<usize>,
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) -> Scope {
        let mark = self.undo.len();
        self.marks.push(mark);
        Scope {
            depth: self.marks.len(),
            mark,
        }
    }

    /// Bind `node` to `jump` for the rest of the innermost open scope.
    ///
    /// # Panics
    /// Panics when no scope is open.
    pub fn bind(&mut self, node: NodeId, jump: Jump) {
        assert!(!self.marks.is_empty(), "binding {node} outside of any scope");
        let previous = self.bindings.insert(node, jump);
        self.undo.push((node, previous));
    }

    /// Innermost binding for `node`.
    pub fn resolve(&self, node: NodeId) -> Option<Jump> {
        self.bindings.get(node).copied()
    }

    /// Revert every binding made since `scope` was opened.
    ///
    /// # Panics
    /// Panics if a scope opened after `scope` is still open.
    pub fn close(&mut self, scope: Scope) {
        assert_eq!(
            scope.depth,
            self.marks.len(),
            "label scopes closed out of order"
        );
        self.marks.pop();
        while self.undo.len() > scope.mark {
            if let Some((node, previous)) = self.undo.pop() {
                self.bindings.set(node, previous);
            }
        }
    }

    /// Consume the registry, checking that every scope was closed.
    ///
    /// # Panics
    /// Panics on a leaked scope.
    pub fn finish(self) {
        assert!(
            self.marks.is_empty() && self.undo.is_empty(),
            "{} label scope(s) left open",
            self.marks.len()
        );
    }
}
