//! Structured control flow reconstruction.
//!
//! Turns a reducible CFG into a tree of wrapper blocks, loops, `if`s and
//! `switch`es in a single pre-order walk over the dominator tree. The walk
//! is driven by an explicit stack of [`Step`]s rather than recursion, so
//! deeply nested input cannot exhaust the native stack.
//!
//! Jumps that do not fall into a node's own dominated code resolve through
//! a scoped [`LabelRegistry`]: merge points and loop exits are bound to the
//! wrapper whose end they follow, loop heads to their `continue` label.
//!
//! Malformed input (targets that disagree with the successor list, jumps
//! that no enclosing construct can express) is an upstream bug and panics.
//! Run [`crate::ir::verify::validate_function`] first to reject bad input
//! gracefully.

mod arena;
mod labels;
mod placement;

use log::{debug, trace};

use crate::entity::EntityRef;
use crate::ir::cfg::ControlFlowGraph;
use crate::ir::{
    Condition, DominatorTree, LabelId, Lower, LoopForest, NodeId, Stmt, SwitchCase, Terminator,
    ValueId,
};

use arena::{Arena, Item, ListId};
use placement::{Placement, Placements};

pub use labels::{Jump, LabelRegistry, Scope};

/// Deferred work, consumed in LIFO order.
#[derive(Debug)]
enum Step {
    /// Synthesize `node` and append its code to `list`.
    Enter { node: NodeId, list: ListId },
    /// Leave a wrapper or loop: its labels go out of scope.
    Close(Scope),
}

struct Synthesizer<'a, G: ?Sized, L: Lower> {
    graph: &'a G,
    lower: &'a mut L,
    dom: &'a DominatorTree,
    loops: &'a LoopForest,
    placements: Placements,
    labels: LabelRegistry,
    arena: Arena<L::Expr>,
    stack: Vec<Step>,
    entered: Vec<bool>,
    next_label: u32,
}

impl<'a, G: ControlFlowGraph + ?Sized, L: Lower> Synthesizer<'a, G, L> {
    fn fresh_label(&mut self) -> LabelId {
        let label = LabelId::new(self.next_label);
        self.next_label += 1;
        label
    }

    fn run(mut self) -> Vec<Stmt<L::Expr>> {
        let root = self.arena.new_list();
        self.stack.push(Step::Enter {
            node: self.graph.entry(),
            list: root,
        });

        let mut steps = 0usize;
        while let Some(step) = self.stack.pop() {
            steps += 1;
            match step {
                Step::Enter { node, list } => self.enter(node, list),
                Step::Close(scope) => self.labels.close(scope),
            }
        }

        for node in self.graph.nodes() {
            assert!(
                self.entered[node.index() as usize] || !self.dom.is_reachable(node),
                "reachable {node} was never placed"
            );
        }
        debug!(
            "structurized {} reachable nodes in {steps} steps, {} labels",
            self.dom.reverse_postorder().len(),
            self.next_label
        );
        self.labels.finish();
        self.arena.take(root)
    }

    fn enter(&mut self, node: NodeId, list: ListId) {
        let idx = node.index() as usize;
        assert!(!self.entered[idx], "{node} entered twice");
        self.entered[idx] = true;
        trace!("enter {node} ({:?}) into {list}", self.placements.kind(node));

        let body = if self.loops.is_head(node) {
            self.open_loop(node, list)
        } else {
            list
        };

        let graph = self.graph;
        for inst in graph.instructions(node) {
            let expr = self.lower.lower(inst);
            self.arena.push(body, Item::Expr(expr));
        }

        let merges = self.placements.merge_follows(node).to_vec();
        let inner = self.wrap_follows(&merges, body);
        self.terminate(node, inner);
    }

    /// Open the loop headed by `head` inside `list`, returning its body.
    ///
    /// The first loop follow is reached by breaking out of the loop itself;
    /// each later one gets a wrapper block around everything before it.
    fn open_loop(&mut self, head: NodeId, list: ListId) -> ListId {
        let follows = self.placements.loop_follows(head).to_vec();
        let (first, rest) = match follows.split_first() {
            Some((&first, rest)) => (Some(first), rest),
            None => (None, &[][..]),
        };
        let outer = self.wrap_follows(rest, list);

        let label = self.fresh_label();
        let body = self.arena.new_list();
        self.arena.push(outer, Item::Loop { label, body });

        let scope = self.labels.open();
        if let Some(first) = first {
            self.labels.bind(first, Jump::Break(label));
            self.stack.push(Step::Enter {
                node: first,
                list: outer,
            });
        }
        self.labels.bind(head, Jump::Continue(label));
        self.stack.push(Step::Close(scope));
        body
    }

    /// Nest one wrapper block per follow inside `list` and schedule each
    /// follow right after its wrapper. The earliest follow gets the
    /// innermost wrapper. Returns the innermost body.
    fn wrap_follows(&mut self, follows: &[NodeId], list: ListId) -> ListId {
        let mut outer = list;
        let mut wrappers = Vec::with_capacity(follows.len());
        for &follow in follows.iter().rev() {
            let label = self.fresh_label();
            let body = self.arena.new_list();
            self.arena.push(outer, Item::Block { label, body });
            wrappers.push((follow, outer, label));
            outer = body;
        }
        for (follow, after, label) in wrappers {
            let scope = self.labels.open();
            self.labels.bind(follow, Jump::Break(label));
            self.stack.push(Step::Enter {
                node: follow,
                list: after,
            });
            self.stack.push(Step::Close(scope));
        }
        outer
    }

    fn owns(&self, node: NodeId, target: NodeId) -> bool {
        self.placements.kind(target) == Placement::Owned && self.dom.idom(target) == Some(node)
    }

    fn jump(&self, from: NodeId, target: NodeId) -> Stmt<L::Expr> {
        match self.labels.resolve(target) {
            Some(jump) => jump.to_stmt(),
            None => panic!("no label in scope for {target} (jump from {from})"),
        }
    }

    fn check_targets(&self, node: NodeId, term: &Terminator) {
        let succs = self.graph.successors(node);
        let targets = term.successors();
        for target in &targets {
            assert!(
                (target.index() as usize) < self.graph.node_count(),
                "{node} targets {target}, outside the graph"
            );
            assert!(
                succs.contains(target),
                "{node} targets {target}, which is not among its successors {succs:?}"
            );
        }
        assert_eq!(
            targets.len(),
            succs.len(),
            "{node} lists successors {succs:?} its terminator does not name"
        );
    }

    fn terminate(&mut self, node: NodeId, list: ListId) {
        let graph = self.graph;
        let term = graph.terminator(node);
        self.check_targets(node, term);

        match term {
            Terminator::Jump(target) => self.transfer(node, *target, list),
            Terminator::Branch {
                cond,
                consequent,
                alternative,
            } => self.branch(node, Condition::Truthy(*cond), *consequent, *alternative, list),
            Terminator::BinaryBranch {
                cmp,
                lhs,
                rhs,
                consequent,
                alternative,
            } => {
                let cond = Condition::Compare {
                    kind: *cmp,
                    lhs: *lhs,
                    rhs: *rhs,
                };
                self.branch(node, cond, *consequent, *alternative, list)
            }
            Terminator::Switch {
                value,
                cases,
                default,
            } => self.switch(node, *value, cases, *default, list),
            Terminator::Return(value) => self.arena.push(list, Item::Stmt(Stmt::Return(*value))),
            Terminator::Throw(value) => self.arena.push(list, Item::Stmt(Stmt::Throw(*value))),
        }
    }

    /// Unconditional transfer: fall into owned code, otherwise jump.
    fn transfer(&mut self, from: NodeId, target: NodeId, list: ListId) {
        if self.owns(from, target) {
            self.stack.push(Step::Enter { node: target, list });
        } else {
            let jump = self.jump(from, target);
            self.arena.push(list, Item::Stmt(jump));
        }
    }

    fn branch(
        &mut self,
        from: NodeId,
        cond: Condition,
        consequent: NodeId,
        alternative: NodeId,
        list: ListId,
    ) {
        if consequent == alternative {
            self.transfer(from, consequent, list);
            return;
        }

        match (self.owns(from, consequent), self.owns(from, alternative)) {
            (true, true) => {
                let then_body = self.arena.new_list();
                let else_body = self.arena.new_list();
                self.arena.push(
                    list,
                    Item::If {
                        cond,
                        then_body,
                        else_body,
                    },
                );
                // Else first so the then arm is synthesized first.
                self.stack.push(Step::Enter {
                    node: alternative,
                    list: else_body,
                });
                self.stack.push(Step::Enter {
                    node: consequent,
                    list: then_body,
                });
            }
            (true, false) => {
                self.guarded_jump(from, cond.negate(), alternative, list);
                self.stack.push(Step::Enter {
                    node: consequent,
                    list,
                });
            }
            (false, true) => {
                self.guarded_jump(from, cond, consequent, list);
                self.stack.push(Step::Enter {
                    node: alternative,
                    list,
                });
            }
            (false, false) => {
                let then_body = self.arena.new_list();
                let else_body = self.arena.new_list();
                let then_jump = self.jump(from, consequent);
                let else_jump = self.jump(from, alternative);
                self.arena.push(then_body, Item::Stmt(then_jump));
                self.arena.push(else_body, Item::Stmt(else_jump));
                self.arena.push(
                    list,
                    Item::If {
                        cond,
                        then_body,
                        else_body,
                    },
                );
            }
        }
    }

    /// `if cond { <jump to target> }`
    fn guarded_jump(&mut self, from: NodeId, cond: Condition, target: NodeId, list: ListId) {
        let then_body = self.arena.new_list();
        let else_body = self.arena.new_list();
        let jump = self.jump(from, target);
        self.arena.push(then_body, Item::Stmt(jump));
        self.arena.push(
            list,
            Item::If {
                cond,
                then_body,
                else_body,
            },
        );
    }

    fn switch(
        &mut self,
        from: NodeId,
        value: ValueId,
        cases: &[SwitchCase],
        default: NodeId,
        list: ListId,
    ) {
        // One arm per distinct target, in table order. Cases that go to the
        // default target are covered by the default arm. A repeated value
        // is shadowed by its first case.
        let mut groups: Vec<(NodeId, Vec<i64>)> = Vec::new();
        let mut seen = Vec::with_capacity(cases.len());
        for case in cases {
            if seen.contains(&case.value) {
                continue;
            }
            seen.push(case.value);
            if case.target == default {
                continue;
            }
            match groups.iter_mut().find(|(target, _)| *target == case.target) {
                Some((_, values)) => values.push(case.value),
                None => groups.push((case.target, vec![case.value])),
            }
        }
        if groups.is_empty() {
            self.transfer(from, default, list);
            return;
        }

        let default_body = self.arena.new_list();
        let mut arms = Vec::with_capacity(groups.len());
        let mut targets = Vec::with_capacity(groups.len());
        for (target, values) in groups {
            let body = self.arena.new_list();
            arms.push((values, body));
            targets.push((target, body));
        }
        self.arena.push(
            list,
            Item::Switch {
                value,
                arms,
                default: default_body,
            },
        );

        // Default pushed first and arms in reverse, so arms are synthesized
        // in table order and the default last.
        self.arm(from, default, default_body);
        for &(target, body) in targets.iter().rev() {
            self.arm(from, target, body);
        }
    }

    fn arm(&mut self, from: NodeId, target: NodeId, body: ListId) {
        if self.owns(from, target) {
            self.stack.push(Step::Enter { node: target, list: body });
        } else {
            let jump = self.jump(from, target);
            self.arena.push(body, Item::Stmt(jump));
        }
    }
}

/// Structure `graph` using precomputed dominance and loop information.
///
/// The result nests as deeply as the graph's dominator tree; a chain of n
/// conditionals yields n nested `if`s. Recursive consumers should bound
/// the depth with [`crate::ir::ast::nesting_depth`] first.
///
/// # Panics
/// Panics when the graph is irreducible or its terminators disagree with
/// its successor lists, or when `dom`/`loops` were computed for a
/// different graph.
pub fn structurize_with<G, L>(
    graph: &G,
    dom: &DominatorTree,
    loops: &LoopForest,
    lower: &mut L,
) -> Vec<Stmt<L::Expr>>
where
    G: ControlFlowGraph + ?Sized,
    L: Lower,
{
    let count = graph.node_count();
    assert!(count > 0, "cannot structure an empty graph");
    assert_eq!(
        dom.node_count(),
        count,
        "dominator tree was computed for a different graph"
    );

    let synth = Synthesizer {
        graph,
        lower,
        dom,
        loops,
        placements: Placements::compute(graph, dom, loops),
        labels: LabelRegistry::new(),
        arena: Arena::new(),
        stack: Vec::new(),
        entered: vec![false; count],
        next_label: 0,
    };
    synth.run()
}

/// Structure `graph`, computing dominance and loops first.
pub fn structurize<G, L>(graph: &G, lower: &mut L) -> Vec<Stmt<L::Expr>>
where
    G: ControlFlowGraph + ?Sized,
    L: Lower,
{
    let dom = DominatorTree::compute(graph);
    let loops = LoopForest::compute(graph, &dom);
    structurize_with(graph, &dom, &loops, lower)
}
