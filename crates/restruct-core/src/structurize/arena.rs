//! Output lists under construction.
//!
//! While the work stack is draining, constructs refer to their child lists
//! by [`ListId`] so that pending steps can append to any list. Once the
//! traversal is complete the arena is folded into an owned [`Stmt`] tree.

use crate::define_entity;
use crate::entity::PrimaryMap;
use crate::ir::{Condition, LabelId, Stmt, SwitchArm, ValueId};

define_entity!(ListId, "list");

#[derive(Debug)]
pub(crate) enum Item<E> {
    Expr(E),
    Block {
        label: LabelId,
        body: ListId,
    },
    Loop {
        label: LabelId,
        body: ListId,
    },
    If {
        cond: Condition,
        then_body: ListId,
        else_body: ListId,
    },
    Switch {
        value: ValueId,
        arms: Vec<(Vec<i64>, ListId)>,
        default: ListId,
    },
    Stmt(Stmt<E>),
}

#[derive(Debug)]
pub(crate) struct Arena<E> {
    lists: PrimaryMap<ListId, Vec<Item<E>>>,
}

impl<E> Arena<E> {
    pub fn new() -> Self {
        Self {
            lists: PrimaryMap::new(),
        }
    }

    pub fn new_list(&mut self) -> ListId {
        self.lists.push(Vec::new())
    }

    pub fn push(&mut self, list: ListId, item: Item<E>) {
        self.lists[list].push(item);
    }

    fn frame(&mut self, list: ListId) -> Frame<E> {
        Frame {
            items: std::mem::take(&mut self.lists[list]).into_iter(),
            out: Vec::new(),
            pending: None,
        }
    }

    /// Move `list` and everything it references out of the arena.
    ///
    /// Every list has exactly one parent, so each is taken once. Assembly
    /// keeps its own stack of open lists; the depth of the tree is bounded
    /// only by memory.
    pub fn take(&mut self, list: ListId) -> Vec<Stmt<E>> {
        let mut stack = vec![self.frame(list)];
        while let Some(frame) = stack.last_mut() {
            if let Some(pending) = frame.pending.as_mut() {
                match pending.waiting.pop() {
                    Some(child) => {
                        let child = self.frame(child);
                        stack.push(child);
                    }
                    None => {
                        if let Some(pending) = frame.pending.take() {
                            frame.out.push(pending.finish());
                        }
                    }
                }
                continue;
            }
            match frame.items.next() {
                Some(item) => match Pending::open(item) {
                    Opened::Leaf(stmt) => frame.out.push(stmt),
                    Opened::Nested(pending) => frame.pending = Some(pending),
                },
                None => {
                    let out = std::mem::take(&mut frame.out);
                    stack.pop();
                    match stack.last_mut().and_then(|parent| parent.pending.as_mut()) {
                        Some(parent) => parent.done.push(out),
                        None => return out,
                    }
                }
            }
        }
        Vec::new()
    }
}

/// A list being assembled by [`Arena::take`].
struct Frame<E> {
    items: std::vec::IntoIter<Item<E>>,
    out: Vec<Stmt<E>>,
    /// Construct whose child lists are being assembled above this frame.
    pending: Option<Pending<E>>,
}

enum Shell {
    Block(LabelId),
    Loop(LabelId),
    If(Condition),
    Switch { value: ValueId, values: Vec<Vec<i64>> },
}

struct Pending<E> {
    shell: Shell,
    /// Child lists not yet assembled, last one on top.
    waiting: Vec<ListId>,
    done: Vec<Vec<Stmt<E>>>,
}

enum Opened<E> {
    Leaf(Stmt<E>),
    Nested(Pending<E>),
}

impl<E> Pending<E> {
    fn open(item: Item<E>) -> Opened<E> {
        let (shell, mut waiting) = match item {
            Item::Expr(e) => return Opened::Leaf(Stmt::Expr(e)),
            Item::Stmt(stmt) => return Opened::Leaf(stmt),
            Item::Block { label, body } => (Shell::Block(label), vec![body]),
            Item::Loop { label, body } => (Shell::Loop(label), vec![body]),
            Item::If {
                cond,
                then_body,
                else_body,
            } => (Shell::If(cond), vec![then_body, else_body]),
            Item::Switch {
                value,
                arms,
                default,
            } => {
                let (values, mut lists): (Vec<_>, Vec<_>) = arms.into_iter().unzip();
                lists.push(default);
                (Shell::Switch { value, values }, lists)
            }
        };
        waiting.reverse();
        let done = Vec::with_capacity(waiting.len());
        Opened::Nested(Pending {
            shell,
            waiting,
            done,
        })
    }

    fn finish(self) -> Stmt<E> {
        let mut bodies = self.done.into_iter();
        let mut next = || bodies.next().unwrap_or_default();
        match self.shell {
            Shell::Block(label) => Stmt::Block { label, body: next() },
            Shell::Loop(label) => Stmt::Loop { label, body: next() },
            Shell::If(cond) => {
                let then_body = next();
                let else_body = next();
                Stmt::If {
                    cond,
                    then_body,
                    else_body,
                }
            }
            Shell::Switch { value, values } => {
                let arms = values
                    .into_iter()
                    .map(|values| SwitchArm {
                        values,
                        body: next(),
                    })
                    .collect();
                Stmt::Switch {
                    value,
                    arms,
                    default: next(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;

    fn l(n: u32) -> LabelId {
        LabelId::new(n)
    }

    #[test]
    fn children_keep_their_slots() {
        let mut arena: Arena<&str> = Arena::new();
        let root = arena.new_list();
        let (one, two, default) = (arena.new_list(), arena.new_list(), arena.new_list());
        arena.push(one, Item::Expr("one"));
        arena.push(two, Item::Expr("two"));
        arena.push(default, Item::Stmt(Stmt::Break(l(0))));
        arena.push(
            root,
            Item::Switch {
                value: ValueId::new(0),
                arms: vec![(vec![1], one), (vec![2, 3], two)],
                default,
            },
        );
        arena.push(root, Item::Expr("after"));

        assert_eq!(
            arena.take(root),
            vec![
                Stmt::Switch {
                    value: ValueId::new(0),
                    arms: vec![
                        SwitchArm {
                            values: vec![1],
                            body: vec![Stmt::Expr("one")],
                        },
                        SwitchArm {
                            values: vec![2, 3],
                            body: vec![Stmt::Expr("two")],
                        },
                    ],
                    default: vec![Stmt::Break(l(0))],
                },
                Stmt::Expr("after"),
            ]
        );
    }

    #[test]
    fn deep_chains_assemble() {
        let mut arena: Arena<&str> = Arena::new();
        let root = arena.new_list();
        let mut list = root;
        for i in 0..50_000 {
            let body = arena.new_list();
            arena.push(list, Item::Loop { label: l(i), body });
            list = body;
        }
        arena.push(list, Item::Expr("leaf"));

        let tree = arena.take(root);
        assert_eq!(crate::ir::ast::nesting_depth(&tree), 50_001);
        crate::ir::ast::dismantle(tree);
    }
}
