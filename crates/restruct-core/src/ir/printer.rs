//! Human-readable text for functions and structured trees.

use std::fmt::{self, Display, Formatter, Write};

use super::ast::{Condition, Stmt, StructuredFunction};
use super::func::Function;
use super::inst::{Inst, Op};
use super::lower::Expr;
use super::node::Terminator;

const INDENT: &str = "    ";

fn join<T: Display>(items: &[T]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{item}");
    }
    out
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Var(v) => write!(f, "{v}"),
            Expr::Not(e) => write!(f, "!{e}"),
            Expr::Binary { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Expr::Cmp { kind, lhs, rhs } => write!(f, "{lhs} {} {rhs}", kind.symbol()),
            Expr::Call { func, args } => write!(f, "{func}({})", join(args)),
            Expr::Assign { dest, value } => write!(f, "{dest} = {value}"),
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Truthy(v) => write!(f, "{v}"),
            Condition::Falsy(v) => write!(f, "!{v}"),
            Condition::Compare { kind, lhs, rhs } => write!(f, "{lhs} {} {rhs}", kind.symbol()),
        }
    }
}

impl Display for Inst {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(result) = self.result {
            write!(f, "{result} = ")?;
        }
        match &self.op {
            Op::Const(n) => write!(f, "const {n}"),
            Op::Copy(v) => write!(f, "copy {v}"),
            Op::Not(v) => write!(f, "not {v}"),
            Op::Binary { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Op::Cmp { kind, lhs, rhs } => write!(f, "cmp {lhs} {} {rhs}", kind.symbol()),
            Op::Call { func, args } => write!(f, "call {func}({})", join(args)),
        }
    }
}

impl Display for Terminator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Jump(t) => write!(f, "jump {t}"),
            Terminator::Branch {
                cond,
                consequent,
                alternative,
            } => write!(f, "branch {cond}, {consequent}, {alternative}"),
            Terminator::BinaryBranch {
                cmp,
                lhs,
                rhs,
                consequent,
                alternative,
            } => write!(
                f,
                "branch {lhs} {} {rhs}, {consequent}, {alternative}",
                cmp.symbol()
            ),
            Terminator::Switch {
                value,
                cases,
                default,
            } => {
                write!(f, "switch {value} [")?;
                for case in cases {
                    write!(f, "{} => {}, ", case.value, case.target)?;
                }
                write!(f, "_ => {default}]")
            }
            Terminator::Return(Some(v)) => write!(f, "return {v}"),
            Terminator::Return(None) => write!(f, "return"),
            Terminator::Throw(v) => write!(f, "throw {v}"),
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "cfg {} {{", self.name)?;
        for (id, node) in self.nodes.iter() {
            writeln!(f, "{id}:")?;
            for inst in &node.insts {
                writeln!(f, "{INDENT}{inst}")?;
            }
            writeln!(f, "{INDENT}{}", node.terminator)?;
        }
        writeln!(f, "}}")
    }
}

fn write_body<E: Display>(f: &mut Formatter<'_>, body: &[Stmt<E>], depth: usize) -> fmt::Result {
    for stmt in body {
        write_stmt(f, stmt, depth)?;
    }
    Ok(())
}

fn write_stmt<E: Display>(f: &mut Formatter<'_>, stmt: &Stmt<E>, depth: usize) -> fmt::Result {
    let pad = INDENT.repeat(depth);
    match stmt {
        Stmt::Expr(e) => writeln!(f, "{pad}{e}"),
        Stmt::Block { label, body } => {
            writeln!(f, "{pad}block {label} {{")?;
            write_body(f, body, depth + 1)?;
            writeln!(f, "{pad}}}")
        }
        Stmt::Loop { label, body } => {
            writeln!(f, "{pad}loop {label} {{")?;
            write_body(f, body, depth + 1)?;
            writeln!(f, "{pad}}}")
        }
        Stmt::If {
            cond,
            then_body,
            else_body,
        } => {
            writeln!(f, "{pad}if {cond} {{")?;
            write_body(f, then_body, depth + 1)?;
            if !else_body.is_empty() {
                writeln!(f, "{pad}}} else {{")?;
                write_body(f, else_body, depth + 1)?;
            }
            writeln!(f, "{pad}}}")
        }
        Stmt::Switch {
            value,
            arms,
            default,
        } => {
            writeln!(f, "{pad}switch {value} {{")?;
            for arm in arms {
                writeln!(f, "{pad}{INDENT}case {} {{", join(&arm.values))?;
                write_body(f, &arm.body, depth + 2)?;
                writeln!(f, "{pad}{INDENT}}}")?;
            }
            writeln!(f, "{pad}{INDENT}default {{")?;
            write_body(f, default, depth + 2)?;
            writeln!(f, "{pad}{INDENT}}}")?;
            writeln!(f, "{pad}}}")
        }
        Stmt::Break(label) => writeln!(f, "{pad}break {label}"),
        Stmt::Continue(label) => writeln!(f, "{pad}continue {label}"),
        Stmt::Return(Some(v)) => writeln!(f, "{pad}return {v}"),
        Stmt::Return(None) => writeln!(f, "{pad}return"),
        Stmt::Throw(v) => writeln!(f, "{pad}throw {v}"),
    }
}

impl<E: Display> Display for StructuredFunction<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "fn {} {{", self.name)?;
        write_body(f, &self.body, 1)?;
        writeln!(f, "}}")
    }
}
