pub mod ast;
pub mod ast_passes;
pub mod builder;
pub mod cfg;
pub mod dominance;
pub mod func;
pub mod inst;
pub mod loops;
pub mod lower;
pub mod module;
pub mod node;
pub mod printer;
pub mod verify;

pub use ast::{Condition, LabelId, Stmt, StructuredFunction, SwitchArm};
pub use cfg::ControlFlowGraph;
pub use dominance::DominatorTree;
pub use func::Function;
pub use inst::{BinOp, CmpKind, Inst, Op, ValueId};
pub use loops::{LoopForest, LoopId};
pub use lower::{Expr, ExprLowering, Lower};
pub use module::Module;
pub use node::{Node, NodeId, SwitchCase, Terminator};
