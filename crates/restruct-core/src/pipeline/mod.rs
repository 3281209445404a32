//! Module-level driver: validate, structure, clean up, verify.

pub mod config;
pub mod passes;

pub use config::{DebugConfig, PassConfig, Preset, VALID_PASS_NAMES};
pub use passes::{AstPass, PassPipeline, MAX_FIXPOINT_ITERATIONS};

use log::debug;

use crate::error::CoreError;
use crate::ir::ast::{dismantle, nesting_depth};
use crate::ir::verify::{check_labels, reachable_count, validate_function};
use crate::ir::{ExprLowering, Function, LoopForest, Module, StructuredFunction};
use crate::structurize::structurize_with;

/// Deepest tree the cleanup passes, the label check and the printers
/// accept. They all recurse once per nested statement list.
pub const MAX_NESTING_DEPTH: usize = 512;

pub struct Pipeline {
    passes: PassPipeline,
    debug: DebugConfig,
}

impl Pipeline {
    pub fn new(config: &PassConfig, debug: DebugConfig) -> Self {
        Self {
            passes: PassPipeline::from_config(config),
            debug,
        }
    }

    /// Structure one function.
    ///
    /// Input problems (empty body, dangling targets, irreducible flow) come
    /// back as errors before any synthesis happens. Trees nested deeper
    /// than [`MAX_NESTING_DEPTH`] are rejected before cleanup. The finished
    /// tree is checked for dangling labels after cleanup.
    pub fn run_function(&self, func: &Function) -> Result<StructuredFunction, CoreError> {
        let dom = validate_function(func)?;
        let loops = LoopForest::compute(func, &dom);
        debug!(
            "{}: {} nodes ({} reachable), {} loops",
            func.name,
            func.nodes.len(),
            reachable_count(&dom),
            loops.len()
        );

        let dump = self.debug.should_dump(&func.name);
        if self.debug.dump_cfg && dump {
            eprintln!("=== CFG: {} ===\n{}\n=== end CFG ===\n", func.name, func);
        }

        let body = structurize_with(func, &dom, &loops, &mut ExprLowering);
        let depth = nesting_depth(&body);
        if depth > MAX_NESTING_DEPTH {
            dismantle(body);
            return Err(CoreError::NestingTooDeep {
                func: func.name.clone(),
                depth,
                limit: MAX_NESTING_DEPTH,
            });
        }
        let mut structured = StructuredFunction {
            name: func.name.clone(),
            body,
        };
        if self.debug.dump_tree && dump {
            eprintln!(
                "=== tree: {} ===\n{}\n=== end tree ===\n",
                func.name, structured
            );
        }

        if self.passes.run(&mut structured) {
            debug!("{}: cleanup passes rewrote the tree", func.name);
        }
        check_labels(&structured.name, &structured.body)?;
        Ok(structured)
    }

    /// Structure every function of `module`, stopping at the first error.
    pub fn run(&self, module: &Module) -> Result<Vec<StructuredFunction>, CoreError> {
        module
            .functions
            .iter()
            .map(|func| self.run_function(func))
            .collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(&PassConfig::default(), DebugConfig::none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;
    use crate::ir::builder::FunctionBuilder;
    use crate::ir::{Condition, Expr, Stmt, ValueId};

    fn diamond() -> Function {
        let mut fb = FunctionBuilder::new("diamond");
        let n1 = fb.create_node();
        let n2 = fb.create_node();
        let n3 = fb.create_node();
        fb.call_void("n0", &[]);
        let c = fb.call("c", &[]);
        fb.branch(c, n1, n2);
        for (arm, name) in [(n1, "n1"), (n2, "n2")] {
            fb.switch_to_node(arm);
            fb.call_void(name, &[]);
            fb.jump(n3);
        }
        fb.switch_to_node(n3);
        fb.call_void("n3", &[]);
        fb.ret(None);
        fb.build()
    }

    fn call(name: &str) -> Stmt<Expr> {
        Stmt::Expr(Expr::Call {
            func: name.to_string(),
            args: vec![],
        })
    }

    #[test]
    fn optimized_diamond_has_no_wrapper() {
        let out = Pipeline::default().run_function(&diamond()).unwrap();
        let v0 = ValueId::new(0);
        assert_eq!(
            out.body,
            vec![
                call("n0"),
                Stmt::Expr(Expr::Assign {
                    dest: v0,
                    value: Box::new(Expr::Call {
                        func: "c".into(),
                        args: vec![],
                    }),
                }),
                Stmt::If {
                    cond: Condition::Truthy(v0),
                    then_body: vec![call("n1")],
                    else_body: vec![call("n2")],
                },
                call("n3"),
                Stmt::Return(None),
            ]
        );
    }

    #[test]
    fn early_exit_becomes_a_plain_if() {
        //   n0: branch v0, n1, n2
        //   n1: jump n2
        //   n2: return
        let mut fb = FunctionBuilder::new("early");
        let n1 = fb.create_node();
        let n2 = fb.create_node();
        fb.call_void("n0", &[]);
        let c = fb.call("c", &[]);
        fb.branch(c, n1, n2);
        fb.switch_to_node(n1);
        fb.call_void("n1", &[]);
        fb.jump(n2);
        fb.switch_to_node(n2);
        fb.call_void("n2", &[]);
        fb.ret(None);
        let func = fb.build();

        let v0 = ValueId::new(0);
        let out = Pipeline::default().run_function(&func).unwrap();
        assert_eq!(
            out.body,
            vec![
                call("n0"),
                Stmt::Expr(Expr::Assign {
                    dest: v0,
                    value: Box::new(Expr::Call {
                        func: "c".into(),
                        args: vec![],
                    }),
                }),
                Stmt::If {
                    cond: Condition::Truthy(v0),
                    then_body: vec![call("n1")],
                    else_body: vec![],
                },
                call("n2"),
                Stmt::Return(None),
            ]
        );

        let config = Preset::resolve("optimized", &["fold-if-breaks"]).unwrap();
        let unfolded = Pipeline::new(&config, DebugConfig::none())
            .run_function(&func)
            .unwrap();
        assert!(matches!(unfolded.body[2], Stmt::Block { .. }));
    }

    #[test]
    fn literal_preset_keeps_the_wrapper() {
        let config = Preset::resolve("literal", &[]).unwrap();
        let out = Pipeline::new(&config, DebugConfig::none())
            .run_function(&diamond())
            .unwrap();
        assert!(matches!(out.body[2], Stmt::Block { .. }));
    }

    #[test]
    fn empty_function_is_rejected() {
        let func = Function::new("nothing");
        let err = Pipeline::default().run_function(&func).unwrap_err();
        assert!(matches!(err, CoreError::EmptyFunction { .. }));
    }

    #[test]
    fn overly_nested_output_is_rejected() {
        let mut fb = FunctionBuilder::new("nested");
        for _ in 0..MAX_NESTING_DEPTH + 100 {
            let next = fb.create_node();
            let early = fb.create_node();
            let c = fb.call("c", &[]);
            fb.branch(c, next, early);
            fb.switch_to_node(early);
            fb.ret(None);
            fb.switch_to_node(next);
        }
        fb.ret(None);

        let err = Pipeline::default().run_function(&fb.build()).unwrap_err();
        match err {
            CoreError::NestingTooDeep { func, depth, limit } => {
                assert_eq!(func, "nested");
                assert_eq!(limit, MAX_NESTING_DEPTH);
                assert!(depth > MAX_NESTING_DEPTH);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn run_covers_every_function() {
        let mut module = Module::new("m");
        module.functions.push(diamond());
        let mut fb = FunctionBuilder::new("leaf");
        fb.ret(None);
        module.functions.push(fb.build());

        let out = Pipeline::default().run(&module).unwrap();
        let names: Vec<_> = out.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["diamond", "leaf"]);
        assert_eq!(out[1].body, vec![Stmt::Return(None)]);
    }
}
