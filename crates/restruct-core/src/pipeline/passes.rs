use log::trace;

use crate::ir::ast_passes;
use crate::ir::StructuredFunction;

use super::config::PassConfig;

/// A cleanup pass over a structured function.
pub trait AstPass {
    /// Name of this pass, as accepted by `--skip-pass`.
    fn name(&self) -> &str;

    /// Rewrite `func` in place. Returns `true` if anything changed.
    fn apply(&self, func: &mut StructuredFunction) -> bool;
}

/// Maximum number of fixpoint iterations before giving up.
pub const MAX_FIXPOINT_ITERATIONS: usize = 100;

pub struct FoldIfBreaks;

impl AstPass for FoldIfBreaks {
    fn name(&self) -> &str {
        "fold-if-breaks"
    }

    fn apply(&self, func: &mut StructuredFunction) -> bool {
        ast_passes::fold_if_breaks(&mut func.body)
    }
}

pub struct ElideTrailingBreaks;

impl AstPass for ElideTrailingBreaks {
    fn name(&self) -> &str {
        "elide-trailing-breaks"
    }

    fn apply(&self, func: &mut StructuredFunction) -> bool {
        ast_passes::elide_trailing_breaks(&mut func.body)
    }
}

pub struct FlattenUnusedBlocks;

impl AstPass for FlattenUnusedBlocks {
    fn name(&self) -> &str {
        "flatten-unused-blocks"
    }

    fn apply(&self, func: &mut StructuredFunction) -> bool {
        ast_passes::flatten_unused_blocks(&mut func.body)
    }
}

pub struct SimplifyIfs;

impl AstPass for SimplifyIfs {
    fn name(&self) -> &str {
        "simplify-ifs"
    }

    fn apply(&self, func: &mut StructuredFunction) -> bool {
        ast_passes::simplify_ifs(&mut func.body)
    }
}

/// An ordered sequence of cleanup passes.
pub struct PassPipeline {
    passes: Vec<Box<dyn AstPass>>,
    fixpoint: bool,
}

impl PassPipeline {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            fixpoint: false,
        }
    }

    /// Build the pipeline selected by `config`, in canonical order.
    pub fn from_config(config: &PassConfig) -> Self {
        let mut pipeline = Self::new();
        if config.fold_if_breaks {
            pipeline.add(Box::new(FoldIfBreaks));
        }
        if config.elide_trailing_breaks {
            pipeline.add(Box::new(ElideTrailingBreaks));
        }
        if config.flatten_unused_blocks {
            pipeline.add(Box::new(FlattenUnusedBlocks));
        }
        if config.simplify_ifs {
            pipeline.add(Box::new(SimplifyIfs));
        }
        pipeline.set_fixpoint(config.fixpoint);
        pipeline
    }

    pub fn add(&mut self, pass: Box<dyn AstPass>) {
        self.passes.push(pass);
    }

    /// Enable fixpoint iteration: re-run every pass until none reports
    /// changes, or until the iteration cap is reached.
    pub fn set_fixpoint(&mut self, enabled: bool) {
        self.fixpoint = enabled;
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run all passes in order. Returns `true` if any pass changed `func`.
    pub fn run(&self, func: &mut StructuredFunction) -> bool {
        let rounds = if self.fixpoint {
            MAX_FIXPOINT_ITERATIONS
        } else {
            1
        };
        let mut changed_at_all = false;
        for _ in 0..rounds {
            let mut any_changed = false;
            for pass in &self.passes {
                let changed = pass.apply(func);
                if changed {
                    trace!("{}: {} changed the tree", func.name, pass.name());
                }
                any_changed |= changed;
            }
            changed_at_all |= any_changed;
            if !any_changed {
                break;
            }
        }
        changed_at_all
    }
}

impl Default for PassPipeline {
    fn default() -> Self {
        Self::new()
    }
}
