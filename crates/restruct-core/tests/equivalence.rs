//! The structured tree must behave exactly like the CFG it came from.

mod common;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use restruct_core::ir::ast::walk;
use restruct_core::ir::builder::FunctionBuilder;
use restruct_core::ir::verify::{check_labels, validate_function};
use restruct_core::ir::{CmpKind, Expr, ExprLowering, Function, NodeId, Stmt, ValueId};
use restruct_core::pipeline::{DebugConfig, Pipeline, Preset};
use restruct_core::structurize::structurize;
use restruct_core::CoreError;

use common::{reachable_nodes, run_cfg, run_tree, Outcome};

const FUEL: usize = 200;

/// Every node's code, by marker call name.
fn node_markers(body: &[Stmt<Expr>]) -> Vec<String> {
    let mut names = Vec::new();
    walk(body, &mut |stmt| {
        if let Stmt::Expr(Expr::Assign { value, .. }) = stmt {
            if let Expr::Call { func, .. } = value.as_ref() {
                if func.starts_with('n') {
                    names.push(func.clone());
                }
            }
        }
    });
    names
}

/// Structure `func` raw and through both presets, then check each tree
/// against the CFG under every script.
fn assert_equivalent(func: &Function, scripts: &[Vec<i64>]) {
    let raw = structurize(func, &mut ExprLowering);
    check_labels(&func.name, &raw).unwrap();

    let mut markers = node_markers(&raw);
    let total = markers.len();
    markers.sort();
    markers.dedup();
    assert_eq!(markers.len(), total, "a node was emitted twice:\n{func}");
    assert_eq!(total, reachable_nodes(func), "a node is missing:\n{func}");

    let mut trees = vec![raw];
    for preset in ["literal", "optimized"] {
        let config = Preset::resolve(preset, &[]).unwrap();
        let out = Pipeline::new(&config, DebugConfig::none())
            .run_function(func)
            .unwrap();
        trees.push(out.body);
    }

    for script in scripts {
        let expected = run_cfg(func, script, FUEL);
        for body in &trees {
            let actual = run_tree(body, script, FUEL);
            assert_eq!(actual, expected, "script {script:?}\n{func}");
        }
    }
}

fn scripts(rng: &mut StdRng, count: usize) -> Vec<Vec<i64>> {
    (0..count)
        .map(|_| (0..48).map(|_| rng.gen_range(0..4)).collect())
        .collect()
}

/// A node whose only instruction is a call named after it.
fn enter(fb: &mut FunctionBuilder, node: NodeId) -> ValueId {
    fb.switch_to_node(node);
    fb.call(node.to_string(), &[])
}

fn fixed_scripts() -> Vec<Vec<i64>> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut all = vec![vec![0], vec![1], vec![2], vec![1, 0], vec![0, 1, 1, 0, 2, 3]];
    all.extend(scripts(&mut rng, 20));
    all
}

#[test]
fn triple_nested_diamonds() {
    // Three diamonds, each nested in the then-arm of the previous one, all
    // joining at distinct merge points.
    let mut fb = FunctionBuilder::new("diamonds");
    let entry = fb.entry_node();
    let nodes: Vec<NodeId> = (0..10).map(|_| fb.create_node()).collect();
    let [a, b, c, d, e, f, g, h, i, exit] = nodes[..] else {
        unreachable!()
    };
    let v = enter(&mut fb, entry);
    fb.branch(v, a, b);
    let v = enter(&mut fb, a);
    fb.branch(v, c, d);
    let v = enter(&mut fb, c);
    fb.branch(v, e, f);
    enter(&mut fb, e);
    fb.jump(g);
    enter(&mut fb, f);
    fb.jump(g);
    enter(&mut fb, g);
    fb.jump(h);
    enter(&mut fb, d);
    fb.jump(h);
    enter(&mut fb, h);
    fb.jump(i);
    enter(&mut fb, b);
    fb.jump(i);
    let v = enter(&mut fb, i);
    fb.jump(exit);
    enter(&mut fb, exit);
    fb.ret(Some(v));
    assert_equivalent(&fb.build(), &fixed_scripts());
}

#[test]
fn nested_loops_with_multi_level_exit() {
    //   n0 -> outer
    //   outer: inner
    //   inner: if v { exit } else { latch }      leaves both loops
    //   latch: if v { inner } else { olatch }
    //   olatch: if v { outer } else { exit }
    let mut fb = FunctionBuilder::new("loops");
    let entry = fb.entry_node();
    let outer = fb.create_node();
    let inner = fb.create_node();
    let latch = fb.create_node();
    let olatch = fb.create_node();
    let exit = fb.create_node();
    enter(&mut fb, entry);
    fb.jump(outer);
    enter(&mut fb, outer);
    fb.jump(inner);
    let v = enter(&mut fb, inner);
    fb.branch(v, exit, latch);
    let v = enter(&mut fb, latch);
    fb.branch(v, inner, olatch);
    let v = enter(&mut fb, olatch);
    fb.branch(v, outer, exit);
    let v = enter(&mut fb, exit);
    fb.ret(Some(v));
    assert_equivalent(&fb.build(), &fixed_scripts());
}

#[test]
fn loop_with_several_exits_and_continue() {
    let mut fb = FunctionBuilder::new("exits");
    let entry = fb.entry_node();
    let head = fb.create_node();
    let body = fb.create_node();
    let skip = fb.create_node();
    let out_a = fb.create_node();
    let out_b = fb.create_node();
    let done = fb.create_node();
    enter(&mut fb, entry);
    fb.jump(head);
    let v = enter(&mut fb, head);
    let zero = fb.const_int(0);
    fb.branch_cmp(CmpKind::Eq, v, zero, out_a, body);
    let v = enter(&mut fb, body);
    fb.switch(v, &[(1, skip), (2, out_b), (3, head)], head);
    let v = enter(&mut fb, skip);
    fb.branch(v, head, out_b);
    enter(&mut fb, out_a);
    fb.jump(done);
    let v = enter(&mut fb, out_b);
    fb.throw(v);
    let v = enter(&mut fb, done);
    fb.ret(Some(v));
    assert_equivalent(&fb.build(), &fixed_scripts());
}

#[test]
fn switch_with_shared_targets() {
    let mut fb = FunctionBuilder::new("switch");
    let entry = fb.entry_node();
    let a = fb.create_node();
    let b = fb.create_node();
    let join = fb.create_node();
    let v = enter(&mut fb, entry);
    fb.switch(v, &[(0, a), (1, b), (2, a), (3, join)], b);
    enter(&mut fb, a);
    fb.jump(join);
    enter(&mut fb, b);
    fb.jump(join);
    let v = enter(&mut fb, join);
    fb.ret(Some(v));
    assert_equivalent(&fb.build(), &fixed_scripts());
}

#[test]
fn chained_early_exits_fold_into_nested_ifs() {
    //   n0: branch n1, m
    //   n1: branch n2, m
    //   n2: branch n3, m
    //   n3: jump m
    //   m:  return
    let mut fb = FunctionBuilder::new("early_exits");
    let entry = fb.entry_node();
    let steps: Vec<NodeId> = (0..3).map(|_| fb.create_node()).collect();
    let merge = fb.create_node();
    let mut cur = entry;
    for &next in &steps {
        let v = enter(&mut fb, cur);
        fb.branch(v, next, merge);
        cur = next;
    }
    enter(&mut fb, cur);
    fb.jump(merge);
    let v = enter(&mut fb, merge);
    fb.ret(Some(v));
    let func = fb.build();
    assert_equivalent(&func, &fixed_scripts());

    let out = Pipeline::default().run_function(&func).unwrap();
    let mut blocks = 0;
    walk(&out.body, &mut |stmt| {
        if matches!(stmt, Stmt::Block { .. }) {
            blocks += 1;
        }
    });
    assert_eq!(blocks, 0, "{out}");
}

#[test]
fn early_exit_and_continue_inside_loop() {
    let mut fb = FunctionBuilder::new("loop_exits");
    let entry = fb.entry_node();
    let head = fb.create_node();
    let a = fb.create_node();
    let b = fb.create_node();
    let latch = fb.create_node();
    let exit = fb.create_node();
    enter(&mut fb, entry);
    fb.jump(head);
    let v = enter(&mut fb, head);
    fb.branch(v, a, exit);
    let v = enter(&mut fb, a);
    fb.branch(v, head, b);
    let v = enter(&mut fb, b);
    fb.branch(v, latch, exit);
    enter(&mut fb, latch);
    fb.jump(head);
    let v = enter(&mut fb, exit);
    fb.ret(Some(v));
    assert_equivalent(&fb.build(), &fixed_scripts());
}

/// A random graph where most edges point forward, some point back to an
/// earlier node, and every node makes one call.
fn random_function(rng: &mut StdRng, size: usize) -> Function {
    let mut fb = FunctionBuilder::new("random");
    let mut nodes = vec![fb.entry_node()];
    nodes.extend((1..size).map(|_| fb.create_node()));

    for i in 0..size {
        let v = enter(&mut fb, nodes[i]);
        let pick = |rng: &mut StdRng| {
            if i + 1 < size && rng.gen_bool(0.8) {
                nodes[rng.gen_range(i + 1..size)]
            } else {
                nodes[rng.gen_range(0..=i)]
            }
        };
        if i + 1 == size || rng.gen_bool(0.08) {
            if rng.gen_bool(0.8) {
                fb.ret(Some(v));
            } else {
                fb.throw(v);
            }
            continue;
        }
        match rng.gen_range(0..4) {
            0 => {
                let t = pick(&mut *rng);
                fb.jump(t);
            }
            1 => {
                let (a, b) = (pick(&mut *rng), pick(&mut *rng));
                fb.branch(v, a, b);
            }
            2 => {
                let (a, b) = (pick(&mut *rng), pick(&mut *rng));
                let one = fb.const_int(1);
                fb.branch_cmp(CmpKind::Lt, v, one, a, b);
            }
            _ => {
                let cases: Vec<(i64, NodeId)> = (0..rng.gen_range(1..4))
                    .map(|k| (k, pick(&mut *rng)))
                    .collect();
                let default = pick(&mut *rng);
                fb.switch(v, &cases, default);
            }
        }
    }
    fb.build()
}

#[test]
fn random_reducible_graphs() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut checked = 0;
    let mut rejected = 0;
    for _ in 0..400 {
        let size = rng.gen_range(2..12);
        let func = random_function(&mut rng, size);
        match validate_function(&func) {
            Ok(_) => {}
            Err(CoreError::Irreducible { .. }) => {
                rejected += 1;
                continue;
            }
            Err(e) => panic!("unexpected validation error: {e}"),
        }
        let scripts = scripts(&mut rng, 6);
        assert_equivalent(&func, &scripts);
        checked += 1;
    }
    assert!(checked >= 50, "only {checked} reducible graphs ({rejected} rejected)");
}

#[test]
fn runaway_loops_agree_on_fuel() {
    // n0: loop forever calling n0
    let mut fb = FunctionBuilder::new("spin");
    let entry = fb.entry_node();
    enter(&mut fb, entry);
    fb.jump(entry);
    let func = fb.build();
    let body = structurize(&func, &mut ExprLowering);
    let expected = run_cfg(&func, &[0], FUEL);
    assert_eq!(expected.outcome, Outcome::OutOfFuel);
    assert_eq!(expected.calls.len(), FUEL);
    assert_eq!(run_tree(&body, &[0], FUEL), expected);
}
