//! Phi construction tests: non-trivial merges, trivial-phi collapse,
//! pre-branch restoration for else-arms, and folding of nested constructs
//! into enclosing joins.

use smplc::{compile, Instr, Opcode, Program};

fn main_instrs(program: &Program) -> Vec<Instr> {
    program
        .main()
        .blocks()
        .flat_map(|b| b.instrs().copied())
        .collect()
}

fn find_const(program: &Program, literal: u64) -> Instr {
    main_instrs(program)
        .into_iter()
        .find(|i| i.op == Opcode::Const && i.x == Some(literal))
        .unwrap_or_else(|| panic!("no const #{literal}"))
}

#[test]
fn if_merge_produces_non_trivial_phi() {
    let program = compile(
        "main var x; { let x <- 1; if x < 10 then let x <- 2 else let x <- 3 fi; call OutputNum(x) }.",
    )
    .unwrap();
    assert_eq!(program.error_count(), 0);

    let merge = program
        .main()
        .blocks()
        .find(|b| b.instrs().any(|i| i.op == Opcode::Phi))
        .expect("merge block with phi");
    // two predecessors flow into the merge block
    assert!(merge.pred.is_some());
    assert!(merge.pred_alt.is_some());

    let phi = merge.instrs().find(|i| i.op == Opcode::Phi).unwrap();
    assert_ne!(phi.x, phi.y);
    assert_eq!(phi.x, Some(find_const(&program, 2).num));
    assert_eq!(phi.y, Some(find_const(&program, 3).num));

    // the write reads through the merge, not either arm's constant
    let write = main_instrs(&program)
        .into_iter()
        .find(|i| i.op == Opcode::Write)
        .unwrap();
    assert_eq!(write.x, Some(phi.num));
}

#[test]
fn untouched_variable_collapses_to_pre_branch_value() {
    let program = compile(
        "main var x; { let x <- 1; if x < 2 then call OutputNum(x) fi; call OutputNum(x) }.",
    )
    .unwrap();
    assert_eq!(program.error_count(), 0);

    // no phi survives anywhere: the variable was never assigned in an arm
    assert!(main_instrs(&program).iter().all(|i| i.op != Opcode::Phi));

    let one = find_const(&program, 1);
    // the symbol table also reads straight through to the pre-branch value
    assert_eq!(program.main().symbol_value(3), Some(one.num));
    let writes: Vec<Instr> = main_instrs(&program)
        .into_iter()
        .filter(|i| i.op == Opcode::Write)
        .collect();
    assert_eq!(writes.len(), 2);
    for write in writes {
        assert_eq!(write.x, Some(one.num));
    }
}

#[test]
fn then_only_assignment_merges_against_incoming_value() {
    let program = compile(
        "main var x; { let x <- 1; if x < 10 then let x <- 2 fi; call OutputNum(x) }.",
    )
    .unwrap();
    let instrs = main_instrs(&program);
    let phi = instrs.iter().find(|i| i.op == Opcode::Phi).expect("phi");
    assert_eq!(phi.x, Some(find_const(&program, 2).num));
    // absent else keeps the pre-branch value on the other side
    assert_eq!(phi.y, Some(find_const(&program, 1).num));
}

#[test]
fn else_arm_reads_pre_branch_state() {
    let program = compile(
        "main var x; { let x <- 1; if x < 9 then let x <- 2 else call OutputNum(x) fi }.",
    )
    .unwrap();
    let write = main_instrs(&program)
        .into_iter()
        .find(|i| i.op == Opcode::Write)
        .unwrap();
    // the then-arm's assignment must not leak into the else-arm
    assert_eq!(write.x, Some(find_const(&program, 1).num));
}

#[test]
fn uninitialized_read_warns_once_and_binds_zero() {
    let program = compile("main var x, y; { let y <- x + x; call OutputNum(y) }.").unwrap();
    assert_eq!(program.error_count(), 0);
    assert_eq!(program.warnings().count(), 1);

    let instrs = main_instrs(&program);
    let zeros = instrs
        .iter()
        .filter(|i| i.op == Opcode::Const && i.x == Some(0))
        .count();
    assert_eq!(zeros, 1);

    // both reads resolved to the same materialized zero
    let zero = find_const(&program, 0);
    let add = instrs.iter().find(|i| i.op == Opcode::Add).unwrap();
    assert_eq!(add.x, Some(zero.num));
    assert_eq!(add.y, Some(zero.num));
}

#[test]
fn nested_if_folds_into_enclosing_loop_phi() {
    let program = compile(
        "main var x;
         {
             let x <- 0;
             while x < 10 do
                 if x < 5 then let x <- x + 1 else let x <- x + 2 fi
             od;
             call OutputNum(x)
         }.",
    )
    .unwrap();
    assert_eq!(program.error_count(), 0);

    let blocks: Vec<_> = program.main().blocks().collect();
    let cond = blocks
        .iter()
        .find(|b| b.instrs().any(|i| i.op == Opcode::Cmp) && b.instrs().any(|i| i.op == Opcode::Phi))
        .expect("loop condition block");
    let loop_phi = cond.instrs().find(|i| i.op == Opcode::Phi).unwrap();

    let inner_phi = blocks
        .iter()
        .flat_map(|b| b.instrs())
        .find(|i| i.op == Opcode::Phi && i.num != loop_phi.num)
        .expect("inner merge phi");

    // the if's merge result feeds the loop's back-edge side
    assert_eq!(loop_phi.y, Some(inner_phi.num));
    assert_eq!(loop_phi.x, Some(find_const(&program, 0).num));
}
