//! Branch back-patching tests: every conditional branch ends up targeting the
//! first instruction of its intended destination block.

use smplc::{compile, Opcode, Program};

fn assert_all_branches_patched(program: &Program) {
    for ctx in program.contexts() {
        for block in ctx.blocks() {
            for instr in block.instrs() {
                if instr.op.is_conditional_branch() || instr.op == Opcode::UnconditionalBranch {
                    assert!(
                        instr.y.is_some(),
                        "unpatched branch {} in BB{}",
                        instr.num,
                        block.id
                    );
                }
            }
        }
    }
}

#[test]
fn if_branch_targets_else_front() {
    let program = compile(
        "main var x; { let x <- 1; if x < 10 then let x <- 2 else let x <- 3 fi; call OutputNum(x) }.",
    )
    .unwrap();
    let ctx = program.main();

    let entry = ctx.entry_block();
    let cond_branch = entry
        .instrs()
        .find(|i| i.op.is_conditional_branch())
        .expect("conditional branch in entry");
    let else_block = ctx.block(entry.branch.expect("branch successor"));
    assert_eq!(cond_branch.y, else_block.first_instr().map(|i| i.num));

    assert_all_branches_patched(&program);
}

#[test]
fn then_arm_branches_over_else_to_merge_front() {
    let program = compile(
        "main var x; { let x <- 1; if x < 10 then let x <- 2 else let x <- 3 fi; call OutputNum(x) }.",
    )
    .unwrap();
    let ctx = program.main();

    let then_block = ctx.block(ctx.entry_block().fallthrough.expect("then successor"));
    let bra = then_block.last_instr().expect("trailing branch");
    assert_eq!(bra.op, Opcode::UnconditionalBranch);

    let merge = ctx.block(then_block.branch.expect("merge successor"));
    assert_eq!(bra.y, merge.first_instr().map(|i| i.num));
}

#[test]
fn while_branch_targets_exit_front() {
    let program = compile(
        "main var i; { let i <- 0; while i < 3 do let i <- i + 1 od; call OutputNum(i) }.",
    )
    .unwrap();
    let ctx = program.main();

    let cond = ctx
        .blocks()
        .find(|b| b.instrs().any(|i| i.op == Opcode::Cmp))
        .expect("condition block");
    let cond_branch = cond
        .instrs()
        .find(|i| i.op.is_conditional_branch())
        .unwrap();
    let exit = ctx.block(cond.branch.expect("exit successor"));
    assert_eq!(cond_branch.y, exit.first_instr().map(|i| i.num));

    assert_all_branches_patched(&program);
}

#[test]
fn relation_emits_negated_branch() {
    // the branch is taken when the source relation is false
    for (rel, op) in [
        ("==", Opcode::BranchNotEqual),
        ("!=", Opcode::BranchEqual),
        ("<", Opcode::BranchGreaterOrEqual),
        ("<=", Opcode::BranchGreater),
        (">", Opcode::BranchLessOrEqual),
        (">=", Opcode::BranchLess),
    ] {
        let src = format!(
            "main var x; {{ let x <- 1; if x {rel} 2 then let x <- 3 fi; call OutputNum(x) }}.",
        );
        let program = compile(&src).unwrap();
        let found = program
            .main()
            .blocks()
            .flat_map(|b| b.instrs())
            .any(|i| i.op == op);
        assert!(found, "expected {op:?} for relation {rel}");
    }
}

#[test]
fn branch_feeds_on_comparison() {
    let program = compile(
        "main var x; { let x <- 1; if x < 10 then let x <- 2 fi; call OutputNum(x) }.",
    )
    .unwrap();
    let entry = program.main().entry_block();
    let cmp = entry.instrs().find(|i| i.op == Opcode::Cmp).unwrap();
    let branch = entry
        .instrs()
        .find(|i| i.op.is_conditional_branch())
        .unwrap();
    assert_eq!(branch.x, Some(cmp.num));
}

#[test]
fn empty_arm_still_gets_a_patchable_target() {
    // the else side has no statements at all; the branch must still land on
    // a real instruction
    let program = compile(
        "main var x; { let x <- 1; if x < 2 then let x <- 3 fi; call OutputNum(x) }.",
    )
    .unwrap();
    assert_all_branches_patched(&program);
    assert_eq!(program.error_count(), 0);
}
