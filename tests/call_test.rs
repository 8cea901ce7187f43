//! Function declaration and call lowering tests: the SetParam/GetParam/Jump
//! convention, arity and call-context enforcement, and the end-to-end
//! straight-line scenario.

use smplc::{compile, CompileError, Instr, Opcode, Program};

fn instrs_of<'a>(program: &'a Program, name: &str) -> Vec<Instr> {
    program
        .context_named(name)
        .unwrap_or_else(|| panic!("no context named {name}"))
        .blocks()
        .flat_map(|b| b.instrs().copied())
        .collect()
}

#[test]
fn straight_line_program_lowers_to_one_block() {
    let program = compile(
        "main var x, y; { let x <- 2; let y <- 4; let x <- x * y; call OutputNum(x) }.",
    )
    .unwrap();
    assert_eq!(program.error_count(), 0);

    let ctx = program.main();
    assert_eq!(ctx.blocks().count(), 1);

    let instrs: Vec<&Instr> = ctx.entry_block().instrs().collect();
    assert_eq!(instrs.len(), 4);
    assert_eq!(
        instrs
            .iter()
            .filter(|i| i.op == Opcode::Const && i.x == Some(2))
            .count(),
        1
    );
    assert_eq!(
        instrs
            .iter()
            .filter(|i| i.op == Opcode::Const && i.x == Some(4))
            .count(),
        1
    );
    let mul = instrs.iter().find(|i| i.op == Opcode::Mul).expect("mul");
    let write = instrs.iter().find(|i| i.op == Opcode::Write).expect("write");
    assert_eq!(write.x, Some(mul.num));
}

#[test]
fn parameters_lower_to_getparam_at_entry() {
    let program = compile(
        "main var a;
         function add2(x, y); { return x + y };
         { let a <- call add2(1, 2); call OutputNum(a) }.",
    )
    .unwrap();
    assert_eq!(program.error_count(), 0);

    let callee = instrs_of(&program, "add2");
    let getps: Vec<&Instr> = callee.iter().filter(|i| i.op == Opcode::GetParam).collect();
    assert_eq!(getps.len(), 2);
    assert_eq!(getps[0].x, Some(1));
    assert_eq!(getps[1].x, Some(2));

    let add = callee.iter().find(|i| i.op == Opcode::Add).unwrap();
    assert_eq!(add.x, Some(getps[0].num));
    assert_eq!(add.y, Some(getps[1].num));

    let ret = callee.iter().find(|i| i.op == Opcode::Return).unwrap();
    assert_eq!(ret.x, Some(add.num));
}

#[test]
fn call_site_lowers_to_setparam_then_jump() {
    let program = compile(
        "main var a;
         function add2(x, y); { return x + y };
         { let a <- call add2(1, 2); call OutputNum(a) }.",
    )
    .unwrap();

    let caller = instrs_of(&program, "main");
    let setps: Vec<&Instr> = caller.iter().filter(|i| i.op == Opcode::SetParam).collect();
    assert_eq!(setps.len(), 2);
    assert_eq!(setps[0].x, Some(1));
    assert_eq!(setps[1].x, Some(2));

    let jump = caller.iter().find(|i| i.op == Opcode::Jump).unwrap();
    let entry = program
        .context_named("add2")
        .unwrap()
        .entry_block()
        .first_instr()
        .unwrap()
        .num;
    assert_eq!(jump.x, Some(entry));

    // the function table agrees with the lowered code
    let info = program
        .functions()
        .values()
        .find(|f| !f.is_void)
        .expect("non-void function entry");
    assert_eq!(info.entry, entry);
    assert_eq!(info.params, 2);

    // a non-void call's result is the jump's value number
    let write = caller.iter().find(|i| i.op == Opcode::Write).unwrap();
    assert_eq!(write.x, Some(jump.num));
}

#[test]
fn arity_mismatch_is_fatal() {
    let err = compile(
        "main var a;
         function add2(x, y); { return x + y };
         { let a <- call add2(1); call OutputNum(a) }.",
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::ArityMismatch { expected: 2, got: 1, .. }));
}

#[test]
fn void_function_in_expression_is_fatal() {
    let err = compile(
        "main var a;
         void function ping(); { call OutputNewLine };
         { let a <- call ping(); call OutputNum(a) }.",
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::VoidInExpression { .. }));
}

#[test]
fn non_void_function_as_statement_is_fatal() {
    let err = compile(
        "main var a;
         function seven(); { return 7 };
         { call seven() }.",
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::ValueInStatement { .. }));
}

#[test]
fn input_num_as_statement_is_fatal() {
    let err = compile("main { call InputNum() }.").unwrap_err();
    assert!(matches!(err, CompileError::ValueInStatement { .. }));
}

#[test]
fn unknown_callee_is_fatal() {
    let err = compile("main { call nosuch(1) }.").unwrap_err();
    assert!(matches!(err, CompileError::UnknownSymbol { .. }));
}

#[test]
fn missing_return_appends_void_return_with_warning() {
    let program = compile(
        "main var a;
         function leaky(n); { let n <- n + 1 };
         { let a <- call leaky(1); call OutputNum(a) }.",
    )
    .unwrap();
    assert_eq!(program.warnings().count(), 1);

    let callee = instrs_of(&program, "leaky");
    let ret = callee.iter().find(|i| i.op == Opcode::Return).unwrap();
    assert_eq!(ret.x, None);
}

#[test]
fn void_function_gets_silent_implicit_return() {
    let program = compile(
        "main
         void function ping(); { call OutputNewLine };
         { call ping() }.",
    )
    .unwrap();
    assert_eq!(program.warnings().count(), 0);
    let callee = instrs_of(&program, "ping");
    assert!(callee.iter().any(|i| i.op == Opcode::Return));
}

#[test]
fn input_num_in_expression_reads() {
    let program = compile("main var x; { let x <- call InputNum(); call OutputNum(x) }.").unwrap();
    assert_eq!(program.error_count(), 0);
    let instrs = instrs_of(&program, "main");
    let read = instrs.iter().find(|i| i.op == Opcode::Read).unwrap();
    let write = instrs.iter().find(|i| i.op == Opcode::Write).unwrap();
    assert_eq!(write.x, Some(read.num));
}

#[test]
fn recursive_call_checks_out_against_own_entry() {
    let program = compile(
        "main var a;
         function countdown(n); {
             if n > 0 then return call countdown(n - 1) else return 0 fi
         };
         { let a <- call countdown(3); call OutputNum(a) }.",
    )
    .unwrap();
    assert_eq!(program.error_count(), 0);

    let callee = instrs_of(&program, "countdown");
    let entry = program
        .context_named("countdown")
        .unwrap()
        .entry_block()
        .first_instr()
        .unwrap()
        .num;
    let self_jump = callee.iter().find(|i| i.op == Opcode::Jump).unwrap();
    assert_eq!(self_jump.x, Some(entry));
}
