//! Parser tests: error counting for missing tokens and zero-error parses of
//! well-formed programs.

use smplc::compile;

#[test]
fn empty_main_parses_clean() {
    let program = compile("main { }.").unwrap();
    assert_eq!(program.error_count(), 0);
}

#[test]
fn straight_line_program_parses_clean() {
    let program = compile(
        "main var a, b; { let a <- 1 + 2 * 3; let b <- a - 1; call OutputNum(b) }.",
    )
    .unwrap();
    assert_eq!(program.error_count(), 0);
    assert_eq!(program.warnings().count(), 0);
}

#[test]
fn control_flow_program_parses_clean() {
    let program = compile(
        "main var x, y;
         {
             let x <- call InputNum();
             let y <- 0;
             while x > 0 do
                 let y <- y + x;
                 let x <- x - 1
             od;
             if y == 0 then call OutputNewLine else call OutputNum(y) fi
         }.",
    )
    .unwrap();
    assert_eq!(program.error_count(), 0);
}

#[test]
fn missing_semi_in_var_decl_is_counted() {
    let program = compile("main var x { let x <- 1 }.").unwrap();
    assert!(program.error_count() > 0);
}

#[test]
fn missing_period_is_counted() {
    let program = compile("main { }").unwrap();
    assert_eq!(program.error_count(), 1);
}

#[test]
fn missing_then_is_counted() {
    let program = compile("main var x; { let x <- 1; if x < 2 let x <- 3 fi }.").unwrap();
    assert!(program.error_count() > 0);
}

#[test]
fn trailing_input_is_counted() {
    let program = compile("main { }. extra").unwrap();
    assert!(program.error_count() > 0);
}

#[test]
fn each_error_counts_once() {
    // only the closing parenthesis is missing
    let program = compile("main var x; { let x <- (1 + 2 }.").unwrap();
    assert_eq!(program.error_count(), 1);
}

#[test]
fn function_declarations_parse_clean() {
    let program = compile(
        "main var a;
         function double(n); { return n + n };
         void function shout(v); { call OutputNum(v); call OutputNewLine };
         {
             let a <- call double(21);
             call shout(a)
         }.",
    )
    .unwrap();
    assert_eq!(program.error_count(), 0);
    assert!(program.context_named("double").is_some());
    assert!(program.context_named("shout").is_some());
}
