//! Fatal paths of the checked safety mode.
//!
//! The runtime guards abort the process, so each violation scenario runs
//! in a child invocation of this test binary, selected through an
//! environment variable. The parent asserts the child died and printed
//! the expected diagnostic.

use std::process::Command;

use vesper::{read_str, Compiler, SafetyMode, SymbolTable, Value};

const SCENARIO_VAR: &str = "VESPER_GUARD_SCENARIO";

fn scenario_selected(name: &str) -> bool {
    std::env::var(SCENARIO_VAR).as_deref() == Ok(name)
}

/// Re-run this test binary with only the named scenario test, returning
/// the child's success flag and stderr. `--nocapture` keeps the guard
/// diagnostic on the real stderr despite the harness.
fn run_scenario(name: &str, test_name: &str) -> (bool, String) {
    let exe = std::env::current_exe().unwrap();
    let output = Command::new(exe)
        .args([test_name, "--exact", "--nocapture"])
        .env(SCENARIO_VAR, name)
        .output()
        .unwrap();
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

fn checked_compiler() -> (SymbolTable, Compiler) {
    let mut symbols = SymbolTable::new();
    let compiler = Compiler::new(&mut symbols, SafetyMode::Checked).unwrap();
    (symbols, compiler)
}

#[test]
fn too_few_arguments_scenario() {
    if !scenario_selected("arity-exact") {
        return;
    }
    let (mut symbols, mut compiler) = checked_compiler();
    let expr = read_str("(lambda (x) x)", &mut symbols).unwrap();
    let f = compiler.compile_lambda(expr).unwrap();
    // the prologue guard aborts before the body runs
    let _ = unsafe { f.call(&[]) };
    unreachable!("arity guard did not fire");
}

#[test]
fn arity_mismatch_aborts_with_a_diagnostic() {
    let (ok, stderr) = run_scenario("arity-exact", "too_few_arguments_scenario");
    assert!(!ok);
    assert!(
        stderr.contains("wrong number of arguments: expected 1, got 0"),
        "stderr was: {}",
        stderr
    );
}

#[test]
fn too_few_arguments_for_rest_scenario() {
    if !scenario_selected("arity-min") {
        return;
    }
    let (mut symbols, mut compiler) = checked_compiler();
    let expr = read_str("(lambda (a b . rest) rest)", &mut symbols).unwrap();
    let f = compiler.compile_lambda(expr).unwrap();
    let _ = unsafe { f.call(&[Value::fixnum(1)]) };
    unreachable!("arity guard did not fire");
}

#[test]
fn rest_arity_mismatch_aborts_with_a_diagnostic() {
    let (ok, stderr) = run_scenario("arity-min", "too_few_arguments_for_rest_scenario");
    assert!(!ok);
    assert!(
        stderr.contains("wrong number of arguments: expected at least 2, got 1"),
        "stderr was: {}",
        stderr
    );
}

#[test]
fn non_closure_callee_scenario() {
    if !scenario_selected("non-closure") {
        return;
    }
    let (mut symbols, mut compiler) = checked_compiler();
    let g = symbols.intern("g");
    g.as_symbol().unwrap().set_global(Value::fixnum(3));
    let expr = read_str("(lambda () (g))", &mut symbols).unwrap();
    let f = compiler.compile_lambda(expr).unwrap();
    // the call-site guard aborts before the indirect call
    let _ = unsafe { f.call(&[]) };
    unreachable!("callee guard did not fire");
}

#[test]
fn calling_a_non_closure_aborts_with_a_diagnostic() {
    let (ok, stderr) = run_scenario("non-closure", "non_closure_callee_scenario");
    assert!(!ok);
    assert!(
        stderr.contains("attempt to call a non-closure value"),
        "stderr was: {}",
        stderr
    );
}
