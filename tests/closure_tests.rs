//! Closure capture, nesting, and variadic parameter tests.

use vesper::{call_closure, read_str, Compiler, SafetyMode, SymbolTable, Value};

fn setup() -> (SymbolTable, Compiler) {
    let mut symbols = SymbolTable::new();
    let compiler = Compiler::new(&mut symbols, SafetyMode::Checked).unwrap();
    (symbols, compiler)
}

fn compile(src: &str, symbols: &mut SymbolTable, compiler: &mut Compiler) -> vesper::CompiledLambda {
    let expr = read_str(src, symbols).unwrap();
    compiler.compile_lambda(expr).unwrap()
}

#[test]
fn inner_lambda_captures_a_parameter() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda (x) (lambda () x))", &mut symbols, &mut compiler);
    let closure = unsafe { f.call(&[Value::fixnum(7)]) };
    assert!(closure.is_closure());
    assert_eq!(unsafe { call_closure(closure, &[]) }, Value::fixnum(7));
}

#[test]
fn closed_inner_lambda_has_a_null_capture_record() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda () (lambda () 99))", &mut symbols, &mut compiler);
    let closure = unsafe { f.call(&[]) };
    let obj = closure.as_closure().unwrap();
    assert!(obj.env().is_null());
    assert_eq!(unsafe { call_closure(closure, &[]) }, Value::fixnum(99));
}

#[test]
fn capture_threads_through_an_intermediate_lambda() {
    let (mut symbols, mut compiler) = setup();
    let f = compile(
        "(lambda (x) (lambda () (lambda () x)))",
        &mut symbols,
        &mut compiler,
    );
    let middle = unsafe { f.call(&[Value::fixnum(5)]) };
    let inner = unsafe { call_closure(middle, &[]) };
    assert!(inner.is_closure());
    assert_eq!(unsafe { call_closure(inner, &[]) }, Value::fixnum(5));
}

#[test]
fn each_instantiation_captures_its_own_value() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda (x) (lambda () x))", &mut symbols, &mut compiler);
    let one = unsafe { f.call(&[Value::fixnum(1)]) };
    let two = unsafe { f.call(&[Value::fixnum(2)]) };
    assert_ne!(one, two);
    assert_eq!(unsafe { call_closure(one, &[]) }, Value::fixnum(1));
    assert_eq!(unsafe { call_closure(two, &[]) }, Value::fixnum(2));
}

#[test]
fn inner_lambda_sees_both_captures_and_own_parameters() {
    let (mut symbols, mut compiler) = setup();
    let f = compile(
        "(lambda (x) (lambda (y) (if y x 0)))",
        &mut symbols,
        &mut compiler,
    );
    let closure = unsafe { f.call(&[Value::fixnum(3)]) };
    assert_eq!(
        unsafe { call_closure(closure, &[Value::TRUE]) },
        Value::fixnum(3)
    );
    assert_eq!(
        unsafe { call_closure(closure, &[Value::FALSE]) },
        Value::fixnum(0)
    );
}

#[test]
fn sibling_lambdas_capture_independently() {
    let (mut symbols, mut compiler) = setup();
    // returns one of two closures over the same variable
    let f = compile(
        "(lambda (x pick) (if pick (lambda () x) (lambda (y) x)))",
        &mut symbols,
        &mut compiler,
    );
    let thunk = unsafe { f.call(&[Value::fixnum(4), Value::TRUE]) };
    assert_eq!(unsafe { call_closure(thunk, &[]) }, Value::fixnum(4));
    let unary = unsafe { f.call(&[Value::fixnum(6), Value::FALSE]) };
    assert_eq!(
        unsafe { call_closure(unary, &[Value::NIL]) },
        Value::fixnum(6)
    );
}

#[test]
fn rest_parameter_collects_excess_arguments_in_order() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda (a . rest) rest)", &mut symbols, &mut compiler);
    let r = unsafe { f.call(&[Value::fixnum(1), Value::fixnum(2), Value::fixnum(3)]) };
    assert_eq!(r.to_string(), "(2 3)");
}

#[test]
fn rest_parameter_with_no_excess_is_nil() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda (a . rest) rest)", &mut symbols, &mut compiler);
    let r = unsafe { f.call(&[Value::fixnum(1)]) };
    assert!(r.is_nil());
}

#[test]
fn bare_symbol_parameter_takes_everything() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda args args)", &mut symbols, &mut compiler);
    let r = unsafe { f.call(&[Value::fixnum(1), Value::fixnum(2)]) };
    assert_eq!(r.to_string(), "(1 2)");
    let r = unsafe { f.call(&[]) };
    assert!(r.is_nil());
}

#[test]
fn fixed_parameters_remain_addressable_beside_rest() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda (a . rest) a)", &mut symbols, &mut compiler);
    let r = unsafe { f.call(&[Value::fixnum(10), Value::fixnum(20)]) };
    assert_eq!(r, Value::fixnum(10));
}

#[test]
fn captured_rest_list_survives_into_the_closure() {
    let (mut symbols, mut compiler) = setup();
    let f = compile(
        "(lambda (a . rest) (lambda () rest))",
        &mut symbols,
        &mut compiler,
    );
    let closure = unsafe { f.call(&[Value::fixnum(0), Value::fixnum(8), Value::fixnum(9)]) };
    let r = unsafe { call_closure(closure, &[]) };
    assert_eq!(r.to_string(), "(8 9)");
}

#[test]
fn immediately_applied_lambda() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda (x) ((lambda (y) y) x))", &mut symbols, &mut compiler);
    assert_eq!(unsafe { f.call(&[Value::fixnum(12)]) }, Value::fixnum(12));
}

#[test]
fn top_level_to_closure_is_callable() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda (x) x)", &mut symbols, &mut compiler);
    let closure = f.to_closure();
    assert!(closure.is_closure());
    assert!(closure.as_closure().unwrap().env().is_null());
    assert_eq!(
        unsafe { call_closure(closure, &[Value::fixnum(2)]) },
        Value::fixnum(2)
    );
}
