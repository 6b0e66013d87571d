//! End-to-end tests: read a lambda, compile it, call the native code.

use vesper::{read_str, CompileError, Compiler, SafetyMode, SymbolTable, Value};

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
fn zero_param_constant() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda () 42)", &mut symbols, &mut compiler);
    assert_eq!(unsafe { f.call(&[]) }, Value::fixnum(42));
}

#[test]
fn identity() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda (x) x)", &mut symbols, &mut compiler);
    assert_eq!(unsafe { f.call(&[Value::fixnum(-3)]) }, Value::fixnum(-3));
    assert_eq!(unsafe { f.call(&[Value::TRUE]) }, Value::TRUE);
}

#[test]
fn selects_the_right_parameter() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda (a b) a)", &mut symbols, &mut compiler);
    let r = unsafe { f.call(&[Value::fixnum(1), Value::fixnum(2)]) };
    assert_eq!(r, Value::fixnum(1));

    let g = compile("(lambda (a b) b)", &mut symbols, &mut compiler);
    let r = unsafe { g.call(&[Value::fixnum(1), Value::fixnum(2)]) };
    assert_eq!(r, Value::fixnum(2));
}

#[test]
fn body_returns_the_last_expression() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda () 1 2 3)", &mut symbols, &mut compiler);
    assert_eq!(unsafe { f.call(&[]) }, Value::fixnum(3));
}

#[test]
fn self_evaluating_literals() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda () #t)", &mut symbols, &mut compiler);
    assert_eq!(unsafe { f.call(&[]) }, Value::TRUE);
    let g = compile("(lambda () #\\q)", &mut symbols, &mut compiler);
    assert_eq!(unsafe { g.call(&[]) }, Value::char('q'));
}

#[test]
fn if_takes_the_then_branch_on_true() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda (x) (if x 1 2))", &mut symbols, &mut compiler);
    assert_eq!(unsafe { f.call(&[Value::TRUE]) }, Value::fixnum(1));
}

#[test]
fn if_takes_the_else_branch_only_on_false() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda (x) (if x 1 2))", &mut symbols, &mut compiler);
    assert_eq!(unsafe { f.call(&[Value::FALSE]) }, Value::fixnum(2));
    // everything that is not #f is true, including nil and zero
    assert_eq!(unsafe { f.call(&[Value::NIL]) }, Value::fixnum(1));
    assert_eq!(unsafe { f.call(&[Value::fixnum(0)]) }, Value::fixnum(1));
}

#[test]
fn nested_if() {
    let (mut symbols, mut compiler) = setup();
    let f = compile(
        "(lambda (a b) (if a (if b 1 2) 3))",
        &mut symbols,
        &mut compiler,
    );
    let call = |a, b| unsafe { f.call(&[a, b]) };
    assert_eq!(call(Value::TRUE, Value::TRUE), Value::fixnum(1));
    assert_eq!(call(Value::TRUE, Value::FALSE), Value::fixnum(2));
    assert_eq!(call(Value::FALSE, Value::TRUE), Value::fixnum(3));
}

#[test]
fn quoted_list_is_the_same_object_on_every_call() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda () '(1 2 3))", &mut symbols, &mut compiler);
    let a = unsafe { f.call(&[]) };
    let b = unsafe { f.call(&[]) };
    assert_eq!(a.to_string(), "(1 2 3)");
    // same heap word, not merely equal structure
    assert_eq!(a, b);
}

#[test]
fn separately_compiled_quotes_are_distinct_objects() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda () '(1 2))", &mut symbols, &mut compiler);
    let g = compile("(lambda () '(1 2))", &mut symbols, &mut compiler);
    let a = unsafe { f.call(&[]) };
    let b = unsafe { g.call(&[]) };
    assert_eq!(a.to_string(), b.to_string());
    assert_ne!(a, b);
}

#[test]
fn quoted_heap_data_is_rooted() {
    let (mut symbols, mut compiler) = setup();
    let before = vesper::value::heap::permanent_root_count();
    let _f = compile("(lambda () '(1 2 3))", &mut symbols, &mut compiler);
    assert!(vesper::value::heap::permanent_root_count() > before);
}

#[test]
fn quoted_symbol_evaluates_to_itself() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda () 'foo)", &mut symbols, &mut compiler);
    let foo = symbols.intern("foo");
    assert_eq!(unsafe { f.call(&[]) }, foo);
}

#[test]
fn global_references_load_through_the_cell() {
    let (mut symbols, mut compiler) = setup();
    let g = symbols.intern("g");
    g.as_symbol().unwrap().set_global(Value::fixnum(10));

    let f = compile("(lambda () g)", &mut symbols, &mut compiler);
    assert_eq!(unsafe { f.call(&[]) }, Value::fixnum(10));

    // redefinition after compilation is visible through the same cell
    g.as_symbol().unwrap().set_global(Value::fixnum(11));
    assert_eq!(unsafe { f.call(&[]) }, Value::fixnum(11));
}

#[test]
fn calls_a_closure_bound_to_a_global() {
    let (mut symbols, mut compiler) = setup();
    let id = compile("(lambda (x) x)", &mut symbols, &mut compiler);
    let f_sym = symbols.intern("f");
    f_sym.as_symbol().unwrap().set_global(id.to_closure());

    let caller = compile("(lambda () (f 5))", &mut symbols, &mut compiler);
    assert_eq!(unsafe { caller.call(&[]) }, Value::fixnum(5));
}

#[test]
fn nested_applications_stage_cleanly() {
    let (mut symbols, mut compiler) = setup();
    let second = compile("(lambda (a b) b)", &mut symbols, &mut compiler);
    let nine = compile("(lambda () 9)", &mut symbols, &mut compiler);
    symbols.intern("second").as_symbol().unwrap().set_global(second.to_closure());
    symbols.intern("nine").as_symbol().unwrap().set_global(nine.to_closure());

    let f = compile("(lambda (x) (second x (nine)))", &mut symbols, &mut compiler);
    assert_eq!(unsafe { f.call(&[Value::fixnum(1)]) }, Value::fixnum(9));
}

#[test]
fn unchecked_mode_compiles_and_runs() {
    let mut symbols = SymbolTable::new();
    let mut compiler = Compiler::new(&mut symbols, SafetyMode::Unchecked).unwrap();
    let f = compile("(lambda (x) x)", &mut symbols, &mut compiler);
    assert_eq!(unsafe { f.call(&[Value::fixnum(8)]) }, Value::fixnum(8));
}

#[test]
fn arity_metadata() {
    let (mut symbols, mut compiler) = setup();
    let f = compile("(lambda (a b) a)", &mut symbols, &mut compiler);
    assert_eq!(f.fixed_params(), 2);
    assert!(!f.has_rest());
    let g = compile("(lambda (a . r) r)", &mut symbols, &mut compiler);
    assert_eq!(g.fixed_params(), 1);
    assert!(g.has_rest());
}

#[test]
fn rejects_non_lambda_forms() {
    let (mut symbols, mut compiler) = setup();
    let expr = read_str("(if 1 2 3)", &mut symbols).unwrap();
    assert_eq!(compiler.compile_lambda(expr), Err(CompileError::NotALambda));
    let expr = read_str("42", &mut symbols).unwrap();
    assert_eq!(compiler.compile_lambda(expr), Err(CompileError::NotALambda));
}

#[test]
fn rejects_malformed_lambdas() {
    let (mut symbols, mut compiler) = setup();
    let check = |compiler: &mut Compiler, symbols: &mut SymbolTable, src, err| {
        let expr = read_str(src, symbols).unwrap();
        assert_eq!(compiler.compile_lambda(expr), Err(err));
    };
    check(
        &mut compiler,
        &mut symbols,
        "(lambda ())",
        CompileError::EmptyBody,
    );
    check(
        &mut compiler,
        &mut symbols,
        "(lambda (1) 1)",
        CompileError::MalformedParams,
    );
    check(
        &mut compiler,
        &mut symbols,
        "(lambda (x x) x)",
        CompileError::DuplicateParameter("x".to_string()),
    );
    check(
        &mut compiler,
        &mut symbols,
        "(lambda () (if #t 1))",
        CompileError::MalformedIf,
    );
    check(
        &mut compiler,
        &mut symbols,
        "(lambda () (quote))",
        CompileError::MalformedQuote,
    );
    check(
        &mut compiler,
        &mut symbols,
        "(lambda () (quote 1 2))",
        CompileError::MalformedQuote,
    );
}
