// Whole-pipeline scenarios: source text in, last-popped VM value out.

use spike::compiler::Compiler;
use spike::error::RuntimeError;
use spike::lexer::Lexer;
use spike::object::Object;
use spike::parser::Parser;
use spike::vm::VM;
use std::rc::Rc;

fn run(source: &str) -> Result<Object, String> {
    let program = Parser::new(Lexer::new(source))
        .parse_program()
        .map_err(|e| e.to_string())?;
    let bytecode = Compiler::new().compile(&program).map_err(|e| e.to_string())?;
    let mut vm = VM::new(bytecode);
    vm.run().map_err(|e| e.to_string())?;
    Ok(vm.last_popped().clone())
}

fn run_err(source: &str) -> RuntimeError {
    let program = Parser::new(Lexer::new(source)).parse_program().unwrap();
    let bytecode = Compiler::new().compile(&program).unwrap();
    let mut vm = VM::new(bytecode);
    vm.run().unwrap_err()
}

#[test]
fn scenario_01_integer_addition() {
    assert_eq!(run("1 + 2").unwrap(), Object::Integer(3));
}

#[test]
fn scenario_02_arithmetic_precedence_and_parens() {
    assert_eq!(run("100 / (5 - 6) * 2").unwrap(), Object::Integer(-200));
}

#[test]
fn scenario_03_if_without_else_is_null() {
    assert_eq!(run("if (false) { 10 };").unwrap(), Object::Null);
}

#[test]
fn scenario_04_global_let_bindings() {
    assert_eq!(run("let one = 1; let two = one + one; one + two;").unwrap(), Object::Integer(3));
}

#[test]
fn scenario_05_string_concatenation() {
    assert_eq!(
        run(r#""spike " + "language""#).unwrap(),
        Object::Str(Rc::new("spike language".to_string()))
    );
}

#[test]
fn scenario_06_array_index() {
    assert_eq!(run("[1, 2, 3][1 + 1]").unwrap(), Object::Integer(3));
}

#[test]
fn scenario_07_hash_index_present_and_missing() {
    assert_eq!(
        run(r#"{"name": "kenny", "age": 31}["age"]"#).unwrap(),
        Object::Integer(31)
    );
    assert_eq!(
        run(r#"{"name": "kenny", "age": 31}["surname"]"#).unwrap(),
        Object::Null
    );
}

#[test]
fn scenario_08_function_call_with_arguments() {
    assert_eq!(
        run("let f = fn(a, b) { a + b }; f(555, 222);").unwrap(),
        Object::Integer(777)
    );
}

#[test]
fn scenario_09_arity_mismatch_is_runtime_error() {
    assert_eq!(
        run_err("let f = fn(a) { a }; f(1, 2)"),
        RuntimeError::ArityMismatch { expected: 1, got: 2 }
    );
}

#[test]
fn scenario_10_globals_and_nested_calls() {
    let source = "let g = 10; \
                   let a = fn() { let i = 1; i + g }; \
                   let b = fn() { let i = 2; a() + i }; \
                   g + b();";
    assert_eq!(run(source).unwrap(), Object::Integer(23));
}

#[test]
fn scenario_11_len_builtin_on_array_and_string() {
    assert_eq!(run("len([1, 2, 3, 4])").unwrap(), Object::Integer(4));
    assert_eq!(run(r#"len("abc")"#).unwrap(), Object::Integer(3));
}

#[test]
fn scenario_12_closure_captures_free_variable() {
    let source = "let newAdder = fn(x) { fn(y) { x + y } }; let addTwo = newAdder(2); addTwo(3);";
    assert_eq!(run(source).unwrap(), Object::Integer(5));
}

#[test]
fn scenario_13_logical_and_or_short_circuit() {
    assert_eq!(run("true && false").unwrap(), Object::Boolean(false));
    assert_eq!(run("false || true").unwrap(), Object::Boolean(true));
    assert_eq!(run("1 < 2 && 3 > 2").unwrap(), Object::Boolean(true));
}
