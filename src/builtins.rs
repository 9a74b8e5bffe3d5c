// Built-in functions, resolved at compile time via `SymbolTable::define_builtin`
// and invoked at runtime through `Opcode::GetBuiltin` + `Opcode::Call`.
// Order here fixes the `GetBuiltin` index space, so it must never
// change once a program can reference index N.

use crate::error::{RuntimeError, RuntimeResult};
use crate::object::{BuiltinFunction, Object};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::rc::Rc;

thread_local! {
    // Whitespace-delimited tokens read ahead of need, mirroring `fmt.Scan`'s
    // tokenization but without re-reading already-consumed input.
    static READ_BUFFER: RefCell<VecDeque<String>> = RefCell::new(VecDeque::new());
}

fn builtin_len(args: &[Object]) -> RuntimeResult<Object> {
    if args.len() != 1 {
        return Err(RuntimeError::BuiltinArity);
    }
    match &args[0] {
        Object::Str(s) => Ok(Object::Integer(s.len() as i64)),
        Object::Array(items) => Ok(Object::Integer(items.len() as i64)),
        other => Err(RuntimeError::UnsupportedArgument("len", other.object_type())),
    }
}

fn builtin_print(args: &[Object]) -> RuntimeResult<Object> {
    if args.len() != 1 {
        return Err(RuntimeError::BuiltinArity);
    }
    match &args[0] {
        Object::Str(s) => {
            print!("{}", s);
            let _ = std::io::stdout().flush();
            Ok(Object::Null)
        }
        other => Err(RuntimeError::UnsupportedArgument("print", other.object_type())),
    }
}

fn builtin_read(args: &[Object]) -> RuntimeResult<Object> {
    if !args.is_empty() {
        return Err(RuntimeError::BuiltinArity);
    }
    READ_BUFFER.with(|buffer| {
        loop {
            if let Some(token) = buffer.borrow_mut().pop_front() {
                return Ok(Object::Str(Rc::new(token)));
            }
            let mut line = String::new();
            match std::io::stdin().read_line(&mut line) {
                Ok(0) => return Ok(Object::Null),
                Ok(_) => {
                    buffer.borrow_mut().extend(line.split_whitespace().map(str::to_string));
                }
                Err(_) => return Ok(Object::Null),
            }
        }
    })
}

// Fixed name/function table, indexed by `Opcode::GetBuiltin`.
pub const BUILTINS: &[(&str, crate::object::BuiltinFn)] = &[
    ("len", builtin_len),
    ("print", builtin_print),
    ("read", builtin_read),
];

pub fn lookup(name: &str) -> Option<usize> {
    BUILTINS.iter().position(|(n, _)| *n == name)
}

pub fn get(index: usize) -> Rc<BuiltinFunction> {
    let (name, function) = BUILTINS[index];
    Rc::new(BuiltinFunction { name, function })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_string() {
        let result = builtin_len(&[Object::Str(Rc::new("hello".to_string()))]).unwrap();
        assert_eq!(result, Object::Integer(5));
    }

    #[test]
    fn test_len_array() {
        let result = builtin_len(&[Object::Array(Rc::new(vec![Object::Integer(1), Object::Integer(2)]))]).unwrap();
        assert_eq!(result, Object::Integer(2));
    }

    #[test]
    fn test_len_wrong_arity() {
        assert_eq!(builtin_len(&[]), Err(RuntimeError::BuiltinArity));
    }

    #[test]
    fn test_lookup_matches_table_order() {
        assert_eq!(lookup("len"), Some(0));
        assert_eq!(lookup("print"), Some(1));
        assert_eq!(lookup("read"), Some(2));
        assert_eq!(lookup("nope"), None);
    }
}
