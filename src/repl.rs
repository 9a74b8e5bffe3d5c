// Interactive prompt. Persists the symbol table, constant pool, and
// global slots across lines so a `let` on one line is visible on the
// next.

use crate::ast::Statement;
use crate::compiler::Compiler;
use crate::lexer::Lexer;
use crate::object::Object;
use crate::parser::Parser;
use crate::symbol_table::SymbolTable;
use crate::vm::VM;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = ">> ";

pub fn start() -> rustyline::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut symbol_table = SymbolTable::new();
    for (index, (name, _)) in crate::builtins::BUILTINS.iter().enumerate() {
        symbol_table.define_builtin(index, name);
    }
    let mut constants: Vec<Object> = Vec::new();
    let mut globals: Vec<Object> = vec![Object::Null; 65536];

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                run_line(&line, &mut symbol_table, &mut constants, &mut globals);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

fn run_line(line: &str, symbol_table: &mut SymbolTable, constants: &mut Vec<Object>, globals: &mut Vec<Object>) {
    let program = match Parser::new(Lexer::new(line)).parse_program() {
        Ok(program) => program,
        Err(err) => {
            eprintln!("parse error: {}", err);
            return;
        }
    };

    // A bare `let`/`return` leaves no trailing `Pop` behind, so
    // `last_popped()` would just report whatever value was last pushed
    // (e.g. the `let`'s RHS) rather than a fresh result worth echoing.
    let prints_value = matches!(program.statements.last(), Some(Statement::Expression { .. }));

    let table = std::mem::replace(symbol_table, SymbolTable::new());
    let mut compiler = Compiler::new_with_state(table, constants.clone());
    let bytecode = match compiler.compile_repl_line(&program) {
        Ok(bytecode) => bytecode,
        Err(err) => {
            let (table, _) = compiler.into_state();
            *symbol_table = table;
            eprintln!("compile error: {}", err);
            return;
        }
    };
    let (table, new_constants) = compiler.into_state();
    *symbol_table = table;
    *constants = new_constants;

    let mut vm = VM::with_globals(bytecode, std::mem::take(globals));
    match vm.run() {
        Ok(()) => {
            let result = vm.last_popped().clone();
            *globals = vm.into_globals();
            if prints_value {
                println!("{}", result.inspect());
            }
        }
        Err(err) => {
            *globals = vm.into_globals();
            eprintln!("runtime error: {}", err);
        }
    }
}
