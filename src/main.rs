// spike: a small dynamically-typed expression language with a
// bytecode compiler and stack VM.
//
// Copyright (C) 2019  Brandon Lewis
//
// This program is free software: you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public License
// as published by the Free Software Foundation, either version 3 of
// the License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this program.  If not, see
// <https://www.gnu.org/licenses/>.

use clap::Parser as ClapParser;
use spike::compiler::Compiler;
use spike::lexer::Lexer;
use spike::parser::Parser;
use spike::vm::VM;
use std::fs;
use std::process::ExitCode;

#[derive(ClapParser)]
#[command(name = "spike", about = "A small dynamically-typed expression language")]
struct Cli {
    /// Source file to run. Omit to start the interactive REPL.
    file: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.file {
        Some(path) => run_file(&path),
        None => match spike::repl::start() {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{}", err);
                ExitCode::FAILURE
            }
        },
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{}: {}", path, err);
            return ExitCode::FAILURE;
        }
    };

    let program = match Parser::new(Lexer::new(&source)).parse_program() {
        Ok(program) => program,
        Err(err) => {
            eprintln!("parse error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let bytecode = match Compiler::new().compile(&program) {
        Ok(bytecode) => bytecode,
        Err(err) => {
            eprintln!("compile error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut vm = VM::new(bytecode);
    match vm.run() {
        Ok(()) => {
            println!("{}", vm.last_popped().inspect());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("runtime error: {}", err);
            ExitCode::FAILURE
        }
    }
}
