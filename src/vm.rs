// Stack-based virtual machine.
//
// A fixed-size operand stack and frame stack: preallocated storage,
// bounds-checked push/pop, explicit program counter. Each call gets
// its own frame with a per-frame instruction pointer into that
// closure's instruction buffer.

use crate::builtins;
use crate::code::{self, Opcode};
use crate::compiler::Bytecode;
use crate::error::{RuntimeError, RuntimeResult};
use crate::object::{Closure, CompiledFunction, HashKey, Object};
use log::{debug, trace};
use std::collections::HashMap;
use std::rc::Rc;

const STACK_SIZE: usize = 2048;
const GLOBALS_SIZE: usize = 65536;
const MAX_FRAMES: usize = 1024;

struct Frame {
    closure: Rc<Closure>,
    ip: isize,
    base_pointer: usize,
}

impl Frame {
    fn new(closure: Rc<Closure>, base_pointer: usize) -> Frame {
        Frame { closure, ip: -1, base_pointer }
    }

    fn instructions(&self) -> &code::Instructions {
        &self.closure.function.instructions
    }
}

pub struct VM {
    constants: Vec<Object>,
    stack: Vec<Object>,
    sp: usize,
    globals: Vec<Object>,
    frames: Vec<Frame>,
}

impl VM {
    pub fn new(bytecode: Bytecode) -> VM {
        VM::with_globals(bytecode, vec![Object::Null; GLOBALS_SIZE])
    }

    // REPL continuation: reuse the prior run's global slots.
    pub fn with_globals(bytecode: Bytecode, globals: Vec<Object>) -> VM {
        let main_function = Rc::new(CompiledFunction {
            instructions: bytecode.instructions,
            locals_count: 0,
            parameters_count: 0,
        });
        let main_closure = Rc::new(Closure { function: main_function, free_variables: Vec::new() });
        VM {
            constants: bytecode.constants,
            stack: vec![Object::Null; STACK_SIZE],
            sp: 0,
            globals,
            frames: vec![Frame::new(main_closure, 0)],
        }
    }

    pub fn into_globals(self) -> Vec<Object> {
        self.globals
    }

    // The value most recently removed by `Pop`; what a REPL prints.
    pub fn last_popped(&self) -> &Object {
        &self.stack[self.sp]
    }

    pub fn run(&mut self) -> RuntimeResult<()> {
        debug!("vm run starting, {} globals in use", self.globals.iter().filter(|g| !matches!(g, Object::Null)).count());
        let result = self.run_loop();
        debug!("vm run finished: {}", if result.is_ok() { "ok" } else { "error" });
        result
    }

    fn run_loop(&mut self) -> RuntimeResult<()> {
        while self.current_frame().ip < (self.current_frame().instructions().len() as isize) - 1 {
            self.current_frame_mut().ip += 1;
            let ip = self.current_frame().ip as usize;
            let (opcode, width) = code::decode(self.current_frame().instructions(), ip);
            trace!("{:04} {}", ip, opcode.name());
            self.current_frame_mut().ip += (width - 1) as isize;
            self.execute(opcode)?;
        }
        Ok(())
    }

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("frame stack is never empty")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("frame stack is never empty")
    }

    fn push_frame(&mut self, frame: Frame) -> RuntimeResult<()> {
        if self.frames.len() == MAX_FRAMES {
            return Err(RuntimeError::FrameOverflow);
        }
        self.frames.push(frame);
        Ok(())
    }

    fn pop_frame(&mut self) -> Frame {
        self.frames.pop().expect("pop_frame on empty frame stack")
    }

    fn push(&mut self, object: Object) -> RuntimeResult<()> {
        if self.sp == STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack[self.sp] = object;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Object {
        let object = self.stack[self.sp - 1].clone();
        self.sp -= 1;
        object
    }

    fn execute(&mut self, opcode: Opcode) -> RuntimeResult<()> {
        match opcode {
            Opcode::Constant(idx) => {
                let constant = self.constants[idx as usize].clone();
                self.push(constant)?;
            }
            Opcode::Add => self.execute_add()?,
            Opcode::Sub => self.execute_integer_binary("-", |a, b| Ok(Object::Integer(a.wrapping_sub(b))))?,
            Opcode::Mul => self.execute_integer_binary("*", |a, b| Ok(Object::Integer(a.wrapping_mul(b))))?,
            Opcode::Div => self.execute_integer_binary("/", |a, b| {
                if b == 0 {
                    Err(RuntimeError::DivisionByZero)
                } else {
                    Ok(Object::Integer(a / b))
                }
            })?,
            Opcode::Equal => self.execute_comparison(|a, b| a.structural_eq(b))?,
            Opcode::NotEqual => self.execute_comparison(|a, b| !a.structural_eq(b))?,
            Opcode::GreaterThan => self.execute_greater_than()?,
            Opcode::Minus => self.execute_minus()?,
            Opcode::Bang => self.execute_bang()?,
            Opcode::True => self.push(Object::Boolean(true))?,
            Opcode::False => self.push(Object::Boolean(false))?,
            Opcode::Null => self.push(Object::Null)?,
            Opcode::Pop => { self.pop(); }
            Opcode::JumpNotTrue(target) => {
                let condition = self.pop();
                let truthy = match condition {
                    Object::Boolean(b) => b,
                    other => return Err(RuntimeError::UnsupportedArgument("if condition", other.object_type())),
                };
                if !truthy {
                    self.current_frame_mut().ip = target as isize - 1;
                }
            }
            Opcode::Jump(target) => {
                self.current_frame_mut().ip = target as isize - 1;
            }
            Opcode::SetGlobal(idx) => {
                let value = self.pop();
                self.globals[idx as usize] = value;
            }
            Opcode::GetGlobal(idx) => {
                let value = self.globals[idx as usize].clone();
                self.push(value)?;
            }
            Opcode::SetLocal(idx) => {
                let base = self.current_frame().base_pointer;
                let value = self.pop();
                self.stack[base + idx as usize] = value;
            }
            Opcode::GetLocal(idx) => {
                let base = self.current_frame().base_pointer;
                let value = self.stack[base + idx as usize].clone();
                self.push(value)?;
            }
            Opcode::Array(n) => self.execute_array(n as usize)?,
            Opcode::Hash(n) => self.execute_hash(n as usize)?,
            Opcode::Index => self.execute_index()?,
            Opcode::Call(n) => self.execute_call(n as usize)?,
            Opcode::ReturnValue => self.execute_return_value()?,
            Opcode::Return => self.execute_return_null()?,
            Opcode::GetBuiltin(idx) => {
                self.push(Object::Builtin(builtins::get(idx as usize)))?;
            }
            Opcode::Closure(const_idx, free_count) => self.execute_closure(const_idx, free_count as usize)?,
            Opcode::GetFreeVar(idx) => {
                let value = self.current_frame().closure.free_variables[idx as usize].clone();
                self.push(value)?;
            }
        }
        Ok(())
    }

    fn execute_add(&mut self) -> RuntimeResult<()> {
        let right = self.pop();
        let left = self.pop();
        match (&left, &right) {
            (Object::Integer(a), Object::Integer(b)) => self.push(Object::Integer(a.wrapping_add(*b))),
            (Object::Str(a), Object::Str(b)) => {
                self.push(Object::Str(Rc::new(format!("{}{}", a, b))))
            }
            _ => Err(RuntimeError::InfixTypeMismatch(left.object_type(), "+", right.object_type())),
        }
    }

    fn execute_integer_binary(
        &mut self,
        operator: &'static str,
        op: impl Fn(i64, i64) -> RuntimeResult<Object>,
    ) -> RuntimeResult<()> {
        let right = self.pop();
        let left = self.pop();
        match (&left, &right) {
            (Object::Integer(a), Object::Integer(b)) => {
                let result = op(*a, *b)?;
                self.push(result)
            }
            _ => Err(RuntimeError::InfixTypeMismatch(left.object_type(), operator, right.object_type())),
        }
    }

    fn execute_comparison(&mut self, cmp: impl Fn(&Object, &Object) -> bool) -> RuntimeResult<()> {
        let right = self.pop();
        let left = self.pop();
        if left.object_type() != right.object_type() {
            return Err(RuntimeError::TypeMismatch(left.object_type(), right.object_type()));
        }
        self.push(Object::Boolean(cmp(&left, &right)))
    }

    fn execute_greater_than(&mut self) -> RuntimeResult<()> {
        let right = self.pop();
        let left = self.pop();
        match (&left, &right) {
            (Object::Integer(a), Object::Integer(b)) => self.push(Object::Boolean(a > b)),
            _ => Err(RuntimeError::InfixTypeMismatch(left.object_type(), ">", right.object_type())),
        }
    }

    fn execute_minus(&mut self) -> RuntimeResult<()> {
        match self.pop() {
            Object::Integer(v) => self.push(Object::Integer(v.wrapping_neg())),
            other => Err(RuntimeError::UnsupportedArgument("-", other.object_type())),
        }
    }

    fn execute_bang(&mut self) -> RuntimeResult<()> {
        let value = self.pop();
        self.push(Object::Boolean(!value.is_truthy()))
    }

    fn execute_array(&mut self, n: usize) -> RuntimeResult<()> {
        let start = self.sp - n;
        let elements = self.stack[start..self.sp].to_vec();
        self.sp = start;
        self.push(Object::Array(Rc::new(elements)))
    }

    fn execute_hash(&mut self, n: usize) -> RuntimeResult<()> {
        let start = self.sp - n;
        let mut pairs = HashMap::new();
        let mut i = start;
        while i < self.sp {
            let key = self.stack[i].clone();
            let value = self.stack[i + 1].clone();
            let hash_key = key.hash_key().ok_or_else(|| RuntimeError::NotHashable(key.object_type()))?;
            pairs.insert(hash_key, (key, value));
            i += 2;
        }
        self.sp = start;
        self.push(Object::Hash(Rc::new(pairs)))
    }

    fn execute_index(&mut self) -> RuntimeResult<()> {
        let index = self.pop();
        let container = self.pop();
        match (&container, &index) {
            (Object::Array(items), Object::Integer(i)) => {
                if *i < 0 || *i as usize >= items.len() {
                    self.push(Object::Null)
                } else {
                    self.push(items[*i as usize].clone())
                }
            }
            (Object::Array(_), _) => Err(RuntimeError::IndexNotInteger),
            (Object::Hash(pairs), _) => {
                let key = index.hash_key().ok_or_else(|| RuntimeError::NotHashable(index.object_type()))?;
                match pairs.get(&key) {
                    Some((_, value)) => self.push(value.clone()),
                    None => self.push(Object::Null),
                }
            }
            _ => Err(RuntimeError::IndexNotSupported(container.object_type())),
        }
    }

    fn execute_call(&mut self, n: usize) -> RuntimeResult<()> {
        let callee = self.stack[self.sp - 1 - n].clone();
        match callee {
            Object::Closure(closure) => self.call_closure(closure, n),
            Object::Builtin(builtin) => self.call_builtin(builtin, n),
            _ => Err(RuntimeError::CallingNonFunction),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, n: usize) -> RuntimeResult<()> {
        if n != closure.function.parameters_count {
            return Err(RuntimeError::ArityMismatch { expected: closure.function.parameters_count, got: n });
        }
        let base_pointer = self.sp - n;
        let locals_count = closure.function.locals_count;
        self.push_frame(Frame::new(closure, base_pointer))?;
        self.sp = base_pointer + locals_count;
        Ok(())
    }

    fn call_builtin(&mut self, builtin: Rc<crate::object::BuiltinFunction>, n: usize) -> RuntimeResult<()> {
        let args = self.stack[self.sp - n..self.sp].to_vec();
        let result = (builtin.function)(&args)?;
        self.sp = self.sp - n - 1;
        self.push(result)
    }

    fn execute_return_value(&mut self) -> RuntimeResult<()> {
        let value = self.pop();
        let frame = self.pop_frame();
        self.sp = frame.base_pointer - 1;
        self.push(value)
    }

    fn execute_return_null(&mut self) -> RuntimeResult<()> {
        let frame = self.pop_frame();
        self.sp = frame.base_pointer - 1;
        self.push(Object::Null)
    }

    fn execute_closure(&mut self, const_idx: u16, free_count: usize) -> RuntimeResult<()> {
        let function = match &self.constants[const_idx as usize] {
            Object::CompiledFunction(function) => function.clone(),
            other => panic!("OpClosure constant index does not point at a CompiledFunction: {:?}", other),
        };
        let start = self.sp - free_count;
        let free_variables = self.stack[start..self.sp].to_vec();
        self.sp = start;
        self.push(Object::Closure(Rc::new(Closure { function, free_variables })))
    }
}
