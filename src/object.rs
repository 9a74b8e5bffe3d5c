// Runtime object model.
//
// Values are a tagged variant (no virtual-class hierarchy), shared via
// `Rc` for the `Str`/`Array`/`Hash`/`CompiledFunction`/`Closure`
// variants. No cycles are constructable by spike programs, so plain
// reference counting is sufficient.

use crate::code::Instructions;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Integer,
    Boolean,
    Str,
    Null,
    Array,
    Hash,
    CompiledFunction,
    Closure,
    BuiltinFunction,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::Integer => "integer",
            ObjectType::Boolean => "boolean",
            ObjectType::Str => "string",
            ObjectType::Null => "null",
            ObjectType::Array => "array",
            ObjectType::Hash => "hash",
            ObjectType::CompiledFunction => "compiledFunction",
            ObjectType::Closure => "closure",
            ObjectType::BuiltinFunction => "builtinFunction",
        };
        write!(f, "{}", name)
    }
}

// Structural hash key: (type_tag, 64-bit value). Equal values of the
// same type produce equal keys; the type tag rules out cross-type
// collisions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub object_type: ObjectType,
    pub value: u64,
}

// FNV-1a, used to fold string bytes into a HashKey value.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    pub locals_count: usize,
    pub parameters_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Closure {
    pub function: Rc<CompiledFunction>,
    pub free_variables: Vec<Object>,
}

pub type BuiltinFn = fn(&[Object]) -> crate::error::RuntimeResult<Object>;

#[derive(Clone, PartialEq)]
pub struct BuiltinFunction {
    pub name: &'static str,
    pub function: BuiltinFn,
}

impl fmt::Debug for BuiltinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuiltinFunction({})", self.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    Str(Rc<String>),
    Null,
    Array(Rc<Vec<Object>>),
    Hash(Rc<HashMap<HashKey, (Object, Object)>>),
    CompiledFunction(Rc<CompiledFunction>),
    Closure(Rc<Closure>),
    Builtin(Rc<BuiltinFunction>),
}

impl Object {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::Integer(_) => ObjectType::Integer,
            Object::Boolean(_) => ObjectType::Boolean,
            Object::Str(_) => ObjectType::Str,
            Object::Null => ObjectType::Null,
            Object::Array(_) => ObjectType::Array,
            Object::Hash(_) => ObjectType::Hash,
            Object::CompiledFunction(_) => ObjectType::CompiledFunction,
            Object::Closure(_) => ObjectType::Closure,
            Object::Builtin(_) => ObjectType::BuiltinFunction,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Object::Boolean(b) => *b,
            Object::Null => false,
            _ => true,
        }
    }

    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Object::Integer(v) => Some(HashKey { object_type: ObjectType::Integer, value: *v as u64 }),
            Object::Boolean(v) => Some(HashKey { object_type: ObjectType::Boolean, value: *v as u64 }),
            Object::Str(v) => Some(HashKey { object_type: ObjectType::Str, value: fnv1a(v.as_bytes()) }),
            _ => None,
        }
    }

    // Structural equality used by Equal/NotEqual. Only called on
    // operands of matching Type() by the VM.
    pub fn structural_eq(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Str(a), Object::Str(b)) => a == b,
            (Object::Null, Object::Null) => true,
            (Object::Array(a), Object::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.structural_eq(y))
            }
            (Object::Hash(a), Object::Hash(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, (_, v))| {
                        b.get(k).map(|(_, bv)| v.structural_eq(bv)).unwrap_or(false)
                    })
            }
            _ => false,
        }
    }

    pub fn inspect(&self) -> String {
        match self {
            Object::Integer(v) => v.to_string(),
            Object::Boolean(v) => v.to_string(),
            Object::Str(v) => format!("\"{}\"", v),
            Object::Null => "null".to_string(),
            Object::Array(items) => {
                let rendered: Vec<String> = items.iter().map(Object::inspect).collect();
                format!("[{}]", rendered.join(", "))
            }
            Object::Hash(pairs) => {
                let rendered: Vec<String> = pairs
                    .values()
                    .map(|(k, v)| format!("{}: {}", k.inspect(), v.inspect()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            Object::CompiledFunction(_) => "CompiledFunction[..]".to_string(),
            Object::Closure(_) => "Closure[..]".to_string(),
            Object::Builtin(b) => format!("Builtin[{}]", b.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_key_equal_values_equal_keys() {
        let a = Object::Str(Rc::new("hello".to_string()));
        let b = Object::Str(Rc::new("hello".to_string()));
        assert_eq!(a.hash_key(), b.hash_key());
    }

    #[test]
    fn test_hash_key_distinguishes_types() {
        let int_one = Object::Integer(1).hash_key().unwrap();
        let bool_true = Object::Boolean(true).hash_key().unwrap();
        assert_ne!(int_one, bool_true);
    }

    #[test]
    fn test_structural_eq_arrays() {
        let a = Object::Array(Rc::new(vec![Object::Integer(1), Object::Integer(2)]));
        let b = Object::Array(Rc::new(vec![Object::Integer(1), Object::Integer(2)]));
        assert!(a.structural_eq(&b));
    }

    #[test]
    fn test_inspect_forms() {
        assert_eq!(Object::Integer(5).inspect(), "5");
        assert_eq!(Object::Boolean(true).inspect(), "true");
        assert_eq!(Object::Null.inspect(), "null");
        assert_eq!(Object::Str(Rc::new("hi".to_string())).inspect(), "\"hi\"");
    }
}
