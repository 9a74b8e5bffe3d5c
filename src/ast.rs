// Abstract syntax tree for the spike language.
//
// An AST is owned by its root Program; children are exclusively owned
// by their parent. Shared ownership (`Rc`) is used purely so that
// sub-expressions can be moved into compiler closures without cloning
// the whole tree.

use crate::lexer::Token;
use std::rc::Rc;

pub type Node<T> = Rc<T>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Lte,
    Gte,
    Eq,
    NotEq,
    And,
    Or,
}

impl BinOp {
    pub fn from_literal(literal: &str) -> Option<BinOp> {
        use BinOp::*;
        match literal {
            "+" => Some(Add),
            "-" => Some(Sub),
            "*" => Some(Mul),
            "/" => Some(Div),
            "<" => Some(Lt),
            ">" => Some(Gt),
            "<=" => Some(Lte),
            ">=" => Some(Gte),
            "==" => Some(Eq),
            "!=" => Some(NotEq),
            "&&" => Some(And),
            "||" => Some(Or),
            _ => None,
        }
    }

    pub fn literal(&self) -> &'static str {
        use BinOp::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Lt => "<",
            Gt => ">",
            Lte => "<=",
            Gte => ">=",
            Eq => "==",
            NotEq => "!=",
            And => "&&",
            Or => "||",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnOp {
    Bang,
    Minus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Identifier {
    pub token: Token,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Integer {
        token: Token,
        value: i64,
    },
    Boolean {
        token: Token,
        value: bool,
    },
    StringLiteral {
        token: Token,
        value: String,
    },
    Identifier(Identifier),
    Array {
        token: Token,
        elements: Vec<Expression>,
    },
    Hash {
        token: Token,
        pairs: Vec<(Expression, Expression)>,
    },
    Prefix {
        token: Token,
        operator: UnOp,
        right: Node<Expression>,
    },
    Infix {
        token: Token,
        left: Node<Expression>,
        operator: BinOp,
        right: Node<Expression>,
    },
    If {
        token: Token,
        condition: Node<Expression>,
        then_branch: BlockStatement,
        else_branch: Option<BlockStatement>,
    },
    Index {
        token: Token,
        left: Node<Expression>,
        index: Node<Expression>,
    },
    Function {
        token: Token,
        parameters: Vec<Identifier>,
        body: BlockStatement,
    },
    Call {
        token: Token,
        function: Node<Expression>,
        arguments: Vec<Expression>,
    },
}

impl Expression {
    pub fn token(&self) -> &Token {
        match self {
            Expression::Integer { token, .. }
            | Expression::Boolean { token, .. }
            | Expression::StringLiteral { token, .. }
            | Expression::Array { token, .. }
            | Expression::Hash { token, .. }
            | Expression::Prefix { token, .. }
            | Expression::Infix { token, .. }
            | Expression::If { token, .. }
            | Expression::Index { token, .. }
            | Expression::Function { token, .. }
            | Expression::Call { token, .. } => token,
            Expression::Identifier(identifier) => &identifier.token,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockStatement {
    pub token: Token,
    pub statements: Vec<Statement>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Let {
        token: Token,
        name: Identifier,
        value: Expression,
    },
    Return {
        token: Token,
        value: Expression,
    },
    Expression {
        token: Token,
        expression: Expression,
    },
    Block(BlockStatement),
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}
