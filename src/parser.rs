// Pratt (operator-precedence) parser.
//
// `current`/`peek` hold one token of lookahead each; prefix and infix
// parsing are dispatched by token kind rather than through a
// registry-of-closures, since Rust's borrow checker makes a
// `HashMap<TokenKind, Box<dyn Fn(&mut Self) -> _>>` awkward without
// heap-boxing every parselet for no real benefit here.

use crate::ast::{BinOp, BlockStatement, Expression, Identifier, Program, Statement, UnOp};
use crate::error::{ParseError, ParseResult};
use crate::lexer::{Lexer, Token, TokenKind};

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
enum Precedence {
    Lowest,
    Alternative, // ||
    Conjunction, // &&
    Inequality,  // < > <= >=
    Equals,      // == !=
    Sum,         // + -
    Product,     // * /
    Prefix,      // -x, !x
    Call,        // fn(...)
    Index,       // arr[i]
}

fn precedence_of(kind: &TokenKind) -> Precedence {
    use TokenKind::*;
    match kind {
        Or => Precedence::Alternative,
        And => Precedence::Conjunction,
        Lt | Gt | Lte | Gte => Precedence::Inequality,
        Eq | NotEq => Precedence::Equals,
        Plus | Minus => Precedence::Sum,
        Asterisk | Slash => Precedence::Product,
        LParen => Precedence::Call,
        LBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peek: Token,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Parser<'a> {
        let current = lexer.next_token();
        let peek = lexer.next_token();
        Parser { lexer, current, peek }
    }

    fn advance(&mut self) {
        self.current = std::mem::replace(&mut self.peek, self.lexer.next_token());
    }

    fn expect_peek(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.peek.kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::unexpected(format!("{:?}", kind), &self.peek))
        }
    }

    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        while self.current.kind != TokenKind::Eof {
            statements.push(self.parse_statement()?);
            self.advance();
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.current.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> ParseResult<Statement> {
        let token = self.current.clone();
        self.expect_peek(TokenKind::Identifier)?;
        let name = Identifier { token: self.current.clone(), value: self.current.literal.clone() };
        self.expect_peek(TokenKind::Assign)?;
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek.kind == TokenKind::Semicolon {
            self.advance();
        }
        Ok(Statement::Let { token, name, value })
    }

    fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        let token = self.current.clone();
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek.kind == TokenKind::Semicolon {
            self.advance();
        }
        Ok(Statement::Return { token, value })
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Statement> {
        let token = self.current.clone();
        let expression = self.parse_expression(Precedence::Lowest)?;
        if self.peek.kind == TokenKind::Semicolon {
            self.advance();
        }
        Ok(Statement::Expression { token, expression })
    }

    fn parse_block_statement(&mut self) -> ParseResult<BlockStatement> {
        let token = self.current.clone();
        self.advance();
        let mut statements = Vec::new();
        while self.current.kind != TokenKind::RBrace && self.current.kind != TokenKind::Eof {
            statements.push(self.parse_statement()?);
            self.advance();
        }
        if self.current.kind != TokenKind::RBrace {
            return Err(ParseError::unexpected("}", &self.current));
        }
        Ok(BlockStatement { token, statements })
    }

    fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expression> {
        let mut left = self.parse_prefix()?;
        while self.peek.kind != TokenKind::Semicolon && precedence < precedence_of(&self.peek.kind) {
            match self.peek.kind {
                TokenKind::LParen => {
                    self.advance();
                    left = self.parse_call_expression(left)?;
                }
                TokenKind::LBracket => {
                    self.advance();
                    left = self.parse_index_expression(left)?;
                }
                _ if BinOp::from_literal(&self.peek.literal).is_some() => {
                    self.advance();
                    left = self.parse_infix_expression(left)?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expression> {
        match self.current.kind {
            TokenKind::Identifier => Ok(Expression::Identifier(Identifier {
                token: self.current.clone(),
                value: self.current.literal.clone(),
            })),
            TokenKind::Integer => {
                let token = self.current.clone();
                let value = token
                    .literal
                    .parse::<i64>()
                    .map_err(|_| ParseError::unexpected("integer literal", &token))?;
                Ok(Expression::Integer { token, value })
            }
            TokenKind::Str => Ok(Expression::StringLiteral {
                token: self.current.clone(),
                value: self.current.literal.clone(),
            }),
            TokenKind::True | TokenKind::False => Ok(Expression::Boolean {
                token: self.current.clone(),
                value: self.current.kind == TokenKind::True,
            }),
            TokenKind::Bang => self.parse_prefix_expression(UnOp::Bang),
            TokenKind::Minus => self.parse_prefix_expression(UnOp::Minus),
            TokenKind::LParen => self.parse_grouped_expression(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_hash_literal(),
            TokenKind::If => self.parse_if_expression(),
            TokenKind::Function => self.parse_function_expression(),
            _ => Err(ParseError::NoPrefixParselet(self.current.literal.clone())),
        }
    }

    fn parse_prefix_expression(&mut self, operator: UnOp) -> ParseResult<Expression> {
        let token = self.current.clone();
        self.advance();
        let right = self.parse_expression(Precedence::Prefix)?;
        Ok(Expression::Prefix { token, operator, right: std::rc::Rc::new(right) })
    }

    fn parse_infix_expression(&mut self, left: Expression) -> ParseResult<Expression> {
        let token = self.current.clone();
        let operator = BinOp::from_literal(&token.literal)
            .ok_or_else(|| ParseError::unexpected("infix operator", &token))?;
        let precedence = precedence_of(&self.current.kind);
        self.advance();
        let right = self.parse_expression(precedence)?;
        Ok(Expression::Infix {
            token,
            left: std::rc::Rc::new(left),
            operator,
            right: std::rc::Rc::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> ParseResult<Expression> {
        self.advance();
        let expression = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RParen)?;
        Ok(expression)
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expression> {
        let token = self.current.clone();
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Ok(Expression::Array { token, elements })
    }

    fn parse_hash_literal(&mut self) -> ParseResult<Expression> {
        let token = self.current.clone();
        let mut pairs = Vec::new();
        while self.peek.kind != TokenKind::RBrace {
            self.advance();
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect_peek(TokenKind::Colon)?;
            self.advance();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));
            if self.peek.kind != TokenKind::RBrace {
                self.expect_peek(TokenKind::Comma)?;
            }
        }
        self.expect_peek(TokenKind::RBrace)?;
        Ok(Expression::Hash { token, pairs })
    }

    fn parse_if_expression(&mut self) -> ParseResult<Expression> {
        let token = self.current.clone();
        self.expect_peek(TokenKind::LParen)?;
        self.advance();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RParen)?;
        self.expect_peek(TokenKind::LBrace)?;
        let then_branch = self.parse_block_statement()?;

        let else_branch = if self.peek.kind == TokenKind::Else {
            self.advance();
            self.expect_peek(TokenKind::LBrace)?;
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        Ok(Expression::If { token, condition: std::rc::Rc::new(condition), then_branch, else_branch })
    }

    fn parse_function_expression(&mut self) -> ParseResult<Expression> {
        let token = self.current.clone();
        self.expect_peek(TokenKind::LParen)?;
        let parameters = self.parse_function_parameters()?;
        self.expect_peek(TokenKind::LBrace)?;
        let body = self.parse_block_statement()?;
        Ok(Expression::Function { token, parameters, body })
    }

    fn parse_function_parameters(&mut self) -> ParseResult<Vec<Identifier>> {
        let mut parameters = Vec::new();
        if self.peek.kind == TokenKind::RParen {
            self.advance();
            return Ok(parameters);
        }
        self.advance();
        parameters.push(self.parse_identifier()?);
        while self.peek.kind == TokenKind::Comma {
            self.advance();
            self.advance();
            parameters.push(self.parse_identifier()?);
        }
        self.expect_peek(TokenKind::RParen)?;
        Ok(parameters)
    }

    fn parse_identifier(&mut self) -> ParseResult<Identifier> {
        if self.current.kind != TokenKind::Identifier {
            return Err(ParseError::ExpectedIdentifier(self.current.literal.clone()));
        }
        Ok(Identifier { token: self.current.clone(), value: self.current.literal.clone() })
    }

    fn parse_call_expression(&mut self, function: Expression) -> ParseResult<Expression> {
        let token = self.current.clone();
        let arguments = self.parse_expression_list(TokenKind::RParen)?;
        Ok(Expression::Call { token, function: std::rc::Rc::new(function), arguments })
    }

    fn parse_index_expression(&mut self, left: Expression) -> ParseResult<Expression> {
        let token = self.current.clone();
        self.advance();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RBracket)?;
        Ok(Expression::Index { token, left: std::rc::Rc::new(left), index: std::rc::Rc::new(index) })
    }

    // Shared by array literals and call arguments: comma-separated
    // expressions terminated by `closing`.
    fn parse_expression_list(&mut self, closing: TokenKind) -> ParseResult<Vec<Expression>> {
        let mut items = Vec::new();
        if self.peek.kind == closing {
            self.advance();
            return Ok(items);
        }
        self.advance();
        items.push(self.parse_expression(Precedence::Lowest)?);
        while self.peek.kind == TokenKind::Comma {
            self.advance();
            self.advance();
            items.push(self.parse_expression(Precedence::Lowest)?);
        }
        self.expect_peek(closing)?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Program {
        Parser::new(Lexer::new(source)).parse_program().unwrap()
    }

    #[test]
    fn test_let_statements() {
        let program = parse("let x = 5; let y = true; let z = x;");
        assert_eq!(program.statements.len(), 3);
        match &program.statements[0] {
            Statement::Let { name, value, .. } => {
                assert_eq!(name.value, "x");
                assert_eq!(*value, Expression::Integer { token: name.token.clone(), value: 5 });
            }
            other => panic!("expected Let, got {:?}", other),
        }
    }

    #[test]
    fn test_return_statement() {
        let program = parse("return 10;");
        match &program.statements[0] {
            Statement::Return { value, .. } => match value {
                Expression::Integer { value, .. } => assert_eq!(*value, 10),
                other => panic!("expected Integer, got {:?}", other),
            },
            other => panic!("expected Return, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_precedence() {
        let cases = vec![
            ("-a * b", "((-a) * b)"),
            ("a + b + c", "((a + b) + c)"),
            ("a + b - c", "((a + b) - c)"),
            ("a * b * c", "((a * b) * c)"),
            ("a + b * c", "(a + (b * c))"),
            ("a < b == true", "((a < b) == true)"),
            ("1 + (2 + 3) + 4", "((1 + (2 + 3)) + 4)"),
            ("a + b * c + d / e - f", "(((a + (b * c)) + (d / e)) - f)"),
            ("a && b || c", "((a && b) || c)"),
            ("a + b(c, d)", "(a + b(c, d))"),
            ("a * [1, 2, 3, 4][b * c] * d", "((a * ([1, 2, 3, 4][(b * c)])) * d)"),
        ];
        for (input, expected) in cases {
            let program = parse(input);
            assert_eq!(render(&program.statements[0]), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_if_expression() {
        let program = parse("if (x < y) { x } else { y }");
        match &program.statements[0] {
            Statement::Expression { expression: Expression::If { then_branch, else_branch, .. }, .. } => {
                assert_eq!(then_branch.statements.len(), 1);
                assert!(else_branch.is_some());
            }
            other => panic!("expected If expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_function_literal_parameters() {
        let program = parse("fn(x, y, z) {};");
        match &program.statements[0] {
            Statement::Expression { expression: Expression::Function { parameters, .. }, .. } => {
                let names: Vec<&str> = parameters.iter().map(|p| p.value.as_str()).collect();
                assert_eq!(names, vec!["x", "y", "z"]);
            }
            other => panic!("expected Function expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_call_expression_arguments() {
        let program = parse("add(1, 2 * 3, 4 + 5);");
        match &program.statements[0] {
            Statement::Expression { expression: Expression::Call { arguments, .. }, .. } => {
                assert_eq!(arguments.len(), 3);
            }
            other => panic!("expected Call expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_prefix_parselet_errors() {
        let result = Parser::new(Lexer::new(");")).parse_program();
        assert!(result.is_err());
    }

    // Minimal re-stringification used only to assert operator
    // precedence groupings read the way they were parsed.
    fn render(statement: &Statement) -> String {
        match statement {
            Statement::Expression { expression, .. } => render_expr(expression),
            _ => unreachable!("precedence cases are all expression statements"),
        }
    }

    fn render_expr(expression: &Expression) -> String {
        match expression {
            Expression::Identifier(identifier) => identifier.value.clone(),
            Expression::Integer { value, .. } => value.to_string(),
            Expression::Boolean { value, .. } => value.to_string(),
            Expression::StringLiteral { value, .. } => value.clone(),
            Expression::Prefix { operator, right, .. } => {
                let op = match operator {
                    UnOp::Bang => "!",
                    UnOp::Minus => "-",
                };
                format!("({}{})", op, render_expr(right))
            }
            Expression::Infix { left, operator, right, .. } => {
                format!("({} {} {})", render_expr(left), operator.literal(), render_expr(right))
            }
            Expression::Call { function, arguments, .. } => {
                let args: Vec<String> = arguments.iter().map(render_expr).collect();
                format!("{}({})", render_expr(function), args.join(", "))
            }
            Expression::Index { left, index, .. } => {
                format!("({}[{}])", render_expr(left), render_expr(index))
            }
            Expression::Array { elements, .. } => {
                let items: Vec<String> = elements.iter().map(render_expr).collect();
                format!("[{}]", items.join(", "))
            }
            other => format!("{:?}", other),
        }
    }
}
