// Peek-and-consume tokenizer for the spike language.
//
// Identifiers are `[A-Za-z][A-Za-z0-9]*`, integers are `[0-9]+`, string
// literals are `"..."` with no escapes and no embedded quotes.
// Two-character operators are matched before falling back to their
// one-character prefix.

use std::iter::Peekable;
use std::str::Chars;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Integer,
    Str,

    Assign,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Bang,

    Lt,
    Gt,
    Lte,
    Gte,
    Eq,
    NotEq,
    And,
    Or,

    Comma,
    Semicolon,
    Colon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Let,
    Return,
    If,
    Else,
    True,
    False,
    Function,

    Eof,
    Invalid,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
}

impl Token {
    fn new(kind: TokenKind, literal: impl Into<String>) -> Token {
        Token { kind, literal: literal.into() }
    }
}

fn lookup_keyword(word: &str) -> Option<TokenKind> {
    use TokenKind::*;
    match word {
        "let" => Some(Let),
        "return" => Some(Return),
        "if" => Some(If),
        "else" => Some(Else),
        "true" => Some(True),
        "false" => Some(False),
        "fn" => Some(Function),
        _ => None,
    }
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer { chars: source.chars().peekable() }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_while<F: Fn(char) -> bool>(&mut self, first: char, pred: F) -> String {
        let mut out = String::new();
        out.push(first);
        while let Some(c) = self.peek() {
            if pred(c) {
                out.push(c);
                self.advance();
            } else {
                break;
            }
        }
        out
    }

    fn read_string(&mut self) -> Token {
        let mut out = String::new();
        loop {
            match self.advance() {
                Some('"') | None => break,
                Some(c) => out.push(c),
            }
        }
        Token::new(TokenKind::Str, out)
    }

    // If the next char matches `expect`, consume it and return `two`;
    // otherwise return `one` without consuming anything further.
    fn two_char(&mut self, expect: char, one: TokenKind, two: TokenKind, one_lit: &str, two_lit: &str) -> Token {
        if self.peek() == Some(expect) {
            self.advance();
            Token::new(two, two_lit)
        } else {
            Token::new(one, one_lit)
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.advance() {
            Some(c) => c,
            None => return Token::new(TokenKind::Eof, ""),
        };

        use TokenKind::*;
        match c {
            '=' => self.two_char('=', Assign, Eq, "=", "=="),
            '!' => self.two_char('=', Bang, NotEq, "!", "!="),
            '<' => self.two_char('=', Lt, Lte, "<", "<="),
            '>' => self.two_char('=', Gt, Gte, ">", ">="),
            '&' => self.two_char('&', Invalid, And, "&", "&&"),
            '|' => self.two_char('|', Invalid, Or, "|", "||"),
            '+' => Token::new(Plus, "+"),
            '-' => Token::new(Minus, "-"),
            '*' => Token::new(Asterisk, "*"),
            '/' => Token::new(Slash, "/"),
            ',' => Token::new(Comma, ","),
            ';' => Token::new(Semicolon, ";"),
            ':' => Token::new(Colon, ":"),
            '(' => Token::new(LParen, "("),
            ')' => Token::new(RParen, ")"),
            '{' => Token::new(LBrace, "{"),
            '}' => Token::new(RBrace, "}"),
            '[' => Token::new(LBracket, "["),
            ']' => Token::new(RBracket, "]"),
            '"' => self.read_string(),
            c if c.is_ascii_digit() => {
                let literal = self.read_while(c, |c| c.is_ascii_digit());
                Token::new(Integer, literal)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let literal = self.read_while(c, |c| c.is_ascii_alphanumeric() || c == '_');
                match lookup_keyword(&literal) {
                    Some(kind) => Token::new(kind, literal),
                    None => Token::new(Identifier, literal),
                }
            }
            other => Token::new(Invalid, other.to_string()),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        match self.next_token() {
            Token { kind: TokenKind::Eof, .. } => None,
            tok => Some(tok),
        }
    }
}
