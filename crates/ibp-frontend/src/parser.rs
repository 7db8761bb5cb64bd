//! Recursive-descent parser producing [`Program`] trees with line ranges.
//!
//! Statements are parsed by straightforward descent; binary expressions use
//! precedence climbing over [`BinaryOp::precedence`], so every infix level is
//! left-associative.
//!
//! Nesting (blocks, parentheses, unary chains and infix chains) is capped at
//! [`MAX_NESTING`] so later tree walks stay within the stack.

use std::fmt;

use ibp_core::{BinaryOp, Expr, LineRange, Program, Statement, UnaryOp};

use crate::lexer::{tokenize, Spanned, Token};

/// Deepest nesting a program may reach.
pub const MAX_NESTING: usize = 256;

/// Source location for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column number.
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Parse error with source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Location of the error.
    pub location: SourceLocation,
    /// Kind of parse error.
    pub kind: ParseErrorKind,
}

/// Classification of parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Character that starts no token.
    UnexpectedCharacter(char),
    /// Token that does not fit the grammar here.
    UnexpectedToken {
        /// Description of the offending token.
        found: String,
        /// What the parser was looking for.
        expected: &'static str,
    },
    /// Input ended in the middle of a construct.
    UnexpectedEof {
        /// What the parser was looking for.
        expected: &'static str,
    },
    /// Literal outside the signed 64-bit range.
    IntegerOutOfRange(String),
    /// `let`, `if` or `rand` used where a name is required.
    KeywordAsIdentifier(&'static str),
    /// Blocks or expressions nested past [`MAX_NESTING`].
    NestingTooDeep {
        /// The nesting limit.
        limit: usize,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.kind)
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter(ch) => write!(f, "unexpected character {ch:?}"),
            Self::UnexpectedToken { found, expected } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::UnexpectedEof { expected } => {
                write!(f, "expected {expected}, found end of input")
            }
            Self::IntegerOutOfRange(digits) => {
                write!(f, "integer literal out of range: {digits}")
            }
            Self::KeywordAsIdentifier(keyword) => {
                write!(f, "keyword `{keyword}` cannot be used as a name")
            }
            Self::NestingTooDeep { limit } => {
                write!(f, "nesting deeper than {limit} levels")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Parses a complete program.
///
/// # Errors
///
/// Returns the first lexical or syntax error in `source`.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
        depth: 0,
        end: end_location(source),
    };
    let statements = parser.statements(false)?;
    Ok(Program::new(statements))
}

fn end_location(source: &str) -> SourceLocation {
    let line = source.matches('\n').count() + 1;
    let tail = source.rsplit('\n').next().unwrap_or("");
    SourceLocation {
        line,
        column: tail.chars().count() + 1,
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    end: SourceLocation,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|spanned| &spanned.token)
    }

    fn location(&self) -> SourceLocation {
        self.tokens
            .get(self.pos)
            .map_or(self.end, |spanned| spanned.location)
    }

    fn descend(&mut self, location: SourceLocation) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError {
                location,
                kind: ParseErrorKind::NestingTooDeep { limit: MAX_NESTING },
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn advance(&mut self, expected: &'static str) -> Result<Spanned, ParseError> {
        let spanned = self.tokens.get(self.pos).cloned().ok_or(ParseError {
            location: self.end,
            kind: ParseErrorKind::UnexpectedEof { expected },
        })?;
        self.pos += 1;
        Ok(spanned)
    }

    fn expect(
        &mut self,
        wanted: &Token,
        expected: &'static str,
    ) -> Result<SourceLocation, ParseError> {
        let spanned = self.advance(expected)?;
        if &spanned.token == wanted {
            Ok(spanned.location)
        } else {
            Err(unexpected(&spanned, expected))
        }
    }

    fn statements(&mut self, in_block: bool) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        loop {
            match self.peek() {
                None if !in_block => return Ok(statements),
                None | Some(Token::RBrace) if in_block => return Ok(statements),
                _ => statements.push(self.statement()?),
            }
        }
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        let head = self.advance("`let` or `if`")?;
        match head.token {
            Token::Let => {
                let name = self.identifier()?;
                self.expect(&Token::Assign, "`=`")?;
                let value = self.expression()?;
                let end = self.expect(&Token::Semicolon, "`;`")?;
                Ok(Statement::let_binding(
                    name,
                    value,
                    LineRange::new(head.location.line, end.line),
                ))
            }
            Token::If => {
                self.descend(head.location)?;
                self.expect(&Token::LParen, "`(`")?;
                let cond = self.expression()?;
                self.expect(&Token::RParen, "`)`")?;
                self.expect(&Token::LBrace, "`{`")?;
                let body = self.statements(true)?;
                let end = self.expect(&Token::RBrace, "`}`")?;
                self.depth -= 1;
                Ok(Statement::if_block(
                    cond,
                    body,
                    LineRange::new(head.location.line, end.line),
                ))
            }
            _ => Err(unexpected(&head, "`let` or `if`")),
        }
    }

    fn identifier(&mut self) -> Result<String, ParseError> {
        let spanned = self.advance("a name")?;
        let keyword = match &spanned.token {
            Token::Ident(name) => return Ok(name.clone()),
            Token::Let => "let",
            Token::If => "if",
            Token::Rand => "rand",
            _ => return Err(unexpected(&spanned, "a name")),
        };
        Err(ParseError {
            location: spanned.location,
            kind: ParseErrorKind::KeywordAsIdentifier(keyword),
        })
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.binary(BinaryOp::Or.precedence())
    }

    fn binary(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            if op.precedence() < min_precedence {
                break;
            }
            // Each fold deepens the left spine by one.
            self.descend(self.location())?;
            self.pos += 1;
            let rhs = self.binary(op.precedence() + 1)?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        self.depth = base;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::BitNot) => UnaryOp::BitNot,
            _ => return self.primary(),
        };
        self.descend(self.location())?;
        self.pos += 1;
        let operand = self.unary()?;
        self.depth -= 1;
        Ok(Expr::unary(op, operand))
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let spanned = self.advance("an expression")?;
        match &spanned.token {
            Token::Number(n) => i64::try_from(*n)
                .map(Expr::number)
                .map_err(|_| out_of_range(spanned.location, n.to_string())),
            Token::Op(BinaryOp::Sub) => {
                let literal = self.advance("a number after `-`")?;
                match &literal.token {
                    Token::Number(n) => 0i64
                        .checked_sub_unsigned(*n)
                        .map(Expr::number)
                        .ok_or_else(|| out_of_range(spanned.location, format!("-{n}"))),
                    _ => Err(unexpected(&literal, "a number after `-`")),
                }
            }
            Token::Ident(name) => Ok(Expr::var(name.clone())),
            Token::Rand => {
                self.descend(spanned.location)?;
                self.expect(&Token::LParen, "`(`")?;
                let arg = self.expression()?;
                self.expect(&Token::RParen, "`)`")?;
                self.depth -= 1;
                Ok(Expr::random(arg))
            }
            Token::LParen => {
                self.descend(spanned.location)?;
                let inner = self.expression()?;
                self.expect(&Token::RParen, "`)`")?;
                self.depth -= 1;
                Ok(inner)
            }
            _ => Err(unexpected(&spanned, "an expression")),
        }
    }
}

fn unexpected(spanned: &Spanned, expected: &'static str) -> ParseError {
    ParseError {
        location: spanned.location,
        kind: ParseErrorKind::UnexpectedToken {
            found: spanned.token.describe(),
            expected,
        },
    }
}

const fn out_of_range(location: SourceLocation, digits: String) -> ParseError {
    ParseError {
        location,
        kind: ParseErrorKind::IntegerOutOfRange(digits),
    }
}
