//! Tokenizer for workbench source text.
//!
//! Whitespace and `//` line comments are skipped. Every token carries the
//! 1-indexed line and column of its first character so the parser can both
//! report errors and stamp statements with line ranges.

use ibp_core::BinaryOp;

use crate::parser::{ParseError, ParseErrorKind, SourceLocation};

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Unsigned integer literal; sign is applied by the parser.
    Number(u64),
    /// Identifier that is not a keyword.
    Ident(String),
    /// `let`
    Let,
    /// `if`
    If,
    /// `rand`
    Rand,
    /// Any binary operator, including `-`.
    Op(BinaryOp),
    /// `=`
    Assign,
    /// `!`
    Not,
    /// `~`
    BitNot,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `;`
    Semicolon,
}

impl Token {
    /// Short human-readable description used in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("number `{n}`"),
            Self::Ident(name) => format!("identifier `{name}`"),
            Self::Let => "`let`".to_string(),
            Self::If => "`if`".to_string(),
            Self::Rand => "`rand`".to_string(),
            Self::Op(op) => format!("`{}`", op.symbol()),
            Self::Assign => "`=`".to_string(),
            Self::Not => "`!`".to_string(),
            Self::BitNot => "`~`".to_string(),
            Self::LParen => "`(`".to_string(),
            Self::RParen => "`)`".to_string(),
            Self::LBrace => "`{`".to_string(),
            Self::RBrace => "`}`".to_string(),
            Self::Semicolon => "`;`".to_string(),
        }
    }
}

/// A token with the location of its first character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    /// The token.
    pub token: Token,
    /// Where it starts.
    pub location: SourceLocation,
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    const fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }
}

/// Splits `source` into tokens.
///
/// # Errors
///
/// Returns a `ParseError` for characters outside the language and for
/// integer literals that do not fit in `u64`.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut cursor = Cursor::new(source);
    let mut tokens = Vec::new();

    while let Some(ch) = cursor.peek() {
        if ch.is_whitespace() {
            cursor.bump();
            continue;
        }

        let location = cursor.location();
        cursor.bump();
        let token = match ch {
            '/' if cursor.eat('/') => {
                cursor.skip_line();
                continue;
            }
            '0'..='9' => lex_number(&mut cursor, ch, location)?,
            'a'..='z' | 'A'..='Z' | '_' => lex_word(&mut cursor, ch),
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ';' => Token::Semicolon,
            '~' => Token::BitNot,
            '+' => Token::Op(BinaryOp::Add),
            '-' => Token::Op(BinaryOp::Sub),
            '*' => Token::Op(BinaryOp::Mul),
            '/' => Token::Op(BinaryOp::Div),
            '%' => Token::Op(BinaryOp::Rem),
            '^' => Token::Op(BinaryOp::BitXor),
            '=' if cursor.eat('=') => Token::Op(BinaryOp::Eq),
            '=' => Token::Assign,
            '!' if cursor.eat('=') => Token::Op(BinaryOp::Ne),
            '!' => Token::Not,
            '<' if cursor.eat('=') => Token::Op(BinaryOp::Le),
            '<' if cursor.eat('<') => Token::Op(BinaryOp::Shl),
            '<' => Token::Op(BinaryOp::Lt),
            '>' if cursor.eat('=') => Token::Op(BinaryOp::Ge),
            '>' if cursor.eat('>') => Token::Op(BinaryOp::Shr),
            '>' => Token::Op(BinaryOp::Gt),
            '&' if cursor.eat('&') => Token::Op(BinaryOp::And),
            '&' => Token::Op(BinaryOp::BitAnd),
            '|' if cursor.eat('|') => Token::Op(BinaryOp::Or),
            '|' => Token::Op(BinaryOp::BitOr),
            other => {
                return Err(ParseError {
                    location,
                    kind: ParseErrorKind::UnexpectedCharacter(other),
                });
            }
        };
        tokens.push(Spanned { token, location });
    }

    Ok(tokens)
}

fn lex_number(
    cursor: &mut Cursor<'_>,
    first: char,
    location: SourceLocation,
) -> Result<Token, ParseError> {
    let mut digits = String::from(first);
    while let Some(ch) = cursor.peek().filter(char::is_ascii_digit) {
        digits.push(ch);
        cursor.bump();
    }
    digits
        .parse::<u64>()
        .map(Token::Number)
        .map_err(|_| ParseError {
            location,
            kind: ParseErrorKind::IntegerOutOfRange(digits),
        })
}

fn lex_word(cursor: &mut Cursor<'_>, first: char) -> Token {
    let mut word = String::from(first);
    while let Some(ch) = cursor
        .peek()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
    {
        word.push(ch);
        cursor.bump();
    }
    match word.as_str() {
        "let" => Token::Let,
        "if" => Token::If,
        "rand" => Token::Rand,
        _ => Token::Ident(word),
    }
}
