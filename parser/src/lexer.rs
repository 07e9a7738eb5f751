use std::{fmt::Display, vec::IntoIter};

use thiserror::Error;

#[derive(Error, Debug, Eq, PartialEq)]
pub enum LexerError {
    #[error("{0}: the character '{1}' could not be represented")]
    UnknownCharacter(Loc, char),
    #[error("{0}: identifiers can not start with numbers")]
    IdentifierStartedWithNumber(Loc),
    #[error("{0}: string literal is missing its closing '\"'")]
    UnterminatedString(Loc),
    #[error("{0}: unknown escape sequence '\\{1}'")]
    UnknownEscape(Loc, char),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Loc {
    pub line: usize,
    pub column: usize,
}

impl Display for Loc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TokenKind {
    Eof,
    Identifier(String),
    /// The digits as written, converted by the parser.
    IntLiteral(String),
    StringLiteral(String),

    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    Semicolon,
    Comma,
    Assign, // =

    // Operator
    Plus,        // +
    Minus,       // -
    Asterisk,    // *
    Slash,       // /
    Equal,       // ==
    NotEqual,    // !=
    LessThan,    // <
    GreaterThan, // >

    // Keywords
    KWExit,
    /// Both `let` and `int` introduce a declaration.
    KWLet,
    KWIf,
    KWElif,
    KWElse,
    KWFor,
    KWFunction,
    KWReturn,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Loc,
}

impl TokenKind {
    pub fn from_string(string: &str) -> Self {
        match string {
            "exit" => Self::KWExit,
            "let" | "int" => Self::KWLet,
            "if" => Self::KWIf,
            "elif" => Self::KWElif,
            "else" => Self::KWElse,
            "for" => Self::KWFor,
            "function" => Self::KWFunction,
            "return" => Self::KWReturn,
            _ => Self::Identifier(string.to_owned()),
        }
    }
}

#[derive(Debug)]
pub struct Lexer {
    chars: IntoIter<char>,
    loc: Loc,

    ch: char,
    peek_ch: char,
}

impl Lexer {
    pub fn new(input: String) -> Self {
        let mut lexer = Self {
            chars: input.chars().collect::<Vec<_>>().into_iter(),
            ch: '\0',
            peek_ch: '\0',

            loc: Loc { column: 0, line: 1 },
        };

        lexer.peek_ch = lexer.chars.next().unwrap_or('\0');
        lexer.read_char();
        lexer
    }

    fn is_digit(&self) -> bool {
        self.ch.is_ascii_digit()
    }

    fn is_valid_identifier_char(&self) -> bool {
        matches!(self.ch, 'a'..='z' | 'A'..='Z' | '_') || self.is_digit()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.ch, ' ' | '\n' | '\r' | '\t') {
                self.read_char();
            }

            if self.ch == '/' && self.peek_ch == '/' {
                while self.ch != '\n' && self.ch != '\0' {
                    self.read_char();
                }
            } else {
                break;
            }
        }
    }

    fn read_char(&mut self) {
        if self.ch == '\n' {
            self.loc.column = 0;
            self.loc.line += 1;
        }
        self.ch = self.peek_ch;
        self.peek_ch = self.chars.next().unwrap_or('\0');
        self.loc.column += 1;
    }

    fn read_int_literal(&mut self) -> Result<Token, LexerError> {
        let old_loc = self.loc;
        let mut digits = String::new();

        while self.is_digit() {
            digits.push(self.ch);
            self.read_char();
        }

        if self.is_valid_identifier_char() {
            return Err(LexerError::IdentifierStartedWithNumber(old_loc));
        }

        Ok(Token {
            kind: TokenKind::IntLiteral(digits),
            loc: old_loc,
        })
    }

    fn read_identifier(&mut self) -> Token {
        let old_loc = self.loc;
        let mut string = String::new();

        while self.is_valid_identifier_char() {
            string.push(self.ch);
            self.read_char();
        }
        Token {
            kind: TokenKind::from_string(&string),
            loc: old_loc,
        }
    }

    // Expects to be on the opening "
    fn read_string_literal(&mut self) -> Result<Token, LexerError> {
        let old_loc = self.loc;
        let mut contents = String::new();
        self.read_char();

        loop {
            match self.ch {
                '"' => break,
                '\0' => return Err(LexerError::UnterminatedString(old_loc)),
                '\\' => {
                    self.read_char();
                    contents.push(match self.ch {
                        'n' => '\n',
                        't' => '\t',
                        '0' => '\0',
                        '\\' => '\\',
                        '"' => '"',
                        '\0' => return Err(LexerError::UnterminatedString(old_loc)),
                        other => return Err(LexerError::UnknownEscape(self.loc, other)),
                    });
                }
                ch => contents.push(ch),
            }
            self.read_char();
        }

        // Eat closing "
        self.read_char();
        Ok(Token {
            kind: TokenKind::StringLiteral(contents),
            loc: old_loc,
        })
    }

    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace_and_comments();

        let old_loc = self.loc;

        let result = match self.ch {
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            '{' => TokenKind::OpenBrace,
            '}' => TokenKind::CloseBrace,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Asterisk,
            '/' => TokenKind::Slash,
            '<' => TokenKind::LessThan,
            '>' => TokenKind::GreaterThan,
            '!' => match self.peek_ch {
                '=' => {
                    self.read_char();
                    TokenKind::NotEqual
                }
                _ => return Err(LexerError::UnknownCharacter(old_loc, '!')),
            },
            '=' => {
                if self.peek_ch == '=' {
                    self.read_char();
                    TokenKind::Equal
                } else {
                    TokenKind::Assign
                }
            }
            '"' => return self.read_string_literal(),
            '\0' => {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    loc: self.loc,
                })
            }
            _ => {
                if self.is_digit() {
                    return self.read_int_literal();
                } else if self.is_valid_identifier_char() {
                    return Ok(self.read_identifier());
                }

                return Err(LexerError::UnknownCharacter(old_loc, self.ch));
            }
        };

        self.read_char();
        Ok(Token {
            kind: result,
            loc: old_loc,
        })
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();

        if let Ok(ref tok) = token {
            if let TokenKind::Eof = tok.kind {
                return None;
            }
        }

        Some(token)
    }
}
