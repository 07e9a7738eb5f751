pub mod arena;
pub mod ast;
pub mod lexer;

use std::mem;

use arena::{Arena, ArenaError, Id, Node};
use ast::BinaryOperator;
use thiserror::Error;
use tracing::{debug, trace};

use crate::lexer::{Lexer, LexerError, Loc, Token, TokenKind};

#[derive(PartialEq, PartialOrd, Clone, Copy, Debug)]
#[repr(u8)]
pub enum Precedence {
    Comparison = 0, // == != < >
    Sum,
    Product,
}

impl Precedence {
    pub const LOWEST: u8 = Precedence::Comparison as u8;

    pub fn from_operator(op: BinaryOperator) -> Self {
        match op {
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::LessThan
            | BinaryOperator::GreaterThan => Self::Comparison,
            BinaryOperator::Add | BinaryOperator::Subtract => Self::Sum,
            BinaryOperator::Multiply | BinaryOperator::Divide => Self::Product,
        }
    }
}

fn binary_operator(token: &TokenKind) -> Option<BinaryOperator> {
    Some(match token {
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Subtract,
        TokenKind::Asterisk => BinaryOperator::Multiply,
        TokenKind::Slash => BinaryOperator::Divide,
        TokenKind::Equal => BinaryOperator::Equal,
        TokenKind::NotEqual => BinaryOperator::NotEqual,
        TokenKind::LessThan => BinaryOperator::LessThan,
        TokenKind::GreaterThan => BinaryOperator::GreaterThan,
        _ => return None,
    })
}

#[derive(Error, Debug, Eq, PartialEq)]
pub enum ParserError {
    #[error("{0}")]
    LexerError(#[from] LexerError),
    #[error("{0}")]
    Arena(#[from] ArenaError),
    #[error("{}: Unexpected Token, expected: \"{expected:?}\", actual: \"{:?}\"", .actual.loc, .actual.kind)]
    UnexpectedToken { expected: TokenKind, actual: Token },
    #[error("Unexpected end of input, expected: \"{expected:?}\"")]
    UnexpectedEof { expected: TokenKind },
    #[error("{}: Expected an expression, got \"{:?}\"", .0.loc, .0.kind)]
    ExpectedTerm(Token),
    #[error("Expected an expression, but the input ended")]
    ExpectedTermEof,
    #[error("Expected a statement, but the input ended")]
    ExpectedStatementEof,
    #[error("{}: \"{:?}\" does not start a statement", .0.loc, .0.kind)]
    InvalidStatement(Token),
    #[error("{0}: The integer literal {1} does not fit into a machine word")]
    InvalidIntLiteral(Loc, String),
    #[error("{0}: A function declaration needs a name")]
    MissingFunctionIdentifier(Loc),
    #[error("{0}: Expected a parameter name")]
    MissingParameterName(Loc),
}

/// Whether a statement has to end with its own `;`. The clauses inside a `for` header are
/// terminated by the header itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Required,
    Skip,
}

#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    arena: Arena,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_arena(tokens, Arena::new())
    }

    pub fn with_arena(tokens: Vec<Token>, arena: Arena) -> Self {
        Self {
            tokens,
            index: 0,
            arena,
        }
    }

    pub fn try_build(lexer: Lexer) -> Result<Self, ParserError> {
        let tokens = lexer.collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(tokens))
    }

    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset)
    }

    fn peek_is(&self, offset: usize, kind: TokenKind) -> bool {
        self.peek(offset)
            .is_some_and(|tok| mem::discriminant(&tok.kind) == mem::discriminant(&kind))
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParserError> {
        match self.peek(0) {
            Some(tok) if mem::discriminant(&tok.kind) == mem::discriminant(&expected) => {
                Ok(self.consume().expect("peeked token"))
            }
            Some(tok) => Err(ParserError::UnexpectedToken {
                expected,
                actual: tok.clone(),
            }),
            None => Err(ParserError::UnexpectedEof { expected }),
        }
    }

    fn expect_terminator(&mut self, terminator: Terminator) -> Result<(), ParserError> {
        if terminator == Terminator::Required {
            self.expect(TokenKind::Semicolon)?;
        }
        Ok(())
    }

    fn expect_identifier(&mut self) -> Result<String, ParserError> {
        match self.expect(TokenKind::Identifier(String::new()))?.kind {
            TokenKind::Identifier(name) => Ok(name),
            _ => unreachable!("expect checked the token kind"),
        }
    }

    fn alloc<T: Node>(&mut self, node: T) -> Result<Id<T>, ParserError> {
        Ok(self.arena.alloc(node)?)
    }

    pub fn parse_program(mut self) -> Result<ast::Program, ParserError> {
        let mut statements = vec![];

        while self.peek(0).is_some() {
            statements.push(self.parse_statement(Terminator::Required)?);
        }

        debug!(
            statements = statements.len(),
            nodes = self.arena.len(),
            bytes = self.arena.used_bytes(),
            "parsed program"
        );

        Ok(ast::Program {
            arena: self.arena,
            statements,
        })
    }

    // Statements

    pub fn parse_statement(
        &mut self,
        terminator: Terminator,
    ) -> Result<Id<ast::Statement>, ParserError> {
        let Some(token) = self.peek(0).cloned() else {
            return Err(ParserError::ExpectedStatementEof);
        };
        trace!(token = ?token.kind, loc = %token.loc, "parse statement");

        let stmt = match &token.kind {
            TokenKind::KWExit => self.parse_exit_statement(terminator)?,
            TokenKind::KWLet => self.parse_declaration(terminator)?,
            TokenKind::KWFunction => self.parse_function_declaration()?,
            TokenKind::KWIf => self.parse_if_statement()?,
            TokenKind::KWFor => self.parse_for_statement()?,
            TokenKind::KWReturn => self.parse_return_statement(terminator)?,
            TokenKind::OpenBrace => ast::Statement::Scope(self.parse_scope()?),
            TokenKind::Identifier(_) if self.peek_is(1, TokenKind::Assign) => {
                self.parse_assignment(terminator)?
            }
            TokenKind::Identifier(_) if self.peek_is(1, TokenKind::OpenParen) => {
                let expr = self.parse_expression(Precedence::LOWEST)?;
                self.expect_terminator(terminator)?;
                ast::Statement::Expression(expr)
            }
            _ => return Err(ParserError::InvalidStatement(token)),
        };

        self.alloc(stmt)
    }

    fn parse_exit_statement(
        &mut self,
        terminator: Terminator,
    ) -> Result<ast::Statement, ParserError> {
        self.expect(TokenKind::KWExit)?;
        self.expect(TokenKind::OpenParen)?;
        let expr = self.parse_expression(Precedence::LOWEST)?;
        self.expect(TokenKind::CloseParen)?;
        self.expect_terminator(terminator)?;
        Ok(ast::Statement::Exit(expr))
    }

    fn parse_declaration(
        &mut self,
        terminator: Terminator,
    ) -> Result<ast::Statement, ParserError> {
        self.expect(TokenKind::KWLet)?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Assign)?;
        let expr = self.parse_expression(Precedence::LOWEST)?;
        self.expect_terminator(terminator)?;
        Ok(ast::Statement::Declaration { name, expr })
    }

    fn parse_assignment(
        &mut self,
        terminator: Terminator,
    ) -> Result<ast::Statement, ParserError> {
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Assign)?;
        let expr = self.parse_expression(Precedence::LOWEST)?;
        self.expect_terminator(terminator)?;
        Ok(ast::Statement::Assignment { name, expr })
    }

    fn parse_return_statement(
        &mut self,
        terminator: Terminator,
    ) -> Result<ast::Statement, ParserError> {
        self.expect(TokenKind::KWReturn)?;

        let expr = if self.peek_is(0, TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression(Precedence::LOWEST)?)
        };

        self.expect_terminator(terminator)?;
        Ok(ast::Statement::Return(expr))
    }

    pub fn parse_scope(&mut self) -> Result<Id<ast::Scope>, ParserError> {
        self.expect(TokenKind::OpenBrace)?;

        let mut body = vec![];
        loop {
            match self.peek(0) {
                Some(tok) if tok.kind == TokenKind::CloseBrace => break,
                Some(_) => body.push(self.parse_statement(Terminator::Required)?),
                None => {
                    return Err(ParserError::UnexpectedEof {
                        expected: TokenKind::CloseBrace,
                    })
                }
            }
        }
        self.expect(TokenKind::CloseBrace)?;

        self.alloc(ast::Scope(body))
    }

    fn parse_condition(&mut self) -> Result<Id<ast::Expression>, ParserError> {
        self.expect(TokenKind::OpenParen)?;
        let condition = self.parse_expression(Precedence::LOWEST)?;
        self.expect(TokenKind::CloseParen)?;
        Ok(condition)
    }

    fn parse_if_statement(&mut self) -> Result<ast::Statement, ParserError> {
        self.expect(TokenKind::KWIf)?;
        let condition = self.parse_condition()?;
        let scope = self.parse_scope()?;
        let predicate = self.parse_if_predicate()?;

        Ok(ast::Statement::If {
            condition,
            scope,
            predicate,
        })
    }

    /// Parses the `elif`/`else` chain following an `if` scope, if there is one.
    pub fn parse_if_predicate(&mut self) -> Result<Option<Id<ast::IfPredicate>>, ParserError> {
        let predicate = match self.peek(0).map(|tok| &tok.kind) {
            Some(TokenKind::KWElif) => {
                self.consume();
                let condition = self.parse_condition()?;
                let scope = self.parse_scope()?;
                let predicate = self.parse_if_predicate()?;
                ast::IfPredicate::Elif {
                    condition,
                    scope,
                    predicate,
                }
            }
            Some(TokenKind::KWElse) => {
                self.consume();
                ast::IfPredicate::Else(self.parse_scope()?)
            }
            _ => return Ok(None),
        };

        self.alloc(predicate).map(Some)
    }

    fn parse_for_statement(&mut self) -> Result<ast::Statement, ParserError> {
        self.expect(TokenKind::KWFor)?;
        self.expect(TokenKind::OpenParen)?;
        let init = self.parse_statement(Terminator::Skip)?;
        self.expect(TokenKind::Semicolon)?;
        let condition = self.parse_expression(Precedence::LOWEST)?;
        self.expect(TokenKind::Semicolon)?;
        let iteration = self.parse_statement(Terminator::Skip)?;
        self.expect(TokenKind::CloseParen)?;
        let body = self.parse_scope()?;

        Ok(ast::Statement::For {
            init,
            condition,
            iteration,
            body,
        })
    }

    fn parse_function_declaration(&mut self) -> Result<ast::Statement, ParserError> {
        let keyword = self.expect(TokenKind::KWFunction)?;

        let name = match self.peek(0) {
            Some(Token {
                kind: TokenKind::Identifier(name),
                ..
            }) => {
                let name = name.clone();
                self.consume();
                name
            }
            Some(tok) => return Err(ParserError::MissingFunctionIdentifier(tok.loc)),
            None => return Err(ParserError::MissingFunctionIdentifier(keyword.loc)),
        };

        let open_paren = self.expect(TokenKind::OpenParen)?;
        let params = self.parse_param_list(open_paren.loc)?;
        let body = self.parse_scope()?;

        let func = self.alloc(ast::FunctionDeclaration { name, params, body })?;
        Ok(ast::Statement::Function(func))
    }

    // Expects to be after (
    fn parse_param_list(&mut self, open_paren: Loc) -> Result<Vec<ast::Identifier>, ParserError> {
        let mut params = vec![];

        if self.peek_is(0, TokenKind::CloseParen) {
            self.consume();
            return Ok(params);
        }

        loop {
            match self.consume() {
                Some(Token {
                    kind: TokenKind::Identifier(name),
                    ..
                }) => params.push(name),
                Some(tok) => return Err(ParserError::MissingParameterName(tok.loc)),
                None => return Err(ParserError::MissingParameterName(open_paren)),
            }

            // Comma or close paren
            match self.consume() {
                Some(Token {
                    kind: TokenKind::Comma,
                    ..
                }) => {}
                Some(Token {
                    kind: TokenKind::CloseParen,
                    ..
                }) => break Ok(params),
                Some(tok) => {
                    return Err(ParserError::UnexpectedToken {
                        expected: TokenKind::CloseParen,
                        actual: tok,
                    })
                }
                None => {
                    return Err(ParserError::UnexpectedEof {
                        expected: TokenKind::CloseParen,
                    })
                }
            }
        }
    }

    // Expressions

    /// Precedence climbing: only operators binding at least as tight as `min_precedence`
    /// are folded into the left side here.
    pub fn parse_expression(
        &mut self,
        min_precedence: u8,
    ) -> Result<Id<ast::Expression>, ParserError> {
        let term = self.parse_term()?;
        let mut lhs = self.alloc(ast::Expression::Term(term))?;

        while let Some(op) = self.peek(0).and_then(|tok| binary_operator(&tok.kind)) {
            let precedence = Precedence::from_operator(op) as u8;
            if precedence < min_precedence {
                break;
            }
            self.consume();

            let rhs = self.parse_expression(precedence + 1)?;
            let binary = self.alloc(ast::BinaryExpression { op, lhs, rhs })?;
            lhs = self.alloc(ast::Expression::Binary(binary))?;
        }

        Ok(lhs)
    }

    pub fn parse_term(&mut self) -> Result<Id<ast::Term>, ParserError> {
        let Some(token) = self.consume() else {
            return Err(ParserError::ExpectedTermEof);
        };

        let term = match token.kind {
            TokenKind::IntLiteral(digits) => match digits.parse::<i64>() {
                Ok(val) => ast::Term::IntLiteral(val),
                Err(_) => return Err(ParserError::InvalidIntLiteral(token.loc, digits)),
            },
            TokenKind::Identifier(name) if self.peek_is(0, TokenKind::OpenParen) => {
                self.consume();
                let args = self.parse_argument_list()?;
                ast::Term::FunctionCall { name, args }
            }
            TokenKind::Identifier(name) => ast::Term::Identifier(name),
            TokenKind::OpenParen => {
                let expr = self.parse_expression(Precedence::LOWEST)?;
                self.expect(TokenKind::CloseParen)?;
                ast::Term::Paren(expr)
            }
            TokenKind::StringLiteral(contents) => ast::Term::StringLiteral(contents),
            kind => return Err(ParserError::ExpectedTerm(Token { kind, loc: token.loc })),
        };

        self.alloc(term)
    }

    // Expects to be after (
    fn parse_argument_list(&mut self) -> Result<Vec<Id<ast::Expression>>, ParserError> {
        let mut args = vec![];

        if self.peek_is(0, TokenKind::CloseParen) {
            self.consume();
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression(Precedence::LOWEST)?);

            if self.peek_is(0, TokenKind::CloseParen) {
                self.consume();
                break Ok(args);
            }
            self.expect(TokenKind::Comma)?;
        }
    }
}
