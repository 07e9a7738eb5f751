use std::fmt::Write;

use crate::arena::{Arena, Id};

pub type Identifier = String;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Term {
    IntLiteral(i64),
    Identifier(Identifier),
    Paren(Id<Expression>),
    StringLiteral(String),
    FunctionCall {
        name: Identifier,
        args: Vec<Id<Expression>>,
    },
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BinaryExpression {
    pub op: BinaryOperator,
    pub lhs: Id<Expression>,
    pub rhs: Id<Expression>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Expression {
    Term(Id<Term>),
    Binary(Id<BinaryExpression>),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Statement {
    Exit(Id<Expression>),
    Declaration {
        name: Identifier,
        expr: Id<Expression>,
    },
    Assignment {
        name: Identifier,
        expr: Id<Expression>,
    },
    Scope(Id<Scope>),
    If {
        condition: Id<Expression>,
        scope: Id<Scope>,
        predicate: Option<Id<IfPredicate>>,
    },
    For {
        init: Id<Statement>,
        condition: Id<Expression>,
        iteration: Id<Statement>,
        body: Id<Scope>,
    },
    Function(Id<FunctionDeclaration>),
    Return(Option<Id<Expression>>),
    /// A call evaluated for its effect, the value is dropped.
    Expression(Id<Expression>),
}

/// The tail of an `if`: either another tested branch or the final `else`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum IfPredicate {
    Elif {
        condition: Id<Expression>,
        scope: Id<Scope>,
        predicate: Option<Id<IfPredicate>>,
    },
    Else(Id<Scope>),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Scope(pub Vec<Id<Statement>>);

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FunctionDeclaration {
    pub name: Identifier,
    pub params: Vec<Identifier>,
    pub body: Id<Scope>,
}

#[derive(Debug)]
pub struct Program {
    pub arena: Arena,
    pub statements: Vec<Id<Statement>>,
}

impl Program {
    /// Renders the whole tree as S-expressions, one top level statement per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for stmt in &self.statements {
            self.dump_statement(&mut out, *stmt);
            out.push('\n');
        }
        out
    }

    pub fn dump_expression(&self, out: &mut String, expr: Id<Expression>) {
        match self.arena[expr] {
            Expression::Term(term) => self.dump_term(out, term),
            Expression::Binary(bin) => {
                let bin = &self.arena[bin];
                let _ = write!(out, "({} ", bin.op.symbol());
                self.dump_expression(out, bin.lhs);
                out.push(' ');
                self.dump_expression(out, bin.rhs);
                out.push(')');
            }
        }
    }

    fn dump_term(&self, out: &mut String, term: Id<Term>) {
        match &self.arena[term] {
            Term::IntLiteral(val) => {
                let _ = write!(out, "{val}");
            }
            Term::Identifier(name) => out.push_str(name),
            Term::Paren(expr) => {
                out.push_str("(paren ");
                self.dump_expression(out, *expr);
                out.push(')');
            }
            Term::StringLiteral(contents) => {
                let _ = write!(out, "{contents:?}");
            }
            Term::FunctionCall { name, args } => {
                let _ = write!(out, "(call {name}");
                for arg in args {
                    out.push(' ');
                    self.dump_expression(out, *arg);
                }
                out.push(')');
            }
        }
    }

    fn dump_scope(&self, out: &mut String, scope: Id<Scope>) {
        out.push_str("(scope");
        for stmt in &self.arena[scope].0 {
            out.push(' ');
            self.dump_statement(out, *stmt);
        }
        out.push(')');
    }

    fn dump_predicate(&self, out: &mut String, pred: Id<IfPredicate>) {
        match &self.arena[pred] {
            IfPredicate::Elif {
                condition,
                scope,
                predicate,
            } => {
                out.push_str("(elif ");
                self.dump_expression(out, *condition);
                out.push(' ');
                self.dump_scope(out, *scope);
                if let Some(predicate) = predicate {
                    out.push(' ');
                    self.dump_predicate(out, *predicate);
                }
                out.push(')');
            }
            IfPredicate::Else(scope) => {
                out.push_str("(else ");
                self.dump_scope(out, *scope);
                out.push(')');
            }
        }
    }

    fn dump_statement(&self, out: &mut String, stmt: Id<Statement>) {
        match &self.arena[stmt] {
            Statement::Exit(expr) => {
                out.push_str("(exit ");
                self.dump_expression(out, *expr);
                out.push(')');
            }
            Statement::Declaration { name, expr } => {
                let _ = write!(out, "(let {name} ");
                self.dump_expression(out, *expr);
                out.push(')');
            }
            Statement::Assignment { name, expr } => {
                let _ = write!(out, "(set {name} ");
                self.dump_expression(out, *expr);
                out.push(')');
            }
            Statement::Scope(scope) => self.dump_scope(out, *scope),
            Statement::If {
                condition,
                scope,
                predicate,
            } => {
                out.push_str("(if ");
                self.dump_expression(out, *condition);
                out.push(' ');
                self.dump_scope(out, *scope);
                if let Some(predicate) = predicate {
                    out.push(' ');
                    self.dump_predicate(out, *predicate);
                }
                out.push(')');
            }
            Statement::For {
                init,
                condition,
                iteration,
                body,
            } => {
                out.push_str("(for ");
                self.dump_statement(out, *init);
                out.push(' ');
                self.dump_expression(out, *condition);
                out.push(' ');
                self.dump_statement(out, *iteration);
                out.push(' ');
                self.dump_scope(out, *body);
                out.push(')');
            }
            Statement::Function(func) => {
                let func = &self.arena[*func];
                let _ = write!(out, "(function {} ({}) ", func.name, func.params.join(" "));
                self.dump_scope(out, func.body);
                out.push(')');
            }
            Statement::Return(expr) => {
                out.push_str("(return");
                if let Some(expr) = expr {
                    out.push(' ');
                    self.dump_expression(out, *expr);
                }
                out.push(')');
            }
            Statement::Expression(expr) => {
                out.push_str("(expr ");
                self.dump_expression(out, *expr);
                out.push(')');
            }
        }
    }
}
