pub mod driver;

pub use catoc_codegen as codegen;
pub use catoc_parser as parser;

use catoc_codegen::{Generator, GeneratorError};
use catoc_parser::{ast::Program, lexer::Lexer, Parser, ParserError};
use thiserror::Error;

/// The first error stops the compilation; whoever calls decides what to do with it.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum CompileError {
    #[error("{0}")]
    Parser(#[from] ParserError),
    #[error("{0}")]
    Generator(#[from] GeneratorError),
}

pub fn parse(source: &str) -> Result<Program, CompileError> {
    let parser = Parser::try_build(Lexer::new(source.to_owned()))?;
    Ok(parser.parse_program()?)
}

/// Compiles source text to NASM assembly.
pub fn compile(source: &str) -> Result<String, CompileError> {
    let program = parse(source)?;
    Ok(Generator::new(&program).generate_program()?)
}
