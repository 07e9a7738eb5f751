//! Lowers a parsed [`Program`] to NASM assembly for x86-64 Linux.
//!
//! Every expression is evaluated on the machine stack: each sub-expression leaves exactly
//! one more word on the stack than it found. The generator mirrors that stack at compile
//! time (`stack_size`) so variables can be addressed relative to `rsp`.

pub mod scope;

use std::{collections::HashMap, fmt::Write, mem};

use catoc_parser::{
    arena::Id,
    ast::{
        BinaryOperator, Expression, FunctionDeclaration, IfPredicate, Program, Scope, Statement,
        Term,
    },
};
use scope::{Location, Variables};
use thiserror::Error;
use tracing::{debug, trace};

/// Size of one machine word in bytes.
const WORD: usize = 8;
/// Saved `rbp` and the return address sit between the frame base and the first argument.
const FIRST_PARAM_OFFSET: usize = 2 * WORD;

#[derive(Error, Debug, Eq, PartialEq)]
pub enum GeneratorError {
    #[error("Undeclared identifier \"{0}\"")]
    UndeclaredIdentifier(String),
    #[error("Identifier \"{0}\" was already declared in this scope")]
    DuplicateDeclaration(String),
    #[error("Call to undeclared function \"{0}\"")]
    UndeclaredFunction(String),
    #[error("Function \"{0}\" was declared more than once")]
    DuplicateFunction(String),
    #[error("Function \"{name}\" takes {expected} arguments but {actual} were given")]
    ArgumentCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("Function \"{0}\" can only be declared at the top level")]
    NestedFunctionDeclaration(String),
    #[error("\"return\" outside of a function")]
    ReturnOutsideFunction,
    #[error("\"{0}\" is reserved and can not be used as a function name")]
    ReservedFunctionName(String),
}

fn is_reserved_symbol(name: &str) -> bool {
    let generated_label = name
        .strip_prefix("label")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()));

    name == "_start" || generated_label
}

/// The `$` prefix keeps NASM from reading a function named `push` or `db` as a keyword.
fn function_symbol(name: &str) -> String {
    format!("${name}")
}

/// Renders `contents` as a NASM backquote string, which understands C style escapes.
fn nasm_string(contents: &str) -> String {
    let mut out = String::from("`");
    for byte in contents.bytes() {
        match byte {
            b'`' => out.push_str("\\`"),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\x{byte:02x}");
            }
        }
    }
    out.push('`');
    out
}

pub struct Generator<'a> {
    program: &'a Program,
    text: String,
    data: String,

    /// Words currently pushed in the frame being generated.
    stack_size: usize,
    variables: Variables,
    string_literals: HashMap<String, String>,
    /// Top level functions in declaration order with their arity.
    functions: Vec<(&'a str, usize)>,
    label_count: usize,
    /// Where `return` jumps to in the function being generated.
    epilogue: Option<String>,
}

impl<'a> Generator<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            text: String::new(),
            data: String::new(),
            stack_size: 0,
            variables: Variables::default(),
            string_literals: HashMap::new(),
            functions: vec![],
            label_count: 0,
            epilogue: None,
        }
    }

    pub fn generate_program(mut self) -> Result<String, GeneratorError> {
        self.collect_functions()?;
        self.generate_functions()?;
        self.generate_mainline()?;

        debug!(
            functions = self.functions.len(),
            strings = self.string_literals.len(),
            labels = self.label_count,
            "generated program"
        );

        let mut out = String::from("global _start\n");
        for (name, _) in &self.functions {
            let _ = writeln!(out, "global {}", function_symbol(name));
        }
        out.push_str("section .data\n");
        out.push_str(&self.data);
        out.push_str("section .text\n");
        out.push_str(&self.text);

        Ok(out)
    }

    fn collect_functions(&mut self) -> Result<(), GeneratorError> {
        let program = self.program;

        for stmt in &program.statements {
            if let Statement::Function(func) = &program.arena[*stmt] {
                let func = &program.arena[*func];

                if is_reserved_symbol(&func.name) {
                    return Err(GeneratorError::ReservedFunctionName(func.name.clone()));
                }
                if self.function_arity(&func.name).is_some() {
                    return Err(GeneratorError::DuplicateFunction(func.name.clone()));
                }

                self.functions.push((func.name.as_str(), func.params.len()));
            }
        }

        Ok(())
    }

    fn function_arity(&self, name: &str) -> Option<usize> {
        self.functions
            .iter()
            .find(|(func, _)| *func == name)
            .map(|(_, arity)| *arity)
    }

    /// First pass: only the function declarations at the top level.
    fn generate_functions(&mut self) -> Result<(), GeneratorError> {
        let program = self.program;

        for stmt in &program.statements {
            if let Statement::Function(func) = &program.arena[*stmt] {
                self.generate_function(&program.arena[*func])?;
            }
        }

        Ok(())
    }

    /// Second pass: everything else, behind the entry label.
    fn generate_mainline(&mut self) -> Result<(), GeneratorError> {
        let program = self.program;

        self.label("_start");
        self.variables.begin_scope();
        for stmt in &program.statements {
            if !matches!(program.arena[*stmt], Statement::Function(_)) {
                self.generate_statement(*stmt)?;
            }
        }
        self.end_scope();
        debug_assert_eq!(self.stack_size, 0);

        self.line("mov rax, 60");
        self.line("mov rdi, 0");
        self.line("syscall");

        Ok(())
    }

    fn generate_function(&mut self, func: &'a FunctionDeclaration) -> Result<(), GeneratorError> {
        debug!(name = %func.name, params = func.params.len(), "generating function");

        let epilogue = self.create_label();
        let outer_epilogue = self.epilogue.replace(epilogue.clone());
        let outer_variables = mem::take(&mut self.variables);
        let outer_stack_size = mem::replace(&mut self.stack_size, 0);

        self.label(&function_symbol(&func.name));
        self.line("push rbp");
        self.line("mov rbp, rsp");

        // Parameters share the outermost scope of the body.
        self.variables.begin_scope();
        for (index, param) in func.params.iter().enumerate() {
            self.variables.declare(param, Location::Param(index))?;
        }
        let program = self.program;
        for stmt in &program.arena[func.body].0 {
            self.generate_statement(*stmt)?;
        }
        self.end_scope();
        debug_assert_eq!(self.stack_size, 0);

        // Falling off the end returns 0.
        self.line("mov rax, 0");
        self.label(&epilogue);
        self.line("mov rsp, rbp");
        self.line("pop rbp");
        self.line("ret");

        self.epilogue = outer_epilogue;
        self.variables = outer_variables;
        self.stack_size = outer_stack_size;

        Ok(())
    }

    // Statements

    fn generate_statement(&mut self, stmt: Id<Statement>) -> Result<(), GeneratorError> {
        let program = self.program;

        match &program.arena[stmt] {
            Statement::Exit(expr) => {
                self.generate_expression(*expr)?;
                self.line("mov rax, 60");
                self.pop("rdi");
                self.line("syscall");
            }
            Statement::Declaration { name, expr } => {
                // The value is evaluated before the name is visible, so `int a = a;` reads
                // an outer `a`.
                self.generate_expression(*expr)?;
                self.variables
                    .declare(name, Location::Slot(self.stack_size - 1))?;
            }
            Statement::Assignment { name, expr } => {
                self.variables.lookup(name)?;
                self.generate_expression(*expr)?;
                self.pop("rax");
                let operand = self.variable_operand(name)?;
                self.line(&format!("mov {operand}, rax"));
            }
            Statement::Scope(scope) => self.generate_scope(*scope)?,
            Statement::If {
                condition,
                scope,
                predicate,
            } => {
                self.generate_expression(*condition)?;
                self.pop("rax");
                self.line("test rax, rax");
                let label = self.create_label();
                self.line(&format!("jz {label}"));
                self.generate_scope(*scope)?;

                if let Some(predicate) = predicate {
                    let end_label = self.create_label();
                    self.line(&format!("jmp {end_label}"));
                    self.label(&label);
                    self.generate_if_predicate(*predicate, &end_label)?;
                    self.label(&end_label);
                } else {
                    self.label(&label);
                }
            }
            Statement::For {
                init,
                condition,
                iteration,
                body,
            } => {
                // Variables from the init clause only live as long as the loop.
                self.variables.begin_scope();
                self.generate_statement(*init)?;

                let start_label = self.create_label();
                let end_label = self.create_label();
                self.label(&start_label);

                self.generate_expression(*condition)?;
                self.pop("rax");
                self.line("test rax, rax");
                self.line(&format!("jz {end_label}"));

                self.generate_scope(*body)?;
                // A declaration here must be gone again before jumping back.
                self.variables.begin_scope();
                self.generate_statement(*iteration)?;
                self.end_scope();
                self.line(&format!("jmp {start_label}"));
                self.label(&end_label);
                self.end_scope();
            }
            Statement::Function(func) => {
                return Err(GeneratorError::NestedFunctionDeclaration(
                    program.arena[*func].name.clone(),
                ));
            }
            Statement::Return(expr) => {
                let Some(epilogue) = self.epilogue.clone() else {
                    return Err(GeneratorError::ReturnOutsideFunction);
                };

                match expr {
                    Some(expr) => {
                        self.generate_expression(*expr)?;
                        self.pop("rax");
                    }
                    None => self.line("mov rax, 0"),
                }
                self.line(&format!("jmp {epilogue}"));
            }
            Statement::Expression(expr) => {
                self.generate_expression(*expr)?;
                self.pop("rax");
            }
        }

        Ok(())
    }

    fn generate_scope(&mut self, scope: Id<Scope>) -> Result<(), GeneratorError> {
        let program = self.program;

        self.variables.begin_scope();
        for stmt in &program.arena[scope].0 {
            self.generate_statement(*stmt)?;
        }
        self.end_scope();

        Ok(())
    }

    fn generate_if_predicate(
        &mut self,
        predicate: Id<IfPredicate>,
        end_label: &str,
    ) -> Result<(), GeneratorError> {
        let program = self.program;

        match &program.arena[predicate] {
            IfPredicate::Elif {
                condition,
                scope,
                predicate,
            } => {
                self.generate_expression(*condition)?;
                self.pop("rax");
                self.line("test rax, rax");
                let label = self.create_label();
                self.line(&format!("jz {label}"));
                self.generate_scope(*scope)?;
                self.line(&format!("jmp {end_label}"));
                self.label(&label);

                if let Some(predicate) = predicate {
                    self.generate_if_predicate(*predicate, end_label)?;
                }
            }
            IfPredicate::Else(scope) => self.generate_scope(*scope)?,
        }

        Ok(())
    }

    // Expressions

    fn generate_expression(&mut self, expr: Id<Expression>) -> Result<(), GeneratorError> {
        let program = self.program;

        match program.arena[expr] {
            Expression::Term(term) => self.generate_term(term),
            Expression::Binary(binary) => {
                let binary = &program.arena[binary];
                self.generate_binary_expression(binary.op, binary.lhs, binary.rhs)
            }
        }
    }

    fn generate_term(&mut self, term: Id<Term>) -> Result<(), GeneratorError> {
        let program = self.program;

        match &program.arena[term] {
            Term::IntLiteral(val) => {
                self.line(&format!("mov rax, {val}"));
                self.push("rax");
            }
            Term::Identifier(name) => {
                let operand = self.variable_operand(name)?;
                self.push(&operand);
            }
            Term::Paren(expr) => self.generate_expression(*expr)?,
            Term::StringLiteral(contents) => {
                let label = self.string_label(contents);
                self.line(&format!("lea rax, [{label}]"));
                self.push("rax");
            }
            Term::FunctionCall { name, args } => {
                let expected = self
                    .function_arity(name)
                    .ok_or_else(|| GeneratorError::UndeclaredFunction(name.clone()))?;
                if expected != args.len() {
                    return Err(GeneratorError::ArgumentCountMismatch {
                        name: name.clone(),
                        expected,
                        actual: args.len(),
                    });
                }

                // Reverse order puts the first argument closest to the frame base.
                for arg in args.iter().rev() {
                    self.generate_expression(*arg)?;
                }
                self.line(&format!("call {}", function_symbol(name)));
                if !args.is_empty() {
                    self.line(&format!("add rsp, {}", args.len() * WORD));
                    self.stack_size -= args.len();
                }
                self.push("rax");
            }
        }

        Ok(())
    }

    fn generate_binary_expression(
        &mut self,
        op: BinaryOperator,
        lhs: Id<Expression>,
        rhs: Id<Expression>,
    ) -> Result<(), GeneratorError> {
        self.generate_expression(lhs)?;
        self.generate_expression(rhs)?;
        self.pop("rbx");
        self.pop("rax");

        match op {
            BinaryOperator::Add => self.line("add rax, rbx"),
            BinaryOperator::Subtract => self.line("sub rax, rbx"),
            BinaryOperator::Multiply => self.line("imul rax, rbx"),
            BinaryOperator::Divide => {
                self.line("cqo");
                self.line("idiv rbx");
            }
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::LessThan
            | BinaryOperator::GreaterThan => {
                let set = match op {
                    BinaryOperator::Equal => "sete",
                    BinaryOperator::NotEqual => "setne",
                    BinaryOperator::LessThan => "setl",
                    BinaryOperator::GreaterThan => "setg",
                    _ => unreachable!("only comparison operators reach here: {:?}", op),
                };
                self.line("cmp rax, rbx");
                self.line("mov rax, 0");
                self.line(&format!("{set} al"));
            }
        }

        self.push("rax");
        Ok(())
    }

    // Helpers

    fn variable_operand(&self, name: &str) -> Result<String, GeneratorError> {
        Ok(match self.variables.lookup(name)?.location {
            Location::Slot(slot) => {
                format!("QWORD [rsp + {}]", (self.stack_size - slot - 1) * WORD)
            }
            Location::Param(index) => {
                format!("QWORD [rbp + {}]", FIRST_PARAM_OFFSET + index * WORD)
            }
        })
    }

    fn string_label(&mut self, contents: &str) -> String {
        if let Some(label) = self.string_literals.get(contents) {
            return label.clone();
        }

        let label = self.create_label();
        let bytes = if contents.is_empty() {
            "0".to_owned()
        } else {
            format!("{}, 0", nasm_string(contents))
        };
        let _ = writeln!(self.data, "{label}: db {bytes}");
        self.string_literals
            .insert(contents.to_owned(), label.clone());

        label
    }

    fn end_scope(&mut self) {
        let slots = self.variables.end_scope();
        if slots > 0 {
            self.line(&format!("add rsp, {}", slots * WORD));
            self.stack_size -= slots;
        }
    }

    fn push(&mut self, operand: &str) {
        self.line(&format!("push {operand}"));
        self.stack_size += 1;
    }

    fn pop(&mut self, register: &str) {
        self.line(&format!("pop {register}"));
        self.stack_size -= 1;
    }

    fn create_label(&mut self) -> String {
        let label = format!("label{}", self.label_count);
        self.label_count += 1;
        trace!(%label, "created label");
        label
    }

    fn line(&mut self, instruction: &str) {
        let _ = writeln!(self.text, "  {instruction}");
    }

    fn label(&mut self, label: &str) {
        let _ = writeln!(self.text, "{label}:");
    }
}

#[cfg(test)]
mod tests {
    use catoc_parser::{lexer::Lexer, Parser};

    use super::*;

    fn parse(input: &str) -> Program {
        let lexer = Lexer::new(input.to_owned());
        let parser = Parser::try_build(lexer).expect("parser should be created successfully");

        parser
            .parse_program()
            .expect("the program should be parsed successfully")
    }

    fn generate(input: &str) -> Result<String, GeneratorError> {
        let program = parse(input);
        Generator::new(&program).generate_program()
    }

    /// Everything after the entry label.
    fn mainline(asm: &str) -> &str {
        let start = asm.find("_start:\n").expect("entry label") + "_start:\n".len();
        &asm[start..]
    }

    #[test]
    fn test_exit_literal() {
        let asm = generate("exit(42);").expect("should generate");

        assert_eq!(
            asm,
            "global _start
section .data
section .text
_start:
  mov rax, 42
  push rax
  mov rax, 60
  pop rdi
  syscall
  mov rax, 60
  mov rdi, 0
  syscall
"
        );
    }

    #[test]
    fn test_variable_offsets_follow_stack_depth() {
        let asm = generate("int a = 5; int b = a + 1; exit(b);").expect("should generate");

        assert_eq!(
            mainline(&asm),
            "  mov rax, 5
  push rax
  push QWORD [rsp + 0]
  mov rax, 1
  push rax
  pop rbx
  pop rax
  add rax, rbx
  push rax
  push QWORD [rsp + 0]
  mov rax, 60
  pop rdi
  syscall
  add rsp, 16
  mov rax, 60
  mov rdi, 0
  syscall
"
        );

        let asm = generate("int a = 5; int b = 7; exit(a);").expect("should generate");
        assert!(mainline(&asm).contains("  push QWORD [rsp + 8]\n"));
    }

    #[test]
    fn test_subtraction_operand_order() {
        let asm = generate("exit(10 - 3);").expect("should generate");

        assert!(mainline(&asm).starts_with(
            "  mov rax, 10
  push rax
  mov rax, 3
  push rax
  pop rbx
  pop rax
  sub rax, rbx
"
        ));
    }

    #[test]
    fn test_division_and_comparison() {
        let asm = generate("exit(8 / 2 < 5);").expect("should generate");

        assert!(asm.contains("  cqo\n  idiv rbx\n"));
        assert!(asm.contains("  cmp rax, rbx\n  mov rax, 0\n  setl al\n"));
    }

    #[test]
    fn test_duplicate_declaration() {
        assert_eq!(
            generate("int a = 1; int a = 2; exit(a);"),
            Err(GeneratorError::DuplicateDeclaration("a".to_owned()))
        );
    }

    #[test]
    fn test_undeclared_identifier() {
        assert_eq!(
            generate("exit(x);"),
            Err(GeneratorError::UndeclaredIdentifier("x".to_owned()))
        );
        assert_eq!(
            generate("x = 1;"),
            Err(GeneratorError::UndeclaredIdentifier("x".to_owned()))
        );
    }

    #[test]
    fn test_scope_exit_releases_variables() {
        let asm = generate("{ int a = 1; } int a = 2; exit(a);").expect("should generate");
        assert!(mainline(&asm).starts_with("  mov rax, 1\n  push rax\n  add rsp, 8\n"));

        assert_eq!(
            generate("{ int a = 1; } exit(a);"),
            Err(GeneratorError::UndeclaredIdentifier("a".to_owned()))
        );
    }

    #[test]
    fn test_shadowing_in_nested_scope() {
        let asm = generate("int a = 1; { int a = a + 1; exit(a); }").expect("should generate");

        // The inner initializer still reads the outer `a`.
        assert!(mainline(&asm).starts_with("  mov rax, 1\n  push rax\n  push QWORD [rsp + 0]\n"));
        assert!(mainline(&asm).contains("  add rax, rbx\n  push rax\n  push QWORD [rsp + 0]\n"));
    }

    #[test]
    fn test_assignment() {
        let asm = generate("int a = 1; int b = 2; a = 3;").expect("should generate");

        assert!(mainline(&asm).contains("  mov rax, 3\n  push rax\n  pop rax\n  mov QWORD [rsp + 8], rax\n"));
    }

    #[test]
    fn test_if_elif_else_labels() {
        let asm = generate(
            "int a = 0; if (a == 1) { exit(1); } elif (a == 0) { exit(2); } else { exit(3); }",
        )
        .expect("should generate");
        let main = mainline(&asm);

        let positions: Vec<_> = [
            "  jz label0\n",
            "  jmp label1\nlabel0:\n",
            "  jz label2\n",
            "  jmp label1\nlabel2:\n",
            "label1:\n",
        ]
        .iter()
        .map(|needle| main.find(needle).unwrap_or_else(|| panic!("missing {needle:?}")))
        .collect();

        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_elif_without_else_places_its_label() {
        let asm =
            generate("if (0) { exit(1); } elif (0) { exit(2); } exit(3);").expect("should generate");

        assert!(asm.contains("  jz label2\n"));
        assert!(asm.contains("label2:\n"));
    }

    #[test]
    fn test_for_loop() {
        let asm = generate("int sum = 0; for (int i = 0; i < 5; i = i + 1) { sum = sum + i; } exit(sum);")
            .expect("should generate");
        let main = mainline(&asm);

        assert!(main.contains("label0:\n"));
        assert!(main.contains("  jz label1\n"));
        assert!(main.contains("  jmp label0\nlabel1:\n  add rsp, 8\n"));
    }

    #[test]
    fn test_for_iteration_declaration_is_released() {
        let asm = generate("int a = 42; for (int i = 0; i < 0; int j = 1) { } exit(a);")
            .expect("should generate");
        let main = mainline(&asm);

        // `j` is dropped before the jump, so only `i` is left at the loop exit.
        assert!(main.contains("  add rsp, 8
  jmp label0
label1:
  add rsp, 8
"));
        assert!(main.ends_with(
            "  push QWORD [rsp + 0]
  mov rax, 60
  pop rdi
  syscall
  add rsp, 8
  mov rax, 60
  mov rdi, 0
  syscall
"
        ));
    }

    #[test]
    fn test_functions_named_like_instructions() {
        let asm = generate("function push(a) { return a; } function db() { return 1; } exit(push(db()));")
            .expect("should generate");

        assert!(asm.contains("global $push\nglobal $db\n"));
        assert!(asm.contains("$push:\n  push rbp\n"));
        assert!(asm.contains("  call $db\n"));
        assert!(asm.contains("  call $push\n"));
    }

    #[test]
    fn test_for_variable_is_scoped_to_loop() {
        assert_eq!(
            generate("for (int i = 0; i < 5; i = i + 1) { } exit(i);"),
            Err(GeneratorError::UndeclaredIdentifier("i".to_owned()))
        );
    }

    #[test]
    fn test_string_literals_are_deduplicated() {
        let asm = generate(r#"let s = "hi"; let t = "hi"; let u = "yo";"#).expect("should generate");

        assert_eq!(asm.matches(": db ").count(), 2);
        assert!(asm.contains("label0: db `hi`, 0\n"));
        assert!(asm.contains("label1: db `yo`, 0\n"));
        assert_eq!(asm.matches("lea rax, [label0]").count(), 2);
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(nasm_string("a`b\\c\n\x01"), "`a\\`b\\\\c\\n\\x01`");

        let asm = generate(r#"let s = "";"#).expect("should generate");
        assert!(asm.contains("label0: db 0\n"));
    }

    #[test]
    fn test_function_call_convention() {
        let asm = generate("function f(a, b) { return a - b; } exit(f(10, 3));")
            .expect("should generate");

        assert!(asm.starts_with("global _start\nglobal $f\n"));
        assert!(asm.contains(
            "$f:
  push rbp
  mov rbp, rsp
  push QWORD [rbp + 16]
  push QWORD [rbp + 24]
  pop rbx
  pop rax
  sub rax, rbx
  push rax
  pop rax
  jmp label0
  mov rax, 0
label0:
  mov rsp, rbp
  pop rbp
  ret
"
        ));
        assert!(mainline(&asm).starts_with(
            "  mov rax, 3
  push rax
  mov rax, 10
  push rax
  call $f
  add rsp, 16
  push rax
"
        ));
    }

    #[test]
    fn test_functions_precede_entry() {
        // Called before it is declared.
        let asm = generate("exit(g()); function g() { return 7; }").expect("should generate");

        let function = asm.find("$g:\n").expect("function label");
        let entry = asm.find("_start:\n").expect("entry label");
        assert!(function < entry);
    }

    #[test]
    fn test_function_locals_and_params() {
        let asm = generate("function f(a) { int b = a * 2; return b; } exit(f(4));")
            .expect("should generate");

        assert!(asm.contains("  push QWORD [rbp + 16]\n"));
        assert!(asm.contains("  imul rax, rbx\n  push rax\n  push QWORD [rsp + 0]\n  pop rax\n"));
    }

    #[test]
    fn test_function_errors() {
        assert_eq!(
            generate("exit(h(1));"),
            Err(GeneratorError::UndeclaredFunction("h".to_owned()))
        );
        assert_eq!(
            generate("function f(a) { return a; } exit(f(1, 2));"),
            Err(GeneratorError::ArgumentCountMismatch {
                name: "f".to_owned(),
                expected: 1,
                actual: 2,
            })
        );
        assert_eq!(
            generate("function f() { return 1; } function f() { return 2; }"),
            Err(GeneratorError::DuplicateFunction("f".to_owned()))
        );
        assert_eq!(
            generate("function f(a, a) { return a; }"),
            Err(GeneratorError::DuplicateDeclaration("a".to_owned()))
        );
        assert_eq!(
            generate("function f() { function g() { return 1; } return 2; }"),
            Err(GeneratorError::NestedFunctionDeclaration("g".to_owned()))
        );
        assert_eq!(
            generate("function _start() { return 1; }"),
            Err(GeneratorError::ReservedFunctionName("_start".to_owned()))
        );
        assert_eq!(
            generate("function label3() { return 1; }"),
            Err(GeneratorError::ReservedFunctionName("label3".to_owned()))
        );
    }

    #[test]
    fn test_return_outside_function() {
        assert_eq!(
            generate("return 1;"),
            Err(GeneratorError::ReturnOutsideFunction)
        );
    }

    #[test]
    fn test_function_cannot_see_mainline_variables() {
        assert_eq!(
            generate("int a = 1; function f() { return a; } exit(f());"),
            Err(GeneratorError::UndeclaredIdentifier("a".to_owned()))
        );
    }

    #[test]
    fn test_call_statement_discards_value() {
        let asm = generate("function f() { return 1; } f(); exit(0);").expect("should generate");

        assert!(mainline(&asm).starts_with("  call $f\n  push rax\n  pop rax\n"));
    }
}
