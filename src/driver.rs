use std::{
    env, fs, io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

use catoc_parser::{
    ast::Program,
    lexer::{self, LexerError, Token},
    Parser,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::CompileError;

const USAGE: &str = "FILE [--lex | --parse | --codegen | -S] [-o OUTPUT]";

/// Environment variable holding the log filter, e.g. `CATOC_LOG=debug`.
pub const LOG_ENV: &str = "CATOC_LOG";

#[derive(Error, Debug)]
pub enum DriverExecutionError {
    #[error("{0}")]
    IoError(#[from] io::Error),
    #[error("{message}\nusage: {executable} {USAGE}")]
    Usage { executable: String, message: String },
    #[error("could not find \"{tool}\" on the PATH: {source}")]
    ToolNotFound {
        tool: &'static str,
        source: which::Error,
    },
    #[error("the assembler failed with {0}")]
    AssemblerFailed(ExitStatus),
    /// The assembler did not create a file.
    #[error("the assembler did not produce {0:?}")]
    AssemblerNoFile(PathBuf),
    #[error("the linker failed with {0}")]
    LinkerFailed(ExitStatus),
    #[error("the linker did not produce {0:?}")]
    LinkerNoFile(PathBuf),
    #[error("{0}")]
    Lexer(#[from] LexerError),
    #[error("{0}")]
    Compile(#[from] CompileError),
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Compile,
    Lex,
    Parse,
    Codegen,
    Assembly,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Options {
    pub stage: Stage,
    pub input_file: PathBuf,
    pub assembly_file: PathBuf,
    pub object_file: PathBuf,
    pub output_file: PathBuf,
}

fn is_flag(string: &str) -> Option<Stage> {
    match string {
        "--lex" => Some(Stage::Lex),
        "--parse" => Some(Stage::Parse),
        "--codegen" => Some(Stage::Codegen),
        "-S" => Some(Stage::Assembly),
        _ => None,
    }
}

/// Installs the stderr log subscriber. Calling it again is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn locate(tool: &'static str) -> Result<PathBuf, DriverExecutionError> {
    which::which(tool).map_err(|source| DriverExecutionError::ToolNotFound { tool, source })
}

fn remove_intermediate(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        warn!(
            "Could not remove the file {:?} due to {}, continuing",
            path, err
        );
    }
}

impl Options {
    pub fn new(input_file: PathBuf, stage: Stage) -> Self {
        let assembly_file = input_file.with_extension("asm");
        let object_file = input_file.with_extension("o");
        let output_file = input_file.with_extension("");

        Self {
            stage,
            input_file,
            assembly_file,
            object_file,
            output_file,
        }
    }

    /// With `-S` the assembly is the final product, so `-o` names that file instead.
    pub fn with_output_file(mut self, output_file: PathBuf) -> Self {
        match self.stage {
            Stage::Assembly => self.assembly_file = output_file,
            _ => self.output_file = output_file,
        }
        self
    }

    /// Expects the executable name as the first argument, like [`env::args`].
    pub fn parse_args(
        mut args: impl Iterator<Item = String>,
    ) -> Result<Self, DriverExecutionError> {
        let executable = args.next().unwrap_or_else(|| "catoc".to_owned());
        let usage = |message: &str| DriverExecutionError::Usage {
            executable: executable.clone(),
            message: message.to_owned(),
        };

        let mut stage: Stage = Default::default();
        let mut file_path: Option<PathBuf> = None;
        let mut output_file: Option<PathBuf> = None;

        while let Some(arg) = args.next() {
            if let Some(found_stage) = is_flag(&arg) {
                stage = found_stage;
                continue;
            }

            if arg == "-o" {
                match args.next() {
                    Some(path) => output_file = Some(PathBuf::from(path)),
                    None => return Err(usage("-o needs a file name")),
                }
                continue;
            }

            if arg.starts_with('-') {
                return Err(usage(&format!("unknown flag {arg}")));
            }

            if file_path.is_some() {
                return Err(usage("catoc only accepts one input file"));
            }
            file_path = Some(PathBuf::from(arg));
        }

        let Some(input_file) = file_path else {
            return Err(usage("no input file"));
        };

        let options = Self::new(input_file, stage);
        Ok(match output_file {
            Some(output_file) => options.with_output_file(output_file),
            None => options,
        })
    }

    pub fn read_source(&self) -> Result<String, DriverExecutionError> {
        Ok(fs::read_to_string(&self.input_file)?)
    }

    pub fn run_lexer(&self, source: String) -> Result<Vec<Token>, DriverExecutionError> {
        let tokens = lexer::Lexer::new(source).collect::<Result<Vec<_>, _>>()?;
        debug!(tokens = tokens.len(), "lexed {:?}", self.input_file);

        if let Stage::Lex = self.stage {
            for tok in &tokens {
                println!("{} {:?}", tok.loc, tok.kind);
            }
        }

        Ok(tokens)
    }

    pub fn run_parser(&self, tokens: Vec<Token>) -> Result<Program, DriverExecutionError> {
        let program = Parser::new(tokens)
            .parse_program()
            .map_err(CompileError::from)?;

        if let Stage::Parse = self.stage {
            print!("{}", program.dump());
        }

        Ok(program)
    }

    /// Runs the code gen without creating the file.
    pub fn run_code_gen(&self, program: &Program) -> Result<String, DriverExecutionError> {
        let assembly = catoc_codegen::Generator::new(program)
            .generate_program()
            .map_err(CompileError::from)?;

        if let Stage::Codegen = self.stage {
            print!("{}", assembly);
        }

        Ok(assembly)
    }

    pub fn run_assembly_emission(&self, assembly: &str) -> Result<(), DriverExecutionError> {
        fs::write(&self.assembly_file, assembly)?;
        info!("wrote {:?}", self.assembly_file);

        Ok(())
    }

    pub fn run_assembler(&self) -> Result<(), DriverExecutionError> {
        let nasm = locate("nasm")?;
        let status = Command::new(nasm)
            .arg("-felf64")
            .arg(self.assembly_file.as_os_str())
            .arg("-o")
            .arg(self.object_file.as_os_str())
            .status()?;

        if !status.success() {
            return Err(DriverExecutionError::AssemblerFailed(status));
        }

        if !self.object_file.exists() {
            return Err(DriverExecutionError::AssemblerNoFile(
                self.object_file.clone(),
            ));
        }

        Ok(())
    }

    pub fn run_linker(&self) -> Result<(), DriverExecutionError> {
        let ld = locate("ld")?;
        let status = Command::new(ld)
            .arg("-o")
            .arg(self.output_file.as_os_str())
            .arg(self.object_file.as_os_str())
            .status()?;

        if !status.success() {
            return Err(DriverExecutionError::LinkerFailed(status));
        }

        if !self.output_file.exists() {
            return Err(DriverExecutionError::LinkerNoFile(self.output_file.clone()));
        }

        Ok(())
    }

    /// Runs every stage up to and including `self.stage`.
    pub fn execute(&self) -> Result<(), DriverExecutionError> {
        let source = self.read_source()?;

        let tokens = self.run_lexer(source)?;
        if let Stage::Lex = self.stage {
            return Ok(());
        }

        let program = self.run_parser(tokens)?;
        if let Stage::Parse = self.stage {
            return Ok(());
        }

        let assembly = self.run_code_gen(&program)?;
        if let Stage::Codegen = self.stage {
            return Ok(());
        }

        self.run_assembly_emission(&assembly)?;
        if let Stage::Assembly = self.stage {
            return Ok(());
        }

        self.run_assembler()?;
        remove_intermediate(&self.assembly_file);

        self.run_linker()?;
        remove_intermediate(&self.object_file);

        info!("built {:?}", self.output_file);
        Ok(())
    }
}

pub fn run() -> Result<(), DriverExecutionError> {
    init_logging();

    let opts = Options::parse_args(env::args())?;
    debug!(?opts, "parsed arguments");

    opts.execute()
}
