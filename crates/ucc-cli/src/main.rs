//! uC compiler CLI.
//!
//! Provides the `ucc` binary with three subcommands mirroring the three
//! pipeline depths: `check` (front-end + semantic analysis), `codegen`
//! (uCIR generation) and `analyze` (dataflow optimisation with a speedup
//! report).
//!
//! Diagnostics are written to stdout in their contract formats
//! (`LexerError: ...`, `ParserError: ...`, `SemanticError: ...`); the
//! missing-input message and the `[SPEEDUP]` line go to stderr. Exit code
//! is 0 on success and 1 on a missing input file or any fatal diagnostic.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use ucc_codegen::ModuleIr;
use ucc_core::ast::Program;

/// uC compiler and analysis tools.
#[derive(Parser)]
#[command(name = "ucc", about = "uC compiler and analysis tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Lex, parse and semantically check a source file.
    Check {
        /// Path to the file to be checked.
        input_file: PathBuf,
    },
    /// Generate uCIR for a source file.
    Codegen {
        /// Path to the file to be compiled.
        input_file: PathBuf,

        /// Print the generated uCIR.
        #[arg(long)]
        ir: bool,

        /// Write the CFG of each function as a Graphviz .gv file.
        #[arg(long)]
        cfg: bool,
    },
    /// Generate, optimise and report on uCIR.
    Analyze {
        /// Path to the file to be compiled.
        input_file: PathBuf,

        /// Print the optimised uCIR.
        #[arg(long)]
        opt: bool,

        /// Report default vs optimised instruction counts. On by
        /// default; the flag is accepted for compatibility.
        #[arg(long)]
        speedup: bool,

        /// Write the optimised CFG of each function as a Graphviz .gv file.
        #[arg(long)]
        cfg: bool,
    },
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Check { input_file } => run_check(&input_file),
        Commands::Codegen {
            input_file,
            ir,
            cfg,
        } => run_codegen(&input_file, ir, cfg),
        Commands::Analyze {
            input_file,
            opt,
            speedup: _,
            cfg,
        } => run_analyze(&input_file, opt, cfg),
    };
    process::exit(code);
}

/// Reads the input file, or reports the missing path to stderr.
fn load_source(path: &Path) -> Result<String, i32> {
    match fs::read_to_string(path) {
        Ok(source) => Ok(source),
        Err(_) => {
            eprintln!("Input {} not found", path.display());
            Err(1)
        }
    }
}

/// Front-end plus semantic analysis; diagnostics go to stdout.
fn check_source(source: &str) -> Result<Program, i32> {
    let mut program = match ucc_parse::parse(source) {
        Ok(program) => program,
        Err(err) => {
            println!("{}", err);
            return Err(1);
        }
    };
    if let Err(err) = ucc_check::analyze(&mut program) {
        println!("{}", err);
        return Err(1);
    }
    Ok(program)
}

fn lower(path: &Path) -> Result<ModuleIr, i32> {
    let source = load_source(path)?;
    let mut program = check_source(&source)?;
    Ok(ucc_codegen::generate(&mut program))
}

fn run_check(path: &Path) -> i32 {
    let source = match load_source(path) {
        Ok(source) => source,
        Err(code) => return code,
    };
    match check_source(&source) {
        Ok(_) => 0,
        Err(code) => code,
    }
}

fn run_codegen(path: &Path, print_ir: bool, view_cfg: bool) -> i32 {
    let module = match lower(path) {
        Ok(module) => module,
        Err(code) => return code,
    };

    if print_ir {
        println!("Generated uCIR: --------");
        print!("{}", module.render());
        println!("------------------------\n");
    }
    if view_cfg {
        if let Err(code) = write_cfgs(&module, "") {
            return code;
        }
    }
    0
}

fn run_analyze(path: &Path, print_opt_ir: bool, view_cfg: bool) -> i32 {
    let mut module = match lower(path) {
        Ok(module) => module,
        Err(code) => return code,
    };

    let optimized = ucc_opt::optimize(&mut module);

    if print_opt_ir {
        println!("Optimized uCIR: --------");
        print!("{}", optimized.render());
        println!("------------------------\n");
    }
    eprintln!(
        "[SPEEDUP] Default: {} Optimized: {} Speedup: {:.2}\n",
        optimized.default_len,
        optimized.optimized_len,
        optimized.speedup()
    );
    if view_cfg {
        if let Err(code) = write_cfgs(&module, ".opt") {
            return code;
        }
    }
    0
}

/// Writes one Graphviz file per function, named `<function><suffix>.gv`.
fn write_cfgs(module: &ModuleIr, suffix: &str) -> Result<(), i32> {
    for cfg in &module.functions {
        let file = format!("{}{}.gv", cfg.name(), suffix);
        if let Err(err) = fs::write(&file, cfg.to_dot()) {
            eprintln!("could not write {}: {}", file, err);
            return Err(1);
        }
    }
    Ok(())
}
