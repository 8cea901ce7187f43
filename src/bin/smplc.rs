// Command-line driver for smplc: reads a source file, compiles it, prints the
// textual dump or the Graphviz export, and exits nonzero when the compilation
// produced errors. All diagnostics go to stderr; the rendered IR goes to
// stdout or to the path given with -o. Logging verbosity is controlled by
// RUST_LOG through env_logger.

//! smplc command-line driver.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use smplc::render;
use smplc::{Severity, TokenList};

#[derive(Parser)]
#[command(name = "smplc", about = "SSA middle-end for the smpl language")]
struct Args {
    /// Source file to compile
    input: PathBuf,

    /// Emit the Graphviz export instead of the textual dump
    #[arg(long)]
    dot: bool,

    /// Print the token stream before parsing
    #[arg(long)]
    tokens: bool,

    /// Write output to this path instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let source = match fs::read_to_string(&args.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("smplc: {}: {e}", args.input.display());
            return ExitCode::FAILURE;
        }
    };

    let toks = TokenList::tokenize(&source);
    if args.tokens {
        for tok in toks.tokens() {
            eprintln!("{tok:?}");
        }
    }

    let program = match smplc::Parser::new(toks).parse() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("smplc: fatal: {e}");
            return ExitCode::FAILURE;
        }
    };

    for diag in program.diagnostics() {
        let kind = match diag.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        eprintln!("smplc: {kind}: {}", diag.message);
    }

    let rendered = if args.dot {
        render::dot::render(&program)
    } else {
        program.dump()
    };
    match &args.output {
        Some(path) => {
            if let Err(e) = fs::write(path, rendered) {
                eprintln!("smplc: {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
        None => print!("{rendered}"),
    }

    if program.error_count() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
