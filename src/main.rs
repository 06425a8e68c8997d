use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use color_print::ceprintln;

use minirc::frontend::diagnostics::LineMap;
use minirc::frontend::{self, pretty};
use minirc::{backend, mini};

#[derive(Parser, Debug)]
#[clap(
    name = "minirc",
    version,
    about = "Compiler for the Mini language targeting RISC-V RV32IM"
)]
struct AppArgs {
    /// Mini source file
    input: PathBuf,

    /// Print the lifted AST to stdout
    #[clap(long)]
    dump_ast: bool,

    /// Print the symbol tables to stdout after analysis
    #[clap(long)]
    dump_symbols: bool,

    /// Output path, defaults to the input with a .s extension
    #[clap(short = 'o', long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = AppArgs::parse();

    let source = match fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(err) => {
            ceprintln!(
                "<red,bold>error</>: cannot read {}: {}",
                args.input.display(),
                err
            );
            return ExitCode::FAILURE;
        }
    };

    let lines = LineMap::new(&source);
    let mut program = match mini::ProgramParser::new().parse(&lines, &source) {
        Ok(program) => program,
        Err(err) => {
            ceprintln!("<red,bold>error</>: {}", err);
            return ExitCode::FAILURE;
        }
    };

    if args.dump_ast {
        print!("{}", pretty::dump_program(&program));
    }

    let analysis = match frontend::analyze(&mut program) {
        Ok(analysis) => analysis,
        Err(diagnostics) => {
            for diagnostic in &diagnostics {
                ceprintln!(
                    "<red,bold>error</>: {} (line {})",
                    diagnostic,
                    diagnostic.line()
                );
            }
            return ExitCode::FAILURE;
        }
    };

    if args.dump_symbols {
        print!("{}", pretty::dump_symbols(&program, &analysis));
    }

    let asm = match backend::emit_riscv(&program, &analysis) {
        Ok(asm) => asm,
        Err(err) => {
            ceprintln!("<red,bold>error</>: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension("s"));
    if let Err(err) = fs::write(&output, asm) {
        ceprintln!(
            "<red,bold>error</>: cannot write {}: {}",
            output.display(),
            err
        );
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
