use clap::{Parser, ValueEnum};
use kaleido_compiler::{compile_to_ir_with, CompileOptions};
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "kaleido")]
#[command(about = "A compiler front end for the Kaleidoscope language")]
struct Args {
    /// Path to the source file to compile
    file: PathBuf,

    /// Debug traces to enable, repeatable: -tc (lowering), -tp (parser),
    /// -ts (scanner)
    #[arg(short = 't', value_enum, action = clap::ArgAction::Append, value_name = "TRACE")]
    trace: Vec<TraceOpt>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum TraceOpt {
    /// Trace AST-to-IR lowering on stderr
    C,
    /// Dump the parsed AST on stderr
    P,
    /// Trace scanner tokens on stderr
    S,
}

fn main() {
    let args = Args::parse();

    let source = fs::read_to_string(&args.file).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", args.file.display(), e);
        process::exit(1);
    });

    let options = CompileOptions {
        trace_lowering: args.trace.contains(&TraceOpt::C),
        trace_parser: args.trace.contains(&TraceOpt::P),
        trace_scanner: args.trace.contains(&TraceOpt::S),
    };

    let module = compile_to_ir_with(&source, &options).unwrap_or_else(|e| {
        eprintln!("{}", e);
        process::exit(1);
    });

    for line in module.to_lines() {
        println!("{}", line);
    }
}
