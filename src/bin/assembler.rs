//! Assembly to program file compiler CLI.
//!
//! Reads assembly source files and writes serialized programs for `stackvm`.
//!
//! # Usage
//! ```text
//! assembler <input.asm> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `input.asm`: Assembly source file to compile
//!
//! # Options
//! - `-o, --output <file>`: Output file path (defaults to `<input>.bin`)
//! - `-l, --listing`: Print the disassembled words to stdout
//!
//! # Examples
//! ```text
//! assembler countdown.asm
//! assembler countdown.asm -o countdown.bin --listing
//! ```

use stackvm::virtual_machine::assembler::{assemble_file, disassemble};
use stackvm::{error, info, warn};
use std::env;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut listing = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--output" | "-o") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                output_path = Some(args[i].clone());
                i += 1;
            }
            "--listing" | "-l" => {
                listing = true;
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if !Path::new(input_path).exists() {
        error!("Input file does not exist: {}", input_path);
        process::exit(1);
    }

    let output_path = output_path.unwrap_or_else(|| {
        let p = Path::new(input_path);
        let stem = p.file_stem().unwrap_or_default().to_string_lossy();
        let parent = p.parent().unwrap_or(Path::new("."));
        parent
            .join(format!("{}.bin", stem))
            .to_string_lossy()
            .into_owned()
    });

    if let Some(parent) = Path::new(&output_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        error!("Output directory does not exist: {}", parent.display());
        process::exit(1);
    }

    // Diagnostics for source errors are logged by the assembler itself.
    let program = assemble_file(input_path).unwrap_or_else(|_| process::exit(1));

    if !program.fits() {
        warn!(
            "Program has {} words and will not fit in the instruction region",
            program.len()
        );
    }

    if let Err(e) = program.write_file(&output_path) {
        error!("Failed to write output file: {}", e);
        process::exit(1);
    }

    info!(
        "Compiled {} -> {} ({} words)",
        input_path,
        output_path,
        program.len()
    );

    if listing {
        print!("{}", disassemble(&program.words));
    }
}

const USAGE: &str = "\
Stack VM Assembler

USAGE:
    {program} <input.asm> [OPTIONS]

ARGS:
    <input.asm>    Assembly source file to compile

OPTIONS:
    -o, --output <file>     Output file path (defaults to <input>.bin)
    -l, --listing           Print the disassembled program
    -h, --help              Print this help message

EXAMPLES:
    # Compile to default output name
    {program} program.asm

    # Compile with explicit output and a listing
    {program} program.asm -o output.bin --listing
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
