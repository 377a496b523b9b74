//! Stack VM runner.
//!
//! Loads a program and runs it to completion, writing program output to
//! stdout and diagnostics to stderr.
//!
//! # Usage
//! ```text
//! stackvm <program.asm|program.bin> [OPTIONS]
//! stackvm --demo [start] [OPTIONS]
//! ```
//!
//! # Arguments
//! - `program.asm`: Assembly source, assembled before running
//! - `program.bin`: Serialized program produced by the `assembler` binary
//!
//! # Options
//! - `--demo [start]`: Run the built-in countdown (start defaults to 10)
//! - `--debug`: Trace every instruction and dump memory at the end (same as `DEBUG=1`)
//! - `--no-timestamp`: Omit timestamps from log lines

use stackvm::utils::log::{SHOW_TIMESTAMP, set_trace};
use stackvm::virtual_machine::assembler::assemble_file;
use stackvm::virtual_machine::output::WriteOutput;
use stackvm::virtual_machine::program::Program;
use stackvm::virtual_machine::vm::VM;
use stackvm::virtual_machine::word::MAX_PAYLOAD;
use stackvm::{error, info};
use std::env;
use std::path::Path;
use std::process;
use std::sync::atomic::Ordering;

const DEFAULT_COUNTDOWN: u32 = 10;

enum Source {
    Demo(u32),
    File(String),
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let mut source: Option<Source> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--demo" => {
                let mut start = DEFAULT_COUNTDOWN;
                if i + 1 < args.len() && !args[i + 1].starts_with('-') {
                    i += 1;
                    start = match args[i].parse::<u32>() {
                        Ok(n) if (1..=MAX_PAYLOAD).contains(&n) => n,
                        _ => {
                            error!("Invalid countdown start: '{}'", args[i]);
                            process::exit(1);
                        }
                    };
                }
                source = Some(Source::Demo(start));
                i += 1;
            }
            "--debug" => {
                set_trace(true);
                i += 1;
            }
            "--no-timestamp" => {
                SHOW_TIMESTAMP.store(false, Ordering::Relaxed);
                i += 1;
            }
            other if !other.starts_with('-') && source.is_none() => {
                source = Some(Source::File(other.to_string()));
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let program = match source {
        Some(Source::Demo(start)) => Program::countdown(start),
        Some(Source::File(path)) => load(&path),
        None => {
            error!("No program given");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    let mut vm = VM::with_program(&program).unwrap_or_else(|e| {
        error!("Failed to load program: {e}");
        process::exit(1)
    });

    let mut out = WriteOutput::stdout();
    let result = vm.run(&mut out);
    // Program output carries no trailing newline of its own.
    println!();

    if let Err(e) = result {
        error!(
            "{} (ip {}, sp {}, {} steps)",
            e,
            vm.instruction_pointer(),
            vm.stack_pointer(),
            vm.steps()
        );
        process::exit(1);
    }
}

/// Reads a serialized program, or assembles source for any other extension.
fn load(path: &str) -> Program {
    if !Path::new(path).exists() {
        error!("Program file does not exist: {}", path);
        process::exit(1);
    }

    let result = if Path::new(path).extension().is_some_and(|ext| ext == "bin") {
        Program::read_file(path)
    } else {
        assemble_file(path)
    };

    result.unwrap_or_else(|e| {
        error!("Failed to load {}: {}", path, e);
        process::exit(1)
    })
}

const USAGE: &str = "\
Stack VM

USAGE:
    {program} <program.asm|program.bin> [OPTIONS]
    {program} --demo [start] [OPTIONS]

ARGS:
    <program>       Assembly source or serialized program (*.bin)

OPTIONS:
    --demo [start]  Run the built-in countdown (start defaults to 10)
    --debug         Trace execution to stderr (same as DEBUG=1)
    --no-timestamp  Omit timestamps from log lines
    -h, --help      Print this help message
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
