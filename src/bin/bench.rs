//! VM benchmark binary.
//!
//! Measures execution time for a few representative programs.
//! Run with: `cargo run --release --bin bench [-- --iterations N]`

use std::env;
use std::io;
use std::process;
use std::time::{Duration, Instant};

use stackvm::error;
use stackvm::virtual_machine::assembler::assemble_source;
use stackvm::virtual_machine::output::WriteOutput;
use stackvm::virtual_machine::program::Program;
use stackvm::virtual_machine::vm::VM;

// ---------------------------------------------------------------------------
// Benchmark harness
// ---------------------------------------------------------------------------

/// How long each benchmark runs.
#[derive(Clone, Copy)]
enum Budget {
    Time(Duration),
    Iterations(u64),
}

impl Budget {
    fn keep_going(self, start: Instant, iterations: u64) -> bool {
        match self {
            Budget::Time(min) => start.elapsed() < min,
            Budget::Iterations(n) => iterations < n,
        }
    }
}

struct BenchResult {
    name: &'static str,
    iterations: u64,
    total: Duration,
    steps: u64,
}

impl BenchResult {
    fn print(&self) {
        let ns_per_iter = self.total.as_nanos() as f64 / self.iterations.max(1) as f64;
        let ns_per_instr = if self.steps > 0 {
            format!("{:>8.1}", ns_per_iter / self.steps as f64)
        } else {
            "       -".to_string()
        };
        println!(
            "  {:<24} {:>9} iters {:>10.3} us/iter {:>8} steps  {} ns/instr",
            self.name,
            self.iterations,
            ns_per_iter / 1000.0,
            self.steps,
            ns_per_instr,
        );
    }
}

/// Loads and runs `program` until `budget` is spent, discarding output.
fn bench(name: &'static str, program: &Program, budget: Budget) -> BenchResult {
    let run = || {
        let mut vm = VM::with_program(program).unwrap_or_else(|e| {
            error!("{name}: {e}");
            process::exit(1)
        });
        vm.run(&mut WriteOutput::new(io::sink()))
            .unwrap_or_else(|e| {
                error!("{name}: {e}");
                process::exit(1)
            });
        vm.steps()
    };

    // Warmup
    for _ in 0..5 {
        run();
    }

    let mut iterations = 0u64;
    let mut steps = 0u64;
    let start = Instant::now();
    while budget.keep_going(start, iterations) {
        steps = run();
        iterations += 1;
    }

    BenchResult {
        name,
        iterations,
        total: start.elapsed(),
        steps,
    }
}

// ---------------------------------------------------------------------------
// Benchmark definitions
// ---------------------------------------------------------------------------

const HELLO_ASM: &str = r#"
    'H' PRNCHAR 'e' PRNCHAR 'l' PRNCHAR 'l' PRNCHAR 'o' PRNCHAR
    HALT
"#;

const ARITHMETIC_MIX_ASM: &str = r#"
    1000 0 STOR
loop:
    0 LOAD 1 SUB DUP 0 STOR
    3 MUL 7 ADD 2 DIV 5 SUB
    1 STOR
    0 LOAD @done JZ
    @loop JMP
done:
    HALT
"#;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut budget = Budget::Time(Duration::from_secs(2));

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--iterations" | "-n" => {
                i += 1;
                budget = match args.get(i).and_then(|s| s.parse::<u64>().ok()) {
                    Some(n) if n > 0 => Budget::Iterations(n),
                    _ => {
                        error!("--iterations requires a positive number");
                        process::exit(1);
                    }
                };
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}", other);
                process::exit(1);
            }
        }
    }

    match budget {
        Budget::Time(min) => println!("VM Benchmarks (each runs for >= {}s)\n", min.as_secs()),
        Budget::Iterations(n) => println!("VM Benchmarks ({n} iterations each)\n"),
    }
    println!(
        "  {:<24} {:>9}       {:>14} {:>14}  {:>10}",
        "benchmark", "iters", "avg time", "steps/run", "ns/instr"
    );
    println!("  {}", "-".repeat(80));

    // Pre-assemble programs (assembly cost excluded from benchmark)
    let assemble = |src: &str| {
        assemble_source(src).unwrap_or_else(|_| process::exit(1))
    };
    let hello = assemble(HELLO_ASM);
    let arith = assemble(ARITHMETIC_MIX_ASM);

    bench("hello", &hello, budget).print();
    bench("countdown(10)", &Program::countdown(10), budget).print();
    bench("countdown(10K)", &Program::countdown(10_000), budget).print();
    bench("arithmetic_mix(1K)", &arith, budget).print();

    println!();
}
