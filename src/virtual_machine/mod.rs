//! Word-addressed stack machine.
//!
//! The VM runs programs of 32-bit tagged words loaded into a single
//! 150-word memory that is split into three fixed windows.
//!
//! # Architecture
//!
//! - **Memory**: `[0, 50)` stack, `[50, 100)` instructions, `[100, 150)` program data
//! - **Words**: 2-bit tag plus 30-bit payload; literals are pushed, primitives dispatched
//! - **Execution model**: pre-increment fetch, decode, execute until `HALT` or a fatal error
//! - **Errors**: every access goes through one bounds checker; every fault aborts the run
//!
//! # Modules
//!
//! - [`assembler`]: Assembly parsing, diagnostics and disassembly
//! - [`errors`]: Assembly, decoding and execution error types
//! - [`isa`]: Instruction set definition and opcode mappings
//! - [`memory`]: Memory arena, region layout and bounds checking
//! - [`output`]: Output sink used by `PRN` and `PRNCHAR`
//! - [`program`]: Program container, on-disk format and demo programs
//! - [`vm`]: Fetch-decode-execute engine
//! - [`word`]: Word tag/payload codec

pub mod assembler;
pub mod errors;
pub mod isa;
pub mod memory;
pub mod output;
pub mod program;
mod stack;
pub mod vm;
pub mod word;
