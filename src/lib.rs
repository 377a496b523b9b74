//! Minimal stack virtual machine.
//!
//! Provides the word codec, bounded memory, execution engine, assembler and
//! program file format, plus the leveled logger shared by the binaries.

pub mod utils;
pub mod virtual_machine;
