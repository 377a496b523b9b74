use crate::virtual_machine::memory::Region;
use thiserror::Error;

/// Errors that can occur during VM execution, program decoding or assembly.
///
/// Every execution error is fatal: the run loop stops at the offending
/// instruction and memory keeps its last written state.
#[derive(Debug, Error)]
pub enum VMError {
    /// A pointer fell outside the region it was meant to address.
    #[error("address {address} is out of bounds for {region} region")]
    OutOfBounds { region: Region, address: usize },
    /// Primitive-tagged word whose payload matches no opcode.
    #[error("unknown opcode {id}")]
    UnknownOpcode { id: u32 },
    /// `DIV` with a zero divisor on top of the stack.
    #[error("division by zero")]
    DivisionByZero,
    /// `PRNCHAR` with a value that is not a Unicode scalar value.
    #[error("value {value} is not a valid character codepoint")]
    InvalidCodepoint { value: u32 },
    /// `run` on a machine that already stopped on a fatal error.
    #[error("machine has faulted and cannot run")]
    Faulted,
    /// The host output sink failed to accept a write.
    #[error("output error: {source}")]
    Output {
        #[from]
        source: std::io::Error,
    },
    /// Serialized program could not be decoded.
    #[error("decoding error: {reason}")]
    DecodeError { reason: String },
    /// File I/O error while reading or writing a program.
    #[error("io error on {path}: {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Unrecognized mnemonic during assembly.
    #[error("invalid instruction name: {name}")]
    InvalidInstructionName { name: String },
    /// Integer or character literal that does not fit in a word payload.
    #[error("invalid literal: {token}")]
    InvalidLiteral { token: String },
    /// Label defined more than once.
    #[error("duplicate label: {label}")]
    DuplicateLabel { label: String },
    /// Reference to undefined label.
    #[error("undefined label: {label}")]
    UndefinedLabel { label: String },
    /// Label that no jump can resume at (the first word of the program).
    #[error("label {label} cannot be used as a jump target")]
    InvalidJumpTarget { label: String },
    /// Tokenizer failure with source position.
    #[error("line {line}:{offset}: {message}")]
    ParseError {
        line: usize,
        offset: usize,
        message: &'static str,
    },
    /// Assembly error with line number context.
    #[error("line {line}:{offset}: {message}")]
    AssemblyError {
        line: usize,
        offset: usize,
        message: String,
    },
}
