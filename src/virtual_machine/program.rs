//! Program container and its on-disk format.
//!
//! A serialized program is:
//!
//! ```text
//! magic "SVM_W" | major minor patch | word count (u32 LE) | words (u32 LE)...
//! ```
//!
//! The words themselves are the wire format described in
//! [`word`](super::word) and are stored verbatim.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::memory::INSTRUCTION_CAPACITY;
use crate::virtual_machine::word::{Tag, Word, encode};
use std::fs;
use std::path::Path;

/// Magic bytes identifying a serialized program.
const MAGIC: &[u8; 5] = b"SVM_W";

/// Current format version.
const CURRENT_VERSION: Version = Version::new(0, 1, 0);

const WORD_SIZE: usize = size_of::<Word>();

/// Semantic version for format compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Version {
    major: u8,
    minor: u8,
    patch: u8,
}

impl Version {
    const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

/// Ordered sequence of encoded words, ready to load into the instruction region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub words: Vec<Word>,
}

impl Program {
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Whether the program fits in the instruction region.
    pub fn fits(&self) -> bool {
        self.words.len() <= INSTRUCTION_CAPACITY
    }

    /// Serializes the program with its header.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MAGIC.len() + 3 + WORD_SIZE * (self.words.len() + 1));
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&[
            CURRENT_VERSION.major,
            CURRENT_VERSION.minor,
            CURRENT_VERSION.patch,
        ]);
        out.extend_from_slice(&(self.words.len() as u32).to_le_bytes());
        for word in &self.words {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out
    }

    /// Deserializes a program, validating header, length and trailing bytes.
    pub fn from_bytes(input: &[u8]) -> Result<Self, VMError> {
        let mut reader = Reader { input };

        if reader.take(MAGIC.len())? != MAGIC {
            return Err(decode_error("bad magic"));
        }

        let version = reader.take(3)?;
        if Version::new(version[0], version[1], version[2]) != CURRENT_VERSION {
            return Err(decode_error("unsupported version"));
        }

        let count = reader.word()? as usize;
        let expected = count.saturating_mul(WORD_SIZE);
        if reader.input.len() != expected {
            return Err(decode_error(if reader.input.len() < expected {
                "truncated"
            } else {
                "trailing bytes"
            }));
        }

        let words = (0..count)
            .map(|_| reader.word())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { words })
    }

    /// Reads and decodes a program file.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self, VMError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| VMError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Encodes and writes the program to `path`.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<(), VMError> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes()).map_err(|e| VMError::IoError {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Counts down from `start` to 0, printing each value, using program
    /// data word 0 as the counter.
    ///
    /// `start` must be at least 1 and is truncated to a 30-bit payload.
    pub fn countdown(start: u32) -> Self {
        const COUNTER: Word = 0;
        let lit = |v: u32| encode(Tag::PositiveLiteral, v);
        Self::new(vec![
            lit(start),               // 0
            COUNTER,                  // 1
            Instruction::Stor.word(), // 2  loop resumes after this word
            COUNTER,                  // 3
            Instruction::Load.word(), // 4
            lit(1),                   // 5
            Instruction::Sub.word(),  // 6
            Instruction::Dup.word(),  // 7
            COUNTER,                  // 8
            Instruction::Stor.word(), // 9
            Instruction::Dup.word(),  // 10
            Instruction::Prn.word(),  // 11
            lit(15),                  // 12
            Instruction::Jz.word(),   // 13
            lit(2),                   // 14
            Instruction::Jmp.word(),  // 15
            Instruction::Halt.word(), // 16
        ])
    }
}

impl From<Vec<Word>> for Program {
    fn from(words: Vec<Word>) -> Self {
        Self::new(words)
    }
}

fn decode_error(reason: &str) -> VMError {
    VMError::DecodeError {
        reason: reason.to_string(),
    }
}

struct Reader<'a> {
    input: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], VMError> {
        if self.input.len() < n {
            return Err(decode_error("truncated"));
        }
        let (head, rest) = self.input.split_at(n);
        self.input = rest;
        Ok(head)
    }

    fn word(&mut self) -> Result<Word, VMError> {
        let bytes = self.take(WORD_SIZE)?;
        let mut buf = [0u8; WORD_SIZE];
        buf.copy_from_slice(bytes);
        Ok(Word::from_le_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Program {
        Program::new(vec![72, Instruction::PrnChar.word(), 0x8000_0003, Instruction::Halt.word()])
    }

    #[test]
    fn bytes_round_trip() {
        let program = sample();
        assert_eq!(Program::from_bytes(&program.to_bytes()).unwrap(), program);
    }

    #[test]
    fn header_layout() {
        let bytes = Program::new(vec![0x4000_0009]).to_bytes();
        assert_eq!(&bytes[..5], b"SVM_W");
        assert_eq!(&bytes[5..8], &[0, 1, 0]);
        assert_eq!(&bytes[8..12], &1u32.to_le_bytes());
        assert_eq!(&bytes[12..], &[0x09, 0x00, 0x00, 0x40]);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            Program::from_bytes(&bytes),
            Err(VMError::DecodeError { reason }) if reason == "bad magic"
        ));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = sample().to_bytes();
        bytes[5] = 9;
        assert!(matches!(
            Program::from_bytes(&bytes),
            Err(VMError::DecodeError { reason }) if reason == "unsupported version"
        ));
    }

    #[test]
    fn rejects_truncated_and_trailing() {
        let bytes = sample().to_bytes();
        assert!(matches!(
            Program::from_bytes(&bytes[..bytes.len() - 1]),
            Err(VMError::DecodeError { reason }) if reason == "truncated"
        ));
        assert!(matches!(
            Program::from_bytes(&bytes[..3]),
            Err(VMError::DecodeError { reason }) if reason == "truncated"
        ));

        let mut longer = bytes.clone();
        longer.extend_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(
            Program::from_bytes(&longer),
            Err(VMError::DecodeError { reason }) if reason == "trailing bytes"
        ));
    }

    #[test]
    fn huge_word_count_is_truncated() {
        let mut bytes = Program::default().to_bytes();
        bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            Program::from_bytes(&bytes),
            Err(VMError::DecodeError { reason }) if reason == "truncated"
        ));
    }

    #[test]
    fn empty_program_round_trips() {
        let empty = Program::default();
        assert!(empty.is_empty());
        assert_eq!(Program::from_bytes(&empty.to_bytes()).unwrap(), empty);
    }

    #[test]
    fn countdown_fits_instruction_region() {
        let program = Program::countdown(10);
        assert_eq!(program.len(), 17);
        assert!(program.fits());
        assert_eq!(program.words[0], 10);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            Program::read_file("/nonexistent/program.bin"),
            Err(VMError::IoError { source, .. }) if source.kind() == std::io::ErrorKind::NotFound
        ));
    }
}
