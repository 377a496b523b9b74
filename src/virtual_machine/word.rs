//! Encoded word layout.
//!
//! Every word loaded into the instruction region is a `u32`:
//!
//! ```text
//!  31 30 29                                                   0
//! +-----+------------------------------------------------------+
//! | tag |                      payload                         |
//! +-----+------------------------------------------------------+
//! ```
//!
//! | Tag | Meaning                                   |
//! |-----|-------------------------------------------|
//! | 0   | positive literal (payload is the value)   |
//! | 1   | primitive instruction (payload is opcode) |
//! | 2   | negative literal (payload is magnitude)   |
//! | 3   | reserved                                  |
//!
//! Decoding is total: every `u32` has a tag and a payload. Whether a payload
//! names a real opcode is decided at dispatch time by the VM.

use crate::virtual_machine::isa::Instruction;
use std::fmt;

/// A 32-bit encoded word.
pub type Word = u32;

const TAG_SHIFT: u32 = 30;
const TAG_MASK: Word = 0xC000_0000;
const PAYLOAD_MASK: Word = 0x3FFF_FFFF;

/// Largest value a payload can carry.
pub const MAX_PAYLOAD: u32 = PAYLOAD_MASK;

/// Two-bit classification of an encoded word.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Tag {
    PositiveLiteral = 0,
    Primitive = 1,
    NegativeLiteral = 2,
    Reserved = 3,
}

impl Tag {
    /// Maps the low two bits of `bits` to a tag.
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0 => Tag::PositiveLiteral,
            1 => Tag::Primitive,
            2 => Tag::NegativeLiteral,
            _ => Tag::Reserved,
        }
    }

    /// Literal words are pushed; everything else is dispatched as an opcode.
    pub const fn is_literal(self) -> bool {
        matches!(self, Tag::PositiveLiteral | Tag::NegativeLiteral)
    }
}

/// Extracts bits 31..30.
#[inline]
pub const fn classify(word: Word) -> Tag {
    Tag::from_bits((word & TAG_MASK) >> TAG_SHIFT)
}

/// Extracts bits 29..0.
#[inline]
pub const fn payload(word: Word) -> u32 {
    word & PAYLOAD_MASK
}

/// Packs a tag and payload. Payload bits above bit 29 are discarded.
#[inline]
pub const fn encode(tag: Tag, payload: u32) -> Word {
    ((tag as u32) << TAG_SHIFT) | (payload & PAYLOAD_MASK)
}

/// Encodes a signed literal as positive or negative magnitude.
///
/// Returns `None` when the magnitude does not fit in 30 bits.
pub fn literal(value: i64) -> Option<Word> {
    let magnitude = u32::try_from(value.unsigned_abs()).ok()?;
    if magnitude > MAX_PAYLOAD {
        return None;
    }
    let tag = if value < 0 {
        Tag::NegativeLiteral
    } else {
        Tag::PositiveLiteral
    };
    Some(encode(tag, magnitude))
}

/// Tag and payload of a single word, the contents of the type and data
/// registers for one cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Decoded {
    pub tag: Tag,
    pub payload: u32,
}

/// Splits a word into its registers. Pure; holds no state between cycles.
#[inline]
pub const fn decode(word: Word) -> Decoded {
    Decoded {
        tag: classify(word),
        payload: payload(word),
    }
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            Tag::PositiveLiteral => write!(f, "{}", self.payload),
            Tag::NegativeLiteral => write!(f, "-{}", self.payload),
            Tag::Primitive | Tag::Reserved => match Instruction::try_from(self.payload) {
                Ok(instr) => f.write_str(instr.mnemonic()),
                Err(_) => write!(f, "?{}", self.payload),
            },
        }
    }
}
