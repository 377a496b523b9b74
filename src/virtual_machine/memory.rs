//! Flat word memory split into three fixed regions.
//!
//! ```text
//! 0            STACK_LIMIT         DATA_BASE           MEM_SIZE
//! +------------+-------------------+-------------------+
//! |   stack    |   instructions    |   program data    |
//! +------------+-------------------+-------------------+
//! ```
//!
//! Every access names the region it intends to touch and goes through
//! [`Memory::check_bounds`], so no accessor can reach into another region's
//! window. Slot 0 of the stack region is never addressable: a stack pointer
//! of 0 means the stack is empty.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::word::Word;
use std::fmt;

/// Total number of words in machine memory.
pub const MEM_SIZE: usize = 150;
/// First address past the stack region; also the instruction region base.
pub const STACK_LIMIT: usize = 50;
/// First address of the program-data region.
pub const DATA_BASE: usize = 100;

/// Base address of the instruction region.
pub const INSTRUCTION_BASE: usize = STACK_LIMIT;
/// Number of words a loaded program may occupy.
pub const INSTRUCTION_CAPACITY: usize = DATA_BASE - INSTRUCTION_BASE;
/// Number of addressable program-data words.
pub const DATA_CAPACITY: usize = MEM_SIZE - DATA_BASE;

const _: () = assert!(0 < STACK_LIMIT && STACK_LIMIT < DATA_BASE && DATA_BASE < MEM_SIZE);

/// Address window a pointer belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Region {
    Stack,
    Instruction,
    ProgramData,
}

impl Region {
    /// Half-open address range `[start, end)` the region accepts.
    pub const fn bounds(self) -> (usize, usize) {
        match self {
            Region::Stack => (1, STACK_LIMIT),
            Region::Instruction => (STACK_LIMIT, DATA_BASE),
            Region::ProgramData => (DATA_BASE, MEM_SIZE),
        }
    }

    /// Whether `address` lies inside this region.
    pub const fn contains(self, address: usize) -> bool {
        let (start, end) = self.bounds();
        start <= address && address < end
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Region::Stack => "stack",
            Region::Instruction => "instruction",
            Region::ProgramData => "program data",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-size word arena owned by a single machine.
#[derive(Clone)]
pub struct Memory {
    words: Box<[Word; MEM_SIZE]>,
}

impl Memory {
    /// Creates zero-filled memory.
    pub fn new() -> Self {
        Self {
            words: Box::new([0; MEM_SIZE]),
        }
    }

    /// Validates `address` against `region`.
    ///
    /// Returns [`VMError::OutOfBounds`] naming the region and the offending
    /// address when the pointer falls outside the region's window.
    pub fn check_bounds(region: Region, address: usize) -> Result<usize, VMError> {
        if region.contains(address) {
            Ok(address)
        } else {
            Err(VMError::OutOfBounds { region, address })
        }
    }

    /// Reads the word at `address` after checking it against `region`.
    pub fn read(&self, region: Region, address: usize) -> Result<Word, VMError> {
        let index = Self::check_bounds(region, address)?;
        Ok(self.words[index])
    }

    /// Writes `value` at `address` after checking it against `region`.
    pub fn write(&mut self, region: Region, address: usize, value: Word) -> Result<(), VMError> {
        let index = Self::check_bounds(region, address)?;
        self.words[index] = value;
        Ok(())
    }

    /// Read-only view of the whole address space.
    pub fn as_slice(&self) -> &[Word] {
        &self.words[..]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory").field("len", &MEM_SIZE).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_cover_address_space_without_overlap() {
        for address in 1..MEM_SIZE {
            let owners = [Region::Stack, Region::Instruction, Region::ProgramData]
                .iter()
                .filter(|r| r.contains(address))
                .count();
            assert_eq!(owners, 1, "address {address}");
        }
    }

    #[test]
    fn stack_slot_zero_is_not_addressable() {
        assert!(matches!(
            Memory::check_bounds(Region::Stack, 0),
            Err(VMError::OutOfBounds {
                region: Region::Stack,
                address: 0
            })
        ));
        assert!(Memory::check_bounds(Region::Stack, 1).is_ok());
        assert!(Memory::check_bounds(Region::Stack, STACK_LIMIT - 1).is_ok());
        assert!(Memory::check_bounds(Region::Stack, STACK_LIMIT).is_err());
    }

    #[test]
    fn instruction_window_edges() {
        assert!(Memory::check_bounds(Region::Instruction, STACK_LIMIT - 1).is_err());
        assert!(Memory::check_bounds(Region::Instruction, STACK_LIMIT).is_ok());
        assert!(Memory::check_bounds(Region::Instruction, DATA_BASE - 1).is_ok());
        assert!(matches!(
            Memory::check_bounds(Region::Instruction, DATA_BASE),
            Err(VMError::OutOfBounds {
                region: Region::Instruction,
                address: DATA_BASE
            })
        ));
    }

    #[test]
    fn program_data_window_edges() {
        assert!(Memory::check_bounds(Region::ProgramData, DATA_BASE - 1).is_err());
        assert!(Memory::check_bounds(Region::ProgramData, DATA_BASE).is_ok());
        assert!(Memory::check_bounds(Region::ProgramData, MEM_SIZE - 1).is_ok());
        assert!(Memory::check_bounds(Region::ProgramData, MEM_SIZE).is_err());
        assert!(Memory::check_bounds(Region::ProgramData, usize::MAX).is_err());
    }

    #[test]
    fn write_is_rejected_outside_region() {
        let mut memory = Memory::new();
        let err = memory
            .write(Region::ProgramData, STACK_LIMIT, 7)
            .unwrap_err();
        assert!(matches!(
            err,
            VMError::OutOfBounds {
                region: Region::ProgramData,
                ..
            }
        ));
        assert_eq!(memory.as_slice()[STACK_LIMIT], 0);

        memory.write(Region::ProgramData, DATA_BASE + 3, 7).unwrap();
        assert_eq!(memory.read(Region::ProgramData, DATA_BASE + 3).unwrap(), 7);
    }

    #[test]
    fn out_of_bounds_message_names_region() {
        let err = Memory::check_bounds(Region::Instruction, 120).unwrap_err();
        assert_eq!(
            err.to_string(),
            "address 120 is out of bounds for instruction region"
        );
    }
}
