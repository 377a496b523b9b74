//! LIFO view over the stack region.
//!
//! The stack pointer indexes the current top word; 0 means empty and the
//! first push lands at address 1. Reads at the pointer go through the same
//! region check as writes, so popping or peeking an empty stack fails
//! immediately with `OutOfBounds { region: Stack, address: 0 }`.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::memory::{Memory, Region};
use crate::virtual_machine::word::Word;

/// Stack pointer register and the operations that move it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Stack {
    pointer: usize,
}

impl Stack {
    pub(crate) fn new() -> Self {
        Self { pointer: 0 }
    }

    /// Current stack pointer (index of the top word, 0 when empty).
    pub(crate) fn pointer(&self) -> usize {
        self.pointer
    }

    /// Number of live words.
    pub(crate) fn depth(&self) -> usize {
        self.pointer
    }

    /// Pushes `value`, failing when the stack region is full.
    pub(crate) fn push(&mut self, memory: &mut Memory, value: Word) -> Result<(), VMError> {
        let next = self.pointer + 1;
        memory.write(Region::Stack, next, value)?;
        self.pointer = next;
        Ok(())
    }

    /// Pops the top word.
    pub(crate) fn pop(&mut self, memory: &Memory) -> Result<Word, VMError> {
        let value = memory.read(Region::Stack, self.pointer)?;
        self.pointer -= 1;
        Ok(value)
    }

    /// Reads the top word without popping it.
    pub(crate) fn peek(&self, memory: &Memory) -> Result<Word, VMError> {
        memory.read(Region::Stack, self.pointer)
    }

    /// Live stack words, bottom first.
    pub(crate) fn words<'a>(&self, memory: &'a Memory) -> &'a [Word] {
        &memory.as_slice()[1..=self.pointer]
    }
}
