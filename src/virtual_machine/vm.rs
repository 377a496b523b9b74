//! Fetch-decode-execute engine.
//!
//! The machine owns one [`Memory`] arena, the stack pointer, the instruction
//! pointer and a run status. Each cycle:
//!
//! 1. **Fetch**: bounds-check `ip + 1` as an instruction address and advance `ip`.
//! 2. **Decode**: split the word at `ip` into tag and payload.
//! 3. **Execute**: push literals, dispatch everything else as an opcode.
//!
//! Because fetch advances `ip` before decode reads it, a jump that sets `ip`
//! to `T` resumes at `T + 1`. Programs encode jump targets as one less than
//! the index of the instruction they want to resume at.

use crate::debug;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::memory::{DATA_BASE, INSTRUCTION_BASE, Memory, Region};
use crate::virtual_machine::output::Output;
use crate::virtual_machine::program::Program;
use crate::virtual_machine::stack::Stack;
use crate::virtual_machine::word::{self, Decoded, Word};

/// Run state of a machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    /// Cycles will execute.
    Running,
    /// `HALT` executed. Terminal.
    Halted,
    /// A fatal error aborted the run. Terminal.
    Faulted,
}

/// Word-addressed virtual machine.
///
/// A single instance is not meant to be shared between callers; separate
/// instances own separate memory and can run on separate threads.
#[derive(Debug, Clone)]
pub struct VM {
    /// Stack, instructions and program data.
    memory: Memory,
    /// Stack pointer register.
    stack: Stack,
    /// Instruction pointer register.
    ip: usize,
    status: Status,
    /// Instructions executed so far.
    steps: u64,
}

impl VM {
    /// Creates a machine with zeroed memory, an empty stack and the
    /// instruction pointer one word before the instruction base.
    pub fn new() -> Self {
        Self {
            memory: Memory::new(),
            stack: Stack::new(),
            ip: INSTRUCTION_BASE - 1,
            status: Status::Running,
            steps: 0,
        }
    }

    /// Creates a machine with `program` already loaded.
    pub fn with_program(program: &Program) -> Result<Self, VMError> {
        let mut vm = Self::new();
        vm.load_program(&program.words)?;
        Ok(vm)
    }

    /// Copies `words` into the instruction region starting at its base.
    ///
    /// Registers are left untouched, so this must happen before the first
    /// [`run`](Self::run). A program longer than the region fails with
    /// `OutOfBounds` at the first address that does not fit; words before
    /// it have already been written.
    pub fn load_program(&mut self, words: &[Word]) -> Result<(), VMError> {
        for (i, word) in words.iter().enumerate() {
            self.memory
                .write(Region::Instruction, INSTRUCTION_BASE + i, *word)?;
        }
        debug!("loaded {} words at {}", words.len(), INSTRUCTION_BASE);
        Ok(())
    }

    /// Executes cycles until `HALT` or a fatal error.
    ///
    /// Output is delivered to `out` as it is produced. On error, memory and
    /// registers are left as they were when the failing instruction aborted.
    /// Running a machine that has already faulted fails with `Faulted`.
    pub fn run<O: Output>(&mut self, out: &mut O) -> Result<(), VMError> {
        let result = loop {
            match self.step(out) {
                Ok(Status::Running) => continue,
                Ok(Status::Halted) => break Ok(()),
                Ok(Status::Faulted) => break Err(VMError::Faulted),
                Err(e) => break Err(e),
            }
        };
        self.trace_final_state();
        result
    }

    /// Executes a single fetch-decode-execute cycle and returns the status
    /// after it. A halted or faulted machine does nothing.
    pub fn step<O: Output>(&mut self, out: &mut O) -> Result<Status, VMError> {
        if self.status != Status::Running {
            return Ok(self.status);
        }
        match self.cycle(out) {
            Ok(()) => {
                self.steps += 1;
                Ok(self.status)
            }
            Err(e) => {
                self.status = Status::Faulted;
                debug!("fault at {}: {}", self.ip, e);
                Err(e)
            }
        }
    }

    fn cycle<O: Output>(&mut self, out: &mut O) -> Result<(), VMError> {
        self.fetch()?;
        let decoded = self.decode()?;
        self.exec(decoded, out)
    }

    /// Advances the instruction pointer after checking the next address.
    fn fetch(&mut self) -> Result<(), VMError> {
        self.ip = Memory::check_bounds(Region::Instruction, self.ip + 1)?;
        Ok(())
    }

    /// Reads the word under the instruction pointer into tag and payload.
    fn decode(&self) -> Result<Decoded, VMError> {
        let word = self.memory.read(Region::Instruction, self.ip)?;
        Ok(word::decode(word))
    }

    fn exec<O: Output>(&mut self, decoded: Decoded, out: &mut O) -> Result<(), VMError> {
        if decoded.tag.is_literal() {
            debug!("PUSH {}", decoded.payload);
            return self.push(decoded.payload);
        }

        let instr = Instruction::try_from(decoded.payload)?;
        match instr {
            Instruction::Halt => self.op_halt(),
            Instruction::Add => self.op_arith(instr, |a, b| Ok(a.wrapping_add(b))),
            Instruction::Sub => self.op_arith(instr, |a, b| Ok(a.wrapping_sub(b))),
            Instruction::Mul => self.op_arith(instr, |a, b| Ok(a.wrapping_mul(b))),
            Instruction::Div => {
                self.op_arith(instr, |a, b| a.checked_div(b).ok_or(VMError::DivisionByZero))
            }
            Instruction::Dup => self.op_dup(),
            Instruction::Jmp => self.op_jmp(),
            Instruction::Jz => self.op_jz(),
            Instruction::Prn => self.op_prn(out),
            Instruction::PrnChar => self.op_prn_char(out),
            Instruction::Load => self.op_load(),
            Instruction::Stor => self.op_stor(),
        }
    }

    fn push(&mut self, value: Word) -> Result<(), VMError> {
        self.stack.push(&mut self.memory, value)
    }

    fn pop(&mut self) -> Result<Word, VMError> {
        self.stack.pop(&self.memory)
    }

    /// Resolves a popped jump target to an instruction address.
    fn jump_address(target: Word) -> Result<usize, VMError> {
        let address = (target as usize).saturating_add(INSTRUCTION_BASE);
        Memory::check_bounds(Region::Instruction, address)
    }

    /// Resolves a popped data offset to a program-data address.
    fn data_address(offset: Word) -> usize {
        (offset as usize).saturating_add(DATA_BASE)
    }

    fn op_halt(&mut self) -> Result<(), VMError> {
        debug!("HALT");
        self.status = Status::Halted;
        Ok(())
    }

    fn op_arith(
        &mut self,
        instr: Instruction,
        f: impl FnOnce(Word, Word) -> Result<Word, VMError>,
    ) -> Result<(), VMError> {
        let b = self.pop()?;
        let a = self.pop()?;
        debug!("{} {} {}", instr.mnemonic(), a, b);
        let result = f(a, b)?;
        self.push(result)
    }

    fn op_dup(&mut self) -> Result<(), VMError> {
        let top = self.stack.peek(&self.memory)?;
        debug!("DUP {}", top);
        self.push(top)
    }

    fn op_jmp(&mut self) -> Result<(), VMError> {
        let target = self.pop()?;
        debug!("JMP {}", target);
        self.ip = Self::jump_address(target)?;
        Ok(())
    }

    fn op_jz(&mut self) -> Result<(), VMError> {
        let target = self.pop()?;
        let address = Self::jump_address(target)?;
        let condition = self.pop()?;
        debug!("JZ {} (top of stack {})", target, condition);
        if condition == 0 {
            self.ip = address;
        }
        Ok(())
    }

    fn op_prn<O: Output>(&mut self, out: &mut O) -> Result<(), VMError> {
        let value = self.pop()?;
        debug!("PRN {}", value);
        out.write_text(&value.to_string())?;
        Ok(())
    }

    fn op_prn_char<O: Output>(&mut self, out: &mut O) -> Result<(), VMError> {
        let value = self.pop()?;
        debug!("PRNCHAR {}", value);
        let ch = char::from_u32(value).ok_or(VMError::InvalidCodepoint { value })?;
        out.write_char(ch)?;
        Ok(())
    }

    fn op_load(&mut self) -> Result<(), VMError> {
        let offset = self.pop()?;
        let value = self
            .memory
            .read(Region::ProgramData, Self::data_address(offset))?;
        debug!("LOAD {} -> {}", offset, value);
        self.push(value)
    }

    fn op_stor(&mut self) -> Result<(), VMError> {
        let offset = self.pop()?;
        let value = self.pop()?;
        debug!("STOR {} (top of stack {})", offset, value);
        self.memory
            .write(Region::ProgramData, Self::data_address(offset), value)
    }

    fn trace_final_state(&self) {
        debug!(
            "{:?} after {} steps, top of stack: {}",
            self.status,
            self.steps,
            self.top_of_stack()
                .map_or_else(|| "<empty>".to_string(), |w| w.to_string())
        );
        debug!(
            "{}",
            self.memory
                .as_slice()
                .iter()
                .map(|w| w.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack.pointer()
    }

    pub fn instruction_pointer(&self) -> usize {
        self.ip
    }

    /// Number of instructions executed.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Top stack word, or `None` when the stack is empty.
    pub fn top_of_stack(&self) -> Option<Word> {
        self.stack.peek(&self.memory).ok()
    }

    /// Live stack words, bottom first.
    pub fn stack(&self) -> &[Word] {
        self.stack.words(&self.memory)
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Reads program-data word `offset` (relative to the data base).
    pub fn data(&self, offset: usize) -> Result<Word, VMError> {
        self.memory
            .read(Region::ProgramData, offset.saturating_add(DATA_BASE))
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}
