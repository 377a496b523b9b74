//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical opcode table and invokes a callback macro for code generation, so
//! the VM, the assembler and the tests share one definition.
//!
//! This module generates:
//! - The [`Instruction`] enum with opcode ids
//! - `TryFrom<u32>` for decoding the payload of a primitive word
//! - Mnemonic lookup in both directions
//!
//! Operands live on the evaluation stack; an instruction word carries nothing
//! but its opcode id in the payload (see [`word`](super::word)).

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::word::{Tag, Word, encode};

/// Invokes a callback macro with the complete instruction definition list.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            /// HALT ; stop the machine
            Halt = 0, "HALT",
            /// ADD ( a b -- a+b )
            Add = 1, "ADD",
            /// SUB ( a b -- a-b )
            Sub = 2, "SUB",
            /// MUL ( a b -- a*b )
            Mul = 3, "MUL",
            /// DIV ( a b -- a/b ) ; trap on division by zero
            Div = 4, "DIV",
            /// DUP ( a -- a a )
            Dup = 5, "DUP",
            /// JMP ( t -- ) ; resume at instruction t+1
            Jmp = 6, "JMP",
            /// JZ ( c t -- ) ; resume at instruction t+1 when c == 0
            Jz = 7, "JZ",
            /// PRN ( a -- ) ; write a as decimal text
            Prn = 8, "PRN",
            /// PRNCHAR ( a -- ) ; write a as a single character
            PrnChar = 9, "PRNCHAR",
            /// LOAD ( addr -- data[addr] )
            Load = 10, "LOAD",
            /// STOR ( v addr -- ) ; data[addr] = v
            Stor = 11, "STOR",
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal
        ),* $(,)?
    ) => {
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Instruction {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<u32> for Instruction {
            type Error = VMError;

            fn try_from(value: u32) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Instruction::$name), )*
                    _ => Err(VMError::UnknownOpcode { id: value }),
                }
            }
        }

        impl Instruction {
            /// Every instruction in opcode order.
            pub const ALL: &'static [Instruction] = &[ $( Instruction::$name, )* ];

            /// Returns the assembly mnemonic for this instruction.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Instruction::$name => $mnemonic, )*
                }
            }

            /// Looks up an instruction by its assembly mnemonic.
            pub fn from_mnemonic(name: &str) -> Result<Self, VMError> {
                match name {
                    $( $mnemonic => Ok(Instruction::$name), )*
                    _ => Err(VMError::InvalidInstructionName {
                        name: name.to_string(),
                    }),
                }
            }
        }
    };
}

for_each_instruction!(define_instructions);

impl Instruction {
    /// Opcode id carried in the payload.
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Encodes this instruction as a primitive-tagged word.
    pub const fn word(self) -> Word {
        encode(Tag::Primitive, self as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_try_from_invalid() {
        assert!(matches!(
            Instruction::try_from(12),
            Err(VMError::UnknownOpcode { id: 12 })
        ));
        assert!(matches!(
            Instruction::try_from(0x3FFF_FFFF),
            Err(VMError::UnknownOpcode { .. })
        ));
    }

    #[test]
    fn words_match_published_encoding() {
        assert_eq!(Instruction::Halt.word(), 0x4000_0000);
        assert_eq!(Instruction::Sub.word(), 0x4000_0002);
        assert_eq!(Instruction::Dup.word(), 0x4000_0005);
        assert_eq!(Instruction::Jmp.word(), 0x4000_0006);
        assert_eq!(Instruction::Jz.word(), 0x4000_0007);
        assert_eq!(Instruction::Prn.word(), 0x4000_0008);
        assert_eq!(Instruction::PrnChar.word(), 0x4000_0009);
        assert_eq!(Instruction::Load.word(), 0x4000_000A);
        assert_eq!(Instruction::Stor.word(), 0x4000_000B);
    }

    #[test]
    fn mnemonic_lookup_is_inverse() {
        for instr in Instruction::ALL {
            assert_eq!(Instruction::from_mnemonic(instr.mnemonic()).unwrap(), *instr);
            assert_eq!(Instruction::try_from(instr.id()).unwrap(), *instr);
        }
        assert!(matches!(
            Instruction::from_mnemonic("add"),
            Err(VMError::InvalidInstructionName { .. })
        ));
    }
}
