//! EVM instruction sequences and their byte encoding.

use core::fmt;

use alloy_primitives::{Bytes, U256};
use eth_log_opcodes::Opcode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Pushes an immediate with the narrowest `PUSHn` that holds it.
    Push(U256),
    Op(Opcode),
}

impl Instruction {
    /// Pushes a memory offset, size or other small immediate.
    pub fn push(value: u64) -> Self {
        Self::Push(U256::from(value))
    }

    pub fn opcode(&self) -> Result<Opcode, eth_log_opcodes::Error> {
        match self {
            Self::Push(value) => Opcode::push(push_width(value)),
            Self::Op(op) => Ok(*op),
        }
    }

    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), eth_log_opcodes::Error> {
        out.push(self.opcode()?.into());
        if let Self::Push(value) = self {
            let word = value.to_be_bytes::<32>();
            out.extend_from_slice(&word[32 - push_width(value)..]);
        }
        Ok(())
    }
}

impl From<Opcode> for Instruction {
    fn from(op: Opcode) -> Self {
        Self::Op(op)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push(value) => write!(f, "PUSH{} {:#x}", push_width(value), value),
            Self::Op(op) => write!(f, "{op}"),
        }
    }
}

/// Immediate width in bytes; zero is pushed as a single byte.
fn push_width(value: &U256) -> usize {
    value.bit_len().div_ceil(8).max(1)
}

pub fn assemble(code: &[Instruction]) -> Result<Bytes, eth_log_opcodes::Error> {
    let mut out = Vec::new();
    for instruction in code {
        instruction.encode_to(&mut out)?;
    }
    Ok(out.into())
}

/// One mnemonic per line.
pub fn disassemble(code: &[Instruction]) -> String {
    code.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
