#![no_std]

extern crate alloc;

use alloc::string::String;
use core::{fmt, str::FromStr};

mod error;
pub use error::Error;

/// Declares [`Opcode`] from `Variant = byte, "MNEMONIC";` entries. Attributes
/// on an entry, doc comments included, are forwarded to its variant.
macro_rules! opcodes {
    ($($(#[$attr:meta])* $variant:ident = $byte:literal, $mnemonic:literal;)*) => {
        /// EVM instruction emitted by log lowering.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($(#[$attr])* $variant = $byte,)*
        }

        impl Opcode {
            /// Every opcode, in byte order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant),*];

            /// Upper-case mnemonic as listed on evm.codes.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                }
            }
        }

        impl core::convert::TryFrom<u8> for Opcode {
            type Error = Error;

            fn try_from(byte: u8) -> Result<Self, Self::Error> {
                match byte {
                    $($byte => Ok(Opcode::$variant),)*
                    other => Err(Error::UnknownOpcode(other)),
                }
            }
        }
    };
}

opcodes! {
    /// Halts execution.
    Stop = 0x00, "STOP";
    /// Bitwise AND of the two top items.
    And = 0x16, "AND";
    /// Bitwise complement of the top item.
    Not = 0x19, "NOT";
    /// `value << shift`, with the shift on top.
    Shl = 0x1b, "SHL";
    /// `value >> shift`, with the shift on top.
    Shr = 0x1c, "SHR";
    /// Address of the executing account.
    Address = 0x30, "ADDRESS";
    /// Address of the direct caller.
    Caller = 0x33, "CALLER";
    Timestamp = 0x42, "TIMESTAMP";
    Number = 0x43, "NUMBER";
    /// Pops an offset, pushes the word at `memory[offset..offset + 32]`.
    MLoad = 0x51, "MLOAD";
    /// Pops an offset then a value, writes the value at `memory[offset]`.
    MStore = 0x52, "MSTORE";
    Push1 = 0x60, "PUSH1";
    Push2 = 0x61, "PUSH2";
    Push3 = 0x62, "PUSH3";
    Push4 = 0x63, "PUSH4";
    Push5 = 0x64, "PUSH5";
    Push6 = 0x65, "PUSH6";
    Push7 = 0x66, "PUSH7";
    Push8 = 0x67, "PUSH8";
    Push9 = 0x68, "PUSH9";
    Push10 = 0x69, "PUSH10";
    Push11 = 0x6a, "PUSH11";
    Push12 = 0x6b, "PUSH12";
    Push13 = 0x6c, "PUSH13";
    Push14 = 0x6d, "PUSH14";
    Push15 = 0x6e, "PUSH15";
    Push16 = 0x6f, "PUSH16";
    Push17 = 0x70, "PUSH17";
    Push18 = 0x71, "PUSH18";
    Push19 = 0x72, "PUSH19";
    Push20 = 0x73, "PUSH20";
    Push21 = 0x74, "PUSH21";
    Push22 = 0x75, "PUSH22";
    Push23 = 0x76, "PUSH23";
    Push24 = 0x77, "PUSH24";
    Push25 = 0x78, "PUSH25";
    Push26 = 0x79, "PUSH26";
    Push27 = 0x7a, "PUSH27";
    Push28 = 0x7b, "PUSH28";
    Push29 = 0x7c, "PUSH29";
    Push30 = 0x7d, "PUSH30";
    Push31 = 0x7e, "PUSH31";
    Push32 = 0x7f, "PUSH32";
    /// Pops offset and size, then zero to four topics for `LOG1..LOG4`.
    Log0 = 0xa0, "LOG0";
    Log1 = 0xa1, "LOG1";
    Log2 = 0xa2, "LOG2";
    Log3 = 0xa3, "LOG3";
    Log4 = 0xa4, "LOG4";
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl FromStr for Opcode {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic() == input)
            .ok_or_else(|| Error::ParseError {
                input: String::from(input).into(),
            })
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        op as Self
    }
}

/// Highest topic count a single LOG instruction accepts.
pub const MAX_TOPICS: usize = 4;

impl Opcode {
    /// `PUSHn` for an immediate of `width` bytes (1..=32).
    pub fn push(width: usize) -> Result<Self, Error> {
        match width {
            1..=32 => Self::try_from(0x5f + width as u8),
            _ => Err(Error::PushWidth(width)),
        }
    }

    /// `LOGn` for `topics` topics (0..=4).
    pub fn log(topics: usize) -> Result<Self, Error> {
        match topics {
            0 => Ok(Self::Log0),
            1 => Ok(Self::Log1),
            2 => Ok(Self::Log2),
            3 => Ok(Self::Log3),
            4 => Ok(Self::Log4),
            n => Err(Error::TopicCount(n)),
        }
    }

    /// Number of immediate bytes following the opcode.
    pub fn immediate_len(self) -> usize {
        match u8::from(self) {
            op @ 0x60..=0x7f => (op - 0x5f) as usize,
            _ => 0,
        }
    }
}
