use alloc::borrow::Cow;

/// Error related to opcode conversions
#[derive(Debug, thiserror_no_std::Error)]
pub enum Error {
    #[error("Unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),
    #[error("Parse error for opcode mnemonic. Input: {input}")]
    ParseError { input: Cow<'static, str> },
    #[error("No PUSH opcode for an immediate of {0} bytes")]
    PushWidth(usize),
    #[error("No LOG opcode for {0} topics")]
    TopicCount(usize),
}
