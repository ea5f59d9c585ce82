//! Selection and emission of the `LOGn` instruction for an encoded log.

use alloy_primitives::{B256, U256};
use eth_log_opcodes::Opcode;
use serde::{Deserialize, Serialize};

use crate::{
    asm::Instruction,
    encode::{DataBuffer, EncodedLog, WordExpr},
    error::InternalError,
    types::WORD,
};

/// Working-memory offset where data buffers are assembled by default.
pub const DEFAULT_SCRATCH_OFFSET: u64 = 0x1000;

/// Placement of emitted log buffers in working memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLayout {
    /// Start of the scratch area. Must not overlap memory holding operands.
    pub scratch_offset: u64,
}

impl Default for LogLayout {
    fn default() -> Self {
        Self {
            scratch_offset: DEFAULT_SCRATCH_OFFSET,
        }
    }
}

/// Emits the instructions producing `log`: the data region is written first,
/// then topics are pushed last-to-first so topic 0 ends up right below the
/// data operands, as `LOGn` pops `offset`, `size`, `topic0`, ...
///
/// Operands read from working memory must lie outside the part of the scratch
/// area the log writes, since they are loaded while it is being filled.
pub fn emit(log: &EncodedLog, layout: &LogLayout) -> Result<Vec<Instruction>, InternalError> {
    let op = Opcode::log(log.topics.len())
        .map_err(|_| InternalError::TopicCount(log.topics.len()))?;

    let written = match &log.data {
        DataBuffer::Words(words) => Some(words.len()),
        DataBuffer::Const(bytes) => Some(bytes.len().div_ceil(WORD)),
        DataBuffer::Memory(_) => None,
    };
    if let Some(words) = written {
        let end = word_offset(layout.scratch_offset, words)?;
        check_reads(log, layout.scratch_offset, end)?;
    }

    let mut code = Vec::new();
    let (offset, size) = match &log.data {
        DataBuffer::Words(words) => {
            for (i, word) in words.iter().enumerate() {
                push_word(word, &mut code)?;
                store_at(word_offset(layout.scratch_offset, i)?, &mut code);
            }
            (
                const_word(layout.scratch_offset),
                const_word((words.len() * WORD) as u64),
            )
        }
        DataBuffer::Const(bytes) => {
            for (i, chunk) in bytes.chunks(WORD).enumerate() {
                code.push(Instruction::Push(U256::from_be_slice(&padded(chunk))));
                store_at(word_offset(layout.scratch_offset, i)?, &mut code);
            }
            (
                const_word(layout.scratch_offset),
                const_word(bytes.len() as u64),
            )
        }
        DataBuffer::Memory(at) => (const_word(word_offset(*at, 1)?), WordExpr::Load(*at)),
    };

    for topic in log.topics.iter().rev() {
        push_word(topic, &mut code)?;
    }
    push_word(&size, &mut code)?;
    push_word(&offset, &mut code)?;
    code.push(op.into());

    Ok(code)
}

/// Offset of the word `words` words past `base`.
fn word_offset(base: u64, words: usize) -> Result<u64, InternalError> {
    words
        .checked_mul(WORD)
        .and_then(|len| u64::try_from(len).ok())
        .and_then(|len| base.checked_add(len))
        .ok_or(InternalError::MemoryOverflow(base))
}

/// Memory range `[start, end)` read by a word.
fn read_range(word: &WordExpr) -> Result<Option<(u64, u64)>, InternalError> {
    Ok(match word {
        WordExpr::Load(at) => Some((*at, word_offset(*at, 1)?)),
        // Length word followed by the contents word.
        WordExpr::LoadBytes(at) => Some((*at, word_offset(*at, 2)?)),
        WordExpr::Const(_) | WordExpr::Env(_) => None,
    })
}

fn check_reads(log: &EncodedLog, start: u64, end: u64) -> Result<(), InternalError> {
    let data = match &log.data {
        DataBuffer::Words(words) => words.as_slice(),
        DataBuffer::Const(_) | DataBuffer::Memory(_) => &[],
    };

    for word in log.topics.iter().chain(data) {
        if let Some((from, to)) = read_range(word)? {
            if from < end && start < to {
                return Err(InternalError::ScratchOverlap {
                    offset: from,
                    scratch_offset: start,
                });
            }
        }
    }
    Ok(())
}

fn push_word(word: &WordExpr, code: &mut Vec<Instruction>) -> Result<(), InternalError> {
    match word {
        WordExpr::Const(value) => code.push(Instruction::Push(U256::from_be_bytes(value.0))),
        WordExpr::Load(at) => {
            code.push(Instruction::push(*at));
            code.push(Opcode::MLoad.into());
        }
        WordExpr::LoadBytes(at) => {
            // mask = ~(2^256 - 1 >> len * 8), keeping the first `len` bytes
            code.push(Instruction::Push(U256::MAX));
            code.push(Instruction::push(*at));
            code.push(Opcode::MLoad.into());
            code.push(Instruction::push(3));
            code.push(Opcode::Shl.into());
            code.push(Opcode::Shr.into());
            code.push(Opcode::Not.into());
            code.push(Instruction::push(word_offset(*at, 1)?));
            code.push(Opcode::MLoad.into());
            code.push(Opcode::And.into());
        }
        WordExpr::Env(env) => code.push(env.opcode().into()),
    }
    Ok(())
}

fn const_word(value: u64) -> WordExpr {
    WordExpr::Const(B256::from(U256::from(value).to_be_bytes::<32>()))
}

fn store_at(at: u64, code: &mut Vec<Instruction>) {
    code.push(Instruction::push(at));
    code.push(Opcode::MStore.into());
}

fn padded(chunk: &[u8]) -> [u8; WORD] {
    let mut word = [0; WORD];
    word[..chunk.len()].copy_from_slice(chunk);
    word
}
