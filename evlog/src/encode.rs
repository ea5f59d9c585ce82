//! Lowering of checked call sites into topic words and a data buffer.
//!
//! Topic 0 of a non-anonymous event is its signature hash, followed by one
//! topic per indexed parameter in declaration order. Every other parameter is
//! packed into the data buffer, one 32-byte word per scalar and arrays
//! unrolled row-major.

use alloy_primitives::{Bytes, B256};
use tracing::trace;

use crate::{
    check::CheckedLog,
    error::InternalError,
    types::{Argument, EnvValue, Operand, StaticType, TypeKind, Value, WORD},
};

/// A single 32-byte word, as it will be produced at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordExpr {
    Const(B256),
    /// Word stored in working memory at this offset.
    Load(u64),
    /// Byte-string at this offset, its contents masked to its runtime length.
    LoadBytes(u64),
    Env(EnvValue),
}

/// Contents of the log data region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataBuffer {
    /// Words written one after the other into the scratch area.
    Words(Vec<WordExpr>),
    /// Constant bytes, logged without padding.
    Const(Bytes),
    /// Byte-string already in working memory, logged in place.
    Memory(u64),
}

impl DataBuffer {
    /// Length in bytes when known at compile time.
    pub fn static_len(&self) -> Option<usize> {
        match self {
            Self::Words(words) => Some(words.len() * WORD),
            Self::Const(bytes) => Some(bytes.len()),
            Self::Memory(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedLog {
    pub topics: Vec<WordExpr>,
    pub data: DataBuffer,
}

pub fn encode(checked: &CheckedLog<'_>) -> Result<EncodedLog, InternalError> {
    let encoded = match checked {
        CheckedLog::Event { event, args } => {
            let mut topics = Vec::new();
            if !event.decl.anonymous {
                topics.push(WordExpr::Const(event.signature.hash));
            }

            let mut words = Vec::new();
            for (param, arg) in event.decl.params.iter().zip(args.iter()) {
                if param.indexed {
                    topics.push(topic_word(arg)?);
                } else {
                    push_data(&param.ty, &arg.ty, &arg.operand, &mut words)?;
                }
            }

            trace!(
                "Encoded {} with {} topics and {} data words",
                event.signature.text,
                topics.len(),
                words.len()
            );
            EncodedLog {
                topics,
                data: DataBuffer::Words(words),
            }
        }
        CheckedLog::Raw { topics, data } => {
            let topics = topics
                .iter()
                .map(topic_word)
                .collect::<Result<Vec<_>, _>>()?;

            let data = match &data.operand {
                Operand::Const(Value::Bytes(bytes)) => DataBuffer::Const(bytes.clone().into()),
                Operand::Memory(offset) if data.ty.kind() == TypeKind::Bytes => {
                    DataBuffer::Memory(*offset)
                }
                operand => return Err(operand_error(operand, &data.ty)),
            };

            EncodedLog { topics, data }
        }
    };

    Ok(encoded)
}

/// Signed integer sign-extended to a full word.
pub fn int_word(value: i128) -> B256 {
    let mut word = if value < 0 { [0xff; WORD] } else { [0; WORD] };
    word[16..].copy_from_slice(&value.to_be_bytes());
    B256::from(word)
}

/// Byte-string left-aligned and right-padded with zeros.
pub fn bytes_word(bytes: &[u8]) -> Option<B256> {
    (bytes.len() <= WORD).then(|| B256::right_padding_from(bytes))
}

fn topic_word(arg: &Argument) -> Result<WordExpr, InternalError> {
    let mut words = Vec::with_capacity(1);
    push_words(&arg.ty, &arg.operand, &mut words)?;
    match <[WordExpr; 1]>::try_from(words) {
        Ok([word]) => Ok(word),
        Err(_) => Err(operand_error(&arg.operand, &arg.ty)),
    }
}

/// Data words of an argument of type `ty` passed for a parameter declared as
/// `declared`. Arrays shorter than declared are filled up with zero words.
fn push_data(
    declared: &StaticType,
    ty: &StaticType,
    operand: &Operand,
    out: &mut Vec<WordExpr>,
) -> Result<(), InternalError> {
    let (
        StaticType::Array {
            elem: declared_elem,
            len: declared_len,
        },
        StaticType::Array { elem, len },
    ) = (declared, ty)
    else {
        return push_words(ty, operand, out);
    };

    if len > declared_len {
        return Err(operand_error(operand, declared));
    }

    for i in 0..*len {
        let item = match operand {
            Operand::Const(Value::Array(items)) if items.len() == *len => Operand::Const(items[i].clone()),
            Operand::Const(value) => {
                return Err(InternalError::ValueShape {
                    value: value.to_string(),
                    ty: ty.to_string(),
                })
            }
            Operand::Memory(offset) => Operand::Memory(element_offset(*offset, elem, i)?),
            Operand::Env(_) => return Err(operand_error(operand, ty)),
        };
        push_data(declared_elem, elem, &item, out)?;
    }

    let missing = (declared_len - len) * declared_elem.data_words();
    out.extend(std::iter::repeat(WordExpr::Const(B256::ZERO)).take(missing));
    Ok(())
}

fn push_words(
    ty: &StaticType,
    operand: &Operand,
    out: &mut Vec<WordExpr>,
) -> Result<(), InternalError> {
    match operand {
        Operand::Const(value) => {
            if !value.conforms_to(ty) {
                return Err(InternalError::ValueShape {
                    value: value.to_string(),
                    ty: ty.to_string(),
                });
            }
            const_words(value, ty, out)
        }
        Operand::Memory(offset) => memory_words(ty, *offset, out),
        Operand::Env(env) if env.kind() == ty.kind() => {
            out.push(WordExpr::Env(*env));
            Ok(())
        }
        Operand::Env(_) => Err(operand_error(operand, ty)),
    }
}

fn const_words(value: &Value, ty: &StaticType, out: &mut Vec<WordExpr>) -> Result<(), InternalError> {
    let word = match value {
        Value::Int(value) => int_word(*value),
        Value::Address(address) => address.into_word(),
        Value::Bytes(bytes) => bytes_word(bytes).ok_or_else(|| InternalError::ValueShape {
            value: value.to_string(),
            ty: ty.to_string(),
        })?,
        Value::Array(items) => {
            let StaticType::Array { elem, .. } = ty else {
                return Err(InternalError::ValueShape {
                    value: value.to_string(),
                    ty: ty.to_string(),
                });
            };
            for item in items {
                const_words(item, elem, out)?;
            }
            return Ok(());
        }
    };

    out.push(WordExpr::Const(word));
    Ok(())
}

fn memory_words(ty: &StaticType, offset: u64, out: &mut Vec<WordExpr>) -> Result<(), InternalError> {
    match ty {
        StaticType::Int128 | StaticType::Timestamp | StaticType::Address => {
            out.push(WordExpr::Load(offset))
        }
        StaticType::Bytes { .. } => out.push(WordExpr::LoadBytes(offset)),
        StaticType::Array { elem, len } => {
            for i in 0..*len {
                memory_words(elem, element_offset(offset, elem, i)?, out)?;
            }
        }
    }
    Ok(())
}

/// Offset of element `index` of an array of `elem` stored at `offset`.
fn element_offset(offset: u64, elem: &StaticType, index: usize) -> Result<u64, InternalError> {
    elem.memory_words()
        .checked_mul(WORD)
        .and_then(|stride| stride.checked_mul(index))
        .and_then(|len| u64::try_from(len).ok())
        .and_then(|len| offset.checked_add(len))
        .ok_or(InternalError::MemoryOverflow(offset))
}

fn operand_error(operand: &Operand, ty: &StaticType) -> InternalError {
    InternalError::Operand {
        operand: format!("{operand:?}"),
        ty: ty.to_string(),
    }
}
