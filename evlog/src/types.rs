//! Static types, compile-time values and argument operands.
//!
//! The set of types a log may carry is closed: every operation over it is an
//! exhaustive match, so supporting a new type means extending [`StaticType`]
//! and fixing every site the compiler points at.

use core::fmt;
use std::str::FromStr;

use alloy_dyn_abi::DynSolType;
use alloy_primitives::Address;
use eth_log_opcodes::Opcode;

/// Size in bytes of a single EVM word, topic or data slot.
pub const WORD: usize = 32;

/// Source position of a declaration or call site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Loc {
    pub line: usize,
    pub column: usize,
}

impl Loc {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Statically resolved type of an event parameter or a log argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StaticType {
    /// Signed 128-bit integer.
    Int128,
    /// Block timestamp, carried as a signed 128-bit integer.
    Timestamp,
    /// 20-byte account address.
    Address,
    /// Byte-string holding at most `max_len` bytes.
    Bytes { max_len: usize },
    /// Fixed-size array; `T[k1][k2]` is `Array { Array { T, k1 }, k2 }`.
    Array { elem: Box<StaticType>, len: usize },
}

/// Logical kind used for argument/parameter compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Integer,
    Address,
    Bytes,
    Array,
}

impl StaticType {
    pub fn bytes(max_len: usize) -> Self {
        Self::Bytes { max_len }
    }

    pub fn array(elem: StaticType, len: usize) -> Self {
        Self::Array {
            elem: Box::new(elem),
            len,
        }
    }

    /// Canonical ABI type name, e.g. `int128`, `bytes3` or `int128[2][2]`.
    pub fn canonical_name(&self) -> String {
        match self {
            Self::Int128 | Self::Timestamp => "int128".to_string(),
            Self::Address => "address".to_string(),
            Self::Bytes { max_len } => format!("bytes{max_len}"),
            Self::Array { elem, len } => format!("{}[{len}]", elem.canonical_name()),
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Int128 | Self::Timestamp => TypeKind::Integer,
            Self::Address => TypeKind::Address,
            Self::Bytes { .. } => TypeKind::Bytes,
            Self::Array { .. } => TypeKind::Array,
        }
    }

    /// Width in bytes of the value once encoded into a single topic, `None` for
    /// types that never fit one word.
    pub fn topic_width(&self) -> Option<usize> {
        match self {
            Self::Int128 | Self::Timestamp | Self::Address => Some(WORD),
            Self::Bytes { max_len } => Some(*max_len),
            Self::Array { .. } => None,
        }
    }

    /// Number of 32-byte words the value occupies in the log data buffer.
    pub fn data_words(&self) -> usize {
        match self {
            Self::Int128 | Self::Timestamp | Self::Address | Self::Bytes { .. } => 1,
            Self::Array { elem, len } => elem.data_words() * len,
        }
    }

    /// Number of 32-byte words the value occupies in working memory. Byte-strings
    /// are laid out as a length word followed by their left-aligned contents.
    pub fn memory_words(&self) -> usize {
        match self {
            Self::Int128 | Self::Timestamp | Self::Address => 1,
            Self::Bytes { max_len } => 1 + max_len.div_ceil(WORD),
            Self::Array { elem, len } => elem.memory_words() * len,
        }
    }

    /// Largest byte-string length found anywhere inside the type.
    pub fn max_bytes_len(&self) -> Option<usize> {
        match self {
            Self::Int128 | Self::Timestamp | Self::Address => None,
            Self::Bytes { max_len } => Some(*max_len),
            Self::Array { elem, .. } => elem.max_bytes_len(),
        }
    }

    /// Whether the type holds no bytes at all: `bytes0` or an array of length
    /// zero at any depth. Source notation cannot express these.
    pub fn is_zero_sized(&self) -> bool {
        match self {
            Self::Int128 | Self::Timestamp | Self::Address => false,
            Self::Bytes { max_len } => *max_len == 0,
            Self::Array { elem, len } => *len == 0 || elem.is_zero_sized(),
        }
    }

    /// Whether a value of this type is a single word that can be pushed as one
    /// LOG topic.
    pub fn is_word(&self) -> bool {
        matches!(self.topic_width(), Some(width) if width <= WORD)
    }

    /// Equivalent dynamic Solidity type, used when decoding logs off-chain.
    pub fn to_sol_type(&self) -> DynSolType {
        match self {
            Self::Int128 | Self::Timestamp => DynSolType::Int(128),
            Self::Address => DynSolType::Address,
            Self::Bytes { max_len } => DynSolType::FixedBytes(*max_len),
            Self::Array { elem, len } => DynSolType::FixedArray(Box::new(elem.to_sol_type()), *len),
        }
    }
}

impl fmt::Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int128 => write!(f, "int128"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Address => write!(f, "address"),
            Self::Bytes { max_len } => write!(f, "bytes <= {max_len}"),
            Self::Array { elem, len } => write!(f, "{elem}[{len}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseTypeError {
    #[error("unknown type `{0}`")]
    Unknown(String),
    #[error("invalid byte-string length in `{0}`")]
    BytesLength(String),
    #[error("invalid array dimension in `{0}`")]
    Dimension(String),
}

impl FromStr for StaticType {
    type Err = ParseTypeError;

    /// Parses source notation: `int128` (or `num`), `timestamp`, `address`,
    /// `bytes <= N` (or `bytesN`), each optionally followed by `[k]` suffixes.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let (base, dims) = match input.find('[') {
            Some(at) => input.split_at(at),
            None => (input, ""),
        };

        let base = base.trim();
        let mut ty = match base {
            "int128" | "num" => Self::Int128,
            "timestamp" => Self::Timestamp,
            "address" => Self::Address,
            b if b.starts_with("bytes") => {
                let len = b["bytes".len()..].trim();
                let len = len.strip_prefix("<=").unwrap_or(len).trim();
                match len.parse::<usize>() {
                    Ok(max_len) if max_len > 0 => Self::Bytes { max_len },
                    _ => return Err(ParseTypeError::BytesLength(input.to_string())),
                }
            }
            _ => return Err(ParseTypeError::Unknown(input.to_string())),
        };

        let mut rest = dims.trim();
        while !rest.is_empty() {
            let dim_error = || ParseTypeError::Dimension(input.to_string());
            let inner = rest.strip_prefix('[').ok_or_else(dim_error)?;
            let close = inner.find(']').ok_or_else(dim_error)?;
            let len = inner[..close]
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|len| *len > 0)
                .ok_or_else(dim_error)?;
            ty = Self::array(ty, len);
            rest = inner[close + 1..].trim_start();
        }

        Ok(ty)
    }
}

/// Compile-time value of a literal argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i128),
    Address(Address),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
}

impl Value {
    pub fn bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self::Bytes(bytes.as_ref().to_vec())
    }

    /// Whether the value has the shape described by `ty`. Byte-strings may be
    /// shorter than the type's maximum.
    pub fn conforms_to(&self, ty: &StaticType) -> bool {
        match (self, ty) {
            (Self::Int(_), StaticType::Int128 | StaticType::Timestamp) => true,
            (Self::Address(_), StaticType::Address) => true,
            (Self::Bytes(bytes), StaticType::Bytes { max_len }) => bytes.len() <= *max_len,
            (Self::Array(items), StaticType::Array { elem, len }) => {
                items.len() == *len && items.iter().all(|item| item.conforms_to(elem))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Address(address) => write!(f, "{address}"),
            Self::Bytes(bytes) => write!(f, "{:?}", String::from_utf8_lossy(bytes)),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Values read from the execution environment by a single opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvValue {
    /// `self`
    SelfAddress,
    /// `msg.sender`
    Caller,
    /// `block.timestamp`
    Timestamp,
    /// `block.number`
    BlockNumber,
}

impl EnvValue {
    pub fn opcode(self) -> Opcode {
        match self {
            Self::SelfAddress => Opcode::Address,
            Self::Caller => Opcode::Caller,
            Self::Timestamp => Opcode::Timestamp,
            Self::BlockNumber => Opcode::Number,
        }
    }

    pub fn kind(self) -> TypeKind {
        match self {
            Self::SelfAddress | Self::Caller => TypeKind::Address,
            Self::Timestamp | Self::BlockNumber => TypeKind::Integer,
        }
    }
}

impl FromStr for EnvValue {
    type Err = ParseTypeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim() {
            "self" => Ok(Self::SelfAddress),
            "msg.sender" => Ok(Self::Caller),
            "block.timestamp" => Ok(Self::Timestamp),
            "block.number" => Ok(Self::BlockNumber),
            other => Err(ParseTypeError::Unknown(other.to_string())),
        }
    }
}

/// Where an already lowered argument lives when the log is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Literal known at compile time.
    Const(Value),
    /// Runtime value stored in working memory starting at this offset.
    Memory(u64),
    /// Runtime value produced by an environment opcode.
    Env(EnvValue),
}

/// Call-site argument: its statically resolved type and its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub ty: StaticType,
    pub operand: Operand,
}

impl Argument {
    pub fn new(ty: StaticType, operand: Operand) -> Self {
        Self { ty, operand }
    }

    pub fn int(value: i128) -> Self {
        Self::new(StaticType::Int128, Operand::Const(Value::Int(value)))
    }

    pub fn address(address: Address) -> Self {
        Self::new(StaticType::Address, Operand::Const(Value::Address(address)))
    }

    /// String literal, typed as a byte-string of exactly its own length.
    pub fn bytes(bytes: impl AsRef<[u8]>) -> Self {
        let bytes = bytes.as_ref().to_vec();
        Self::new(StaticType::bytes(bytes.len()), Operand::Const(Value::Bytes(bytes)))
    }

    pub fn memory(ty: StaticType, offset: u64) -> Self {
        Self::new(ty, Operand::Memory(offset))
    }

    pub fn env(env: EnvValue) -> Self {
        let ty = match env.kind() {
            TypeKind::Address => StaticType::Address,
            _ if env == EnvValue::Timestamp => StaticType::Timestamp,
            _ => StaticType::Int128,
        };
        Self::new(ty, Operand::Env(env))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names() {
        let cases = vec![
            (StaticType::Int128, "int128"),
            (StaticType::Timestamp, "int128"),
            (StaticType::Address, "address"),
            (StaticType::bytes(3), "bytes3"),
            (StaticType::bytes(32), "bytes32"),
            (StaticType::array(StaticType::Int128, 2), "int128[2]"),
            (StaticType::array(StaticType::Timestamp, 3), "int128[3]"),
            (
                StaticType::array(StaticType::array(StaticType::Int128, 2), 2),
                "int128[2][2]",
            ),
        ];

        for (ty, expected) in cases {
            assert_eq!(ty.canonical_name(), expected);
            assert_eq!(ty.to_sol_type().sol_type_name(), expected, "sol name for {ty}");
        }
    }

    #[test]
    fn test_parse_types() {
        let cases = vec![
            ("num", StaticType::Int128),
            ("int128", StaticType::Int128),
            ("timestamp", StaticType::Timestamp),
            ("address", StaticType::Address),
            ("bytes <= 3", StaticType::bytes(3)),
            ("bytes<=31", StaticType::bytes(31)),
            ("bytes4", StaticType::bytes(4)),
            ("num[2]", StaticType::array(StaticType::Int128, 2)),
            (
                "int128[2][3]",
                StaticType::array(StaticType::array(StaticType::Int128, 2), 3),
            ),
            (
                "bytes <= 5 [4]",
                StaticType::array(StaticType::bytes(5), 4),
            ),
        ];

        for (input, expected) in cases {
            assert_eq!(input.parse::<StaticType>().unwrap(), expected, "parsing {input}");
        }

        assert!(matches!("decimal".parse::<StaticType>(), Err(ParseTypeError::Unknown(_))));
        assert!(matches!("bytes <= 0".parse::<StaticType>(), Err(ParseTypeError::BytesLength(_))));
        assert!(matches!("bytes".parse::<StaticType>(), Err(ParseTypeError::BytesLength(_))));
        assert!(matches!("num[0]".parse::<StaticType>(), Err(ParseTypeError::Dimension(_))));
        assert!(matches!("num[2".parse::<StaticType>(), Err(ParseTypeError::Dimension(_))));
    }

    #[test]
    fn test_widths() {
        let nested = StaticType::array(StaticType::array(StaticType::bytes(4), 2), 3);
        assert_eq!(nested.data_words(), 6);
        assert_eq!(nested.memory_words(), 12);
        assert_eq!(nested.topic_width(), None);
        assert_eq!(nested.max_bytes_len(), Some(4));

        assert_eq!(StaticType::bytes(100).memory_words(), 5);

        assert!(StaticType::bytes(0).is_zero_sized());
        assert!(StaticType::array(StaticType::Int128, 0).is_zero_sized());
        assert!(StaticType::array(StaticType::array(StaticType::bytes(0), 2), 2).is_zero_sized());
        assert!(!nested.is_zero_sized());

        assert!(StaticType::Address.is_word());
        assert!(StaticType::bytes(32).is_word());
        assert!(!StaticType::bytes(33).is_word());
    }

    #[test]
    fn test_value_shapes() {
        let ty = StaticType::array(StaticType::bytes(3), 2);
        assert!(Value::Array(vec![Value::bytes("ab"), Value::bytes("abc")]).conforms_to(&ty));
        assert!(!Value::Array(vec![Value::bytes("abcd"), Value::bytes("a")]).conforms_to(&ty));
        assert!(!Value::Array(vec![Value::bytes("a")]).conforms_to(&ty));
        assert!(Value::Int(-1).conforms_to(&StaticType::Timestamp));
        assert!(!Value::Int(1).conforms_to(&StaticType::Address));
    }
}
