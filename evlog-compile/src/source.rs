//! TOML rendition of a source unit, as consumed by the command line compiler.
//!
//! ```toml
//! [[item]]
//! kind = "event"
//! name = "Transfer"
//! params = [
//!     { name = "from", type = "address", indexed = true },
//!     { name = "amount", type = "num" },
//! ]
//!
//! [[item]]
//! kind = "function"
//! name = "send"
//!
//! [[item.log]]
//! event = "Transfer"
//! args = [{ env = "msg.sender" }, { type = "num", memory = 64 }]
//! ```

use std::{fs, path::Path};

use alloy_core::{hex, primitives::Address};
use evlog::{
    ast::{EventDeclaration, EventParameter, FunctionDecl, Item, LogCallSite, SourceUnit, StorageDecl},
    types::{Argument, EnvValue, Loc, Operand, ParseTypeError, StaticType, Value},
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid TOML format: {0}")]
    NotToml(#[from] toml::de::Error),
    #[error(transparent)]
    Type(#[from] ParseTypeError),
    #[error("`{value}` is not a valid {ty} value")]
    Value { ty: String, value: String },
    #[error("argument must give exactly one of `value`, `memory` or `env`")]
    Operand,
    #[error("argument with a `{0}` operand must declare its `type`")]
    MissingType(&'static str),
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(default, rename = "item")]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum RawItem {
    Event {
        name: String,
        #[serde(default)]
        params: Vec<RawParam>,
        #[serde(default)]
        anonymous: bool,
        line: Option<usize>,
        column: Option<usize>,
    },
    Storage {
        name: String,
        #[serde(rename = "type")]
        ty: String,
        line: Option<usize>,
        column: Option<usize>,
    },
    Function {
        name: String,
        #[serde(default, rename = "log")]
        logs: Vec<RawLog>,
        line: Option<usize>,
        column: Option<usize>,
    },
}

#[derive(Debug, Deserialize)]
struct RawParam {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    indexed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLog {
    Event {
        event: String,
        #[serde(default)]
        args: Vec<RawArg>,
        line: Option<usize>,
        column: Option<usize>,
    },
    Raw {
        #[serde(default)]
        topics: Vec<RawArg>,
        data: RawArg,
        line: Option<usize>,
        column: Option<usize>,
    },
}

#[derive(Debug, Deserialize)]
struct RawArg {
    #[serde(rename = "type")]
    ty: Option<String>,
    value: Option<toml::Value>,
    memory: Option<u64>,
    env: Option<String>,
}

/// Reads and converts a source unit file.
pub fn load(path: &Path) -> Result<SourceUnit, SourceError> {
    let content = fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<SourceUnit, SourceError> {
    let raw: RawSource = toml::from_str(content)?;
    let items = raw
        .items
        .into_iter()
        .map(convert_item)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SourceUnit::new(items))
}

fn loc(line: Option<usize>, column: Option<usize>) -> Loc {
    Loc::new(line.unwrap_or_default(), column.unwrap_or_default())
}

fn convert_item(item: RawItem) -> Result<Item, SourceError> {
    Ok(match item {
        RawItem::Event {
            name,
            params,
            anonymous,
            line,
            column,
        } => {
            let params = params
                .into_iter()
                .map(|param| {
                    Ok(EventParameter {
                        name: param.name,
                        ty: param.ty.parse()?,
                        indexed: param.indexed,
                    })
                })
                .collect::<Result<Vec<_>, SourceError>>()?;

            let mut decl = EventDeclaration::new(name, params).at(loc(line, column));
            decl.anonymous = anonymous;
            Item::Event(decl)
        }
        RawItem::Storage {
            name,
            ty,
            line,
            column,
        } => Item::Storage(StorageDecl {
            name,
            ty,
            loc: loc(line, column),
        }),
        RawItem::Function {
            name,
            logs,
            line,
            column,
        } => {
            let logs = logs
                .into_iter()
                .map(convert_log)
                .collect::<Result<Vec<_>, _>>()?;
            let mut function = FunctionDecl::new(name, logs);
            function.loc = loc(line, column);
            Item::Function(function)
        }
    })
}

fn convert_log(log: RawLog) -> Result<LogCallSite, SourceError> {
    Ok(match log {
        RawLog::Event {
            event,
            args,
            line,
            column,
        } => {
            let args = args
                .into_iter()
                .map(convert_arg)
                .collect::<Result<Vec<_>, _>>()?;
            LogCallSite::event(event, args).at(loc(line, column))
        }
        RawLog::Raw {
            topics,
            data,
            line,
            column,
        } => {
            let topics = topics
                .into_iter()
                .map(convert_arg)
                .collect::<Result<Vec<_>, _>>()?;
            LogCallSite::raw(topics, convert_arg(data)?).at(loc(line, column))
        }
    })
}

fn convert_arg(arg: RawArg) -> Result<Argument, SourceError> {
    let ty = arg.ty.as_deref().map(str::parse::<StaticType>).transpose()?;

    match (arg.value, arg.memory, arg.env) {
        (Some(value), None, None) => match ty {
            Some(ty) => {
                let value = convert_value(&ty, &value)?;
                Ok(Argument::new(ty, Operand::Const(value)))
            }
            // Untyped literals take the type of their own value.
            None => match value {
                toml::Value::Integer(int) => Ok(Argument::int(int.into())),
                toml::Value::String(text) => Ok(Argument::bytes(literal_bytes(&text)?)),
                other => Err(SourceError::MissingType(value_kind(&other))),
            },
        },
        (None, Some(offset), None) => {
            let ty = ty.ok_or(SourceError::MissingType("memory"))?;
            Ok(Argument::memory(ty, offset))
        }
        (None, None, Some(env)) => {
            let mut arg = Argument::env(env.parse::<EnvValue>()?);
            if let Some(ty) = ty {
                arg.ty = ty;
            }
            Ok(arg)
        }
        _ => Err(SourceError::Operand),
    }
}

fn convert_value(ty: &StaticType, value: &toml::Value) -> Result<Value, SourceError> {
    let invalid = || SourceError::Value {
        ty: ty.to_string(),
        value: value.to_string(),
    };

    let converted = match (ty, value) {
        (StaticType::Int128 | StaticType::Timestamp, toml::Value::Integer(int)) => Value::Int((*int).into()),
        (StaticType::Int128 | StaticType::Timestamp, toml::Value::String(text)) => {
            Value::Int(text.parse().map_err(|_| invalid())?)
        }
        (StaticType::Address, toml::Value::String(text)) => {
            Value::Address(text.parse::<Address>().map_err(|_| invalid())?)
        }
        (StaticType::Bytes { .. }, toml::Value::String(text)) => Value::Bytes(literal_bytes(text)?),
        (StaticType::Array { elem, .. }, toml::Value::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| convert_value(elem, item))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        _ => return Err(invalid()),
    };

    if !converted.conforms_to(ty) {
        return Err(invalid());
    }
    Ok(converted)
}

/// `0x`-prefixed strings are hex, anything else is taken as UTF-8 text.
fn literal_bytes(text: &str) -> Result<Vec<u8>, SourceError> {
    match text.strip_prefix("0x") {
        Some(digits) => hex::decode(digits).map_err(|_| SourceError::Value {
            ty: "hex".to_string(),
            value: text.to_string(),
        }),
        None => Ok(text.as_bytes().to_vec()),
    }
}

fn value_kind(value: &toml::Value) -> &'static str {
    match value {
        toml::Value::String(_) => "string",
        toml::Value::Integer(_) => "integer",
        toml::Value::Float(_) => "float",
        toml::Value::Boolean(_) => "boolean",
        toml::Value::Datetime(_) => "datetime",
        toml::Value::Array(_) => "array",
        toml::Value::Table(_) => "table",
    }
}
