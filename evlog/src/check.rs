//! Static checking of log call sites against the declared events.

use tracing::debug;

use crate::{
    ast::LogCallSite,
    error::TypeError,
    registry::{EventRegistry, RegisteredEvent},
    types::{Argument, StaticType, TypeKind},
};

/// Event name used in diagnostics about `raw_log` call sites.
pub const RAW_LOG: &str = "raw_log";

/// A call site that passed checking, borrowing the declaration it targets.
#[derive(Debug, Clone, Copy)]
pub enum CheckedLog<'a> {
    Event {
        event: &'a RegisteredEvent,
        args: &'a [Argument],
    },
    Raw {
        topics: &'a [Argument],
        data: &'a Argument,
    },
}

pub fn check<'a>(
    registry: &'a EventRegistry,
    site: &'a LogCallSite,
) -> Result<CheckedLog<'a>, TypeError> {
    match site {
        LogCallSite::Event { event, args, loc } => {
            let registered = registry
                .get(event)
                .ok_or_else(|| TypeError::UndeclaredEvent(event.clone()))?;
            let params = &registered.decl.params;

            if params.len() != args.len() {
                return Err(TypeError::ArityMismatch {
                    event: event.clone(),
                    expected: params.len(),
                    found: args.len(),
                });
            }

            for (param, arg) in params.iter().zip(args) {
                compatible(event, &param.name, &param.ty, &arg.ty)?;
            }

            debug!("Checked log.{} at {}", event, loc);
            Ok(CheckedLog::Event {
                event: registered,
                args,
            })
        }
        LogCallSite::Raw { topics, data, loc } => {
            if topics.len() > eth_log_opcodes::MAX_TOPICS {
                return Err(TypeError::TooManyTopics(topics.len()));
            }

            for (i, topic) in topics.iter().enumerate() {
                if !topic.ty.is_word() {
                    return Err(TypeError::TypeMismatch {
                        event: RAW_LOG.to_string(),
                        param: format!("topic{i}"),
                        expected: "a 32-byte word".to_string(),
                        found: topic.ty.to_string(),
                    });
                }
            }

            if data.ty.kind() != TypeKind::Bytes {
                return Err(TypeError::TypeMismatch {
                    event: RAW_LOG.to_string(),
                    param: "data".to_string(),
                    expected: "a byte-string".to_string(),
                    found: data.ty.to_string(),
                });
            }

            debug!("Checked raw_log with {} topics at {}", topics.len(), loc);
            Ok(CheckedLog::Raw { topics, data })
        }
    }
}

/// Whether an argument of type `actual` may be passed where `declared` is
/// expected. Byte-strings and arrays may be shorter than declared.
fn compatible(
    event: &str,
    param: &str,
    declared: &StaticType,
    actual: &StaticType,
) -> Result<(), TypeError> {
    let size_mismatch = |declared: usize, found: usize| TypeError::SizeMismatch {
        event: event.to_string(),
        param: param.to_string(),
        declared,
        found,
    };

    match (declared, actual) {
        (StaticType::Bytes { max_len: declared }, StaticType::Bytes { max_len: found }) => {
            if found > declared {
                return Err(size_mismatch(*declared, *found));
            }
            Ok(())
        }
        (
            StaticType::Array {
                elem: declared_elem,
                len: declared_len,
            },
            StaticType::Array {
                elem: found_elem,
                len: found_len,
            },
        ) => {
            if found_len > declared_len {
                return Err(size_mismatch(*declared_len, *found_len));
            }
            compatible(event, param, declared_elem, found_elem)
        }
        _ if declared.kind() == actual.kind() => Ok(()),
        _ => Err(TypeError::TypeMismatch {
            event: event.to_string(),
            param: param.to_string(),
            expected: declared.to_string(),
            found: actual.to_string(),
        }),
    }
}
