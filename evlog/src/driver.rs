//! Compilation of a source unit's events and log statements.
//!
//! The driver makes three passes over a unit in source order:
//! 1. register every event declaration, noting the first other top-level item
//! 2. check every log call site of every function
//! 3. lower each function into bytecode, only if no error was reported
//!
//! User errors are collected so that a single run reports all of them, while
//! an internal error aborts the compilation at once.

use alloy_primitives::Bytes;
use eth_log_opcodes::Opcode;
use tracing::{debug, info, warn};

use crate::{
    asm::{self, Instruction},
    ast::{Item, SourceUnit},
    check::{check, CheckedLog},
    emit::{emit, LogLayout},
    encode::encode,
    error::{CompileError, Diagnostics, InternalError},
    registry::EventRegistry,
    signature::EventMetadata,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub layout: LogLayout,
    /// Terminate every function body with `STOP`.
    pub emit_stop: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            layout: LogLayout::default(),
            emit_stop: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFunction {
    pub name: String,
    pub code: Vec<Instruction>,
    pub bytecode: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    /// Metadata of every declared event, in declaration order.
    pub events: Vec<EventMetadata>,
    pub functions: Vec<CompiledFunction>,
}

impl Artifacts {
    pub fn function(&self, name: &str) -> Option<&CompiledFunction> {
        self.functions.iter().find(|function| function.name == name)
    }

    /// JSON ABI listing the unit's events.
    pub fn abi(&self) -> serde_json::Value {
        serde_json::Value::Array(self.events.iter().map(EventMetadata::to_json_abi).collect())
    }
}

pub fn compile(unit: &SourceUnit, options: &CompileOptions) -> Result<Artifacts, Diagnostics> {
    let mut errors = Vec::new();

    let mut registry = EventRegistry::new();
    for item in &unit.items {
        match item {
            Item::Event(decl) => {
                if let Err(source) = registry.register(decl.clone()) {
                    warn!("{}: {}", decl.loc, source);
                    errors.push(CompileError::Decl {
                        loc: decl.loc,
                        source,
                    });
                }
            }
            Item::Storage(_) | Item::Function(_) => {
                if !registry.is_sealed() {
                    debug!("First {} ends the event declarations", item.kind());
                }
                registry.seal();
            }
        }
    }

    let mut checked = Vec::new();
    for item in &unit.items {
        let Item::Function(function) = item else {
            continue;
        };

        let mut logs: Vec<CheckedLog<'_>> = Vec::with_capacity(function.logs.len());
        for site in &function.logs {
            match check(&registry, site) {
                Ok(log) => logs.push(log),
                Err(source) => {
                    warn!("{}: {}", site.loc(), source);
                    errors.push(CompileError::Type {
                        loc: site.loc(),
                        source,
                    });
                }
            }
        }
        checked.push((function, logs));
    }

    if !errors.is_empty() {
        return Err(Diagnostics(errors));
    }

    let mut functions = Vec::with_capacity(checked.len());
    for (function, logs) in checked {
        let code = lower(&logs, options).map_err(|err| Diagnostics(vec![err.into()]))?;
        let bytecode =
            asm::assemble(&code).map_err(|err| Diagnostics(vec![InternalError::Assemble(err.to_string()).into()]))?;

        debug!(
            "Lowered {} with {} logs into {} bytes",
            function.name,
            logs.len(),
            bytecode.len()
        );
        functions.push(CompiledFunction {
            name: function.name.clone(),
            code,
            bytecode,
        });
    }

    info!(
        "Compiled {} events and {} functions",
        registry.len(),
        functions.len()
    );

    Ok(Artifacts {
        events: registry
            .events()
            .iter()
            .map(|event| event.metadata.clone())
            .collect(),
        functions,
    })
}

fn lower(logs: &[CheckedLog<'_>], options: &CompileOptions) -> Result<Vec<Instruction>, InternalError> {
    let mut code = Vec::new();
    for log in logs {
        let encoded = encode(log)?;
        code.extend(emit(&encoded, &options.layout)?);
    }
    if options.emit_stop {
        code.push(Opcode::Stop.into());
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{EventDeclaration, EventParameter, FunctionDecl, LogCallSite, StorageDecl},
        error::{DeclError, TypeError},
        types::{Argument, Loc, StaticType},
    };

    fn event(name: &str, params: Vec<EventParameter>) -> Item {
        Item::Event(EventDeclaration::new(name, params))
    }

    fn function(name: &str, logs: Vec<LogCallSite>) -> Item {
        Item::Function(FunctionDecl::new(name, logs))
    }

    #[test]
    fn test_empty_event() {
        let unit = SourceUnit::new(vec![
            event("MyLog", vec![]),
            function("foo", vec![LogCallSite::event("MyLog", vec![])]),
        ]);

        let artifacts = compile(&unit, &CompileOptions::default()).unwrap();
        assert_eq!(artifacts.events.len(), 1);
        assert_eq!(artifacts.events[0].name, "MyLog");

        let foo = artifacts.function("foo").unwrap();
        assert_eq!(foo.code.last(), Some(&Instruction::Op(Opcode::Stop)));
        assert!(foo.code.contains(&Instruction::Op(Opcode::Log1)));
        assert!(artifacts.function("bar").is_none());
    }

    #[test]
    fn test_without_stop() {
        let unit = SourceUnit::new(vec![function(
            "foo",
            vec![LogCallSite::raw(vec![], Argument::bytes(""))],
        )]);
        let options = CompileOptions {
            emit_stop: false,
            ..Default::default()
        };

        let artifacts = compile(&unit, &options).unwrap();
        assert_eq!(
            artifacts.function("foo").unwrap().code.last(),
            Some(&Instruction::Op(Opcode::Log0))
        );
    }

    #[test]
    fn test_event_after_storage() {
        let unit = SourceUnit::new(vec![
            Item::Storage(StorageDecl {
                name: "x".into(),
                ty: "int128".into(),
                loc: Loc::new(1, 1),
            }),
            Item::Event(EventDeclaration::new("MyLog", vec![]).at(Loc::new(2, 1))),
        ]);

        let diagnostics = compile(&unit, &CompileOptions::default()).unwrap_err();
        assert_eq!(
            diagnostics.errors(),
            &[CompileError::Decl {
                loc: Loc::new(2, 1),
                source: DeclError::MisplacedDeclaration("MyLog".into())
            }]
        );
    }

    #[test]
    fn test_all_errors_reported() {
        let unit = SourceUnit::new(vec![
            event("MyLog", vec![EventParameter::new("arg1", StaticType::bytes(3))]),
            event("MyLog", vec![]),
            function(
                "foo",
                vec![
                    LogCallSite::event("YourLog", vec![]).at(Loc::new(5, 5)),
                    LogCallSite::event("MyLog", vec![Argument::bytes("bars")]).at(Loc::new(6, 5)),
                    LogCallSite::event("MyLog", vec![Argument::bytes("bar")]),
                ],
            ),
            function(
                "bar",
                vec![LogCallSite::raw(vec![Argument::int(1); 5], Argument::bytes(""))],
            ),
        ]);

        let diagnostics = compile(&unit, &CompileOptions::default()).unwrap_err();
        assert_eq!(diagnostics.errors().len(), 4);
        assert_eq!(
            diagnostics.decl_errors().collect::<Vec<_>>(),
            vec![&DeclError::DuplicateName("MyLog".into())]
        );

        let type_errors = diagnostics.type_errors().collect::<Vec<_>>();
        assert_eq!(type_errors[0], &TypeError::UndeclaredEvent("YourLog".into()));
        assert!(matches!(type_errors[1], TypeError::SizeMismatch { .. }));
        assert_eq!(type_errors[2], &TypeError::TooManyTopics(5));
        assert!(diagnostics.to_string().contains("5:5: event `YourLog` is not declared"));
        assert!(diagnostics.errors().iter().all(|err| !err.is_internal()));
    }

    #[test]
    fn test_abi_export() {
        let unit = SourceUnit::new(vec![
            event("A", vec![EventParameter::indexed("who", StaticType::Address)]),
            event("B", vec![]),
        ]);

        let artifacts = compile(&unit, &CompileOptions::default()).unwrap();
        let abi = artifacts.abi();
        let entries = abi.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["name"], "A");
        assert_eq!(entries[0]["inputs"][0]["indexed"], true);
        assert_eq!(entries[1]["name"], "B");
        assert!(artifacts.functions.is_empty());
    }
}
