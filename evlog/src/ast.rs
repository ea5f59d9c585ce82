//! Input nodes consumed by the log compiler, produced by the parser and the
//! general type checker.

use crate::types::{Argument, Loc, StaticType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParameter {
    pub name: String,
    pub ty: StaticType,
    pub indexed: bool,
}

impl EventParameter {
    pub fn new(name: impl Into<String>, ty: StaticType) -> Self {
        Self {
            name: name.into(),
            ty,
            indexed: false,
        }
    }

    pub fn indexed(name: impl Into<String>, ty: StaticType) -> Self {
        Self {
            indexed: true,
            ..Self::new(name, ty)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDeclaration {
    pub name: String,
    pub params: Vec<EventParameter>,
    pub anonymous: bool,
    pub loc: Loc,
}

impl EventDeclaration {
    pub fn new(name: impl Into<String>, params: Vec<EventParameter>) -> Self {
        Self {
            name: name.into(),
            params,
            anonymous: false,
            loc: Loc::default(),
        }
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    pub fn at(mut self, loc: Loc) -> Self {
        self.loc = loc;
        self
    }

    pub fn indexed_params(&self) -> impl Iterator<Item = &EventParameter> {
        self.params.iter().filter(|param| param.indexed)
    }

    pub fn data_params(&self) -> impl Iterator<Item = &EventParameter> {
        self.params.iter().filter(|param| !param.indexed)
    }
}

/// A `log.Event(...)` or `raw_log(...)` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogCallSite {
    /// Log of a declared event; arguments match its parameters by position.
    Event {
        event: String,
        args: Vec<Argument>,
        loc: Loc,
    },
    /// Log with explicit topics and an unencoded data byte-string.
    Raw {
        topics: Vec<Argument>,
        data: Argument,
        loc: Loc,
    },
}

impl LogCallSite {
    pub fn event(event: impl Into<String>, args: Vec<Argument>) -> Self {
        Self::Event {
            event: event.into(),
            args,
            loc: Loc::default(),
        }
    }

    pub fn raw(topics: Vec<Argument>, data: Argument) -> Self {
        Self::Raw {
            topics,
            data,
            loc: Loc::default(),
        }
    }

    pub fn at(mut self, at: Loc) -> Self {
        match &mut self {
            Self::Event { loc, .. } | Self::Raw { loc, .. } => *loc = at,
        }
        self
    }

    pub fn loc(&self) -> Loc {
        match self {
            Self::Event { loc, .. } | Self::Raw { loc, .. } => *loc,
        }
    }
}

/// Storage variable. Only its position matters to event declarations, so its
/// type is kept as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageDecl {
    pub name: String,
    pub ty: String,
    pub loc: Loc,
}

/// Function body, reduced to the log statements it contains in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub logs: Vec<LogCallSite>,
    pub loc: Loc,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>, logs: Vec<LogCallSite>) -> Self {
        Self {
            name: name.into(),
            logs,
            loc: Loc::default(),
        }
    }
}

/// Top-level declaration of a source unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Event(EventDeclaration),
    Storage(StorageDecl),
    Function(FunctionDecl),
}

impl Item {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Event(_) => "event",
            Self::Storage(_) => "storage variable",
            Self::Function(_) => "function",
        }
    }
}

/// One compilation unit: a contract's top-level items in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceUnit {
    pub items: Vec<Item>,
}

impl SourceUnit {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }
}
