//! Log compilation errors

use core::fmt;

use crate::types::Loc;

/// Structural error found while registering an event declaration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeclError {
    #[error("event `{0}` is already declared")]
    DuplicateName(String),
    #[error("event `{0}` must be declared before any storage variable or function")]
    MisplacedDeclaration(String),
    #[error("event `{event}` declares {count} indexed parameters, at most 3 are allowed")]
    TooManyIndexedParameters { event: String, count: usize },
    #[error("indexed parameter `{param}` of event `{event}` is {width} bytes wide, a topic holds 32")]
    TopicTooWide {
        event: String,
        param: String,
        width: usize,
    },
    #[error("parameter `{param}` of event `{event}` holds up to {len} bytes, a log data slot holds 32")]
    DataValueTooWide {
        event: String,
        param: String,
        len: usize,
    },
    #[error("parameter `{param}` of event `{event}` has the zero-sized type {ty}")]
    ZeroSized {
        event: String,
        param: String,
        ty: String,
    },
    #[error("array parameter `{param}` of event `{event}` cannot be indexed")]
    IndexedArray { event: String, param: String },
}

/// Error found while checking a log call site.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("event `{0}` is not declared")]
    UndeclaredEvent(String),
    #[error("event `{event}` expects {expected} arguments, got {found}")]
    ArityMismatch {
        event: String,
        expected: usize,
        found: usize,
    },
    #[error("argument `{param}` of `{event}` expects {expected}, got {found}")]
    TypeMismatch {
        event: String,
        param: String,
        expected: String,
        found: String,
    },
    #[error("argument `{param}` of `{event}` has length {found}, declared length is {declared}")]
    SizeMismatch {
        event: String,
        param: String,
        declared: usize,
        found: usize,
    },
    #[error("raw_log takes at most 4 topics, got {0}")]
    TooManyTopics(usize),
}

/// Inconsistency between collaborators of the compiler. Never caused by user
/// input; compilation aborts as soon as one is raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternalError {
    #[error("log instruction requested with {0} topics")]
    TopicCount(usize),
    #[error("constant {value} does not have type {ty}")]
    ValueShape { value: String, ty: String },
    #[error("operand {operand} cannot be lowered as {ty}")]
    Operand { operand: String, ty: String },
    #[error("memory offset {0:#x} overflows the address space")]
    MemoryOverflow(u64),
    #[error("operand at {offset:#x} overlaps the log scratch area at {scratch_offset:#x}")]
    ScratchOverlap { offset: u64, scratch_offset: u64 },
    #[error("cannot assemble instruction: {0}")]
    Assemble(String),
}

/// Error reported by a compilation, located in the source unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("{loc}: {source}")]
    Decl {
        loc: Loc,
        #[source]
        source: DeclError,
    },
    #[error("{loc}: {source}")]
    Type {
        loc: Loc,
        #[source]
        source: TypeError,
    },
    #[error("internal compiler error: {0}")]
    Internal(#[from] InternalError),
}

impl CompileError {
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Every error reported by a compilation, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics(pub Vec<CompileError>);

impl Diagnostics {
    pub fn errors(&self) -> &[CompileError] {
        &self.0
    }

    pub fn decl_errors(&self) -> impl Iterator<Item = &DeclError> {
        self.0.iter().filter_map(|err| match err {
            CompileError::Decl { source, .. } => Some(source),
            _ => None,
        })
    }

    pub fn type_errors(&self) -> impl Iterator<Item = &TypeError> {
        self.0.iter().filter_map(|err| match err {
            CompileError::Type { source, .. } => Some(source),
            _ => None,
        })
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compilation failed with {} error(s)", self.0.len())?;
        for err in &self.0 {
            write!(f, "\n  {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}
