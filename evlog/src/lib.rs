//! Compilation of contract events and log statements into EVM `LOGn` code.

pub mod asm;
pub mod ast;
pub mod check;
pub mod decode;
pub mod driver;
pub mod emit;
pub mod encode;
mod error;
pub mod exec;
pub mod registry;
pub mod signature;
pub mod types;

pub mod test_utils;

pub use driver::{compile, Artifacts, CompileOptions, CompiledFunction};
pub use emit::LogLayout;
pub use error::{CompileError, DeclError, Diagnostics, InternalError, TypeError};
pub use registry::EventRegistry;
