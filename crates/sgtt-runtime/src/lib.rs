//! Back end for sgtt generator programs.
//!
//! ```text
//! SynthesizedProgram ─> Compiler ──ok──> Artifact ─> Executor ─> Execution
//!                           │                                    (text | fault | cancelled)
//!                           └─err─> Vec<Diagnostic> ─> remap ─> Remapped
//!                                                              (reported + fallback)
//! ```
//!
//! The Lua implementations ([`LuaCompiler`], [`LuaExecutor`]) compile to
//! LuaJIT bytecode and run every program in a fresh Lua state that is dropped
//! as soon as the call returns.

pub mod cancel;
pub mod comment;
pub mod compiler;
pub mod diagnostic;
pub mod executor;
pub mod libraries;
pub mod remap;

pub use cancel::CancelFlag;
pub use comment::comment_out;
pub use compiler::{Artifact, Compiler, LuaCompiler};
pub use diagnostic::{Diagnostic, Location, Severity};
pub use executor::{Execution, Executor, Fault, LuaExecutor};
pub use libraries::{Libraries, RuntimeError};
pub use remap::{Remapped, remap};
