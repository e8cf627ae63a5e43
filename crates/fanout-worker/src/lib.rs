//! Fanout Worker
//!
//! The remote executor of the build path. A worker receives `build` requests
//! over TCP, runs the compiler on the task's source, and answers with the
//! compiler output followed by a success or failure marker line. A failed
//! compilation is data, never a protocol error.

pub mod compiler;
pub mod worker;

pub use compiler::{CommandCompiler, Compiler, CompilerConfig, CompilerOutput};
pub use worker::{Worker, FAILURE_MARKER, SUCCESS_MARKER};
