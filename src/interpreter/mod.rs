//! Interpreter module
//!
//! Executes parsed scripts. `Runner` walks the AST; the other modules add
//! `impl Runner` blocks for expansion, arithmetic, conditionals, control
//! flow, pipelines, redirections and command dispatch.

pub mod arithmetic;
pub mod builtins;
pub mod command_resolution;
pub mod conditionals;
pub mod control_flow;
pub mod environment;
pub mod errors;
pub mod expansion;
pub mod io;
pub mod pipeline_execution;
pub mod redirections;
pub mod runner;
pub mod types;

pub use command_resolution::{ExecHandler, ExecRequest, OsExecHandler};
pub use environment::{Environment, Value, Variable};
pub use errors::{FatalError, InterpreterError, ShellError};
pub use io::{InputStream, IoContext, OutputStream};
pub use runner::Runner;
pub use types::{CancelToken, ExecResult, ExecutionLimits, ShellOptions, ShoptOptions};
