//! Errors raised while building a generation request.
//!
//! Every variant carries enough context (symbol, opcode, mode, path) to
//! diagnose the failure without re-running. Numerical edge cases inside
//! generated routines are never reported here.

use crate::expr::{Arity, Symbol};
use crate::printer::CodegenMode;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Code generation error type.
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("undefined symbol `{symbol}`: not among the declared inputs")]
    UndefinedSymbol { symbol: Symbol },
    #[error("input symbol `{symbol}` is declared more than once")]
    DuplicateInput { symbol: Symbol },
    #[error("input symbol `{symbol}` collides with temporary names `{prefix}<n>`")]
    ReservedSymbol { symbol: Symbol, prefix: String },
    #[error("operation `{op}` is not supported in {mode} mode")]
    UnsupportedOperation { op: String, mode: CodegenMode },
    #[error("malformed `{op}` operation: expected {expected} argument(s), found {found}")]
    MalformedExpression {
        op: String,
        expected: Arity,
        found: usize,
    },
    #[error("unknown codegen mode `{name}`")]
    UnknownMode { name: String },
    #[error("evaluation failed: {message}")]
    Evaluation { message: String },
    #[error("failed to format generated code")]
    Format(#[from] fmt::Error),
    #[error("i/o error at `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for code generation.
pub type CodegenResult<T> = Result<T, CodegenError>;
