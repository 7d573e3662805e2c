//! geo-codegen: deterministic code generation for geometric group operations.
//!
//! This crate provides:
//! - Expression trees with structural equality and hashing
//! - Common-subexpression elimination with canonical temporary naming
//! - Input linearization into a flat argument array
//! - Python (numpy) and C++ printers
//! - Expression builders for the `Rot2`, `Rot3`, `Pose2` and `Pose3` group operations
//! - Function templates and package writing
//! - A compare-or-update harness for checked-in generated code
//! - Python bindings via PyO3 (feature `python`)

pub mod codegen;
pub mod cse;
pub mod error;
pub mod eval;
pub mod expr;
pub mod geo;
pub mod loader;
pub mod printer;
pub mod snapshot;

#[cfg(feature = "python")]
mod python;

// Re-exports for convenience
pub use codegen::{generate, CodegenConfig, GeneratedCode, GenerationRequest};
pub use cse::{linearize_inputs, perform_cse, CseConfig, CseProgram, Temporary};
pub use error::{CodegenError, CodegenResult};
pub use eval::{evaluate, Bindings};
pub use expr::{Expr, Literal, OpCode, Symbol};
pub use geo::{CompiledOp, GroupKind, GroupOp, LieGroup, Pose2, Pose3, Rot2, Rot3};
pub use loader::{load_generated, ArtifactLoader, SourceLoader};
pub use printer::{CodePrinter, CodegenMode, CppPrinter, PythonPrinter};
pub use snapshot::{compare_or_update_dir, compare_or_update_file, SnapshotError, UpdateMode};
