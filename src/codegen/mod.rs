//! Code generation for geometric group operations.
//!
//! Lowers batches of expression trees into deterministic, duplicate-free
//! target code. The pipeline:
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Expr trees   │──►│ CSE          │──►│ Linearize    │──►│ Printer      │
//! │ (inputs,     │   │ tmp0, tmp1,  │   │ x -> inp[0]  │   │ python / cpp │
//! │  outputs)    │   │ ... in order │   │ (optional)   │   │              │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                                                 ▼
//!                                          ┌──────────────────────────────┐
//!                                          │ GeneratedCode                │
//!                                          │ (name, text) temporaries,    │
//!                                          │ output texts, op count       │
//!                                          └──────────────┬───────────────┘
//!                                                         ▼
//!                                          ┌──────────────────────────────┐
//!                                          │ template: one function per   │
//!                                          │ operation per group, on disk │
//!                                          └──────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use geo_codegen::codegen::{generate, GenerationRequest};
//! use geo_codegen::expr::{Expr, Symbol};
//! use geo_codegen::printer::CodegenMode;
//!
//! let x = Expr::symbol("x");
//! let s = x.sin();
//! let request = GenerationRequest::builder(
//!     vec![Symbol::named("x")],
//!     vec![&s * &s, s.clone() + 1],
//! )
//! .mode(CodegenMode::Python3)
//! .build();
//!
//! let code = generate(&request).unwrap();
//! assert_eq!(code.temporaries, vec![("tmp0".to_string(), "numpy.sin(inp[0])".to_string())]);
//! assert_eq!(code.outputs, vec!["tmp0*tmp0", "tmp0 + 1"]);
//! ```

pub mod generator;
pub mod template;

pub use generator::{generate, CodegenConfig, GeneratedCode, GenerationRequest, GenerationRequestBuilder};
pub use template::{artifact_path, render_file, render_function, write_package};
