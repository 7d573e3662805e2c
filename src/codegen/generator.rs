//! Generation driver.
//!
//! Runs the passes in a fixed order and returns the printed program:
//!
//! ```text
//! inputs, outputs ──► CSE (optional) ──► linearize (optional) ──► render
//! ```
//!
//! The driver does no algebra of its own. Every temporary and every output
//! is rendered with the request's mode, in program order, so
//! `temporaries[i]` may only use names from `temporaries[..i]`.
//!
//! Printers treat temporaries as floats, like inputs. C++ declares them
//! `Scalar`; in Python 2 an int-valued definition is wrapped in `float(..)`.

use crate::cse::{linearize_inputs, perform_cse, validate_request, CseConfig, CseProgram};
use crate::error::CodegenResult;
use crate::expr::{Expr, Symbol};
use crate::printer::CodegenMode;
use log::debug;

/// Configuration for code generation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodegenConfig {
    /// Target language
    pub mode: CodegenMode,
    /// Whether to hoist repeated subexpressions
    pub cse: bool,
    /// Temporary naming and input linearization
    pub cse_config: CseConfig,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            mode: CodegenMode::Python3,
            cse: true,
            cse_config: CseConfig::default(),
        }
    }
}

impl CodegenConfig {
    /// Python 3 with numpy
    pub fn python() -> Self {
        Self::default()
    }

    pub fn python2() -> Self {
        Self {
            mode: CodegenMode::Python2,
            ..Self::default()
        }
    }

    /// C++ templated on `Scalar`
    pub fn cpp() -> Self {
        Self {
            mode: CodegenMode::Cpp,
            ..Self::default()
        }
    }
}

/// Everything generation depends on. Generation is a pure function of this.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    inputs: Vec<Symbol>,
    outputs: Vec<Expr>,
    config: CodegenConfig,
}

impl GenerationRequest {
    pub fn new(inputs: Vec<Symbol>, outputs: Vec<Expr>, config: CodegenConfig) -> Self {
        Self {
            inputs,
            outputs,
            config,
        }
    }

    pub fn builder(inputs: Vec<Symbol>, outputs: Vec<Expr>) -> GenerationRequestBuilder {
        GenerationRequestBuilder {
            inputs,
            outputs,
            config: CodegenConfig::default(),
        }
    }

    pub fn inputs(&self) -> &[Symbol] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Expr] {
        &self.outputs
    }

    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    /// The program that will be printed: CSE and linearization applied as
    /// configured. The undefined-symbol check runs even with CSE off.
    pub fn program(&self) -> CodegenResult<CseProgram> {
        let cse_config = &self.config.cse_config;
        if self.config.cse {
            return perform_cse(&self.inputs, &self.outputs, cse_config);
        }

        validate_request(&self.inputs, &self.outputs, cse_config)?;
        let program = CseProgram::passthrough(self.outputs.clone());
        if cse_config.linearize_inputs {
            Ok(linearize_inputs(&program, &self.inputs, &cse_config.input_array))
        } else {
            Ok(program)
        }
    }
}

/// Builder for generation requests
pub struct GenerationRequestBuilder {
    inputs: Vec<Symbol>,
    outputs: Vec<Expr>,
    config: CodegenConfig,
}

impl GenerationRequestBuilder {
    pub fn mode(mut self, mode: CodegenMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn cse(mut self, enabled: bool) -> Self {
        self.config.cse = enabled;
        self
    }

    pub fn linearize_inputs(mut self, enabled: bool) -> Self {
        self.config.cse_config.linearize_inputs = enabled;
        self
    }

    pub fn temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.cse_config.temp_prefix = prefix.into();
        self
    }

    pub fn config(mut self, config: CodegenConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> GenerationRequest {
        GenerationRequest::new(self.inputs, self.outputs, self.config)
    }
}

/// Printed program text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneratedCode {
    /// `(name, definition)` in dependency order
    pub temporaries: Vec<(String, String)>,
    /// One entry per requested output, in request order
    pub outputs: Vec<String>,
    /// Operations needed to run the program once
    pub total_ops: usize,
}

/// Generate code for a request.
///
/// Fails without producing anything if a symbol is undefined, an input is
/// duplicated or reserved, an operation is malformed, or the mode cannot
/// print an operation.
pub fn generate(request: &GenerationRequest) -> CodegenResult<GeneratedCode> {
    let mode = request.config.mode;
    let program = request.program()?;

    let temporaries = program
        .temporaries
        .iter()
        .map(|t| Ok((t.name(), render_temporary(mode, &t.expr)?)))
        .collect::<CodegenResult<Vec<_>>>()?;
    let outputs = program
        .outputs
        .iter()
        .map(|o| mode.render(o))
        .collect::<CodegenResult<Vec<_>>>()?;

    debug!(
        "generated {} code: {} inputs, {} temporaries, {} outputs",
        mode,
        request.inputs.len(),
        temporaries.len(),
        outputs.len()
    );

    Ok(GeneratedCode {
        temporaries,
        outputs,
        total_ops: program.op_count(),
    })
}

fn render_temporary(mode: CodegenMode, expr: &Expr) -> CodegenResult<String> {
    let printed = mode.print(expr)?;
    if mode == CodegenMode::Python2 && printed.integer {
        Ok(format!("float({})", printed.text))
    } else {
        Ok(printed.text)
    }
}
