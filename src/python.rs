//! Python bindings.
//!
//! Expression trees cross the boundary as plain Python values:
//!
//! * `("add", x, y)`: an operation, named as in [`OpCode::name`]
//! * `"a[2]"`, `"epsilon"`: symbols
//! * `2`, `0.5`: literals

use crate::codegen::{self, GenerationRequest};
use crate::cse::{self, CseConfig};
use crate::error::CodegenError;
use crate::expr::{Expr, Literal, OpCode, Symbol};
use crate::printer::CodegenMode;
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyTuple;
use std::path::Path;

fn to_py_err(err: CodegenError) -> PyErr {
    match err {
        CodegenError::Io { .. } => PyIOError::new_err(err.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

/// Convert a Python object to an expression.
fn py_to_expr(obj: &PyAny) -> PyResult<Expr> {
    if let Ok(tuple) = obj.downcast::<PyTuple>() {
        if tuple.is_empty() {
            return Err(PyValueError::new_err("Empty tuple cannot be an expression"));
        }
        let head: String = tuple.get_item(0)?.extract()?;
        let args = tuple
            .iter()
            .skip(1)
            .map(py_to_expr)
            .collect::<PyResult<Vec<_>>>()?;
        return Ok(Expr::op(OpCode::from_name(&head), args));
    }

    // int before float: every int also extracts as f64
    if let Ok(n) = obj.extract::<i64>() {
        return Ok(Expr::int(n));
    }
    if let Ok(x) = obj.extract::<f64>() {
        return Ok(Expr::float(x));
    }
    if let Ok(s) = obj.extract::<String>() {
        return Ok(Expr::Symbol(Symbol::parse(&s)));
    }

    Err(PyValueError::new_err(format!(
        "Cannot convert {} to an expression",
        obj.get_type().name()?
    )))
}

/// Convert an expression to Python values.
fn expr_to_py(py: Python, expr: &Expr) -> PyObject {
    match expr {
        Expr::Symbol(s) => s.to_string().into_py(py),
        Expr::Literal(Literal::Int(n)) => (*n).into_py(py),
        Expr::Literal(Literal::Float(x)) => x.into_inner().into_py(py),
        Expr::Op { op, args } => {
            let items: Vec<PyObject> = std::iter::once(op.name().into_py(py))
                .chain(args.iter().map(|a| expr_to_py(py, a)))
                .collect();
            PyTuple::new(py, items).into_py(py)
        }
    }
}

fn convert_request(input_symbols: &[String], output_exprs: &[&PyAny]) -> PyResult<(Vec<Symbol>, Vec<Expr>)> {
    let inputs = input_symbols.iter().map(|s| Symbol::parse(s)).collect();
    let outputs = output_exprs
        .iter()
        .map(|o| py_to_expr(o))
        .collect::<PyResult<Vec<_>>>()?;
    Ok((inputs, outputs))
}

/// Run CSE. Returns `([(name, expr), ...], [expr, ...])`.
#[pyfunction]
#[pyo3(name = "perform_cse", signature = (input_symbols, output_exprs, linearize_inputs = true))]
fn py_perform_cse(
    py: Python,
    input_symbols: Vec<String>,
    output_exprs: Vec<&PyAny>,
    linearize_inputs: bool,
) -> PyResult<PyObject> {
    let (inputs, outputs) = convert_request(&input_symbols, &output_exprs)?;
    let config = CseConfig {
        linearize_inputs,
        ..CseConfig::default()
    };
    let program = cse::perform_cse(&inputs, &outputs, &config).map_err(to_py_err)?;

    let temporaries: Vec<PyObject> = program
        .temporaries
        .iter()
        .map(|t| (t.name(), expr_to_py(py, &t.expr)).into_py(py))
        .collect();
    let outputs: Vec<PyObject> = program.outputs.iter().map(|o| expr_to_py(py, o)).collect();
    Ok((temporaries, outputs).into_py(py))
}

/// Generate code. Returns `([(name, code), ...], [code, ...])`.
#[pyfunction]
#[pyo3(
    name = "generate",
    signature = (input_symbols, output_exprs, mode = "python3", cse = true, linearize_inputs = true)
)]
fn py_generate(
    input_symbols: Vec<String>,
    output_exprs: Vec<&PyAny>,
    mode: &str,
    cse: bool,
    linearize_inputs: bool,
) -> PyResult<(Vec<(String, String)>, Vec<String>)> {
    let mode: CodegenMode = mode.parse().map_err(to_py_err)?;
    let (inputs, outputs) = convert_request(&input_symbols, &output_exprs)?;
    let request = GenerationRequest::builder(inputs, outputs)
        .mode(mode)
        .cse(cse)
        .linearize_inputs(linearize_inputs)
        .build();
    let code = codegen::generate(&request).map_err(to_py_err)?;
    Ok((code.temporaries, code.outputs))
}

/// Write the generated group operations under `path`. Returns the files written.
#[pyfunction]
#[pyo3(name = "write_package", signature = (path, mode = "python3"))]
fn py_write_package(path: &str, mode: &str) -> PyResult<Vec<String>> {
    let mode: CodegenMode = mode.parse().map_err(to_py_err)?;
    let written = codegen::write_package(Path::new(path), mode).map_err(to_py_err)?;
    Ok(written.iter().map(|p| p.display().to_string()).collect())
}

/// Python module definition.
#[pymodule]
fn geo_codegen(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_perform_cse, m)?)?;
    m.add_function(wrap_pyfunction!(py_generate, m)?)?;
    m.add_function(wrap_pyfunction!(py_write_package, m)?)?;
    Ok(())
}
