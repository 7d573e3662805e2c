//! Numeric evaluation of expressions and CSE programs.
//!
//! Evaluation follows the semantics the printers target: sums and products
//! fold left to right, `sign` is numpy's (`sign(0) == 0`), comparisons yield
//! `1.0` or `0.0`. Running a [`CseProgram`] computes every temporary once, in
//! order, exactly as the generated code does.

use crate::cse::CseProgram;
use crate::error::{CodegenError, CodegenResult};
use crate::expr::{Expr, OpCode, Symbol};
use rustc_hash::FxHashMap;

/// Values for free symbols.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    values: FxHashMap<Symbol, f64>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, symbol: Symbol, value: f64) {
        self.values.insert(symbol, value);
    }

    /// Bind `array[i]` to `values[i]`.
    pub fn bind_array(&mut self, array: &str, values: &[f64]) {
        for (symbol, &value) in Symbol::array(array, values.len()).into_iter().zip(values) {
            self.values.insert(symbol, value);
        }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<f64> {
        self.values.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn numpy_sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        // 0.0 for zero, NaN for NaN
        x * 0.0
    }
}

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Evaluate `expr` with the given symbol values.
pub fn evaluate(expr: &Expr, bindings: &Bindings) -> CodegenResult<f64> {
    match expr {
        Expr::Symbol(s) => bindings.get(s).ok_or_else(|| CodegenError::Evaluation {
            message: format!("no value bound for `{}`", s),
        }),
        Expr::Literal(l) => Ok(l.value()),
        Expr::Op { op, args } => {
            let arity = op.arity();
            if !arity.accepts(args.len()) {
                return Err(CodegenError::MalformedExpression {
                    op: op.name().to_string(),
                    expected: arity,
                    found: args.len(),
                });
            }
            if let OpCode::Function(name) = op {
                return Err(CodegenError::Evaluation {
                    message: format!("cannot evaluate uninterpreted function `{}`", name),
                });
            }

            let values = args
                .iter()
                .map(|a| evaluate(a, bindings))
                .collect::<CodegenResult<Vec<f64>>>()?;
            Ok(apply(op, &values))
        }
    }
}

/// Apply an opcode to already evaluated, arity-checked arguments.
fn apply(op: &OpCode, v: &[f64]) -> f64 {
    match op {
        OpCode::Add => v.iter().skip(1).fold(v[0], |acc, x| acc + x),
        OpCode::Mul => v.iter().skip(1).fold(v[0], |acc, x| acc * x),
        OpCode::Sub => v[0] - v[1],
        OpCode::Div => v[0] / v[1],
        OpCode::Pow => v[0].powf(v[1]),
        OpCode::Neg => -v[0],
        OpCode::Abs => v[0].abs(),
        OpCode::Sign => numpy_sign(v[0]),
        OpCode::Min => v.iter().skip(1).fold(v[0], |acc, &x| acc.min(x)),
        OpCode::Max => v.iter().skip(1).fold(v[0], |acc, &x| acc.max(x)),
        OpCode::Lt => truth(v[0] < v[1]),
        OpCode::Le => truth(v[0] <= v[1]),
        OpCode::Gt => truth(v[0] > v[1]),
        OpCode::Ge => truth(v[0] >= v[1]),
        OpCode::Sin => v[0].sin(),
        OpCode::Cos => v[0].cos(),
        OpCode::Tan => v[0].tan(),
        OpCode::Asin => v[0].asin(),
        OpCode::Acos => v[0].acos(),
        OpCode::Atan => v[0].atan(),
        OpCode::Atan2 => v[0].atan2(v[1]),
        OpCode::Sqrt => v[0].sqrt(),
        OpCode::Exp => v[0].exp(),
        OpCode::Log => v[0].ln(),
        OpCode::Function(_) => f64::NAN,
    }
}

impl CseProgram {
    /// Run the program: bind each temporary in order, then evaluate outputs.
    pub fn evaluate(&self, inputs: &Bindings) -> CodegenResult<Vec<f64>> {
        let mut bindings = inputs.clone();
        for temp in &self.temporaries {
            let value = evaluate(&temp.expr, &bindings)?;
            bindings.bind(temp.symbol.clone(), value);
        }
        self.outputs.iter().map(|o| evaluate(o, &bindings)).collect()
    }
}
