//! numpy-flavoured Python printer.
//!
//! Output matches what numpy-based generated modules look like:
//! `numpy.sin(x)`, `x**2`, `a*b/c`, with spaces only around `+` and `-`.
//!
//! Inputs are floats. Integer literals, comparisons and `numpy.sign`, `abs`,
//! `min`, `max` or `**` over those stay Python ints.

use super::{
    check_arity, format_float, prec, print_comparison, print_infix, print_sum, unsupported,
    CodePrinter, CodegenMode, Printed,
};
use crate::error::CodegenResult;
use crate::expr::{Expr, Literal, OpCode};

/// Which Python the code has to run under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PythonStandard {
    /// `/` between two ints floors, so a quotient of integers gets a float
    /// numerator.
    Python2,
    Python3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PythonPrinter {
    standard: PythonStandard,
}

impl PythonPrinter {
    pub fn new(standard: PythonStandard) -> Self {
        Self { standard }
    }

    fn print_expr(&self, expr: &Expr) -> CodegenResult<Printed> {
        match expr {
            Expr::Symbol(s) => Ok(Printed::atom(s.to_string())),
            Expr::Literal(l) => Ok(print_literal(*l)),
            Expr::Op { op, args } => {
                check_arity(op, args)?;
                self.print_op(op, args)
            }
        }
    }

    fn print_op(&self, op: &OpCode, args: &[Expr]) -> CodegenResult<Printed> {
        let print = |e: &Expr| self.print_expr(e);
        match op {
            OpCode::Add => print_sum(args, print),
            OpCode::Sub => print_infix(args, " - ", prec::ADD, print),
            OpCode::Mul => print_infix(args, "*", prec::MUL, print),
            OpCode::Div => {
                let numerator = self.print_expr(&args[0])?;
                let denominator = self.print_expr(&args[1])?;
                let numerator = if self.standard == PythonStandard::Python2
                    && numerator.integer
                    && denominator.integer
                {
                    match &args[0] {
                        Expr::Literal(Literal::Int(n)) => float_numerator(*n),
                        _ => Printed::atom(format!("float({})", numerator.text)),
                    }
                } else {
                    numerator
                };
                Ok(Printed::new(
                    format!(
                        "{}/{}",
                        numerator.wrapped(numerator.prec < prec::MUL),
                        denominator.wrapped(denominator.prec <= prec::MUL)
                    ),
                    prec::MUL,
                ))
            }
            OpCode::Pow => {
                let base = self.print_expr(&args[0])?;
                let exponent = self.print_expr(&args[1])?;
                Ok(Printed::new(
                    format!(
                        "{}**{}",
                        base.wrapped(base.prec <= prec::POW),
                        exponent.wrapped(exponent.prec < prec::POW)
                    ),
                    prec::POW,
                )
                .with_integer(base.integer && exponent.integer))
            }
            OpCode::Neg => {
                let inner = self.print_expr(&args[0])?;
                Ok(Printed::new(
                    format!("-{}", inner.wrapped(inner.prec <= prec::UNARY)),
                    prec::UNARY,
                )
                .with_integer(inner.integer))
            }
            OpCode::Lt | OpCode::Le | OpCode::Gt | OpCode::Ge => {
                print_comparison(op, args, print)
            }
            OpCode::Abs => self.call("abs", args, true),
            OpCode::Min => self.call("min", args, true),
            OpCode::Max => self.call("max", args, true),
            OpCode::Sign => self.call("numpy.sign", args, true),
            OpCode::Sin => self.call("numpy.sin", args, false),
            OpCode::Cos => self.call("numpy.cos", args, false),
            OpCode::Tan => self.call("numpy.tan", args, false),
            OpCode::Asin => self.call("numpy.arcsin", args, false),
            OpCode::Acos => self.call("numpy.arccos", args, false),
            OpCode::Atan => self.call("numpy.arctan", args, false),
            OpCode::Atan2 => self.call("numpy.arctan2", args, false),
            OpCode::Sqrt => self.call("numpy.sqrt", args, false),
            OpCode::Exp => self.call("numpy.exp", args, false),
            OpCode::Log => self.call("numpy.log", args, false),
            OpCode::Function(_) => Err(unsupported(op, self.mode())),
        }
    }

    /// `name(args)`, an int when `keeps_integer` and every argument is one.
    fn call(&self, name: &str, args: &[Expr], keeps_integer: bool) -> CodegenResult<Printed> {
        let args = args
            .iter()
            .map(|a| self.print_expr(a))
            .collect::<CodegenResult<Vec<_>>>()?;
        let integer = keeps_integer && args.iter().all(|p| p.integer);
        let args: Vec<&str> = args.iter().map(|p| p.text.as_str()).collect();
        Ok(Printed::atom(format!("{}({})", name, args.join(", "))).with_integer(integer))
    }
}

impl CodePrinter for PythonPrinter {
    fn mode(&self) -> CodegenMode {
        match self.standard {
            PythonStandard::Python2 => CodegenMode::Python2,
            PythonStandard::Python3 => CodegenMode::Python3,
        }
    }

    fn print(&self, expr: &Expr) -> CodegenResult<Printed> {
        self.print_expr(expr)
    }
}

fn print_literal(literal: Literal) -> Printed {
    match literal {
        Literal::Int(n) if n < 0 => Printed::new(n.to_string(), prec::UNARY).with_integer(true),
        Literal::Int(n) => Printed::atom(n.to_string()).with_integer(true),
        Literal::Float(x) => {
            let x = x.into_inner();
            if x.is_nan() {
                Printed::atom("float('nan')")
            } else if x.is_infinite() && x > 0.0 {
                Printed::atom("float('inf')")
            } else if x.is_infinite() {
                Printed::new("-float('inf')", prec::UNARY)
            } else if x.is_sign_negative() {
                Printed::new(format_float(x), prec::UNARY)
            } else {
                Printed::atom(format_float(x))
            }
        }
    }
}

fn float_numerator(n: i64) -> Printed {
    print_literal(Literal::Float((n as f64).into()))
}
