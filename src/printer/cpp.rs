//! C++ printer for code templated on `Scalar`.
//!
//! Floating constants are wrapped as `Scalar(..)` so the same text compiles
//! for `float` and `double`. Integer literals stay `int`; a quotient of two
//! integer-typed operands casts the numerator to `Scalar`.
//!
//! `sign(x)` prints as `Scalar((x > 0) - (x < 0))`, which is 0 for a NaN
//! argument where numpy returns NaN. Generated code never signs a NaN for
//! finite inputs and a positive epsilon.

use super::{
    check_arity, format_float, prec, print_comparison, print_infix, print_sum, unsupported,
    CodePrinter, CodegenMode, Printed,
};
use crate::error::CodegenResult;
use crate::expr::{Expr, Literal, OpCode};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CppPrinter;

impl CppPrinter {
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
            OpCode::Mul => print_infix(args, " * ", prec::MUL, print),
            OpCode::Div => {
                let numerator = self.print_expr(&args[0])?;
                let denominator = self.print_expr(&args[1])?;
                let numerator = if numerator.integer && denominator.integer {
                    Printed::atom(format!("Scalar({})", numerator.text))
                } else {
                    numerator
                };
                Ok(Printed::new(
                    format!(
                        "{} / {}",
                        numerator.wrapped(numerator.prec < prec::MUL),
                        denominator.wrapped(denominator.prec <= prec::MUL)
                    ),
                    prec::MUL,
                ))
            }
            OpCode::Pow => {
                let base = self.scalar_argument(&args[0])?;
                let exponent = self.scalar_argument(&args[1])?;
                Ok(Printed::atom(format!("std::pow({}, {})", base, exponent)))
            }
            OpCode::Neg => {
                let inner = self.print_expr(&args[0])?;
                Ok(Printed::new(
                    format!("-{}", inner.wrapped(inner.prec <= prec::UNARY)),
                    prec::UNARY,
                )
                .with_integer(inner.integer))
            }
            OpCode::Sign => {
                let inner = self.print_expr(&args[0])?;
                Ok(Printed::atom(format!(
                    "Scalar((({0}) > 0) - (({0}) < 0))",
                    inner.text
                )))
            }
            OpCode::Lt | OpCode::Le | OpCode::Gt | OpCode::Ge => {
                let comparison = print_comparison(op, args, print)?;
                Ok(Printed::atom(format!("Scalar({})", comparison.text)))
            }
            OpCode::Min => self.fold_call("std::min<Scalar>", args),
            OpCode::Max => self.fold_call("std::max<Scalar>", args),
            OpCode::Abs => self.call("std::fabs", args),
            OpCode::Sin => self.call("std::sin", args),
            OpCode::Cos => self.call("std::cos", args),
            OpCode::Tan => self.call("std::tan", args),
            OpCode::Asin => self.call("std::asin", args),
            OpCode::Acos => self.call("std::acos", args),
            OpCode::Atan => self.call("std::atan", args),
            OpCode::Atan2 => self.call("std::atan2", args),
            OpCode::Sqrt => self.call("std::sqrt", args),
            OpCode::Exp => self.call("std::exp", args),
            OpCode::Log => self.call("std::log", args),
            OpCode::Function(_) => Err(unsupported(op, CodegenMode::Cpp)),
        }
    }

    /// Argument where an integer literal would pick the wrong overload.
    fn scalar_argument(&self, expr: &Expr) -> CodegenResult<String> {
        match expr {
            Expr::Literal(Literal::Int(n)) => Ok(format!("Scalar({})", n)),
            other => Ok(self.print_expr(other)?.text),
        }
    }

    fn call(&self, name: &str, args: &[Expr]) -> CodegenResult<Printed> {
        let args = args
            .iter()
            .map(|a| self.print_expr(a).map(|p| p.text))
            .collect::<CodegenResult<Vec<_>>>()?;
        Ok(Printed::atom(format!("{}({})", name, args.join(", "))))
    }

    /// `f(f(a, b), c)` for a binary-only `f`.
    fn fold_call(&self, name: &str, args: &[Expr]) -> CodegenResult<Printed> {
        let mut text = self.scalar_argument(&args[0])?;
        for arg in &args[1..] {
            text = format!("{}({}, {})", name, text, self.scalar_argument(arg)?);
        }
        Ok(Printed::atom(text))
    }
}

impl CodePrinter for CppPrinter {
    fn mode(&self) -> CodegenMode {
        CodegenMode::Cpp
    }

    fn print(&self, expr: &Expr) -> CodegenResult<Printed> {
        self.print_expr(expr)
    }
}

fn print_literal(literal: Literal) -> Printed {
    match literal {
        // -9223372036854775808 is unary minus on a literal too wide for any
        // signed type.
        Literal::Int(i64::MIN) => Printed::atom(format!("({} - 1)", i64::MIN + 1)).with_integer(true),
        Literal::Int(n) if n < 0 => Printed::new(n.to_string(), prec::UNARY).with_integer(true),
        Literal::Int(n) => Printed::atom(n.to_string()).with_integer(true),
        Literal::Float(x) => {
            let x = x.into_inner();
            if x.is_nan() {
                Printed::atom("std::numeric_limits<Scalar>::quiet_NaN()")
            } else if x.is_infinite() && x > 0.0 {
                Printed::atom("std::numeric_limits<Scalar>::infinity()")
            } else if x.is_infinite() {
                Printed::new("-std::numeric_limits<Scalar>::infinity()", prec::UNARY)
            } else {
                Printed::atom(format!("Scalar({})", format_float(x)))
            }
        }
    }
}
