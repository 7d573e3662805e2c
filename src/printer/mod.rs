//! Target printers.
//!
//! A printer turns one expression into source text for a target language.
//! Every printer tracks the binding strength of what it emits and
//! parenthesizes a child only when its binding is weaker than its parent's,
//! or equal on the right of a left-associative operator. The text therefore
//! evaluates in the same order, with the same operations, as the tree.
//!
//! Printers also track whether the text has an integer type in the target.
//! A quotient of two integer-typed operands casts its numerator, so `/` is
//! always true division as it is in the tree.
//!
//! [`CodegenMode`] is the single dispatch point; there is no string-keyed
//! lookup anywhere else.

pub mod cpp;
pub mod python;

pub use cpp::CppPrinter;
pub use python::{PythonPrinter, PythonStandard};

use crate::error::{CodegenError, CodegenResult};
use crate::expr::{Expr, Literal, OpCode};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Binding strength of printed text. Higher binds tighter.
pub(crate) mod prec {
    pub const ATOM: u8 = 100;
    pub const POW: u8 = 60;
    pub const UNARY: u8 = 50;
    pub const MUL: u8 = 40;
    pub const ADD: u8 = 30;
    pub const CMP: u8 = 20;
}

/// Target language of generated code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CodegenMode {
    Python2,
    #[default]
    Python3,
    Cpp,
}

impl CodegenMode {
    pub const ALL: [CodegenMode; 3] = [CodegenMode::Python2, CodegenMode::Python3, CodegenMode::Cpp];

    pub fn name(self) -> &'static str {
        match self {
            CodegenMode::Python2 => "python2",
            CodegenMode::Python3 => "python3",
            CodegenMode::Cpp => "cpp",
        }
    }

    pub fn is_python(self) -> bool {
        matches!(self, CodegenMode::Python2 | CodegenMode::Python3)
    }

    /// Extension of generated source files.
    pub fn file_extension(self) -> &'static str {
        match self {
            CodegenMode::Python2 | CodegenMode::Python3 => "py",
            CodegenMode::Cpp => "h",
        }
    }

    /// Print `expr` for this mode.
    pub fn print(self, expr: &Expr) -> CodegenResult<Printed> {
        match self {
            CodegenMode::Python2 => PythonPrinter::new(PythonStandard::Python2).print(expr),
            CodegenMode::Python3 => PythonPrinter::new(PythonStandard::Python3).print(expr),
            CodegenMode::Cpp => CppPrinter.print(expr),
        }
    }

    /// Render `expr` as code for this mode.
    pub fn render(self, expr: &Expr) -> CodegenResult<String> {
        Ok(self.print(expr)?.text)
    }
}

impl fmt::Display for CodegenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CodegenMode {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python2" => Ok(CodegenMode::Python2),
            "python3" | "python" => Ok(CodegenMode::Python3),
            "cpp" | "c++" => Ok(CodegenMode::Cpp),
            _ => Err(CodegenError::UnknownMode { name: s.to_string() }),
        }
    }
}

/// Printed text plus how tightly it binds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Printed {
    pub text: String,
    pub prec: u8,
    /// The text has an integer type in the target language.
    pub integer: bool,
}

impl Printed {
    pub fn new(text: impl Into<String>, prec: u8) -> Self {
        Self {
            text: text.into(),
            prec,
            integer: false,
        }
    }

    pub fn with_integer(mut self, integer: bool) -> Self {
        self.integer = integer;
        self
    }

    pub fn atom(text: impl Into<String>) -> Self {
        Self::new(text, prec::ATOM)
    }

    /// The text, in parentheses if `wrap`.
    pub fn wrapped(&self, wrap: bool) -> Cow<'_, str> {
        if wrap {
            Cow::Owned(format!("({})", self.text))
        } else {
            Cow::Borrowed(&self.text)
        }
    }
}

/// A printer for one target.
pub trait CodePrinter: Send + Sync {
    fn mode(&self) -> CodegenMode;

    fn print(&self, expr: &Expr) -> CodegenResult<Printed>;

    fn render(&self, expr: &Expr) -> CodegenResult<String> {
        Ok(self.print(expr)?.text)
    }
}

pub(crate) fn check_arity(op: &OpCode, args: &[Expr]) -> CodegenResult<()> {
    let expected = op.arity();
    if expected.accepts(args.len()) {
        Ok(())
    } else {
        Err(CodegenError::MalformedExpression {
            op: op.name().to_string(),
            expected,
            found: args.len(),
        })
    }
}

pub(crate) fn unsupported(op: &OpCode, mode: CodegenMode) -> CodegenError {
    CodegenError::UnsupportedOperation {
        op: op.name().to_string(),
        mode,
    }
}

/// Shortest text that reads back as the same `f64`, always with a `.` or an
/// exponent. Only for finite values.
pub(crate) fn format_float(x: f64) -> String {
    format!("{:?}", x)
}

/// Left-associative infix chain: `args[0] sep args[1] sep ...`.
pub(crate) fn print_infix(
    args: &[Expr],
    sep: &str,
    prec: u8,
    mut print: impl FnMut(&Expr) -> CodegenResult<Printed>,
) -> CodegenResult<Printed> {
    let mut text = String::new();
    let mut integer = true;
    for (i, arg) in args.iter().enumerate() {
        let p = print(arg)?;
        integer &= p.integer;
        if i == 0 {
            text.push_str(&p.wrapped(p.prec < prec));
        } else {
            text.push_str(sep);
            text.push_str(&p.wrapped(p.prec <= prec));
        }
    }
    Ok(Printed::new(text, prec).with_integer(integer))
}

/// A sum, with negated terms after the first printed as subtractions.
pub(crate) fn print_sum(
    args: &[Expr],
    mut print: impl FnMut(&Expr) -> CodegenResult<Printed>,
) -> CodegenResult<Printed> {
    let mut text = String::new();
    let mut integer = true;
    for (i, arg) in args.iter().enumerate() {
        if i == 0 {
            let p = print(arg)?;
            integer &= p.integer;
            text.push_str(&p.wrapped(p.prec < prec::ADD));
            continue;
        }
        let (sep, term) = match negated_term(arg) {
            Some(positive) => (" - ", positive),
            None => (" + ", Cow::Borrowed(arg)),
        };
        let p = print(&*term)?;
        integer &= p.integer;
        text.push_str(sep);
        text.push_str(&p.wrapped(p.prec <= prec::ADD));
    }
    Ok(Printed::new(text, prec::ADD).with_integer(integer))
}

/// `x` for `-x` or a negative literal, `None` otherwise.
fn negated_term(expr: &Expr) -> Option<Cow<'_, Expr>> {
    match expr {
        Expr::Op {
            op: OpCode::Neg,
            args,
        } if args.len() == 1 => Some(Cow::Borrowed(&args[0])),
        Expr::Literal(Literal::Int(n)) if *n < 0 => n.checked_neg().map(|m| Cow::Owned(Expr::int(m))),
        Expr::Literal(Literal::Float(x)) if x.into_inner() < 0.0 => {
            Some(Cow::Owned(Expr::float(-x.into_inner())))
        }
        _ => None,
    }
}

/// Comparison: both sides parenthesized when they are comparisons too. The
/// result is a boolean, which is an integer in both targets.
pub(crate) fn print_comparison(
    op: &OpCode,
    args: &[Expr],
    mut print: impl FnMut(&Expr) -> CodegenResult<Printed>,
) -> CodegenResult<Printed> {
    let symbol = match op {
        OpCode::Lt => "<",
        OpCode::Le => "<=",
        OpCode::Gt => ">",
        _ => ">=",
    };
    let lhs = print(&args[0])?;
    let rhs = print(&args[1])?;
    Ok(Printed::new(
        format!(
            "{} {} {}",
            lhs.wrapped(lhs.prec <= prec::CMP),
            symbol,
            rhs.wrapped(rhs.prec <= prec::CMP)
        ),
        prec::CMP,
    )
    .with_integer(true))
}
