//! Expression trees consumed by the code generator.
//!
//! An [`Expr`] is an immutable tree of symbols, numeric literals and
//! operations. Equality and hashing are structural: two subtrees built
//! independently compare equal when they have the same shape, which is what
//! the CSE engine uses to find duplicates.
//!
//! Trees are exactly what the builder wrote. `a + b + c` is
//! `Add(Add(a, b), c)`; nothing is reordered, flattened or simplified.

use crate::error::{CodegenError, CodegenResult};
use ordered_float::OrderedFloat;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::ops;
use std::sync::Arc;

/// A free variable: a plain name or one element of a named array.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Named(Arc<str>),
    Element { array: Arc<str>, index: usize },
}

impl Symbol {
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Symbol::Named(name.into())
    }

    pub fn element(array: impl Into<Arc<str>>, index: usize) -> Self {
        Symbol::Element {
            array: array.into(),
            index,
        }
    }

    /// The elements `array[0..len]`, in order.
    pub fn array(array: &str, len: usize) -> Vec<Symbol> {
        let array: Arc<str> = array.into();
        (0..len)
            .map(|index| Symbol::Element {
                array: array.clone(),
                index,
            })
            .collect()
    }

    /// Parse `name` or `name[index]`. Anything that is not a well-formed
    /// element access is taken as a plain name.
    pub fn parse(text: &str) -> Self {
        if let Some(open) = text.find('[') {
            if let Some(inner) = text[open + 1..].strip_suffix(']') {
                if let Ok(index) = inner.parse::<usize>() {
                    if open > 0 {
                        return Symbol::element(&text[..open], index);
                    }
                }
            }
        }
        Symbol::named(text)
    }

    /// The plain name, or the array name for an element.
    pub fn base_name(&self) -> &str {
        match self {
            Symbol::Named(name) => name,
            Symbol::Element { array, .. } => array,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Named(name) => write!(f, "{}", name),
            Symbol::Element { array, index } => write!(f, "{}[{}]", array, index),
        }
    }
}

/// Numeric constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(i64),
    Float(OrderedFloat<f64>),
}

impl Literal {
    pub fn value(self) -> f64 {
        match self {
            Literal::Int(n) => n as f64,
            Literal::Float(x) => x.into_inner(),
        }
    }

    pub fn is_negative(self) -> bool {
        match self {
            Literal::Int(n) => n < 0,
            Literal::Float(x) => x.into_inner().is_sign_negative() && !x.into_inner().is_nan(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{}", n),
            // Debug is the shortest text that parses back to the same f64.
            Literal::Float(x) => write!(f, "{:?}", x.into_inner()),
        }
    }
}

/// How many arguments an opcode takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// Operation codes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// n-ary sum, evaluated left to right
    Add,
    Sub,
    /// n-ary product, evaluated left to right
    Mul,
    Div,
    Pow,
    Neg,
    Abs,
    /// -1, 0 or 1
    Sign,
    Min,
    Max,
    Lt,
    Le,
    Gt,
    Ge,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    /// `atan2(y, x)`
    Atan2,
    Sqrt,
    Exp,
    Log,
    /// An uninterpreted function from the algebra layer. No target can print it.
    Function(Arc<str>),
}

impl OpCode {
    pub fn name(&self) -> &str {
        match self {
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Mul => "mul",
            OpCode::Div => "div",
            OpCode::Pow => "pow",
            OpCode::Neg => "neg",
            OpCode::Abs => "abs",
            OpCode::Sign => "sign",
            OpCode::Min => "min",
            OpCode::Max => "max",
            OpCode::Lt => "lt",
            OpCode::Le => "le",
            OpCode::Gt => "gt",
            OpCode::Ge => "ge",
            OpCode::Sin => "sin",
            OpCode::Cos => "cos",
            OpCode::Tan => "tan",
            OpCode::Asin => "asin",
            OpCode::Acos => "acos",
            OpCode::Atan => "atan",
            OpCode::Atan2 => "atan2",
            OpCode::Sqrt => "sqrt",
            OpCode::Exp => "exp",
            OpCode::Log => "log",
            OpCode::Function(name) => name,
        }
    }

    /// Inverse of [`OpCode::name`]. Unknown names become uninterpreted functions.
    pub fn from_name(name: &str) -> OpCode {
        match name {
            "add" => OpCode::Add,
            "sub" => OpCode::Sub,
            "mul" => OpCode::Mul,
            "div" => OpCode::Div,
            "pow" => OpCode::Pow,
            "neg" => OpCode::Neg,
            "abs" => OpCode::Abs,
            "sign" => OpCode::Sign,
            "min" => OpCode::Min,
            "max" => OpCode::Max,
            "lt" => OpCode::Lt,
            "le" => OpCode::Le,
            "gt" => OpCode::Gt,
            "ge" => OpCode::Ge,
            "sin" => OpCode::Sin,
            "cos" => OpCode::Cos,
            "tan" => OpCode::Tan,
            "asin" => OpCode::Asin,
            "acos" => OpCode::Acos,
            "atan" => OpCode::Atan,
            "atan2" => OpCode::Atan2,
            "sqrt" => OpCode::Sqrt,
            "exp" => OpCode::Exp,
            "log" => OpCode::Log,
            other => OpCode::Function(other.into()),
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            OpCode::Add | OpCode::Mul | OpCode::Min | OpCode::Max => Arity::AtLeast(2),
            OpCode::Sub
            | OpCode::Div
            | OpCode::Pow
            | OpCode::Lt
            | OpCode::Le
            | OpCode::Gt
            | OpCode::Ge
            | OpCode::Atan2 => Arity::Exactly(2),
            OpCode::Neg
            | OpCode::Abs
            | OpCode::Sign
            | OpCode::Sin
            | OpCode::Cos
            | OpCode::Tan
            | OpCode::Asin
            | OpCode::Acos
            | OpCode::Atan
            | OpCode::Sqrt
            | OpCode::Exp
            | OpCode::Log => Arity::Exactly(1),
            OpCode::Function(_) => Arity::AtLeast(0),
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An expression: a symbol, a literal or an operation over child expressions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    Symbol(Symbol),
    Literal(Literal),
    Op { op: OpCode, args: Vec<Expr> },
}

impl Expr {
    pub fn symbol(name: impl Into<Arc<str>>) -> Self {
        Expr::Symbol(Symbol::named(name))
    }

    pub fn element(array: impl Into<Arc<str>>, index: usize) -> Self {
        Expr::Symbol(Symbol::element(array, index))
    }

    /// One expression per element of `array[0..len]`.
    pub fn array(array: &str, len: usize) -> Vec<Expr> {
        Symbol::array(array, len).into_iter().map(Expr::Symbol).collect()
    }

    pub fn int(n: i64) -> Self {
        Expr::Literal(Literal::Int(n))
    }

    pub fn float(x: f64) -> Self {
        Expr::Literal(Literal::Float(OrderedFloat(x)))
    }

    pub fn op(op: OpCode, args: Vec<Expr>) -> Self {
        Expr::Op { op, args }
    }

    /// n-ary sum.
    pub fn add(args: Vec<Expr>) -> Self {
        Expr::op(OpCode::Add, args)
    }

    /// n-ary product.
    pub fn mul(args: Vec<Expr>) -> Self {
        Expr::op(OpCode::Mul, args)
    }

    pub fn min(args: Vec<Expr>) -> Self {
        Expr::op(OpCode::Min, args)
    }

    pub fn max(args: Vec<Expr>) -> Self {
        Expr::op(OpCode::Max, args)
    }

    pub fn atan2(y: Expr, x: Expr) -> Self {
        Expr::op(OpCode::Atan2, vec![y, x])
    }

    pub fn function(name: impl Into<Arc<str>>, args: Vec<Expr>) -> Self {
        Expr::op(OpCode::Function(name.into()), args)
    }

    pub fn pow(&self, exponent: Expr) -> Self {
        Expr::op(OpCode::Pow, vec![self.clone(), exponent])
    }

    pub fn squared(&self) -> Self {
        self.pow(Expr::int(2))
    }

    fn unary(&self, op: OpCode) -> Self {
        Expr::op(op, vec![self.clone()])
    }

    pub fn abs(&self) -> Self {
        self.unary(OpCode::Abs)
    }

    pub fn sign(&self) -> Self {
        self.unary(OpCode::Sign)
    }

    pub fn sin(&self) -> Self {
        self.unary(OpCode::Sin)
    }

    pub fn cos(&self) -> Self {
        self.unary(OpCode::Cos)
    }

    pub fn tan(&self) -> Self {
        self.unary(OpCode::Tan)
    }

    pub fn asin(&self) -> Self {
        self.unary(OpCode::Asin)
    }

    pub fn acos(&self) -> Self {
        self.unary(OpCode::Acos)
    }

    pub fn atan(&self) -> Self {
        self.unary(OpCode::Atan)
    }

    pub fn sqrt(&self) -> Self {
        self.unary(OpCode::Sqrt)
    }

    pub fn exp(&self) -> Self {
        self.unary(OpCode::Exp)
    }

    pub fn ln(&self) -> Self {
        self.unary(OpCode::Log)
    }

    pub fn lt(&self, other: &Expr) -> Self {
        Expr::op(OpCode::Lt, vec![self.clone(), other.clone()])
    }

    pub fn le(&self, other: &Expr) -> Self {
        Expr::op(OpCode::Le, vec![self.clone(), other.clone()])
    }

    pub fn gt(&self, other: &Expr) -> Self {
        Expr::op(OpCode::Gt, vec![self.clone(), other.clone()])
    }

    pub fn ge(&self, other: &Expr) -> Self {
        Expr::op(OpCode::Ge, vec![self.clone(), other.clone()])
    }

    /// Check if this is a symbol or a literal.
    pub fn is_atom(&self) -> bool {
        !matches!(self, Expr::Op { .. })
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Expr::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<Literal> {
        match self {
            Expr::Literal(l) => Some(*l),
            _ => None,
        }
    }

    pub fn opcode(&self) -> Option<&OpCode> {
        match self {
            Expr::Op { op, .. } => Some(op),
            _ => None,
        }
    }

    /// Child expressions; empty for atoms.
    pub fn args(&self) -> &[Expr] {
        match self {
            Expr::Op { args, .. } => args,
            _ => &[],
        }
    }

    /// Visit every symbol occurrence, left to right, depth first.
    pub fn for_each_symbol<'a>(&'a self, visit: &mut impl FnMut(&'a Symbol)) {
        match self {
            Expr::Symbol(s) => visit(s),
            Expr::Literal(_) => {}
            Expr::Op { args, .. } => {
                for arg in args {
                    arg.for_each_symbol(visit);
                }
            }
        }
    }

    /// Collect all free symbols in this expression.
    pub fn free_symbols(&self) -> FxHashSet<Symbol> {
        let mut result = FxHashSet::default();
        self.for_each_symbol(&mut |s| {
            result.insert(s.clone());
        });
        result
    }

    /// Replace symbols by expressions. Symbols without a binding are kept.
    pub fn substitute(&self, bindings: &FxHashMap<Symbol, Expr>) -> Expr {
        match self {
            Expr::Symbol(s) => bindings.get(s).cloned().unwrap_or_else(|| self.clone()),
            Expr::Literal(_) => self.clone(),
            Expr::Op { op, args } => Expr::Op {
                op: op.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
        }
    }

    /// Number of arithmetic operations needed to evaluate the tree as
    /// written. An n-ary sum or product costs n - 1.
    pub fn count_ops(&self) -> usize {
        match self {
            Expr::Symbol(_) | Expr::Literal(_) => 0,
            Expr::Op { op, args } => {
                let own = match op {
                    OpCode::Add | OpCode::Mul | OpCode::Min | OpCode::Max => {
                        args.len().saturating_sub(1)
                    }
                    _ => 1,
                };
                own + args.iter().map(Expr::count_ops).sum::<usize>()
            }
        }
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        1 + self.args().iter().map(Expr::node_count).sum::<usize>()
    }

    /// Check every operation has an argument count its opcode accepts.
    pub fn validate(&self) -> CodegenResult<()> {
        if let Expr::Op { op, args } = self {
            let arity = op.arity();
            if !arity.accepts(args.len()) {
                return Err(CodegenError::MalformedExpression {
                    op: op.name().to_string(),
                    expected: arity,
                    found: args.len(),
                });
            }
            for arg in args {
                arg.validate()?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Symbol(s) => write!(f, "{}", s),
            Expr::Literal(l) => write!(f, "{}", l),
            Expr::Op { op, args } => {
                write!(f, "{}(", op)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<Symbol> for Expr {
    fn from(s: Symbol) -> Self {
        Expr::Symbol(s)
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Expr::int(n)
    }
}

impl From<f64> for Expr {
    fn from(x: f64) -> Self {
        Expr::float(x)
    }
}

impl From<&Expr> for Expr {
    fn from(e: &Expr) -> Self {
        e.clone()
    }
}

fn binary(op: OpCode, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Op {
        op,
        args: vec![lhs, rhs],
    }
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl ops::$trait<Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                binary($op, self, rhs)
            }
        }

        impl ops::$trait<&Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                binary($op, self, rhs.clone())
            }
        }

        impl ops::$trait<Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                binary($op, self.clone(), rhs)
            }
        }

        impl ops::$trait<&Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                binary($op, self.clone(), rhs.clone())
            }
        }

        impl ops::$trait<i64> for Expr {
            type Output = Expr;
            fn $method(self, rhs: i64) -> Expr {
                binary($op, self, Expr::int(rhs))
            }
        }

        impl ops::$trait<i64> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: i64) -> Expr {
                binary($op, self.clone(), Expr::int(rhs))
            }
        }

        impl ops::$trait<Expr> for i64 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                binary($op, Expr::int(self), rhs)
            }
        }

        impl ops::$trait<&Expr> for i64 {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                binary($op, Expr::int(self), rhs.clone())
            }
        }
    };
}

binary_operator!(Add, add, OpCode::Add);
binary_operator!(Sub, sub, OpCode::Sub);
binary_operator!(Mul, mul, OpCode::Mul);
binary_operator!(Div, div, OpCode::Div);

fn negate(e: Expr) -> Expr {
    match e {
        Expr::Literal(Literal::Int(n)) => match n.checked_neg() {
            Some(m) => Expr::int(m),
            None => Expr::op(OpCode::Neg, vec![Expr::int(n)]),
        },
        Expr::Literal(Literal::Float(x)) => Expr::float(-x.into_inner()),
        other => Expr::op(OpCode::Neg, vec![other]),
    }
}

impl ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        negate(self)
    }
}

impl ops::Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        negate(self.clone())
    }
}
