//! The printed text computes what the tree computes.
//!
//! A small reader parses generated Python and C++ back, evaluating as it
//! goes with the target's number types: integer literals and comparisons are
//! ints, `/` between ints floors in Python 2 and truncates in C++, and C++
//! temporaries are `Scalar`. Its results must agree with [`evaluate`] on
//! the original trees.

use geo_codegen::{
    evaluate, generate, Bindings, CodegenConfig, CodegenMode, CseConfig, Expr, GeneratedCode,
    GenerationRequest, GroupKind, GroupOp, Symbol,
};
use proptest::prelude::*;
use rustc_hash::FxHashMap;

// ============================================================================
// Reader
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
enum Value {
    Int(i64),
    Float(f64),
}

impl Value {
    fn to_f64(self) -> f64 {
        match self {
            Value::Int(n) => n as f64,
            Value::Float(x) => x,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Name(String),
    Punct(&'static str),
}

const PUNCT: [&str; 14] = [
    "**", ">=", "<=", "(", ")", "[", "]", ",", "+", "-", "*", "/", ">", "<",
];

fn number_end(s: &str) -> usize {
    let b = s.as_bytes();
    let mut i = 0;
    while i < b.len() && (b[i].is_ascii_digit() || b[i] == b'.') {
        i += 1;
    }
    if i < b.len() && b[i] == b'e' {
        i += 1;
        if i < b.len() && (b[i] == b'-' || b[i] == b'+') {
            i += 1;
        }
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
    }
    i
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = text;
    'next: while let Some(c) = rest.chars().next() {
        if c == ' ' {
            rest = &rest[1..];
            continue;
        }
        if c.is_ascii_digit() {
            let (literal, tail) = rest.split_at(number_end(rest));
            tokens.push(if literal.contains(|ch| ch == '.' || ch == 'e') {
                Token::Float(literal.parse().unwrap())
            } else {
                Token::Int(literal.parse().unwrap())
            });
            rest = tail;
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let end = rest
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' || ch == ':'))
                .unwrap_or(rest.len());
            let mut name = rest[..end].to_string();
            rest = &rest[end..];
            if let Some(tail) = rest.strip_prefix("<Scalar>") {
                name.push_str("<Scalar>");
                rest = tail;
            }
            tokens.push(Token::Name(name));
            continue;
        }
        for p in PUNCT {
            if let Some(tail) = rest.strip_prefix(p) {
                tokens.push(Token::Punct(p));
                rest = tail;
                continue 'next;
            }
        }
        panic!("cannot read {:?}", rest);
    }
    tokens
}

/// Recursive-descent evaluator over one printed expression.
struct Reader<'a> {
    mode: CodegenMode,
    tokens: Vec<Token>,
    pos: usize,
    env: &'a FxHashMap<String, Value>,
}

impl<'a> Reader<'a> {
    fn read(mode: CodegenMode, text: &str, env: &'a FxHashMap<String, Value>) -> Value {
        let mut reader = Reader {
            mode,
            tokens: tokenize(text),
            pos: 0,
            env,
        };
        let value = reader.comparison();
        assert_eq!(reader.pos, reader.tokens.len(), "trailing tokens in {:?}", text);
        value
    }

    fn peek_punct(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(Token::Punct(p)) => Some(*p),
            _ => None,
        }
    }

    fn expect(&mut self, punct: &str) {
        assert_eq!(self.peek_punct(), Some(punct), "at token {}", self.pos);
        self.pos += 1;
    }

    fn comparison(&mut self) -> Value {
        let lhs = self.additive();
        let op = match self.peek_punct() {
            Some(p @ (">" | "<" | ">=" | "<=")) => p,
            _ => return lhs,
        };
        self.pos += 1;
        let rhs = self.additive();
        let (a, b) = (lhs.to_f64(), rhs.to_f64());
        let holds = match op {
            ">" => a > b,
            "<" => a < b,
            ">=" => a >= b,
            _ => a <= b,
        };
        Value::Int(holds as i64)
    }

    fn additive(&mut self) -> Value {
        let mut value = self.multiplicative();
        while let Some(op @ ("+" | "-")) = self.peek_punct() {
            self.pos += 1;
            let rhs = self.multiplicative();
            value = self.arithmetic(op, value, rhs);
        }
        value
    }

    fn multiplicative(&mut self) -> Value {
        let mut value = self.unary();
        while let Some(op @ ("*" | "/")) = self.peek_punct() {
            self.pos += 1;
            let rhs = self.unary();
            value = self.arithmetic(op, value, rhs);
        }
        value
    }

    fn unary(&mut self) -> Value {
        if self.peek_punct() == Some("-") {
            self.pos += 1;
            return match self.unary() {
                Value::Int(n) => Value::Int(-n),
                Value::Float(x) => Value::Float(-x),
            };
        }
        self.power()
    }

    fn power(&mut self) -> Value {
        let base = self.primary();
        if self.peek_punct() != Some("**") {
            return base;
        }
        self.pos += 1;
        let exponent = self.unary();
        match (base, exponent) {
            (Value::Int(m), Value::Int(n)) if n >= 0 => Value::Int(m.pow(n as u32)),
            _ => Value::Float(base.to_f64().powf(exponent.to_f64())),
        }
    }

    fn primary(&mut self) -> Value {
        let token = self.tokens[self.pos].clone();
        self.pos += 1;
        match token {
            Token::Int(n) => Value::Int(n),
            Token::Float(x) => Value::Float(x),
            Token::Punct("(") => {
                let value = self.comparison();
                self.expect(")");
                value
            }
            Token::Name(name) => match self.peek_punct() {
                Some("[") => {
                    self.pos += 1;
                    let index = match self.tokens[self.pos] {
                        Token::Int(i) => i,
                        ref other => panic!("bad index {:?}", other),
                    };
                    self.pos += 1;
                    self.expect("]");
                    self.lookup(&format!("{}[{}]", name, index))
                }
                Some("(") => {
                    self.pos += 1;
                    let mut args = vec![self.comparison()];
                    while self.peek_punct() == Some(",") {
                        self.pos += 1;
                        args.push(self.comparison());
                    }
                    self.expect(")");
                    call(&name, &args)
                }
                _ => self.lookup(&name),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    fn lookup(&self, name: &str) -> Value {
        *self
            .env
            .get(name)
            .unwrap_or_else(|| panic!("`{}` is not defined", name))
    }

    fn arithmetic(&self, op: &str, lhs: Value, rhs: Value) -> Value {
        if let (Value::Int(m), Value::Int(n)) = (lhs, rhs) {
            return match op {
                "+" => Value::Int(m + n),
                "-" => Value::Int(m - n),
                "*" => Value::Int(m * n),
                _ => match self.mode {
                    CodegenMode::Python3 => Value::Float(m as f64 / n as f64),
                    CodegenMode::Python2 => Value::Int((m as f64 / n as f64).floor() as i64),
                    CodegenMode::Cpp => Value::Int(m / n),
                },
            };
        }
        let (x, y) = (lhs.to_f64(), rhs.to_f64());
        Value::Float(match op {
            "+" => x + y,
            "-" => x - y,
            "*" => x * y,
            _ => x / y,
        })
    }
}

fn call(name: &str, args: &[Value]) -> Value {
    let unary = |f: fn(f64) -> f64| Value::Float(f(args[0].to_f64()));
    match name {
        "float" | "Scalar" => unary(|x| x),
        "numpy.sign" => match args[0] {
            Value::Int(n) => Value::Int(n.signum()),
            Value::Float(x) if x == 0.0 => Value::Float(x),
            Value::Float(x) => Value::Float(x.signum()),
        },
        "numpy.sin" | "std::sin" => unary(f64::sin),
        "numpy.cos" | "std::cos" => unary(f64::cos),
        "numpy.sqrt" | "std::sqrt" => unary(f64::sqrt),
        "numpy.arctan2" | "std::atan2" => Value::Float(args[0].to_f64().atan2(args[1].to_f64())),
        "std::pow" => Value::Float(args[0].to_f64().powf(args[1].to_f64())),
        _ => panic!("unknown function `{}`", name),
    }
}

/// Run printed code: temporaries in order, then the outputs.
fn run(mode: CodegenMode, code: &GeneratedCode, inputs: &FxHashMap<String, Value>) -> Vec<f64> {
    let mut env = inputs.clone();
    for (name, text) in &code.temporaries {
        let value = match Reader::read(mode, text, &env) {
            // declared `const Scalar`
            Value::Int(n) if mode == CodegenMode::Cpp => Value::Float(n as f64),
            value => value,
        };
        env.insert(name.clone(), value);
    }
    code.outputs
        .iter()
        .map(|text| Reader::read(mode, text, &env).to_f64())
        .collect()
}

fn close(actual: f64, expected: f64) -> bool {
    (actual.is_nan() && expected.is_nan()) || (actual - expected).abs() <= 1e-9 * (1.0 + expected.abs())
}

fn check_printed(
    inputs: &[Symbol],
    values: &[f64],
    outputs: &[Expr],
    config: CodegenConfig,
) -> Result<(), String> {
    let mode = config.mode;
    let mut bindings = Bindings::new();
    let mut env = FxHashMap::default();
    for (symbol, &value) in inputs.iter().zip(values) {
        bindings.bind(symbol.clone(), value);
        env.insert(symbol.to_string(), Value::Float(value));
    }
    let request = GenerationRequest::builder(inputs.to_vec(), outputs.to_vec())
        .config(config)
        .build();
    let code = generate(&request).map_err(|e| e.to_string())?;
    let actual = run(mode, &code, &env);
    for (i, (output, got)) in outputs.iter().zip(actual).enumerate() {
        let want = evaluate(output, &bindings).map_err(|e| e.to_string())?;
        if !close(got, want) {
            return Err(format!(
                "{} output {}: text gives {}, tree gives {}\n{:?}",
                mode, i, got, want, code
            ));
        }
    }
    Ok(())
}

// ============================================================================
// Fixed cases
// ============================================================================

fn x() -> Expr {
    Expr::element("x", 0)
}

#[test]
fn test_integer_quotients_are_true_division() {
    let outputs = vec![
        (x().sign() + 1) / 2,
        (Expr::int(1) + 2) / 4,
        x().gt(&Expr::int(0)) / 2,
        Expr::int(-3) / 4,
    ];
    let inputs = Symbol::array("x", 1);
    for mode in CodegenMode::ALL {
        for value in [0.0, 1.5, -1.5] {
            let config = CodegenConfig {
                mode,
                cse_config: CseConfig::without_linearization(),
                ..Default::default()
            };
            check_printed(&inputs, &[value], &outputs, config).unwrap();
        }
    }
}

#[test]
fn test_shared_comparison_divides_as_float() {
    let step = x().lt(&Expr::int(1));
    let outputs = vec![&step / 2, &step * 3];
    let inputs = Symbol::array("x", 1);
    for mode in CodegenMode::ALL {
        let config = CodegenConfig {
            mode,
            cse_config: CseConfig::without_linearization(),
            ..Default::default()
        };
        check_printed(&inputs, &[0.25], &outputs, config).unwrap();
    }
}

#[test]
fn test_printed_group_ops_evaluate_like_trees() {
    for group in GroupKind::ALL {
        for op in GroupOp::ALL {
            let def = group.build(op);
            let values: Vec<f64> = def
                .inputs
                .iter()
                .enumerate()
                .map(|(i, s)| if s.to_string() == "epsilon" { 1e-8 } else { (0.7 * i as f64 + 0.3).sin() })
                .collect();
            for mode in CodegenMode::ALL {
                let config = CodegenConfig {
                    mode,
                    cse_config: CseConfig::for_templates(),
                    ..Default::default()
                };
                if let Err(message) = check_printed(&def.inputs, &values, &def.outputs, config) {
                    panic!("{}.{}: {}", group, op, message);
                }
            }
        }
    }
}

// ============================================================================
// Random trees
// ============================================================================

/// Mixes int and float leaves under division, sign and comparison.
fn arb_numeric_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (0..3usize).prop_map(|i| Expr::element("x", i)),
        (-3i64..4).prop_map(Expr::int),
        Just(Expr::float(0.5)),
    ];
    leaf.prop_recursive(4, 40, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a + b),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a - b),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a * b),
            // denominator is at least 1
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a / (&b * &b + 1)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.gt(&b)),
            inner.clone().prop_map(|a| a.sign()),
            inner.clone().prop_map(|a| a.squared()),
            inner.clone().prop_map(|a| a.sin()),
            inner.clone().prop_map(|a| -a),
            proptest::collection::vec(inner, 2..4).prop_map(Expr::add),
        ]
    })
}

proptest! {
    #[test]
    fn fuzz_printed_text_evaluates_like_tree(
        outputs in proptest::collection::vec(arb_numeric_expr(), 1..4),
        values in proptest::array::uniform3(-2.0f64..2.0),
        cse in any::<bool>(),
    ) {
        let inputs = Symbol::array("x", 3);
        for mode in CodegenMode::ALL {
            let config = CodegenConfig {
                mode,
                cse,
                cse_config: CseConfig::without_linearization(),
            };
            let checked = check_printed(&inputs, &values, &outputs, config);
            prop_assert!(checked.is_ok(), "{}", checked.unwrap_err());
        }
    }
}
