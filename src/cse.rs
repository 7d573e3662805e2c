//! Common-subexpression elimination over a batch of output expressions.
//!
//! The engine works in two passes over the outputs, in declaration order:
//!
//! 1. A pre-order walk counts operation nodes by structural equality. A node
//!    met a second time is marked repeated and its children are not walked
//!    again, so a subtree that only ever occurs inside one repeated parent is
//!    not itself repeated.
//! 2. A post-order walk rewrites the trees. A repeated node becomes a
//!    temporary after its children have been rewritten, which puts every
//!    temporary after the temporaries it uses. Later occurrences are replaced
//!    by the temporary's symbol.
//!
//! Names are handed out as temporaries are created, so the program depends
//! only on tree shape and is identical from run to run.

use crate::error::{CodegenError, CodegenResult};
use crate::expr::{Expr, OpCode, Symbol};
use log::trace;
use rustc_hash::{FxHashMap, FxHashSet};

/// Configuration for CSE and input linearization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CseConfig {
    /// Replace input symbols by `input_array[i]` after CSE.
    pub linearize_inputs: bool,
    /// Temporaries are named `<temp_prefix>0`, `<temp_prefix>1`, ...
    pub temp_prefix: String,
    /// Name of the synthetic array used by linearization.
    pub input_array: String,
}

impl Default for CseConfig {
    fn default() -> Self {
        Self {
            linearize_inputs: true,
            temp_prefix: "tmp".to_string(),
            input_array: "inp".to_string(),
        }
    }
}

impl CseConfig {
    /// Keep input names as they are.
    pub fn without_linearization() -> Self {
        Self {
            linearize_inputs: false,
            ..Default::default()
        }
    }

    /// `_tmp<n>` temporaries and named inputs, the layout used by function
    /// templates.
    pub fn for_templates() -> Self {
        Self {
            linearize_inputs: false,
            temp_prefix: "_tmp".to_string(),
            ..Default::default()
        }
    }

    fn temp_symbol(&self, index: usize) -> Symbol {
        Symbol::named(format!("{}{}", self.temp_prefix, index))
    }

    /// Check if `symbol` could be mistaken for a generated temporary.
    fn is_reserved(&self, symbol: &Symbol) -> bool {
        match symbol {
            Symbol::Named(name) => name
                .strip_prefix(self.temp_prefix.as_str())
                .map_or(false, |rest| {
                    !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
                }),
            Symbol::Element { .. } => false,
        }
    }
}

/// A named intermediate value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Temporary {
    pub symbol: Symbol,
    pub expr: Expr,
}

impl Temporary {
    pub fn name(&self) -> String {
        self.symbol.to_string()
    }
}

/// Ordered temporaries plus the outputs rewritten in terms of them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CseProgram {
    pub temporaries: Vec<Temporary>,
    pub outputs: Vec<Expr>,
}

impl CseProgram {
    /// A program with no temporaries.
    pub fn passthrough(outputs: Vec<Expr>) -> Self {
        CseProgram {
            temporaries: Vec::new(),
            outputs,
        }
    }

    pub fn len(&self) -> usize {
        self.temporaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temporaries.is_empty()
    }

    /// Substitute every temporary back into the outputs.
    pub fn inline(&self) -> Vec<Expr> {
        let mut bindings: FxHashMap<Symbol, Expr> = FxHashMap::default();
        for temp in &self.temporaries {
            let expanded = temp.expr.substitute(&bindings);
            bindings.insert(temp.symbol.clone(), expanded);
        }
        self.outputs.iter().map(|o| o.substitute(&bindings)).collect()
    }

    /// Operations needed to run the whole program once.
    pub fn op_count(&self) -> usize {
        self.temporaries
            .iter()
            .map(|t| t.expr.count_ops())
            .chain(self.outputs.iter().map(Expr::count_ops))
            .sum()
    }

    /// Apply a substitution to every temporary definition and output.
    fn substitute(&self, bindings: &FxHashMap<Symbol, Expr>) -> CseProgram {
        CseProgram {
            temporaries: self
                .temporaries
                .iter()
                .map(|t| Temporary {
                    symbol: t.symbol.clone(),
                    expr: t.expr.substitute(bindings),
                })
                .collect(),
            outputs: self.outputs.iter().map(|o| o.substitute(bindings)).collect(),
        }
    }
}

/// Check the declared inputs and that the outputs only use them.
///
/// Runs before any rewriting so a bad request fails with nothing produced.
pub fn validate_request(
    input_symbols: &[Symbol],
    output_exprs: &[Expr],
    config: &CseConfig,
) -> CodegenResult<()> {
    let mut declared: FxHashSet<&Symbol> = FxHashSet::default();
    for symbol in input_symbols {
        if !declared.insert(symbol) {
            return Err(CodegenError::DuplicateInput {
                symbol: symbol.clone(),
            });
        }
        if config.is_reserved(symbol) {
            return Err(CodegenError::ReservedSymbol {
                symbol: symbol.clone(),
                prefix: config.temp_prefix.clone(),
            });
        }
    }

    for output in output_exprs {
        output.validate()?;

        let mut undefined = None;
        output.for_each_symbol(&mut |s| {
            if undefined.is_none() && !declared.contains(s) {
                undefined = Some(s.clone());
            }
        });
        if let Some(symbol) = undefined {
            return Err(CodegenError::UndefinedSymbol { symbol });
        }
    }
    Ok(())
}

/// Run common sub-expression elimination on the given inputs and outputs.
///
/// Returns the temporaries in dependency order and the outputs rewritten in
/// terms of them. With `config.linearize_inputs` every input reference is
/// then replaced by an element of `config.input_array`, in input order.
pub fn perform_cse(
    input_symbols: &[Symbol],
    output_exprs: &[Expr],
    config: &CseConfig,
) -> CodegenResult<CseProgram> {
    validate_request(input_symbols, output_exprs, config)?;

    let repeated = find_repeated(output_exprs);
    let mut hoister = Hoister {
        repeated: &repeated,
        assigned: FxHashMap::default(),
        temporaries: Vec::new(),
        config,
    };
    let outputs: Vec<Expr> = output_exprs.iter().map(|o| hoister.rewrite(o)).collect();
    let program = CseProgram {
        temporaries: hoister.temporaries,
        outputs,
    };

    if config.linearize_inputs {
        Ok(linearize_inputs(&program, input_symbols, &config.input_array))
    } else {
        Ok(program)
    }
}

/// Replace each input symbol by `array[i]`, `i` being its position in
/// `input_symbols`.
pub fn linearize_inputs(program: &CseProgram, input_symbols: &[Symbol], array: &str) -> CseProgram {
    let bindings: FxHashMap<Symbol, Expr> = input_symbols
        .iter()
        .enumerate()
        .map(|(i, s)| (s.clone(), Expr::element(array, i)))
        .collect();
    program.substitute(&bindings)
}

/// Whether a node is a candidate for a temporary. Atoms are free to reuse
/// and so is the negation of an atom.
fn worth_hoisting(expr: &Expr) -> bool {
    match expr {
        Expr::Symbol(_) | Expr::Literal(_) => false,
        Expr::Op {
            op: OpCode::Neg,
            args,
        } => !args.iter().all(Expr::is_atom),
        Expr::Op { .. } => true,
    }
}

fn find_repeated(outputs: &[Expr]) -> FxHashSet<&Expr> {
    let mut seen = FxHashSet::default();
    let mut repeated = FxHashSet::default();
    for output in outputs {
        mark_repeated(output, &mut seen, &mut repeated);
    }
    repeated
}

fn mark_repeated<'a>(
    expr: &'a Expr,
    seen: &mut FxHashSet<&'a Expr>,
    repeated: &mut FxHashSet<&'a Expr>,
) {
    if !worth_hoisting(expr) {
        return;
    }
    if !seen.insert(expr) {
        repeated.insert(expr);
        return;
    }
    for arg in expr.args() {
        mark_repeated(arg, seen, repeated);
    }
}

struct Hoister<'a> {
    repeated: &'a FxHashSet<&'a Expr>,
    assigned: FxHashMap<&'a Expr, Symbol>,
    temporaries: Vec<Temporary>,
    config: &'a CseConfig,
}

impl<'a> Hoister<'a> {
    fn rewrite(&mut self, expr: &'a Expr) -> Expr {
        if let Some(symbol) = self.assigned.get(expr) {
            return Expr::Symbol(symbol.clone());
        }

        let rewritten = match expr {
            Expr::Op { op, args } => Expr::Op {
                op: op.clone(),
                args: args.iter().map(|a| self.rewrite(a)).collect(),
            },
            atom => return atom.clone(),
        };

        if !self.repeated.contains(expr) {
            return rewritten;
        }

        let symbol = self.config.temp_symbol(self.temporaries.len());
        trace!("hoisting {} = {}", symbol, rewritten);
        self.temporaries.push(Temporary {
            symbol: symbol.clone(),
            expr: rewritten,
        });
        self.assigned.insert(expr, symbol.clone());
        Expr::Symbol(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::symbol("x")
    }

    fn y() -> Expr {
        Expr::symbol("y")
    }

    fn inputs() -> Vec<Symbol> {
        vec![Symbol::named("x"), Symbol::named("y")]
    }

    #[test]
    fn test_shared_subexpression_across_outputs() {
        let shared = x().sin() * y();
        let outputs = vec![&shared + 1, &shared * 2];

        let program = perform_cse(&inputs(), &outputs, &CseConfig::without_linearization()).unwrap();

        assert_eq!(program.len(), 1);
        assert_eq!(program.temporaries[0].name(), "tmp0");
        assert_eq!(program.temporaries[0].expr, shared);
        assert_eq!(program.outputs[0], Expr::symbol("tmp0") + 1);
        assert_eq!(program.outputs[1], Expr::symbol("tmp0") * 2);
    }

    #[test]
    fn test_children_hoisted_before_parents() {
        // c = cos(x) repeats on its own and inside the repeated (c * y).
        let c = x().cos();
        let cy = &c * y();
        let outputs = vec![&cy + &c, &cy - 1];

        let program = perform_cse(&inputs(), &outputs, &CseConfig::without_linearization()).unwrap();

        assert_eq!(program.len(), 2);
        assert_eq!(program.temporaries[0].expr, c);
        assert_eq!(program.temporaries[1].expr, Expr::symbol("tmp0") * y());
        assert_eq!(program.outputs[0], Expr::symbol("tmp1") + Expr::symbol("tmp0"));
        assert_eq!(program.outputs[1], Expr::symbol("tmp1") - 1);
    }

    #[test]
    fn test_subtree_only_inside_repeated_parent_is_not_hoisted() {
        // sin(x) only ever occurs inside (sin(x) + y), so it stays inline.
        let parent = x().sin() + y();
        let outputs = vec![parent.sqrt(), &parent * 3];

        let program = perform_cse(&inputs(), &outputs, &CseConfig::without_linearization()).unwrap();

        assert_eq!(program.len(), 1);
        assert_eq!(program.temporaries[0].expr, parent);
    }

    #[test]
    fn test_no_sharing_is_a_noop() {
        let outputs = vec![x() + y(), x() * y(), -x()];
        let program = perform_cse(&inputs(), &outputs, &CseConfig::without_linearization()).unwrap();
        assert!(program.is_empty());
        assert_eq!(program.outputs, outputs);
    }

    #[test]
    fn test_negated_atoms_are_not_hoisted() {
        let outputs = vec![-x() + y(), -x() * y()];
        let program = perform_cse(&inputs(), &outputs, &CseConfig::without_linearization()).unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn test_identical_outputs_share_a_temporary() {
        let e = x() * y();
        let program =
            perform_cse(&inputs(), &[e.clone(), e.clone()], &CseConfig::without_linearization()).unwrap();
        assert_eq!(program.len(), 1);
        assert_eq!(program.outputs, vec![Expr::symbol("tmp0"), Expr::symbol("tmp0")]);
    }

    #[test]
    fn test_linearization_uses_input_order() {
        let shared = x() * y();
        let outputs = vec![&shared + y(), shared.clone()];

        let program = perform_cse(&inputs(), &outputs, &CseConfig::default()).unwrap();

        assert_eq!(
            program.temporaries[0].expr,
            Expr::element("inp", 0) * Expr::element("inp", 1)
        );
        assert_eq!(program.outputs[0], Expr::symbol("tmp0") + Expr::element("inp", 1));
    }

    #[test]
    fn test_undefined_symbol_fails_fast() {
        let outputs = vec![x() + Expr::symbol("z")];
        let err = perform_cse(&inputs(), &outputs, &CseConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CodegenError::UndefinedSymbol { ref symbol } if *symbol == Symbol::named("z")
        ));
    }

    #[test]
    fn test_duplicate_and_reserved_inputs_rejected() {
        let dup = vec![Symbol::named("x"), Symbol::named("x")];
        assert!(matches!(
            perform_cse(&dup, &[x()], &CseConfig::default()),
            Err(CodegenError::DuplicateInput { .. })
        ));

        let reserved = vec![Symbol::named("tmp3")];
        assert!(matches!(
            perform_cse(&reserved, &[Expr::symbol("tmp3")], &CseConfig::default()),
            Err(CodegenError::ReservedSymbol { .. })
        ));

        // Only `<prefix><digits>` is reserved.
        let fine = vec![Symbol::named("tmpx"), Symbol::named("tmp")];
        assert!(perform_cse(&fine, &[Expr::symbol("tmpx")], &CseConfig::default()).is_ok());
    }

    #[test]
    fn test_inline_reproduces_outputs() {
        let c = x().cos();
        let cy = &c * y();
        let outputs = vec![&cy + &c, (&cy - 1).sqrt(), Expr::atan2(cy.clone(), c.clone())];

        let program = perform_cse(&inputs(), &outputs, &CseConfig::without_linearization()).unwrap();
        assert_eq!(program.inline(), outputs);
    }

    #[test]
    fn test_op_count() {
        let shared = x() * y();
        let outputs = vec![&shared + 1, &shared + 2];
        let program = perform_cse(&inputs(), &outputs, &CseConfig::default()).unwrap();
        // tmp0 = x*y, then two additions
        assert_eq!(program.op_count(), 3);
    }
}
