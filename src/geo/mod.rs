//! Expression builders for geometric group operations.
//!
//! Each group describes its operations as expression trees over flat storage
//! arrays (`a`, `b`), a flat tangent array (`vec`) and a scalar `epsilon`.
//! These trees are what the code generator lowers into the generated
//! numerical routines.
//!
//! Singular denominators are regularized with [`regularize`]:
//! `x + epsilon * (sign(x) + 1/2)` keeps the sign of `x` and is never zero
//! for `epsilon > 0`.

pub mod pose2;
pub mod pose3;
pub mod rot2;
pub mod rot3;

pub use pose2::Pose2;
pub use pose3::Pose3;
pub use rot2::Rot2;
pub use rot3::Rot3;

use crate::codegen::{CodegenConfig, GenerationRequest};
use crate::cse::{perform_cse, CseConfig, CseProgram};
use crate::error::{CodegenError, CodegenResult};
use crate::eval::Bindings;
use crate::expr::{Expr, Symbol};
use std::fmt;

/// A group whose elements are stored as flat arrays, with a tangent space.
pub trait LieGroup {
    /// Lowercase name, used for directories and modules
    const NAME: &'static str;
    const TYPE_NAME: &'static str;
    const STORAGE_DIM: usize;
    const TANGENT_DIM: usize;

    fn identity() -> Vec<Expr>;

    fn inverse(a: &[Expr]) -> Vec<Expr>;

    fn compose(a: &[Expr], b: &[Expr]) -> Vec<Expr>;

    /// Exponential map from a tangent vector to storage.
    fn from_tangent(vec: &[Expr], epsilon: &Expr) -> Vec<Expr>;

    /// Inverse of [`LieGroup::from_tangent`].
    fn to_tangent(a: &[Expr], epsilon: &Expr) -> Vec<Expr>;

    /// `compose(inverse(a), b)` as a single tree.
    fn between(a: &[Expr], b: &[Expr]) -> Vec<Expr> {
        Self::compose(&Self::inverse(a), b)
    }

    fn retract(a: &[Expr], vec: &[Expr], epsilon: &Expr) -> Vec<Expr> {
        Self::compose(a, &Self::from_tangent(vec, epsilon))
    }

    fn local_coordinates(a: &[Expr], b: &[Expr], epsilon: &Expr) -> Vec<Expr> {
        Self::to_tangent(&Self::between(a, b), epsilon)
    }
}

/// `x + epsilon * (sign(x) + 1/2)`
pub fn regularize(x: &Expr, epsilon: &Expr) -> Expr {
    x + epsilon * (x.sign() + Expr::float(0.5))
}

/// Formal parameter of a group operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Argument {
    A,
    B,
    Vec,
    Epsilon,
}

impl Argument {
    pub fn name(self) -> &'static str {
        match self {
            Argument::A => "a",
            Argument::B => "b",
            Argument::Vec => "vec",
            Argument::Epsilon => "epsilon",
        }
    }

    /// Array length, or `None` for a scalar.
    pub fn dim(self, group: GroupKind) -> Option<usize> {
        match self {
            Argument::A | Argument::B => Some(group.storage_dim()),
            Argument::Vec => Some(group.tangent_dim()),
            Argument::Epsilon => None,
        }
    }

    pub fn symbols(self, group: GroupKind) -> Vec<Symbol> {
        match self.dim(group) {
            Some(len) => Symbol::array(self.name(), len),
            None => vec![Symbol::named(self.name())],
        }
    }
}

/// The fixed set of operations generated for every group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupOp {
    Identity,
    Inverse,
    Compose,
    Between,
    FromTangent,
    ToTangent,
    Retract,
    LocalCoordinates,
}

impl GroupOp {
    pub const ALL: [GroupOp; 8] = [
        GroupOp::Identity,
        GroupOp::Inverse,
        GroupOp::Compose,
        GroupOp::Between,
        GroupOp::FromTangent,
        GroupOp::ToTangent,
        GroupOp::Retract,
        GroupOp::LocalCoordinates,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GroupOp::Identity => "identity",
            GroupOp::Inverse => "inverse",
            GroupOp::Compose => "compose",
            GroupOp::Between => "between",
            GroupOp::FromTangent => "from_tangent",
            GroupOp::ToTangent => "to_tangent",
            GroupOp::Retract => "retract",
            GroupOp::LocalCoordinates => "local_coordinates",
        }
    }

    /// Function name in generated C++.
    pub fn cpp_name(self) -> &'static str {
        match self {
            GroupOp::Identity => "Identity",
            GroupOp::Inverse => "Inverse",
            GroupOp::Compose => "Compose",
            GroupOp::Between => "Between",
            GroupOp::FromTangent => "FromTangent",
            GroupOp::ToTangent => "ToTangent",
            GroupOp::Retract => "Retract",
            GroupOp::LocalCoordinates => "LocalCoordinates",
        }
    }

    pub fn arguments(self) -> &'static [Argument] {
        match self {
            GroupOp::Identity => &[],
            GroupOp::Inverse => &[Argument::A],
            GroupOp::Compose | GroupOp::Between => &[Argument::A, Argument::B],
            GroupOp::FromTangent => &[Argument::Vec, Argument::Epsilon],
            GroupOp::ToTangent => &[Argument::A, Argument::Epsilon],
            GroupOp::Retract => &[Argument::A, Argument::Vec, Argument::Epsilon],
            GroupOp::LocalCoordinates => &[Argument::A, Argument::B, Argument::Epsilon],
        }
    }

    /// Whether the result is a tangent vector rather than storage.
    pub fn returns_tangent(self) -> bool {
        matches!(self, GroupOp::ToTangent | GroupOp::LocalCoordinates)
    }
}

impl fmt::Display for GroupOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The groups code is generated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Rot2,
    Rot3,
    Pose2,
    Pose3,
}

impl GroupKind {
    pub const ALL: [GroupKind; 4] = [
        GroupKind::Rot2,
        GroupKind::Rot3,
        GroupKind::Pose2,
        GroupKind::Pose3,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GroupKind::Rot2 => Rot2::NAME,
            GroupKind::Rot3 => Rot3::NAME,
            GroupKind::Pose2 => Pose2::NAME,
            GroupKind::Pose3 => Pose3::NAME,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            GroupKind::Rot2 => Rot2::TYPE_NAME,
            GroupKind::Rot3 => Rot3::TYPE_NAME,
            GroupKind::Pose2 => Pose2::TYPE_NAME,
            GroupKind::Pose3 => Pose3::TYPE_NAME,
        }
    }

    pub fn storage_dim(self) -> usize {
        match self {
            GroupKind::Rot2 => Rot2::STORAGE_DIM,
            GroupKind::Rot3 => Rot3::STORAGE_DIM,
            GroupKind::Pose2 => Pose2::STORAGE_DIM,
            GroupKind::Pose3 => Pose3::STORAGE_DIM,
        }
    }

    pub fn tangent_dim(self) -> usize {
        match self {
            GroupKind::Rot2 => Rot2::TANGENT_DIM,
            GroupKind::Rot3 => Rot3::TANGENT_DIM,
            GroupKind::Pose2 => Pose2::TANGENT_DIM,
            GroupKind::Pose3 => Pose3::TANGENT_DIM,
        }
    }

    /// Length of the result of `op`.
    pub fn output_dim(self, op: GroupOp) -> usize {
        if op.returns_tangent() {
            self.tangent_dim()
        } else {
            self.storage_dim()
        }
    }

    /// Inputs and output trees of `op` for this group.
    pub fn build(self, op: GroupOp) -> OpDefinition {
        let outputs = match self {
            GroupKind::Rot2 => build_outputs::<Rot2>(op),
            GroupKind::Rot3 => build_outputs::<Rot3>(op),
            GroupKind::Pose2 => build_outputs::<Pose2>(op),
            GroupKind::Pose3 => build_outputs::<Pose3>(op),
        };
        let inputs = op
            .arguments()
            .iter()
            .flat_map(|arg| arg.symbols(self))
            .collect();
        OpDefinition {
            group: self,
            op,
            inputs,
            outputs,
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn build_outputs<G: LieGroup>(op: GroupOp) -> Vec<Expr> {
    let a = Expr::array(Argument::A.name(), G::STORAGE_DIM);
    let b = Expr::array(Argument::B.name(), G::STORAGE_DIM);
    let vec = Expr::array(Argument::Vec.name(), G::TANGENT_DIM);
    let epsilon = Expr::symbol(Argument::Epsilon.name());

    match op {
        GroupOp::Identity => G::identity(),
        GroupOp::Inverse => G::inverse(&a),
        GroupOp::Compose => G::compose(&a, &b),
        GroupOp::Between => G::between(&a, &b),
        GroupOp::FromTangent => G::from_tangent(&vec, &epsilon),
        GroupOp::ToTangent => G::to_tangent(&a, &epsilon),
        GroupOp::Retract => G::retract(&a, &vec, &epsilon),
        GroupOp::LocalCoordinates => G::local_coordinates(&a, &b, &epsilon),
    }
}

/// One group operation as a generation request.
#[derive(Clone, Debug)]
pub struct OpDefinition {
    pub group: GroupKind,
    pub op: GroupOp,
    /// Flattened arguments, in signature order
    pub inputs: Vec<Symbol>,
    pub outputs: Vec<Expr>,
}

impl OpDefinition {
    pub fn request(&self, config: CodegenConfig) -> GenerationRequest {
        GenerationRequest::new(self.inputs.clone(), self.outputs.clone(), config)
    }
}

/// A group operation lowered to a CSE program, callable on numbers.
///
/// Runs exactly the temporaries and outputs the generated code runs, which
/// is how the numerical contract is checked without compiling anything.
#[derive(Clone, Debug)]
pub struct CompiledOp {
    pub group: GroupKind,
    pub op: GroupOp,
    program: CseProgram,
    input_array: String,
    input_len: usize,
}

impl CompiledOp {
    pub fn compile(group: GroupKind, op: GroupOp) -> CodegenResult<Self> {
        let definition = group.build(op);
        let config = CseConfig::default();
        let program = perform_cse(&definition.inputs, &definition.outputs, &config)?;
        Ok(Self {
            group,
            op,
            program,
            input_array: config.input_array,
            input_len: definition.inputs.len(),
        })
    }

    pub fn program(&self) -> &CseProgram {
        &self.program
    }

    /// Call with one slice per argument, scalars as one-element slices.
    pub fn call(&self, args: &[&[f64]]) -> CodegenResult<Vec<f64>> {
        let flat: Vec<f64> = args.iter().flat_map(|a| a.iter().copied()).collect();
        if flat.len() != self.input_len {
            return Err(CodegenError::Evaluation {
                message: format!(
                    "{}.{} takes {} values, got {}",
                    self.group,
                    self.op,
                    self.input_len,
                    flat.len()
                ),
            });
        }
        let mut bindings = Bindings::new();
        bindings.bind_array(&self.input_array, &flat);
        self.program.evaluate(&bindings)
    }
}
