//! Rotations in the plane.
//!
//! Storage is the complex number `(cos, sin)`; the tangent is `(theta)`.

use super::{regularize, LieGroup};
use crate::expr::Expr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rot2;

/// `(c_a + i s_a) * (c_b + i s_b)`
pub(super) fn complex_product(ac: &Expr, as_: &Expr, bc: &Expr, bs: &Expr) -> [Expr; 2] {
    [ac * bc - as_ * bs, as_ * bc + ac * bs]
}

/// `(c', s')` with `conj(z) / |z|^2 = c' - i s'`. Exact for non-unit `z`.
pub(super) fn scaled_conjugate(c: &Expr, s: &Expr) -> (Expr, Expr) {
    let inv_norm2 = 1 / (c.squared() + s.squared());
    (c * &inv_norm2, s * &inv_norm2)
}

/// Angle of `c + i s`, with the real part regularized.
pub(super) fn angle(c: &Expr, s: &Expr, epsilon: &Expr) -> Expr {
    Expr::atan2(s.clone(), regularize(c, epsilon))
}

impl LieGroup for Rot2 {
    const NAME: &'static str = "rot2";
    const TYPE_NAME: &'static str = "Rot2";
    const STORAGE_DIM: usize = 2;
    const TANGENT_DIM: usize = 1;

    fn identity() -> Vec<Expr> {
        vec![Expr::int(1), Expr::int(0)]
    }

    fn inverse(a: &[Expr]) -> Vec<Expr> {
        let (c_inv, s_inv) = scaled_conjugate(&a[0], &a[1]);
        vec![c_inv, -&s_inv]
    }

    fn compose(a: &[Expr], b: &[Expr]) -> Vec<Expr> {
        complex_product(&a[0], &a[1], &b[0], &b[1]).to_vec()
    }

    fn from_tangent(vec: &[Expr], _epsilon: &Expr) -> Vec<Expr> {
        vec![vec[0].cos(), vec[0].sin()]
    }

    fn to_tangent(a: &[Expr], epsilon: &Expr) -> Vec<Expr> {
        vec![angle(&a[0], &a[1], epsilon)]
    }
}
