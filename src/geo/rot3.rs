//! Rotations in space.
//!
//! Storage is a unit quaternion `(x, y, z, w)`; the tangent is a rotation
//! vector `(wx, wy, wz)`. The inverse is the conjugate, which assumes a
//! unit norm.

use super::{regularize, LieGroup};
use crate::expr::Expr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rot3;

/// Hamilton product of `(x, y, z, w)` quaternions.
pub(super) fn quaternion_product(a: &[Expr], b: &[Expr]) -> Vec<Expr> {
    let (ax, ay, az, aw) = (&a[0], &a[1], &a[2], &a[3]);
    let (bx, by, bz, bw) = (&b[0], &b[1], &b[2], &b[3]);
    vec![
        aw * bx + ax * bw + ay * bz - az * by,
        aw * by - ax * bz + ay * bw + az * bx,
        aw * bz + ax * by - ay * bx + az * bw,
        aw * bw - ax * bx - ay * by - az * bz,
    ]
}

pub(super) fn conjugate(q: &[Expr]) -> Vec<Expr> {
    vec![-&q[0], -&q[1], -&q[2], q[3].clone()]
}

fn norm(v: &[Expr]) -> Expr {
    Expr::add(v.iter().map(Expr::squared).collect()).sqrt()
}

/// Quaternion of the rotation vector `omega`.
pub(super) fn exp(omega: &[Expr], epsilon: &Expr) -> Vec<Expr> {
    let angle = regularize(&norm(omega), epsilon);
    let half = &angle / 2;
    // sin(angle/2)/angle stays near 1/2 as the angle goes to zero
    let scale = half.sin() / &angle;
    let mut out: Vec<Expr> = omega.iter().map(|w| &scale * w).collect();
    out.push(half.cos());
    out
}

/// Rotation vector of the quaternion `q`, with angle in `[0, pi]`.
pub(super) fn log(q: &[Expr], epsilon: &Expr) -> Vec<Expr> {
    let (xyz, w) = (&q[..3], &q[3]);
    // -1 or 1; picks the quaternion with w >= 0 so the angle is in [0, pi]
    let w_sign = (w.sign() + Expr::float(0.5)).sign();
    let xyz_norm = norm(xyz);
    let angle = 2 * Expr::atan2(xyz_norm.clone(), regularize(&(&w_sign * w), epsilon));
    let scale = angle / regularize(&xyz_norm, epsilon) * &w_sign;
    xyz.iter().map(|v| &scale * v).collect()
}

impl LieGroup for Rot3 {
    const NAME: &'static str = "rot3";
    const TYPE_NAME: &'static str = "Rot3";
    const STORAGE_DIM: usize = 4;
    const TANGENT_DIM: usize = 3;

    fn identity() -> Vec<Expr> {
        [0, 0, 0, 1].into_iter().map(Expr::int).collect()
    }

    fn inverse(a: &[Expr]) -> Vec<Expr> {
        conjugate(a)
    }

    fn compose(a: &[Expr], b: &[Expr]) -> Vec<Expr> {
        quaternion_product(a, b)
    }

    fn from_tangent(vec: &[Expr], epsilon: &Expr) -> Vec<Expr> {
        exp(vec, epsilon)
    }

    fn to_tangent(a: &[Expr], epsilon: &Expr) -> Vec<Expr> {
        log(a, epsilon)
    }
}
