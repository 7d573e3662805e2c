//! Rigid transforms in the plane.
//!
//! Storage is `(cos, sin, tx, ty)`: a complex number for the rotation
//! followed by the translation. The tangent is `(vx, vy, theta)`.

use super::rot2;
use super::{regularize, LieGroup};
use crate::expr::Expr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pose2;

/// `R(z) v` for the complex number `z = c + i s`.
fn rotate(c: &Expr, s: &Expr, x: &Expr, y: &Expr) -> [Expr; 2] {
    [c * x - s * y, s * x + c * y]
}

impl LieGroup for Pose2 {
    const NAME: &'static str = "pose2";
    const TYPE_NAME: &'static str = "Pose2";
    const STORAGE_DIM: usize = 4;
    const TANGENT_DIM: usize = 3;

    fn identity() -> Vec<Expr> {
        vec![Expr::int(1), Expr::int(0), Expr::int(0), Expr::int(0)]
    }

    fn inverse(a: &[Expr]) -> Vec<Expr> {
        let (c, s, tx, ty) = (&a[0], &a[1], &a[2], &a[3]);
        let (c_inv, s_inv) = rot2::scaled_conjugate(c, s);
        vec![
            c_inv.clone(),
            -&s_inv,
            -(&c_inv * tx + &s_inv * ty),
            &s_inv * tx - &c_inv * ty,
        ]
    }

    fn compose(a: &[Expr], b: &[Expr]) -> Vec<Expr> {
        let (ac, as_, atx, aty) = (&a[0], &a[1], &a[2], &a[3]);
        let (bc, bs, btx, bty) = (&b[0], &b[1], &b[2], &b[3]);
        let [rx, ry] = rotate(ac, as_, btx, bty);
        let [c, s] = rot2::complex_product(ac, as_, bc, bs);
        vec![c, s, atx + rx, aty + ry]
    }

    fn from_tangent(vec: &[Expr], epsilon: &Expr) -> Vec<Expr> {
        let (vx, vy, theta) = (&vec[0], &vec[1], &vec[2]);
        let theta_safe = regularize(theta, epsilon);
        // V = [[sin(t)/t, -(1 - cos(t))/t], [(1 - cos(t))/t, sin(t)/t]]
        let sin_over = theta_safe.sin() / &theta_safe;
        let one_minus_cos_over = (1 - theta_safe.cos()) / &theta_safe;
        let [tx, ty] = rotate(&sin_over, &one_minus_cos_over, vx, vy);
        vec![theta.cos(), theta.sin(), tx, ty]
    }

    fn to_tangent(a: &[Expr], epsilon: &Expr) -> Vec<Expr> {
        let (c, s, tx, ty) = (&a[0], &a[1], &a[2], &a[3]);
        let theta = rot2::angle(c, s, epsilon);
        // V^-1 = [[k, h], [-h, k]] with h = theta/2 and k = h*cot(h)
        let half = &theta / 2;
        let half_safe = regularize(&theta, epsilon) / 2;
        let k = &half_safe * half_safe.cos() / half_safe.sin();
        vec![&k * tx + &half * ty, -&half * tx + &k * ty, theta]
    }
}
