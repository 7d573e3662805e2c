//! Rigid transforms in space.
//!
//! Storage is a quaternion `(x, y, z, w)` followed by the translation
//! `(tx, ty, tz)`. The tangent is a rotation vector followed by the
//! translation, `(wx, wy, wz, tx, ty, tz)`. The translation part of the
//! tangent is not coupled to the rotation.
//!
//! The rotation matrix is the one of a unit quaternion. Nothing here
//! renormalizes, so composing many poses lets the norm drift.

use super::rot3;
use super::LieGroup;
use crate::expr::Expr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pose3;

type Matrix3 = [[Expr; 3]; 3];

fn rotation_matrix(q: &[Expr]) -> Matrix3 {
    let (x, y, z, w) = (&q[0], &q[1], &q[2], &q[3]);
    let (two_x, two_y, two_z) = (2 * x, 2 * y, 2 * z);
    let xx = &two_x * x;
    let yy = &two_y * y;
    let zz = &two_z * z;
    let xy = &two_x * y;
    let xz = &two_x * z;
    let yz = &two_y * z;
    let xw = &two_x * w;
    let yw = &two_y * w;
    let zw = &two_z * w;
    [
        [1 - &yy - &zz, &xy - &zw, &xz + &yw],
        [&xy + &zw, 1 - &xx - &zz, &yz - &xw],
        [&xz - &yw, &yz + &xw, 1 - &xx - &yy],
    ]
}

/// `R v`
fn rotate(r: &Matrix3, v: &[Expr]) -> Vec<Expr> {
    r.iter()
        .map(|row| &row[0] * &v[0] + &row[1] * &v[1] + &row[2] * &v[2])
        .collect()
}

/// `R^T v`
fn rotate_transposed(r: &Matrix3, v: &[Expr]) -> Vec<Expr> {
    (0..3)
        .map(|j| &r[0][j] * &v[0] + &r[1][j] * &v[1] + &r[2][j] * &v[2])
        .collect()
}

impl LieGroup for Pose3 {
    const NAME: &'static str = "pose3";
    const TYPE_NAME: &'static str = "Pose3";
    const STORAGE_DIM: usize = 7;
    const TANGENT_DIM: usize = 6;

    fn identity() -> Vec<Expr> {
        [0, 0, 0, 1, 0, 0, 0].into_iter().map(Expr::int).collect()
    }

    fn inverse(a: &[Expr]) -> Vec<Expr> {
        let r = rotation_matrix(&a[..4]);
        let mut out = rot3::conjugate(&a[..4]);
        out.extend(rotate_transposed(&r, &a[4..]).into_iter().map(|t| -t));
        out
    }

    fn compose(a: &[Expr], b: &[Expr]) -> Vec<Expr> {
        let r = rotation_matrix(&a[..4]);
        let mut out = rot3::quaternion_product(&a[..4], &b[..4]);
        out.extend(
            rotate(&r, &b[4..])
                .into_iter()
                .zip(&a[4..])
                .map(|(rotated, t)| t + rotated),
        );
        out
    }

    fn from_tangent(vec: &[Expr], epsilon: &Expr) -> Vec<Expr> {
        let mut out = rot3::exp(&vec[..3], epsilon);
        out.extend(vec[3..].iter().cloned());
        out
    }

    fn to_tangent(a: &[Expr], epsilon: &Expr) -> Vec<Expr> {
        let mut out = rot3::log(&a[..4], epsilon);
        out.extend(a[4..].iter().cloned());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{evaluate, Bindings};
    use crate::expr::Symbol;

    fn eval_all(exprs: &[Expr], bindings: &Bindings) -> Vec<f64> {
        exprs.iter().map(|e| evaluate(e, bindings).unwrap()).collect()
    }

    fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
        assert_eq!(actual.len(), expected.len());
        for (x, y) in actual.iter().zip(expected) {
            assert!((x - y).abs() < tol, "{:?} != {:?}", actual, expected);
        }
    }

    /// Rotation by `angle` about the unit `axis`, then a translation.
    fn pose(axis: [f64; 3], angle: f64, t: [f64; 3]) -> Vec<f64> {
        let (s, c) = (angle / 2.0).sin_cos();
        vec![axis[0] * s, axis[1] * s, axis[2] * s, c, t[0], t[1], t[2]]
    }

    #[test]
    fn test_rotation_matrix_rotates() {
        // 90 degrees about z maps x to y.
        let q = pose([0.0, 0.0, 1.0], std::f64::consts::FRAC_PI_2, [0.0; 3]);
        let mut bindings = Bindings::new();
        bindings.bind_array("a", &q);
        bindings.bind_array("v", &[1.0, 0.0, 0.0]);

        let r = rotation_matrix(&Expr::array("a", 4));
        let v = Expr::array("v", 3);
        assert_close(&eval_all(&rotate(&r, &v), &bindings), &[0.0, 1.0, 0.0], 1e-12);
        assert_close(
            &eval_all(&rotate_transposed(&r, &v), &bindings),
            &[0.0, -1.0, 0.0],
            1e-12,
        );
    }

    #[test]
    fn test_compose_about_same_axis() {
        let a = Expr::array("a", 7);
        let b = Expr::array("b", 7);
        let mut bindings = Bindings::new();
        bindings.bind_array("a", &pose([1.0, 0.0, 0.0], 0.25, [1.0, 2.0, 3.0]));
        bindings.bind_array("b", &pose([1.0, 0.0, 0.0], 0.5, [0.0, 0.0, 0.0]));

        let out = eval_all(&Pose3::compose(&a, &b), &bindings);
        assert_close(&out, &pose([1.0, 0.0, 0.0], 0.75, [1.0, 2.0, 3.0]), 1e-12);
    }

    #[test]
    fn test_tangent_round_trip() {
        let eps = Expr::symbol("epsilon");
        let mut bindings = Bindings::new();
        bindings.bind(Symbol::named("epsilon"), 1e-10);
        let v = [0.3, -0.2, 1.1, 4.0, -5.0, 0.5];
        bindings.bind_array("vec", &v);

        let storage = eval_all(&Pose3::from_tangent(&Expr::array("vec", 6), &eps), &bindings);
        bindings.bind_array("a", &storage);
        let back = eval_all(&Pose3::to_tangent(&Expr::array("a", 7), &eps), &bindings);
        assert_close(&back, &v, 1e-7);
    }

    #[test]
    fn test_to_tangent_picks_short_way_round() {
        // q and -q are the same rotation.
        let eps = Expr::symbol("epsilon");
        let q = pose([0.0, 1.0, 0.0], 0.5, [0.0; 3]);
        let negated: Vec<f64> = q[..4].iter().map(|x| -x).chain(q[4..].iter().copied()).collect();

        let a = Expr::array("a", 7);
        let mut bindings = Bindings::new();
        bindings.bind(Symbol::named("epsilon"), 1e-10);
        bindings.bind_array("a", &negated);
        let out = eval_all(&Pose3::to_tangent(&a, &eps), &bindings);
        assert_close(&out, &[0.0, 0.5, 0.0, 0.0, 0.0, 0.0], 1e-7);
    }
}
