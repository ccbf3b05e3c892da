use faer::prelude::SpSolver;

use cloudreg_geometry::linalg::Mat4;
use cloudreg_geometry::Point;

use crate::IcpError;

pub(crate) fn cross3(a: &[f64], b: &[f64]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn dot3(a: &[f64], b: &[f64]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Absolute point-to-plane residual: the distance from `p` to the tangent
/// plane through `q` defined by `q`'s normal.
pub(crate) fn point_to_plane_residual(p: &Point, q: &Point) -> f64 {
    let diff = [
        p.position()[0] - q.position()[0],
        p.position()[1] - q.position()[1],
        p.position()[2] - q.position()[2],
    ];
    dot3(&diff, q.normal()).abs()
}

/// Median by sorted rank, lower element on even counts.
pub(crate) fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted[sorted.len() / 2]
}

/// Accumulate the 6x6 normal equations `C x = d` of the linearized
/// point-to-plane objective over the inlier correspondences.
///
/// Each correspondence contributes the row `A_i = [p x n_q, n_q]` with
/// unknowns `(rx, ry, rz, tx, ty, tz)` and the scalar `b_i = (q - p) . n_q`.
pub(crate) fn accumulate_normal_equations(
    pairs: &[(Point, &Point)],
) -> (faer::Mat<f64>, faer::Mat<f64>) {
    let mut c = faer::Mat::<f64>::zeros(6, 6);
    let mut d = faer::Mat::<f64>::zeros(6, 1);

    for (p, q) in pairs {
        let rot = cross3(p.position(), q.normal());
        let a_i = [
            rot[0],
            rot[1],
            rot[2],
            q.normal()[0],
            q.normal()[1],
            q.normal()[2],
        ];
        let diff = [
            q.position()[0] - p.position()[0],
            q.position()[1] - p.position()[1],
            q.position()[2] - p.position()[2],
        ];
        let b_i = dot3(&diff, q.normal());

        for (j, &aj) in a_i.iter().enumerate() {
            for (l, &al) in a_i.iter().enumerate() {
                c.write(j, l, c.read(j, l) + aj * al);
            }
            d.write(j, 0, d.read(j, 0) + aj * b_i);
        }
    }

    (c, d)
}

/// Solve the 6x6 system for the pose increment `(rx, ry, rz, tx, ty, tz)`.
pub(crate) fn solve_increment(c: &faer::Mat<f64>, d: &faer::Mat<f64>) -> Result<[f64; 6], IcpError> {
    let x = c.partial_piv_lu().solve(d);

    let mut out = [0.0; 6];
    for (i, v) in out.iter_mut().enumerate() {
        let xi = x.read(i, 0);
        if !xi.is_finite() {
            return Err(IcpError::SingularSystem);
        }
        *v = xi;
    }
    Ok(out)
}

/// Build the incremental transform from the solved pose update.
///
/// First-order small-angle approximation of the rotation plus the
/// translation. It is not an orthogonal rotation and is only valid for the
/// small per-iteration corrections the solver produces.
pub(crate) fn small_angle_transform(x: &[f64; 6]) -> Mat4 {
    let [rx, ry, rz, tx, ty, tz] = *x;
    [
        [1.0, ry * rx - rz, rz * rx + ry, tx],
        [rz, 1.0 + rz * ry * rx, rz * ry - rx, ty],
        [-ry, rx, 1.0, tz],
        [0.0, 0.0, 0.0, 1.0],
    ]
}
