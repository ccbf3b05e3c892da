use faer::prelude::SpSolver;

use crate::GeometryError;

/// A 4x4 homogeneous transform in row-major order.
pub type Mat4 = [[f64; 4]; 4];

/// The 4x4 identity transform.
pub fn identity() -> Mat4 {
    let mut m = [[0.0; 4]; 4];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

/// Multiply two 4x4 transforms, `a * b`.
pub fn matmul44(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            let mut acc = 0.0;
            for (k, b_row) in b.iter().enumerate() {
                acc += a[i][k] * b_row[j];
            }
            out[i][j] = acc;
        }
    }
    out
}

/// Utility function to view a 4x4 array as a faer matrix.
fn mat4_to_faer(m: &Mat4) -> faer::MatRef<'_, f64> {
    let m_slice = unsafe { std::slice::from_raw_parts(m.as_ptr() as *const f64, 16) };
    faer::mat::from_row_major_slice(m_slice, 4, 4)
}

/// Invert a 4x4 transform.
///
/// Uses an LU decomposition so that transforms carrying the small-angle
/// (non-orthogonal) ICP increments invert correctly too. Fails on singular
/// input.
pub fn inverse44(m: &Mat4) -> Result<Mat4, GeometryError> {
    let lu = mat4_to_faer(m).partial_piv_lu();
    let inv = lu.solve(faer::Mat::<f64>::identity(4, 4));

    let mut out = [[0.0; 4]; 4];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            let x = inv.read(i, j);
            if !x.is_finite() {
                return Err(GeometryError::SingularTransform);
            }
            *v = x;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_matmul() {
        let mut m = identity();
        m[0][3] = 2.0;
        m[1][2] = -1.0;
        let out = matmul44(&m, &identity());
        for i in 0..4 {
            for j in 0..4 {
                assert_relative_eq!(out[i][j], m[i][j]);
            }
        }
    }

    #[test]
    fn test_matmul_translation_composition() {
        let mut a = identity();
        a[0][3] = 1.0;
        let mut b = identity();
        b[0][3] = 2.0;
        let ab = matmul44(&a, &b);
        assert_relative_eq!(ab[0][3], 3.0);
    }

    #[test]
    fn test_inverse_roundtrip() -> Result<(), GeometryError> {
        // rotation about z by 90 degrees plus a translation
        let m = [
            [0.0, -1.0, 0.0, 1.0],
            [1.0, 0.0, 0.0, -2.0],
            [0.0, 0.0, 1.0, 0.5],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let m_inv = inverse44(&m)?;
        let eye = matmul44(&m, &m_inv);
        let expected = identity();
        for i in 0..4 {
            for j in 0..4 {
                assert_relative_eq!(eye[i][j], expected[i][j], epsilon = 1e-12);
            }
        }
        Ok(())
    }

    #[test]
    fn test_inverse_singular() {
        let m = [[0.0; 4]; 4];
        assert!(matches!(
            inverse44(&m),
            Err(GeometryError::SingularTransform)
        ));
    }
}
