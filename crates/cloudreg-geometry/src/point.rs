use crate::linalg::Mat4;
use crate::GeometryError;

/// An n-dimensional point with an optional normal vector.
///
/// The dimensionality is implicit from the position length. The normal is
/// either empty (position-only use) or the same length as the position.
/// Copies are always deep; the only in-place mutation is [`Point::transform`].
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    position: Vec<f64>,
    normal: Vec<f64>,
}

impl Point {
    /// Create a position-only point.
    pub fn new(position: Vec<f64>) -> Self {
        Self {
            position,
            normal: Vec::new(),
        }
    }

    /// Create a point with an attached normal.
    ///
    /// Fails if the normal length differs from the position length.
    pub fn with_normal(position: Vec<f64>, normal: Vec<f64>) -> Result<Self, GeometryError> {
        if normal.len() != position.len() {
            return Err(GeometryError::DimensionMismatch {
                expected: position.len(),
                actual: normal.len(),
            });
        }
        Ok(Self { position, normal })
    }

    /// Dimensionality of the point.
    #[inline]
    pub fn dim(&self) -> usize {
        self.position.len()
    }

    /// Position coordinates.
    #[inline]
    pub fn position(&self) -> &[f64] {
        &self.position
    }

    /// Normal coordinates; empty for position-only points.
    #[inline]
    pub fn normal(&self) -> &[f64] {
        &self.normal
    }

    /// Whether a normal is attached.
    #[inline]
    pub fn has_normal(&self) -> bool {
        !self.normal.is_empty()
    }

    /// Squared Euclidean distance to another point of the same dimension.
    pub fn dist_sqd_to(&self, other: &Point) -> Result<f64, GeometryError> {
        if other.dim() != self.dim() {
            return Err(GeometryError::DimensionMismatch {
                expected: self.dim(),
                actual: other.dim(),
            });
        }
        Ok(self
            .position
            .iter()
            .zip(other.position.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum())
    }

    /// Euclidean distance to another point of the same dimension.
    pub fn dist_to(&self, other: &Point) -> Result<f64, GeometryError> {
        Ok(self.dist_sqd_to(other)?.sqrt())
    }

    /// Apply a 4x4 homogeneous transform to the position in place.
    ///
    /// The position is lifted to homogeneous coordinates, left-multiplied by
    /// `m` and divided by the resulting weight. Only 3-dimensional points can
    /// be transformed. The normal is left untouched: callers that need
    /// rotated normals must handle them separately.
    pub fn transform(&mut self, m: &Mat4) -> Result<(), GeometryError> {
        if self.dim() != 3 {
            return Err(GeometryError::DimensionMismatch {
                expected: 3,
                actual: self.dim(),
            });
        }

        let h = [self.position[0], self.position[1], self.position[2], 1.0];
        let mut out = [0.0; 4];
        for (row, dst) in m.iter().zip(out.iter_mut()) {
            *dst = row[0] * h[0] + row[1] * h[1] + row[2] * h[2] + row[3] * h[3];
        }

        let w = out[3];
        if w == 0.0 || !w.is_finite() {
            return Err(GeometryError::SingularTransform);
        }
        self.position[0] = out[0] / w;
        self.position[1] = out[1] / w;
        self.position[2] = out[2] / w;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg;
    use approx::assert_relative_eq;

    #[test]
    fn test_dist_sqd() -> Result<(), GeometryError> {
        let a = Point::new(vec![1.0, 2.0, 3.0]);
        let b = Point::new(vec![4.0, 6.0, 3.0]);
        assert_relative_eq!(a.dist_sqd_to(&b)?, 25.0);
        assert_relative_eq!(a.dist_to(&b)?, 5.0);
        Ok(())
    }

    #[test]
    fn test_dist_symmetry() -> Result<(), GeometryError> {
        let a = Point::new(vec![0.3, -1.2, 8.0, 4.5]);
        let b = Point::new(vec![-2.0, 0.0, 1.5, 3.0]);
        assert_relative_eq!(a.dist_sqd_to(&b)?, b.dist_sqd_to(&a)?);
        Ok(())
    }

    #[test]
    fn test_dist_dimension_mismatch() {
        let a = Point::new(vec![1.0, 2.0]);
        let b = Point::new(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            a.dist_sqd_to(&b),
            Err(GeometryError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_with_normal_length_check() {
        assert!(Point::with_normal(vec![0.0; 3], vec![0.0; 2]).is_err());
        assert!(Point::with_normal(vec![0.0; 3], vec![0.0, 0.0, 1.0]).is_ok());
    }

    #[test]
    fn test_transform_identity() -> Result<(), GeometryError> {
        let mut p = Point::new(vec![1.0, -2.0, 0.5]);
        p.transform(&linalg::identity())?;
        assert_relative_eq!(p.position()[0], 1.0);
        assert_relative_eq!(p.position()[1], -2.0);
        assert_relative_eq!(p.position()[2], 0.5);
        Ok(())
    }

    #[test]
    fn test_transform_translation() -> Result<(), GeometryError> {
        let mut m = linalg::identity();
        m[0][3] = 1.0;
        m[1][3] = -2.0;
        m[2][3] = 3.0;

        let mut p = Point::new(vec![0.0, 0.0, 0.0]);
        p.transform(&m)?;
        assert_relative_eq!(p.position()[0], 1.0);
        assert_relative_eq!(p.position()[1], -2.0);
        assert_relative_eq!(p.position()[2], 3.0);
        Ok(())
    }

    #[test]
    fn test_transform_rejects_non_3d() {
        let mut p = Point::new(vec![1.0, 2.0]);
        assert!(p.transform(&linalg::identity()).is_err());
        // rejected transforms must leave the point unchanged
        assert_eq!(p.position(), &[1.0, 2.0]);
    }

    #[test]
    fn test_transform_keeps_normal() -> Result<(), GeometryError> {
        let mut m = linalg::identity();
        m[0][3] = 5.0;

        let mut p = Point::with_normal(vec![0.0, 0.0, 0.0], vec![0.0, 0.0, 1.0])?;
        p.transform(&m)?;
        assert_eq!(p.normal(), &[0.0, 0.0, 1.0]);
        Ok(())
    }
}
