use crate::{GeometryError, Point};

/// An n-dimensional axis-aligned box.
///
/// Holds `min[i] <= max[i]` on every axis. Construction swaps any crossed
/// pair of bounds; bound updates that would cross the opposite bound are
/// rejected instead.
#[derive(Debug, Clone, PartialEq)]
pub struct AaBox {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl AaBox {
    /// Create a box from its two diagonal corners.
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Result<Self, GeometryError> {
        if min.is_empty() {
            return Err(GeometryError::ZeroDimension);
        }
        if min.len() != max.len() {
            return Err(GeometryError::DimensionMismatch {
                expected: min.len(),
                actual: max.len(),
            });
        }

        let mut aabb = Self { min, max };
        for i in 0..aabb.min.len() {
            if aabb.min[i] > aabb.max[i] {
                std::mem::swap(&mut aabb.min[i], &mut aabb.max[i]);
            }
        }
        Ok(aabb)
    }

    /// The box covering all of space, `[-inf, +inf]` on every axis.
    pub fn unbounded(dim: usize) -> Result<Self, GeometryError> {
        if dim == 0 {
            return Err(GeometryError::ZeroDimension);
        }
        Ok(Self {
            min: vec![f64::NEG_INFINITY; dim],
            max: vec![f64::INFINITY; dim],
        })
    }

    /// Dimensionality of the box.
    #[inline]
    pub fn dim(&self) -> usize {
        self.min.len()
    }

    /// Minimum corner.
    #[inline]
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// Maximum corner.
    #[inline]
    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// Extent of the box along one axis.
    pub fn range(&self, axis: usize) -> Result<f64, GeometryError> {
        if axis >= self.dim() {
            return Err(GeometryError::AxisOutOfRange {
                axis,
                dim: self.dim(),
            });
        }
        Ok(self.max[axis] - self.min[axis])
    }

    /// Narrow the minimum bound along one axis.
    ///
    /// Rejected if `value` exceeds the maximum bound on the same axis.
    pub fn update_min(&mut self, axis: usize, value: f64) -> Result<(), GeometryError> {
        if axis >= self.dim() {
            return Err(GeometryError::AxisOutOfRange {
                axis,
                dim: self.dim(),
            });
        }
        if value > self.max[axis] {
            return Err(GeometryError::InvalidBounds {
                axis,
                value,
                limit: self.max[axis],
            });
        }
        self.min[axis] = value;
        Ok(())
    }

    /// Narrow the maximum bound along one axis.
    ///
    /// Rejected if `value` falls below the minimum bound on the same axis.
    pub fn update_max(&mut self, axis: usize, value: f64) -> Result<(), GeometryError> {
        if axis >= self.dim() {
            return Err(GeometryError::AxisOutOfRange {
                axis,
                dim: self.dim(),
            });
        }
        if value < self.min[axis] {
            return Err(GeometryError::InvalidBounds {
                axis,
                value,
                limit: self.min[axis],
            });
        }
        self.max[axis] = value;
        Ok(())
    }

    /// Whether this box intersects another box of the same dimension.
    ///
    /// Boxes that only share a boundary count as intersecting.
    pub fn intersects(&self, other: &AaBox) -> Result<bool, GeometryError> {
        if other.dim() != self.dim() {
            return Err(GeometryError::DimensionMismatch {
                expected: self.dim(),
                actual: other.dim(),
            });
        }
        for i in 0..self.dim() {
            if self.max[i] < other.min[i] || other.max[i] < self.min[i] {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether this box contains a point of the same dimension.
    pub fn contains(&self, p: &Point) -> Result<bool, GeometryError> {
        if p.dim() != self.dim() {
            return Err(GeometryError::DimensionMismatch {
                expected: self.dim(),
                actual: p.dim(),
            });
        }
        for (i, &v) in p.position().iter().enumerate() {
            if v < self.min[i] || v > self.max[i] {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Squared Euclidean distance from the box to a point.
    ///
    /// Zero when the point lies inside the box; otherwise the sum over all
    /// axes of the squared distance to the nearest bound. This is a lower
    /// bound for the distance to any point inside the box, which is what
    /// makes it usable for nearest-neighbor pruning.
    pub fn dist_sqd_to(&self, p: &Point) -> Result<f64, GeometryError> {
        if p.dim() != self.dim() {
            return Err(GeometryError::DimensionMismatch {
                expected: self.dim(),
                actual: p.dim(),
            });
        }
        let mut dist_sqd = 0.0;
        for (i, &v) in p.position().iter().enumerate() {
            let dv = if v < self.min[i] {
                v - self.min[i]
            } else if v > self.max[i] {
                v - self.max[i]
            } else {
                0.0
            };
            dist_sqd += dv * dv;
        }
        Ok(dist_sqd)
    }

    /// Euclidean distance from the box to a point.
    pub fn dist_to(&self, p: &Point) -> Result<f64, GeometryError> {
        Ok(self.dist_sqd_to(p)?.sqrt())
    }
}
